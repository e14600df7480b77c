//! Identifier-indexed comment arena.
//!
//! Nodes reference their replies by identifier instead of owning them, so the
//! tree has no back-pointers and any comment is one map lookup away. Callers
//! receive materialized [`Comment`] snapshots, never references into the arena.

use crate::models::Comment;
use std::collections::HashMap;

pub(crate) struct CommentNode {
    id: String,
    post_id: String,
    body: String,
    parent_id: Option<String>,
    children: Vec<String>,
}

impl CommentNode {
    fn detached(&self) -> Comment {
        Comment {
            id: self.id.clone(),
            post_id: self.post_id.clone(),
            body: self.body.clone(),
            parent_id: self.parent_id.clone(),
            children: Vec::new(),
        }
    }
}

#[derive(Default)]
pub(crate) struct CommentArena {
    nodes: HashMap<String, CommentNode>,
}

impl CommentArena {
    /// Build an arena from comments listed in creation order (parents first).
    /// Comments whose parent is not part of the listing stay unlinked.
    pub(crate) fn from_creation_order(comments: impl IntoIterator<Item = Comment>) -> Self {
        let mut arena = Self::default();
        for comment in comments {
            if let Some(parent_id) = &comment.parent_id {
                arena.link_child(parent_id, &comment.id);
            }
            arena.insert(&comment);
        }
        arena
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Store a comment as a leaf; replies already present on `comment` are ignored
    pub(crate) fn insert(&mut self, comment: &Comment) {
        self.nodes.insert(
            comment.id.clone(),
            CommentNode {
                id: comment.id.clone(),
                post_id: comment.post_id.clone(),
                body: comment.body.clone(),
                parent_id: comment.parent_id.clone(),
                children: Vec::new(),
            },
        );
    }

    /// Append `child_id` to the replies of `parent_id`. Returns false when the
    /// parent is unknown.
    pub(crate) fn link_child(&mut self, parent_id: &str, child_id: &str) -> bool {
        match self.nodes.get_mut(parent_id) {
            Some(parent) => {
                parent.children.push(child_id.to_string());
                true
            }
            None => false,
        }
    }

    pub(crate) fn post_id_of(&self, id: &str) -> Option<&str> {
        self.nodes.get(id).map(|node| node.post_id.as_str())
    }

    pub(crate) fn children_of(&self, id: &str) -> &[String] {
        self.nodes
            .get(id)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    /// Snapshot of a comment and its whole subtree
    pub(crate) fn materialize(&self, id: &str) -> Option<Comment> {
        let root = self.nodes.get(id)?;

        // Pre-order: every node appears after its parent.
        let mut order: Vec<(&CommentNode, Option<usize>)> = Vec::new();
        let mut stack: Vec<(&CommentNode, Option<usize>)> = vec![(root, None)];
        while let Some((node, parent)) = stack.pop() {
            let slot = order.len();
            order.push((node, parent));
            for child_id in node.children.iter().rev() {
                if let Some(child) = self.nodes.get(child_id) {
                    stack.push((child, Some(slot)));
                }
            }
        }

        let mut built: Vec<Option<Comment>> =
            order.iter().map(|(node, _)| Some(node.detached())).collect();

        // Descendants sit at higher indices, so walking backwards completes each
        // node before it moves into its parent. Replies arrive reversed.
        for i in (1..order.len()).rev() {
            let parent = order[i].1?;
            let mut child = built[i].take()?;
            child.children.reverse();
            if let Some(p) = built[parent].as_mut() {
                p.children.push(child);
            }
        }

        let mut comment = built.first_mut()?.take()?;
        comment.children.reverse();
        Some(comment)
    }

    pub(crate) fn materialize_all<'a>(
        &self,
        ids: impl IntoIterator<Item = &'a str>,
    ) -> Vec<Comment> {
        ids.into_iter()
            .filter_map(|id| self.materialize(id))
            .collect()
    }
}

/// In-memory tree store
///
/// Comments live in an arena keyed by identifier; posts and comments refer to
/// their children by identifier, so the tree never needs back-pointers and a
/// lookup by identifier is a single map access.
///
/// One store-wide read/write lock guards everything. Writes are serialized
/// against each other and against reads; reads run concurrently. This keeps the
/// tree trivially consistent but caps write throughput at one mutation at a
/// time across all posts.
use super::arena::CommentArena;
use super::pagination::paginate;
use super::CommentStore;
use crate::error::{AppError, Result};
use crate::models::{Comment, Post};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

struct PostRecord {
    id: String,
    title: String,
    body: String,
    allow_comments: bool,
    roots: Vec<String>,
}

impl PostRecord {
    fn view(&self, comments: Vec<Comment>) -> Post {
        Post {
            id: self.id.clone(),
            title: self.title.clone(),
            body: self.body.clone(),
            allow_comments: self.allow_comments,
            comments,
        }
    }
}

#[derive(Default)]
struct Tree {
    posts: HashMap<String, PostRecord>,
    comments: CommentArena,
}

pub struct InMemoryStore {
    inner: RwLock<Tree>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Tree::default()),
        }
    }

    pub async fn post_count(&self) -> usize {
        self.inner.read().await.posts.len()
    }

    pub async fn comment_count(&self) -> usize {
        self.inner.read().await.comments.len()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommentStore for InMemoryStore {
    async fn create_post(&self, post: &Post) -> Result<()> {
        let mut tree = self.inner.write().await;

        let replaced = tree.posts.insert(
            post.id.clone(),
            PostRecord {
                id: post.id.clone(),
                title: post.title.clone(),
                body: post.body.clone(),
                allow_comments: post.allow_comments,
                roots: Vec::new(),
            },
        );
        if replaced.is_some() {
            debug!(post_id = %post.id, "post identifier reused, previous post replaced");
        }

        Ok(())
    }

    async fn get_posts(&self) -> Result<Vec<Post>> {
        let tree = self.inner.read().await;

        let posts = tree
            .posts
            .values()
            .map(|record| {
                record.view(
                    tree.comments
                        .materialize_all(record.roots.iter().map(String::as_str)),
                )
            })
            .collect();

        Ok(posts)
    }

    async fn get_post_by_id(
        &self,
        id: &str,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<Post> {
        let tree = self.inner.read().await;

        let record = tree
            .posts
            .get(id)
            .ok_or_else(|| AppError::NotFound(format!("no posts with this id: {}", id)))?;

        let comments = match (limit, offset) {
            (Some(limit), Some(offset)) => {
                let window = paginate(&record.roots, limit, offset, |cid| {
                    tree.comments.children_of(cid)
                });
                tree.comments.materialize_all(window)
            }
            _ => tree
                .comments
                .materialize_all(record.roots.iter().map(String::as_str)),
        };

        Ok(record.view(comments))
    }

    async fn get_post_summary(&self, id: &str) -> Result<Post> {
        let tree = self.inner.read().await;

        tree.posts
            .get(id)
            .map(|record| record.view(Vec::new()))
            .ok_or_else(|| AppError::NotFound(format!("no posts with this id: {}", id)))
    }

    async fn get_comment_post_id(&self, id: &str) -> Result<String> {
        let tree = self.inner.read().await;

        tree.comments
            .post_id_of(id)
            .map(str::to_string)
            .ok_or_else(|| AppError::NotFound(format!("no comments with this id: {}", id)))
    }

    async fn create_comment(&self, post: &Post, comment: &Comment) -> Result<()> {
        let mut tree = self.inner.write().await;

        if tree.comments.contains(&comment.id) {
            return Err(AppError::ValidationError(format!(
                "comment with this id already exists: {}",
                comment.id
            )));
        }
        if !tree.posts.contains_key(&post.id) {
            return Err(AppError::NotFound(format!("no posts with this id: {}", post.id)));
        }

        match &comment.parent_id {
            Some(parent_id) => {
                if !tree.comments.link_child(parent_id, &comment.id) {
                    return Err(AppError::NotFound(format!(
                        "no comments with this id: {}",
                        parent_id
                    )));
                }
            }
            None => {
                if let Some(record) = tree.posts.get_mut(&post.id) {
                    record.roots.push(comment.id.clone());
                }
            }
        }

        tree.comments.insert(&Comment {
            post_id: post.id.clone(),
            children: Vec::new(),
            ..comment.clone()
        });

        Ok(())
    }

    async fn get_comment_by_id(&self, id: &str) -> Result<Comment> {
        let tree = self.inner.read().await;

        tree.comments
            .materialize(id)
            .ok_or_else(|| AppError::NotFound(format!("no comments with this id: {}", id)))
    }
}

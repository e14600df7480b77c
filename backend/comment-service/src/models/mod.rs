/// Data models for comment-service
///
/// This module defines structures for:
/// - Post: Top-level content item that owns a forest of comments
/// - Comment: Threaded reply, either a root of a post or a child of another comment
/// - CommentEvent: Notification payload for a newly created comment
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum comment body length, counted in Unicode code points
pub const MAX_COMMENT_LENGTH: usize = 2000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub title: String,
    pub body: String,
    pub allow_comments: bool,
    /// Root comments in creation order, or a flattened page when paginated
    pub comments: Vec<Comment>,
}

impl Post {
    /// Build a post with a fresh identifier and no comments
    pub fn new(title: impl Into<String>, body: impl Into<String>, allow_comments: bool) -> Self {
        Self {
            id: new_id(),
            title: title.into(),
            body: body.into(),
            allow_comments,
            comments: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub body: String,
    /// `None` for a root comment of the post
    pub parent_id: Option<String>,
    /// Replies in creation order
    pub children: Vec<Comment>,
}

impl Comment {
    /// Build a comment with a fresh identifier and no replies
    pub fn new(
        post_id: impl Into<String>,
        body: impl Into<String>,
        parent_id: Option<String>,
    ) -> Self {
        Self {
            id: new_id(),
            post_id: post_id.into(),
            body: body.into(),
            parent_id,
            children: Vec::new(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Body length in code points
    pub fn body_len(&self) -> usize {
        self.body.chars().count()
    }
}

/// A comment announced to the subscribers of its post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentEvent {
    pub post_id: String,
    pub comment: Comment,
}

impl CommentEvent {
    pub fn new(comment: Comment) -> Self {
        Self {
            post_id: comment.post_id.clone(),
            comment,
        }
    }
}

/// Fresh globally unique identifier
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

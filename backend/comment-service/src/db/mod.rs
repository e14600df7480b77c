/// Database access layer
///
/// This module provides:
/// - The `CommentStore` contract shared by every backend
/// - An in-memory arena backend and a PostgreSQL backend
/// - The pagination engine that windows a post's comment tree
mod arena;
pub mod memory;
pub mod pagination;
pub mod postgres;

pub use memory::InMemoryStore;
pub use pagination::paginate;
pub use postgres::PostgresStore;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{Comment, Post};
use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Persistence contract for posts and their comment trees.
///
/// Stores are dumb and consistent: they keep the tree well-formed but enforce
/// no business rules. Validation belongs to the services layer.
#[async_trait]
pub trait CommentStore: Send + Sync {
    /// Insert a post. Identifiers are expected to be unique; an existing post
    /// with the same identifier is replaced.
    async fn create_post(&self, post: &Post) -> Result<()>;

    /// All stored posts, in no particular order
    async fn get_posts(&self) -> Result<Vec<Post>>;

    /// Fetch a post. When both `limit` and `offset` are given, `comments` holds
    /// that window of the flattened comment tree; otherwise it holds the root
    /// comments with their replies nested.
    async fn get_post_by_id(
        &self,
        id: &str,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<Post>;

    /// Fetch a post's own fields; `comments` is left empty
    async fn get_post_summary(&self, id: &str) -> Result<Post>;

    /// Identifier of the post a comment belongs to
    async fn get_comment_post_id(&self, id: &str) -> Result<String>;

    /// Attach a comment to `post`, under its parent when `parent_id` is set
    async fn create_comment(&self, post: &Post, comment: &Comment) -> Result<()>;

    /// Fetch a comment with its replies nested
    async fn get_comment_by_id(&self, id: &str) -> Result<Comment>;

    /// Release backend resources
    async fn close(&self) {}
}

/// Which backend holds the data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    Postgres,
}

impl FromStr for StorageBackend {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "postgres" => Ok(StorageBackend::Postgres),
            other => Err(AppError::Config(format!(
                "invalid storage type '{}', use either memory or postgres",
                other
            ))),
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageBackend::Memory => write!(f, "memory"),
            StorageBackend::Postgres => write!(f, "postgres"),
        }
    }
}

/// Open the configured backend
pub async fn connect(config: &Config) -> Result<Arc<dyn CommentStore>> {
    match config.storage {
        StorageBackend::Memory => Ok(Arc::new(InMemoryStore::new())),
        StorageBackend::Postgres => {
            let store = PostgresStore::connect(config.database.clone()).await?;
            Ok(Arc::new(store))
        }
    }
}

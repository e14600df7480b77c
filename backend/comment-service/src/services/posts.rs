/// Post service - handles post creation and retrieval
use crate::db::CommentStore;
use crate::error::Result;
use crate::models::Post;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Clone)]
pub struct PostService {
    store: Arc<dyn CommentStore>,
}

impl PostService {
    pub fn new(store: Arc<dyn CommentStore>) -> Self {
        Self { store }
    }

    /// Create a new post with no comments
    pub async fn create_post(
        &self,
        title: impl Into<String>,
        body: impl Into<String>,
        allow_comments: bool,
    ) -> Result<Post> {
        let post = Post::new(title, body, allow_comments);

        match self.store.create_post(&post).await {
            Ok(()) => {
                info!(post_id = %post.id, allow_comments, "post created");
                Ok(post)
            }
            Err(e) => {
                error!(error = %e, "error creating post");
                Err(e)
            }
        }
    }

    /// All posts with their root comments nested
    pub async fn get_posts(&self) -> Result<Vec<Post>> {
        match self.store.get_posts().await {
            Ok(posts) => {
                info!(count = posts.len(), "posts fetched");
                Ok(posts)
            }
            Err(e) => {
                error!(error = %e, "error getting posts");
                Err(e)
            }
        }
    }

    /// Get a post by ID, paginating its comments when both `limit` and `offset` are set
    pub async fn get_post(
        &self,
        post_id: &str,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<Post> {
        match self.store.get_post_by_id(post_id, limit, offset).await {
            Ok(post) => {
                info!(
                    post_id,
                    ?limit,
                    ?offset,
                    comments = post.comments.len(),
                    "post fetched"
                );
                Ok(post)
            }
            Err(e) => {
                error!(post_id, error = %e, "error getting post");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryStore;

    fn service() -> PostService {
        PostService::new(Arc::new(InMemoryStore::new()))
    }

    #[tokio::test]
    async fn test_create_post_assigns_fresh_ids() {
        let posts = service();
        let first = posts.create_post("Title", "Body", true).await.unwrap();
        let second = posts.create_post("Title", "Body", true).await.unwrap();

        assert_ne!(first.id, second.id);
        assert!(first.comments.is_empty());
    }

    #[tokio::test]
    async fn test_get_post_returns_created_state() {
        let posts = service();
        let created = posts.create_post("Title", "Body", false).await.unwrap();

        let fetched = posts.get_post(&created.id, None, None).await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_get_missing_post_is_not_found() {
        let err = service().get_post("missing", None, None).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_get_posts_lists_everything() {
        let posts = service();
        posts.create_post("One", "Body", true).await.unwrap();
        posts.create_post("Two", "Body", true).await.unwrap();

        let mut titles: Vec<String> = posts
            .get_posts()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.title)
            .collect();
        titles.sort();
        assert_eq!(titles, vec!["One".to_string(), "Two".to_string()]);
    }
}

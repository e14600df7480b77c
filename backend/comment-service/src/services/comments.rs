/// Comment service - handles validated comment creation, retrieval, and subscriptions
use crate::db::CommentStore;
use crate::error::{AppError, Result};
use crate::models::{Comment, CommentEvent, MAX_COMMENT_LENGTH};
use crate::notifications::{CommentSubscription, NotificationHub};
use std::sync::Arc;
use tracing::{error, info};

#[derive(Clone)]
pub struct CommentService {
    store: Arc<dyn CommentStore>,
    hub: NotificationHub,
}

impl CommentService {
    pub fn new(store: Arc<dyn CommentStore>, hub: NotificationHub) -> Self {
        Self { store, hub }
    }

    /// Create a comment on a post, optionally as a reply, and announce it to
    /// the post's subscribers.
    ///
    /// Checks run in this order: body length, post exists, parent exists and
    /// belongs to the post, post accepts comments.
    pub async fn create_comment(
        &self,
        post_id: &str,
        body: impl Into<String>,
        parent_id: Option<String>,
    ) -> Result<Comment> {
        let comment = Comment::new(post_id, body, parent_id);

        match self.validate_and_store(&comment).await {
            Ok(()) => {
                info!(
                    post_id,
                    comment_id = %comment.id,
                    parent_id = ?comment.parent_id,
                    "comment created"
                );
            }
            Err(e) => {
                error!(post_id, error = %e, "error creating comment");
                return Err(e);
            }
        }

        self.hub.publish(&CommentEvent::new(comment.clone())).await;
        Ok(comment)
    }

    async fn validate_and_store(&self, comment: &Comment) -> Result<()> {
        if comment.body_len() > MAX_COMMENT_LENGTH {
            return Err(AppError::ValidationError(format!(
                "comment is too long: {} characters, at most {} allowed",
                comment.body_len(),
                MAX_COMMENT_LENGTH
            )));
        }

        let post = self.store.get_post_summary(&comment.post_id).await?;

        if let Some(parent_id) = &comment.parent_id {
            let parent_post_id = self.store.get_comment_post_id(parent_id).await?;
            if parent_post_id != post.id {
                return Err(AppError::ValidationError(format!(
                    "parent comment {} belongs to another post",
                    parent_id
                )));
            }
        }

        if !post.allow_comments {
            return Err(AppError::ValidationError(
                "comments are disabled for this post".to_string(),
            ));
        }

        self.store.create_comment(&post, comment).await
    }

    /// Get a comment by ID with its replies nested
    pub async fn get_comment(&self, comment_id: &str) -> Result<Comment> {
        match self.store.get_comment_by_id(comment_id).await {
            Ok(comment) => {
                info!(comment_id, replies = comment.children.len(), "comment fetched");
                Ok(comment)
            }
            Err(e) => {
                error!(comment_id, error = %e, "error getting comment");
                Err(e)
            }
        }
    }

    /// Stream of comments created on `post_id` from now on. Dropping the
    /// stream unsubscribes.
    pub fn subscribe_to_comments(&self, post_id: &str) -> CommentSubscription {
        let subscription = self.hub.subscribe(post_id);
        info!(post_id, subscriber_id = subscription.id(), "comment subscription opened");
        subscription
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryStore;
    use crate::models::Post;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Delegates to the in-memory store and counts reads that build comment trees
    #[derive(Default)]
    struct TreeReadCounter {
        inner: InMemoryStore,
        tree_reads: AtomicUsize,
    }

    #[async_trait]
    impl CommentStore for TreeReadCounter {
        async fn create_post(&self, post: &Post) -> Result<()> {
            self.inner.create_post(post).await
        }

        async fn get_posts(&self) -> Result<Vec<Post>> {
            self.tree_reads.fetch_add(1, Ordering::SeqCst);
            self.inner.get_posts().await
        }

        async fn get_post_by_id(
            &self,
            id: &str,
            limit: Option<usize>,
            offset: Option<usize>,
        ) -> Result<Post> {
            self.tree_reads.fetch_add(1, Ordering::SeqCst);
            self.inner.get_post_by_id(id, limit, offset).await
        }

        async fn get_post_summary(&self, id: &str) -> Result<Post> {
            self.inner.get_post_summary(id).await
        }

        async fn get_comment_post_id(&self, id: &str) -> Result<String> {
            self.inner.get_comment_post_id(id).await
        }

        async fn create_comment(&self, post: &Post, comment: &Comment) -> Result<()> {
            self.inner.create_comment(post, comment).await
        }

        async fn get_comment_by_id(&self, id: &str) -> Result<Comment> {
            self.tree_reads.fetch_add(1, Ordering::SeqCst);
            self.inner.get_comment_by_id(id).await
        }
    }

    struct Fixture {
        store: Arc<InMemoryStore>,
        hub: NotificationHub,
        comments: CommentService,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let hub = NotificationHub::new(4);
        let comments = CommentService::new(store.clone(), hub.clone());
        Fixture {
            store,
            hub,
            comments,
        }
    }

    async fn post(fx: &Fixture, allow_comments: bool) -> Post {
        let post = Post::new("Title", "Body", allow_comments);
        fx.store.create_post(&post).await.unwrap();
        post
    }

    #[tokio::test]
    async fn test_create_root_and_reply() {
        let fx = fixture();
        let post = post(&fx, true).await;

        let root = fx.comments.create_comment(&post.id, "root", None).await.unwrap();
        let reply = fx
            .comments
            .create_comment(&post.id, "reply", Some(root.id.clone()))
            .await
            .unwrap();

        let fetched = fx.comments.get_comment(&root.id).await.unwrap();
        assert_eq!(fetched.children, vec![reply]);
    }

    #[tokio::test]
    async fn test_create_comment_does_not_read_comment_trees() {
        let store = Arc::new(TreeReadCounter::default());
        let comments = CommentService::new(store.clone(), NotificationHub::new(1));
        let post = Post::new("Title", "Body", true);
        store.create_post(&post).await.unwrap();

        let mut parent = comments.create_comment(&post.id, "root", None).await.unwrap();
        for n in 0..50 {
            comments
                .create_comment(&post.id, format!("sibling-{}", n), None)
                .await
                .unwrap();
            parent = comments
                .create_comment(&post.id, format!("reply-{}", n), Some(parent.id))
                .await
                .unwrap();
        }

        assert_eq!(store.tree_reads.load(Ordering::SeqCst), 0);
        assert_eq!(store.inner.comment_count().await, 101);
    }

    #[tokio::test]
    async fn test_body_at_limit_is_accepted() {
        let fx = fixture();
        let post = post(&fx, true).await;

        let body = "é".repeat(MAX_COMMENT_LENGTH);
        assert!(fx.comments.create_comment(&post.id, body, None).await.is_ok());
    }

    #[tokio::test]
    async fn test_length_is_checked_before_existence() {
        let fx = fixture();
        let body = "x".repeat(MAX_COMMENT_LENGTH + 1);

        let err = fx
            .comments
            .create_comment("missing", body, None)
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_missing_post_is_not_found() {
        let fx = fixture();
        let err = fx
            .comments
            .create_comment("missing", "hi", None)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_missing_parent_wins_over_disabled_comments() {
        let fx = fixture();
        let post = post(&fx, false).await;

        let err = fx
            .comments
            .create_comment(&post.id, "hi", Some("missing".to_string()))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_cross_post_parent_is_rejected() {
        let fx = fixture();
        let first = post(&fx, true).await;
        let second = post(&fx, true).await;
        let parent = fx.comments.create_comment(&first.id, "root", None).await.unwrap();

        let err = fx
            .comments
            .create_comment(&second.id, "reply", Some(parent.id))
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(fx.store.comment_count().await, 1);
    }

    #[tokio::test]
    async fn test_disabled_comments_are_rejected() {
        let fx = fixture();
        let post = post(&fx, false).await;

        let err = fx
            .comments
            .create_comment(&post.id, "hi", None)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            AppError::ValidationError("comments are disabled for this post".to_string())
        );
    }

    #[tokio::test]
    async fn test_created_comment_is_published() {
        let fx = fixture();
        let post = post(&fx, true).await;
        let mut subscription = fx.comments.subscribe_to_comments(&post.id);

        let created = fx.comments.create_comment(&post.id, "hi", None).await.unwrap();
        assert_eq!(subscription.recv().await, Some(created));
    }

    #[tokio::test]
    async fn test_rejected_comment_is_not_published() {
        let fx = fixture();
        let post = post(&fx, false).await;
        let mut subscription = fx.comments.subscribe_to_comments(&post.id);

        assert!(fx.comments.create_comment(&post.id, "hi", None).await.is_err());
        assert_eq!(fx.hub.subscriber_count(&post.id), 1);

        let nothing =
            tokio::time::timeout(std::time::Duration::from_millis(50), subscription.recv()).await;
        assert!(nothing.is_err());
    }
}

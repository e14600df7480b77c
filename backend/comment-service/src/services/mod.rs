/// Business logic layer for comment-service
///
/// This module provides high-level operations:
/// - Post service: Post creation and retrieval
/// - Comment service: Validated comment creation, lookup, and live subscriptions
pub mod comments;
pub mod posts;

// Re-export commonly used services
pub use comments::CommentService;
pub use posts::PostService;

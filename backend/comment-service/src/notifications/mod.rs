/// Live comment notifications
///
/// A per-post publish/subscribe hub. Comment creation publishes into it after
/// the store write completes; subscribers consume a stream of new comments.
pub mod hub;

pub use hub::{CommentSubscription, NotificationHub, SubscriberId};

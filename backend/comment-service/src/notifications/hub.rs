/// Comment Notification Hub
///
/// Routes newly created comments to the live listeners of their post.
/// Supports:
/// - Multiple concurrent subscriptions per post
/// - Explicit unsubscription, and automatic unsubscription when a
///   subscription stream is dropped
/// - Bounded per-subscriber queues with block-on-full delivery
/// - Shutdown that ends every open stream
use crate::models::{Comment, CommentEvent};
use futures::Stream;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tracing::debug;

/// Identifies one subscription within its post
pub type SubscriberId = u64;

struct Subscriber {
    id: SubscriberId,
    sender: mpsc::Sender<Comment>,
}

struct HubInner {
    /// Map of post_id -> subscribers in registration order
    subscribers: RwLock<HashMap<String, Vec<Subscriber>>>,
    next_id: AtomicU64,
    buffer_size: usize,
    closed: AtomicBool,
}

impl HubInner {
    fn remove(&self, post_id: &str, id: SubscriberId) -> bool {
        let mut subscribers = self.subscribers.write();

        let Some(list) = subscribers.get_mut(post_id) else {
            return false;
        };
        let before = list.len();
        list.retain(|s| s.id != id);
        let removed = list.len() != before;

        if list.is_empty() {
            subscribers.remove(post_id);
        }
        removed
    }
}

/// Per-post publish/subscribe registry for new comments.
///
/// Cloning is cheap; clones share the same registry.
///
/// Delivery waits for room in each subscriber's queue. A subscriber that stops
/// reading without dropping its stream stalls every later publish to its post
/// once its queue is full.
#[derive(Clone)]
pub struct NotificationHub {
    inner: Arc<HubInner>,
}

impl NotificationHub {
    /// Create a hub whose subscriber queues hold `buffer_size` comments
    pub fn new(buffer_size: usize) -> Self {
        Self {
            inner: Arc::new(HubInner {
                subscribers: RwLock::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                buffer_size: buffer_size.max(1),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Register a new listener for `post_id`
    pub fn subscribe(&self, post_id: &str) -> CommentSubscription {
        let (sender, receiver) = mpsc::channel(self.inner.buffer_size);
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);

        {
            let mut subscribers = self.inner.subscribers.write();
            // Checked under the lock so a concurrent shutdown cannot miss this sender.
            if self.inner.closed.load(Ordering::Acquire) {
                debug!(post_id, "subscription requested after shutdown");
            } else {
                subscribers
                    .entry(post_id.to_string())
                    .or_default()
                    .push(Subscriber { id, sender });
                debug!(post_id, subscriber_id = id, "subscriber added");
            }
        }

        CommentSubscription {
            post_id: post_id.to_string(),
            id,
            receiver,
            hub: Arc::downgrade(&self.inner),
        }
    }

    /// Remove one listener. Returns false when it was not registered.
    pub fn unsubscribe(&self, post_id: &str, id: SubscriberId) -> bool {
        let removed = self.inner.remove(post_id, id);
        if removed {
            debug!(post_id, subscriber_id = id, "subscriber removed");
        }
        removed
    }

    /// Deliver `event.comment` to every listener registered for `event.post_id`
    /// at the time of the call, in registration order. Returns how many
    /// listeners received it.
    pub async fn publish(&self, event: &CommentEvent) -> usize {
        let targets: Vec<(SubscriberId, mpsc::Sender<Comment>)> = {
            let subscribers = self.inner.subscribers.read();
            subscribers
                .get(&event.post_id)
                .map(|list| list.iter().map(|s| (s.id, s.sender.clone())).collect())
                .unwrap_or_default()
        };

        let mut delivered = 0;
        let mut gone = Vec::new();
        for (id, sender) in targets {
            match sender.send(event.comment.clone()).await {
                Ok(()) => delivered += 1,
                Err(_) => gone.push(id),
            }
        }

        for id in gone {
            self.inner.remove(&event.post_id, id);
        }

        debug!(
            post_id = %event.post_id,
            comment_id = %event.comment.id,
            delivered,
            "comment published"
        );
        delivered
    }

    /// Number of listeners currently registered for `post_id`
    pub fn subscriber_count(&self, post_id: &str) -> usize {
        self.inner
            .subscribers
            .read()
            .get(post_id)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Total number of listeners across all posts
    pub fn total_subscribers(&self) -> usize {
        self.inner.subscribers.read().values().map(Vec::len).sum()
    }

    /// Drop every listener; open streams end after draining queued comments
    pub fn shutdown(&self) {
        let dropped = {
            let mut subscribers = self.inner.subscribers.write();
            self.inner.closed.store(true, Ordering::Release);
            let count = subscribers.values().map(Vec::len).sum::<usize>();
            subscribers.clear();
            count
        };
        debug!(dropped, "notification hub shut down");
    }
}

/// Live stream of new comments for one post.
///
/// The stream never ends on its own; it ends when the hub shuts down. Dropping
/// it unsubscribes, so tying it to a cancellation signal (for example with
/// `StreamExt::take_until`) releases the registration when the caller goes away.
pub struct CommentSubscription {
    post_id: String,
    id: SubscriberId,
    receiver: mpsc::Receiver<Comment>,
    hub: Weak<HubInner>,
}

impl CommentSubscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub fn post_id(&self) -> &str {
        &self.post_id
    }

    /// Wait for the next comment; `None` once the hub has shut down
    pub async fn recv(&mut self) -> Option<Comment> {
        self.receiver.recv().await
    }
}

impl Stream for CommentSubscription {
    type Item = Comment;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

impl Drop for CommentSubscription {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            if hub.remove(&self.post_id, self.id) {
                debug!(post_id = %self.post_id, subscriber_id = self.id, "subscription dropped");
            }
        }
    }
}

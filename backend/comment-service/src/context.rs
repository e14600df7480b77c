/// Application context
///
/// Built once at startup and handed to every request handler. Owns the store
/// and the notification hub for the lifetime of the process.
use crate::config::{Config, SubscriptionConfig};
use crate::db::{self, CommentStore};
use crate::error::Result;
use crate::notifications::NotificationHub;
use crate::services::{CommentService, PostService};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct AppContext {
    pub store: Arc<dyn CommentStore>,
    pub hub: NotificationHub,
    pub posts: PostService,
    pub comments: CommentService,
}

impl AppContext {
    /// Connect the configured backend and wire the services over it
    pub async fn init(config: &Config) -> Result<Self> {
        let store = db::connect(config).await?;
        info!(storage = %config.storage, "comment store ready");
        Ok(Self::with_store(store, &config.subscriptions))
    }

    pub fn with_store(store: Arc<dyn CommentStore>, subscriptions: &SubscriptionConfig) -> Self {
        let hub = NotificationHub::new(subscriptions.buffer_size);
        Self {
            posts: PostService::new(store.clone()),
            comments: CommentService::new(store.clone(), hub.clone()),
            store,
            hub,
        }
    }

    /// End every live subscription, then release the store
    pub async fn shutdown(&self) {
        self.hub.shutdown();
        self.store.close().await;
        info!("application context shut down");
    }
}

/// Comment Service Library
///
/// Stores posts and their threaded comments, serves paginated comment subtrees,
/// and announces newly created comments to live subscribers.
///
/// # Modules
///
/// - `models`: Post, comment, and comment event data structures
/// - `db`: Tree store contract with in-memory and PostgreSQL backends
/// - `notifications`: Per-post publish/subscribe hub for new comments
/// - `services`: Validation and orchestration over the store and the hub
/// - `context`: Process-lifetime wiring handed to request handlers
/// - `error`: Error types and handling
/// - `config`: Configuration management
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod models;
pub mod notifications;
pub mod services;

pub use config::Config;
pub use context::AppContext;
pub use error::{AppError, Result};

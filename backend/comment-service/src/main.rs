use anyhow::{bail, Context};
use comment_service::db::StorageBackend;
use comment_service::{AppContext, Config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

/// Storage backend requested on the command line (`--storage-type memory|postgres`)
fn storage_flag() -> anyhow::Result<Option<StorageBackend>> {
    let mut args = std::env::args().skip(1);
    let mut storage = None;

    while let Some(arg) = args.next() {
        let value = if let Some(value) = arg.strip_prefix("--storage-type=") {
            value.to_string()
        } else if arg == "--storage-type" {
            args.next().context("--storage-type requires a value")?
        } else {
            bail!("unknown argument: {}", arg);
        };
        storage = Some(value.parse::<StorageBackend>()?);
    }

    Ok(storage)
}

fn init_tracing() {
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let fmt_layer = if json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,sqlx=warn".into()),
        )
        .with(fmt_layer)
        .init();
}

async fn shutdown_signal() -> anyhow::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate =
            signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;

        tokio::select! {
            result = tokio::signal::ctrl_c() => result.context("Failed to listen for Ctrl+C")?,
            _ = terminate.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .context("Failed to install Ctrl+C handler")?;
    }

    Ok(())
}

/// Comment Service
///
/// Holds posts and threaded comments, and fans new comments out to live
/// subscribers. Request transport is layered on top of `AppContext`.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let mut config = Config::from_env().context("Configuration loading failed")?;
    if let Some(storage) = storage_flag()? {
        config = config.with_storage(storage);
    }

    tracing::info!(
        env = %config.app.env,
        storage = %config.storage,
        subscription_buffer = config.subscriptions.buffer_size,
        "Starting comment-service"
    );

    let ctx = AppContext::init(&config)
        .await
        .with_context(|| format!("failed to open {} storage", config.storage))?;

    let result = shutdown_signal().await;
    tracing::info!("Shutdown signal received, stopping comment-service");

    ctx.shutdown().await;
    result
}

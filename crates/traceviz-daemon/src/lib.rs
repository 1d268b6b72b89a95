//! # traceviz-daemon: hook ingestion coordinator
//!
//! Accepts hook payloads over HTTP, normalizes them, keeps the session
//! history in memory, appends it to the session log, and streams it to
//! WebSocket subscribers.
//!
//! ```text
//! POST /event ─▶ normalize ─▶ ┌ EventStore::append
//!                             ├ SessionLogger::write
//!                             └ SubscriberHub::broadcast ─▶ ws clients
//! ```

mod config;
mod coordinator;
mod hub;
mod routes;

pub use config::{DEFAULT_PORT, DaemonConfig};
pub use coordinator::{Coordinator, Submission, Subscription};
pub use hub::{DEFAULT_FEED_CAPACITY, FeedReceiver, SubscriberHub, SubscriberId};
pub use routes::router;

use std::future::Future;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::info;

/// Bind, start a session, and serve until `shutdown` resolves.
///
/// Failing to bind the listener is the only fatal startup error besides
/// failing to open the session log.
pub async fn run<F>(config: DaemonConfig, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("failed to bind {}", config.listen))?;
    let coordinator = Coordinator::start(&config).await?;

    info!(
        listen = %config.listen,
        session_id = %coordinator.session_id(),
        log = %coordinator.log_path().display(),
        "traceviz daemon listening"
    );

    let app = router(coordinator.clone(), config.web_dist.clone());
    let feeds = coordinator.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            feeds.disconnect_all();
        })
        .await
        .context("server error")?;

    coordinator.shutdown().await;
    Ok(())
}

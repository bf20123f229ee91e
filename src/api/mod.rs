//! HTTP admin API
//!
//! ```text
//! GET  /channels/list   -> [ChannelInfo]
//! GET  /stats           -> ServerStats
//! POST /channels/send   {channel, name, extension, base64} -> {error, message}
//! ```
//!
//! Submitting through the API takes the same path as a `send` request on
//! the socket protocol.

pub mod error;
pub mod handlers;
pub mod routes;

use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::registry::ChannelRegistry;

pub use error::ApiError;
pub use routes::create_router;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Channel registry shared with the socket server
    pub registry: Arc<ChannelRegistry>,
}

impl AppState {
    /// Create a new AppState around a registry
    pub fn new(registry: Arc<ChannelRegistry>) -> Self {
        Self { registry }
    }
}

/// Serve the admin API on `listener` until `shutdown` completes
pub async fn serve<F>(
    listener: TcpListener,
    registry: Arc<ChannelRegistry>,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    tracing::info!(addr = %listener.local_addr()?, "Admin API listening");

    let router = create_router(AppState::new(registry));
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}

//! File relay server listener
//!
//! Handles the TCP accept loop and spawns a dispatcher task per connection.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;

use crate::error::Result;
use crate::registry::{ChannelRegistry, RegistryConfig};
use crate::server::config::ServerConfig;
use crate::server::connection::Connection;

/// File relay server
pub struct FileServer {
    config: ServerConfig,
    registry: Arc<ChannelRegistry>,
    next_session_id: AtomicU64,
    connection_semaphore: Option<Arc<Semaphore>>,
}

impl FileServer {
    /// Create a new server with the given configuration
    pub fn new(config: ServerConfig) -> Self {
        Self::with_registry_config(config, RegistryConfig::default())
    }

    /// Create a new server with custom registry configuration
    pub fn with_registry_config(config: ServerConfig, registry_config: RegistryConfig) -> Self {
        let connection_semaphore = if config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            None
        };

        Self {
            config,
            registry: Arc::new(ChannelRegistry::with_config(registry_config)),
            next_session_id: AtomicU64::new(1),
            connection_semaphore,
        }
    }

    /// Get a reference to the channel registry
    pub fn registry(&self) -> &Arc<ChannelRegistry> {
        &self.registry
    }

    /// Run the server
    ///
    /// This method blocks until the server fails to bind.
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()>,
    {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already-bound listener until `shutdown` completes
    ///
    /// Also starts the admin API when an API address is configured.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()>,
    {
        let addr = listener.local_addr()?;
        tracing::info!(addr = %addr, "File server listening");

        let api_handle = match self.config.api_addr {
            Some(api_addr) => {
                let api_listener = TcpListener::bind(api_addr).await?;
                let registry = Arc::clone(&self.registry);
                Some(tokio::spawn(async move {
                    if let Err(e) =
                        crate::api::serve(api_listener, registry, std::future::pending()).await
                    {
                        tracing::error!(error = %e, "Admin API stopped");
                    }
                }))
            }
            None => None,
        };

        let cleanup_handle = self.registry.spawn_cleanup_task();

        let result = tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
                Ok(())
            }
            result = self.accept_loop(&listener) => result,
        };

        if let Some(handle) = cleanup_handle {
            handle.abort();
        }
        if let Some(handle) = api_handle {
            handle.abort();
        }

        let stats = self.registry.stats().await;
        let closed = self.registry.disconnect_all().await;
        tracing::info!(
            uptime_secs = stats.uptime().num_seconds(),
            files_sent = stats.files_sent,
            channels = stats.channels_available,
            subscribers = closed,
            "File server stopped"
        );

        result
    }

    async fn accept_loop(&self, listener: &TcpListener) -> Result<()> {
        loop {
            match listener.accept().await {
                Ok((socket, peer_addr)) => {
                    self.handle_connection(socket, peer_addr);
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }

    fn handle_connection(&self, socket: TcpStream, peer_addr: SocketAddr) {
        // Check connection limit
        let permit = if let Some(ref sem) = self.connection_semaphore {
            match sem.clone().try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    tracing::warn!(peer = %peer_addr, "Connection rejected: limit reached");
                    return;
                }
            }
        } else {
            None
        };

        // Generate session ID
        let session_id = self.next_session_id.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(
            session_id = session_id,
            peer = %peer_addr,
            "New connection"
        );

        if let Err(e) = self.configure_socket(&socket) {
            tracing::error!(error = %e, "Failed to configure socket");
            return;
        }

        // Dispatch off the accept loop so a silent client can't stall it
        let connection = Connection::new(
            session_id,
            socket,
            peer_addr.to_string(),
            self.config.clone(),
            Arc::clone(&self.registry),
        )
        .with_permit(permit);

        tokio::spawn(async move {
            let outcome = connection.run().await;
            tracing::debug!(session_id = session_id, outcome = ?outcome, "Connection dispatched");
        });
    }

    fn configure_socket(&self, socket: &TcpStream) -> std::io::Result<()> {
        if self.config.tcp_nodelay {
            socket.set_nodelay(true)?;
        }
        Ok(())
    }
}

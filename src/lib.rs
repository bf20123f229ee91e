//! Channel-based file relay
//!
//! Publishers push files into named channels over a line-oriented TCP
//! protocol; every connection subscribed to that channel receives a copy.
//! A small HTTP API exposes the channel list, aggregate statistics, and a
//! second way to submit files.
//!
//! ```text
//!   publisher                    FileServer                     subscribers
//!  ───────────                 ─────────────                   ─────────────
//!  send docs {..}\n ──► dispatcher ──► ChannelRegistry ──► file {..}\n ──► A1
//!                                          │           └─► file {..}\n ──► A2
//!  POST /channels/send ──► api ────────────┘
//!                                                 subscribe docs {}\n ◄── A1
//! ```
//!
//! # Example
//!
//! ```no_run
//! use filecast::{FileServer, ServerConfig};
//!
//! # async fn example() -> filecast::error::Result<()> {
//! let server = FileServer::new(ServerConfig::default());
//! server.run_until(async { let _ = tokio::signal::ctrl_c().await; }).await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod client;
pub mod error;
pub mod files;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod stats;

pub use client::ClientConfig;
pub use error::{Error, Result};
pub use files::OverwritePolicy;
pub use protocol::{Envelope, FilePayload, Request};
pub use registry::{ChannelRegistry, RegistryConfig, Subscriber};
pub use server::{FileServer, ServerConfig};
pub use stats::{ChannelInfo, ServerStats};

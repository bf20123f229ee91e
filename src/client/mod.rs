//! Relay client
//!
//! Provides the two client roles of the protocol:
//! - Publishing a local file to a channel (one-shot connection)
//! - Subscribing to a channel and saving every file it receives

pub mod config;
pub mod publisher;
pub mod receiver;

pub use config::ClientConfig;
pub use publisher::{publish, send_file};
pub use receiver::{FileReceiver, ReceiveSummary};

//! File relay server
//!
//! Accepts TCP connections, dispatches each one on its own task, and
//! optionally serves the admin API next to it.

pub mod config;
pub mod connection;
pub mod listener;

pub use config::ServerConfig;
pub use connection::{Connection, DispatchOutcome};
pub use listener::FileServer;

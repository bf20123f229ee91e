//! Channel registry for file fan-out
//!
//! The registry maps channel names to the connections subscribed to them and
//! delivers each published file to every one of those connections.
//!
//! # Architecture
//!
//! ```text
//!                        Arc<ChannelRegistry>
//!                   ┌──────────────────────────────┐
//!                   │ channels: HashMap<String,    │
//!                   │   ChannelEntry {             │
//!                   │     subscribers: Mutex<      │
//!                   │       peer -> Subscriber>,   │
//!                   │     files_sent, created_at   │
//!                   │   }                          │
//!                   │ >                            │
//!                   └──────────────┬───────────────┘
//!                                  │
//!        ┌─────────────────────────┼─────────────────────────┐
//!        │                         │                         │
//!        ▼                         ▼                         ▼
//!   [dispatcher]              [broadcast]                [stats]
//!   subscribe()               file frame ──► sink        atomics only
//!                             write error ──► evict
//! ```
//!
//! # Locking
//!
//! The channel map sits behind a `RwLock` that is only held long enough to
//! look up or insert an entry. Each entry serializes subscribe, unsubscribe
//! and broadcast through its own `Mutex`, which also keeps successive
//! broadcasts in publish order on every subscriber's stream. Counters are
//! atomics so stats never wait on a broadcast in progress.

pub mod config;
pub mod entry;
pub mod error;
pub mod store;
pub mod subscriber;

pub use config::RegistryConfig;
pub use entry::ChannelEntry;
pub use error::RegistryError;
pub use store::{BroadcastReport, ChannelRegistry};
pub use subscriber::{Subscriber, SubscriberSink};

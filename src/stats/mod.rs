//! Statistics for the admin API
//!
//! Snapshots are computed from the registry on demand; nothing here is
//! cached or updated in the background.

pub mod metrics;

pub use metrics::{ChannelInfo, ServerStats};

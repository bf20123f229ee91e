//! Protocol constants

/// Prefix of a subscribe request line
pub const SUBSCRIBE_PREFIX: &str = "subscribe ";

/// Literal payload carried by a subscribe request
pub const SUBSCRIBE_PAYLOAD: &str = "{}";

/// Prefix of a send request line
pub const SEND_PREFIX: &str = "send ";

/// Prefix of a file frame pushed to subscribers
pub const FILE_PREFIX: &str = "file ";

/// Default port for the socket protocol
pub const DEFAULT_SERVER_PORT: u16 = 8021;

/// Default port for the HTTP admin API
pub const DEFAULT_API_PORT: u16 = 8081;

/// Default upper bound on a single request line (base64 content included)
pub const DEFAULT_MAX_REQUEST_SIZE: usize = 64 * 1024 * 1024;

/// Number of characters of an offending line echoed into error messages
pub const PREVIEW_LEN: usize = 64;

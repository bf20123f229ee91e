//! Line-oriented wire protocol
//!
//! Every message is a single newline-terminated line:
//!
//! ```text
//! Client -> Server
//!   subscribe <channel> {}
//!   send <channel> {"name":"a","extension":".txt","content":"aGVsbG8="}
//!
//! Server -> Subscriber
//!   file {"name":"a","extension":".txt","content":"aGVsbG8="}
//! ```
//!
//! The server never acknowledges a request. A subscribe connection stays
//! open and receives one `file` line per broadcast; a send connection is
//! done after its single line.

pub mod constants;
pub mod envelope;
pub mod error;
pub mod request;

pub use envelope::{Envelope, FilePayload};
pub use error::ProtocolError;
pub use request::{is_valid_channel, parse_file_frame, split_send, Request};

//! RESP2 protocol implementation
//!
//! Request decoding (streaming, per-connection) and reply encoding.
//! Independent of storage and command handling.

mod parser;
mod types;

pub use parser::{parse_stream, Payload};
pub use types::{ProtocolError, Reply};

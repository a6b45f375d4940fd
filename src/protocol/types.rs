//! Reply types for the RESP2 protocol
//!
//! Defines the closed set of reply values the server can put on the wire,
//! together with their exact byte encodings.

use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

const CRLF: &[u8] = b"\r\n";

/// A serializable server reply.
///
/// Every variant has exactly one wire encoding; `encode_to` matches
/// exhaustively so a new variant cannot be forgotten.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Status line: +OK\r\n
    Status(String),

    /// Error line: -ERR message\r\n
    Error(String),

    /// Integer: :1000\r\n
    Int(i64),

    /// Bulk string: $6\r\nfoobar\r\n (binary-safe)
    Bulk(Bytes),

    /// Null bulk string: $-1\r\n
    Null,

    /// Array of bulk strings: *2\r\n$3\r\nfoo\r\n$3\r\nbar\r\n
    /// A `None` element encodes as a null bulk.
    MultiBulk(Vec<Option<Bytes>>),

    /// Empty array: *0\r\n
    EmptyMultiBulk,

    /// PING answer: +PONG\r\n
    Pong,
}

impl Reply {
    /// Create a status reply
    pub fn status(s: impl Into<String>) -> Self {
        Reply::Status(s.into())
    }

    /// Create an error reply
    pub fn error(s: impl Into<String>) -> Self {
        Reply::Error(s.into())
    }

    /// The canonical +OK status
    pub fn ok() -> Self {
        Reply::Status("OK".to_string())
    }

    /// Create a bulk reply from bytes
    pub fn bulk(b: impl Into<Bytes>) -> Self {
        Reply::Bulk(b.into())
    }

    /// Create a multi-bulk reply from non-null elements
    pub fn multi_bulk(items: impl IntoIterator<Item = Bytes>) -> Self {
        Reply::MultiBulk(items.into_iter().map(Some).collect())
    }

    /// Encode this reply to a fresh byte buffer
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::new();
        self.encode_to(&mut buf);
        buf.freeze()
    }

    /// Encode this reply into an existing buffer
    pub fn encode_to(&self, buf: &mut BytesMut) {
        match self {
            Reply::Status(s) => {
                buf.put_u8(b'+');
                buf.put_slice(s.as_bytes());
                buf.put_slice(CRLF);
            }
            Reply::Error(e) => {
                buf.put_u8(b'-');
                buf.put_slice(e.as_bytes());
                buf.put_slice(CRLF);
            }
            Reply::Int(i) => {
                buf.put_u8(b':');
                buf.put_slice(i.to_string().as_bytes());
                buf.put_slice(CRLF);
            }
            Reply::Bulk(bytes) => {
                encode_bulk(buf, bytes);
            }
            Reply::Null => {
                buf.put_slice(b"$-1\r\n");
            }
            Reply::MultiBulk(items) => {
                buf.put_u8(b'*');
                buf.put_slice(items.len().to_string().as_bytes());
                buf.put_slice(CRLF);
                for item in items {
                    match item {
                        Some(bytes) => encode_bulk(buf, bytes),
                        None => buf.put_slice(b"$-1\r\n"),
                    }
                }
            }
            Reply::EmptyMultiBulk => {
                buf.put_slice(b"*0\r\n");
            }
            Reply::Pong => {
                buf.put_slice(b"+PONG\r\n");
            }
        }
    }
}

fn encode_bulk(buf: &mut BytesMut, bytes: &Bytes) {
    buf.put_u8(b'$');
    buf.put_slice(bytes.len().to_string().as_bytes());
    buf.put_slice(CRLF);
    buf.put_slice(bytes);
    buf.put_slice(CRLF);
}

/// Decoding errors.
///
/// `Malformed` discards only the in-flight record; `Io` ends the
/// connection's request stream.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Malformed line, header or length. The decoder resumes on the next line.
    #[error("protocol error: {0}")]
    Malformed(String),

    /// The underlying stream is closed or broken. Terminal.
    #[error("connection lost: {0}")]
    Io(#[from] std::io::Error),
}

impl ProtocolError {
    /// Whether this error terminates the request stream
    pub fn is_fatal(&self) -> bool {
        matches!(self, ProtocolError::Io(_))
    }
}

//! Connection handling
//!
//! Each accepted socket is split in two: the read half feeds the protocol
//! decoder task, the write half stays with the consumer loop below. The
//! decoder sends payloads through an unbounded channel, so requests are
//! processed strictly in order, one at a time per connection.

use crate::database::{Database, Session};
use crate::protocol::{parse_stream, Reply};
use bytes::Bytes;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// One client connection: the reply writer plus session state.
pub struct Connection {
    writer: Mutex<OwnedWriteHalf>,
    addr: SocketAddr,
    db_index: AtomicUsize,
}

impl Connection {
    pub fn new(writer: OwnedWriteHalf, addr: SocketAddr) -> Self {
        Connection {
            writer: Mutex::new(writer),
            addr,
            db_index: AtomicUsize::new(0),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Write raw reply bytes back to the client
    pub async fn write(&self, bytes: &[u8]) -> std::io::Result<()> {
        let mut writer = self.writer.lock().await;
        writer.write_all(bytes).await?;
        writer.flush().await
    }
}

impl Session for Connection {
    fn db_index(&self) -> usize {
        self.db_index.load(Ordering::Relaxed)
    }

    fn select_db(&self, index: usize) {
        self.db_index.store(index, Ordering::Relaxed);
    }
}

/// Serve one client until its stream ends.
///
/// Protocol errors are answered in-band and parsing resumes; the terminal
/// I/O error (or channel closure) ends the loop without further writes.
pub async fn handle(socket: TcpStream, addr: SocketAddr, database: Arc<Database>) {
    let (read_half, write_half) = socket.into_split();
    let connection = Connection::new(write_half, addr);
    let mut payloads = parse_stream(read_half);

    while let Some(payload) = payloads.recv().await {
        match payload {
            Err(err) if err.is_fatal() => {
                debug!("client {} gone: {}", addr, err);
                break;
            }
            Err(err) => {
                warn!("protocol error from {}: {}", addr, err);
                let reply = Reply::error(err.to_string());
                if connection.write(&reply.to_bytes()).await.is_err() {
                    break;
                }
            }
            Ok(request) => {
                let reply = match command_line(request) {
                    Ok(line) => database.execute(&connection, &line),
                    Err(reply) => reply,
                };
                if connection.write(&reply.to_bytes()).await.is_err() {
                    break;
                }
            }
        }
    }

    database.after_client_close(&connection);
}

/// Turn a decoded request into a command line. Multi-bulk requests carry
/// one token per element; a lone bulk is a one-token command; nothing
/// else is executable.
fn command_line(request: Reply) -> Result<Vec<Bytes>, Reply> {
    match request {
        Reply::MultiBulk(items) => {
            let mut line = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Some(token) => line.push(token),
                    None => return Err(Reply::error("ERR null token in command")),
                }
            }
            Ok(line)
        }
        Reply::Bulk(token) => Ok(vec![token]),
        Reply::EmptyMultiBulk => Err(Reply::error("ERR empty command")),
        _ => Err(Reply::error("ERR unsupported request type")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multi_bulk_becomes_a_command_line() {
        let request = Reply::multi_bulk([Bytes::from("DEL"), Bytes::from("a")]);
        let line = command_line(request).unwrap();
        assert_eq!(line, vec![Bytes::from("DEL"), Bytes::from("a")]);
    }

    #[test]
    fn lone_bulk_is_a_single_token_line() {
        let line = command_line(Reply::Bulk(Bytes::from("PING"))).unwrap();
        assert_eq!(line, vec![Bytes::from("PING")]);
    }

    #[test]
    fn non_command_requests_are_rejected() {
        for request in [
            Reply::EmptyMultiBulk,
            Reply::Null,
            Reply::status("OK"),
            Reply::Int(7),
        ] {
            assert!(command_line(request).is_err());
        }
    }
}

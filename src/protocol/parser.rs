//! Streaming RESP2 request decoder
//!
//! Decodes a connection's byte stream into a sequence of [`Payload`] items.
//! The decode loop runs as its own task per connection and feeds the
//! connection's consumer through an unbounded channel, so parsing and
//! command execution overlap.

use super::types::{ProtocolError, Reply};
use bytes::Bytes;
use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::debug;

/// One decoded item: a complete request value, or a decode error.
pub type Payload = Result<Reply, ProtocolError>;

/// Largest accepted bulk length (matches the Redis hard limit).
const MAX_BULK_LEN: i64 = 512 * 1024 * 1024;

/// Decoder state for one in-flight record.
///
/// Reset to its default after every complete record and after every
/// protocol error, so a bad record never leaks into the next one.
#[derive(Default)]
struct ParseState {
    reading_multi_line: bool,
    expected_args_count: usize,
    msg_type: u8,
    args: Vec<Bytes>,
    bulk_len: i64,
}

impl ParseState {
    fn finished(&self) -> bool {
        self.expected_args_count > 0 && self.args.len() == self.expected_args_count
    }

    fn reset(&mut self) {
        *self = ParseState::default();
    }
}

/// Spawn the decode loop for `reader` and return the receiving end of its
/// payload channel.
///
/// The channel yields payloads in request order. It closes after the
/// underlying stream ends or breaks; the final item before closure is the
/// terminal [`ProtocolError::Io`].
pub fn parse_stream<R>(reader: R) -> mpsc::UnboundedReceiver<Payload>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(decode_loop(BufReader::new(reader), tx));
    rx
}

async fn decode_loop<R>(mut reader: R, tx: mpsc::UnboundedSender<Payload>)
where
    R: AsyncBufRead + Unpin,
{
    let mut state = ParseState::default();

    loop {
        let (record, from_bulk) = match read_record(&mut reader, &mut state).await {
            Ok(rec) => rec,
            Err(err) => {
                let fatal = err.is_fatal();
                if tx.send(Err(err)).is_err() || fatal {
                    // Dropping the sender closes the payload stream.
                    return;
                }
                state.reset();
                continue;
            }
        };

        if !state.reading_multi_line {
            match record[0] {
                b'*' => {
                    if let Err(err) = parse_multi_bulk_header(&record, &mut state) {
                        if tx.send(Err(err)).is_err() {
                            return;
                        }
                        state.reset();
                        continue;
                    }
                    // *0 completes immediately, never entering multi-line mode
                    if state.expected_args_count == 0 {
                        if tx.send(Ok(Reply::EmptyMultiBulk)).is_err() {
                            return;
                        }
                        state.reset();
                    }
                }
                b'$' => {
                    if let Err(err) = parse_bulk_header(&record, &mut state) {
                        if tx.send(Err(err)).is_err() {
                            return;
                        }
                        state.reset();
                        continue;
                    }
                    // $-1 is the null bulk, completed immediately
                    if state.bulk_len == -1 {
                        if tx.send(Ok(Reply::Null)).is_err() {
                            return;
                        }
                        state.reset();
                    }
                }
                _ => {
                    let payload = parse_single_line(&record);
                    if tx.send(payload).is_err() {
                        return;
                    }
                    state.reset();
                }
            }
        } else {
            if let Err(err) = read_body(&record, from_bulk, &mut state) {
                if tx.send(Err(err)).is_err() {
                    return;
                }
                state.reset();
                continue;
            }
            if state.finished() {
                let reply = finish_record(&mut state);
                debug!("decoded request: {:?}", reply);
                if tx.send(Ok(reply)).is_err() {
                    return;
                }
            }
        }
    }
}

/// Read the next physical record: a CRLF-terminated line, or, when a bulk
/// length is pending, exactly `bulk_len + 2` raw bytes (binary-safe).
///
/// Returns the raw record and whether it came from a bulk read. A stream
/// that ends mid-record is an I/O failure; a line without a CRLF tail is a
/// protocol error the caller can recover from.
async fn read_record<R>(
    reader: &mut R,
    state: &mut ParseState,
) -> Result<(Vec<u8>, bool), ProtocolError>
where
    R: AsyncBufRead + Unpin,
{
    if state.bulk_len == 0 {
        let mut line = Vec::new();
        let n = reader.read_until(b'\n', &mut line).await?;
        if n == 0 || !line.ends_with(b"\n") {
            return Err(ProtocolError::Io(io::ErrorKind::UnexpectedEof.into()));
        }
        if line.len() < 2 || line[line.len() - 2] != b'\r' {
            return Err(ProtocolError::Malformed(lossy(&line)));
        }
        Ok((line, false))
    } else {
        let mut body = vec![0u8; state.bulk_len as usize + 2];
        reader.read_exact(&mut body).await?;
        state.bulk_len = 0;
        if !body.ends_with(b"\r\n") {
            return Err(ProtocolError::Malformed(lossy(&body)));
        }
        Ok((body, true))
    }
}

/// `*N` header. N = 0 leaves the state idle for the caller to emit an
/// empty multi-bulk; N > 0 switches to multi-line mode.
fn parse_multi_bulk_header(line: &[u8], state: &mut ParseState) -> Result<(), ProtocolError> {
    let count: u32 = parse_decimal(&line[1..line.len() - 2])
        .ok_or_else(|| ProtocolError::Malformed(lossy(line)))?;
    if count == 0 {
        state.expected_args_count = 0;
        return Ok(());
    }
    state.msg_type = line[0];
    state.reading_multi_line = true;
    state.expected_args_count = count as usize;
    state.args = Vec::with_capacity(count as usize);
    Ok(())
}

/// `$N` header at top level. N = -1 marks the null bulk; N > 0 switches to
/// multi-line mode expecting a single body token; anything else is malformed.
fn parse_bulk_header(line: &[u8], state: &mut ParseState) -> Result<(), ProtocolError> {
    let len: i64 = parse_decimal(&line[1..line.len() - 2])
        .ok_or_else(|| ProtocolError::Malformed(lossy(line)))?;
    if len == -1 {
        state.bulk_len = -1;
        return Ok(());
    }
    if len <= 0 || len > MAX_BULK_LEN {
        return Err(ProtocolError::Malformed(lossy(line)));
    }
    state.bulk_len = len;
    state.msg_type = line[0];
    state.reading_multi_line = true;
    state.expected_args_count = 1;
    state.args = Vec::with_capacity(1);
    Ok(())
}

/// Inline single-line record: `+status`, `-error` or `:integer`.
fn parse_single_line(record: &[u8]) -> Payload {
    let token = &record[..record.len() - 2];
    match token.first() {
        Some(b'+') => inline_text(token).map(Reply::Status),
        Some(b'-') => inline_text(token).map(Reply::Error),
        Some(b':') => {
            let value: i64 = parse_decimal(&token[1..])
                .ok_or_else(|| ProtocolError::Malformed(lossy(record)))?;
            Ok(Reply::Int(value))
        }
        _ => Err(ProtocolError::Malformed(lossy(record))),
    }
}

/// A body record in multi-line mode. A `$k` announcement on a header line
/// sets the pending bulk length (`k <= 0` contributes an empty token); a
/// raw bulk read is appended verbatim, so announced bodies stay binary-safe
/// even when they begin with `$`.
fn read_body(record: &[u8], from_bulk: bool, state: &mut ParseState) -> Result<(), ProtocolError> {
    let token = &record[..record.len() - 2];
    if !from_bulk && token.first() == Some(&b'$') {
        let len: i64 = parse_decimal(&token[1..])
            .ok_or_else(|| ProtocolError::Malformed(lossy(record)))?;
        if len > MAX_BULK_LEN {
            return Err(ProtocolError::Malformed(lossy(record)));
        }
        if len <= 0 {
            state.args.push(Bytes::new());
            state.bulk_len = 0;
        } else {
            state.bulk_len = len;
        }
    } else {
        state.args.push(Bytes::copy_from_slice(token));
    }
    Ok(())
}

/// Build the completed record's reply and leave the state idle.
fn finish_record(state: &mut ParseState) -> Reply {
    let args = std::mem::take(&mut state.args);
    let msg_type = state.msg_type;
    state.reset();
    if msg_type == b'*' {
        Reply::multi_bulk(args)
    } else {
        // finished() guarantees exactly one argument for '$' records
        args.into_iter().next().map(Reply::Bulk).unwrap_or(Reply::Null)
    }
}

fn parse_decimal<T: std::str::FromStr>(digits: &[u8]) -> Option<T> {
    std::str::from_utf8(digits).ok()?.parse().ok()
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim_end().to_string()
}

/// Decode the text of a `+status`/`-error` inline line, dropping the leading
/// marker byte. Non-UTF-8 content is a (non-fatal) protocol error.
fn inline_text(token: &[u8]) -> Result<String, ProtocolError> {
    std::str::from_utf8(&token[1..])
        .map(|s| s.to_string())
        .map_err(|_| ProtocolError::Malformed(lossy(token)))
}

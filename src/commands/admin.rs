//! Admin commands (PING, FLUSHDB)

use super::Command;
use crate::database::Db;
use crate::protocol::Reply;
use bytes::Bytes;

/// PING command - Liveness check
///
/// Syntax: PING
pub struct PingCommand;

impl Command for PingCommand {
    fn name(&self) -> &'static str {
        "PING"
    }

    fn arity(&self) -> i32 {
        1
    }

    fn execute(&self, _db: &Db, _args: &[Bytes]) -> Reply {
        Reply::Pong
    }
}

/// FLUSHDB command - Remove all keys from the current database
///
/// Syntax: FLUSHDB
pub struct FlushDbCommand;

impl Command for FlushDbCommand {
    fn name(&self) -> &'static str {
        "FLUSHDB"
    }

    fn arity(&self) -> i32 {
        -1
    }

    fn execute(&self, db: &Db, _args: &[Bytes]) -> Reply {
        db.flush();
        Reply::ok()
    }
}

//! Command execution module
//!
//! Every command is a unit struct implementing the [`Command`] trait and is
//! registered into the [`CommandRegistry`] at startup. The dispatcher only
//! ever sees trait objects, keeping command implementations and routing
//! loosely coupled.

mod registry;

// Command implementations
mod admin;
mod key;
mod search;

pub use registry::CommandRegistry;

use crate::database::Db;
use crate::protocol::Reply;
use bytes::Bytes;

/// A named, arity-checked command.
pub trait Command: Send + Sync {
    /// The command name used for registration and lookup (case-insensitive)
    fn name(&self) -> &'static str;

    /// Arity contract, counting the command name itself: a positive value
    /// requires exactly that many tokens, a negative value at least that
    /// many (absolute value).
    fn arity(&self) -> i32;

    /// Execute against a logical database. `args` excludes the command
    /// name. Executors are synchronous and must not panic; every failure
    /// mode is an `Error` reply.
    fn execute(&self, db: &Db, args: &[Bytes]) -> Reply;
}

/// Decode a command argument into a store key.
pub(crate) fn key_from(arg: &Bytes) -> String {
    String::from_utf8_lossy(arg).into_owned()
}

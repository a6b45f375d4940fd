//! Command dispatcher
//!
//! Routes a decoded command line to its handler: registry lookup by
//! lower-cased name, arity validation, then execution with the command
//! name stripped. Every failure mode is an `Error` reply; dispatch never
//! panics and never blocks.

use crate::commands::CommandRegistry;
use crate::database::Db;
use crate::protocol::Reply;
use bytes::Bytes;
use tracing::{debug, warn};

/// Command dispatcher bound to an immutable registry.
pub struct Dispatcher {
    registry: CommandRegistry,
}

impl Dispatcher {
    /// Create a dispatcher over an explicitly constructed registry
    pub fn new(registry: CommandRegistry) -> Self {
        Dispatcher { registry }
    }

    /// Dispatch one command line against a logical database.
    ///
    /// `line` holds every token including the command name.
    pub fn dispatch(&self, db: &Db, line: &[Bytes]) -> Reply {
        let name_token = match line.first() {
            Some(token) => token,
            None => return Reply::error("ERR empty command"),
        };

        let name = match std::str::from_utf8(name_token) {
            Ok(name) => name.to_lowercase(),
            Err(_) => return Reply::error("ERR invalid command name encoding"),
        };

        let command = match self.registry.get(&name) {
            Some(command) => command,
            None => {
                warn!("unknown command: {}", name);
                return Reply::error(format!("ERR unknown command {name}"));
            }
        };

        if !arity_matches(command.arity(), line.len()) {
            return Reply::error(format!(
                "ERR wrong number of arguments for '{name}' command"
            ));
        }

        debug!("dispatching command: {}", name);
        command.execute(db, &line[1..])
    }
}

/// Positive arity requires exactly that many tokens; negative arity
/// requires at least its absolute value.
fn arity_matches(arity: i32, tokens: usize) -> bool {
    if arity > 0 {
        tokens == arity as usize
    } else {
        tokens >= arity.unsigned_abs() as usize
    }
}

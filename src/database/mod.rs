//! Database façade
//!
//! Binds the logical databases to the dispatcher and exposes the single
//! entry point the connection layer calls. The façade never panics:
//! every failure mode comes back as an `Error` reply.

mod db;

pub use db::Db;

use crate::commands::CommandRegistry;
use crate::dispatch::Dispatcher;
use crate::protocol::Reply;
use bytes::Bytes;
use std::sync::Arc;
use tracing::info;

/// Default number of logical databases, as in stock Redis.
pub const DEFAULT_DATABASES: usize = 16;

/// Per-connection session state the façade needs. Implemented by the TCP
/// connection type; a trait so the façade stays independent of the
/// transport and future SELECT-style commands keep working.
pub trait Session: Send + Sync {
    /// The logical database this session currently targets
    fn db_index(&self) -> usize;

    /// Retarget the session at another logical database
    fn select_db(&self, index: usize);
}

/// The command-execution engine: all logical databases plus the
/// dispatcher that routes command lines into them.
pub struct Database {
    db_set: Vec<Arc<Db>>,
    dispatcher: Dispatcher,
}

impl Database {
    /// Create the engine with `databases` logical databases (at least one)
    pub fn new(databases: usize) -> Self {
        let db_set = (0..databases.max(1)).map(|i| Arc::new(Db::new(i))).collect();
        Database {
            db_set,
            dispatcher: Dispatcher::new(CommandRegistry::new()),
        }
    }

    /// Execute one command line for a session and return its reply.
    ///
    /// `line` holds every token including the command name.
    pub fn execute(&self, session: &dyn Session, line: &[Bytes]) -> Reply {
        let index = session.db_index();
        match self.db_set.get(index) {
            Some(db) => self.dispatcher.dispatch(db, line),
            None => Reply::error(format!("ERR DB index {index} is out of range")),
        }
    }

    /// Number of logical databases
    pub fn db_count(&self) -> usize {
        self.db_set.len()
    }

    /// Direct access to a logical database (seeding, tests, admin surfaces)
    pub fn db(&self, index: usize) -> Option<&Arc<Db>> {
        self.db_set.get(index)
    }

    /// Engine shutdown hook. Nothing to persist today.
    pub fn close(&self) {
        info!("database engine closed");
    }

    /// Per-client teardown hook. No per-client engine state today.
    pub fn after_client_close(&self, _session: &dyn Session) {}
}

impl Default for Database {
    fn default() -> Self {
        Self::new(DEFAULT_DATABASES)
    }
}

//! Key commands (DEL, EXISTS, TYPE, RENAME, RENAMENX)

use super::{key_from, Command};
use crate::database::Db;
use crate::protocol::Reply;
use crate::store::RenameOutcome;
use bytes::Bytes;

/// DEL command - Delete one or more keys
///
/// Syntax: DEL key [key ...]
///
/// Replies with the number of keys actually removed.
pub struct DelCommand;

impl Command for DelCommand {
    fn name(&self) -> &'static str {
        "DEL"
    }

    fn arity(&self) -> i32 {
        -2
    }

    fn execute(&self, db: &Db, args: &[Bytes]) -> Reply {
        let keys: Vec<String> = args.iter().map(key_from).collect();
        let removed = db.removes(&keys);
        Reply::Int(removed as i64)
    }
}

/// EXISTS command - Count how many of the given keys are present
///
/// Syntax: EXISTS key [key ...]
pub struct ExistsCommand;

impl Command for ExistsCommand {
    fn name(&self) -> &'static str {
        "EXISTS"
    }

    fn arity(&self) -> i32 {
        -2
    }

    fn execute(&self, db: &Db, args: &[Bytes]) -> Reply {
        let mut present = 0;
        for arg in args {
            if db.get_entity(&key_from(arg)).is_some() {
                present += 1;
            }
        }
        Reply::Int(present)
    }
}

/// TYPE command - Report the kind of value stored under a key
///
/// Syntax: TYPE key
pub struct TypeCommand;

impl Command for TypeCommand {
    fn name(&self) -> &'static str {
        "TYPE"
    }

    fn arity(&self) -> i32 {
        2
    }

    fn execute(&self, db: &Db, args: &[Bytes]) -> Reply {
        match db.get_entity(&key_from(&args[0])) {
            Some(entity) => Reply::status(entity.type_name()),
            None => Reply::status("none"),
        }
    }
}

/// RENAME command - Move the entity under one key to another
///
/// Syntax: RENAME source destination
///
/// Overwrites the destination. Errs when the source does not exist.
pub struct RenameCommand;

impl Command for RenameCommand {
    fn name(&self) -> &'static str {
        "RENAME"
    }

    fn arity(&self) -> i32 {
        3
    }

    fn execute(&self, db: &Db, args: &[Bytes]) -> Reply {
        let src = key_from(&args[0]);
        let dst = key_from(&args[1]);
        match db.rename(&src, &dst) {
            RenameOutcome::MissingSource => Reply::error("no such key"),
            // a plain rename never refuses on an existing target
            _ => Reply::ok(),
        }
    }
}

/// RENAMENX command - RENAME that refuses to overwrite the destination
///
/// Syntax: RENAMENX source destination
///
/// Replies :1 on success, :0 when the destination already exists.
pub struct RenameNxCommand;

impl Command for RenameNxCommand {
    fn name(&self) -> &'static str {
        "RENAMENX"
    }

    fn arity(&self) -> i32 {
        3
    }

    fn execute(&self, db: &Db, args: &[Bytes]) -> Reply {
        let src = key_from(&args[0]);
        let dst = key_from(&args[1]);
        match db.rename_nx(&src, &dst) {
            RenameOutcome::Renamed => Reply::Int(1),
            RenameOutcome::TargetExists => Reply::Int(0),
            RenameOutcome::MissingSource => Reply::error("no such key"),
        }
    }
}

//! Search commands (KEYS)

use super::Command;
use crate::database::Db;
use crate::protocol::Reply;
use bytes::Bytes;
use glob_match::glob_match;

/// KEYS command - Find all keys matching a glob pattern
///
/// Syntax: KEYS pattern
///
/// The pattern language is the matcher crate's: `*`, `?`, character
/// classes and literals, matched case-sensitively over the whole key.
pub struct KeysCommand;

impl Command for KeysCommand {
    fn name(&self) -> &'static str {
        "KEYS"
    }

    fn arity(&self) -> i32 {
        2
    }

    fn execute(&self, db: &Db, args: &[Bytes]) -> Reply {
        let pattern = match std::str::from_utf8(&args[0]) {
            Ok(p) => p,
            Err(_) => return Reply::error("ERR invalid pattern encoding"),
        };

        let mut matches = Vec::new();
        db.for_each(|key, _| {
            if glob_match(pattern, key) {
                matches.push(Bytes::copy_from_slice(key.as_bytes()));
            }
            true
        });

        Reply::multi_bulk(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Entity;
    use std::sync::Arc;

    fn db_with(keys: &[&str]) -> Db {
        let db = Db::new(0);
        for key in keys {
            db.put_entity(key.to_string(), Arc::new(Entity::str("v")));
        }
        db
    }

    fn matched_keys(reply: Reply) -> Vec<String> {
        match reply {
            Reply::MultiBulk(items) => {
                let mut keys: Vec<String> = items
                    .into_iter()
                    .flatten()
                    .map(|b| String::from_utf8_lossy(&b).into_owned())
                    .collect();
                keys.sort();
                keys
            }
            other => panic!("expected a multi-bulk reply, got {:?}", other),
        }
    }

    #[test]
    fn wildcard_matches_everything() {
        let db = db_with(&["foo", "bar"]);
        let reply = KeysCommand.execute(&db, &[Bytes::from("*")]);
        assert_eq!(matched_keys(reply), vec!["bar", "foo"]);
    }

    #[test]
    fn prefix_pattern() {
        let db = db_with(&["user:1", "user:2", "session:1"]);
        let reply = KeysCommand.execute(&db, &[Bytes::from("user:*")]);
        assert_eq!(matched_keys(reply), vec!["user:1", "user:2"]);
    }

    #[test]
    fn question_mark_matches_one_character() {
        let db = db_with(&["key1", "key12"]);
        let reply = KeysCommand.execute(&db, &[Bytes::from("key?")]);
        assert_eq!(matched_keys(reply), vec!["key1"]);
    }

    #[test]
    fn no_match_is_an_empty_multi_bulk() {
        let db = db_with(&["foo"]);
        let reply = KeysCommand.execute(&db, &[Bytes::from("nope*")]);
        assert_eq!(reply, Reply::MultiBulk(vec![]));
    }
}

//! A single logical database

use crate::store::{Dict, Entity, RenameOutcome};
use std::sync::Arc;

/// One logical database: an index and the concurrent dictionary holding
/// its keys. Created at process start, lives for the process lifetime;
/// `flush` empties the dictionary in place.
pub struct Db {
    index: usize,
    data: Dict,
}

impl Db {
    pub fn new(index: usize) -> Self {
        Db {
            index,
            data: Dict::new(),
        }
    }

    /// The logical database number
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn get_entity(&self, key: &str) -> Option<Arc<Entity>> {
        self.data.get(key)
    }

    /// Insert unconditionally; returns the number of new keys (0 or 1)
    pub fn put_entity(&self, key: String, entity: Arc<Entity>) -> usize {
        self.data.put(key, entity)
    }

    /// Insert only when absent; returns 1 on insert
    pub fn put_if_absent(&self, key: String, entity: Arc<Entity>) -> usize {
        self.data.put_if_absent(key, entity)
    }

    /// Overwrite only when present; returns 1 on overwrite
    pub fn put_if_exists(&self, key: String, entity: Arc<Entity>) -> usize {
        self.data.put_if_exists(key, entity)
    }

    pub fn remove(&self, key: &str) -> usize {
        self.data.remove(key)
    }

    /// Remove several keys; returns the count actually removed
    pub fn removes<S: AsRef<str>>(&self, keys: &[S]) -> usize {
        self.data.remove_all(keys)
    }

    pub fn rename(&self, src: &str, dst: &str) -> RenameOutcome {
        self.data.rename(src, dst)
    }

    pub fn rename_nx(&self, src: &str, dst: &str) -> RenameOutcome {
        self.data.rename_nx(src, dst)
    }

    pub fn flush(&self) {
        self.data.clear();
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Visit every live (key, entity) pair; the visitor returns `false`
    /// to stop early
    pub fn for_each(&self, visitor: impl FnMut(&str, &Arc<Entity>) -> bool) {
        self.data.for_each(visitor)
    }

    pub fn keys(&self) -> Vec<String> {
        self.data.keys()
    }

    pub fn random_keys(&self, limit: usize) -> Vec<String> {
        self.data.random_keys(limit)
    }

    pub fn random_distinct_keys(&self, limit: usize) -> Vec<String> {
        self.data.random_distinct_keys(limit)
    }
}

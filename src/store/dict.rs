//! Sharded concurrent dictionary
//!
//! The shared map behind every logical database. Keys are spread across a
//! fixed set of shards by SipHash-1-3; each shard is an independent
//! `RwLock`-protected `HashMap`, so per-key operations contend only with
//! operations on the same shard. Check-and-act primitives run under the
//! shard's write lock, which makes them atomic under true parallelism.

use super::entity::Entity;
use parking_lot::RwLock;
use rand::seq::SliceRandom;
use siphasher::sip::SipHasher13;
use std::collections::HashMap;
use std::hash::{BuildHasherDefault, Hash, Hasher};
use std::sync::Arc;

type ShardMap = HashMap<String, Arc<Entity>, BuildHasherDefault<SipHasher13>>;

/// Outcome of a rename operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameOutcome {
    /// The entity now lives under the destination key
    Renamed,
    /// The source key does not exist; nothing changed
    MissingSource,
    /// Refused because the destination exists (RENAMENX only)
    TargetExists,
}

/// A thread-safe string-keyed map from key to entity.
pub struct Dict {
    shards: Box<[RwLock<ShardMap>]>,
}

impl Dict {
    /// Create a dict with one shard per CPU core (clamped to 1..=16)
    pub fn new() -> Self {
        Self::with_shards(num_cpus::get().clamp(1, 16))
    }

    /// Create a dict with an explicit shard count
    pub fn with_shards(count: usize) -> Self {
        let shards = (0..count.max(1))
            .map(|_| RwLock::new(ShardMap::default()))
            .collect();
        Dict { shards }
    }

    fn shard_index(&self, key: &str) -> usize {
        let mut hasher = SipHasher13::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % self.shards.len()
    }

    fn shard(&self, key: &str) -> &RwLock<ShardMap> {
        &self.shards[self.shard_index(key)]
    }

    /// Look up a key
    pub fn get(&self, key: &str) -> Option<Arc<Entity>> {
        self.shard(key).read().get(key).cloned()
    }

    /// Insert unconditionally. Returns the number of new keys created
    /// (1 if the key was absent, 0 if it was overwritten).
    pub fn put(&self, key: String, entity: Arc<Entity>) -> usize {
        match self.shard(&key).write().insert(key, entity) {
            Some(_) => 0,
            None => 1,
        }
    }

    /// Insert only if the key is absent. Returns 1 on insert, 0 otherwise.
    pub fn put_if_absent(&self, key: String, entity: Arc<Entity>) -> usize {
        let mut shard = self.shard(&key).write();
        match shard.entry(key) {
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(entity);
                1
            }
            std::collections::hash_map::Entry::Occupied(_) => 0,
        }
    }

    /// Overwrite only if the key exists. Returns 1 on overwrite, 0 otherwise.
    pub fn put_if_exists(&self, key: String, entity: Arc<Entity>) -> usize {
        let mut shard = self.shard(&key).write();
        match shard.entry(key) {
            std::collections::hash_map::Entry::Occupied(mut slot) => {
                slot.insert(entity);
                1
            }
            std::collections::hash_map::Entry::Vacant(_) => 0,
        }
    }

    /// Remove a key. Returns 1 if it existed, 0 otherwise.
    pub fn remove(&self, key: &str) -> usize {
        match self.shard(key).write().remove(key) {
            Some(_) => 1,
            None => 0,
        }
    }

    /// Remove several keys independently. Returns the count actually removed.
    pub fn remove_all<S: AsRef<str>>(&self, keys: &[S]) -> usize {
        keys.iter().map(|key| self.remove(key.as_ref())).sum()
    }

    /// Move the entity under `src` to `dst`, overwriting any previous `dst`.
    ///
    /// The affected shard locks are taken in index order, so the check and
    /// the move are one step: no concurrent writer can slip in between.
    pub fn rename(&self, src: &str, dst: &str) -> RenameOutcome {
        self.rename_inner(src, dst, false)
    }

    /// Like `rename`, but refuses when `dst` already exists. The target is
    /// checked before the source, so a missing source with an existing
    /// target reports `TargetExists`.
    pub fn rename_nx(&self, src: &str, dst: &str) -> RenameOutcome {
        self.rename_inner(src, dst, true)
    }

    fn rename_inner(&self, src: &str, dst: &str, nx: bool) -> RenameOutcome {
        let src_idx = self.shard_index(src);
        let dst_idx = self.shard_index(dst);

        if src_idx == dst_idx {
            let mut shard = self.shards[src_idx].write();
            if nx && shard.contains_key(dst) {
                return RenameOutcome::TargetExists;
            }
            return match shard.remove(src) {
                Some(entity) => {
                    shard.insert(dst.to_string(), entity);
                    RenameOutcome::Renamed
                }
                None => RenameOutcome::MissingSource,
            };
        }

        // Lock order by shard index so a concurrent reverse rename cannot
        // deadlock against this one.
        let (lo, hi) = if src_idx < dst_idx {
            (src_idx, dst_idx)
        } else {
            (dst_idx, src_idx)
        };
        let mut first = self.shards[lo].write();
        let mut second = self.shards[hi].write();
        let (src_map, dst_map) = if src_idx == lo {
            (&mut *first, &mut *second)
        } else {
            (&mut *second, &mut *first)
        };

        if nx && dst_map.contains_key(dst) {
            return RenameOutcome::TargetExists;
        }
        match src_map.remove(src) {
            Some(entity) => {
                dst_map.insert(dst.to_string(), entity);
                RenameOutcome::Renamed
            }
            None => RenameOutcome::MissingSource,
        }
    }

    /// Atomically empty every shard in place.
    pub fn clear(&self) {
        for shard in self.shards.iter() {
            shard.write().clear();
        }
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.read().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Visit every live (key, entity) pair. The visitor returns `false` to
    /// stop early. Shards are visited one at a time, so the traversal is
    /// safe against concurrent mutation but is not a consistent snapshot.
    pub fn for_each(&self, mut visitor: impl FnMut(&str, &Arc<Entity>) -> bool) {
        for shard in self.shards.iter() {
            let shard = shard.read();
            for (key, entity) in shard.iter() {
                if !visitor(key, entity) {
                    return;
                }
            }
        }
    }

    /// All current keys, in no particular order.
    pub fn keys(&self) -> Vec<String> {
        let mut result = Vec::with_capacity(self.len());
        self.for_each(|key, _| {
            result.push(key.to_string());
            true
        });
        result
    }

    /// Sample keys with replacement. Returns exactly
    /// `min(limit, key_count)` keys.
    pub fn random_keys(&self, limit: usize) -> Vec<String> {
        let keys = self.keys();
        if keys.is_empty() {
            return Vec::new();
        }
        let mut rng = rand::thread_rng();
        (0..limit.min(keys.len()))
            .filter_map(|_| keys.choose(&mut rng).cloned())
            .collect()
    }

    /// Sample distinct keys. Returns exactly `min(limit, key_count)` keys.
    pub fn random_distinct_keys(&self, limit: usize) -> Vec<String> {
        let keys = self.keys();
        let mut rng = rand::thread_rng();
        keys.choose_multiple(&mut rng, limit).cloned().collect()
    }
}

impl Default for Dict {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::thread;

    fn entity(payload: &str) -> Arc<Entity> {
        Arc::new(Entity::str(payload.to_string()))
    }

    #[test]
    fn put_reports_new_keys() {
        let dict = Dict::with_shards(4);
        assert_eq!(dict.put("a".into(), entity("1")), 1);
        assert_eq!(dict.put("a".into(), entity("2")), 0);
        assert_eq!(dict.get("a").unwrap().as_str().unwrap(), "2");
    }

    #[test]
    fn put_if_absent_never_overwrites() {
        let dict = Dict::with_shards(4);
        assert_eq!(dict.put_if_absent("a".into(), entity("1")), 1);
        assert_eq!(dict.put_if_absent("a".into(), entity("2")), 0);
        assert_eq!(dict.get("a").unwrap().as_str().unwrap(), "1");
    }

    #[test]
    fn put_if_exists_never_creates() {
        let dict = Dict::with_shards(4);
        assert_eq!(dict.put_if_exists("a".into(), entity("1")), 0);
        assert!(dict.get("a").is_none());

        dict.put("a".into(), entity("1"));
        assert_eq!(dict.put_if_exists("a".into(), entity("2")), 1);
        assert_eq!(dict.get("a").unwrap().as_str().unwrap(), "2");
    }

    #[test]
    fn remove_absent_key_is_a_noop() {
        let dict = Dict::with_shards(4);
        assert_eq!(dict.remove("missing"), 0);

        dict.put("a".into(), entity("1"));
        assert_eq!(dict.remove("a"), 1);
        assert_eq!(dict.remove("a"), 0);
    }

    #[test]
    fn remove_all_counts_only_present_keys() {
        let dict = Dict::with_shards(4);
        dict.put("a".into(), entity("1"));
        dict.put("b".into(), entity("2"));
        assert_eq!(dict.remove_all(&["a", "b", "c"]), 2);
        assert!(dict.is_empty());
    }

    #[test]
    fn clear_is_idempotent() {
        let dict = Dict::with_shards(4);
        dict.put("a".into(), entity("1"));
        dict.put("b".into(), entity("2"));
        dict.clear();
        assert!(dict.is_empty());
        dict.clear();
        assert!(dict.is_empty());
    }

    #[test]
    fn rename_moves_the_entity() {
        let dict = Dict::with_shards(4);
        dict.put("src".into(), entity("v"));
        assert_eq!(dict.rename("src", "dst"), RenameOutcome::Renamed);
        assert!(dict.get("src").is_none());
        assert_eq!(dict.get("dst").unwrap().as_str().unwrap(), "v");
    }

    #[test]
    fn rename_missing_source() {
        let dict = Dict::with_shards(4);
        assert_eq!(dict.rename("src", "dst"), RenameOutcome::MissingSource);
    }

    #[test]
    fn rename_nx_refuses_existing_target() {
        let dict = Dict::with_shards(4);
        dict.put("src".into(), entity("a"));
        dict.put("dst".into(), entity("b"));
        assert_eq!(dict.rename_nx("src", "dst"), RenameOutcome::TargetExists);
        // both keys unchanged
        assert_eq!(dict.get("src").unwrap().as_str().unwrap(), "a");
        assert_eq!(dict.get("dst").unwrap().as_str().unwrap(), "b");
    }

    #[test]
    fn rename_nx_checks_target_before_source() {
        let dict = Dict::with_shards(4);
        dict.put("dst".into(), entity("b"));
        assert_eq!(dict.rename_nx("missing", "dst"), RenameOutcome::TargetExists);
    }

    #[test]
    fn for_each_stops_early() {
        let dict = Dict::with_shards(4);
        for i in 0..10 {
            dict.put(format!("key{i}"), entity("v"));
        }
        let mut seen = 0;
        dict.for_each(|_, _| {
            seen += 1;
            seen < 3
        });
        assert_eq!(seen, 3);
    }

    #[test]
    fn random_key_sampling_is_sized_by_limit_and_population() {
        let dict = Dict::with_shards(4);
        for i in 0..5 {
            dict.put(format!("key{i}"), entity("v"));
        }
        assert_eq!(dict.random_keys(3).len(), 3);
        assert_eq!(dict.random_keys(10).len(), 5);
        assert_eq!(dict.random_distinct_keys(10).len(), 5);

        let distinct = dict.random_distinct_keys(4);
        assert_eq!(distinct.len(), 4);
        let unique: std::collections::HashSet<_> = distinct.iter().collect();
        assert_eq!(unique.len(), 4);

        let empty = Dict::with_shards(4);
        assert!(empty.random_keys(3).is_empty());
        assert!(empty.random_distinct_keys(3).is_empty());
    }

    #[test]
    fn concurrent_put_if_absent_has_exactly_one_winner() {
        let dict = Arc::new(Dict::with_shards(4));

        for round in 0..50 {
            let key = format!("key{round}");
            let barrier = Arc::new(Barrier::new(2));

            let handles: Vec<_> = (0..2)
                .map(|writer| {
                    let dict = dict.clone();
                    let key = key.clone();
                    let barrier = barrier.clone();
                    thread::spawn(move || {
                        barrier.wait();
                        dict.put_if_absent(key, entity(&format!("w{writer}")))
                    })
                })
                .collect();

            let wins: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
            assert_eq!(wins, 1, "exactly one writer may insert");

            let stored = dict.get(&key).unwrap();
            let value = stored.as_str().unwrap();
            assert!(value == "w0" || value == "w1");
        }
    }

    #[test]
    fn concurrent_renames_do_not_deadlock() {
        // Opposite-direction renames across many shards; ordered locking
        // must let both threads finish.
        let dict = Arc::new(Dict::with_shards(8));
        dict.put("a".into(), entity("1"));
        dict.put("b".into(), entity("2"));

        let barrier = Arc::new(Barrier::new(2));
        let forward = {
            let dict = dict.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..1000 {
                    dict.rename("a", "b");
                }
            })
        };
        let backward = {
            let dict = dict.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..1000 {
                    dict.rename("b", "a");
                }
            })
        };

        forward.join().unwrap();
        backward.join().unwrap();
        assert_eq!(dict.len(), 1);
    }
}

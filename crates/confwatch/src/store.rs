//! Key to value mapping of every entry known so far.
//!
//! [`ConfigStore`] is owned by the watch client and mutated only on the
//! client's write path. Readers get a [`ConfigMap`] snapshot, which shares
//! the underlying map until the next replace (copy-on-write), so taking a
//! snapshot is O(1) and never observes a later swap.

use std::collections::HashMap;
use std::collections::hash_map;
use std::sync::Arc;

use crate::value::Value;

/// Mapping from entry key to its most recent [`Value`].
///
/// Every key that was ever fetched successfully has exactly one value, the
/// latest. A failed fetch never reaches the store, so the previous value
/// stays in place.
#[derive(Debug, Default)]
pub struct ConfigStore {
    entries: Arc<HashMap<String, Value>>,

    /// Incremented on each replace.
    epoch: u64,
}

impl ConfigStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached value for `key`, if any.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Returns `true` if `key` has a cached value.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Swap in a new value for `key`, returning the previous one.
    ///
    /// Only `key` is touched; other entries keep their values.
    pub fn replace(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        let old = Arc::make_mut(&mut self.entries).insert(key.into(), value);
        self.epoch += 1;
        old
    }

    /// Insert `value` only if `key` has nothing cached yet.
    ///
    /// Returns the value that ends up cached, which is the existing one when
    /// a concurrent reload got there first.
    pub fn insert_if_absent(&mut self, key: &str, value: Value) -> Value {
        if let Some(existing) = self.entries.get(key) {
            return existing.clone();
        }

        self.replace(key, value.clone());
        value
    }

    /// Take a point-in-time snapshot of the whole mapping.
    #[must_use]
    pub fn snapshot(&self) -> ConfigMap {
        ConfigMap {
            entries: Arc::clone(&self.entries),
        }
    }

    /// Number of replaces performed so far.
    #[must_use]
    pub const fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing has been cached yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Read-only snapshot returned by [`WatchClient::get_all`](crate::WatchClient::get_all).
///
/// Contains every key that was watched or fetched before the snapshot was
/// taken; it is not a listing of the remote namespace.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConfigMap {
    entries: Arc<HashMap<String, Value>>,
}

impl ConfigMap {
    /// The value for `key`, or [`Value::empty`] if it is not in the snapshot.
    #[must_use]
    pub fn get(&self, key: &str) -> Value {
        self.entries.get(key).cloned().unwrap_or_default()
    }

    /// The value for `key`, distinguishing absence from empty content.
    #[must_use]
    pub fn get_opt(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Returns `true` if the snapshot holds `key`.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Keys in the snapshot, in arbitrary order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Iterate over `(key, value)` pairs.
    pub fn iter(&self) -> hash_map::Iter<'_, String, Value> {
        self.entries.iter()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the snapshot is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a ConfigMap {
    type Item = (&'a String, &'a Value);
    type IntoIter = hash_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_and_get() {
        let mut store = ConfigStore::new();
        assert!(store.is_empty());
        assert_eq!(store.epoch(), 0);

        assert!(store.replace("app.toml", Value::new("a = 1")).is_none());
        assert_eq!(store.get("app.toml"), Some(&Value::new("a = 1")));
        assert_eq!(store.epoch(), 1);

        let old = store.replace("app.toml", Value::new("a = 2"));
        assert_eq!(old, Some(Value::new("a = 1")));
        assert_eq!(store.len(), 1);
        assert_eq!(store.epoch(), 2);
    }

    #[test]
    fn test_replace_leaves_other_keys() {
        let mut store = ConfigStore::new();
        store.replace("a", Value::new("1"));
        store.replace("b", Value::new("2"));
        store.replace("a", Value::new("3"));

        assert_eq!(store.get("b"), Some(&Value::new("2")));
    }

    #[test]
    fn test_snapshot_is_isolated_from_later_swaps() {
        let mut store = ConfigStore::new();
        store.replace("a", Value::new("old"));

        let snapshot = store.snapshot();
        store.replace("a", Value::new("new"));
        store.replace("b", Value::new("added"));

        assert_eq!(snapshot.get("a").raw(), Some("old"));
        assert!(!snapshot.contains_key("b"));
        assert_eq!(store.snapshot().get("a").raw(), Some("new"));
    }

    #[test]
    fn test_insert_if_absent_keeps_existing() {
        let mut store = ConfigStore::new();
        let first = store.insert_if_absent("k", Value::new("fetched"));
        assert_eq!(first.raw(), Some("fetched"));

        let second = store.insert_if_absent("k", Value::new("late"));
        assert_eq!(second.raw(), Some("fetched"));
        assert_eq!(store.epoch(), 1);
    }

    #[test]
    fn test_config_map_missing_key_is_empty() {
        let store = ConfigStore::new();
        let map = store.snapshot();

        assert!(!map.get("nope").exists());
        assert!(map.get_opt("nope").is_none());
        assert!(map.is_empty());
    }

    #[test]
    fn test_config_map_iteration() {
        let mut store = ConfigStore::new();
        store.replace("x", Value::new("1"));
        store.replace("y", Value::new("2"));

        let map = store.snapshot();
        let mut keys: Vec<&str> = map.keys().collect();
        keys.sort_unstable();
        assert_eq!(keys, ["x", "y"]);
        assert_eq!((&map).into_iter().count(), 2);
    }
}

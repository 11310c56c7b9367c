//! In-process remote backend.

use std::collections::HashMap;
use std::thread;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::debug;

use super::{ChangeListener, RemoteConfig, RemoteConnect};
use crate::config::ClientConfig;
use crate::error::{ConfigError, RemoteError};

type EntryId = (String, String);

/// Thread-safe in-memory [`RemoteConfig`].
///
/// Entries are plain strings keyed by `(group, key)`. [`publish`](Self::publish)
/// stores new content and invokes the registered listeners on the calling
/// thread, the way a real backend would from its delivery thread.
///
/// Built through [`RemoteConnect`] it takes the namespace from the client
/// configuration; servers are never contacted.
///
/// # Example
///
/// ```rust
/// use confwatch::remote::{MemoryRemote, RemoteConfig};
///
/// let remote = MemoryRemote::new();
/// remote.set("billing", "db.toml", "pool = 4");
/// assert_eq!(remote.fetch("billing", "db.toml").unwrap(), "pool = 4");
/// ```
#[derive(Default)]
pub struct MemoryRemote {
    namespace: String,
    latency: Duration,
    entries: RwLock<HashMap<EntryId, String>>,
    listeners: RwLock<HashMap<EntryId, Vec<ChangeListener>>>,
}

impl MemoryRemote {
    /// Create an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the namespace reported in diagnostics.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Delay every fetch by `latency`, like a slow service would.
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// The namespace this backend serves.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Store content without notifying anyone.
    pub fn set(&self, group: &str, key: &str, content: impl Into<String>) {
        self.entries
            .write()
            .insert(entry_id(group, key), content.into());
    }

    /// Store content and notify every listener registered for the entry.
    ///
    /// Returns the number of listeners invoked.
    pub fn publish(&self, group: &str, key: &str, content: impl Into<String>) -> usize {
        let content = content.into();
        self.set(group, key, content.clone());
        self.notify(group, key, &content)
    }

    /// Invoke the listeners of an entry without storing anything.
    ///
    /// Simulates a duplicate or out-of-date notification whose payload no
    /// longer matches the stored content.
    pub fn notify(&self, group: &str, key: &str, content: &str) -> usize {
        // Clone out so listeners run without holding our lock.
        let listeners = self
            .listeners
            .read()
            .get(&entry_id(group, key))
            .cloned()
            .unwrap_or_default();

        for listener in &listeners {
            listener(key, content);
        }

        listeners.len()
    }

    /// Delete an entry. Later fetches return [`RemoteError::NotFound`].
    pub fn remove(&self, group: &str, key: &str) -> Option<String> {
        self.entries.write().remove(&entry_id(group, key))
    }

    /// Number of listeners registered for an entry.
    #[must_use]
    pub fn listener_count(&self, group: &str, key: &str) -> usize {
        self.listeners
            .read()
            .get(&entry_id(group, key))
            .map_or(0, Vec::len)
    }
}

impl RemoteConfig for MemoryRemote {
    fn name(&self) -> &str {
        "memory"
    }

    fn fetch(&self, group: &str, key: &str) -> Result<String, RemoteError> {
        if !self.latency.is_zero() {
            thread::sleep(self.latency);
        }

        self.entries
            .read()
            .get(&entry_id(group, key))
            .cloned()
            .ok_or_else(|| RemoteError::not_found(group, key))
    }

    fn register_listener(
        &self,
        group: &str,
        key: &str,
        listener: ChangeListener,
    ) -> Result<(), RemoteError> {
        self.listeners
            .write()
            .entry(entry_id(group, key))
            .or_default()
            .push(listener);
        Ok(())
    }

    fn unregister_listener(&self, group: &str, key: &str) -> Result<(), RemoteError> {
        self.listeners.write().remove(&entry_id(group, key));
        Ok(())
    }
}

impl RemoteConnect for MemoryRemote {
    fn connect(config: &ClientConfig) -> Result<Self, ConfigError> {
        debug!(
            namespace = config.namespace(),
            servers = config.servers().len(),
            "in-memory remote connected, servers are not contacted"
        );
        Ok(Self::new().with_namespace(config.namespace()))
    }
}

impl std::fmt::Debug for MemoryRemote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryRemote")
            .field("namespace", &self.namespace)
            .field("latency", &self.latency)
            .field("entries", &self.entries.read().len())
            .field("listened", &self.listeners.read().len())
            .finish()
    }
}

fn entry_id(group: &str, key: &str) -> EntryId {
    (group.to_string(), key.to_string())
}

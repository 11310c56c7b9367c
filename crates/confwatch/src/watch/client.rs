//! User-facing watch client.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, bounded, unbounded};
use tracing::{debug, warn};

use super::dispatcher::{self, ChangeQueue};
use super::shared::Shared;
use crate::config::ClientConfig;
use crate::error::{ConfigError, RemoteError};
use crate::registry::Event;
use crate::remote::{RemoteConfig, RemoteConnect};
use crate::store::ConfigMap;
use crate::value::Value;

/// Watches remote configuration entries and fans out change events.
///
/// `WatchClient` is the entry point of the crate. It provides:
/// - Cached reads of single entries ([`get`](Self::get)) and snapshots of all
///   known entries ([`get_all`](Self::get_all))
/// - Change subscriptions delivered on bounded outlets ([`watch`](Self::watch))
/// - Teardown of every remote listener ([`close`](Self::close))
///
/// All methods take `&self`; share the client across threads with an `Arc`.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use std::time::Duration;
/// use confwatch::{ClientConfig, WatchClient};
/// use confwatch::remote::MemoryRemote;
///
/// let remote = Arc::new(MemoryRemote::new());
/// remote.set("billing", "db.toml", "pool = 4");
///
/// let config = ClientConfig::default()
///     .with_app_id("billing")
///     .with_namespace("prod")
///     .with_servers("http://127.0.0.1:8848").unwrap()
///     .with_log_dir("/tmp/confwatch/log")
///     .with_cache_dir("/tmp/confwatch/cache");
///
/// let client = WatchClient::new(config, remote.clone()).unwrap();
/// let events = client.watch(["db.toml"]);
///
/// remote.publish("billing", "db.toml", "pool = 8");
/// let event = events.recv_timeout(Duration::from_secs(5)).unwrap();
/// assert_eq!(event.value.raw(), Some("pool = 8"));
/// assert_eq!(client.get("db.toml").raw(), Some("pool = 8"));
///
/// client.close().unwrap();
/// ```
pub struct WatchClient {
    shared: Arc<Shared>,

    /// Feeds the dispatcher; cloned into every remote listener.
    queue: Arc<ChangeQueue>,

    dispatcher: Option<JoinHandle<()>>,
}

impl WatchClient {
    /// Validate `config` and start a client backed by `remote`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a required setting is missing or the
    /// dispatcher thread cannot be started. No client is created in that case.
    pub fn new<R>(config: ClientConfig, remote: R) -> Result<Self, ConfigError>
    where
        R: RemoteConfig + 'static,
    {
        config.validate()?;

        let (command_tx, command_rx) = unbounded();
        let queue = Arc::new(ChangeQueue::new(config.event_buffer(), command_tx));
        let shared = Arc::new(Shared::new(config, Arc::new(remote)));
        let dispatcher = dispatcher::spawn(shared.clone(), queue.clone(), command_rx)
            .map_err(|source| ConfigError::Startup { source })?;

        debug!(
            remote = shared.remote.name(),
            app_id = shared.group(),
            namespace = shared.config.namespace(),
            "watch client started"
        );

        Ok(Self {
            shared,
            queue,
            dispatcher: Some(dispatcher),
        })
    }

    /// Validate `config`, connect a backend from it, and start a client.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the configuration is invalid, the backend
    /// refuses it, or the dispatcher thread cannot be started.
    ///
    /// ```rust
    /// use confwatch::{ClientConfig, MemoryRemote, WatchClient};
    ///
    /// let config = ClientConfig::default()
    ///     .with_app_id("billing")
    ///     .with_namespace("prod")
    ///     .with_servers("http://127.0.0.1:8848").unwrap()
    ///     .with_log_dir("/tmp/confwatch/log")
    ///     .with_cache_dir("/tmp/confwatch/cache");
    ///
    /// let client = WatchClient::connect::<MemoryRemote>(config).unwrap();
    /// assert!(!client.get("db.toml").exists());
    /// ```
    pub fn connect<R>(config: ClientConfig) -> Result<Self, ConfigError>
    where
        R: RemoteConnect + 'static,
    {
        config.validate()?;
        let remote = R::connect(&config)?;
        Self::new(config, remote)
    }

    /// Latest known content of `key`.
    ///
    /// Served from the cache; the remote is only contacted the first time a
    /// key is requested (or until a fetch first succeeds). A fetch is
    /// abandoned after [`ClientConfig::timeout`]. Never fails: on error the
    /// problem is logged and [`Value::empty`] is returned.
    #[must_use]
    pub fn get(&self, key: &str) -> Value {
        self.shared.load(key)
    }

    /// Snapshot of every entry watched or fetched so far.
    ///
    /// This is not a listing of the remote namespace: call
    /// [`watch`](Self::watch) or [`get`](Self::get) for each key of interest
    /// first.
    #[must_use]
    pub fn get_all(&self) -> ConfigMap {
        self.shared.state.read().store.snapshot()
    }

    /// Watch `keys` and return one outlet carrying events for all of them.
    ///
    /// Each key is registered with the remote the first time any caller
    /// watches it. A key whose registration fails is logged and skipped; the
    /// outlet only carries events for keys that registered. Watching a key
    /// again adds another outlet; every outlet keeps receiving its events.
    ///
    /// The outlet holds at most [`ClientConfig::event_buffer`] events.
    /// When it is full, new events for it are dropped, so treat a missed
    /// event as "the value changed" and call [`get`](Self::get) if needed.
    pub fn watch<I>(&self, keys: I) -> Receiver<Event>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let (outlet, events) = bounded(self.shared.config.event_buffer());
        let group = self.shared.group();
        let mut watched = Vec::new();

        {
            let mut state = self.shared.state.write();
            let mut seen = HashSet::new();

            for key in keys {
                let key = key.as_ref();
                if !seen.insert(key.to_string()) {
                    continue;
                }

                if !state.is_registered(key) {
                    let listener = dispatcher::listener(self.queue.clone());
                    let registered = self.shared.timed("register", key, || {
                        self.shared.remote.register_listener(group, key, listener)
                    });

                    if let Err(err) = registered {
                        warn!(key, error = %err, "failed to register change listener, skipping key");
                        continue;
                    }

                    state.registered.push_back(key.to_string());
                }

                state.registry.subscribe(key, &outlet);
                watched.push(key.to_string());
            }
        }

        if watched.is_empty() {
            warn!("watch registered no keys, outlet will never receive events");
        }

        // Fill the cache so get_all sees watched keys right away.
        for key in &watched {
            self.shared.load(key);
        }

        events
    }

    /// Unregister every key from the remote, in registration order.
    ///
    /// Stops at the first failure and returns it; later keys are not
    /// attempted. Keys unregistered before the failure are dropped from the
    /// client, so calling `close` again resumes at the failed key. Once a key
    /// is unregistered no further events are delivered for it. Outlets are
    /// not closed or drained.
    ///
    /// # Errors
    ///
    /// Returns the [`RemoteError`] of the first key that failed to unregister.
    pub fn close(&self) -> Result<(), RemoteError> {
        let group = self.shared.group();
        let mut state = self.shared.state.write();

        while let Some(key) = state.registered.front().cloned() {
            let result = self.shared.timed("unregister", &key, || {
                self.shared.remote.unregister_listener(group, &key)
            });

            if let Err(err) = result {
                warn!(key = %key, error = %err, "failed to unregister change listener");
                return Err(err);
            }

            state.registered.pop_front();
            let outlets = state.registry.remove_key(&key);
            debug!(key = %key, outlets, "change listener unregistered");
        }

        Ok(())
    }

    /// Keys currently registered with the remote, in registration order.
    #[must_use]
    pub fn registered_keys(&self) -> Vec<String> {
        self.shared.state.read().registered.iter().cloned().collect()
    }

    /// Total events dropped since the client started.
    ///
    /// Counts events dropped on full outlets plus change notifications
    /// discarded because more than [`ClientConfig::event_buffer`] were
    /// pending for one key.
    #[must_use]
    pub fn dropped_events(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed) + self.queue.dropped()
    }

    /// Number of cache updates so far.
    ///
    /// Increments on every first fetch and every successful reload.
    ///
    /// ```rust,ignore
    /// let epoch = client.epoch();
    /// // ... later ...
    /// if client.has_changed_since(epoch) {
    ///     let snapshot = client.get_all();
    /// }
    /// ```
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.shared.state.read().store.epoch()
    }

    /// Check if the cache changed since `epoch`.
    #[must_use]
    pub fn has_changed_since(&self, epoch: u64) -> bool {
        self.epoch() != epoch
    }

    /// Whether the reload dispatcher is still running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }

    /// The configuration this client was built with.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.shared.config
    }
}

impl Drop for WatchClient {
    fn drop(&mut self) {
        self.queue.stop();
        if let Some(handle) = self.dispatcher.take() {
            let _ = handle.join();
        }
    }
}

impl std::fmt::Debug for WatchClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchClient")
            .field("remote", &self.shared.remote.name())
            .field("app_id", &self.shared.group())
            .field("registered", &self.registered_keys())
            .field("epoch", &self.epoch())
            .field("running", &self.is_running())
            .finish()
    }
}

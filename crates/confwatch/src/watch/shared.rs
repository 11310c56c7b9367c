//! State shared between the client handle and the reload dispatcher.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::Instant;

use crossbeam_channel::{RecvTimeoutError, bounded};
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::RemoteError;
use crate::registry::{Delivery, Event, SubscriptionRegistry};
use crate::remote::RemoteConfig;
use crate::store::ConfigStore;
use crate::value::Value;

/// Everything guarded by the client's single reader/writer lock.
#[derive(Debug, Default)]
pub(crate) struct WatchState {
    pub store: ConfigStore,
    pub registry: SubscriptionRegistry,
    /// Keys registered with the remote, in registration order.
    pub registered: VecDeque<String>,
}

impl WatchState {
    pub fn is_registered(&self, key: &str) -> bool {
        self.registered.iter().any(|k| k == key)
    }
}

pub(crate) struct Shared {
    pub config: ClientConfig,
    pub remote: Arc<dyn RemoteConfig>,
    pub state: RwLock<WatchState>,
    /// Events dropped on full outlets since creation.
    pub dropped: AtomicU64,
    pub running: AtomicBool,
}

impl Shared {
    pub fn new(config: ClientConfig, remote: Arc<dyn RemoteConfig>) -> Self {
        Self {
            config,
            remote,
            state: RwLock::new(WatchState::default()),
            dropped: AtomicU64::new(0),
            running: AtomicBool::new(true),
        }
    }

    /// The remote group every entry lives in.
    pub fn group(&self) -> &str {
        self.config.app_id()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    /// Run a listener call, flagging it if it overran the configured timeout.
    ///
    /// Registration runs under the state lock and must finish before the key
    /// is recorded, so it is left to the backend's own timeout.
    pub fn timed<T>(&self, op: &'static str, key: &str, call: impl FnOnce() -> T) -> T {
        let started = Instant::now();
        let result = call();
        let elapsed = started.elapsed();

        if elapsed > self.config.timeout() {
            warn!(
                remote = self.remote.name(),
                op,
                key,
                elapsed = ?elapsed,
                timeout = ?self.config.timeout(),
                "remote call exceeded configured timeout"
            );
        }

        result
    }

    /// Fetch `key`, giving up after the configured timeout.
    ///
    /// The call runs on its own thread; an abandoned call finishes in the
    /// background and its result is discarded.
    fn fetch(&self, key: &str) -> Result<Value, RemoteError> {
        let timeout = self.config.timeout();
        let (result_tx, result_rx) = bounded(1);
        let remote = Arc::clone(&self.remote);
        let group = self.group().to_string();
        let owned_key = key.to_string();

        thread::Builder::new()
            .name("confwatch-fetch".to_string())
            .spawn(move || {
                let _ = result_tx.send(remote.fetch(&group, &owned_key));
            })
            .map_err(|err| {
                RemoteError::connection_with_source(
                    self.remote.name(),
                    "failed to start fetch thread",
                    err,
                )
            })?;

        match result_rx.recv_timeout(timeout) {
            Ok(result) => result.map(Value::new),

            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    remote = self.remote.name(),
                    key,
                    timeout = ?timeout,
                    "remote fetch timed out, abandoning call"
                );
                Err(RemoteError::timeout(key, timeout))
            }

            Err(RecvTimeoutError::Disconnected) => Err(RemoteError::connection(
                self.remote.name(),
                format!("fetch of '{key}' ended without a result"),
            )),
        }
    }

    /// Return the cached value for `key`, fetching it once if nothing is cached.
    ///
    /// Failures are logged and yield [`Value::empty`].
    pub fn load(&self, key: &str) -> Value {
        if let Some(value) = self.state.read().store.get(key) {
            return value.clone();
        }

        match self.fetch(key) {
            Ok(value) => self.state.write().store.insert_if_absent(key, value),

            Err(err) => {
                warn!(key, error = %err, "failed to fetch config entry");
                Value::empty()
            }
        }
    }

    /// Re-fetch `key` after remote changes and publish one event per payload.
    ///
    /// The cache takes the re-fetched content; events carry the payloads the
    /// remote pushed, oldest first. On fetch failure the cached value is left
    /// untouched and nothing is published.
    pub fn reload(&self, key: &str, payloads: &[String]) {
        if !self.state.read().is_registered(key) {
            debug!(key, "ignoring change for key that is no longer registered");
            return;
        }

        let value = match self.fetch(key) {
            Ok(value) => value,

            Err(err) => {
                warn!(key, error = %err, "reload failed, keeping cached value");
                return;
            }
        };

        let mut total = Delivery::default();
        {
            let mut state = self.state.write();
            state.store.replace(key, value);

            for content in payloads {
                let event = Event::update(key, Value::new(content.as_str()));
                let delivery = state.registry.publish(&event);
                total.delivered += delivery.delivered;
                total.dropped += delivery.dropped;
                total.disconnected += delivery.disconnected;
            }
        }

        if total.dropped > 0 {
            self.dropped
                .fetch_add(total.dropped as u64, Ordering::Relaxed);
        }

        debug!(
            key,
            events = payloads.len(),
            delivered = total.delivered,
            dropped = total.dropped,
            disconnected = total.disconnected,
            "config entry reloaded"
        );
    }
}

impl std::fmt::Debug for Shared {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shared")
            .field("remote", &self.remote.name())
            .field("app_id", &self.group())
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use confwatch::remote::{ChangeListener, MemoryRemote, RemoteConfig};
use confwatch::{ClientConfig, RemoteError, WatchClient};
use parking_lot::Mutex;

pub const GROUP: &str = "app";

/// Generous upper bound for anything the dispatcher thread must do.
pub const WAIT: Duration = Duration::from_secs(5);

/// Short wait used to assert that nothing arrives.
pub const QUIET: Duration = Duration::from_millis(150);

/// A [`MemoryRemote`] wrapper that counts calls and fails on demand.
#[derive(Debug, Default)]
pub struct FlakyRemote {
    pub inner: MemoryRemote,
    fetches: AtomicUsize,
    fail_fetch: Mutex<Vec<String>>,
    panic_fetch: Mutex<Vec<String>>,
    fail_register: Mutex<Vec<String>>,
    fail_unregister: Mutex<Vec<String>>,
    unregistered: Mutex<Vec<String>>,
}

impl FlakyRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn wrapping(inner: MemoryRemote) -> Arc<Self> {
        Arc::new(Self {
            inner,
            ..Self::default()
        })
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn fail_fetch_for(&self, key: &str) {
        self.fail_fetch.lock().push(key.to_string());
    }

    pub fn heal_fetch(&self) {
        self.fail_fetch.lock().clear();
    }

    pub fn panic_fetch_for(&self, key: &str) {
        self.panic_fetch.lock().push(key.to_string());
    }

    pub fn fail_register_for(&self, key: &str) {
        self.fail_register.lock().push(key.to_string());
    }

    pub fn fail_unregister_for(&self, key: &str) {
        self.fail_unregister.lock().push(key.to_string());
    }

    pub fn heal_unregister(&self) {
        self.fail_unregister.lock().clear();
    }

    /// Keys passed to `unregister_listener`, successful or not, in call order.
    pub fn unregister_calls(&self) -> Vec<String> {
        self.unregistered.lock().clone()
    }
}

impl RemoteConfig for FlakyRemote {
    fn name(&self) -> &str {
        "flaky"
    }

    fn fetch(&self, group: &str, key: &str) -> Result<String, RemoteError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        assert!(
            !self.panic_fetch.lock().iter().any(|k| k == key),
            "injected fetch panic"
        );
        if self.fail_fetch.lock().iter().any(|k| k == key) {
            return Err(RemoteError::connection("flaky", "injected fetch failure"));
        }
        self.inner.fetch(group, key)
    }

    fn register_listener(
        &self,
        group: &str,
        key: &str,
        listener: ChangeListener,
    ) -> Result<(), RemoteError> {
        if self.fail_register.lock().iter().any(|k| k == key) {
            return Err(RemoteError::rejected(key, "injected register failure"));
        }
        self.inner.register_listener(group, key, listener)
    }

    fn unregister_listener(&self, group: &str, key: &str) -> Result<(), RemoteError> {
        self.unregistered.lock().push(key.to_string());
        if self.fail_unregister.lock().iter().any(|k| k == key) {
            return Err(RemoteError::connection("flaky", "injected unregister failure"));
        }
        self.inner.unregister_listener(group, key)
    }
}

pub fn test_config() -> ClientConfig {
    ClientConfig::default()
        .with_app_id(GROUP)
        .with_namespace("test")
        .with_servers("http://127.0.0.1:8848")
        .expect("valid server list")
        .with_log_dir("/tmp/confwatch-test/log")
        .with_cache_dir("/tmp/confwatch-test/cache")
}

pub fn client_with<R: RemoteConfig + 'static>(remote: R) -> WatchClient {
    WatchClient::new(test_config(), remote).expect("client should start")
}

/// Poll `check` until it holds or [`WAIT`] elapses.
pub fn wait_until(mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + WAIT;
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    check()
}

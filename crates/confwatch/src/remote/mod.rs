//! The remote configuration service seen by the watch client.
//!
//! The client depends only on the three-operation capability in
//! [`RemoteConfig`]: fetch an entry, register a change listener, and
//! unregister it. Transport, authentication and on-disk caching all live
//! behind this trait.
//!
//! # Built-in Backends
//!
//! - [`MemoryRemote`] - thread-safe in-process backend, useful for tests,
//!   demos, and embedding a static configuration set
//!
//! # Connecting From Configuration
//!
//! A backend that can build itself from [`ClientConfig`] implements
//! [`RemoteConnect`]; [`WatchClient::connect`](crate::WatchClient::connect)
//! then validates the configuration, connects the backend and starts the
//! client in one step. Servers, namespace, log and cache directories, log
//! level and the startup cache flag are settings for the backend; the client
//! itself only reads the app id, timeout and event buffer.
//!
//! # Custom Backends
//!
//! ```rust,ignore
//! use confwatch::remote::{ChangeListener, RemoteConfig, RemoteConnect};
//! use confwatch::{ClientConfig, ConfigError, RemoteError};
//!
//! struct HttpRemote { /* client, base url, ... */ }
//!
//! impl RemoteConfig for HttpRemote {
//!     fn name(&self) -> &str { "http" }
//!
//!     fn fetch(&self, group: &str, key: &str) -> Result<String, RemoteError> {
//!         // GET {base}/configs?group={group}&key={key}
//!     }
//!
//!     fn register_listener(
//!         &self,
//!         group: &str,
//!         key: &str,
//!         listener: ChangeListener,
//!     ) -> Result<(), RemoteError> {
//!         // start long-polling; call listener(key, content) on change
//!     }
//!
//!     fn unregister_listener(&self, group: &str, key: &str) -> Result<(), RemoteError> {
//!         // stop long-polling
//!     }
//! }
//!
//! impl RemoteConnect for HttpRemote {
//!     fn connect(config: &ClientConfig) -> Result<Self, ConfigError> {
//!         // pick config.servers(), scope requests to config.namespace(),
//!         // use config.timeout() for every request
//!     }
//! }
//! ```

mod memory;

pub use memory::MemoryRemote;

use std::sync::Arc;

use crate::config::ClientConfig;
use crate::error::{ConfigError, RemoteError};

/// Callback invoked by a remote backend when an entry changes.
///
/// Arguments are the entry key and the content pushed with the
/// notification. Backends may call it from any thread, concurrently, and
/// more than once for the same change.
pub type ChangeListener = Arc<dyn Fn(&str, &str) + Send + Sync>;

/// Capability surface of a remote configuration service.
///
/// Entries are addressed by `key` within an application `group`. The client
/// abandons a [`fetch`](Self::fetch) that outlives its configured timeout;
/// listener calls are expected to be bounded by the backend's own timeout.
pub trait RemoteConfig: Send + Sync {
    /// Backend name used in diagnostics.
    fn name(&self) -> &str;

    /// Fetch the current content of an entry.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::NotFound`] if the entry does not exist, or
    /// another variant if the service could not answer.
    fn fetch(&self, group: &str, key: &str) -> Result<String, RemoteError>;

    /// Start delivering change notifications for an entry to `listener`.
    ///
    /// # Errors
    ///
    /// Returns an error if the service refused or could not be reached.
    fn register_listener(
        &self,
        group: &str,
        key: &str,
        listener: ChangeListener,
    ) -> Result<(), RemoteError>;

    /// Stop delivering change notifications for an entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the service refused or could not be reached.
    fn unregister_listener(&self, group: &str, key: &str) -> Result<(), RemoteError>;
}

/// A backend that can be built from the client configuration.
pub trait RemoteConnect: RemoteConfig + Sized {
    /// Connect to the service described by `config`.
    ///
    /// `config` has already been validated.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the settings cannot be used by this
    /// backend.
    fn connect(config: &ClientConfig) -> Result<Self, ConfigError>;
}

impl<R: RemoteConnect> RemoteConnect for Arc<R> {
    fn connect(config: &ClientConfig) -> Result<Self, ConfigError> {
        R::connect(config).map(Arc::new)
    }
}

impl<R: RemoteConfig + ?Sized> RemoteConfig for Arc<R> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn fetch(&self, group: &str, key: &str) -> Result<String, RemoteError> {
        (**self).fetch(group, key)
    }

    fn register_listener(
        &self,
        group: &str,
        key: &str,
        listener: ChangeListener,
    ) -> Result<(), RemoteError> {
        (**self).register_listener(group, key, listener)
    }

    fn unregister_listener(&self, group: &str, key: &str) -> Result<(), RemoteError> {
        (**self).unregister_listener(group, key)
    }
}

impl<R: RemoteConfig + ?Sized> RemoteConfig for Box<R> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn fetch(&self, group: &str, key: &str) -> Result<String, RemoteError> {
        (**self).fetch(group, key)
    }

    fn register_listener(
        &self,
        group: &str,
        key: &str,
        listener: ChangeListener,
    ) -> Result<(), RemoteError> {
        (**self).register_listener(group, key, listener)
    }

    fn unregister_listener(&self, group: &str, key: &str) -> Result<(), RemoteError> {
        (**self).unregister_listener(group, key)
    }
}

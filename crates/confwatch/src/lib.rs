//! # confwatch
//!
//! A watch-and-notify client for remote configuration services.
//!
//! `confwatch` sits in front of a remote key/value configuration service and
//! gives an application three things: a local cache of the entries it cares
//! about, a snapshot of everything cached so far, and change subscriptions
//! that never let a slow consumer stall delivery to anyone else.
//!
//! ## Features
//!
//! - **Cached reads** - Each entry is fetched once and then served locally
//! - **Reload on change** - Remote notifications refetch the entry and update the cache
//! - **Bounded fan-out** - Each subscriber gets its own bounded outlet; a full
//!   outlet loses events instead of blocking the notifier
//! - **Pluggable backends** - Anything implementing [`RemoteConfig`] can be watched
//! - **Explicit configuration** - [`ClientConfig`] from code, environment,
//!   `.env` files, or CLI flags
//! - **Rich diagnostics** - Errors render through [`miette`]
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use confwatch::{ClientConfig, MemoryRemote, WatchClient};
//!
//! fn main() -> miette::Result<()> {
//!     let remote = Arc::new(MemoryRemote::new());
//!     remote.set("billing", "limits.json", r#"{"max_items": 20}"#);
//!
//!     let config = ClientConfig::default()
//!         .with_app_id("billing")
//!         .with_namespace("prod")
//!         .with_servers("http://127.0.0.1:8848")?
//!         .with_log_dir("/tmp/confwatch/log")
//!         .with_cache_dir("/tmp/confwatch/cache");
//!
//!     let client = WatchClient::new(config, remote.clone())?;
//!     let events = client.watch(["limits.json"]);
//!
//!     remote.publish("billing", "limits.json", r#"{"max_items": 50}"#);
//!
//!     if let Ok(event) = events.recv_timeout(Duration::from_secs(5)) {
//!         let limits: serde_json::Value = event.value.json()?;
//!         assert_eq!(limits["max_items"], 50);
//!     }
//!
//!     client.close()?;
//!     Ok(())
//! }
//! ```
//!
//! ## Delivery Guarantees
//!
//! | Situation | Behavior |
//! |-----------|----------|
//! | Outlet has room | Event delivered, in per-key change order |
//! | Outlet is full | Event dropped for that outlet only, warning logged |
//! | Outlet receiver dropped | Outlet forgotten on next delivery |
//! | Reload fetch fails | Cached value kept, no event |
//! | Key unregistered by `close` | No further events for that key |
//!
//! Events are change notifications, not a log. A consumer that may fall
//! behind should treat any event as "re-read the entry".
//!
//! ## Feature Flags
//!
//! | Feature | Description | Default |
//! |---------|-------------|---------|
//! | `dotenv` | Layer a `.env` file under the environment in [`ClientConfig`] | **Yes** |
//! | `clap` | [`ClientArgs`] for CLI flags | No |
//! | `toml` | [`Value::toml`] decoder | No |
//! | `yaml` | [`Value::yaml`] decoder | No |
//! | `format-all` | All value decoders | No |
//! | `full` | Enable all features | No |
//!
//! ## Logging
//!
//! The crate logs through [`tracing`] and never installs a subscriber. Remote
//! failures, dropped events and slow remote calls are reported at `warn`;
//! reload bookkeeping at `debug`.

#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

// ============================================================================
// Re-exported Dependencies
// ============================================================================

/// Re-export miette for error handling.
pub use miette;

/// Re-export crossbeam-channel, whose [`Receiver`](crossbeam_channel::Receiver)
/// is the outlet type returned by [`WatchClient::watch`].
pub use crossbeam_channel;

/// Re-export clap when the feature is enabled.
#[cfg(feature = "clap")]
pub use clap;

/// Re-export toml when the feature is enabled.
#[cfg(feature = "toml")]
pub use toml;

/// Re-export serde-saphyr (yaml) when the feature is enabled.
#[cfg(feature = "yaml")]
pub use serde_saphyr as yaml;

/// Re-export dotenvy when the dotenv feature is enabled.
#[cfg(feature = "dotenv")]
pub use dotenvy;

// ============================================================================
// Core Modules
// ============================================================================

pub mod config;
pub mod error;
pub mod registry;
pub mod remote;
pub mod store;
pub mod value;
pub mod watch;

#[cfg(feature = "clap")]
pub use config::ClientArgs;
pub use config::{ClientConfig, LogLevel, ServerAddr, parse_servers};
pub use error::{ConfigError, RemoteError, ValueError};
pub use registry::{Delivery, Event, EventKind, SubscriptionRegistry};
pub use remote::{ChangeListener, MemoryRemote, RemoteConfig, RemoteConnect};
pub use store::{ConfigMap, ConfigStore};
pub use value::Value;
pub use watch::WatchClient;

/// A Result type that displays errors with miette's fancy formatting.
///
/// ```rust,ignore
/// fn main() -> confwatch::Result<()> {
///     let client = confwatch::WatchClient::new(confwatch::ClientConfig::from_env()?, remote)?;
///     Ok(())
/// }
/// ```
pub type Result<T> = miette::Result<T>;

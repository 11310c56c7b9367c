//! Watch-and-notify client.
//!
//! [`WatchClient`] keeps a local cache of remote configuration entries and
//! turns remote change callbacks into [`Event`](crate::Event)s on bounded
//! outlets returned by [`WatchClient::watch`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌──────────────────┐     ┌──────────────────────┐
//! │   remote    │────▶│  change listener │────▶│  reload dispatcher   │
//! │ (callbacks) │     │ (queue + return) │     │ (fetch, store, send) │
//! └─────────────┘     └──────────────────┘     └──────────────────────┘
//!                                                         │
//!                                                         ▼
//!                     ┌──────────────────┐     ┌──────────────────────┐
//!                     │   WatchClient    │────▶│ RwLock<WatchState>   │
//!                     │    (user API)    │     │ store + registry     │
//!                     └──────────────────┘     └──────────────────────┘
//!                                                         │
//!                                                         ▼
//!                                              ┌──────────────────────┐
//!                                              │ bounded outlets      │
//!                                              │ (try_send, drop full)│
//!                                              └──────────────────────┘
//! ```
//!
//! Remote callbacks never block: they queue the pushed payload under its key
//! and return. Payloads for a key that is already pending are coalesced into
//! one reload. The dispatcher applies reloads one at a time, so a slow fetch
//! can never overwrite a newer one, and it abandons any fetch that outlives
//! the configured timeout. The cache stores the re-fetched content while
//! each event carries the payload the remote pushed. Delivery to an outlet
//! never waits; a full outlet loses the event and a disconnected one is
//! forgotten.
//!
//! # Error Handling
//!
//! Reads and reloads never surface errors to the caller. A failed fetch is
//! logged through `tracing` and the cached value is kept. Only
//! [`WatchClient::new`], [`WatchClient::connect`] and [`WatchClient::close`]
//! return errors.
//!
//! # Change Detection
//!
//! Use the epoch counter to poll for changes without an outlet:
//!
//! ```ignore
//! let epoch = client.epoch();
//!
//! // Do some work...
//!
//! if client.has_changed_since(epoch) {
//!     let snapshot = client.get_all();
//! }
//! ```

mod client;
mod dispatcher;
mod shared;

pub use client::WatchClient;

//! Fan-out of change events to bounded outlets.
//!
//! An outlet is the sending half of a bounded [`crossbeam_channel`] whose
//! receiving half was handed to a caller of
//! [`WatchClient::watch`](crate::WatchClient::watch). One outlet may listen on
//! several keys, and one key may have several outlets.
//!
//! Delivery never blocks: a full outlet loses the event (at-most-once), and
//! the other outlets for the same key are unaffected.

use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};

use crossbeam_channel::{Sender, TrySendError};
use tracing::{debug, warn};

use crate::value::Value;

/// Kind of change carried by an [`Event`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum EventKind {
    /// The entry's remote content changed and was reloaded.
    Update,
}

impl Display for EventKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Update => f.write_str("update"),
        }
    }
}

/// A change notification delivered on an outlet.
///
/// A missed event only means "the value changed"; call
/// [`WatchClient::get`](crate::WatchClient::get) for the latest content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Event {
    /// What happened.
    pub kind: EventKind,

    /// The entry key.
    pub key: String,

    /// Content pushed with the remote's change notification.
    ///
    /// The cache holds the content re-fetched after the change, which may be
    /// newer; [`WatchClient::get`](crate::WatchClient::get) returns that.
    pub value: Value,
}

impl Event {
    /// Create an update event.
    pub fn update(key: impl Into<String>, value: Value) -> Self {
        Self {
            kind: EventKind::Update,
            key: key.into(),
            value,
        }
    }
}

/// Outcome of publishing one event to every outlet of its key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Delivery {
    /// Outlets that accepted the event.
    pub delivered: usize,

    /// Outlets that were full; the event was dropped for them.
    pub dropped: usize,

    /// Outlets whose receiver was gone; they were removed.
    pub disconnected: usize,
}

/// Mapping from entry key to the outlets listening on it.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    outlets: HashMap<String, Vec<Sender<Event>>>,
}

impl SubscriptionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// List `outlet` under `key`.
    ///
    /// Returns `false` if the outlet was already listed for that key; an
    /// outlet never appears twice under one key.
    pub fn subscribe(&mut self, key: &str, outlet: &Sender<Event>) -> bool {
        let listeners = self.outlets.entry(key.to_string()).or_default();
        if listeners.iter().any(|s| s.same_channel(outlet)) {
            return false;
        }

        listeners.push(outlet.clone());
        true
    }

    /// Offer `event` to every outlet listening on `event.key`.
    ///
    /// Full outlets drop the event. Disconnected outlets are pruned.
    pub fn publish(&mut self, event: &Event) -> Delivery {
        let mut delivery = Delivery::default();

        let Some(listeners) = self.outlets.get_mut(&event.key) else {
            return delivery;
        };

        listeners.retain(|outlet| match outlet.try_send(event.clone()) {
            Ok(()) => {
                delivery.delivered += 1;
                true
            }

            Err(TrySendError::Full(_)) => {
                warn!(
                    key = %event.key,
                    capacity = ?outlet.capacity(),
                    "event outlet full, dropping update event"
                );
                delivery.dropped += 1;
                true
            }

            Err(TrySendError::Disconnected(_)) => {
                debug!(key = %event.key, "event outlet receiver dropped, removing outlet");
                delivery.disconnected += 1;
                false
            }
        });

        if listeners.is_empty() {
            self.outlets.remove(&event.key);
        }

        delivery
    }

    /// Remove every outlet listening on `key`, returning how many there were.
    pub fn remove_key(&mut self, key: &str) -> usize {
        self.outlets.remove(key).map_or(0, |listeners| listeners.len())
    }

    /// Number of outlets listening on `key`.
    #[must_use]
    pub fn subscriber_count(&self, key: &str) -> usize {
        self.outlets.get(key).map_or(0, Vec::len)
    }

    /// Keys with at least one outlet, in arbitrary order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.outlets.keys().map(String::as_str)
    }
}

//! Reload dispatcher thread.
//!
//! Remote change callbacks never reload inline. They push their payload onto
//! the [`ChangeQueue`], so the remote's delivery thread is never blocked by
//! our locks or fetches, and this thread applies reloads one key at a time in
//! arrival order.
//!
//! The queue coalesces per key: while a key has payloads pending, later
//! notifications for it only append their payload, and the dispatcher drains
//! them all with a single fetch. The command channel therefore holds at most
//! one `Changed` per key, and each key keeps at most `event_buffer` pending
//! payloads, dropping the oldest beyond that.

use std::collections::{HashMap, VecDeque};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use tracing::{debug, error, warn};

use super::shared::Shared;
use crate::remote::ChangeListener;

/// Commands processed by the dispatcher thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    /// The key has payloads waiting in the [`ChangeQueue`].
    Changed(String),
    /// Shut the dispatcher down.
    Stop,
}

/// Pending change payloads, grouped by key.
#[derive(Debug)]
pub(crate) struct ChangeQueue {
    pending: Mutex<HashMap<String, VecDeque<String>>>,
    capacity: usize,
    /// Payloads discarded because their key's queue was full.
    dropped: AtomicU64,
    command_tx: Sender<Command>,
}

impl ChangeQueue {
    pub fn new(capacity: usize, command_tx: Sender<Command>) -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
            dropped: AtomicU64::new(0),
            command_tx,
        }
    }

    /// Queue a change payload, waking the dispatcher if the key was idle.
    pub fn push(&self, key: &str, content: &str) {
        let wake = {
            let mut pending = self.pending.lock();
            let queue = pending.entry(key.to_string()).or_default();
            let idle = queue.is_empty();

            if queue.len() >= self.capacity {
                queue.pop_front();
                warn!(key, capacity = self.capacity, "change queue full, dropping oldest notification");
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
            queue.push_back(content.to_string());
            idle
        };

        if wake && self.command_tx.send(Command::Changed(key.to_string())).is_err() {
            debug!(key, "dispatcher stopped, ignoring change notification");
        }
    }

    /// Take every payload pending for `key`, oldest first.
    pub fn take(&self, key: &str) -> Vec<String> {
        self.pending
            .lock()
            .remove(key)
            .map(Vec::from)
            .unwrap_or_default()
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Stop the dispatcher once it has drained the commands already queued.
    pub fn stop(&self) {
        let _ = self.command_tx.send(Command::Stop);
    }
}

/// Start the dispatcher thread.
pub(crate) fn spawn(
    shared: Arc<Shared>,
    queue: Arc<ChangeQueue>,
    command_rx: Receiver<Command>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("confwatch-reload".to_string())
        .spawn(move || dispatch_loop(&shared, &queue, &command_rx))
}

/// Build the callback handed to the remote for one key.
pub(crate) fn listener(queue: Arc<ChangeQueue>) -> ChangeListener {
    Arc::new(move |key: &str, content: &str| {
        debug!(key, content_len = content.len(), "remote change notification");
        queue.push(key, content);
    })
}

fn dispatch_loop(shared: &Arc<Shared>, queue: &ChangeQueue, command_rx: &Receiver<Command>) {
    debug!("reload dispatcher started");

    while let Ok(command) = command_rx.recv() {
        match command {
            Command::Changed(key) => {
                let payloads = queue.take(&key);
                if payloads.is_empty() {
                    continue;
                }

                // A panicking backend must not take the dispatcher down.
                if catch_unwind(AssertUnwindSafe(|| shared.reload(&key, &payloads))).is_err() {
                    error!(key = %key, "reload panicked, entry left unchanged");
                }
            }

            Command::Stop => break,
        }
    }

    shared.stop();
    debug!("reload dispatcher stopped");
}

//! Change notification for vault readers.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tokio::sync::watch;

use crate::error::VaultResult;

/// Notified after every vault mutation.
#[uniffi::export(with_foreign)]
pub trait ChangeListener: Send + Sync {
    /// Called with the new revision once a mutation has been stored.
    fn on_change(&self, revision: u64);
}

/// Monotonic revision counter bumped by every vault mutation.
pub struct ChangeFeed {
    revision: watch::Sender<u64>,
    listeners: Mutex<Vec<Arc<dyn ChangeListener>>>,
}

impl ChangeFeed {
    /// Creates a feed at revision zero.
    #[must_use]
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            revision,
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// The current revision.
    #[must_use]
    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    /// Registers a foreign listener.
    pub fn add_listener(&self, listener: Arc<dyn ChangeListener>) {
        match self.listeners.lock() {
            Ok(mut listeners) => listeners.push(listener),
            Err(_) => log::warn!("change listener registry poisoned; listener dropped"),
        }
    }

    /// Bumps the revision and notifies listeners.
    pub fn notify(&self) {
        let mut current = 0;
        self.revision.send_modify(|revision| {
            *revision += 1;
            current = *revision;
        });
        let listeners = self
            .listeners
            .lock()
            .map(|listeners| listeners.clone())
            .unwrap_or_default();
        for listener in listeners {
            listener.on_change(current);
        }
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

type Fetch<T> = Box<dyn Fn() -> Pin<Box<dyn Future<Output = VaultResult<T>> + Send>> + Send + Sync>;

/// A stream of snapshots re-queried after every vault mutation.
///
/// The first [`Subscription::next`] yields the current snapshot at once;
/// later calls wait for the next mutation. Mutations that land while the
/// reader is busy are coalesced into one snapshot.
pub struct Subscription<T> {
    changes: watch::Receiver<u64>,
    fetch: Fetch<T>,
    primed: bool,
}

impl<T> Subscription<T> {
    pub(crate) fn new<F, Fut>(changes: watch::Receiver<u64>, fetch: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = VaultResult<T>> + Send + 'static,
    {
        Self {
            changes,
            fetch: Box::new(move || Box::pin(fetch())),
            primed: false,
        }
    }

    /// Waits for the next snapshot. Returns `None` once the vault is gone.
    pub async fn next(&mut self) -> Option<VaultResult<T>> {
        if self.primed {
            self.changes.changed().await.ok()?;
        }
        self.primed = true;
        self.changes.mark_unchanged();
        Some((self.fetch)().await)
    }
}

use crate::message::MessageType;
use crate::subscription::Subscription;
use crate::token::Token;
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::trace;

/// A point-in-time copy of the registered subscriptions, in registration order.
#[derive(Debug)]
pub struct Snapshot<C> {
    revision: u64,
    subscriptions: Vec<Arc<Subscription<C>>>,
}

impl<C> Snapshot<C> {
    /// The store revision this snapshot was captured at.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }
}

impl<C> Deref for Snapshot<C> {
    type Target = [Arc<Subscription<C>>];

    fn deref(&self) -> &Self::Target {
        &self.subscriptions
    }
}

/// Thread-safe subscription collection with copy-on-write snapshots for readers.
///
/// Writers serialize on one mutex and bump a revision counter. Readers take
/// [`SubscriptionStore::snapshot`], which returns the published copy without locking as long
/// as nothing changed since it was captured.
#[derive(Debug)]
pub struct SubscriptionStore<C> {
    canonical: Mutex<Vec<Arc<Subscription<C>>>>,
    revision: AtomicU64,
    published: ArcSwap<Snapshot<C>>,
}

impl<C> Default for SubscriptionStore<C> {
    fn default() -> Self {
        Self {
            canonical: Mutex::new(Vec::new()),
            revision: AtomicU64::new(0),
            published: ArcSwap::from_pointee(Snapshot { revision: 0, subscriptions: Vec::new() }),
        }
    }
}

impl<C> SubscriptionStore<C> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a new subscription and returns its token.
    pub fn register(&self, message_type: MessageType, throttle: Duration, callback: C) -> Token {
        let subscription = Arc::new(Subscription::new(message_type, throttle, callback));
        let token = subscription.token();

        let mut canonical = self.canonical.lock();
        canonical.push(subscription);
        self.revision.fetch_add(1, Ordering::AcqRel);

        token
    }

    /// Removes the subscription identified by `token`, keeping the order of the others.
    ///
    /// Returns `false` when no such subscription is registered.
    pub fn unregister(&self, token: Token) -> bool {
        let mut canonical = self.canonical.lock();
        let Some(index) = canonical.iter().position(|sub| sub.token() == token) else {
            return false;
        };

        canonical.remove(index);
        self.revision.fetch_add(1, Ordering::AcqRel);
        true
    }

    #[must_use]
    pub fn is_registered(&self, token: Token) -> bool {
        self.canonical.lock().iter().any(|sub| sub.token() == token)
    }

    /// Removes every subscription and returns how many were removed.
    pub fn clear(&self) -> usize {
        let mut canonical = self.canonical.lock();
        let removed = canonical.len();
        canonical.clear();
        self.revision.fetch_add(1, Ordering::AcqRel);
        removed
    }

    /// Returns the subscriptions as of now.
    ///
    /// The published snapshot is reused while its revision is current; otherwise a fresh copy
    /// is taken under the lock and published for later readers.
    pub fn snapshot(&self) -> Arc<Snapshot<C>> {
        let current = self.published.load_full();
        if current.revision == self.revision.load(Ordering::Acquire) {
            return current;
        }

        let canonical = self.canonical.lock();
        let snapshot = Arc::new(Snapshot {
            revision: self.revision.load(Ordering::Acquire),
            subscriptions: canonical.clone(),
        });
        self.published.store(Arc::clone(&snapshot));
        drop(canonical);

        trace!(
            revision = snapshot.revision,
            len = snapshot.len(),
            "Subscription snapshot refreshed"
        );
        snapshot
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.canonical.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.canonical.lock().is_empty()
    }

    /// The current revision. Every registration, successful removal, and clear bumps it.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::Acquire)
    }
}

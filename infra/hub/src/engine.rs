use crate::config::{GlobalFailurePolicy, HubConfig};
use crate::error::{Failure, HandlerError, HandlerErrorExt, Origin};
use crate::message::MessageType;
use crate::store::SubscriptionStore;
use crate::subscription::Subscription;
use crate::token::Token;
use arc_swap::ArcSwapOption;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, error, trace, warn};

pub(crate) type ErrorHandler = dyn Fn(&Failure) + Send + Sync;

/// State and dispatch loop shared by [`Hub`](crate::Hub) and [`TypedHub`](crate::TypedHub).
///
/// `C` is the per-subscription callback, `G` the global handler signature.
pub(crate) struct HubCore<C, G: ?Sized> {
    config: HubConfig,
    store: SubscriptionStore<C>,
    global: ArcSwapOption<Box<G>>,
    on_error: ArcSwapOption<Box<ErrorHandler>>,
    disposed: AtomicBool,
}

impl<C, G: ?Sized> HubCore<C, G> {
    pub(crate) fn new(config: HubConfig) -> Self {
        Self {
            config,
            store: SubscriptionStore::new(),
            global: ArcSwapOption::empty(),
            on_error: ArcSwapOption::empty(),
            disposed: AtomicBool::new(false),
        }
    }

    pub(crate) const fn config(&self) -> &HubConfig {
        &self.config
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    pub(crate) fn ignore(&self, operation: &'static str) {
        debug!(hub = %self.config.name, operation, "Ignoring operation on a disposed hub");
    }

    pub(crate) fn subscribe(
        &self,
        message_type: MessageType,
        throttle: Duration,
        callback: C,
    ) -> Token {
        if self.is_disposed() {
            self.ignore("subscribe");
            return Token::next();
        }

        let token = self.store.register(message_type, throttle, callback);

        // Lost a race with dispose(); the store was already cleared.
        if self.is_disposed() {
            self.store.unregister(token);
            self.ignore("subscribe");
            return token;
        }

        trace!(
            hub = %self.config.name,
            %token,
            message = message_type.name(),
            ?throttle,
            "Subscription registered"
        );
        token
    }

    pub(crate) fn unsubscribe(&self, token: Token) -> bool {
        if self.is_disposed() {
            self.ignore("unsubscribe");
            return false;
        }

        let removed = self.store.unregister(token);
        debug!(hub = %self.config.name, %token, removed, "Unsubscribed");
        removed
    }

    pub(crate) fn is_subscribed(&self, token: Token) -> bool {
        !self.is_disposed() && self.store.is_registered(token)
    }

    pub(crate) fn clear(&self) {
        if self.is_disposed() {
            self.ignore("clear_subscriptions");
            return;
        }

        let removed = self.store.clear();
        debug!(hub = %self.config.name, removed, "Subscriptions cleared");
    }

    pub(crate) fn subscription_count(&self) -> usize {
        if self.is_disposed() { 0 } else { self.store.len() }
    }

    pub(crate) fn set_global(&self, handler: Box<G>) {
        if self.is_disposed() {
            self.ignore("register_global_handler");
            return;
        }
        self.global.store(Some(Arc::new(handler)));

        // Lost a race with dispose(); the slot was already cleared.
        if self.is_disposed() {
            self.global.store(None);
            self.ignore("register_global_handler");
        }
    }

    pub(crate) fn set_error_handler(&self, handler: Box<ErrorHandler>) {
        if self.is_disposed() {
            self.ignore("register_error_handler");
            return;
        }
        self.on_error.store(Some(Arc::new(handler)));

        if self.is_disposed() {
            self.on_error.store(None);
            self.ignore("register_error_handler");
        }
    }

    /// Drops every subscription and both handler slots. Later calls do nothing.
    pub(crate) fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }

        let removed = self.store.clear();
        self.global.store(None);
        self.on_error.store(None);
        debug!(hub = %self.config.name, removed, "Hub disposed");
    }

    /// Invokes the global handler, if any, under the configured failure policy.
    pub(crate) fn notify_global(&self, message_type: MessageType, call: impl FnOnce(&G)) {
        let Some(global) = self.global.load_full() else {
            return;
        };

        match self.config.global_failures {
            GlobalFailurePolicy::Propagate => call(&**global),
            GlobalFailurePolicy::Report => {
                if let Err(error) = isolate(|| {
                    call(&**global);
                    Ok(true)
                }) {
                    self.report(Failure::new(Origin::Global, message_type, error));
                }
            },
        }
    }

    /// Runs one publish over the current snapshot and returns how many callbacks completed.
    ///
    /// `matches` decides compatibility, `deliver` runs the subscription's handler and tells
    /// whether its callback ran. Both run inside the panic boundary; failures are reported
    /// against the subscription and never stop the loop.
    pub(crate) fn dispatch(
        &self,
        message_type: MessageType,
        matches: impl Fn(&Subscription<C>) -> bool,
        deliver: impl Fn(&Subscription<C>) -> Result<bool, HandlerError>,
    ) -> usize {
        let snapshot = self.store.snapshot();
        let (mut delivered, mut throttled, mut failed) = (0_usize, 0_usize, 0_usize);

        for subscription in snapshot.iter().map(Arc::as_ref) {
            if self.is_disposed() {
                break;
            }
            match isolate(|| Ok(matches(subscription))).context("Matching message type") {
                Ok(true) => {},
                Ok(false) => continue,
                Err(error) => {
                    failed += 1;
                    self.report(Failure::new(
                        Origin::Subscription(subscription.token()),
                        message_type,
                        error,
                    ));
                    continue;
                },
            }
            if !subscription.try_acquire() {
                throttled += 1;
                continue;
            }

            match isolate(|| deliver(subscription)) {
                Ok(true) => delivered += 1,
                Ok(false) => {},
                Err(error) => {
                    failed += 1;
                    self.report(Failure::new(
                        Origin::Subscription(subscription.token()),
                        message_type,
                        error,
                    ));
                },
            }
        }

        trace!(
            hub = %self.config.name,
            message = message_type.name(),
            revision = snapshot.revision(),
            delivered,
            throttled,
            failed,
            "Message dispatched"
        );
        delivered
    }

    fn report(&self, failure: Failure) {
        warn!(
            hub = %self.config.name,
            origin = %failure.origin(),
            message = failure.message_type().name(),
            error = %failure.error(),
            "Message handler failed"
        );

        let Some(on_error) = self.on_error.load_full() else {
            return;
        };
        if let Err(err) = isolate(|| {
            (**on_error)(&failure);
            Ok(true)
        }) {
            error!(hub = %self.config.name, error = %err, "Error handler panicked");
        }
    }
}

impl<C, G: ?Sized> fmt::Debug for HubCore<C, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HubCore")
            .field("name", &self.config.name)
            .field("subscriptions", &self.store.len())
            .field("global_handler", &self.global.load().is_some())
            .field("error_handler", &self.on_error.load().is_some())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Runs `f`, turning a panic into [`HandlerError::Panicked`].
fn isolate(f: impl FnOnce() -> Result<bool, HandlerError>) -> Result<bool, HandlerError> {
    panic::catch_unwind(AssertUnwindSafe(f))
        .unwrap_or_else(|payload| Err(HandlerError::from_panic(&*payload)))
}

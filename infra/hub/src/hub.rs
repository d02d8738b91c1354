use crate::config::{HubBuilder, HubConfig};
use crate::engine::HubCore;
use crate::error::{Failure, IntoHandlerResult};
use crate::handler::Handler;
use crate::message::{self, Message, MessageType};
use crate::token::Token;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

type ErasedHandler = Box<dyn Any + Send + Sync>;
type GlobalHandler = dyn Fn(MessageType, &dyn Any) + Send + Sync;

/// An in-process publish/subscribe hub.
///
/// Publishing is synchronous: `publish` returns after every compatible subscription has been
/// attempted, in registration order. A subscription to type `S` receives messages of type `S`
/// and every message whose [`Message::upcast`] offers an `S` view.
///
/// `Hub` is a cheap handle; clones share the same subscriptions.
///
/// # Example
///
/// ```rust
/// use msghub::Hub;
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicU64, Ordering};
///
/// struct Deposit(u64);
/// impl msghub::Message for Deposit {}
///
/// let hub = Hub::new();
/// let balance = Arc::new(AtomicU64::new(0));
///
/// let sink = Arc::clone(&balance);
/// let token = hub.subscribe(move |deposit: &Deposit| {
///     sink.fetch_add(deposit.0, Ordering::SeqCst);
/// });
///
/// hub.publish(Deposit(40));
/// hub.publish(Deposit(2));
/// assert_eq!(balance.load(Ordering::SeqCst), 42);
///
/// assert!(hub.unsubscribe(token));
/// assert_eq!(hub.publish(Deposit(1)), 0);
/// ```
#[derive(Clone)]
pub struct Hub {
    inner: Arc<HubCore<ErasedHandler, GlobalHandler>>,
}

impl Default for Hub {
    fn default() -> Self {
        Self::with_config(HubConfig::default())
    }
}

impl Hub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn builder() -> HubBuilder {
        HubBuilder::new()
    }

    #[must_use]
    pub fn with_config(config: HubConfig) -> Self {
        Self { inner: Arc::new(HubCore::new(config)) }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.config().name
    }

    #[must_use]
    pub fn config(&self) -> &HubConfig {
        self.inner.config()
    }

    /// Subscribes `callback` to messages of type `S`.
    ///
    /// `S` may be a trait object, e.g. `hub.subscribe::<dyn Shape, _, _>(..)`, to receive every
    /// message offering that view. The callback returns `()` or a `Result`; an `Err` is reported
    /// to the error handler like a panic would be.
    pub fn subscribe<S, F, R>(&self, callback: F) -> Token
    where
        S: ?Sized + 'static,
        F: Fn(&S) -> R + Send + Sync + 'static,
        R: IntoHandlerResult,
    {
        self.subscribe_handler(Handler::new(callback), Duration::ZERO)
    }

    /// Subscribes `callback` with a minimum interval between successive deliveries.
    ///
    /// The first message is always delivered; messages arriving inside the interval are dropped
    /// for this subscription only.
    pub fn subscribe_throttled<S, F, R>(&self, callback: F, throttle: Duration) -> Token
    where
        S: ?Sized + 'static,
        F: Fn(&S) -> R + Send + Sync + 'static,
        R: IntoHandlerResult,
    {
        self.subscribe_handler(Handler::new(callback), throttle)
    }

    /// Subscribes `callback` for the messages of type `S` that match `predicate`.
    pub fn subscribe_filtered<S, F, R, P>(&self, callback: F, predicate: P) -> Token
    where
        S: ?Sized + 'static,
        F: Fn(&S) -> R + Send + Sync + 'static,
        R: IntoHandlerResult,
        P: Fn(&S) -> bool + Send + Sync + 'static,
    {
        self.subscribe_handler(Handler::with_predicate(callback, predicate), Duration::ZERO)
    }

    /// Registers a prepared [`Handler`]. A zero `throttle` disables throttling.
    pub fn subscribe_handler<S: ?Sized + 'static>(
        &self,
        handler: Handler<S>,
        throttle: Duration,
    ) -> Token {
        self.inner.subscribe(MessageType::of::<S>(), throttle, Box::new(handler))
    }

    /// Removes a subscription. Unknown or already removed tokens are ignored.
    ///
    /// Returns whether a subscription was removed.
    pub fn unsubscribe(&self, token: Token) -> bool {
        self.inner.unsubscribe(token)
    }

    #[must_use]
    pub fn is_subscribed(&self, token: Token) -> bool {
        self.inner.is_subscribed(token)
    }

    /// Removes every subscription. The global and error handlers stay registered.
    pub fn clear_subscriptions(&self) {
        self.inner.clear();
    }

    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.inner.subscription_count()
    }

    /// Sets the handler invoked once for every published message, replacing any previous one.
    ///
    /// It runs before subscription delivery and receives the message's runtime type and a
    /// reference to it.
    pub fn register_global_handler<F>(&self, callback: F)
    where
        F: Fn(MessageType, &dyn Any) + Send + Sync + 'static,
    {
        self.inner.set_global(Box::new(callback));
    }

    /// Sets the handler receiving every [`Failure`], replacing any previous one.
    ///
    /// Without an error handler failures are only logged.
    pub fn register_error_handler<F>(&self, callback: F)
    where
        F: Fn(&Failure) + Send + Sync + 'static,
    {
        self.inner.set_error_handler(Box::new(callback));
    }

    /// Publishes `message` and returns how many subscription callbacks completed.
    ///
    /// Failing subscriptions are reported and skipped; they never interrupt delivery to the
    /// others.
    ///
    /// # Panics
    /// Only with [`GlobalFailurePolicy::Propagate`](crate::GlobalFailurePolicy::Propagate),
    /// when the global handler panics.
    pub fn publish<M: Message>(&self, message: M) -> usize {
        self.publish_ref(&message)
    }

    /// Same as [`Hub::publish`] for a message the caller keeps.
    ///
    /// # Panics
    /// Only with [`GlobalFailurePolicy::Propagate`](crate::GlobalFailurePolicy::Propagate),
    /// when the global handler panics.
    pub fn publish_ref<M: Message>(&self, message: &M) -> usize {
        if self.inner.is_disposed() {
            self.inner.ignore("publish");
            return 0;
        }

        let message_type = MessageType::of::<M>();
        self.inner.notify_global(message_type, |global| global(message_type, message));
        self.inner.dispatch(
            message_type,
            |subscription| message::is_compatible(subscription.message_type(), message),
            |subscription| {
                message::deliver(subscription.message_type(), &**subscription.callback(), message)
            },
        )
    }

    /// Publishes `message` on tokio's blocking pool without waiting for delivery.
    ///
    /// The handle resolves to the same count [`Hub::publish`] returns.
    ///
    /// # Panics
    /// Panics when called outside a tokio runtime.
    pub fn publish_detached<M: Message>(&self, message: M) -> JoinHandle<usize> {
        let hub = self.clone();
        tokio::task::spawn_blocking(move || hub.publish(message))
    }

    /// Drops every subscription and both handlers. Every later operation is a no-op.
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }
}

impl fmt::Debug for Hub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Hub").field(&self.inner).finish()
    }
}

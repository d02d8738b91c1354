use crate::config::{HubBuilder, HubConfig};
use crate::engine::HubCore;
use crate::error::{Failure, IntoHandlerResult};
use crate::handler::Handler;
use crate::message::MessageType;
use crate::token::Token;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

type TypedGlobal<B> = dyn Fn(&B) + Send + Sync;

/// A hub statically typed to one message base type `B`, usually an enum of every message.
///
/// Every subscription receives every message; a [`Handler`] predicate is the only filter.
///
/// # Example
///
/// ```rust
/// use msghub::TypedHub;
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// enum Order {
///     Placed { id: u32 },
///     Cancelled { id: u32 },
/// }
///
/// let hub = TypedHub::<Order>::new();
/// let cancelled = Arc::new(AtomicUsize::new(0));
///
/// let sink = Arc::clone(&cancelled);
/// hub.subscribe_filtered(
///     move |_: &Order| {
///         sink.fetch_add(1, Ordering::SeqCst);
///     },
///     |order| matches!(order, Order::Cancelled { .. }),
/// );
///
/// hub.publish(Order::Placed { id: 1 });
/// hub.publish(Order::Cancelled { id: 1 });
/// assert_eq!(cancelled.load(Ordering::SeqCst), 1);
/// ```
pub struct TypedHub<B: Send + Sync + 'static> {
    inner: Arc<HubCore<Handler<B>, TypedGlobal<B>>>,
}

impl<B: Send + Sync + 'static> Clone for TypedHub<B> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<B: Send + Sync + 'static> Default for TypedHub<B> {
    fn default() -> Self {
        Self::with_config(HubConfig::default())
    }
}

impl<B: Send + Sync + 'static> TypedHub<B> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a builder; finish it with [`HubBuilder::build_typed`].
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

    pub fn subscribe<F, R>(&self, callback: F) -> Token
    where
        F: Fn(&B) -> R + Send + Sync + 'static,
        R: IntoHandlerResult,
    {
        self.subscribe_handler(Handler::new(callback), Duration::ZERO)
    }

    pub fn subscribe_filtered<F, R, P>(&self, callback: F, predicate: P) -> Token
    where
        F: Fn(&B) -> R + Send + Sync + 'static,
        R: IntoHandlerResult,
        P: Fn(&B) -> bool + Send + Sync + 'static,
    {
        self.subscribe_handler(Handler::with_predicate(callback, predicate), Duration::ZERO)
    }

    pub fn subscribe_throttled<F, R>(&self, callback: F, throttle: Duration) -> Token
    where
        F: Fn(&B) -> R + Send + Sync + 'static,
        R: IntoHandlerResult,
    {
        self.subscribe_handler(Handler::new(callback), throttle)
    }

    /// Registers a prepared [`Handler`]. A zero `throttle` disables throttling.
    pub fn subscribe_handler(&self, handler: Handler<B>, throttle: Duration) -> Token {
        self.inner.subscribe(MessageType::of::<B>(), throttle, handler)
    }

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
    pub fn register_global_handler<F>(&self, callback: F)
    where
        F: Fn(&B) + Send + Sync + 'static,
    {
        self.inner.set_global(Box::new(callback));
    }

    pub fn register_error_handler<F>(&self, callback: F)
    where
        F: Fn(&Failure) + Send + Sync + 'static,
    {
        self.inner.set_error_handler(Box::new(callback));
    }

    /// Publishes `message` and returns how many subscription callbacks completed.
    ///
    /// # Panics
    /// Only with [`GlobalFailurePolicy::Propagate`](crate::GlobalFailurePolicy::Propagate),
    /// when the global handler panics.
    pub fn publish(&self, message: B) -> usize {
        self.publish_ref(&message)
    }

    /// # Panics
    /// Only with [`GlobalFailurePolicy::Propagate`](crate::GlobalFailurePolicy::Propagate),
    /// when the global handler panics.
    pub fn publish_ref(&self, message: &B) -> usize {
        if self.inner.is_disposed() {
            self.inner.ignore("publish");
            return 0;
        }

        let message_type = MessageType::of::<B>();
        self.inner.notify_global(message_type, |global| global(message));
        self.inner.dispatch(
            message_type,
            |_| true,
            |subscription| subscription.callback().dispatch(message),
        )
    }

    /// Publishes `message` on tokio's blocking pool without waiting for delivery.
    ///
    /// # Panics
    /// Panics when called outside a tokio runtime.
    pub fn publish_detached(&self, message: B) -> JoinHandle<usize> {
        let hub = self.clone();
        tokio::task::spawn_blocking(move || hub.publish(message))
    }

    pub fn dispose(&self) {
        self.inner.dispose();
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }
}

impl<B: Send + Sync + 'static> fmt::Debug for TypedHub<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedHub")
            .field("message", &std::any::type_name::<B>())
            .field("core", &self.inner)
            .finish()
    }
}

use crate::error::{HandlerError, IntoHandlerResult};
use std::any::type_name;
use std::fmt;
use std::sync::Arc;

type Callback<T> = dyn Fn(&T) -> Result<(), HandlerError> + Send + Sync;
type Predicate<T> = dyn Fn(&T) -> bool + Send + Sync;

/// A typed callback paired with an optional predicate filter.
///
/// Cloning is cheap: clones share the same callback and predicate. `T` may be unsized, so
/// `Handler<dyn Trait>` subscribes to every message offering that trait view.
///
/// # Example
///
/// ```rust
/// use msghub::Handler;
///
/// let even = Handler::with_predicate(|n: &u32| println!("{n}"), |n| n % 2 == 0);
///
/// assert!(even.accepts(&4));
/// assert!(!even.accepts(&5));
/// assert!(even.handle(&5).is_ok());
/// ```
pub struct Handler<T: ?Sized> {
    callback: Arc<Callback<T>>,
    predicate: Option<Arc<Predicate<T>>>,
}

impl<T: ?Sized + 'static> Handler<T> {
    /// Creates a handler that accepts every message.
    #[must_use]
    pub fn new<F, R>(callback: F) -> Self
    where
        F: Fn(&T) -> R + Send + Sync + 'static,
        R: IntoHandlerResult,
    {
        Self {
            callback: Arc::new(move |message: &T| callback(message).into_handler_result()),
            predicate: None,
        }
    }

    /// Creates a handler that only invokes `callback` for messages matching `predicate`.
    #[must_use]
    pub fn with_predicate<F, R, P>(callback: F, predicate: P) -> Self
    where
        F: Fn(&T) -> R + Send + Sync + 'static,
        R: IntoHandlerResult,
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Self { predicate: Some(Arc::new(predicate)), ..Self::new(callback) }
    }
}

impl<T: ?Sized> Handler<T> {
    /// Evaluates the predicate alone. Handlers without a predicate accept everything.
    #[must_use]
    pub fn accepts(&self, message: &T) -> bool {
        self.predicate.as_ref().is_none_or(|predicate| predicate(message))
    }

    /// Invokes the callback if the predicate accepts `message`.
    ///
    /// A declined message is not an error and returns `Ok(())`.
    ///
    /// # Errors
    /// Returns [`HandlerError::Failed`] when the callback reported an error.
    pub fn handle(&self, message: &T) -> Result<(), HandlerError> {
        self.dispatch(message).map(|_| ())
    }

    /// Like [`Handler::handle`], also telling whether the callback ran.
    pub(crate) fn dispatch(&self, message: &T) -> Result<bool, HandlerError> {
        if !self.accepts(message) {
            return Ok(false);
        }
        (self.callback)(message).map(|()| true)
    }

    #[must_use]
    pub const fn is_filtered(&self) -> bool {
        self.predicate.is_some()
    }
}

impl<T: ?Sized> Clone for Handler<T> {
    fn clone(&self) -> Self {
        Self { callback: Arc::clone(&self.callback), predicate: self.predicate.clone() }
    }
}

impl<T: ?Sized> fmt::Debug for Handler<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("message", &type_name::<T>())
            .field("filtered", &self.is_filtered())
            .finish_non_exhaustive()
    }
}

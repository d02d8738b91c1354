use crate::error::HandlerError;
use crate::handler::Handler;
use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A comparable handle for a Rust type, sized or not.
///
/// Equality and hashing use the [`TypeId`] only; the name is kept for logs.
#[derive(Clone, Copy)]
pub struct MessageType {
    id: TypeId,
    name: &'static str,
}

impl MessageType {
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self { id: TypeId::of::<T>(), name: type_name::<T>() }
    }

    #[must_use]
    pub const fn id(&self) -> TypeId {
        self.id
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl PartialEq for MessageType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for MessageType {}

impl Hash for MessageType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MessageType").field(&self.name).finish()
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// A value that can be published through a [`Hub`](crate::Hub).
///
/// A message is always delivered to subscriptions of its own type. To also reach
/// subscriptions of its supertypes, a message overrides [`Message::upcast`] and offers a view
/// of itself for each of them: a trait object it implements or a base struct it embeds.
///
/// # Example
///
/// ```rust
/// use msghub::{Message, Upcast};
///
/// trait Shape: Send + Sync {
///     fn area(&self) -> f64;
/// }
///
/// struct Origin {
///     x: f64,
///     y: f64,
/// }
///
/// struct Circle {
///     origin: Origin,
///     radius: f64,
/// }
///
/// impl Shape for Circle {
///     fn area(&self) -> f64 {
///         std::f64::consts::PI * self.radius * self.radius
///     }
/// }
///
/// impl Message for Circle {
///     fn upcast(&self, cast: &mut Upcast<'_>) {
///         cast.offer::<dyn Shape>(self).offer(&self.origin);
///     }
/// }
/// ```
pub trait Message: Any + Send + Sync {
    /// Offers views of this message as each of its supertypes. The default offers nothing.
    #[allow(unused_variables)]
    fn upcast(&self, cast: &mut Upcast<'_>) {}
}

enum Mode<'a> {
    Probe { found: bool },
    Deliver { handler: &'a (dyn Any + Send + Sync), outcome: Option<Result<bool, HandlerError>> },
}

/// Collects the supertype views a [`Message`] offers.
///
/// The hub drives it in two modes. While probing it only records whether the view a
/// subscription asks for is offered. While delivering it hands the first matching view to
/// that subscription's handler. Later offers of the same type are ignored.
pub struct Upcast<'a> {
    target: TypeId,
    mode: Mode<'a>,
}

impl<'a> Upcast<'a> {
    pub(crate) const fn probe(target: TypeId) -> Self {
        Self { target, mode: Mode::Probe { found: false } }
    }

    pub(crate) const fn deliver(target: TypeId, handler: &'a (dyn Any + Send + Sync)) -> Self {
        Self { target, mode: Mode::Deliver { handler, outcome: None } }
    }

    /// Whether a view typed `S` is the one being asked for.
    ///
    /// Useful to skip building an expensive view nobody subscribed to.
    #[must_use]
    pub fn wants<S: ?Sized + 'static>(&self) -> bool {
        self.target == TypeId::of::<S>()
    }

    /// Offers `view` as a supertype view of the message being published.
    pub fn offer<S: ?Sized + 'static>(&mut self, view: &S) -> &mut Self {
        if !self.wants::<S>() {
            return self;
        }

        match &mut self.mode {
            Mode::Probe { found } => *found = true,
            Mode::Deliver { handler, outcome } => {
                if outcome.is_none() {
                    *outcome = Some(handler.downcast_ref::<Handler<S>>().map_or_else(
                        || Err(mismatch::<S>()),
                        |handler| handler.dispatch(view),
                    ));
                }
            },
        }
        self
    }

    pub(crate) const fn found(&self) -> bool {
        match &self.mode {
            Mode::Probe { found } => *found,
            Mode::Deliver { outcome, .. } => outcome.is_some(),
        }
    }

    pub(crate) fn into_outcome(self) -> Option<Result<bool, HandlerError>> {
        match self.mode {
            Mode::Probe { .. } => None,
            Mode::Deliver { outcome, .. } => outcome,
        }
    }
}

impl fmt::Debug for Upcast<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Upcast")
            .field("target", &self.target)
            .field("found", &self.found())
            .finish()
    }
}

pub(crate) fn mismatch<S: ?Sized + 'static>() -> HandlerError {
    HandlerError::TypeMismatch {
        message: format!("subscription handler does not accept {}", type_name::<S>()).into(),
        context: None,
    }
}

/// Whether a subscription to `subscribed` receives `message`.
pub(crate) fn is_compatible<M: Message>(subscribed: MessageType, message: &M) -> bool {
    if subscribed.is::<M>() {
        return true;
    }
    let mut cast = Upcast::probe(subscribed.id());
    message.upcast(&mut cast);
    cast.found()
}

/// Hands `message` to a type-erased `Handler<S>` registered for `subscribed`.
pub(crate) fn deliver<M: Message>(
    subscribed: MessageType,
    handler: &(dyn Any + Send + Sync),
    message: &M,
) -> Result<bool, HandlerError> {
    if subscribed.is::<M>() {
        return handler
            .downcast_ref::<Handler<M>>()
            .map_or_else(|| Err(mismatch::<M>()), |handler| handler.dispatch(message));
    }

    let mut cast = Upcast::deliver(subscribed.id(), handler);
    message.upcast(&mut cast);
    cast.into_outcome().unwrap_or_else(|| {
        Err(HandlerError::TypeMismatch {
            message: format!("{} no longer offers {subscribed}", type_name::<M>()).into(),
            context: None,
        })
    })
}

macro_rules! leaf_messages {
    ($($ty:ty),* $(,)?) => {
        $(impl Message for $ty {})*
    };
}

leaf_messages!(
    (),
    bool,
    char,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    f32,
    f64,
    String,
    &'static str,
    Box<str>,
);

impl<T: Send + Sync + 'static> Message for Vec<T> {}

impl<T: Send + Sync + 'static> Message for Option<T> {}

/// A shared message is also delivered as the value it points to, and as that value's supertypes.
impl<T: Message> Message for Arc<T> {
    fn upcast(&self, cast: &mut Upcast<'_>) {
        cast.offer::<T>(self);
        if !cast.found() {
            T::upcast(self, cast);
        }
    }
}

use crate::message::MessageType;
use crate::token::Token;
use std::any::Any;
use std::borrow::Cow;
use std::fmt;

/// A boxed, thread-safe error returned by a subscriber callback.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors produced while invoking a message handler.
#[msghub_derive::hub_error]
pub enum HandlerError {
    /// The callback returned an error.
    #[error("Handler failed{}: {source}", format_context(.context))]
    Failed { source: BoxError, context: Option<Cow<'static, str>> },

    /// The callback panicked. The panic payload is rendered to text.
    #[error("Handler panicked{}: {message}", format_context(.context))]
    Panicked { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// An erased handler did not match the view offered for its subscribed type.
    /// This indicates a `Message::upcast` that offers different types between calls.
    #[error("Type mismatch{}: {message}", format_context(.context))]
    TypeMismatch { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl HandlerError {
    pub(crate) fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let message = payload.downcast_ref::<&'static str>().map_or_else(
            || {
                payload
                    .downcast_ref::<String>()
                    .map_or(Cow::Borrowed("unknown panic"), |msg| Cow::Owned(msg.clone()))
            },
            |msg| Cow::Borrowed(*msg),
        );
        Self::Panicked { message, context: None }
    }
}

/// Conversion of a callback's return value into a handler outcome.
///
/// Implemented for `()` (infallible callbacks) and for `Result<(), E>` where `E` converts into
/// [`BoxError`], so callbacks may report recoverable failures without panicking.
pub trait IntoHandlerResult {
    /// Converts the value into the result the dispatch loop inspects.
    ///
    /// # Errors
    /// Returns [`HandlerError::Failed`] when the callback reported an error.
    fn into_handler_result(self) -> Result<(), HandlerError>;
}

impl IntoHandlerResult for () {
    #[inline]
    fn into_handler_result(self) -> Result<(), HandlerError> {
        Ok(())
    }
}

impl<E: Into<BoxError>> IntoHandlerResult for Result<(), E> {
    #[inline]
    fn into_handler_result(self) -> Result<(), HandlerError> {
        self.map_err(|err| {
            let source: BoxError = err.into();
            HandlerError::from(source)
        })
    }
}

/// Who raised a [`Failure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    /// A type subscription, identified by its token.
    Subscription(Token),
    /// The hub's global handler.
    Global,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Subscription(token) => write!(f, "subscription {token}"),
            Self::Global => f.write_str("global handler"),
        }
    }
}

/// A handler failure observed during `publish`, handed to the registered error handler.
#[derive(Debug)]
pub struct Failure {
    origin: Origin,
    message_type: MessageType,
    error: HandlerError,
}

impl Failure {
    pub(crate) const fn new(
        origin: Origin,
        message_type: MessageType,
        error: HandlerError,
    ) -> Self {
        Self { origin, message_type, error }
    }

    #[must_use]
    pub const fn origin(&self) -> Origin {
        self.origin
    }

    /// The token of the failing subscription, or `None` for the global handler.
    #[must_use]
    pub const fn token(&self) -> Option<Token> {
        match self.origin {
            Origin::Subscription(token) => Some(token),
            Origin::Global => None,
        }
    }

    /// The runtime type of the message being delivered.
    #[must_use]
    pub const fn message_type(&self) -> MessageType {
        self.message_type
    }

    #[must_use]
    pub const fn error(&self) -> &HandlerError {
        &self.error
    }

    #[must_use]
    pub fn into_error(self) -> HandlerError {
        self.error
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed on {}: {}", self.origin, self.message_type, self.error)
    }
}

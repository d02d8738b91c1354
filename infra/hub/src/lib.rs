//! # Message Hub
//!
//! An in-process publish/subscribe broker (event aggregator) for decoupled components.
//!
//! ## Overview
//!
//! Publishers hand a typed message to a [`Hub`]; the hub synchronously invokes every
//! subscription whose type is compatible with the message, in registration order, plus an
//! optional global handler that observes every message. Subscriptions may target a supertype:
//! a trait object or an embedded base struct the message offers through [`Message::upcast`].
//!
//! ## Features
//!
//! * **Lock-free dispatch**: Publishers iterate a revision-checked snapshot published through
//!   `arc-swap`; only subscription changes take the `parking_lot` mutex.
//! * **Failure isolation**: A subscriber that returns an error or panics is reported through
//!   [`Failure`] and never stops delivery to the others.
//! * **Throttling**: Per-subscription minimum interval between deliveries.
//! * **Predicates**: [`Handler`] pairs a callback with an optional filter.
//! * **Typed variant**: [`TypedHub`] for applications that model all messages as one type.
//! * **Async friendly**: `publish_detached` moves a publish onto tokio's blocking pool.
//!
//! # Example
//!
//! ```rust
//! use msghub::{Hub, Message, Upcast};
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! trait Event: Send + Sync {}
//!
//! struct UserCreated { id: u64 }
//! impl Event for UserCreated {}
//! impl Message for UserCreated {
//!     fn upcast(&self, cast: &mut Upcast<'_>) {
//!         cast.offer::<dyn Event>(self);
//!     }
//! }
//!
//! let hub = Hub::new();
//! let events = Arc::new(AtomicUsize::new(0));
//!
//! let sink = Arc::clone(&events);
//! hub.subscribe::<dyn Event, _, _>(move |_| {
//!     sink.fetch_add(1, Ordering::SeqCst);
//! });
//! hub.subscribe(|user: &UserCreated| assert_eq!(user.id, 42));
//!
//! assert_eq!(hub.publish(UserCreated { id: 42 }), 2);
//! assert_eq!(events.load(Ordering::SeqCst), 1);
//! ```

mod config;
mod engine;
mod error;
mod handler;
mod hub;
mod message;
mod store;
mod subscription;
mod token;
mod typed;

pub use config::{GlobalFailurePolicy, HubBuilder, HubConfig};
pub use error::{BoxError, Failure, HandlerError, HandlerErrorExt, IntoHandlerResult, Origin};
pub use handler::Handler;
pub use hub::Hub;
pub use message::{Message, MessageType, Upcast};
pub use store::{Snapshot, SubscriptionStore};
pub use subscription::Subscription;
pub use token::Token;
pub use typed::TypedHub;

use crate::message::MessageType;
use crate::token::Token;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// One registered subscription: immutable identity, the handler, and its throttle state.
#[derive(Debug)]
pub struct Subscription<C> {
    token: Token,
    message_type: MessageType,
    throttle: Duration,
    created: Instant,
    /// Nanoseconds since `created` of the last passing delivery, plus one. Zero means never.
    last_invoked: AtomicU64,
    callback: C,
}

impl<C> Subscription<C> {
    /// Creates a subscription with a fresh token. A zero `throttle` disables throttling.
    #[must_use]
    pub fn new(message_type: MessageType, throttle: Duration, callback: C) -> Self {
        Self {
            token: Token::next(),
            message_type,
            throttle,
            created: Instant::now(),
            last_invoked: AtomicU64::new(0),
            callback,
        }
    }

    #[must_use]
    pub const fn token(&self) -> Token {
        self.token
    }

    #[must_use]
    pub const fn message_type(&self) -> MessageType {
        self.message_type
    }

    #[must_use]
    pub const fn throttle(&self) -> Duration {
        self.throttle
    }

    #[must_use]
    pub const fn callback(&self) -> &C {
        &self.callback
    }

    /// When the last delivery passed the throttle gate, if ever.
    ///
    /// Unthrottled subscriptions do not track deliveries and always report `None`.
    #[must_use]
    pub fn last_invoked(&self) -> Option<Instant> {
        match self.last_invoked.load(Ordering::Acquire) {
            0 => None,
            stamp => self.created.checked_add(Duration::from_nanos(stamp - 1)),
        }
    }

    /// The throttle gate.
    ///
    /// The first delivery always passes. A later one passes only when at least `throttle` has
    /// elapsed since the last passing delivery, and then records itself as the new last one.
    /// Concurrent callers race through a compare-and-swap, so one window admits one delivery.
    pub fn try_acquire(&self) -> bool {
        if self.throttle.is_zero() {
            return true;
        }

        let interval = nanos(self.throttle);
        let now = nanos(self.created.elapsed()).saturating_add(1);
        let mut last = self.last_invoked.load(Ordering::Acquire);

        loop {
            if last != 0 && now.saturating_sub(last) < interval {
                return false;
            }
            match self.last_invoked.compare_exchange_weak(
                last,
                now,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => last = actual,
            }
        }
    }
}

fn nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}

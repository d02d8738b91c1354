#![allow(dead_code)]

use msghub::{Failure, Message, Upcast};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Implemented by every message that should reach the audit log.
pub trait Audited: Send + Sync {
    fn audit_name(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenCommand {
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseCommand {
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub id: u32,
}

impl Audited for Command {
    fn audit_name(&self) -> &str {
        &self.name
    }
}

impl Audited for OpenCommand {
    fn audit_name(&self) -> &str {
        &self.command.name
    }
}

impl Audited for CloseCommand {
    fn audit_name(&self) -> &str {
        &self.command.name
    }
}

impl Audited for Order {
    fn audit_name(&self) -> &str {
        "order"
    }
}

impl Message for Command {
    fn upcast(&self, cast: &mut Upcast<'_>) {
        cast.offer::<dyn Audited>(self);
    }
}

impl Message for OpenCommand {
    fn upcast(&self, cast: &mut Upcast<'_>) {
        cast.offer::<dyn Audited>(self).offer(&self.command);
    }
}

impl Message for CloseCommand {
    fn upcast(&self, cast: &mut Upcast<'_>) {
        cast.offer::<dyn Audited>(self).offer(&self.command);
    }
}

impl Message for Order {
    fn upcast(&self, cast: &mut Upcast<'_>) {
        cast.offer::<dyn Audited>(self);
    }
}

/// A message whose supertype lookup always fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Malformed {
    pub id: u32,
}

impl Message for Malformed {
    fn upcast(&self, _cast: &mut Upcast<'_>) {
        panic!("upcast failed");
    }
}

#[must_use]
pub fn open(name: &str) -> OpenCommand {
    OpenCommand { command: Command { name: name.to_owned() } }
}

#[must_use]
pub fn close(name: &str) -> CloseCommand {
    CloseCommand { command: Command { name: name.to_owned() } }
}

/// A thread-safe log that subscribers push into.
pub type Journal<T> = Arc<Mutex<Vec<T>>>;

#[must_use]
pub fn journal<T>() -> Journal<T> {
    Arc::new(Mutex::new(Vec::new()))
}

/// Collects every failure a hub reports as `(token, rendered error)` pairs.
#[must_use]
pub fn failure_sink(
    journal: &Journal<(Option<u64>, String)>,
) -> impl Fn(&Failure) + Send + Sync + use<> {
    let journal = Arc::clone(journal);
    move |failure: &Failure| {
        journal.lock().push((failure.token().map(msghub::Token::get), failure.error().to_string()));
    }
}

/// Routes hub logs to the test output. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("msghub=trace"))
        .with_test_writer()
        .try_init();
}

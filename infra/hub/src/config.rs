use crate::hub::Hub;
use crate::typed::TypedHub;
use serde::Deserialize;

/// What happens when the global handler panics during `publish`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GlobalFailurePolicy {
    /// Catch the panic, report it to the error handler with [`Origin::Global`](crate::Origin),
    /// and continue with subscription delivery.
    #[default]
    Report,
    /// Let the panic unwind out of `publish` to the publisher.
    Propagate,
}

/// Hub settings. Every field is optional when deserialized.
///
/// ```rust
/// use msghub::{GlobalFailurePolicy, HubConfig};
///
/// let config: HubConfig = serde_json::from_str(r#"{ "name": "orders" }"#).unwrap();
///
/// assert_eq!(config.name, "orders");
/// assert_eq!(config.global_failures, GlobalFailurePolicy::Report);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Attached to every log record the hub emits.
    pub name: String,
    pub global_failures: GlobalFailurePolicy,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self { name: "hub".to_owned(), global_failures: GlobalFailurePolicy::default() }
    }
}

/// Fluent builder for [`Hub`] and [`TypedHub`].
///
/// # Example
///
/// ```rust
/// use msghub::{GlobalFailurePolicy, Hub};
///
/// let hub = Hub::builder()
///     .name("billing")
///     .global_failures(GlobalFailurePolicy::Propagate)
///     .build();
///
/// assert_eq!(hub.name(), "billing");
/// ```
#[derive(Debug, Clone, Default)]
pub struct HubBuilder {
    config: HubConfig,
}

impl HubBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the name attached to the hub's log records.
    #[must_use = "HubBuilder does nothing unless .build() is called"]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    #[must_use = "HubBuilder does nothing unless .build() is called"]
    pub const fn global_failures(mut self, policy: GlobalFailurePolicy) -> Self {
        self.config.global_failures = policy;
        self
    }

    /// Replaces every setting with `config`, typically loaded from a configuration file.
    #[must_use = "HubBuilder does nothing unless .build() is called"]
    pub fn config(mut self, config: HubConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn build(self) -> Hub {
        Hub::with_config(self.config)
    }

    /// Builds a hub statically typed to the message base type `B`.
    #[must_use]
    pub fn build_typed<B: Send + Sync + 'static>(self) -> TypedHub<B> {
        TypedHub::with_config(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = HubConfig::default();

        assert_eq!(config.name, "hub");
        assert_eq!(config.global_failures, GlobalFailurePolicy::Report);
    }

    #[test]
    fn builder_overrides() {
        let builder =
            HubBuilder::new().name("audit").global_failures(GlobalFailurePolicy::Propagate);

        assert_eq!(builder.config.name, "audit");
        assert_eq!(builder.config.global_failures, GlobalFailurePolicy::Propagate);
    }

    #[test]
    fn config_replaces_previous_settings() {
        let builder = HubBuilder::new().name("ignored").config(HubConfig::default());

        assert_eq!(builder.config, HubConfig::default());
    }
}

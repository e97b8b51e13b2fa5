//! Container settings.
//!
//! [`ContainerConfig`] derives [`serde::Deserialize`] with defaults on
//! every field, so an application can load it from whatever format it
//! already uses and pass it to
//! [`ContainerBuilder::config`](crate::container::ContainerBuilder::config).

use serde::Deserialize;

use crate::key::AliasRule;

/// Settings for a [`Container`](crate::container::Container).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    /// Replace a provider that is registered but not resolved yet.
    ///
    /// When false, such a registration fails with
    /// [`MustawdaError::DuplicateInstance`](crate::error::MustawdaError::DuplicateInstance).
    pub allow_pending_override: bool,

    /// Rule deriving the secondary spelling of each name; `None`
    /// disables aliases.
    pub alias_rule: Option<AliasRule>,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            allow_pending_override: true,
            alias_rule: Some(AliasRule::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::de::value::{Error as ValueError, MapDeserializer};

    #[test]
    fn defaults_are_permissive() {
        let config = ContainerConfig::default();
        assert!(config.allow_pending_override);
        assert_eq!(config.alias_rule, Some(AliasRule { from: '-', to: '_' }));
    }

    #[test]
    fn missing_fields_take_defaults() {
        let entries = vec![("allow_pending_override", false)];
        let de: MapDeserializer<'_, _, ValueError> = MapDeserializer::new(entries.into_iter());

        let config = ContainerConfig::deserialize(de).unwrap();
        assert!(!config.allow_pending_override);
        assert_eq!(config.alias_rule, Some(AliasRule::default()));
    }
}

//! Configuration for the model builder.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use skipnav_foundation::PropertyAccessMode;

/// Configuration for a [`ModelBuilder`](crate::ModelBuilder).
///
/// Controls convention naming and when discovery runs.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BuilderConfig {
    /// Separator between the principal name and key property name in
    /// generated join properties (`ImplicitManyToManyA_Id`).
    pub key_separator: String,

    /// Model-wide default access mode.
    pub default_access_mode: PropertyAccessMode,

    /// Run discovery after every configuration call (false = only on
    /// [`ModelBuilder::discover`](crate::ModelBuilder::discover) and at
    /// finalization).
    pub eager_discovery: bool,

    /// Allow the builder to synthesize implicit join entity types. When
    /// disabled, a many-to-many relationship stays detached until
    /// `using_entity` names its join.
    pub implicit_joins: bool,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            key_separator: "_".to_string(),
            default_access_mode: PropertyAccessMode::PreferField,
            eager_discovery: true,
            implicit_joins: true,
        }
    }
}

impl BuilderConfig {
    /// Creates a configuration that defers discovery until finalization.
    ///
    /// Intermediate state is not queryable for convention-derived
    /// relationships, but bulk configuration is cheaper.
    #[must_use]
    pub fn deferred() -> Self {
        Self {
            eager_discovery: false,
            ..Self::default()
        }
    }

    /// Builder method to set the key separator.
    #[must_use]
    pub fn with_key_separator(mut self, separator: impl Into<String>) -> Self {
        self.key_separator = separator.into();
        self
    }

    /// Builder method to set the default access mode.
    #[must_use]
    pub fn with_default_access_mode(mut self, mode: PropertyAccessMode) -> Self {
        self.default_access_mode = mode;
        self
    }

    /// Builder method to enable/disable eager discovery.
    #[must_use]
    pub fn with_eager_discovery(mut self, eager: bool) -> Self {
        self.eager_discovery = eager;
        self
    }

    /// Builder method to enable/disable implicit join synthesis.
    #[must_use]
    pub fn with_implicit_joins(mut self, enabled: bool) -> Self {
        self.implicit_joins = enabled;
        self
    }
}

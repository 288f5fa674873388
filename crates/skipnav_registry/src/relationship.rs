//! Relationship metadata: foreign keys, navigations, and skip navigations.
//!
//! A foreign key links a dependent entity type to a principal key. A
//! navigation walks one foreign key from either end. A skip navigation walks
//! two foreign keys through a join entity type, skipping over the join.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use skipnav_foundation::{
    ConfigurationSource, EntityTypeId, ForeignKeyId, KeyId, NavigationId, PropertyAccessMode,
    PropertyId, SkipNavigationId,
};

/// A foreign key from a dependent entity type to a principal key.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ForeignKey {
    /// Dependent (declaring) entity type.
    pub declaring: EntityTypeId,
    /// Dependent properties, matching the principal key in arity.
    pub properties: im::Vector<PropertyId>,
    /// Principal entity type.
    pub principal: EntityTypeId,
    /// Referenced key on the principal.
    pub principal_key: KeyId,
    /// Reference navigation on the dependent, if any.
    pub dependent_to_principal: Option<NavigationId>,
    /// Collection navigation on the principal, if any.
    pub principal_to_dependent: Option<NavigationId>,
    /// Skip navigations that traverse this foreign key.
    pub referencing_skip_navigations: im::Vector<SkipNavigationId>,
    /// Where the foreign key came from.
    pub source: ConfigurationSource,
}

impl ForeignKey {
    /// Returns true if neither end has a navigation.
    #[must_use]
    pub fn is_unnavigated(&self) -> bool {
        self.dependent_to_principal.is_none() && self.principal_to_dependent.is_none()
    }
}

/// A navigation along a single foreign key.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Navigation {
    /// Member name.
    pub name: String,
    /// Declaring entity type.
    pub declaring: EntityTypeId,
    /// Entity type at the other end.
    pub target: EntityTypeId,
    /// The foreign key this navigation walks.
    pub foreign_key: ForeignKeyId,
    /// True if declared on the dependent, pointing at the principal.
    pub on_dependent: bool,
    /// True for collection navigations.
    pub is_collection: bool,
    /// Access mode for this navigation, if overridden.
    pub access_mode: Option<PropertyAccessMode>,
    /// Where the navigation came from.
    pub source: ConfigurationSource,
}

/// A navigation that reaches the other side of a many-to-many relationship
/// through a join entity type.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SkipNavigation {
    /// Member name.
    pub name: String,
    /// Declaring entity type.
    pub declaring: EntityTypeId,
    /// Entity type reached through the join.
    pub target: EntityTypeId,
    /// Foreign key on the join that points back at the declaring type.
    pub foreign_key: Option<ForeignKeyId>,
    /// The skip navigation on the target that walks back here.
    pub inverse: Option<SkipNavigationId>,
    /// Access mode for this skip navigation, if overridden.
    pub access_mode: Option<PropertyAccessMode>,
    /// Where the skip navigation came from.
    pub source: ConfigurationSource,
}

impl SkipNavigation {
    /// Creates a skip navigation with no foreign key or inverse yet.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        declaring: EntityTypeId,
        target: EntityTypeId,
        source: ConfigurationSource,
    ) -> Self {
        Self {
            name: name.into(),
            declaring,
            target,
            foreign_key: None,
            inverse: None,
            access_mode: None,
            source,
        }
    }

    /// Skip navigations are always collections.
    #[must_use]
    pub fn is_collection(&self) -> bool {
        true
    }
}

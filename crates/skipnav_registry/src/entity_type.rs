//! Entity type metadata: entity types, properties, and keys.
//!
//! These are plain records owned by the [`Model`](crate::Model). Cross
//! references are handles into the model's arenas; the model keeps both
//! directions of every reference consistent.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use skipnav_foundation::{
    ConfigurationSource, EntityTypeId, ForeignKeyId, KeyId, NavigationId, PropertyAccessMode,
    PropertyId, ScalarType, ShapeId, SkipNavigationId,
};

/// A named entity type backed by a shape.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EntityType {
    /// Unique name within the model.
    pub name: String,
    /// Backing shape.
    pub shape: ShapeId,
    /// True if this type is one of several named types sharing its shape.
    pub has_shared_shape: bool,
    /// True if the builder created this type as an implicit join.
    pub implicit_join: bool,
    /// Where the entity type came from.
    pub source: ConfigurationSource,
    /// Properties in creation order.
    pub properties: im::Vector<PropertyId>,
    /// The primary key, if one has been set.
    pub primary_key: Option<KeyId>,
    /// All keys declared on this type, primary included.
    pub keys: im::Vector<KeyId>,
    /// Foreign keys declared on this type, in declaration order.
    pub foreign_keys: im::Vector<ForeignKeyId>,
    /// Navigations declared on this type.
    pub navigations: im::Vector<NavigationId>,
    /// Skip navigations declared on this type.
    pub skip_navigations: im::Vector<SkipNavigationId>,
    /// Members excluded from the model.
    pub ignored_members: im::OrdSet<String>,
    /// Access mode for members of this type, if overridden.
    pub access_mode: Option<PropertyAccessMode>,
}

impl EntityType {
    /// Creates an empty entity type.
    #[must_use]
    pub fn new(name: impl Into<String>, shape: ShapeId, source: ConfigurationSource) -> Self {
        Self {
            name: name.into(),
            shape,
            has_shared_shape: false,
            implicit_join: false,
            source,
            properties: im::Vector::new(),
            primary_key: None,
            keys: im::Vector::new(),
            foreign_keys: im::Vector::new(),
            navigations: im::Vector::new(),
            skip_navigations: im::Vector::new(),
            ignored_members: im::OrdSet::new(),
            access_mode: None,
        }
    }

    /// Returns true if this type was created implicitly as a join.
    #[must_use]
    pub fn is_implicitly_created_join_entity_type(&self) -> bool {
        self.implicit_join
    }

    /// Returns true if the member has been ignored.
    #[must_use]
    pub fn is_ignored(&self, member: &str) -> bool {
        self.ignored_members.contains(member)
    }

    /// Iterates over the declared foreign keys, most recently declared first.
    pub fn foreign_keys_most_recent_first(&self) -> impl Iterator<Item = ForeignKeyId> + '_ {
        self.foreign_keys.iter().rev().copied()
    }

    /// Returns the first declared foreign key.
    #[must_use]
    pub fn first_foreign_key(&self) -> Option<ForeignKeyId> {
        self.foreign_keys.front().copied()
    }

    /// Returns the most recently declared foreign key.
    #[must_use]
    pub fn last_foreign_key(&self) -> Option<ForeignKeyId> {
        self.foreign_keys.back().copied()
    }
}

/// Flags describing how a property is backed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PropertyFlags {
    /// No backing member on the shape.
    pub shadow: bool,
    /// Stored through the property bag's string indexer.
    pub indexer: bool,
}

impl PropertyFlags {
    /// A property backed by a shape member.
    pub const MEMBER: Self = Self {
        shadow: false,
        indexer: false,
    };

    /// A property with no backing member.
    pub const SHADOW: Self = Self {
        shadow: true,
        indexer: false,
    };

    /// A property stored through a property bag's indexer.
    pub const INDEXER: Self = Self {
        shadow: false,
        indexer: true,
    };
}

/// A scalar property of an entity type.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Property {
    /// Property name, unique within the declaring type.
    pub name: String,
    /// Declaring entity type.
    pub declaring: EntityTypeId,
    /// Value type.
    pub ty: ScalarType,
    /// How the property is backed.
    pub flags: PropertyFlags,
    /// Where the property came from.
    pub source: ConfigurationSource,
}

impl Property {
    /// Returns true if the property has no backing member.
    #[must_use]
    pub fn is_shadow(&self) -> bool {
        self.flags.shadow
    }

    /// Returns true if the property is stored through an indexer.
    #[must_use]
    pub fn is_indexer(&self) -> bool {
        self.flags.indexer
    }
}

/// A key: an ordered list of properties of one entity type.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Key {
    /// Declaring entity type.
    pub declaring: EntityTypeId,
    /// Key properties, in order.
    pub properties: im::Vector<PropertyId>,
    /// Where the key came from.
    pub source: ConfigurationSource,
}

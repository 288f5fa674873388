//! The configuration log.
//!
//! Every successful configuration call is recorded by name. Finalization
//! replays the *effective* configuration: the log with superseded calls
//! removed. Normalization is a pure function of the recorded calls.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use skipnav_foundation::{PropertyAccessMode, ScalarType};

/// How a configuration call names an entity type.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EntityRef {
    /// An existing entity type, by name.
    Name(String),
    /// The entity type of a non-shared shape, created by convention if needed.
    Shape(String),
}

impl EntityRef {
    /// Returns the referenced name (entity types of non-shared shapes are
    /// named after their shape).
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            EntityRef::Name(name) | EntityRef::Shape(name) => name,
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One side of an explicit join: the navigations along the join foreign key
/// that points at that side.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct JoinForeignKey {
    /// Reference navigation on the join pointing at the principal.
    pub navigation: Option<String>,
    /// Collection navigation on the principal pointing at join rows.
    pub inverse: Option<String>,
}

impl JoinForeignKey {
    /// Creates a join foreign key without navigations.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the reference navigation on the join.
    #[must_use]
    pub fn navigation(mut self, name: &str) -> Self {
        self.navigation = Some(name.to_string());
        self
    }

    /// Builder method to set the collection navigation on the principal.
    #[must_use]
    pub fn inverse(mut self, name: &str) -> Self {
        self.inverse = Some(name.to_string());
        self
    }
}

/// An explicit join entity for a many-to-many relationship.
///
/// ```
/// use skipnav_builder::{JoinEntity, JoinForeignKey};
///
/// let join = JoinEntity::shape("ProductCategory")
///     .left(JoinForeignKey::new().navigation("Category"))
///     .right(JoinForeignKey::new().navigation("Product"))
///     .with_key(&["ProductId", "CategoryId"]);
/// assert_eq!(join.to_string(), "ProductCategory");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct JoinEntity {
    /// Backing shape name.
    pub shape: String,
    /// Entity type name for a shared shape.
    pub name: Option<String>,
    /// Foreign key pointing at the left side.
    pub left: JoinForeignKey,
    /// Foreign key pointing at the right side.
    pub right: JoinForeignKey,
    /// Explicit primary key property names.
    pub key: Option<Vec<String>>,
    /// Explicit properties backed by shape members.
    pub properties: Vec<String>,
    /// Explicit indexer properties (property-bag shapes only).
    pub indexer_properties: Vec<(String, ScalarType)>,
}

impl JoinEntity {
    /// Creates a join backed by a shape.
    #[must_use]
    pub fn shape(shape: &str) -> Self {
        Self {
            shape: shape.to_string(),
            name: None,
            left: JoinForeignKey::default(),
            right: JoinForeignKey::default(),
            key: None,
            properties: Vec::new(),
            indexer_properties: Vec::new(),
        }
    }

    /// Builder method to name a shared-shape join.
    #[must_use]
    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Builder method to configure the foreign key to the left side.
    #[must_use]
    pub fn left(mut self, foreign_key: JoinForeignKey) -> Self {
        self.left = foreign_key;
        self
    }

    /// Builder method to configure the foreign key to the right side.
    #[must_use]
    pub fn right(mut self, foreign_key: JoinForeignKey) -> Self {
        self.right = foreign_key;
        self
    }

    /// Builder method to set the primary key.
    #[must_use]
    pub fn with_key(mut self, properties: &[&str]) -> Self {
        self.key = Some(properties.iter().map(ToString::to_string).collect());
        self
    }

    /// Builder method to add a property backed by a shape member.
    #[must_use]
    pub fn with_property(mut self, name: &str) -> Self {
        self.properties.push(name.to_string());
        self
    }

    /// Builder method to add an indexer property.
    #[must_use]
    pub fn with_indexer_property(mut self, name: &str, ty: ScalarType) -> Self {
        self.indexer_properties.push((name.to_string(), ty));
        self
    }

    /// The entity type name this join resolves to.
    #[must_use]
    pub fn entity_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.shape)
    }
}

impl fmt::Display for JoinEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}(\"{name}\")", self.shape),
            None => f.write_str(&self.shape),
        }
    }
}

/// A recorded configuration call.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ConfigurationCall {
    /// `entity(shape)`
    Entity {
        /// Shape name.
        shape: String,
    },
    /// `shared_type(shape)`
    SharedType {
        /// Shape name.
        shape: String,
    },
    /// `shared_type_entity(name, shape)`
    SharedTypeEntity {
        /// Entity type name.
        name: String,
        /// Shared shape name.
        shape: String,
    },
    /// `ignore(shape)`
    IgnoreShape {
        /// Shape name.
        shape: String,
    },
    /// `ignore_entity(name)`
    IgnoreEntity {
        /// Entity type name.
        name: String,
    },
    /// `entity.ignore(member)`
    IgnoreMember {
        /// Entity type name.
        entity: String,
        /// Member name.
        member: String,
    },
    /// `entity.property(name)`
    Property {
        /// Entity type name.
        entity: String,
        /// Property name.
        name: String,
    },
    /// `entity.indexer_property(name, ty)`
    IndexerProperty {
        /// Entity type name.
        entity: String,
        /// Property name.
        name: String,
        /// Value type.
        ty: ScalarType,
    },
    /// `entity.has_key(properties)`
    Key {
        /// Entity type name.
        entity: String,
        /// Key property names, in key order.
        properties: Vec<String>,
    },
    /// An explicit one-to-many relationship.
    OneToMany {
        /// The "one" side.
        principal: EntityRef,
        /// Collection navigation on the principal.
        collection: Option<String>,
        /// The "many" side, which declares the foreign key.
        dependent: EntityRef,
        /// Reference navigation on the dependent.
        reference: Option<String>,
    },
    /// An explicit many-to-many relationship.
    ManyToMany {
        /// The side `has_many` was called on.
        left: EntityRef,
        /// Skip navigation on the left side.
        left_navigation: Option<String>,
        /// The other side.
        right: EntityRef,
        /// Skip navigation on the right side.
        right_navigation: Option<String>,
        /// Explicit join, if any.
        join: Option<JoinEntity>,
    },
    /// `use_property_access_mode(mode)`, for an entity type or one navigation.
    AccessMode {
        /// Entity type name.
        entity: String,
        /// Navigation name, or `None` for the whole entity type.
        member: Option<String>,
        /// The access mode.
        mode: PropertyAccessMode,
    },
}

fn end(f: &mut fmt::Formatter<'_>, entity: &EntityRef, navigation: Option<&String>) -> fmt::Result {
    match navigation {
        Some(navigation) => write!(f, "{entity}.{navigation}"),
        None => write!(f, "{entity}"),
    }
}

impl fmt::Display for ConfigurationCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigurationCall::Entity { shape } => write!(f, "entity({shape})"),
            ConfigurationCall::SharedType { shape } => write!(f, "shared_type({shape})"),
            ConfigurationCall::SharedTypeEntity { name, shape } => {
                write!(f, "shared_type_entity({name}, {shape})")
            }
            ConfigurationCall::IgnoreShape { shape } => write!(f, "ignore({shape})"),
            ConfigurationCall::IgnoreEntity { name } => write!(f, "ignore_entity({name})"),
            ConfigurationCall::IgnoreMember { entity, member } => {
                write!(f, "{entity}.ignore({member})")
            }
            ConfigurationCall::Property { entity, name } => write!(f, "{entity}.property({name})"),
            ConfigurationCall::IndexerProperty { entity, name, ty } => {
                write!(f, "{entity}.indexer_property({name}: {ty:?})")
            }
            ConfigurationCall::Key { entity, properties } => {
                write!(f, "{entity}.has_key({})", properties.join(", "))
            }
            ConfigurationCall::OneToMany {
                principal,
                collection,
                dependent,
                reference,
            } => {
                f.write_str("one_to_many(")?;
                end(f, principal, collection.as_ref())?;
                f.write_str(", ")?;
                end(f, dependent, reference.as_ref())?;
                f.write_str(")")
            }
            ConfigurationCall::ManyToMany {
                left,
                left_navigation,
                right,
                right_navigation,
                join,
            } => {
                f.write_str("many_to_many(")?;
                end(f, left, left_navigation.as_ref())?;
                f.write_str(", ")?;
                end(f, right, right_navigation.as_ref())?;
                f.write_str(")")?;
                match join {
                    Some(join) => write!(f, ".using_entity({join})"),
                    None => Ok(()),
                }
            }
            ConfigurationCall::AccessMode {
                entity,
                member: Some(member),
                mode,
            } => write!(f, "{entity}.navigation({member}).use_property_access_mode({mode:?})"),
            ConfigurationCall::AccessMode {
                entity,
                member: None,
                mode,
            } => write!(f, "{entity}.use_property_access_mode({mode:?})"),
        }
    }
}

impl ConfigurationCall {
    /// Returns true for calls that remove configuration.
    #[must_use]
    pub fn is_ignore(&self) -> bool {
        matches!(
            self,
            ConfigurationCall::IgnoreShape { .. }
                | ConfigurationCall::IgnoreEntity { .. }
                | ConfigurationCall::IgnoreMember { .. }
        )
    }

    /// Returns true if this call configures (or ignores) `entity.member`.
    #[must_use]
    pub fn touches_member(&self, entity: &str, member: &str) -> bool {
        let is = |e: &str, m: Option<&String>| e == entity && m.is_some_and(|m| m == member);
        match self {
            ConfigurationCall::IgnoreMember { entity: e, member: m }
            | ConfigurationCall::Property { entity: e, name: m }
            | ConfigurationCall::IndexerProperty { entity: e, name: m, .. } => is(e, Some(m)),
            ConfigurationCall::AccessMode { entity: e, member, .. } => is(e, member.as_ref()),
            ConfigurationCall::OneToMany {
                principal,
                collection,
                dependent,
                reference,
            } => {
                is(principal.as_str(), collection.as_ref())
                    || is(dependent.as_str(), reference.as_ref())
            }
            ConfigurationCall::ManyToMany {
                left,
                left_navigation,
                right,
                right_navigation,
                join,
            } => {
                is(left.as_str(), left_navigation.as_ref())
                    || is(right.as_str(), right_navigation.as_ref())
                    || join.as_ref().is_some_and(|join| {
                        is(left.as_str(), join.left.inverse.as_ref())
                            || is(right.as_str(), join.right.inverse.as_ref())
                            || is(join.entity_name(), join.left.navigation.as_ref())
                            || is(join.entity_name(), join.right.navigation.as_ref())
                    })
            }
            _ => false,
        }
    }

    /// Returns true if this call names the entity type `name` anywhere.
    #[must_use]
    pub fn mentions_entity(&self, name: &str) -> bool {
        match self {
            ConfigurationCall::Entity { shape } | ConfigurationCall::IgnoreShape { shape } => {
                shape == name
            }
            ConfigurationCall::SharedTypeEntity { name: n, .. }
            | ConfigurationCall::IgnoreEntity { name: n } => n == name,
            ConfigurationCall::SharedType { .. } => false,
            ConfigurationCall::IgnoreMember { entity, .. }
            | ConfigurationCall::Property { entity, .. }
            | ConfigurationCall::IndexerProperty { entity, .. }
            | ConfigurationCall::Key { entity, .. }
            | ConfigurationCall::AccessMode { entity, .. } => entity == name,
            ConfigurationCall::OneToMany {
                principal,
                dependent,
                ..
            } => principal.as_str() == name || dependent.as_str() == name,
            ConfigurationCall::ManyToMany {
                left, right, join, ..
            } => {
                left.as_str() == name
                    || right.as_str() == name
                    || join.as_ref().is_some_and(|j| j.entity_name() == name)
            }
        }
    }

    /// Returns true if this (non-ignore) call undoes the earlier ignore.
    fn revives(&self, earlier: &ConfigurationCall) -> bool {
        match earlier {
            ConfigurationCall::IgnoreMember { entity, member } => {
                self.touches_member(entity, member)
            }
            ConfigurationCall::IgnoreShape { shape: name }
            | ConfigurationCall::IgnoreEntity { name } => self.mentions_entity(name),
            _ => false,
        }
    }

    /// The identity of a many-to-many declaration, without its join.
    fn pair(&self) -> Option<(&str, Option<&String>, &str, Option<&String>)> {
        match self {
            ConfigurationCall::ManyToMany {
                left,
                left_navigation,
                right,
                right_navigation,
                ..
            } => Some((
                left.as_str(),
                left_navigation.as_ref(),
                right.as_str(),
                right_navigation.as_ref(),
            )),
            _ => None,
        }
    }

    /// Returns true if `later` overwrites this call in place.
    fn is_replaced_by(&self, later: &ConfigurationCall) -> bool {
        match (self, later) {
            (
                ConfigurationCall::Key { entity: a, .. },
                ConfigurationCall::Key { entity: b, .. },
            ) => a == b,
            (
                ConfigurationCall::AccessMode {
                    entity: a,
                    member: x,
                    ..
                },
                ConfigurationCall::AccessMode {
                    entity: b,
                    member: y,
                    ..
                },
            ) => a == b && x == y,
            (ConfigurationCall::ManyToMany { .. }, ConfigurationCall::ManyToMany { join, .. }) => {
                join.is_some() && self.pair() == later.pair()
            }
            _ => false,
        }
    }

    /// Returns true if this call makes `later` redundant.
    fn absorbs(&self, later: &ConfigurationCall) -> bool {
        if self == later {
            return true;
        }
        match later {
            ConfigurationCall::ManyToMany { join: None, .. } => {
                self.pair().is_some() && self.pair() == later.pair()
            }
            _ => false,
        }
    }
}

/// The ordered record of successful configuration calls.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConfigurationLog {
    calls: Vec<ConfigurationCall>,
}

impl ConfigurationLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a call.
    pub fn record(&mut self, call: ConfigurationCall) {
        self.calls.push(call);
    }

    /// Returns the recorded calls in order.
    #[must_use]
    pub fn calls(&self) -> &[ConfigurationCall] {
        &self.calls
    }

    /// Returns the number of recorded calls.
    #[must_use]
    pub fn len(&self) -> usize {
        self.calls.len()
    }

    /// Returns true if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Normalizes the log into the effective configuration.
    ///
    /// - a later ignore drops earlier calls touching the ignored member,
    ///   shape or entity type
    /// - later explicit configuration drops the earlier ignore it undoes
    /// - a re-declared many-to-many with a join replaces the earlier
    ///   declaration in place; one without a join is absorbed
    /// - `has_key` and access modes are replaced in place
    /// - identical calls keep their first position
    #[must_use]
    pub fn effective(&self) -> Vec<ConfigurationCall> {
        let mut effective: Vec<ConfigurationCall> = Vec::with_capacity(self.calls.len());
        for call in &self.calls {
            match call {
                ConfigurationCall::IgnoreMember { entity, member } => {
                    effective.retain(|c| !c.touches_member(entity, member));
                }
                ConfigurationCall::IgnoreShape { shape: name }
                | ConfigurationCall::IgnoreEntity { name } => {
                    effective.retain(|c| !c.mentions_entity(name));
                }
                _ => effective.retain(|c| !(c.is_ignore() && call.revives(c))),
            }

            if let Some(slot) = effective.iter_mut().find(|c| c.is_replaced_by(call)) {
                *slot = call.clone();
            } else if !effective.iter().any(|c| c.absorbs(call)) {
                effective.push(call.clone());
            }
        }
        effective
    }
}

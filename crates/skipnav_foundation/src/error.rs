//! Error types for the skipnav model builder.
//!
//! Uses `thiserror` for ergonomic error definition with rich context.
//! Every error is terminal: a failing configuration call is aborted and
//! nothing is retried internally.

use std::fmt;

use thiserror::Error;

use crate::handle::Handle;

/// The main error type for skipnav operations.
///
/// The display text is the text of [`ErrorKind`] alone, so two failures of
/// the same kind with the same arguments always render identically no matter
/// which configuration call raised them.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional context about where the error occurred.
    pub context: Option<ErrorContext>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    /// Adds context to this error.
    ///
    /// Context that is already present is kept and the new frames are
    /// appended to its stack.
    #[must_use]
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = Some(match self.context.take() {
            Some(mut existing) => {
                if existing.call.is_none() {
                    existing.call = context.call;
                }
                existing.stack.extend(context.stack);
                existing
            }
            None => context,
        });
        self
    }

    /// Creates a conflicting relationship navigation error.
    ///
    /// `navigation` is the navigation that already participates in a
    /// single-valued relationship and `other` is that relationship's other end.
    #[must_use]
    pub fn conflicting_navigation(
        first: impl Into<String>,
        second: impl Into<String>,
        navigation: impl Into<String>,
        other: impl Into<String>,
    ) -> Self {
        Self::new(ErrorKind::ConflictingRelationshipNavigation {
            first: first.into(),
            second: second.into(),
            navigation: navigation.into(),
            other: other.into(),
        })
    }

    /// Creates a missing inverse navigation error.
    #[must_use]
    pub fn missing_inverse(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self::new(ErrorKind::MissingInverseManyToManyNavigation {
            left: left.into(),
            right: right.into(),
        })
    }

    /// Creates a clashing shared type error.
    #[must_use]
    pub fn clashing_shared_type(shape: impl Into<String>) -> Self {
        Self::new(ErrorKind::ClashingSharedType(shape.into()))
    }

    /// Creates a type-not-marked-as-shared error.
    #[must_use]
    pub fn not_marked_as_shared(shape: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeNotMarkedAsShared(shape.into()))
    }

    /// Creates a model finalized error.
    #[must_use]
    pub fn model_finalized() -> Self {
        Self::new(ErrorKind::ModelFinalized)
    }

    /// Creates an entity type not found error.
    #[must_use]
    pub fn entity_type_not_found(name: impl Into<String>) -> Self {
        Self::new(ErrorKind::EntityTypeNotFound(name.into()))
    }

    /// Creates a member not found error.
    #[must_use]
    pub fn member_not_found(shape: impl Into<String>, member: impl Into<String>) -> Self {
        Self::new(ErrorKind::MemberNotFound {
            shape: shape.into(),
            member: member.into(),
        })
    }

    /// Creates a stale handle error.
    #[must_use]
    pub fn stale_handle<H: Handle>(handle: H) -> Self {
        Self::new(ErrorKind::StaleHandle(format!("{handle:?}")))
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal(message.into()))
    }
}

/// Categorized error kinds for pattern matching.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A navigation already participates in a single-valued relationship and
    /// cannot also be one half of a many-to-many relationship.
    #[error(
        "the navigations '{first}' and '{second}' cannot form a many-to-many relationship \
         while '{navigation}' participates in a relationship with '{other}'; \
         a navigation can only participate in a single relationship"
    )]
    ConflictingRelationshipNavigation {
        /// The navigation blamed for the conflict, as `Type.Navigation`.
        first: String,
        /// The other navigation of the many-to-many pair.
        second: String,
        /// The navigation that participates in the single-valued relationship.
        navigation: String,
        /// The other end of the single-valued relationship.
        other: String,
    },

    /// A many-to-many relationship was declared with only one navigation.
    #[error(
        "unable to set up a many-to-many relationship between '{left}' and '{right}' \
         because one of the navigations was not specified; provide a navigation on both sides"
    )]
    MissingInverseManyToManyNavigation {
        /// The entity type the relationship was declared on.
        left: String,
        /// The entity type on the other side.
        right: String,
    },

    /// A shape used by shared-type entity types was used for an ordinary one,
    /// or the other way around.
    #[error(
        "the shape '{0}' cannot back an ordinary entity type because it is configured as a shared type"
    )]
    ClashingSharedType(String),

    /// A named entity type was requested for a shape that is not shared.
    #[error(
        "the shape '{0}' has not been configured as a shared type; \
         register it as shared before using it for a named entity type"
    )]
    TypeNotMarkedAsShared(String),

    /// The model was mutated after finalization.
    #[error("the model has been finalized and is read-only")]
    ModelFinalized,

    /// The shape is not declared in the catalog.
    #[error("shape not found: {0}")]
    ShapeNotFound(String),

    /// The shape does not declare the member.
    #[error("member not found: {member} on shape {shape}")]
    MemberNotFound {
        /// The shape that was queried.
        shape: String,
        /// The member name that was not found.
        member: String,
    },

    /// The member is not a collection navigation.
    #[error("'{shape}.{member}' is not a collection navigation")]
    NotACollectionNavigation {
        /// The declaring shape.
        shape: String,
        /// The member name.
        member: String,
    },

    /// The member is not a reference navigation.
    #[error("'{shape}.{member}' is not a reference navigation")]
    NotAReferenceNavigation {
        /// The declaring shape.
        shape: String,
        /// The member name.
        member: String,
    },

    /// The navigation points at a different shape than the relationship needs.
    #[error("'{navigation}' targets '{actual}' but the relationship requires '{expected}'")]
    NavigationTargetMismatch {
        /// The navigation, as `Type.Navigation`.
        navigation: String,
        /// The shape the relationship requires.
        expected: String,
        /// The shape the navigation actually targets.
        actual: String,
    },

    /// No entity type with this name exists.
    #[error("entity type not found: {0}")]
    EntityTypeNotFound(String),

    /// An entity type with this name already exists with a different identity.
    #[error("an entity type named '{0}' already exists")]
    DuplicateEntityType(String),

    /// The principal of a relationship has no primary key.
    #[error("the entity type '{0}' has no primary key and cannot be a principal")]
    MissingPrimaryKey(String),

    /// The property does not exist on the entity type.
    #[error("property not found: {property} on entity type {entity}")]
    PropertyNotFound {
        /// The entity type that was queried.
        entity: String,
        /// The property name that was not found.
        property: String,
    },

    /// Indexer properties are only valid on property-bag entity types.
    #[error("cannot add indexer property '{property}' to '{entity}': not a property-bag entity type")]
    InvalidIndexerProperty {
        /// The entity type.
        entity: String,
        /// The property name.
        property: String,
    },

    /// The entity type has no navigation or skip navigation with this name.
    #[error("navigation not found: {navigation} on entity type {entity}")]
    NavigationNotFound {
        /// The entity type that was queried.
        entity: String,
        /// The navigation name that was not found.
        navigation: String,
    },

    /// A join entity type does not have the shape a many-to-many relationship requires.
    #[error("invalid join entity type '{entity}': {reason}")]
    InvalidJoinEntity {
        /// The join entity type.
        entity: String,
        /// Description of the violated invariant.
        reason: String,
    },

    /// A handle refers to an object that was removed.
    #[error("stale handle: {0}")]
    StaleHandle(String),

    /// Internal error (should not happen).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Context about where an error occurred.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    /// The configuration call that failed, rendered as text.
    pub call: Option<String>,
    /// Enclosing passes (for example `finalize_model`), innermost first.
    pub stack: Vec<String>,
}

impl ErrorContext {
    /// Creates a new empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the configuration call that failed.
    #[must_use]
    pub fn with_call(mut self, call: impl Into<String>) -> Self {
        self.call = Some(call.into());
        self
    }

    /// Adds a stack frame.
    #[must_use]
    pub fn with_frame(mut self, frame: impl Into<String>) -> Self {
        self.stack.push(frame.into());
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(call) = &self.call {
            write!(f, "in {call}")?;
        }
        if !self.stack.is_empty() {
            writeln!(f)?;
            for frame in &self.stack {
                writeln!(f, "  during {frame}")?;
            }
        }
        Ok(())
    }
}

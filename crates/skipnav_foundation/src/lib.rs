//! Core handles, shapes, and error types for skipnav.
//!
//! This crate provides:
//! - Generational handles ([`EntityTypeId`], [`ForeignKeyId`], [`SkipNavigationId`], ...)
//! - [`ShapeCatalog`] - The declared members of every host shape
//! - [`ScalarType`], [`ConfigurationSource`], [`PropertyAccessMode`]
//! - [`Error`] - Rich error types with context

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod handle;
pub mod shape;
pub mod types;

pub use error::{Error, ErrorContext, ErrorKind};
pub use handle::{
    EntityTypeId, ForeignKeyId, Handle, KeyId, NavigationId, PropertyId, SkipNavigationId,
};
pub use shape::{Member, MemberKind, Shape, ShapeBuilder, ShapeCatalog, ShapeId};
pub use types::{ConfigurationSource, PropertyAccessMode, ScalarType};

/// Result type alias using the skipnav [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

//! Entity type registry for skipnav.
//!
//! This crate provides:
//! - [`Arena`] - Generational storage addressed by typed handles
//! - [`EntityType`], [`Property`], [`Key`] - Entity type metadata
//! - [`ForeignKey`], [`Navigation`], [`SkipNavigation`] - Relationship metadata
//! - [`Model`] - The registry itself, with cascading removal

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod arena;
pub mod entity_type;
pub mod model;
pub mod relationship;

pub use arena::Arena;
pub use entity_type::{EntityType, Key, Property, PropertyFlags};
pub use model::Model;
pub use relationship::{ForeignKey, Navigation, SkipNavigation};

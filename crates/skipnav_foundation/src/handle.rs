//! Generational handles for registry objects.
//!
//! Every object in the metadata registry (entity types, properties, keys,
//! foreign keys, navigations, skip navigations) is addressed by a typed
//! handle carrying a slot index and a generation counter. The generation
//! increments when a slot is reused after removal, so a handle to a removed
//! object never compares equal to a handle of the object that replaced it.
//!
//! Handle equality is object identity: two lookups that return equal handles
//! returned the *same* object.

use std::fmt;
use std::hash::Hash;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Behaviour shared by all generational handles.
pub trait Handle: Copy + Eq + Hash + fmt::Debug {
    /// Short lowercase name of the handled object, used in diagnostics.
    const KIND: &'static str;

    /// Creates a handle from its slot index and generation.
    fn from_parts(index: u32, generation: u32) -> Self;

    /// Returns the slot index.
    fn index(self) -> u32;

    /// Returns the generation counter.
    fn generation(self) -> u32;
}

macro_rules! define_handle {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
        #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
        pub struct $name {
            index: u32,
            generation: u32,
        }

        impl $name {
            /// Creates a handle with the given index and generation.
            #[must_use]
            pub const fn new(index: u32, generation: u32) -> Self {
                Self { index, generation }
            }
        }

        impl Handle for $name {
            const KIND: &'static str = $kind;

            fn from_parts(index: u32, generation: u32) -> Self {
                Self::new(index, generation)
            }

            fn index(self) -> u32 {
                self.index
            }

            fn generation(self) -> u32 {
                self.generation
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({}v{})", stringify!($name), self.index, self.generation)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", $kind, self.index)
            }
        }
    };
}

define_handle!(
    /// Handle to an entity type.
    EntityTypeId,
    "entity-type"
);

define_handle!(
    /// Handle to a scalar property.
    PropertyId,
    "property"
);

define_handle!(
    /// Handle to a key (primary or alternate).
    KeyId,
    "key"
);

define_handle!(
    /// Handle to a foreign key.
    ForeignKeyId,
    "foreign-key"
);

define_handle!(
    /// Handle to a single- or collection-valued navigation backed by one foreign key.
    NavigationId,
    "navigation"
);

define_handle!(
    /// Handle to a skip navigation (a navigation through a join entity type).
    SkipNavigationId,
    "skip-navigation"
);

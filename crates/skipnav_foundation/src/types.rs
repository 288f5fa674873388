//! Scalar types, configuration sources, and property access modes.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Type of a scalar shape member or property.
///
/// Only used to give generated foreign key properties the type of the
/// principal key property they reference; no value-level checking happens
/// in the model builder.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ScalarType {
    /// Boolean.
    Bool,
    /// 32-bit signed integer.
    Int,
    /// 64-bit signed integer.
    Long,
    /// 64-bit floating point.
    Double,
    /// Fixed-point decimal.
    Decimal,
    /// Unicode string.
    String,
    /// 128-bit globally unique identifier.
    Guid,
    /// Point in time.
    DateTime,
    /// Opaque byte array.
    Bytes,
}

impl fmt::Debug for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Long => "long",
            Self::Double => "double",
            Self::Decimal => "decimal",
            Self::String => "string",
            Self::Guid => "guid",
            Self::DateTime => "datetime",
            Self::Bytes => "bytes",
        };
        f.write_str(name)
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Where a piece of metadata came from.
///
/// Sources are ordered: explicit configuration always wins over state a
/// convention derived, and a convention never overrides explicit state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ConfigurationSource {
    /// Derived by a convention.
    Convention,
    /// Set by an explicit configuration call.
    Explicit,
}

impl ConfigurationSource {
    /// Returns true if state from `self` may replace state from `existing`.
    #[must_use]
    pub fn overrides(self, existing: ConfigurationSource) -> bool {
        self >= existing
    }
}

/// How the runtime reads and writes a navigation's backing member.
///
/// Recorded on navigations and skip navigations and carried through
/// finalization unchanged; the member-access layer that interprets it lives
/// outside this workspace.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PropertyAccessMode {
    /// Always go through the backing field.
    Field,
    /// Use the field while materializing, the property otherwise.
    FieldDuringConstruction,
    /// Always go through the property accessor.
    Property,
    /// Prefer the field when one exists.
    #[default]
    PreferField,
    /// Prefer the field while materializing.
    PreferFieldDuringConstruction,
    /// Prefer the property accessor when one exists.
    PreferProperty,
}

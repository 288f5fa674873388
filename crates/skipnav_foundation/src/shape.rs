//! Shape catalog: the declared members of every host shape.
//!
//! A shape stands in for a host-language type. The configuration surface
//! resolves member selectors to member names against this catalog before
//! they reach the model builder, which then only ever deals with names.
//!
//! Shape names are interned so that relationships between shapes are cheap
//! to compare. Shapes may be referenced before they are defined.

use std::collections::HashMap;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::types::ScalarType;

/// Interned shape identifier.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ShapeId(pub(crate) u32);

impl ShapeId {
    /// Returns the raw index of this shape.
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0
    }

    // =========================================================================
    // Reserved Shapes
    // =========================================================================
    // These are always interned at startup with fixed indices.

    /// Reserved open, string-keyed property-bag shape.
    ///
    /// Implicitly created join entity types use it, and it is implicitly
    /// shared: any number of named entity types may be backed by it.
    pub const PROPERTY_BAG: ShapeId = ShapeId(0);
}

impl fmt::Debug for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ShapeId({})", self.0)
    }
}

/// What a shape member is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MemberKind {
    /// A scalar value.
    Scalar(ScalarType),
    /// A single-valued reference to another shape.
    Reference(ShapeId),
    /// A collection of another shape.
    Collection(ShapeId),
}

impl MemberKind {
    /// Returns the shape a navigation member points at.
    #[must_use]
    pub const fn target(self) -> Option<ShapeId> {
        match self {
            Self::Scalar(_) => None,
            Self::Reference(target) | Self::Collection(target) => Some(target),
        }
    }

    /// Returns true for collection members.
    #[must_use]
    pub const fn is_collection(self) -> bool {
        matches!(self, Self::Collection(_))
    }

    /// Returns true for reference and collection members.
    #[must_use]
    pub const fn is_navigation(self) -> bool {
        !matches!(self, Self::Scalar(_))
    }
}

/// A declared member of a shape.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Member {
    /// Member name.
    pub name: String,
    /// Member kind.
    pub kind: MemberKind,
}

/// A host shape: a name plus its declared members, in declaration order.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Shape {
    name: String,
    members: Vec<Member>,
    property_bag: bool,
}

impl Shape {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            members: Vec::new(),
            property_bag: false,
        }
    }

    /// Returns the shape name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared members in declaration order.
    #[must_use]
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    /// Finds a member by name.
    #[must_use]
    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.name == name)
    }

    /// Returns true if this is an open property-bag shape.
    #[must_use]
    pub fn is_property_bag(&self) -> bool {
        self.property_bag
    }

    /// Iterates over the collection members whose element shape is `target`.
    pub fn collections_of(&self, target: ShapeId) -> impl Iterator<Item = &Member> + '_ {
        self.members
            .iter()
            .filter(move |m| m.kind == MemberKind::Collection(target))
    }

    /// Returns the type of a scalar member.
    #[must_use]
    pub fn scalar(&self, name: &str) -> Option<ScalarType> {
        match self.member(name)?.kind {
            MemberKind::Scalar(ty) => Some(ty),
            _ => None,
        }
    }

    fn set_member(&mut self, member: Member) {
        if let Some(existing) = self.members.iter_mut().find(|m| m.name == member.name) {
            *existing = member;
        } else {
            self.members.push(member);
        }
    }
}

/// Catalog of shapes keyed by interned name.
///
/// Not thread-safe; the catalog is built up front and then shared read-only
/// with the model.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ShapeCatalog {
    /// Shape storage, indexed by [`ShapeId`].
    shapes: Vec<Shape>,
    /// Map from shape name to [`ShapeId`].
    by_name: HashMap<String, ShapeId>,
}

impl Default for ShapeCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl ShapeCatalog {
    /// Reserved shapes that are pre-interned at startup.
    const RESERVED_SHAPES: &'static [&'static str] = &[
        "PropertyBag", // ShapeId(0) = PROPERTY_BAG
    ];

    /// Creates a new catalog with the reserved shapes pre-interned.
    #[must_use]
    pub fn new() -> Self {
        let mut catalog = Self {
            shapes: Vec::new(),
            by_name: HashMap::new(),
        };

        for (i, &name) in Self::RESERVED_SHAPES.iter().enumerate() {
            let id = catalog.intern(name);
            debug_assert_eq!(
                id.0 as usize, i,
                "Reserved shape '{name}' should have index {i}, got {}",
                id.0
            );
        }
        catalog.shapes[ShapeId::PROPERTY_BAG.0 as usize].property_bag = true;

        catalog
    }

    /// Interns a shape name, returning its [`ShapeId`].
    ///
    /// Interning an unknown name declares an empty shape that can be filled
    /// in later with [`ShapeCatalog::define`].
    ///
    /// # Panics
    ///
    /// Panics if the number of interned shapes exceeds `u32::MAX`.
    pub fn intern(&mut self, name: &str) -> ShapeId {
        if let Some(&id) = self.by_name.get(name) {
            return id;
        }

        let id = ShapeId(u32::try_from(self.shapes.len()).expect("too many shapes"));
        self.shapes.push(Shape::new(name));
        self.by_name.insert(name.to_string(), id);
        id
    }

    /// Starts (or continues) the definition of a shape.
    pub fn define(&mut self, name: &str) -> ShapeBuilder<'_> {
        let id = self.intern(name);
        ShapeBuilder { catalog: self, id }
    }

    /// Declares an additional open property-bag shape.
    pub fn define_property_bag(&mut self, name: &str) -> ShapeId {
        let id = self.intern(name);
        self.shapes[id.0 as usize].property_bag = true;
        id
    }

    /// Looks up a shape by name.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<ShapeId> {
        self.by_name.get(name).copied()
    }

    /// Gets a shape by id.
    #[must_use]
    pub fn get(&self, id: ShapeId) -> Option<&Shape> {
        self.shapes.get(id.0 as usize)
    }

    /// Gets a shape's name, or `"?"` for an id from another catalog.
    #[must_use]
    pub fn name(&self, id: ShapeId) -> &str {
        self.get(id).map_or("?", Shape::name)
    }

    /// Returns true if the shape is an open property bag.
    #[must_use]
    pub fn is_property_bag(&self, id: ShapeId) -> bool {
        self.get(id).is_some_and(Shape::is_property_bag)
    }

    /// Finds a member of a shape.
    #[must_use]
    pub fn member(&self, id: ShapeId, name: &str) -> Option<&Member> {
        self.get(id)?.member(name)
    }

    /// Iterates over all shapes in id order.
    #[allow(clippy::cast_possible_truncation)] // bounded by `intern`
    pub fn iter(&self) -> impl Iterator<Item = (ShapeId, &Shape)> + '_ {
        self.shapes
            .iter()
            .enumerate()
            .map(|(i, shape)| (ShapeId(i as u32), shape))
    }

    /// Returns the number of shapes, including reserved ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    /// Returns true if only the reserved shapes are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shapes.len() == Self::RESERVED_SHAPES.len()
    }
}

/// Fluent definition of a shape's members.
///
/// Member targets are named by shape; unknown target names are interned on
/// the fly so shapes can reference each other in any order.
pub struct ShapeBuilder<'a> {
    catalog: &'a mut ShapeCatalog,
    id: ShapeId,
}

// Chains end in a discarded builder.
#[allow(clippy::return_self_not_must_use)]
impl ShapeBuilder<'_> {
    /// Declares a scalar member.
    pub fn scalar(self, name: &str, ty: ScalarType) -> Self {
        self.member(name, MemberKind::Scalar(ty))
    }

    /// Declares a single-valued reference member.
    pub fn reference(self, name: &str, target: &str) -> Self {
        let target = self.catalog.intern(target);
        self.member(name, MemberKind::Reference(target))
    }

    /// Declares a collection member.
    pub fn collection(self, name: &str, element: &str) -> Self {
        let element = self.catalog.intern(element);
        self.member(name, MemberKind::Collection(element))
    }

    /// Returns the id of the shape being defined.
    #[must_use]
    pub fn id(&self) -> ShapeId {
        self.id
    }

    fn member(self, name: &str, kind: MemberKind) -> Self {
        self.catalog.shapes[self.id.0 as usize].set_member(Member {
            name: name.to_string(),
            kind,
        });
        self
    }
}

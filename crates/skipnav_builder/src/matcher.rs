//! Navigation pair matching.
//!
//! Decides whether two collection members form a many-to-many pair. Nothing
//! in this module mutates the model.

use skipnav_foundation::{
    ConfigurationSource, EntityTypeId, Error, ErrorKind, MemberKind, Result, ShapeId,
};
use skipnav_registry::Model;

/// One end of a candidate pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PairEnd<'a> {
    /// Entity type declaring the navigation.
    pub entity: EntityTypeId,
    /// Navigation name, if one was supplied.
    pub navigation: Option<&'a str>,
}

impl<'a> PairEnd<'a> {
    /// Creates a pair end.
    #[must_use]
    pub fn new(entity: EntityTypeId, navigation: Option<&'a str>) -> Self {
        Self { entity, navigation }
    }
}

/// Classification of a candidate pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PairMatch {
    /// The two navigations are each other's inverse.
    Matched,
    /// A navigation already belongs to a single-valued relationship.
    Conflict {
        /// The blamed navigation, as `Type.Navigation`.
        first: String,
        /// The other navigation of the pair.
        second: String,
        /// The navigation occupied by the single-valued relationship.
        navigation: String,
        /// The other end of that relationship.
        other: String,
    },
    /// Only one side supplied a navigation.
    MissingInverse {
        /// Left entity type name.
        left: String,
        /// Right entity type name.
        right: String,
    },
    /// Discovery found several candidates on a side.
    Ambiguous,
}

impl PairMatch {
    /// Converts the classification into a result. Ambiguity is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::ConflictingRelationshipNavigation`] or
    /// [`ErrorKind::MissingInverseManyToManyNavigation`].
    pub fn into_result(self) -> Result<()> {
        match self {
            PairMatch::Matched | PairMatch::Ambiguous => Ok(()),
            PairMatch::Conflict {
                first,
                second,
                navigation,
                other,
            } => Err(Error::conflicting_navigation(first, second, navigation, other)),
            PairMatch::MissingInverse { left, right } => Err(Error::missing_inverse(left, right)),
        }
    }
}

/// Classifies an explicitly declared pair.
///
/// The conflict names the occupied navigation first, so the message is the
/// same whichever side was declared and whichever relationship came first.
#[must_use]
pub fn classify(model: &Model, left: PairEnd<'_>, right: PairEnd<'_>) -> PairMatch {
    let (Some(left_nav), Some(right_nav)) = (left.navigation, right.navigation) else {
        return PairMatch::MissingInverse {
            left: model.entity_type_name(left.entity).to_string(),
            right: model.entity_type_name(right.entity).to_string(),
        };
    };

    for (end, nav, other_end, other_nav) in [
        (left.entity, left_nav, right.entity, right_nav),
        (right.entity, right_nav, left.entity, left_nav),
    ] {
        if let Some(other) = single_valued_other_end(model, end, nav) {
            return PairMatch::Conflict {
                first: model.qualified_name(end, nav),
                second: model.qualified_name(other_end, other_nav),
                navigation: model.qualified_name(end, nav),
                other,
            };
        }
    }
    PairMatch::Matched
}

/// If `entity.navigation` belongs to a single-valued relationship, renders
/// that relationship's other end as `Type` or `Type.Navigation`.
#[must_use]
pub fn single_valued_other_end(model: &Model, entity: EntityTypeId, navigation: &str) -> Option<String> {
    let id = model.find_navigation(entity, navigation)?;
    let nav = model.navigation(id)?;
    let fk = model.foreign_key(nav.foreign_key)?;
    let inverse = if nav.on_dependent {
        fk.principal_to_dependent
    } else {
        fk.dependent_to_principal
    };
    Some(match inverse.and_then(|i| model.navigation(i)) {
        Some(inverse) => model.qualified_name(nav.target, &inverse.name),
        None => model.entity_type_name(nav.target).to_string(),
    })
}

/// Collection members of `entity` that could pair with `other` by
/// convention: not ignored, not a navigation, and not an explicit skip
/// navigation.
#[must_use]
pub fn candidates(model: &Model, entity: EntityTypeId, other: EntityTypeId) -> Vec<String> {
    let (Some(declaring), Some(target)) = (model.entity_type(entity), model.entity_type(other))
    else {
        return Vec::new();
    };
    let Some(shape) = model.catalog().get(declaring.shape) else {
        return Vec::new();
    };
    shape
        .collections_of(target.shape)
        .filter(|member| !declaring.is_ignored(&member.name))
        .filter(|member| model.find_navigation(entity, &member.name).is_none())
        .filter(|member| {
            model
                .find_skip_navigation(entity, &member.name)
                .and_then(|id| model.skip_navigation(id))
                .is_none_or(|skip| skip.source == ConfigurationSource::Convention)
        })
        .map(|member| member.name.clone())
        .collect()
}

/// Classifies the candidates found by discovery on each side.
#[must_use]
pub fn classify_discovered<'a>(left: &'a [String], right: &'a [String]) -> Option<(&'a str, &'a str)> {
    match (left, right) {
        ([l], [r]) => Some((l.as_str(), r.as_str())),
        _ => None,
    }
}

/// Returns true if discovery would call the candidates ambiguous.
#[must_use]
pub fn is_ambiguous(left: &[String], right: &[String]) -> bool {
    !left.is_empty() && !right.is_empty() && (left.len() > 1 || right.len() > 1)
}

/// Resolves a collection member of an entity type's shape to its element
/// shape, checking that it targets `expected`.
///
/// # Errors
///
/// - [`ErrorKind::MemberNotFound`] if the shape has no such member
/// - [`ErrorKind::NotACollectionNavigation`] if the member is not a collection
/// - [`ErrorKind::NavigationTargetMismatch`] if it targets another shape
pub fn collection_member(
    model: &Model,
    entity: EntityTypeId,
    member: &str,
    expected: Option<EntityTypeId>,
) -> Result<ShapeId> {
    let shape = model.try_entity_type(entity)?.shape;
    match model.catalog().member(shape, member).map(|m| m.kind) {
        Some(MemberKind::Collection(target)) => check_target(model, entity, member, target, expected),
        Some(_) => Err(Error::new(ErrorKind::NotACollectionNavigation {
            shape: model.catalog().name(shape).to_string(),
            member: member.to_string(),
        })),
        None => Err(Error::member_not_found(model.catalog().name(shape), member)),
    }
}

/// Resolves a reference member of an entity type's shape to its target
/// shape, checking that it targets `expected`.
///
/// # Errors
///
/// - [`ErrorKind::MemberNotFound`] if the shape has no such member
/// - [`ErrorKind::NotAReferenceNavigation`] if the member is not a reference
/// - [`ErrorKind::NavigationTargetMismatch`] if it targets another shape
pub fn reference_member(
    model: &Model,
    entity: EntityTypeId,
    member: &str,
    expected: Option<EntityTypeId>,
) -> Result<ShapeId> {
    let shape = model.try_entity_type(entity)?.shape;
    match model.catalog().member(shape, member).map(|m| m.kind) {
        Some(MemberKind::Reference(target)) => check_target(model, entity, member, target, expected),
        Some(_) => Err(Error::new(ErrorKind::NotAReferenceNavigation {
            shape: model.catalog().name(shape).to_string(),
            member: member.to_string(),
        })),
        None => Err(Error::member_not_found(model.catalog().name(shape), member)),
    }
}

fn check_target(
    model: &Model,
    entity: EntityTypeId,
    member: &str,
    target: ShapeId,
    expected: Option<EntityTypeId>,
) -> Result<ShapeId> {
    let Some(expected) = expected else {
        return Ok(target);
    };
    let expected_shape = model.try_entity_type(expected)?.shape;
    if expected_shape == target {
        Ok(target)
    } else {
        Err(Error::new(ErrorKind::NavigationTargetMismatch {
            navigation: model.qualified_name(entity, member),
            expected: model.entity_type_name(expected).to_string(),
            actual: model.catalog().name(target).to_string(),
        }))
    }
}

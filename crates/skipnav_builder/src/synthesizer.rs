//! Join entity synthesis.
//!
//! Turns a matched pair of collection navigations into a complete
//! many-to-many relationship: two skip navigations that are each other's
//! inverse, a join entity type, one foreign key per side (left first) and
//! the join's composite primary key.
//!
//! The join is either synthesized (an implicit, property-bag backed entity
//! type named after the two sides), an ordinary entity type identified by
//! its shape, or a named entity type of a shared shape.

use tracing::debug;

use skipnav_foundation::{
    ConfigurationSource, EntityTypeId, Error, ErrorKind, MemberKind, PropertyId, Result,
    SkipNavigationId,
};
use skipnav_registry::{Model, PropertyFlags};

use crate::config::BuilderConfig;
use crate::foreign_key::{self, ForeignKeyRequest};
use crate::log::{JoinEntity, JoinForeignKey};
use crate::shared;

/// A matched pair to materialize.
#[derive(Clone, Copy, Debug)]
pub struct ManyToManyRequest<'a> {
    /// Left entity type (declared first).
    pub left: EntityTypeId,
    /// Skip navigation name on the left.
    pub left_navigation: &'a str,
    /// Right entity type.
    pub right: EntityTypeId,
    /// Skip navigation name on the right.
    pub right_navigation: &'a str,
    /// Explicit join, or `None` to keep the current join or synthesize one.
    pub join: Option<&'a JoinEntity>,
    /// Source for the skip navigations and explicit join state.
    pub source: ConfigurationSource,
}

/// The result of materializing a pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ManyToMany {
    /// Skip navigation on the left.
    pub left: SkipNavigationId,
    /// Skip navigation on the right.
    pub right: SkipNavigationId,
    /// The join entity type, unless implicit joins are disabled and none
    /// was given.
    pub join: Option<EntityTypeId>,
}

/// Materializes a many-to-many relationship.
///
/// Re-running with the same request returns the same handles. Switching to
/// another join detaches the skip navigations from the old one, which is
/// removed if it was implicit.
///
/// # Errors
///
/// - [`ErrorKind::MissingPrimaryKey`] if either side has no primary key
/// - [`ErrorKind::ClashingSharedType`] / [`ErrorKind::TypeNotMarkedAsShared`]
///   for an explicit join that breaks the shared-shape rules
/// - [`ErrorKind::InvalidJoinEntity`] if a named join already joins
///   another pair
pub fn configure(model: &mut Model, config: &BuilderConfig, request: &ManyToManyRequest<'_>) -> Result<ManyToMany> {
    if request.left == request.right && request.left_navigation == request.right_navigation {
        return Err(Error::new(ErrorKind::InvalidJoinEntity {
            entity: model.qualified_name(request.left, request.left_navigation),
            reason: "a navigation cannot be its own inverse".to_string(),
        }));
    }

    let left = model.add_skip_navigation(request.left, request.left_navigation, request.right, request.source)?;
    let right = model.add_skip_navigation(request.right, request.right_navigation, request.left, request.source)?;
    model.set_skip_navigation_inverse(left, right)?;

    let current = match (model.join_entity_type(left), model.join_entity_type(right)) {
        (Some(l), Some(r)) if l == r => Some(l),
        _ => None,
    };
    let join = match request.join {
        Some(join) => Some(explicit_join(model, request, join)?),
        None => match current {
            Some(current) => Some(current),
            None if config.implicit_joins => Some(implicit_join(model, request.left, request.right)?),
            None => None,
        },
    };

    let mut previous: Vec<EntityTypeId> = [left, right]
        .into_iter()
        .filter_map(|skip| model.join_entity_type(skip))
        .filter(|&old| Some(old) != join)
        .collect();
    previous.dedup();
    if !previous.is_empty() {
        model.set_skip_navigation_foreign_key(left, None)?;
        model.set_skip_navigation_foreign_key(right, None)?;
    }

    if let Some(join) = join {
        wire(model, config, request, join, left, right)?;
    }
    for old in previous {
        if model.remove_orphaned_join(old)? {
            debug!(join = ?old, "removed replaced implicit join");
        }
    }
    Ok(ManyToMany { left, right, join })
}

fn wire(
    model: &mut Model,
    config: &BuilderConfig,
    request: &ManyToManyRequest<'_>,
    join: EntityTypeId,
    left: SkipNavigationId,
    right: SkipNavigationId,
) -> Result<()> {
    let implicit = model.try_entity_type(join)?.implicit_join;
    let fk_source = if implicit {
        ConfigurationSource::Convention
    } else {
        request.source
    };
    let default = JoinForeignKey::default();
    let (left_spec, right_spec) = request
        .join
        .map_or((&default, &default), |j| (&j.left, &j.right));

    let left_current = model.try_skip_navigation(left)?.foreign_key;
    let right_current = model.try_skip_navigation(right)?.foreign_key;

    let left_fk = foreign_key::ensure(
        model,
        config,
        &ForeignKeyRequest {
            navigation: left_spec.navigation.as_deref(),
            inverse: left_spec.inverse.as_deref(),
            preferred: left_current,
            ..ForeignKeyRequest::new(join, request.left, fk_source)
        },
    )?;
    let right_fk = foreign_key::ensure(
        model,
        config,
        &ForeignKeyRequest {
            navigation: right_spec.navigation.as_deref(),
            inverse: right_spec.inverse.as_deref(),
            preferred: right_current,
            exclude: &[left_fk],
            ..ForeignKeyRequest::new(join, request.right, fk_source)
        },
    )?;
    model.set_skip_navigation_foreign_key(left, Some(left_fk))?;
    model.set_skip_navigation_foreign_key(right, Some(right_fk))?;

    if implicit || model.try_entity_type(join)?.primary_key.is_none() {
        // Key order follows foreign key declaration order, not call order.
        let mut key: Vec<PropertyId> = Vec::new();
        for fk in model
            .foreign_keys_of(join)
            .into_iter()
            .filter(|&fk| fk == left_fk || fk == right_fk)
        {
            key.extend(model.try_foreign_key(fk)?.properties.iter().copied());
        }
        model.set_primary_key(join, &key, ConfigurationSource::Convention)?;
    }

    if let Some(explicit) = request.join {
        configure_join_members(model, join, explicit)?;
    }
    Ok(())
}

/// Creates the implicit join for a pair, named after both sides in ordinal
/// order.
///
/// # Errors
///
/// - [`ErrorKind::MissingPrimaryKey`] if either side has no primary key
/// - [`ErrorKind::DuplicateEntityType`] if the name belongs to an entity
///   type that is not an implicit join
pub fn implicit_join(model: &mut Model, left: EntityTypeId, right: EntityTypeId) -> Result<EntityTypeId> {
    for side in [left, right] {
        if model.try_entity_type(side)?.primary_key.is_none() {
            return Err(Error::new(ErrorKind::MissingPrimaryKey(
                model.entity_type_name(side).to_string(),
            )));
        }
    }
    let name = implicit_join_name(model, left, right)?;
    let join = model.add_implicit_join_entity_type(&name)?;
    debug!(join = %name, "synthesized implicit join entity type");
    Ok(join)
}

/// Picks the implicit join name for a pair.
///
/// # Errors
///
/// Returns [`ErrorKind::DuplicateEntityType`] if the base name belongs to
/// an entity type that is not an implicit join.
pub fn implicit_join_name(model: &Model, left: EntityTypeId, right: EntityTypeId) -> Result<String> {
    let mut names = [model.entity_type_name(left), model.entity_type_name(right)];
    names.sort_unstable();
    let base = names.concat();

    match model.find_entity_type(&base) {
        None => Ok(base),
        Some(existing) if model.try_entity_type(existing)?.implicit_join => Ok((1u32..)
            .map(|n| format!("{base}{n}"))
            .find(|name| model.find_entity_type(name).is_none())
            .unwrap_or(base)),
        Some(_) => Err(Error::new(ErrorKind::DuplicateEntityType(base))),
    }
}

fn explicit_join(model: &mut Model, request: &ManyToManyRequest<'_>, join: &JoinEntity) -> Result<EntityTypeId> {
    let shape = shared::lookup_shape(model, &join.shape)?;
    let id = shared::find_or_create(model, shape, join.name.as_deref(), ConfigurationSource::Explicit)?;

    let others = shared::other_pairs_using(model, id, [request.left, request.right]);
    if let Some(&other) = others.first() {
        return Err(match &join.name {
            None => Error::clashing_shared_type(&join.shape),
            Some(name) => Error::new(ErrorKind::InvalidJoinEntity {
                entity: name.clone(),
                reason: format!(
                    "already joins '{}'",
                    model.entity_type_name(other)
                ),
            }),
        });
    }
    Ok(id)
}

fn configure_join_members(model: &mut Model, join: EntityTypeId, explicit: &JoinEntity) -> Result<()> {
    const SOURCE: ConfigurationSource = ConfigurationSource::Explicit;

    for name in &explicit.properties {
        member_property(model, join, name)?;
    }
    for (name, ty) in &explicit.indexer_properties {
        model.add_indexer_property(join, name, *ty, SOURCE)?;
    }
    if let Some(key) = &explicit.key {
        let properties = key
            .iter()
            .map(|name| member_property(model, join, name))
            .collect::<Result<Vec<_>>>()?;
        model.set_primary_key(join, &properties, SOURCE)?;
    }
    Ok(())
}

/// Finds a property by name, creating it from a scalar shape member.
///
/// # Errors
///
/// Returns [`ErrorKind::PropertyNotFound`] if there is neither a property
/// nor a scalar member with that name.
pub fn member_property(model: &mut Model, entity: EntityTypeId, name: &str) -> Result<PropertyId> {
    if let Some(existing) = model.find_property(entity, name) {
        return Ok(existing);
    }
    let shape = model.try_entity_type(entity)?.shape;
    match model.catalog().member(shape, name).map(|m| m.kind) {
        Some(MemberKind::Scalar(ty)) => {
            model.unignore_member(entity, name)?;
            model.add_property(entity, name, ty, PropertyFlags::MEMBER, ConfigurationSource::Explicit)
        }
        _ => Err(Error::new(ErrorKind::PropertyNotFound {
            entity: model.entity_type_name(entity).to_string(),
            property: name.to_string(),
        })),
    }
}

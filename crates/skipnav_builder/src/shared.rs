//! Shared-shape disambiguation.
//!
//! A shape is either ordinary (one entity type, named after the shape) or
//! shared (any number of entity types, each with its own name). The
//! registry enforces the split; this module adds the builder's rules on
//! top: an entity type that only a convention created gives way when its
//! shape is declared shared.

use tracing::debug;

use skipnav_foundation::{
    ConfigurationSource, EntityTypeId, Error, ErrorKind, Result, ShapeId,
};
use skipnav_registry::Model;

/// Resolves a shape name against the model's catalog.
///
/// # Errors
///
/// Returns [`ErrorKind::ShapeNotFound`] for undeclared shapes.
pub fn lookup_shape(model: &Model, name: &str) -> Result<ShapeId> {
    model
        .catalog()
        .lookup(name)
        .ok_or_else(|| Error::new(ErrorKind::ShapeNotFound(name.to_string())))
}

/// Declares a shape shared.
///
/// An ordinary entity type that discovery created for the shape is removed
/// first; one that was configured explicitly makes the call fail.
///
/// # Errors
///
/// Returns [`ErrorKind::ClashingSharedType`] if an explicitly configured
/// ordinary entity type uses the shape.
pub fn mark_shared(model: &mut Model, shape: ShapeId) -> Result<()> {
    if model.is_shape_shared(shape) {
        return Ok(());
    }
    if let Some(existing) = model.find_entity_type_by_shape(shape) {
        if model.try_entity_type(existing)?.source == ConfigurationSource::Convention {
            debug!(
                entity_type = %model.entity_type_name(existing),
                "removing convention entity type for shape declared shared"
            );
            model.remove_entity_type(existing)?;
        }
    }
    model.mark_shape_shared(shape)
}

/// Finds or creates an entity type for a shape, by shape or by name.
///
/// Explicit configuration brings back a shape or name that was ignored.
///
/// # Errors
///
/// - [`ErrorKind::ClashingSharedType`] for an unnamed use of a shared shape
/// - [`ErrorKind::TypeNotMarkedAsShared`] for a named use of an ordinary shape
pub fn find_or_create(
    model: &mut Model,
    shape: ShapeId,
    name: Option<&str>,
    source: ConfigurationSource,
) -> Result<EntityTypeId> {
    if source == ConfigurationSource::Explicit {
        model.unignore_shape(shape)?;
        let entity_name = name.unwrap_or(model.catalog().name(shape)).to_string();
        model.unignore_entity_name(&entity_name)?;
    }
    model.find_or_create_entity_type(shape, name, source)
}

/// Returns the entity types (other than `allowed`) whose skip navigations
/// already go through `join`.
#[must_use]
pub fn other_pairs_using(model: &Model, join: EntityTypeId, allowed: [EntityTypeId; 2]) -> Vec<EntityTypeId> {
    let mut others: Vec<EntityTypeId> = model
        .foreign_keys_of(join)
        .into_iter()
        .filter_map(|fk| model.foreign_key(fk))
        .flat_map(|fk| fk.referencing_skip_navigations.iter().copied())
        .filter_map(|skip| model.skip_navigation(skip).map(|s| s.declaring))
        .filter(|declaring| !allowed.contains(declaring))
        .collect();
    others.sort();
    others.dedup();
    others
}

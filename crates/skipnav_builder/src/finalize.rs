//! The finalization pass.
//!
//! Replays the effective configuration, re-runs discovery, sweeps
//! convention entity types nothing reaches any more and validates every
//! many-to-many relationship. The caller owns the state machine and the
//! snapshot; this module only transforms the model.

use std::collections::{HashSet, VecDeque};

use tracing::debug;

use skipnav_foundation::{
    ConfigurationSource, EntityTypeId, Error, ErrorContext, ErrorKind, Result,
};
use skipnav_registry::{Model, SkipNavigation};

use crate::apply::apply;
use crate::config::BuilderConfig;
use crate::discovery::{self, DiscoveryReport};
use crate::log::ConfigurationLog;

const FRAME: &str = "finalize_model";

/// Runs the pass and marks the model finalized.
pub(crate) fn run(model: &mut Model, config: &BuilderConfig, log: &ConfigurationLog) -> Result<DiscoveryReport> {
    for call in log.effective() {
        apply(model, config, &call).map_err(|e| {
            e.with_context(ErrorContext::new().with_call(call.to_string()).with_frame(FRAME))
        })?;
    }
    let report = discovery::run(model, config).map_err(|e| in_frame(e, "discovery"))?;
    let swept = sweep_unreachable(model).map_err(|e| in_frame(e, "sweep"))?;
    if swept > 0 {
        debug!(swept, "removed unreachable convention entity types");
    }
    validate(model).map_err(|e| in_frame(e, "validate"))?;
    model.mark_finalized();
    Ok(report)
}

fn in_frame(error: Error, step: &str) -> Error {
    error.with_context(ErrorContext::new().with_frame(step).with_frame(FRAME))
}

/// Removes convention entity types that neither a navigation member nor a
/// foreign key connects to an explicitly configured entity type.
fn sweep_unreachable(model: &mut Model) -> Result<usize> {
    let mut queue: VecDeque<EntityTypeId> = model
        .entity_types()
        .filter(|(_, e)| e.source == ConfigurationSource::Explicit)
        .map(|(id, _)| id)
        .collect();
    let edges: Vec<(EntityTypeId, EntityTypeId)> = model
        .entity_types()
        .flat_map(|(id, _)| model.foreign_keys_of(id))
        .filter_map(|fk| model.foreign_key(fk))
        .map(|fk| (fk.declaring, fk.principal))
        .collect();
    let mut reached = HashSet::new();

    while let Some(entity) = queue.pop_front() {
        if !reached.insert(entity) {
            continue;
        }
        let Some(meta) = model.entity_type(entity) else {
            continue;
        };
        if let Some(shape) = model.catalog().get(meta.shape) {
            for member in shape.members() {
                if meta.is_ignored(&member.name) {
                    continue;
                }
                if let Some(target) = member.kind.target().and_then(|t| model.find_entity_type_by_shape(t)) {
                    queue.push_back(target);
                }
            }
        }
        for &(declaring, principal) in &edges {
            if declaring == entity {
                queue.push_back(principal);
            } else if principal == entity {
                queue.push_back(declaring);
            }
        }
    }

    let unreachable: Vec<EntityTypeId> = model
        .entity_types()
        .filter(|(id, e)| !reached.contains(id) && !e.implicit_join && e.source == ConfigurationSource::Convention)
        .map(|(id, _)| id)
        .collect();
    let mut removed = 0;
    for id in unreachable {
        if model.entity_type(id).is_some() {
            model.remove_entity_type(id)?;
            removed += 1;
        }
    }
    Ok(removed)
}

/// Checks every skip navigation. The first violation is returned.
///
/// # Errors
///
/// - [`ErrorKind::MissingInverseManyToManyNavigation`] for a skip
///   navigation without a symmetric inverse
/// - [`ErrorKind::InvalidJoinEntity`] for a relationship whose join does
///   not carry exactly the two foreign keys it needs
pub fn validate(model: &Model) -> Result<()> {
    for (id, skip) in model.skip_navigations() {
        let inverse = skip
            .inverse
            .and_then(|i| model.skip_navigation(i).map(|s| (i, s)))
            .filter(|(_, s)| s.inverse == Some(id));
        let Some((_, inverse)) = inverse else {
            return Err(Error::missing_inverse(
                model.entity_type_name(skip.declaring),
                model.entity_type_name(skip.target),
            ));
        };
        validate_join(model, skip, inverse)?;
    }
    Ok(())
}

fn validate_join(model: &Model, skip: &SkipNavigation, inverse: &SkipNavigation) -> Result<()> {
    let invalid = |entity: String, reason: String| Error::new(ErrorKind::InvalidJoinEntity { entity, reason });
    let qualified = model.qualified_name(skip.declaring, &skip.name);

    let (Some(fk_id), Some(inverse_fk_id)) = (skip.foreign_key, inverse.foreign_key) else {
        return Err(invalid(
            qualified,
            "the many-to-many relationship has no join entity type".to_string(),
        ));
    };
    let fk = model.try_foreign_key(fk_id)?;
    let inverse_fk = model.try_foreign_key(inverse_fk_id)?;
    let join = model.entity_type_name(fk.declaring).to_string();

    if fk.principal != skip.declaring {
        return Err(invalid(
            join,
            format!("the foreign key used by '{qualified}' does not point at its declaring entity type"),
        ));
    }
    if inverse_fk.declaring != fk.declaring {
        return Err(invalid(
            join,
            format!("'{qualified}' and its inverse go through different join entity types"),
        ));
    }
    if fk_id == inverse_fk_id {
        return Err(invalid(join, format!("'{qualified}' and its inverse share a foreign key")));
    }
    let count = model.try_entity_type(fk.declaring)?.foreign_keys.len();
    if count != 2 {
        return Err(invalid(join, format!("expected 2 foreign keys, found {count}")));
    }
    Ok(())
}

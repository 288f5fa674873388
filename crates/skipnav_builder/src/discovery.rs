//! Discovery conventions.
//!
//! Runs after configuration calls (eagerly, or only at finalization with a
//! deferred config) and derives what explicit configuration left open:
//!
//! 1. reachability: entity types for the shapes that navigation members
//!    point at, breadth-first from every configured entity type
//! 2. scalar members become properties; `Id` or `{Name}Id` becomes the
//!    primary key
//! 3. many-to-many: for every pair of ordinary entity types (ordinal by
//!    name), exactly one unconfigured collection candidate on each side
//!    becomes a relationship; anything else is left alone and stale
//!    convention skip navigations between the two are swept
//!
//! All derived state has [`ConfigurationSource::Convention`] and gives way
//! to explicit configuration.

use std::collections::{HashSet, VecDeque};

use tracing::{debug, trace};

use skipnav_foundation::{ConfigurationSource, EntityTypeId, Member, MemberKind, Result, ShapeId, SkipNavigationId};
use skipnav_registry::{Model, PropertyFlags};

use crate::config::BuilderConfig;
use crate::matcher;
use crate::synthesizer::{self, ManyToManyRequest};

const CONVENTION: ConfigurationSource = ConfigurationSource::Convention;

/// What a discovery pass found.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DiscoveryReport {
    /// Entity types created by reachability.
    pub entity_types_added: Vec<EntityTypeId>,
    /// Convention many-to-many relationships, left then right.
    pub relationships: Vec<(SkipNavigationId, SkipNavigationId)>,
    /// Pairs of entity type names left unresolved because of ambiguity.
    pub ambiguous: Vec<(String, String)>,
}

/// Runs every discovery convention once.
///
/// # Errors
///
/// Returns registry errors only; conventions that cannot apply are skipped.
pub fn run(model: &mut Model, config: &BuilderConfig) -> Result<DiscoveryReport> {
    let mut report = DiscoveryReport::default();
    discover_entity_types(model, &mut report)?;
    discover_many_to_many(model, config, &mut report)?;
    if !report.entity_types_added.is_empty() || !report.ambiguous.is_empty() {
        debug!(
            added = report.entity_types_added.len(),
            relationships = report.relationships.len(),
            ambiguous = report.ambiguous.len(),
            "discovery pass"
        );
    }
    Ok(report)
}

fn discover_entity_types(model: &mut Model, report: &mut DiscoveryReport) -> Result<()> {
    let mut queue: VecDeque<EntityTypeId> = model
        .entity_types()
        .filter(|(_, e)| !e.implicit_join)
        .map(|(id, _)| id)
        .collect();
    let mut seen = HashSet::new();

    while let Some(entity) = queue.pop_front() {
        if !seen.insert(entity) {
            continue;
        }
        let Some(shape) = model.entity_type(entity).map(|e| e.shape) else {
            continue;
        };
        let members: Vec<Member> = model
            .catalog()
            .get(shape)
            .map(|s| s.members().to_vec())
            .unwrap_or_default();

        for member in members {
            if model.is_member_ignored(entity, &member.name) {
                continue;
            }
            match member.kind {
                MemberKind::Scalar(ty) => {
                    if model.find_property(entity, &member.name).is_none() {
                        model.add_property(entity, &member.name, ty, PropertyFlags::MEMBER, CONVENTION)?;
                    }
                }
                MemberKind::Reference(target) | MemberKind::Collection(target) => {
                    if let Some(found) = reachable_entity_type(model, target, report)? {
                        queue.push_back(found);
                    }
                }
            }
        }
        discover_primary_key(model, entity)?;
    }
    Ok(())
}

/// Finds or creates the entity type for a navigation target, unless the
/// target cannot be an ordinary entity type.
fn reachable_entity_type(
    model: &mut Model,
    shape: ShapeId,
    report: &mut DiscoveryReport,
) -> Result<Option<EntityTypeId>> {
    if let Some(existing) = model.find_entity_type_by_shape(shape) {
        return Ok(Some(existing));
    }
    let name = model.catalog().name(shape).to_string();
    if model.is_shape_shared(shape)
        || model.is_shape_ignored(shape)
        || model.is_entity_name_ignored(&name)
        || model.find_entity_type(&name).is_some()
    {
        return Ok(None);
    }
    let id = model.find_or_create_entity_type(shape, None, CONVENTION)?;
    trace!(entity_type = %name, "discovered entity type");
    report.entity_types_added.push(id);
    Ok(Some(id))
}

/// Applies the key convention: an `Id` or `{Name}Id` scalar becomes the
/// primary key of an entity type that has none.
///
/// Also used on demand by explicit relationship calls, so deferred discovery
/// does not leave their principals keyless.
pub(crate) fn discover_primary_key(model: &mut Model, entity: EntityTypeId) -> Result<()> {
    let meta = model.try_entity_type(entity)?;
    if meta.primary_key.is_some() {
        return Ok(());
    }
    let candidates = ["Id".to_string(), format!("{}Id", meta.name)];
    let shape = meta.shape;

    for name in &candidates {
        if model.is_member_ignored(entity, name) {
            continue;
        }
        let property = match model.find_property(entity, name) {
            Some(existing) => existing,
            None => match model.catalog().get(shape).and_then(|s| s.scalar(name)) {
                Some(ty) => model.add_property(entity, name, ty, PropertyFlags::MEMBER, CONVENTION)?,
                None => continue,
            },
        };
        model.set_primary_key(entity, &[property], CONVENTION)?;
        trace!(entity_type = %model.entity_type_name(entity), key = %name, "primary key by convention");
        break;
    }
    Ok(())
}

fn discover_many_to_many(model: &mut Model, config: &BuilderConfig, report: &mut DiscoveryReport) -> Result<()> {
    let mut entities: Vec<(String, EntityTypeId)> = model
        .entity_types()
        .filter(|(_, e)| !e.has_shared_shape && !e.implicit_join)
        .map(|(id, e)| (e.name.clone(), id))
        .collect();
    entities.sort();

    for (i, (left_name, left)) in entities.iter().enumerate() {
        for (right_name, right) in &entities[i + 1..] {
            let (left, right) = (*left, *right);
            if model.entity_type(left).is_none() || model.entity_type(right).is_none() {
                continue;
            }
            let left_candidates = matcher::candidates(model, left, right);
            let right_candidates = matcher::candidates(model, right, left);

            let matched = matcher::classify_discovered(&left_candidates, &right_candidates)
                .filter(|_| config.implicit_joins && has_keys(model, left, right));
            if let Some((left_nav, right_nav)) = matched {
                let pair = pair(model, config, left, left_nav, right, right_nav)?;
                report.relationships.push(pair);
                continue;
            }

            sweep(model, left, &left_candidates)?;
            sweep(model, right, &right_candidates)?;
            if matcher::is_ambiguous(&left_candidates, &right_candidates) {
                debug!(
                    left = %left_name,
                    right = %right_name,
                    left_candidates = ?left_candidates,
                    right_candidates = ?right_candidates,
                    "ambiguous many-to-many navigations, not configured"
                );
                report.ambiguous.push((left_name.clone(), right_name.clone()));
            }
        }
    }
    Ok(())
}

fn has_keys(model: &Model, left: EntityTypeId, right: EntityTypeId) -> bool {
    [left, right]
        .iter()
        .all(|&side| model.entity_type(side).is_some_and(|e| e.primary_key.is_some()))
}

/// Configures a discovered pair, or confirms it is already configured.
fn pair(
    model: &mut Model,
    config: &BuilderConfig,
    left: EntityTypeId,
    left_nav: &str,
    right: EntityTypeId,
    right_nav: &str,
) -> Result<(SkipNavigationId, SkipNavigationId)> {
    let existing = model
        .find_skip_navigation(left, left_nav)
        .zip(model.find_skip_navigation(right, right_nav));
    if let Some((l, r)) = existing {
        let complete = model.skip_navigation(l).is_some_and(|s| s.inverse == Some(r) && s.foreign_key.is_some())
            && model.skip_navigation(r).is_some_and(|s| s.inverse == Some(l) && s.foreign_key.is_some());
        if complete {
            return Ok((l, r));
        }
    }
    let result = synthesizer::configure(
        model,
        config,
        &ManyToManyRequest {
            left,
            left_navigation: left_nav,
            right,
            right_navigation: right_nav,
            join: None,
            source: CONVENTION,
        },
    )?;
    debug!(
        left = %model.qualified_name(left, left_nav),
        right = %model.qualified_name(right, right_nav),
        "discovered many-to-many relationship"
    );
    Ok((result.left, result.right))
}

/// Removes convention skip navigations that discovery can no longer justify.
fn sweep(model: &mut Model, entity: EntityTypeId, candidates: &[String]) -> Result<()> {
    for name in candidates {
        let stale = model
            .find_skip_navigation(entity, name)
            .filter(|&id| model.skip_navigation(id).is_some_and(|s| s.source == CONVENTION));
        if let Some(stale) = stale {
            debug!(skip_navigation = %model.qualified_name(entity, name), "sweeping stale convention skip navigation");
            model.remove_skip_navigation(stale)?;
        }
    }
    Ok(())
}

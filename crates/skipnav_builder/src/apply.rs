//! Interpretation of configuration calls.
//!
//! A [`ConfigurationCall`] is plain data; [`apply`] turns it into registry
//! mutations with find-or-create semantics, so applying the same call twice
//! returns the same handles. The fluent builders and finalization replay
//! both go through here.

use skipnav_foundation::{
    ConfigurationSource, EntityTypeId, Error, ErrorKind, ForeignKeyId, PropertyAccessMode, Result,
};
use skipnav_registry::Model;

use crate::config::BuilderConfig;
use crate::discovery;
use crate::foreign_key::{self, ForeignKeyRequest};
use crate::log::{ConfigurationCall, EntityRef};
use crate::matcher::{self, PairEnd};
use crate::shared;
use crate::synthesizer::{self, ManyToMany, ManyToManyRequest};

const EXPLICIT: ConfigurationSource = ConfigurationSource::Explicit;

/// What applying a call produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Outcome {
    Done,
    EntityType(EntityTypeId),
    ForeignKey(ForeignKeyId),
    ManyToMany(ManyToMany),
}

impl Outcome {
    pub(crate) fn entity_type(self) -> Result<EntityTypeId> {
        match self {
            Outcome::EntityType(id) => Ok(id),
            other => Err(Error::internal(format!("expected an entity type, got {other:?}"))),
        }
    }

    pub(crate) fn foreign_key(self) -> Result<ForeignKeyId> {
        match self {
            Outcome::ForeignKey(id) => Ok(id),
            other => Err(Error::internal(format!("expected a foreign key, got {other:?}"))),
        }
    }

    pub(crate) fn many_to_many(self) -> Result<ManyToMany> {
        match self {
            Outcome::ManyToMany(result) => Ok(result),
            other => Err(Error::internal(format!("expected a many-to-many relationship, got {other:?}"))),
        }
    }
}

/// Applies one configuration call.
pub(crate) fn apply(model: &mut Model, config: &BuilderConfig, call: &ConfigurationCall) -> Result<Outcome> {
    match call {
        ConfigurationCall::Entity { shape } => {
            let shape = shared::lookup_shape(model, shape)?;
            shared::find_or_create(model, shape, None, EXPLICIT).map(Outcome::EntityType)
        }
        ConfigurationCall::SharedType { shape } => {
            let shape = shared::lookup_shape(model, shape)?;
            model.unignore_shape(shape)?;
            shared::mark_shared(model, shape)?;
            Ok(Outcome::Done)
        }
        ConfigurationCall::SharedTypeEntity { name, shape } => {
            let shape = shared::lookup_shape(model, shape)?;
            shared::mark_shared(model, shape)?;
            shared::find_or_create(model, shape, Some(name), EXPLICIT).map(Outcome::EntityType)
        }
        ConfigurationCall::IgnoreShape { shape } => {
            let shape = shared::lookup_shape(model, shape)?;
            model.ignore_shape(shape)?;
            Ok(Outcome::Done)
        }
        ConfigurationCall::IgnoreEntity { name } => {
            model.ignore_entity_name(name)?;
            Ok(Outcome::Done)
        }
        ConfigurationCall::IgnoreMember { entity, member } => {
            let entity = named(model, entity)?;
            model.ignore_member(entity, member)?;
            Ok(Outcome::Done)
        }
        ConfigurationCall::Property { entity, name } => {
            let entity = named(model, entity)?;
            model.unignore_member(entity, name)?;
            synthesizer::member_property(model, entity, name)?;
            Ok(Outcome::EntityType(entity))
        }
        ConfigurationCall::IndexerProperty { entity, name, ty } => {
            let entity = named(model, entity)?;
            model.unignore_member(entity, name)?;
            model.add_indexer_property(entity, name, *ty, EXPLICIT)?;
            Ok(Outcome::EntityType(entity))
        }
        ConfigurationCall::Key { entity, properties } => {
            let entity = named(model, entity)?;
            let mut key = Vec::with_capacity(properties.len());
            for name in properties {
                model.unignore_member(entity, name)?;
                key.push(synthesizer::member_property(model, entity, name)?);
            }
            model.set_primary_key(entity, &key, EXPLICIT)?;
            Ok(Outcome::EntityType(entity))
        }
        ConfigurationCall::OneToMany {
            principal,
            collection,
            dependent,
            reference,
        } => one_to_many(
            model,
            config,
            principal,
            collection.as_deref(),
            dependent,
            reference.as_deref(),
        )
        .map(Outcome::ForeignKey),
        ConfigurationCall::ManyToMany {
            left,
            left_navigation,
            right,
            right_navigation,
            join,
        } => {
            let left = resolve(model, left)?;
            let right = resolve(model, right)?;
            let (left_navigation, right_navigation) = (left_navigation.as_deref(), right_navigation.as_deref());
            matcher::classify(
                model,
                PairEnd::new(left, left_navigation),
                PairEnd::new(right, right_navigation),
            )
            .into_result()?;
            let (Some(left_navigation), Some(right_navigation)) = (left_navigation, right_navigation) else {
                return Err(Error::internal("matched pair without navigations"));
            };
            matcher::collection_member(model, left, left_navigation, Some(right))?;
            matcher::collection_member(model, right, right_navigation, Some(left))?;
            model.unignore_member(left, left_navigation)?;
            model.unignore_member(right, right_navigation)?;
            discovery::discover_primary_key(model, left)?;
            discovery::discover_primary_key(model, right)?;

            synthesizer::configure(
                model,
                config,
                &ManyToManyRequest {
                    left,
                    left_navigation,
                    right,
                    right_navigation,
                    join: join.as_ref(),
                    source: EXPLICIT,
                },
            )
            .map(Outcome::ManyToMany)
        }
        ConfigurationCall::AccessMode { entity, member, mode } => {
            let entity = named(model, entity)?;
            match member {
                None => model.set_entity_type_access_mode(entity, *mode)?,
                Some(member) => set_member_access_mode(model, entity, member, *mode)?,
            }
            Ok(Outcome::Done)
        }
    }
}

fn named(model: &Model, name: &str) -> Result<EntityTypeId> {
    model
        .find_entity_type(name)
        .ok_or_else(|| Error::entity_type_not_found(name))
}

/// Resolves the entity type a relationship call names. A shape reference
/// creates the entity type by convention.
fn resolve(model: &mut Model, entity: &EntityRef) -> Result<EntityTypeId> {
    match entity {
        EntityRef::Name(name) => named(model, name),
        EntityRef::Shape(name) => {
            let shape = shared::lookup_shape(model, name)?;
            if let Some(existing) = model.find_entity_type_by_shape(shape) {
                return Ok(existing);
            }
            model.unignore_shape(shape)?;
            model.unignore_entity_name(name)?;
            shared::find_or_create(model, shape, None, ConfigurationSource::Convention)
        }
    }
}

fn one_to_many(
    model: &mut Model,
    config: &BuilderConfig,
    principal: &EntityRef,
    collection: Option<&str>,
    dependent: &EntityRef,
    reference: Option<&str>,
) -> Result<ForeignKeyId> {
    let principal = resolve(model, principal)?;
    let dependent = resolve(model, dependent)?;

    if let Some(collection) = collection {
        matcher::collection_member(model, principal, collection, Some(dependent))?;
        release_skip_navigation(model, principal, collection, dependent, reference)?;
    }
    if let Some(reference) = reference {
        matcher::reference_member(model, dependent, reference, Some(principal))?;
    }
    discovery::discover_primary_key(model, principal)?;

    foreign_key::ensure(
        model,
        config,
        &ForeignKeyRequest {
            navigation: reference,
            inverse: collection,
            ..ForeignKeyRequest::new(dependent, principal, EXPLICIT)
        },
    )
}

/// A collection that is about to become a one-to-many navigation cannot
/// stay a skip navigation. A convention pair gives way; an explicit one is
/// reported the same way the many-to-many declaration would have been.
fn release_skip_navigation(
    model: &mut Model,
    principal: EntityTypeId,
    collection: &str,
    dependent: EntityTypeId,
    reference: Option<&str>,
) -> Result<()> {
    let Some(skip) = model.find_skip_navigation(principal, collection) else {
        return Ok(());
    };
    let meta = model.try_skip_navigation(skip)?;
    let inverse = meta.inverse;

    if meta.source == ConfigurationSource::Explicit {
        let second = inverse
            .and_then(|i| model.skip_navigation(i))
            .map(|i| model.qualified_name(i.declaring, &i.name))
            .unwrap_or_else(|| model.entity_type_name(meta.target).to_string());
        let other = match reference {
            Some(reference) => model.qualified_name(dependent, reference),
            None => model.entity_type_name(dependent).to_string(),
        };
        let blamed = model.qualified_name(principal, collection);
        return Err(Error::conflicting_navigation(blamed.clone(), second, blamed, other));
    }

    model.remove_skip_navigation(skip)?;
    if let Some(inverse) = inverse.filter(|&i| model.skip_navigation(i).is_some()) {
        model.remove_skip_navigation(inverse)?;
    }
    Ok(())
}

fn set_member_access_mode(
    model: &mut Model,
    entity: EntityTypeId,
    member: &str,
    mode: PropertyAccessMode,
) -> Result<()> {
    if let Some(skip) = model.find_skip_navigation(entity, member) {
        return model.set_skip_navigation_access_mode(skip, mode);
    }
    if let Some(navigation) = model.find_navigation(entity, member) {
        return model.set_navigation_access_mode(navigation, mode);
    }
    Err(Error::new(ErrorKind::NavigationNotFound {
        entity: model.entity_type_name(entity).to_string(),
        navigation: member.to_string(),
    }))
}

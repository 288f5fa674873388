//! Foreign key convention.
//!
//! Finds or creates the foreign key from a dependent entity type to a
//! principal's primary key, naming its properties by convention:
//!
//! | dependent         | candidates, in order                                  |
//! |-------------------|-------------------------------------------------------|
//! | implicit join     | `{Principal}{sep}{Key}`                                |
//! | with navigation   | `{Navigation}{Key}`, `{Principal}{Key}`, `{Key}`*      |
//! | without           | `{Principal}{Key}`, `{Key}`*, `{Principal}{sep}{Key}`  |
//!
//! (*) only when the key name already starts with the principal name.
//!
//! A candidate matches an unused existing property or a scalar shape
//! member. Otherwise a shadow property (indexer property on property-bag
//! dependents) is created, suffixed with a number if the name is taken.

use tracing::trace;

use skipnav_foundation::{
    ConfigurationSource, EntityTypeId, Error, ErrorKind, ForeignKeyId, MemberKind, NavigationId,
    PropertyId, Result,
};
use skipnav_registry::{ForeignKey, Model, PropertyFlags};

use crate::config::BuilderConfig;
use crate::matcher;

/// What the caller wants from a foreign key.
#[derive(Clone, Copy, Debug)]
pub struct ForeignKeyRequest<'a> {
    /// Declaring entity type.
    pub dependent: EntityTypeId,
    /// Referenced entity type.
    pub principal: EntityTypeId,
    /// Reference navigation on the dependent.
    pub navigation: Option<&'a str>,
    /// Collection navigation on the principal.
    pub inverse: Option<&'a str>,
    /// Foreign key to reuse when it still fits (the one a skip navigation
    /// already goes through).
    pub preferred: Option<ForeignKeyId>,
    /// Foreign keys that must not be reused.
    pub exclude: &'a [ForeignKeyId],
    /// Source for created objects.
    pub source: ConfigurationSource,
}

impl<'a> ForeignKeyRequest<'a> {
    /// Creates a request without navigations.
    #[must_use]
    pub fn new(dependent: EntityTypeId, principal: EntityTypeId, source: ConfigurationSource) -> Self {
        Self {
            dependent,
            principal,
            navigation: None,
            inverse: None,
            preferred: None,
            exclude: &[],
            source,
        }
    }
}

/// Finds or creates the foreign key and its navigations.
///
/// Re-running with the same request returns the same handle.
///
/// # Errors
///
/// - [`ErrorKind::MissingPrimaryKey`] if the principal has no primary key
/// - member validation errors for navigations the shapes do not declare
pub fn ensure(model: &mut Model, config: &BuilderConfig, request: &ForeignKeyRequest<'_>) -> Result<ForeignKeyId> {
    if let Some(navigation) = request.navigation {
        if !is_property_bag(model, request.dependent)? {
            matcher::reference_member(model, request.dependent, navigation, Some(request.principal))?;
        }
    }
    if let Some(inverse) = request.inverse {
        matcher::collection_member(model, request.principal, inverse, Some(request.dependent))?;
    }

    let fk = match find_existing(model, request) {
        Some(fk) => {
            trace!(
                dependent = %model.entity_type_name(request.dependent),
                principal = %model.entity_type_name(request.principal),
                "reusing foreign key"
            );
            fk
        }
        None => {
            let properties = properties_for(model, config, request)?;
            model.add_foreign_key(request.dependent, &properties, request.principal, request.source)?
        }
    };

    if let Some(navigation) = request.navigation {
        model.unignore_member(request.dependent, navigation)?;
        model.add_navigation(request.dependent, navigation, fk, true, request.source)?;
    }
    if let Some(inverse) = request.inverse {
        model.unignore_member(request.principal, inverse)?;
        model.add_navigation(request.principal, inverse, fk, false, request.source)?;
    }
    model.set_foreign_key_source(fk, request.source)?;
    Ok(fk)
}

fn is_property_bag(model: &Model, entity: EntityTypeId) -> Result<bool> {
    let shape = model.try_entity_type(entity)?.shape;
    Ok(model.catalog().is_property_bag(shape))
}

fn find_existing(model: &Model, request: &ForeignKeyRequest<'_>) -> Option<ForeignKeyId> {
    let candidates: Vec<ForeignKeyId> = model
        .foreign_keys_of(request.dependent)
        .into_iter()
        .filter(|id| !request.exclude.contains(id))
        .filter(|&id| {
            model
                .foreign_key(id)
                .is_some_and(|fk| fk.principal == request.principal)
        })
        .collect();

    let named = |slot: fn(&ForeignKey) -> Option<NavigationId>, name: &str| {
        candidates.iter().copied().find(|&id| {
            model
                .foreign_key(id)
                .and_then(slot)
                .and_then(|nav| model.navigation(nav))
                .is_some_and(|nav| nav.name == name)
        })
    };

    if let Some(preferred) = request.preferred.filter(|p| candidates.contains(p)) {
        return Some(preferred);
    }
    if let Some(found) = request
        .navigation
        .and_then(|name| named(|fk| fk.dependent_to_principal, name))
    {
        return Some(found);
    }
    if let Some(found) = request
        .inverse
        .and_then(|name| named(|fk| fk.principal_to_dependent, name))
    {
        return Some(found);
    }
    candidates.into_iter().find(|&id| {
        model
            .foreign_key(id)
            .is_some_and(|fk| fk.is_unnavigated() && fk.referencing_skip_navigations.is_empty())
    })
}

/// Picks (or creates) dependent properties for each principal key property.
fn properties_for(
    model: &mut Model,
    config: &BuilderConfig,
    request: &ForeignKeyRequest<'_>,
) -> Result<Vec<PropertyId>> {
    let principal_name = model.try_entity_type(request.principal)?.name.clone();
    let key = model.primary_key_properties(request.principal);
    if key.is_empty() {
        return Err(Error::new(ErrorKind::MissingPrimaryKey(principal_name)));
    }
    let dependent = model.try_entity_type(request.dependent)?;
    let (shape, implicit) = (dependent.shape, dependent.implicit_join);
    let bag = model.catalog().is_property_bag(shape);
    let sep = config.key_separator.as_str();

    let mut used: Vec<PropertyId> = model
        .foreign_keys_of(request.dependent)
        .into_iter()
        .filter_map(|fk| model.foreign_key(fk))
        .flat_map(|fk| fk.properties.iter().copied())
        .collect();

    let mut properties = Vec::with_capacity(key.len());
    for key_property in key {
        let (key_name, ty) = model
            .property(key_property)
            .map(|p| (p.name.clone(), p.ty))
            .ok_or_else(|| Error::stale_handle(key_property))?;

        let mut candidates = Vec::new();
        if implicit {
            candidates.push(format!("{principal_name}{sep}{key_name}"));
        } else {
            if let Some(navigation) = request.navigation {
                candidates.push(format!("{navigation}{key_name}"));
            }
            candidates.push(format!("{principal_name}{key_name}"));
            if key_name.starts_with(&principal_name) && key_name != principal_name {
                candidates.push(key_name.clone());
            }
            if request.navigation.is_none() {
                candidates.push(format!("{principal_name}{sep}{key_name}"));
            }
        }

        let mut chosen = None;
        for candidate in &candidates {
            if let Some(existing) = model
                .find_property(request.dependent, candidate)
                .filter(|id| !used.contains(id))
            {
                chosen = Some(existing);
                break;
            }
            if model.find_property(request.dependent, candidate).is_none() {
                if let Some(MemberKind::Scalar(member_ty)) =
                    model.catalog().member(shape, candidate).map(|m| m.kind)
                {
                    chosen = Some(model.add_property(
                        request.dependent,
                        candidate,
                        member_ty,
                        PropertyFlags::MEMBER,
                        ConfigurationSource::Convention,
                    )?);
                    break;
                }
            }
        }

        let property = match chosen {
            Some(property) => property,
            None => {
                let base = match request.navigation {
                    _ if implicit || bag => format!("{principal_name}{sep}{key_name}"),
                    Some(navigation) => format!("{navigation}{key_name}"),
                    None => format!("{principal_name}{key_name}"),
                };
                let name = unique_name(model, request.dependent, &base)?;
                let flags = if bag {
                    PropertyFlags::INDEXER
                } else {
                    PropertyFlags::SHADOW
                };
                model.add_property(request.dependent, &name, ty, flags, ConfigurationSource::Convention)?
            }
        };
        used.push(property);
        properties.push(property);
    }
    Ok(properties)
}

/// Returns `base`, or `base` with the smallest numeric suffix that names
/// neither a property nor a shape member.
fn unique_name(model: &Model, entity: EntityTypeId, base: &str) -> Result<String> {
    let shape = model.try_entity_type(entity)?.shape;
    let taken = |name: &str| {
        model.find_property(entity, name).is_some() || model.catalog().member(shape, name).is_some()
    };
    if !taken(base) {
        return Ok(base.to_string());
    }
    Ok((1u32..)
        .map(|n| format!("{base}{n}"))
        .find(|name| !taken(name))
        .unwrap_or_else(|| base.to_string()))
}

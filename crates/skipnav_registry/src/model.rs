//! The entity type registry.
//!
//! The [`Model`] owns every registry object in generational arenas and keeps
//! cross references consistent in both directions. All collections are
//! persistent, so `clone()` is a cheap snapshot.
//!
//! Removal cascades: removing an entity type removes its foreign keys,
//! navigations and skip navigations, and any relationship that pointed at it.
//! An implicitly created join entity type is removed as soon as one of its
//! foreign keys is no longer traversed by a skip navigation.

use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use skipnav_foundation::{
    ConfigurationSource, EntityTypeId, Error, ErrorKind, ForeignKeyId, KeyId, NavigationId,
    PropertyAccessMode, PropertyId, Result, ScalarType, ShapeCatalog, ShapeId, SkipNavigationId,
};

use crate::arena::Arena;
use crate::entity_type::{EntityType, Key, Property, PropertyFlags};
use crate::relationship::{ForeignKey, Navigation, SkipNavigation};

/// The metadata graph for one build-then-finalize session.
///
/// Mutable until [`Model::mark_finalized`] is called; every mutation after
/// that fails with [`ErrorKind::ModelFinalized`].
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Model {
    catalog: Arc<ShapeCatalog>,
    entity_types: Arena<EntityTypeId, EntityType>,
    properties: Arena<PropertyId, Property>,
    keys: Arena<KeyId, Key>,
    foreign_keys: Arena<ForeignKeyId, ForeignKey>,
    navigations: Arena<NavigationId, Navigation>,
    skip_navigations: Arena<SkipNavigationId, SkipNavigation>,
    /// Every entity type by name.
    by_name: im::OrdMap<String, EntityTypeId>,
    /// Entity types whose shape is not shared, by shape.
    by_shape: im::OrdMap<ShapeId, EntityTypeId>,
    shared_shapes: im::OrdSet<ShapeId>,
    ignored_shapes: im::OrdSet<ShapeId>,
    ignored_names: im::OrdSet<String>,
    access_mode: PropertyAccessMode,
    finalized: bool,
}

impl Model {
    /// Creates an empty model over a shape catalog.
    #[must_use]
    pub fn new(catalog: Arc<ShapeCatalog>) -> Self {
        Self {
            catalog,
            entity_types: Arena::new(),
            properties: Arena::new(),
            keys: Arena::new(),
            foreign_keys: Arena::new(),
            navigations: Arena::new(),
            skip_navigations: Arena::new(),
            by_name: im::OrdMap::new(),
            by_shape: im::OrdMap::new(),
            shared_shapes: im::OrdSet::new(),
            ignored_shapes: im::OrdSet::new(),
            ignored_names: im::OrdSet::new(),
            access_mode: PropertyAccessMode::default(),
            finalized: false,
        }
    }

    /// Sets the model-wide default access mode at construction.
    #[must_use]
    pub fn with_default_access_mode(mut self, mode: PropertyAccessMode) -> Self {
        self.access_mode = mode;
        self
    }

    /// Returns the shape catalog.
    #[must_use]
    pub fn catalog(&self) -> &ShapeCatalog {
        &self.catalog
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Returns true once the model is read-only.
    #[must_use]
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Makes the model read-only.
    pub fn mark_finalized(&mut self) {
        self.finalized = true;
    }

    /// Fails if the model has been finalized.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::ModelFinalized`] after [`Model::mark_finalized`].
    pub fn ensure_mutable(&self) -> Result<()> {
        if self.finalized {
            Err(Error::model_finalized())
        } else {
            Ok(())
        }
    }

    // =========================================================================
    // Entity Types
    // =========================================================================

    /// Gets an entity type.
    #[must_use]
    pub fn entity_type(&self, id: EntityTypeId) -> Option<&EntityType> {
        self.entity_types.get(id)
    }

    /// Gets an entity type, failing on stale handles.
    ///
    /// # Errors
    ///
    /// Returns a stale handle error if the entity type was removed.
    pub fn try_entity_type(&self, id: EntityTypeId) -> Result<&EntityType> {
        self.entity_types.try_get(id)
    }

    /// Iterates over all entity types in creation order.
    pub fn entity_types(&self) -> impl Iterator<Item = (EntityTypeId, &EntityType)> + '_ {
        self.entity_types.iter()
    }

    /// Returns the number of entity types.
    #[must_use]
    pub fn entity_type_count(&self) -> usize {
        self.entity_types.len()
    }

    /// Finds an entity type by name.
    #[must_use]
    pub fn find_entity_type(&self, name: &str) -> Option<EntityTypeId> {
        self.by_name.get(name).copied()
    }

    /// Finds the entity type of a non-shared shape.
    #[must_use]
    pub fn find_entity_type_by_shape(&self, shape: ShapeId) -> Option<EntityTypeId> {
        self.by_shape.get(&shape).copied()
    }

    /// Finds a named entity type backed by a shared shape.
    #[must_use]
    pub fn find_shared_entity_type(&self, shape: ShapeId, name: &str) -> Option<EntityTypeId> {
        self.find_entity_type(name)
            .filter(|&id| self.entity_types.get(id).is_some_and(|e| e.shape == shape))
    }

    /// Returns an entity type's name, or `"?"` for a stale handle.
    #[must_use]
    pub fn entity_type_name(&self, id: EntityTypeId) -> &str {
        self.entity_types.get(id).map_or("?", |e| e.name.as_str())
    }

    /// Renders `Type.member`.
    #[must_use]
    pub fn qualified_name(&self, entity: EntityTypeId, member: &str) -> String {
        format!("{}.{member}", self.entity_type_name(entity))
    }

    /// Returns true if the shape may back several named entity types.
    ///
    /// Property-bag shapes are implicitly shared.
    #[must_use]
    pub fn is_shape_shared(&self, shape: ShapeId) -> bool {
        self.shared_shapes.contains(&shape) || self.catalog.is_property_bag(shape)
    }

    /// Finds or creates an entity type.
    ///
    /// Without a name the shape must not be shared and the entity type is
    /// named after it. With a name the shape must be shared and the entity
    /// type is identified by `(shape, name)`. An existing entity type has its
    /// configuration source raised to `source`.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::ShapeNotFound`] for a shape from another catalog
    /// - [`ErrorKind::ClashingSharedType`] for an unnamed use of a shared shape
    /// - [`ErrorKind::TypeNotMarkedAsShared`] for a named use of an unshared shape
    /// - [`ErrorKind::DuplicateEntityType`] if the name belongs to another shape
    pub fn find_or_create_entity_type(
        &mut self,
        shape: ShapeId,
        name: Option<&str>,
        source: ConfigurationSource,
    ) -> Result<EntityTypeId> {
        self.ensure_mutable()?;
        let shape_name = self
            .catalog
            .get(shape)
            .map(|s| s.name().to_string())
            .ok_or_else(|| Error::new(ErrorKind::ShapeNotFound(format!("{shape:?}"))))?;

        match name {
            None => {
                if self.is_shape_shared(shape) {
                    return Err(Error::clashing_shared_type(shape_name));
                }
                if let Some(id) = self.find_entity_type_by_shape(shape) {
                    self.raise_entity_type_source(id, source)?;
                    return Ok(id);
                }
                let id = self.create_entity_type(EntityType::new(&shape_name, shape, source))?;
                self.by_shape.insert(shape, id);
                Ok(id)
            }
            Some(name) => {
                if !self.is_shape_shared(shape) {
                    return Err(Error::not_marked_as_shared(shape_name));
                }
                if let Some(id) = self.find_shared_entity_type(shape, name) {
                    self.raise_entity_type_source(id, source)?;
                    return Ok(id);
                }
                let mut entity = EntityType::new(name, shape, source);
                entity.has_shared_shape = true;
                self.create_entity_type(entity)
            }
        }
    }

    /// Creates an implicit join entity type backed by the property bag.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::DuplicateEntityType`] if the name is taken.
    pub fn add_implicit_join_entity_type(&mut self, name: &str) -> Result<EntityTypeId> {
        self.ensure_mutable()?;
        let mut entity = EntityType::new(name, ShapeId::PROPERTY_BAG, ConfigurationSource::Convention);
        entity.has_shared_shape = true;
        entity.implicit_join = true;
        self.create_entity_type(entity)
    }

    /// Registers a shape as shared.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::ClashingSharedType`] if an ordinary entity type
    /// already uses the shape.
    pub fn mark_shape_shared(&mut self, shape: ShapeId) -> Result<()> {
        self.ensure_mutable()?;
        if self.by_shape.contains_key(&shape) {
            return Err(Error::clashing_shared_type(self.catalog.name(shape)));
        }
        self.shared_shapes.insert(shape);
        Ok(())
    }

    /// Removes an entity type and everything that depends on it.
    ///
    /// # Errors
    ///
    /// Returns an error if the model is finalized or the handle is stale.
    pub fn remove_entity_type(&mut self, id: EntityTypeId) -> Result<()> {
        self.ensure_mutable()?;
        self.remove_entity_type_inner(id)
    }

    /// Removes an implicit join entity type if it no longer carries a
    /// relationship. Returns true if it was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the model is finalized.
    pub fn remove_orphaned_join(&mut self, join: EntityTypeId) -> Result<bool> {
        self.ensure_mutable()?;
        self.cleanup_orphaned_join(join)
    }

    fn create_entity_type(&mut self, entity: EntityType) -> Result<EntityTypeId> {
        if self.by_name.contains_key(&entity.name) {
            return Err(Error::new(ErrorKind::DuplicateEntityType(entity.name)));
        }
        let name = entity.name.clone();
        let id = self.entity_types.insert(entity);
        self.by_name.insert(name.clone(), id);
        debug!(entity_type = %name, "added entity type");
        Ok(id)
    }

    fn raise_entity_type_source(&mut self, id: EntityTypeId, source: ConfigurationSource) -> Result<()> {
        let entity = self.entity_types.try_get_mut(id)?;
        entity.source = entity.source.max(source);
        Ok(())
    }

    // =========================================================================
    // Ignoring
    // =========================================================================

    /// Removes a member's property, navigation or skip navigation and keeps
    /// it out of the model.
    ///
    /// Ignoring one side of a many-to-many relationship removes both skip
    /// navigations.
    ///
    /// # Errors
    ///
    /// Returns an error if the model is finalized or the handle is stale.
    pub fn ignore_member(&mut self, entity: EntityTypeId, member: &str) -> Result<()> {
        self.ensure_mutable()?;
        self.entity_types.validate(entity)?;

        if let Some(skip) = self.find_skip_navigation(entity, member) {
            let inverse = self.skip_navigations.get(skip).and_then(|s| s.inverse);
            self.remove_skip_navigation_inner(skip, None)?;
            if let Some(inverse) = inverse.filter(|&i| self.skip_navigations.contains(i)) {
                self.remove_skip_navigation_inner(inverse, None)?;
            }
        }
        if let Some(navigation) = self.find_navigation(entity, member) {
            self.remove_navigation_inner(navigation)?;
        }
        if let Some(property) = self.find_property(entity, member) {
            self.remove_property_inner(property)?;
        }
        if let Some(entity) = self.entity_types.get_mut(entity) {
            entity.ignored_members.insert(member.to_string());
            debug!(entity_type = %entity.name, member, "ignored member");
        }
        Ok(())
    }

    /// Lets a previously ignored member back into the model.
    ///
    /// # Errors
    ///
    /// Returns an error if the model is finalized or the handle is stale.
    pub fn unignore_member(&mut self, entity: EntityTypeId, member: &str) -> Result<()> {
        self.ensure_mutable()?;
        self.entity_types.try_get_mut(entity)?.ignored_members.remove(member);
        Ok(())
    }

    /// Returns true if the member is ignored on the entity type.
    #[must_use]
    pub fn is_member_ignored(&self, entity: EntityTypeId, member: &str) -> bool {
        self.entity_types.get(entity).is_some_and(|e| e.is_ignored(member))
    }

    /// Removes every entity type backed by the shape and keeps it out.
    ///
    /// # Errors
    ///
    /// Returns an error if the model is finalized.
    pub fn ignore_shape(&mut self, shape: ShapeId) -> Result<()> {
        self.ensure_mutable()?;
        for id in self.entity_types.handles_where(|e| e.shape == shape) {
            if self.entity_types.contains(id) {
                self.remove_entity_type_inner(id)?;
            }
        }
        self.ignored_shapes.insert(shape);
        Ok(())
    }

    /// Lets a previously ignored shape back into the model.
    ///
    /// # Errors
    ///
    /// Returns an error if the model is finalized.
    pub fn unignore_shape(&mut self, shape: ShapeId) -> Result<()> {
        self.ensure_mutable()?;
        self.ignored_shapes.remove(&shape);
        Ok(())
    }

    /// Returns true if the shape is ignored.
    #[must_use]
    pub fn is_shape_ignored(&self, shape: ShapeId) -> bool {
        self.ignored_shapes.contains(&shape)
    }

    /// Removes the named entity type, if any, and keeps the name out.
    ///
    /// # Errors
    ///
    /// Returns an error if the model is finalized.
    pub fn ignore_entity_name(&mut self, name: &str) -> Result<()> {
        self.ensure_mutable()?;
        if let Some(id) = self.find_entity_type(name) {
            self.remove_entity_type_inner(id)?;
        }
        self.ignored_names.insert(name.to_string());
        Ok(())
    }

    /// Lets a previously ignored entity type name back into the model.
    ///
    /// # Errors
    ///
    /// Returns an error if the model is finalized.
    pub fn unignore_entity_name(&mut self, name: &str) -> Result<()> {
        self.ensure_mutable()?;
        self.ignored_names.remove(name);
        Ok(())
    }

    /// Returns true if the entity type name is ignored.
    #[must_use]
    pub fn is_entity_name_ignored(&self, name: &str) -> bool {
        self.ignored_names.contains(name)
    }

    // =========================================================================
    // Properties and Keys
    // =========================================================================

    /// Gets a property.
    #[must_use]
    pub fn property(&self, id: PropertyId) -> Option<&Property> {
        self.properties.get(id)
    }

    /// Iterates over an entity type's properties in creation order.
    pub fn properties_of(
        &self,
        entity: EntityTypeId,
    ) -> impl Iterator<Item = (PropertyId, &Property)> + '_ {
        self.entity_types
            .get(entity)
            .into_iter()
            .flat_map(move |e| {
                e.properties
                    .iter()
                    .filter_map(move |&id| self.properties.get(id).map(|p| (id, p)))
            })
    }

    /// Finds a property by name.
    #[must_use]
    pub fn find_property(&self, entity: EntityTypeId, name: &str) -> Option<PropertyId> {
        self.properties_of(entity)
            .find(|(_, p)| p.name == name)
            .map(|(id, _)| id)
    }

    /// Resolves property handles to names, skipping stale handles.
    pub fn property_names(&self, ids: impl IntoIterator<Item = PropertyId>) -> Vec<&str> {
        ids.into_iter()
            .filter_map(|id| self.properties.get(id))
            .map(|p| p.name.as_str())
            .collect()
    }

    /// Adds a property, or returns the existing one with the same name.
    ///
    /// An explicit call on an existing property updates its type and flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the model is finalized or the handle is stale.
    pub fn add_property(
        &mut self,
        entity: EntityTypeId,
        name: &str,
        ty: ScalarType,
        flags: PropertyFlags,
        source: ConfigurationSource,
    ) -> Result<PropertyId> {
        self.ensure_mutable()?;
        self.entity_types.validate(entity)?;

        if let Some(id) = self.find_property(entity, name) {
            let property = self.properties.try_get_mut(id)?;
            if source == ConfigurationSource::Explicit {
                property.ty = ty;
                property.flags = flags;
            }
            property.source = property.source.max(source);
            return Ok(id);
        }

        let id = self.properties.insert(Property {
            name: name.to_string(),
            declaring: entity,
            ty,
            flags,
            source,
        });
        self.entity_types.try_get_mut(entity)?.properties.push_back(id);
        trace!(entity_type = %self.entity_type_name(entity), property = name, "added property");
        Ok(id)
    }

    /// Adds a property stored through a property bag's string indexer.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidIndexerProperty`] if the entity type is
    /// not backed by a property-bag shape.
    pub fn add_indexer_property(
        &mut self,
        entity: EntityTypeId,
        name: &str,
        ty: ScalarType,
        source: ConfigurationSource,
    ) -> Result<PropertyId> {
        let shape = self.entity_types.try_get(entity)?.shape;
        if !self.catalog.is_property_bag(shape) {
            return Err(Error::new(ErrorKind::InvalidIndexerProperty {
                entity: self.entity_type_name(entity).to_string(),
                property: name.to_string(),
            }));
        }
        self.add_property(entity, name, ty, PropertyFlags::INDEXER, source)
    }

    /// Gets a key.
    #[must_use]
    pub fn key(&self, id: KeyId) -> Option<&Key> {
        self.keys.get(id)
    }

    /// Returns the primary key properties of an entity type, in key order.
    #[must_use]
    pub fn primary_key_properties(&self, entity: EntityTypeId) -> Vec<PropertyId> {
        self.entity_types
            .get(entity)
            .and_then(|e| e.primary_key)
            .and_then(|key| self.keys.get(key))
            .map(|key| key.properties.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Sets the primary key.
    ///
    /// Setting the same properties again returns the same key. A convention
    /// never replaces an explicit key. Foreign keys that referenced a replaced
    /// key follow the new key when the arity matches and are removed otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::PropertyNotFound`] if a property belongs to
    /// another entity type.
    pub fn set_primary_key(
        &mut self,
        entity: EntityTypeId,
        properties: &[PropertyId],
        source: ConfigurationSource,
    ) -> Result<KeyId> {
        self.ensure_mutable()?;
        let existing = self.entity_types.try_get(entity)?.primary_key;
        for &property in properties {
            if !self.properties.get(property).is_some_and(|p| p.declaring == entity) {
                return Err(Error::new(ErrorKind::PropertyNotFound {
                    entity: self.entity_type_name(entity).to_string(),
                    property: format!("{property}"),
                }));
            }
        }

        if let Some(current) = existing {
            let key = self.keys.try_get_mut(current)?;
            if key.properties.iter().eq(properties.iter()) {
                key.source = key.source.max(source);
                return Ok(current);
            }
            if !source.overrides(key.source) {
                return Ok(current);
            }
        }

        let id = self.keys.insert(Key {
            declaring: entity,
            properties: properties.iter().copied().collect(),
            source,
        });
        let declaring = self.entity_types.try_get_mut(entity)?;
        declaring.primary_key = Some(id);
        declaring.keys.push_back(id);

        if let Some(previous) = existing {
            for fk in self.foreign_keys.handles_where(|fk| fk.principal_key == previous) {
                let arity = self.foreign_keys.try_get(fk)?.properties.len();
                if arity == properties.len() {
                    self.foreign_keys.try_get_mut(fk)?.principal_key = id;
                } else if self.foreign_keys.contains(fk) {
                    self.remove_foreign_key_inner(fk, None)?;
                }
            }
            if self.keys.contains(previous) {
                self.remove_key_inner(previous)?;
            }
        }
        Ok(id)
    }

    // =========================================================================
    // Foreign Keys
    // =========================================================================

    /// Gets a foreign key.
    #[must_use]
    pub fn foreign_key(&self, id: ForeignKeyId) -> Option<&ForeignKey> {
        self.foreign_keys.get(id)
    }

    /// Gets a foreign key, failing on stale handles.
    ///
    /// # Errors
    ///
    /// Returns a stale handle error if the foreign key was removed.
    pub fn try_foreign_key(&self, id: ForeignKeyId) -> Result<&ForeignKey> {
        self.foreign_keys.try_get(id)
    }

    /// Returns the foreign keys declared on an entity type, in declaration order.
    #[must_use]
    pub fn foreign_keys_of(&self, entity: EntityTypeId) -> Vec<ForeignKeyId> {
        self.entity_types
            .get(entity)
            .map(|e| e.foreign_keys.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Finds a foreign key by dependent properties and principal.
    #[must_use]
    pub fn find_foreign_key(
        &self,
        dependent: EntityTypeId,
        properties: &[PropertyId],
        principal: EntityTypeId,
    ) -> Option<ForeignKeyId> {
        self.entity_types.get(dependent)?.foreign_keys.iter().copied().find(|&id| {
            self.foreign_keys.get(id).is_some_and(|fk| {
                fk.principal == principal && fk.properties.iter().eq(properties.iter())
            })
        })
    }

    /// Adds a foreign key from `properties` on the dependent to the
    /// principal's primary key, or returns the identical existing one.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::MissingPrimaryKey`] if the principal has no primary key
    /// - [`ErrorKind::PropertyNotFound`] if a property belongs elsewhere
    /// - [`ErrorKind::Internal`] if the arity does not match the key
    pub fn add_foreign_key(
        &mut self,
        dependent: EntityTypeId,
        properties: &[PropertyId],
        principal: EntityTypeId,
        source: ConfigurationSource,
    ) -> Result<ForeignKeyId> {
        self.ensure_mutable()?;
        self.entity_types.validate(dependent)?;
        let principal_key = self
            .entity_types
            .try_get(principal)?
            .primary_key
            .ok_or_else(|| {
                Error::new(ErrorKind::MissingPrimaryKey(
                    self.entity_type_name(principal).to_string(),
                ))
            })?;
        let arity = self.keys.try_get(principal_key)?.properties.len();
        if arity != properties.len() {
            return Err(Error::internal(format!(
                "foreign key on '{}' has {} properties but the key of '{}' has {arity}",
                self.entity_type_name(dependent),
                properties.len(),
                self.entity_type_name(principal),
            )));
        }
        for &property in properties {
            if !self.properties.get(property).is_some_and(|p| p.declaring == dependent) {
                return Err(Error::new(ErrorKind::PropertyNotFound {
                    entity: self.entity_type_name(dependent).to_string(),
                    property: format!("{property}"),
                }));
            }
        }

        if let Some(id) = self.find_foreign_key(dependent, properties, principal) {
            let fk = self.foreign_keys.try_get_mut(id)?;
            fk.source = fk.source.max(source);
            return Ok(id);
        }

        let id = self.foreign_keys.insert(ForeignKey {
            declaring: dependent,
            properties: properties.iter().copied().collect(),
            principal,
            principal_key,
            dependent_to_principal: None,
            principal_to_dependent: None,
            referencing_skip_navigations: im::Vector::new(),
            source,
        });
        self.entity_types
            .try_get_mut(dependent)?
            .foreign_keys
            .push_back(id);
        debug!(
            dependent = %self.entity_type_name(dependent),
            principal = %self.entity_type_name(principal),
            "added foreign key"
        );
        Ok(id)
    }

    /// Removes a foreign key with its navigations and the skip navigations
    /// that traverse it.
    ///
    /// # Errors
    ///
    /// Returns an error if the model is finalized or the handle is stale.
    pub fn remove_foreign_key(&mut self, id: ForeignKeyId) -> Result<()> {
        self.ensure_mutable()?;
        self.remove_foreign_key_inner(id, None)
    }

    /// Raises a foreign key's configuration source.
    ///
    /// # Errors
    ///
    /// Returns an error if the model is finalized or the handle is stale.
    pub fn set_foreign_key_source(
        &mut self,
        id: ForeignKeyId,
        source: ConfigurationSource,
    ) -> Result<()> {
        self.ensure_mutable()?;
        let fk = self.foreign_keys.try_get_mut(id)?;
        fk.source = fk.source.max(source);
        Ok(())
    }

    // =========================================================================
    // Navigations
    // =========================================================================

    /// Gets a navigation.
    #[must_use]
    pub fn navigation(&self, id: NavigationId) -> Option<&Navigation> {
        self.navigations.get(id)
    }

    /// Finds a navigation by name.
    #[must_use]
    pub fn find_navigation(&self, entity: EntityTypeId, name: &str) -> Option<NavigationId> {
        self.entity_types
            .get(entity)?
            .navigations
            .iter()
            .copied()
            .find(|&id| self.navigations.get(id).is_some_and(|n| n.name == name))
    }

    /// Adds a navigation along a foreign key.
    ///
    /// On the dependent the navigation is a reference to the principal; on
    /// the principal it is a collection of dependents. An existing navigation
    /// in the same slot with the same name is returned; one with another name
    /// is replaced.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::Internal`] if `entity` is not the expected end of
    /// the foreign key.
    pub fn add_navigation(
        &mut self,
        entity: EntityTypeId,
        name: &str,
        foreign_key: ForeignKeyId,
        on_dependent: bool,
        source: ConfigurationSource,
    ) -> Result<NavigationId> {
        self.ensure_mutable()?;
        let fk = self.foreign_keys.try_get(foreign_key)?;
        let (declaring, target, slot) = if on_dependent {
            (fk.declaring, fk.principal, fk.dependent_to_principal)
        } else {
            (fk.principal, fk.declaring, fk.principal_to_dependent)
        };
        if declaring != entity {
            return Err(Error::internal(format!(
                "navigation '{}' is not on the expected end of its foreign key",
                self.qualified_name(entity, name)
            )));
        }

        if let Some(existing) = slot {
            let navigation = self.navigations.try_get_mut(existing)?;
            if navigation.name == name {
                navigation.source = navigation.source.max(source);
                return Ok(existing);
            }
            self.remove_navigation_inner(existing)?;
        }
        if let Some(other) = self.find_navigation(entity, name) {
            self.remove_navigation_inner(other)?;
        }

        let id = self.navigations.insert(Navigation {
            name: name.to_string(),
            declaring: entity,
            target,
            foreign_key,
            on_dependent,
            is_collection: !on_dependent,
            access_mode: None,
            source,
        });
        let fk = self.foreign_keys.try_get_mut(foreign_key)?;
        if on_dependent {
            fk.dependent_to_principal = Some(id);
        } else {
            fk.principal_to_dependent = Some(id);
        }
        self.entity_types.try_get_mut(entity)?.navigations.push_back(id);
        Ok(id)
    }

    /// Removes a navigation. The foreign key stays.
    ///
    /// # Errors
    ///
    /// Returns an error if the model is finalized or the handle is stale.
    pub fn remove_navigation(&mut self, id: NavigationId) -> Result<()> {
        self.ensure_mutable()?;
        self.remove_navigation_inner(id)
    }

    /// Overrides a navigation's access mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the model is finalized or the handle is stale.
    pub fn set_navigation_access_mode(
        &mut self,
        id: NavigationId,
        mode: PropertyAccessMode,
    ) -> Result<()> {
        self.ensure_mutable()?;
        self.navigations.try_get_mut(id)?.access_mode = Some(mode);
        Ok(())
    }

    /// Resolves a navigation's access mode: its own override, then its
    /// entity type's, then the model default.
    #[must_use]
    pub fn navigation_access_mode(&self, id: NavigationId) -> PropertyAccessMode {
        self.navigations.get(id).map_or(self.access_mode, |n| {
            self.resolve_access_mode(n.access_mode, n.declaring)
        })
    }

    // =========================================================================
    // Skip Navigations
    // =========================================================================

    /// Gets a skip navigation.
    #[must_use]
    pub fn skip_navigation(&self, id: SkipNavigationId) -> Option<&SkipNavigation> {
        self.skip_navigations.get(id)
    }

    /// Gets a skip navigation, failing on stale handles.
    ///
    /// # Errors
    ///
    /// Returns a stale handle error if the skip navigation was removed.
    pub fn try_skip_navigation(&self, id: SkipNavigationId) -> Result<&SkipNavigation> {
        self.skip_navigations.try_get(id)
    }

    /// Iterates over all skip navigations.
    pub fn skip_navigations(&self) -> impl Iterator<Item = (SkipNavigationId, &SkipNavigation)> + '_ {
        self.skip_navigations.iter()
    }

    /// Returns the skip navigations declared on an entity type.
    #[must_use]
    pub fn skip_navigations_of(&self, entity: EntityTypeId) -> Vec<SkipNavigationId> {
        self.entity_types
            .get(entity)
            .map(|e| e.skip_navigations.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Finds a skip navigation by name.
    #[must_use]
    pub fn find_skip_navigation(&self, entity: EntityTypeId, name: &str) -> Option<SkipNavigationId> {
        self.entity_types
            .get(entity)?
            .skip_navigations
            .iter()
            .copied()
            .find(|&id| self.skip_navigations.get(id).is_some_and(|s| s.name == name))
    }

    /// Returns the join entity type a skip navigation goes through.
    #[must_use]
    pub fn join_entity_type(&self, id: SkipNavigationId) -> Option<EntityTypeId> {
        let fk = self.skip_navigations.get(id)?.foreign_key?;
        self.foreign_keys.get(fk).map(|fk| fk.declaring)
    }

    /// Adds a skip navigation, or returns the existing one with the same name.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::NavigationTargetMismatch`] if a skip navigation
    /// with the same name targets another entity type.
    pub fn add_skip_navigation(
        &mut self,
        entity: EntityTypeId,
        name: &str,
        target: EntityTypeId,
        source: ConfigurationSource,
    ) -> Result<SkipNavigationId> {
        self.ensure_mutable()?;
        self.entity_types.validate(entity)?;
        self.entity_types.validate(target)?;

        if let Some(id) = self.find_skip_navigation(entity, name) {
            let existing = self.skip_navigations.try_get(id)?.target;
            if existing != target {
                return Err(Error::new(ErrorKind::NavigationTargetMismatch {
                    navigation: self.qualified_name(entity, name),
                    expected: self.entity_type_name(target).to_string(),
                    actual: self.entity_type_name(existing).to_string(),
                }));
            }
            let skip = self.skip_navigations.try_get_mut(id)?;
            skip.source = skip.source.max(source);
            return Ok(id);
        }

        let id = self
            .skip_navigations
            .insert(SkipNavigation::new(name, entity, target, source));
        self.entity_types
            .try_get_mut(entity)?
            .skip_navigations
            .push_back(id);
        debug!(
            skip_navigation = %self.qualified_name(entity, name),
            target = %self.entity_type_name(target),
            "added skip navigation"
        );
        Ok(id)
    }

    /// Makes two skip navigations each other's inverse.
    ///
    /// Previous inverses of either side are unlinked.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::Internal`] if the two do not point at each
    /// other's declaring entity type.
    pub fn set_skip_navigation_inverse(
        &mut self,
        left: SkipNavigationId,
        right: SkipNavigationId,
    ) -> Result<()> {
        self.ensure_mutable()?;
        let l = self.skip_navigations.try_get(left)?;
        let r = self.skip_navigations.try_get(right)?;
        if l.target != r.declaring || r.target != l.declaring {
            return Err(Error::internal(format!(
                "'{}' and '{}' do not point at each other",
                self.qualified_name(l.declaring, &l.name),
                self.qualified_name(r.declaring, &r.name),
            )));
        }

        for (previous, owner) in [(l.inverse, left), (r.inverse, right)] {
            let Some(previous) = previous.filter(|&p| p != left && p != right) else {
                continue;
            };
            if let Some(stale) = self.skip_navigations.get_mut(previous) {
                if stale.inverse == Some(owner) {
                    stale.inverse = None;
                }
            }
        }
        self.skip_navigations.try_get_mut(left)?.inverse = Some(right);
        self.skip_navigations.try_get_mut(right)?.inverse = Some(left);
        Ok(())
    }

    /// Associates a skip navigation with the join foreign key that points
    /// back at its declaring entity type, or detaches it with `None`.
    ///
    /// Detaching does not remove the old join; see
    /// [`Model::remove_orphaned_join`].
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidJoinEntity`] if the foreign key's principal
    /// is not the skip navigation's declaring entity type.
    pub fn set_skip_navigation_foreign_key(
        &mut self,
        id: SkipNavigationId,
        foreign_key: Option<ForeignKeyId>,
    ) -> Result<()> {
        self.ensure_mutable()?;
        let skip = self.skip_navigations.try_get(id)?;
        let (current, declaring) = (skip.foreign_key, skip.declaring);
        if current == foreign_key {
            return Ok(());
        }
        if let Some(new) = foreign_key {
            let fk = self.foreign_keys.try_get(new)?;
            if fk.principal != declaring {
                return Err(Error::new(ErrorKind::InvalidJoinEntity {
                    entity: self.entity_type_name(fk.declaring).to_string(),
                    reason: format!(
                        "foreign key does not point at '{}'",
                        self.entity_type_name(declaring)
                    ),
                }));
            }
        }

        if let Some(old) = current.and_then(|old| self.foreign_keys.get_mut(old)) {
            old.referencing_skip_navigations.retain(|&s| s != id);
        }
        if let Some(new) = foreign_key {
            self.foreign_keys
                .try_get_mut(new)?
                .referencing_skip_navigations
                .push_back(id);
        }
        self.skip_navigations.try_get_mut(id)?.foreign_key = foreign_key;
        Ok(())
    }

    /// Raises a skip navigation's configuration source.
    ///
    /// # Errors
    ///
    /// Returns an error if the model is finalized or the handle is stale.
    pub fn set_skip_navigation_source(
        &mut self,
        id: SkipNavigationId,
        source: ConfigurationSource,
    ) -> Result<()> {
        self.ensure_mutable()?;
        let skip = self.skip_navigations.try_get_mut(id)?;
        skip.source = skip.source.max(source);
        Ok(())
    }

    /// Overrides a skip navigation's access mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the model is finalized or the handle is stale.
    pub fn set_skip_navigation_access_mode(
        &mut self,
        id: SkipNavigationId,
        mode: PropertyAccessMode,
    ) -> Result<()> {
        self.ensure_mutable()?;
        self.skip_navigations.try_get_mut(id)?.access_mode = Some(mode);
        Ok(())
    }

    /// Resolves a skip navigation's access mode: its own override, then its
    /// entity type's, then the model default.
    #[must_use]
    pub fn skip_navigation_access_mode(&self, id: SkipNavigationId) -> PropertyAccessMode {
        self.skip_navigations.get(id).map_or(self.access_mode, |s| {
            self.resolve_access_mode(s.access_mode, s.declaring)
        })
    }

    /// Removes a skip navigation, unlinking its inverse.
    ///
    /// An implicit join left without a relationship is removed too, which
    /// also removes the inverse.
    ///
    /// # Errors
    ///
    /// Returns an error if the model is finalized or the handle is stale.
    pub fn remove_skip_navigation(&mut self, id: SkipNavigationId) -> Result<()> {
        self.ensure_mutable()?;
        self.remove_skip_navigation_inner(id, None)
    }

    // =========================================================================
    // Access Modes
    // =========================================================================

    /// Returns the model-wide default access mode.
    #[must_use]
    pub fn default_access_mode(&self) -> PropertyAccessMode {
        self.access_mode
    }

    /// Sets the model-wide default access mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the model is finalized.
    pub fn set_default_access_mode(&mut self, mode: PropertyAccessMode) -> Result<()> {
        self.ensure_mutable()?;
        self.access_mode = mode;
        Ok(())
    }

    /// Overrides the access mode for members of one entity type.
    ///
    /// # Errors
    ///
    /// Returns an error if the model is finalized or the handle is stale.
    pub fn set_entity_type_access_mode(
        &mut self,
        entity: EntityTypeId,
        mode: PropertyAccessMode,
    ) -> Result<()> {
        self.ensure_mutable()?;
        self.entity_types.try_get_mut(entity)?.access_mode = Some(mode);
        Ok(())
    }

    fn resolve_access_mode(
        &self,
        member: Option<PropertyAccessMode>,
        entity: EntityTypeId,
    ) -> PropertyAccessMode {
        member
            .or_else(|| self.entity_types.get(entity).and_then(|e| e.access_mode))
            .unwrap_or(self.access_mode)
    }

    // =========================================================================
    // Cascading Removal
    // =========================================================================
    // `guard` names a join entity type that is already being torn down and
    // must not be cleaned up again from inside the cascade.

    fn remove_entity_type_inner(&mut self, id: EntityTypeId) -> Result<()> {
        let entity = self.entity_types.try_get(id)?.clone();
        debug!(entity_type = %entity.name, "removing entity type");

        let inbound_skips = self
            .skip_navigations
            .handles_where(|s| s.target == id && s.declaring != id);
        for skip in entity.skip_navigations.iter().copied().chain(inbound_skips) {
            if self.skip_navigations.contains(skip) {
                self.remove_skip_navigation_inner(skip, Some(id))?;
            }
        }

        for fk in entity.foreign_keys.iter().copied() {
            if self.foreign_keys.contains(fk) {
                self.remove_foreign_key_inner(fk, Some(id))?;
            }
        }
        for fk in self.foreign_keys.handles_where(|fk| fk.principal == id) {
            if self.foreign_keys.contains(fk) {
                self.remove_foreign_key_inner(fk, Some(id))?;
            }
        }

        let entity = self.entity_types.try_get(id)?.clone();
        for navigation in entity.navigations.iter().copied() {
            if self.navigations.contains(navigation) {
                self.remove_navigation_inner(navigation)?;
            }
        }
        for key in entity.keys.iter().copied() {
            if self.keys.contains(key) {
                self.keys.remove(key)?;
            }
        }
        for property in entity.properties.iter().copied() {
            if self.properties.contains(property) {
                self.properties.remove(property)?;
            }
        }

        self.by_name.remove(&entity.name);
        if self.by_shape.get(&entity.shape) == Some(&id) {
            self.by_shape.remove(&entity.shape);
        }
        self.entity_types.remove(id)?;
        Ok(())
    }

    fn remove_foreign_key_inner(
        &mut self,
        id: ForeignKeyId,
        guard: Option<EntityTypeId>,
    ) -> Result<()> {
        let fk = self.foreign_keys.try_get(id)?.clone();

        for skip in fk.referencing_skip_navigations.iter().copied() {
            if self.skip_navigations.contains(skip) {
                self.remove_skip_navigation_inner(skip, Some(fk.declaring))?;
            }
        }
        for navigation in [fk.dependent_to_principal, fk.principal_to_dependent]
            .into_iter()
            .flatten()
        {
            if self.navigations.contains(navigation) {
                self.remove_navigation_inner(navigation)?;
            }
        }

        if let Some(dependent) = self.entity_types.get_mut(fk.declaring) {
            dependent.foreign_keys.retain(|&f| f != id);
        }
        self.foreign_keys.remove(id)?;
        trace!(
            dependent = %self.entity_type_name(fk.declaring),
            principal = %self.entity_type_name(fk.principal),
            "removed foreign key"
        );

        self.remove_unused_shadow_properties(fk.declaring, &fk.properties)?;
        if guard != Some(fk.declaring) {
            self.cleanup_orphaned_join(fk.declaring)?;
        }
        Ok(())
    }

    /// Drops convention-created shadow and indexer properties that no key or
    /// foreign key uses.
    fn remove_unused_shadow_properties(
        &mut self,
        entity: EntityTypeId,
        properties: &im::Vector<PropertyId>,
    ) -> Result<()> {
        for &property in properties {
            let removable = self.properties.get(property).is_some_and(|p| {
                (p.is_shadow() || p.is_indexer()) && p.source == ConfigurationSource::Convention
            });
            let in_use = self
                .foreign_keys
                .iter()
                .any(|(_, fk)| fk.declaring == entity && fk.properties.contains(&property))
                || self
                    .keys
                    .iter()
                    .any(|(_, key)| key.declaring == entity && key.properties.contains(&property));
            if removable && !in_use {
                if let Some(declaring) = self.entity_types.get_mut(entity) {
                    declaring.properties.retain(|&p| p != property);
                }
                self.properties.remove(property)?;
            }
        }
        Ok(())
    }

    fn remove_skip_navigation_inner(
        &mut self,
        id: SkipNavigationId,
        guard: Option<EntityTypeId>,
    ) -> Result<()> {
        let skip = self.skip_navigations.try_get(id)?.clone();

        if let Some(inverse) = skip.inverse.and_then(|i| self.skip_navigations.get_mut(i)) {
            if inverse.inverse == Some(id) {
                inverse.inverse = None;
            }
        }
        let join = skip.foreign_key.and_then(|fk| {
            let fk = self.foreign_keys.get_mut(fk)?;
            fk.referencing_skip_navigations.retain(|&s| s != id);
            Some(fk.declaring)
        });
        if let Some(declaring) = self.entity_types.get_mut(skip.declaring) {
            declaring.skip_navigations.retain(|&s| s != id);
        }
        self.skip_navigations.remove(id)?;
        debug!(
            skip_navigation = %self.qualified_name(skip.declaring, &skip.name),
            "removed skip navigation"
        );

        if let Some(join) = join.filter(|&j| guard != Some(j)) {
            self.cleanup_orphaned_join(join)?;
        }
        Ok(())
    }

    fn remove_navigation_inner(&mut self, id: NavigationId) -> Result<()> {
        let navigation = self.navigations.try_get(id)?.clone();
        if let Some(fk) = self.foreign_keys.get_mut(navigation.foreign_key) {
            if fk.dependent_to_principal == Some(id) {
                fk.dependent_to_principal = None;
            }
            if fk.principal_to_dependent == Some(id) {
                fk.principal_to_dependent = None;
            }
        }
        if let Some(declaring) = self.entity_types.get_mut(navigation.declaring) {
            declaring.navigations.retain(|&n| n != id);
        }
        self.navigations.remove(id)?;
        Ok(())
    }

    fn remove_property_inner(&mut self, id: PropertyId) -> Result<()> {
        let entity = self.properties.try_get(id)?.declaring;

        for fk in self
            .foreign_keys
            .handles_where(|fk| fk.declaring == entity && fk.properties.contains(&id))
        {
            if self.foreign_keys.contains(fk) {
                self.remove_foreign_key_inner(fk, None)?;
            }
        }
        for key in self
            .keys
            .handles_where(|key| key.declaring == entity && key.properties.contains(&id))
        {
            if self.keys.contains(key) {
                self.remove_key_inner(key)?;
            }
        }

        if self.properties.contains(id) {
            if let Some(declaring) = self.entity_types.get_mut(entity) {
                declaring.properties.retain(|&p| p != id);
            }
            self.properties.remove(id)?;
        }
        Ok(())
    }

    fn remove_key_inner(&mut self, id: KeyId) -> Result<()> {
        for fk in self.foreign_keys.handles_where(|fk| fk.principal_key == id) {
            if self.foreign_keys.contains(fk) {
                self.remove_foreign_key_inner(fk, None)?;
            }
        }
        let declaring = self.keys.try_get(id)?.declaring;
        if let Some(entity) = self.entity_types.get_mut(declaring) {
            entity.keys.retain(|&k| k != id);
            if entity.primary_key == Some(id) {
                entity.primary_key = None;
            }
        }
        self.keys.remove(id)?;
        Ok(())
    }

    /// Removes an implicit join whose foreign keys no longer all carry a
    /// skip navigation.
    fn cleanup_orphaned_join(&mut self, join: EntityTypeId) -> Result<bool> {
        let Some(entity) = self.entity_types.get(join) else {
            return Ok(false);
        };
        if !entity.implicit_join {
            return Ok(false);
        }
        let orphaned = entity.foreign_keys.len() < 2
            || entity.foreign_keys.iter().any(|&fk| {
                self.foreign_keys
                    .get(fk)
                    .is_none_or(|fk| fk.referencing_skip_navigations.is_empty())
            });
        if orphaned {
            debug!(join = %entity.name, "removing orphaned implicit join entity type");
            self.remove_entity_type_inner(join)?;
        }
        Ok(orphaned)
    }
}

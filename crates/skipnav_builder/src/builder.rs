//! The fluent configuration surface.
//!
//! [`ModelBuilder`] owns the [`Model`] under construction. Every call is
//! turned into a [`ConfigurationCall`], applied against a snapshot of the
//! registry and recorded only if it succeeds, so a failed call leaves the
//! model exactly as it was.
//!
//! # Example
//!
//! ```
//! use skipnav_builder::ModelBuilder;
//! use skipnav_foundation::{ScalarType, ShapeCatalog};
//!
//! let mut catalog = ShapeCatalog::new();
//! catalog.define("Blog").scalar("Id", ScalarType::Int).collection("Tags", "Tag");
//! catalog.define("Tag").scalar("Id", ScalarType::Int).collection("Blogs", "Blog");
//!
//! let mut builder = ModelBuilder::new(catalog);
//! builder.entity("Blog")?.has_many("Tags")?.with_many("Blogs")?;
//! let model = builder.finalize_model()?;
//! assert!(model.find_entity_type("BlogTag").is_some());
//! # Ok::<(), skipnav_foundation::Error>(())
//! ```

use std::sync::Arc;

use tracing::{debug, info};

use skipnav_foundation::{
    EntityTypeId, ErrorContext, ForeignKeyId, PropertyAccessMode, Result, ScalarType,
    ShapeCatalog, SkipNavigationId,
};
use skipnav_registry::Model;

use crate::apply::{Outcome, apply};
use crate::config::BuilderConfig;
use crate::discovery::{self, DiscoveryReport};
use crate::finalize;
use crate::log::{ConfigurationCall, ConfigurationLog, EntityRef, JoinEntity};
use crate::matcher;
use crate::shared;

/// Lifecycle of a [`ModelBuilder`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuildState {
    /// Accepting configuration.
    Building,
    /// Inside [`ModelBuilder::finalize_model`].
    Finalizing,
    /// Read-only.
    Finalized,
}

/// Builds a [`Model`] from configuration calls and conventions.
#[derive(Debug)]
pub struct ModelBuilder {
    model: Model,
    config: BuilderConfig,
    log: ConfigurationLog,
    state: BuildState,
}

impl ModelBuilder {
    /// Creates a builder with the default configuration.
    #[must_use]
    pub fn new(catalog: ShapeCatalog) -> Self {
        Self::with_config(catalog, BuilderConfig::default())
    }

    /// Creates a builder with the given configuration.
    #[must_use]
    pub fn with_config(catalog: ShapeCatalog, config: BuilderConfig) -> Self {
        let model = Model::new(Arc::new(catalog)).with_default_access_mode(config.default_access_mode);
        Self {
            model,
            config,
            log: ConfigurationLog::new(),
            state: BuildState::Building,
        }
    }

    /// The model as configured so far.
    #[must_use]
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// The builder configuration.
    #[must_use]
    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    /// Every successful configuration call, in call order.
    #[must_use]
    pub fn log(&self) -> &ConfigurationLog {
        &self.log
    }

    /// The current lifecycle state.
    #[must_use]
    pub fn state(&self) -> BuildState {
        self.state
    }

    /// Returns true once [`ModelBuilder::finalize_model`] has succeeded.
    #[must_use]
    pub fn is_finalized(&self) -> bool {
        self.state == BuildState::Finalized
    }

    /// Configures the ordinary entity type of a shape.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::ShapeNotFound`](skipnav_foundation::ErrorKind::ShapeNotFound)
    /// - [`ErrorKind::ClashingSharedType`](skipnav_foundation::ErrorKind::ClashingSharedType)
    ///   if the shape is shared
    /// - [`ErrorKind::ModelFinalized`](skipnav_foundation::ErrorKind::ModelFinalized)
    pub fn entity(&mut self, shape: &str) -> Result<EntityTypeBuilder<'_>> {
        let id = self
            .execute(ConfigurationCall::Entity { shape: shape.to_string() })?
            .entity_type()?;
        Ok(EntityTypeBuilder::new(self, id))
    }

    /// Declares a shape shared without creating an entity type.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::ClashingSharedType`](skipnav_foundation::ErrorKind::ClashingSharedType)
    /// if an explicitly configured ordinary entity type uses the shape.
    pub fn shared_type(&mut self, shape: &str) -> Result<&mut Self> {
        self.execute(ConfigurationCall::SharedType { shape: shape.to_string() })?;
        Ok(self)
    }

    /// Declares the shape shared and configures a named entity type of it.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::ClashingSharedType`](skipnav_foundation::ErrorKind::ClashingSharedType)
    /// if an explicitly configured ordinary entity type uses the shape.
    pub fn shared_type_entity(&mut self, name: &str, shape: &str) -> Result<EntityTypeBuilder<'_>> {
        let id = self
            .execute(ConfigurationCall::SharedTypeEntity {
                name: name.to_string(),
                shape: shape.to_string(),
            })?
            .entity_type()?;
        Ok(EntityTypeBuilder::new(self, id))
    }

    /// Removes every entity type of a shape and keeps discovery away from it.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown shapes or after finalization.
    pub fn ignore(&mut self, shape: &str) -> Result<&mut Self> {
        self.execute(ConfigurationCall::IgnoreShape { shape: shape.to_string() })?;
        Ok(self)
    }

    /// Removes the named entity type and keeps the name out of the model.
    ///
    /// # Errors
    ///
    /// Returns an error after finalization.
    pub fn ignore_entity(&mut self, name: &str) -> Result<&mut Self> {
        self.execute(ConfigurationCall::IgnoreEntity { name: name.to_string() })?;
        Ok(self)
    }

    /// Runs discovery now, regardless of [`BuilderConfig::eager_discovery`].
    ///
    /// # Errors
    ///
    /// Returns registry errors; the model is restored on failure.
    pub fn discover(&mut self) -> Result<DiscoveryReport> {
        self.model.ensure_mutable()?;
        let snapshot = self.model.clone();
        discovery::run(&mut self.model, &self.config).inspect_err(|_| self.model = snapshot)
    }

    /// Finalizes the model: replays the effective configuration, runs
    /// discovery, validates every relationship and makes the model
    /// read-only. Calling it again returns the same model.
    ///
    /// # Errors
    ///
    /// Returns the first terminal error. The builder is left in
    /// [`BuildState::Building`] with the model as it was before the call.
    pub fn finalize_model(&mut self) -> Result<&Model> {
        if self.state == BuildState::Finalized {
            return Ok(&self.model);
        }
        self.state = BuildState::Finalizing;
        let snapshot = self.model.clone();
        match finalize::run(&mut self.model, &self.config, &self.log) {
            Ok(report) => {
                self.state = BuildState::Finalized;
                info!(
                    entity_types = self.model.entity_type_count(),
                    skip_navigations = self.model.skip_navigations().count(),
                    ambiguous = report.ambiguous.len(),
                    "model finalized"
                );
                Ok(&self.model)
            }
            Err(error) => {
                self.model = snapshot;
                self.state = BuildState::Building;
                Err(error)
            }
        }
    }

    pub(crate) fn execute(&mut self, call: ConfigurationCall) -> Result<Outcome> {
        self.model.ensure_mutable()?;
        let snapshot = self.model.clone();
        let result = apply(&mut self.model, &self.config, &call).and_then(|outcome| {
            if self.config.eager_discovery {
                discovery::run(&mut self.model, &self.config)?;
            }
            Ok(outcome)
        });
        match result {
            Ok(outcome) => {
                self.log.record(call);
                Ok(outcome)
            }
            Err(error) => {
                debug!(%call, %error, "configuration call failed, model restored");
                self.model = snapshot;
                Err(error.with_context(ErrorContext::new().with_call(call.to_string())))
            }
        }
    }
}

/// Configures one entity type.
#[derive(Debug)]
pub struct EntityTypeBuilder<'a> {
    builder: &'a mut ModelBuilder,
    id: EntityTypeId,
    name: String,
}

impl<'a> EntityTypeBuilder<'a> {
    fn new(builder: &'a mut ModelBuilder, id: EntityTypeId) -> Self {
        let name = builder.model.entity_type_name(id).to_string();
        Self { builder, id, name }
    }

    /// The entity type's handle.
    #[must_use]
    pub fn id(&self) -> EntityTypeId {
        self.id
    }

    /// The entity type's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Configures a property backed by a scalar member.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::PropertyNotFound`](skipnav_foundation::ErrorKind::PropertyNotFound)
    /// if the shape has no such scalar member.
    pub fn property(&mut self, name: &str) -> Result<&mut Self> {
        self.execute(ConfigurationCall::Property {
            entity: self.name.clone(),
            name: name.to_string(),
        })?;
        Ok(self)
    }

    /// Configures an indexer property. Only property-bag entity types
    /// accept them.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidIndexerProperty`](skipnav_foundation::ErrorKind::InvalidIndexerProperty)
    /// for other entity types.
    pub fn indexer_property(&mut self, name: &str, ty: ScalarType) -> Result<&mut Self> {
        self.execute(ConfigurationCall::IndexerProperty {
            entity: self.name.clone(),
            name: name.to_string(),
            ty,
        })?;
        Ok(self)
    }

    /// Sets the primary key.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::PropertyNotFound`](skipnav_foundation::ErrorKind::PropertyNotFound)
    /// for names that are neither properties nor scalar members.
    pub fn has_key(&mut self, properties: &[&str]) -> Result<&mut Self> {
        self.execute(ConfigurationCall::Key {
            entity: self.name.clone(),
            properties: properties.iter().map(ToString::to_string).collect(),
        })?;
        Ok(self)
    }

    /// Removes a member from the model and keeps conventions away from it.
    ///
    /// # Errors
    ///
    /// Returns an error after finalization.
    pub fn ignore(&mut self, member: &str) -> Result<&mut Self> {
        self.execute(ConfigurationCall::IgnoreMember {
            entity: self.name.clone(),
            member: member.to_string(),
        })?;
        Ok(self)
    }

    /// Sets the access mode for every member of this entity type.
    ///
    /// # Errors
    ///
    /// Returns an error after finalization.
    pub fn use_property_access_mode(&mut self, mode: PropertyAccessMode) -> Result<&mut Self> {
        self.execute(ConfigurationCall::AccessMode {
            entity: self.name.clone(),
            member: None,
            mode,
        })?;
        Ok(self)
    }

    /// Selects a navigation or skip navigation by name.
    pub fn navigation(&mut self, name: &str) -> NavigationBuilder<'_> {
        NavigationBuilder {
            builder: &mut *self.builder,
            entity: self.name.clone(),
            name: name.to_string(),
        }
    }

    /// Starts a relationship through a collection member.
    ///
    /// # Errors
    ///
    /// Returns a member validation error if the shape has no such
    /// collection member.
    pub fn has_many(self, navigation: &str) -> Result<CollectionBuilder<'a>> {
        let target = matcher::collection_member(&self.builder.model, self.id, navigation, None)?;
        let target = self.builder.model.catalog().name(target).to_string();
        Ok(CollectionBuilder {
            builder: self.builder,
            entity: self.name,
            navigation: Some(navigation.to_string()),
            target,
        })
    }

    /// Starts a relationship with a shape without naming a navigation on
    /// this side.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::ShapeNotFound`](skipnav_foundation::ErrorKind::ShapeNotFound).
    pub fn has_many_to(self, shape: &str) -> Result<CollectionBuilder<'a>> {
        shared::lookup_shape(&self.builder.model, shape)?;
        Ok(CollectionBuilder {
            builder: self.builder,
            entity: self.name,
            navigation: None,
            target: shape.to_string(),
        })
    }

    /// Starts a relationship through a reference member.
    ///
    /// # Errors
    ///
    /// Returns a member validation error if the shape has no such reference
    /// member.
    pub fn has_one(self, navigation: &str) -> Result<ReferenceBuilder<'a>> {
        let target = matcher::reference_member(&self.builder.model, self.id, navigation, None)?;
        let target = self.builder.model.catalog().name(target).to_string();
        Ok(ReferenceBuilder {
            builder: self.builder,
            entity: self.name,
            navigation: Some(navigation.to_string()),
            target,
        })
    }

    /// Starts a reference relationship with a shape without naming a
    /// navigation on this side.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::ShapeNotFound`](skipnav_foundation::ErrorKind::ShapeNotFound).
    pub fn has_one_to(self, shape: &str) -> Result<ReferenceBuilder<'a>> {
        shared::lookup_shape(&self.builder.model, shape)?;
        Ok(ReferenceBuilder {
            builder: self.builder,
            entity: self.name,
            navigation: None,
            target: shape.to_string(),
        })
    }

    fn execute(&mut self, call: ConfigurationCall) -> Result<Outcome> {
        self.builder.execute(call)
    }
}

/// Configures one navigation or skip navigation.
#[derive(Debug)]
pub struct NavigationBuilder<'a> {
    builder: &'a mut ModelBuilder,
    entity: String,
    name: String,
}

impl NavigationBuilder<'_> {
    /// Sets the navigation's access mode.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::NavigationNotFound`](skipnav_foundation::ErrorKind::NavigationNotFound)
    /// if no navigation or skip navigation has this name.
    pub fn use_property_access_mode(self, mode: PropertyAccessMode) -> Result<()> {
        self.builder.execute(ConfigurationCall::AccessMode {
            entity: self.entity,
            member: Some(self.name),
            mode,
        })?;
        Ok(())
    }
}

/// The collection side of a relationship in progress.
#[derive(Debug)]
pub struct CollectionBuilder<'a> {
    builder: &'a mut ModelBuilder,
    entity: String,
    navigation: Option<String>,
    target: String,
}

impl<'a> CollectionBuilder<'a> {
    /// Completes a many-to-many relationship.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::ConflictingRelationshipNavigation`](skipnav_foundation::ErrorKind::ConflictingRelationshipNavigation)
    ///   if either navigation already belongs to a single-valued relationship
    /// - [`ErrorKind::MissingInverseManyToManyNavigation`](skipnav_foundation::ErrorKind::MissingInverseManyToManyNavigation)
    ///   if this side has no navigation
    /// - [`ErrorKind::MissingPrimaryKey`](skipnav_foundation::ErrorKind::MissingPrimaryKey)
    ///   if a side has no key when a join is synthesized
    pub fn with_many(self, navigation: &str) -> Result<ManyToManyBuilder<'a>> {
        self.many_to_many(Some(navigation.to_string()))
    }

    /// Completes a many-to-many relationship without a navigation on the
    /// other side, which always fails.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::MissingInverseManyToManyNavigation`](skipnav_foundation::ErrorKind::MissingInverseManyToManyNavigation).
    pub fn with_many_unnamed(self) -> Result<ManyToManyBuilder<'a>> {
        self.many_to_many(None)
    }

    /// Completes a one-to-many relationship with this side as principal.
    ///
    /// # Errors
    ///
    /// Returns a conflict if the collection is an explicit skip navigation,
    /// or a member validation error.
    pub fn with_one(self, navigation: Option<&str>) -> Result<ForeignKeyId> {
        self.builder
            .execute(ConfigurationCall::OneToMany {
                principal: EntityRef::Name(self.entity),
                collection: self.navigation,
                dependent: EntityRef::Shape(self.target),
                reference: navigation.map(str::to_string),
            })?
            .foreign_key()
    }

    fn many_to_many(self, right_navigation: Option<String>) -> Result<ManyToManyBuilder<'a>> {
        let pair = Pair {
            left: EntityRef::Name(self.entity),
            left_navigation: self.navigation,
            right: EntityRef::Shape(self.target),
            right_navigation,
        };
        let result = self.builder.execute(pair.call(None))?.many_to_many()?;
        Ok(ManyToManyBuilder {
            builder: self.builder,
            pair,
            left: result.left,
            right: result.right,
            join: result.join,
        })
    }
}

/// The reference side of a relationship in progress.
#[derive(Debug)]
pub struct ReferenceBuilder<'a> {
    builder: &'a mut ModelBuilder,
    entity: String,
    navigation: Option<String>,
    target: String,
}

impl ReferenceBuilder<'_> {
    /// Completes a one-to-many relationship with this side as dependent.
    ///
    /// # Errors
    ///
    /// Returns a conflict if the collection is an explicit skip navigation,
    /// or a member validation error.
    pub fn with_many(self, navigation: Option<&str>) -> Result<ForeignKeyId> {
        self.builder
            .execute(ConfigurationCall::OneToMany {
                principal: EntityRef::Shape(self.target),
                collection: navigation.map(str::to_string),
                dependent: EntityRef::Name(self.entity),
                reference: self.navigation,
            })?
            .foreign_key()
    }
}

#[derive(Clone, Debug)]
struct Pair {
    left: EntityRef,
    left_navigation: Option<String>,
    right: EntityRef,
    right_navigation: Option<String>,
}

impl Pair {
    fn call(&self, join: Option<JoinEntity>) -> ConfigurationCall {
        ConfigurationCall::ManyToMany {
            left: self.left.clone(),
            left_navigation: self.left_navigation.clone(),
            right: self.right.clone(),
            right_navigation: self.right_navigation.clone(),
            join,
        }
    }
}

/// A configured many-to-many relationship.
#[derive(Debug)]
pub struct ManyToManyBuilder<'a> {
    builder: &'a mut ModelBuilder,
    pair: Pair,
    left: SkipNavigationId,
    right: SkipNavigationId,
    join: Option<EntityTypeId>,
}

impl<'a> ManyToManyBuilder<'a> {
    /// The skip navigation on the side `has_many` was called on.
    #[must_use]
    pub fn left_skip_navigation(&self) -> SkipNavigationId {
        self.left
    }

    /// The skip navigation on the other side.
    #[must_use]
    pub fn right_skip_navigation(&self) -> SkipNavigationId {
        self.right
    }

    /// The join entity type, if one is configured.
    #[must_use]
    pub fn join_entity_type(&self) -> Option<EntityTypeId> {
        self.join
    }

    /// Uses an explicit join entity type, replacing the current join.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::ClashingSharedType`](skipnav_foundation::ErrorKind::ClashingSharedType)
    ///   for an unnamed join of a shared shape, or one that joins another pair
    /// - [`ErrorKind::TypeNotMarkedAsShared`](skipnav_foundation::ErrorKind::TypeNotMarkedAsShared)
    ///   for a named join of an ordinary shape
    pub fn using_entity(self, join: JoinEntity) -> Result<EntityTypeBuilder<'a>> {
        let result = self.builder.execute(self.pair.call(Some(join)))?.many_to_many()?;
        let id = result
            .join
            .ok_or_else(|| skipnav_foundation::Error::internal("explicit join was not created"))?;
        Ok(EntityTypeBuilder::new(self.builder, id))
    }
}

//! Integration tests for the fluent configuration surface

use skipnav_builder::{BuildState, JoinEntity, ModelBuilder};
use skipnav_foundation::{ErrorKind, PropertyAccessMode, ScalarType};

use crate::catalog;

// =============================================================================
// Entity Types
// =============================================================================

#[test]
fn explicit_key_replaces_convention_key() {
    let mut builder = ModelBuilder::new(catalog());
    builder.entity("Blog").unwrap();
    let tag = builder.entity("Tag").unwrap().has_key(&["Code"]).unwrap().id();

    let model = builder.model();
    assert_eq!(model.property_names(model.primary_key_properties(tag)), vec!["Code"]);
    let join = model.find_entity_type("BlogTag").unwrap();
    assert_eq!(model.foreign_keys_of(join).len(), 2);
}

#[test]
fn indexer_property_failure_names_the_call() {
    let mut builder = ModelBuilder::new(catalog());
    let err = builder
        .entity("Blog")
        .unwrap()
        .indexer_property("Payload", ScalarType::Int)
        .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::InvalidIndexerProperty { .. }));
    assert_eq!(
        err.context.unwrap().call.as_deref(),
        Some("Blog.indexer_property(Payload: int)")
    );
}

#[test]
fn unknown_shape_is_reported() {
    let mut builder = ModelBuilder::new(catalog());
    let err = builder.entity("Comment").unwrap_err();
    assert_eq!(err.kind, ErrorKind::ShapeNotFound("Comment".into()));
    assert!(builder.log().is_empty());
}

#[test]
fn ignored_shape_is_not_rediscovered() {
    let mut builder = ModelBuilder::new(catalog());
    builder.entity("Blog").unwrap();
    assert!(builder.model().find_entity_type("Post").is_some());

    builder.ignore("Post").unwrap();
    assert!(builder.model().find_entity_type("Post").is_none());
    let model = builder.finalize_model().unwrap();
    assert!(model.find_entity_type("Post").is_none());
}

// =============================================================================
// Relationships
// =============================================================================

#[test]
fn one_to_many_from_either_side_is_the_same_foreign_key() {
    let mut builder = ModelBuilder::new(catalog());
    let fk = builder
        .entity("Post")
        .unwrap()
        .has_one("Blog")
        .unwrap()
        .with_many(Some("Posts"))
        .unwrap();
    let again = builder
        .entity("Blog")
        .unwrap()
        .has_many("Posts")
        .unwrap()
        .with_one(Some("Blog"))
        .unwrap();
    assert_eq!(fk, again);

    let model = builder.model();
    let post = model.find_entity_type("Post").unwrap();
    let properties = model.foreign_key(fk).unwrap().properties.iter().copied();
    assert_eq!(model.property_names(properties), vec!["BlogId"]);
    assert!(model.find_navigation(post, "Blog").is_some());
}

#[test]
fn has_many_needs_a_collection_member() {
    let mut builder = ModelBuilder::new(catalog());
    let err = builder.entity("Post").unwrap().has_many("Blog").unwrap_err();
    assert_eq!(
        err.kind,
        ErrorKind::NotACollectionNavigation {
            shape: "Post".into(),
            member: "Blog".into(),
        }
    );
    let err = builder.entity("Post").unwrap().has_many("Comments").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::MemberNotFound { .. }));
}

#[test]
fn relationship_builders_outlive_the_entity_builder() {
    let mut builder = ModelBuilder::new(catalog());
    let reference = builder.entity("Post").unwrap().has_one("Blog").unwrap();
    let fk = reference.with_many(Some("Posts")).unwrap();

    let many = builder
        .entity("Blog")
        .unwrap()
        .has_many("Tags")
        .unwrap()
        .with_many("Blogs")
        .unwrap();
    let tags = many.left_skip_navigation();
    let mut join = many.using_entity(JoinEntity::shape("PropertyBag").named("BlogTags")).unwrap();
    join.indexer_property("Since", ScalarType::DateTime).unwrap();
    let join = join.id();

    let model = builder.finalize_model().unwrap();
    assert_eq!(model.join_entity_type(tags), Some(join));
    assert!(model.find_property(join, "Since").is_some());
    assert_eq!(model.foreign_key(fk).unwrap().principal, model.find_entity_type("Blog").unwrap());
}

#[test]
fn unnamed_left_side_is_a_missing_inverse() {
    let mut builder = ModelBuilder::new(catalog());
    let err = builder
        .entity("Blog")
        .unwrap()
        .has_many_to("Tag")
        .unwrap()
        .with_many("Blogs")
        .unwrap_err();
    assert_eq!(
        err.kind,
        ErrorKind::MissingInverseManyToManyNavigation {
            left: "Blog".into(),
            right: "Tag".into(),
        }
    );
}

#[test]
fn ignoring_a_skip_navigation_removes_the_relationship() {
    let mut builder = ModelBuilder::new(catalog());
    let blog = builder.entity("Blog").unwrap().ignore("Tags").unwrap().id();

    let model = builder.model();
    assert!(model.skip_navigations_of(blog).is_empty());
    assert_eq!(model.skip_navigations().count(), 0);
    assert!(model.find_entity_type("BlogTag").is_none());

    let model = builder.finalize_model().unwrap();
    assert_eq!(model.skip_navigations().count(), 0);
}

#[test]
fn access_mode_needs_a_navigation() {
    let mut builder = ModelBuilder::new(catalog());
    let err = builder
        .entity("Blog")
        .unwrap()
        .navigation("Comments")
        .use_property_access_mode(PropertyAccessMode::Field)
        .unwrap_err();
    assert_eq!(
        err.kind,
        ErrorKind::NavigationNotFound {
            entity: "Blog".into(),
            navigation: "Comments".into(),
        }
    );
}

#[test]
fn entity_access_mode_applies_to_its_skip_navigations() {
    let mut builder = ModelBuilder::new(catalog());
    builder
        .entity("Tag")
        .unwrap()
        .use_property_access_mode(PropertyAccessMode::FieldDuringConstruction)
        .unwrap();
    let model = builder.finalize_model().unwrap();

    let tag = model.find_entity_type("Tag").unwrap();
    let blogs = model.find_skip_navigation(tag, "Blogs").unwrap();
    assert_eq!(
        model.skip_navigation_access_mode(blogs),
        PropertyAccessMode::FieldDuringConstruction
    );
}

// =============================================================================
// Lifecycle
// =============================================================================

#[test]
fn builder_starts_building() {
    let builder = ModelBuilder::new(catalog());
    assert_eq!(builder.state(), BuildState::Building);
    assert!(!builder.is_finalized());
    assert!(builder.config().eager_discovery);
}

#[test]
fn finalized_builder_rejects_every_call() {
    let mut builder = ModelBuilder::new(catalog());
    builder.entity("Blog").unwrap();
    builder.finalize_model().unwrap();
    assert!(builder.is_finalized());

    let err = builder.entity("Tag").map(|_| ()).unwrap_err();
    assert_eq!(err.kind, ErrorKind::ModelFinalized);
    let err = builder.ignore("Post").map(|_| ()).unwrap_err();
    assert_eq!(err.kind, ErrorKind::ModelFinalized);
    let err = builder.shared_type("Post").map(|_| ()).unwrap_err();
    assert_eq!(err.kind, ErrorKind::ModelFinalized);
    let err = builder.ignore_entity("Blog").map(|_| ()).unwrap_err();
    assert_eq!(err.kind, ErrorKind::ModelFinalized);
}

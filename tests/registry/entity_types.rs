//! Integration tests for entity types, properties and keys

use skipnav_foundation::{ErrorKind, ScalarType, ShapeId};
use skipnav_registry::PropertyFlags;

use crate::{CONVENTION, EXPLICIT, fixture};

// =============================================================================
// Entity Types
// =============================================================================

#[test]
fn find_or_create_by_shape_is_idempotent() {
    let mut f = fixture();
    let shape = f.model.catalog().lookup("Blog").unwrap();
    let again = f
        .model
        .find_or_create_entity_type(shape, None, CONVENTION)
        .unwrap();
    assert_eq!(again, f.blog);
    assert_eq!(f.model.entity_type_count(), 2);
}

#[test]
fn shared_shape_identity_is_shape_and_name() {
    let mut f = fixture();
    let bag = ShapeId::PROPERTY_BAG;
    let one = f.model.find_or_create_entity_type(bag, Some("Shared1"), EXPLICIT).unwrap();
    let two = f.model.find_or_create_entity_type(bag, Some("Shared2"), EXPLICIT).unwrap();
    assert_ne!(one, two);
    assert_eq!(f.model.find_shared_entity_type(bag, "Shared1"), Some(one));
    assert_eq!(
        f.model.find_or_create_entity_type(bag, Some("Shared1"), CONVENTION).unwrap(),
        one
    );

    let err = f.model.find_or_create_entity_type(bag, None, EXPLICIT).unwrap_err();
    assert_eq!(err.kind, ErrorKind::ClashingSharedType("PropertyBag".into()));
}

#[test]
fn named_use_of_ordinary_shape_fails() {
    let mut f = fixture();
    let shape = f.model.catalog().lookup("Post").unwrap();
    let err = f
        .model
        .find_or_create_entity_type(shape, Some("Named"), EXPLICIT)
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::TypeNotMarkedAsShared("Post".into()));
}

#[test]
fn marking_a_used_shape_shared_fails() {
    let mut f = fixture();
    let shape = f.model.catalog().lookup("Blog").unwrap();
    let err = f.model.mark_shape_shared(shape).unwrap_err();
    assert_eq!(err.kind, ErrorKind::ClashingSharedType("Blog".into()));
}

#[test]
fn ignoring_a_shape_removes_its_entity_type() {
    let mut f = fixture();
    let shape = f.model.catalog().lookup("Tag").unwrap();
    f.model.ignore_shape(shape).unwrap();
    assert!(f.model.entity_type(f.tag).is_none());
    assert!(f.model.find_entity_type("Tag").is_none());
    assert!(f.model.is_shape_ignored(shape));

    let err = f.model.add_property(f.tag, "Id", ScalarType::Int, PropertyFlags::MEMBER, EXPLICIT).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::StaleHandle(_)));
}

// =============================================================================
// Properties and Keys
// =============================================================================

#[test]
fn explicit_property_update_wins() {
    let mut f = fixture();
    let id = f.model.find_property(f.blog, "Id").unwrap();
    f.model
        .add_property(f.blog, "Id", ScalarType::Guid, PropertyFlags::MEMBER, CONVENTION)
        .unwrap();
    assert_eq!(f.model.property(id).unwrap().ty, ScalarType::Int);

    let again = f
        .model
        .add_property(f.blog, "Id", ScalarType::Guid, PropertyFlags::MEMBER, EXPLICIT)
        .unwrap();
    assert_eq!(again, id);
    assert_eq!(f.model.property(id).unwrap().ty, ScalarType::Guid);
}

#[test]
fn convention_key_does_not_replace_explicit_key() {
    let mut f = fixture();
    let code = f
        .model
        .add_property(f.blog, "Code", ScalarType::String, PropertyFlags::SHADOW, EXPLICIT)
        .unwrap();
    let explicit = f.model.set_primary_key(f.blog, &[code], EXPLICIT).unwrap();

    let id = f.model.find_property(f.blog, "Id").unwrap();
    let kept = f.model.set_primary_key(f.blog, &[id], CONVENTION).unwrap();
    assert_eq!(kept, explicit);
    assert_eq!(f.model.property_names(f.model.primary_key_properties(f.blog)), vec!["Code"]);
}

#[test]
fn key_properties_must_belong_to_the_entity_type() {
    let mut f = fixture();
    let tag_id = f.model.find_property(f.tag, "Id").unwrap();
    let err = f.model.set_primary_key(f.blog, &[tag_id], EXPLICIT).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::PropertyNotFound { .. }));
}

#[test]
fn indexer_properties_need_a_property_bag() {
    let mut f = fixture();
    let err = f
        .model
        .add_indexer_property(f.blog, "Payload", ScalarType::Int, EXPLICIT)
        .unwrap_err();
    assert_eq!(
        err.kind,
        ErrorKind::InvalidIndexerProperty {
            entity: "Blog".into(),
            property: "Payload".into(),
        }
    );
}

// =============================================================================
// Finalization
// =============================================================================

#[test]
fn finalized_model_is_read_only_but_queryable() {
    let mut f = fixture();
    f.model.mark_finalized();

    let shape = f.model.catalog().lookup("Post").unwrap();
    let err = f.model.find_or_create_entity_type(shape, None, EXPLICIT).unwrap_err();
    assert_eq!(err.kind, ErrorKind::ModelFinalized);
    let err = f.model.ignore_entity_name("Blog").unwrap_err();
    assert_eq!(err.kind, ErrorKind::ModelFinalized);

    assert_eq!(f.model.find_entity_type("Blog"), Some(f.blog));
}

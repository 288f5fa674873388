//! Several join entity types backed by one shared shape

use skipnav::builder::{JoinEntity, ModelBuilder};
use skipnav::foundation::{ErrorKind, ScalarType, ShapeCatalog, ShapeId};

use crate::builder;

fn catalog() -> ShapeCatalog {
    let mut catalog = ShapeCatalog::new();
    for (name, other) in [("A", "B"), ("B", "A"), ("C", "D"), ("D", "C")] {
        catalog
            .define(name)
            .scalar("Id", ScalarType::Int)
            .collection(&format!("{other}s"), other);
    }
    catalog.define("SharedJoin").scalar("Payload", ScalarType::String);
    catalog
}

fn relate(builder: &mut ModelBuilder, left: &str, right: &str, join: JoinEntity) {
    builder
        .entity(left)
        .unwrap()
        .has_many(&format!("{right}s"))
        .unwrap()
        .with_many(&format!("{left}s"))
        .unwrap()
        .using_entity(join)
        .unwrap();
}

#[test]
fn one_shape_backs_two_named_joins() {
    let mut builder = builder(catalog());
    builder.shared_type("SharedJoin").unwrap();
    relate(&mut builder, "A", "B", JoinEntity::shape("SharedJoin").named("Shared1"));
    relate(&mut builder, "C", "D", JoinEntity::shape("SharedJoin").named("Shared2"));

    let err = builder.entity("SharedJoin").unwrap_err();
    assert_eq!(err.kind, ErrorKind::ClashingSharedType("SharedJoin".into()));

    let model = builder.finalize_model().unwrap();
    let shape = model.catalog().lookup("SharedJoin").unwrap();
    let shared1 = model.find_shared_entity_type(shape, "Shared1").unwrap();
    let shared2 = model.find_shared_entity_type(shape, "Shared2").unwrap();
    assert_ne!(shared1, shared2);
    assert_eq!(model.find_entity_type("Shared1"), Some(shared1));
    assert_eq!(model.find_entity_type_by_shape(shape), None);

    for (join, left, right) in [(shared1, "A", "B"), (shared2, "C", "D")] {
        let fks = model.foreign_keys_of(join);
        assert_eq!(fks.len(), 2);
        let principals: Vec<&str> = fks
            .iter()
            .map(|&fk| model.entity_type_name(model.foreign_key(fk).unwrap().principal))
            .collect();
        assert_eq!(principals, vec![left, right]);
    }
    assert!(model.find_entity_type("AB").is_none());
    assert!(model.find_entity_type("CD").is_none());
}

#[test]
fn property_bag_joins_with_payload() {
    let mut builder = builder(catalog());
    let bag = |name: &str| {
        JoinEntity::shape("PropertyBag")
            .named(name)
            .with_indexer_property("Payload", ScalarType::String)
    };
    relate(&mut builder, "A", "B", bag("Shared1"));
    relate(&mut builder, "C", "D", bag("Shared2"));

    let err = builder.entity("PropertyBag").unwrap_err();
    assert_eq!(err.kind, ErrorKind::ClashingSharedType("PropertyBag".into()));

    let model = builder.finalize_model().unwrap();
    for name in ["Shared1", "Shared2"] {
        let join = model
            .find_shared_entity_type(ShapeId::PROPERTY_BAG, name)
            .unwrap();
        let payload = model.find_property(join, "Payload").unwrap();
        assert!(model.property(payload).unwrap().is_indexer());
        assert_eq!(model.foreign_keys_of(join).len(), 2);
        assert!(!model.entity_type(join).unwrap().is_implicitly_created_join_entity_type());
    }
}

#[test]
fn declared_shared_entity_can_be_used_as_join() {
    let mut builder = builder(catalog());
    let declared = builder
        .shared_type_entity("JoinAB", "SharedJoin")
        .unwrap()
        .property("Payload")
        .unwrap()
        .id();
    relate(&mut builder, "A", "B", JoinEntity::shape("SharedJoin").named("JoinAB"));

    let model = builder.finalize_model().unwrap();
    let a = model.find_entity_type("A").unwrap();
    let bs = model.find_skip_navigation(a, "Bs").unwrap();
    assert_eq!(model.join_entity_type(bs), Some(declared));
    assert!(model.find_property(declared, "Payload").is_some());
}

#[test]
fn named_join_cannot_serve_two_pairs() {
    let mut builder = builder(catalog());
    builder.shared_type("SharedJoin").unwrap();
    relate(&mut builder, "A", "B", JoinEntity::shape("SharedJoin").named("Shared1"));

    let err = builder
        .entity("C")
        .unwrap()
        .has_many("Ds")
        .unwrap()
        .with_many("Cs")
        .unwrap()
        .using_entity(JoinEntity::shape("SharedJoin").named("Shared1"))
        .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::InvalidJoinEntity { .. }));
}

#[test]
fn unnamed_join_cannot_serve_two_pairs() {
    let mut catalog = catalog();
    catalog.define("Link").scalar("Id", ScalarType::Int);
    let mut builder = builder(catalog);
    relate(&mut builder, "A", "B", JoinEntity::shape("Link"));

    let err = builder
        .entity("C")
        .unwrap()
        .has_many("Ds")
        .unwrap()
        .with_many("Cs")
        .unwrap()
        .using_entity(JoinEntity::shape("Link"))
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::ClashingSharedType("Link".into()));
}

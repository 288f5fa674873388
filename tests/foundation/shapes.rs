//! Integration tests for the shape catalog

use skipnav_foundation::{MemberKind, ScalarType, ShapeCatalog, ShapeId};

fn catalog() -> ShapeCatalog {
    let mut catalog = ShapeCatalog::new();
    catalog
        .define("Category")
        .scalar("Id", ScalarType::Int)
        .collection("Products", "Product")
        .collection("ProductCategories", "ProductCategory");
    catalog
        .define("Product")
        .scalar("Id", ScalarType::Int)
        .collection("Categories", "Category");
    catalog
}

#[test]
fn property_bag_is_reserved() {
    let catalog = ShapeCatalog::new();
    assert!(catalog.is_empty());
    assert_eq!(catalog.lookup("PropertyBag"), Some(ShapeId::PROPERTY_BAG));
    assert!(catalog.is_property_bag(ShapeId::PROPERTY_BAG));
}

#[test]
fn forward_targets_are_interned() {
    let catalog = catalog();
    let join = catalog.lookup("ProductCategory").unwrap();
    assert!(catalog.get(join).unwrap().members().is_empty());
    assert_eq!(catalog.len(), 4);
}

#[test]
fn members_keep_declaration_order() {
    let catalog = catalog();
    let category = catalog.lookup("Category").unwrap();
    let names: Vec<&str> = catalog
        .get(category)
        .unwrap()
        .members()
        .iter()
        .map(|m| m.name.as_str())
        .collect();
    assert_eq!(names, vec!["Id", "Products", "ProductCategories"]);
}

#[test]
fn collections_of_filters_by_target() {
    let catalog = catalog();
    let category = catalog.lookup("Category").unwrap();
    let product = catalog.lookup("Product").unwrap();
    let found: Vec<&str> = catalog
        .get(category)
        .unwrap()
        .collections_of(product)
        .map(|m| m.name.as_str())
        .collect();
    assert_eq!(found, vec!["Products"]);
}

#[test]
fn redefining_a_member_replaces_it() {
    let mut catalog = catalog();
    catalog.define("Product").scalar("Id", ScalarType::Guid);
    let product = catalog.lookup("Product").unwrap();
    assert_eq!(
        catalog.member(product, "Id").map(|m| m.kind),
        Some(MemberKind::Scalar(ScalarType::Guid))
    );
}

#[test]
fn member_kind_queries() {
    let target = ShapeCatalog::new().lookup("PropertyBag").unwrap();
    assert!(MemberKind::Collection(target).is_collection());
    assert!(MemberKind::Reference(target).is_navigation());
    assert_eq!(MemberKind::Scalar(ScalarType::Int).target(), None);
}

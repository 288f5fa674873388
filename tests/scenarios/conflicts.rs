//! Many-to-many declarations that clash with one-to-many relationships

use skipnav::builder::ModelBuilder;
use skipnav::foundation::{Error, ErrorKind, PropertyAccessMode, ScalarType, ShapeCatalog};

use crate::builder;

fn catalog() -> ShapeCatalog {
    let mut catalog = ShapeCatalog::new();
    catalog
        .define("ManyToManyNavPrincipal")
        .scalar("Id", ScalarType::Int)
        .collection("Dependents", "NavDependent");
    catalog
        .define("NavDependent")
        .scalar("Id", ScalarType::Int)
        .scalar("ManyToManyNavPrincipalId", ScalarType::Int)
        .reference("OneToManyPrincipal", "ManyToManyNavPrincipal")
        .collection("ManyToManyPrincipals", "ManyToManyNavPrincipal");
    catalog
}

fn one_to_many(builder: &mut ModelBuilder) -> Result<(), Error> {
    builder
        .entity("ManyToManyNavPrincipal")?
        .has_many("Dependents")?
        .with_one(Some("OneToManyPrincipal"))?;
    Ok(())
}

fn many_to_many_from_left(builder: &mut ModelBuilder) -> Result<(), Error> {
    builder
        .entity("ManyToManyNavPrincipal")?
        .has_many("Dependents")?
        .with_many("ManyToManyPrincipals")?;
    Ok(())
}

fn many_to_many_from_right(builder: &mut ModelBuilder) -> Result<(), Error> {
    builder
        .entity("NavDependent")?
        .has_many("ManyToManyPrincipals")?
        .with_many("Dependents")?;
    Ok(())
}

const EXPECTED: &str = "the navigations 'ManyToManyNavPrincipal.Dependents' and \
    'NavDependent.ManyToManyPrincipals' cannot form a many-to-many relationship while \
    'ManyToManyNavPrincipal.Dependents' participates in a relationship with \
    'NavDependent.OneToManyPrincipal'; a navigation can only participate in a single relationship";

#[test]
fn conflict_message_is_the_same_in_every_order() {
    type Step = fn(&mut ModelBuilder) -> Result<(), Error>;
    let orders: [(Step, Step); 4] = [
        (one_to_many, many_to_many_from_left),
        (one_to_many, many_to_many_from_right),
        (many_to_many_from_left, one_to_many),
        (many_to_many_from_right, one_to_many),
    ];

    for (first, second) in orders {
        let mut builder = builder(catalog());
        first(&mut builder).unwrap();
        let err = second(&mut builder).unwrap_err();
        assert!(matches!(
            err.kind,
            ErrorKind::ConflictingRelationshipNavigation { .. }
        ));
        assert_eq!(err.to_string(), EXPECTED);
    }
}

#[test]
fn conflict_leaves_the_first_relationship_intact() {
    let mut builder = builder(catalog());
    many_to_many_from_left(&mut builder).unwrap();
    let before = builder.model().skip_navigations().count();
    one_to_many(&mut builder).unwrap_err();

    let model = builder.model();
    assert_eq!(model.skip_navigations().count(), before);
    let dependent = model.find_entity_type("NavDependent").unwrap();
    assert!(model.find_navigation(dependent, "OneToManyPrincipal").is_none());
}

#[test]
fn one_to_many_takes_over_a_discovered_pair() {
    let mut builder = builder(catalog());
    builder.entity("ManyToManyNavPrincipal").unwrap();
    assert_eq!(builder.model().skip_navigations().count(), 2);

    one_to_many(&mut builder).unwrap();
    let model = builder.finalize_model().unwrap();
    assert_eq!(model.skip_navigations().count(), 0);
    let principal = model.find_entity_type("ManyToManyNavPrincipal").unwrap();
    assert!(model.find_navigation(principal, "Dependents").is_some());
}

#[test]
fn single_navigation_is_a_missing_inverse() {
    let mut builder = builder(catalog());
    let err = builder
        .entity("ManyToManyNavPrincipal")
        .unwrap()
        .has_many("Dependents")
        .unwrap()
        .with_many_unnamed()
        .unwrap_err();
    assert_eq!(
        err.kind,
        ErrorKind::MissingInverseManyToManyNavigation {
            left: "ManyToManyNavPrincipal".into(),
            right: "NavDependent".into(),
        }
    );
}

#[test]
fn access_modes_survive_finalization() {
    let mut builder = builder(catalog());
    many_to_many_from_left(&mut builder).unwrap();
    builder
        .entity("ManyToManyNavPrincipal")
        .unwrap()
        .navigation("Dependents")
        .use_property_access_mode(PropertyAccessMode::Field)
        .unwrap();
    builder
        .entity("NavDependent")
        .unwrap()
        .navigation("ManyToManyPrincipals")
        .use_property_access_mode(PropertyAccessMode::Property)
        .unwrap();

    let model = builder.finalize_model().unwrap();
    let principal = model.find_entity_type("ManyToManyNavPrincipal").unwrap();
    let dependent = model.find_entity_type("NavDependent").unwrap();
    let dependents = model.find_skip_navigation(principal, "Dependents").unwrap();
    let principals = model.find_skip_navigation(dependent, "ManyToManyPrincipals").unwrap();
    assert_eq!(model.skip_navigation_access_mode(dependents), PropertyAccessMode::Field);
    assert_eq!(model.skip_navigation_access_mode(principals), PropertyAccessMode::Property);
    assert_eq!(
        model.skip_navigation(dependents).unwrap().access_mode,
        Some(PropertyAccessMode::Field)
    );
}

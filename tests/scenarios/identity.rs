//! Handle identity across re-declaration and finalization

use skipnav::builder::ModelBuilder;
use skipnav::foundation::{ErrorKind, ScalarType, ShapeCatalog, SkipNavigationId};

use crate::builder;

fn catalog() -> ShapeCatalog {
    let mut catalog = ShapeCatalog::new();
    catalog
        .define("Student")
        .scalar("Id", ScalarType::Int)
        .collection("Courses", "Course");
    catalog
        .define("Course")
        .scalar("Id", ScalarType::Int)
        .collection("Students", "Student");
    catalog
}

fn declare(builder: &mut ModelBuilder) -> (SkipNavigationId, SkipNavigationId) {
    let many = builder
        .entity("Student")
        .unwrap()
        .has_many("Courses")
        .unwrap()
        .with_many("Students")
        .unwrap();
    (many.left_skip_navigation(), many.right_skip_navigation())
}

#[test]
fn redeclaring_returns_the_same_handles() {
    let mut builder = builder(catalog());
    let first = declare(&mut builder);
    let join = builder.model().join_entity_type(first.0).unwrap();
    let fks = builder.model().foreign_keys_of(join);

    let second = declare(&mut builder);
    assert_eq!(first, second);
    assert_eq!(builder.model().join_entity_type(second.0), Some(join));
    assert_eq!(builder.model().foreign_keys_of(join), fks);
}

#[test]
fn handles_survive_finalization() {
    let mut builder = builder(catalog());
    let (courses, students) = declare(&mut builder);
    let join = builder.model().join_entity_type(courses).unwrap();
    let fks = builder.model().foreign_keys_of(join);

    let model = builder.finalize_model().unwrap();
    let student = model.find_entity_type("Student").unwrap();
    assert_eq!(model.find_skip_navigation(student, "Courses"), Some(courses));
    assert_eq!(model.skip_navigation(courses).unwrap().inverse, Some(students));
    assert_eq!(model.join_entity_type(students), Some(join));

    let meta = model.entity_type(join).unwrap();
    assert_eq!(model.foreign_keys_of(join), fks);
    assert_eq!(fks.len(), 2);
    assert_ne!(meta.first_foreign_key(), meta.last_foreign_key());
    assert_eq!(meta.first_foreign_key(), Some(fks[0]));
    assert_eq!(meta.last_foreign_key(), Some(fks[1]));
}

#[test]
fn second_finalization_is_a_no_op() {
    let mut builder = builder(catalog());
    declare(&mut builder);
    let before = builder.finalize_model().unwrap().clone();
    let after = builder.finalize_model().unwrap();

    assert_eq!(after.entity_type_count(), before.entity_type_count());
    let ids: Vec<_> = after.skip_navigations().map(|(id, _)| id).collect();
    let expected: Vec<_> = before.skip_navigations().map(|(id, _)| id).collect();
    assert_eq!(ids, expected);
}

#[test]
fn finalized_model_rejects_mutation() {
    let mut builder = builder(catalog());
    declare(&mut builder);
    builder.finalize_model().unwrap();

    let err = builder.entity("Course").unwrap_err();
    assert_eq!(err.kind, ErrorKind::ModelFinalized);
    let err = builder.ignore("Course").unwrap_err();
    assert_eq!(err.kind, ErrorKind::ModelFinalized);
    assert!(builder.is_finalized());
}

#[test]
fn failed_call_leaves_handles_in_place() {
    let mut builder = builder(catalog());
    let (courses, students) = declare(&mut builder);
    let join = builder.model().join_entity_type(courses).unwrap();
    let logged = builder.log().len();

    let err = builder
        .entity("Course")
        .unwrap()
        .has_many("Students")
        .unwrap()
        .with_many("Nope")
        .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::MemberNotFound { .. }));

    let model = builder.model();
    assert_eq!(builder.log().len(), logged + 1);
    assert_eq!(model.skip_navigation(courses).unwrap().inverse, Some(students));
    assert_eq!(model.join_entity_type(courses), Some(join));
    assert_eq!(model.foreign_keys_of(join).len(), 2);
}

#[test]
fn ignoring_a_side_removes_the_implicit_join() {
    let mut builder = builder(catalog());
    let (courses, _) = declare(&mut builder);
    let join = builder.model().join_entity_type(courses).unwrap();

    builder.entity("Student").unwrap().ignore("Courses").unwrap();
    let model = builder.finalize_model().unwrap();
    assert!(model.entity_type(join).is_none());
    assert!(model.find_entity_type("CourseStudent").is_none());
    assert_eq!(model.skip_navigations().count(), 0);
}

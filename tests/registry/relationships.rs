//! Integration tests for foreign keys, navigations and skip navigations

use skipnav_foundation::{ErrorKind, PropertyAccessMode, ScalarType};
use skipnav_registry::PropertyFlags;

use crate::{CONVENTION, EXPLICIT, fixture, wire};

// =============================================================================
// Foreign Key Order
// =============================================================================

#[test]
fn join_foreign_keys_keep_declaration_order() {
    let mut f = fixture();
    let w = wire(&mut f);
    let join = f.model.entity_type(w.join).unwrap();

    assert_eq!(f.model.foreign_keys_of(w.join), vec![w.left_fk, w.right_fk]);
    assert_eq!(join.first_foreign_key(), Some(w.left_fk));
    assert_eq!(join.last_foreign_key(), Some(w.right_fk));
    assert_eq!(
        join.foreign_keys_most_recent_first().collect::<Vec<_>>(),
        vec![w.right_fk, w.left_fk]
    );
    assert!(join.is_implicitly_created_join_entity_type());
}

#[test]
fn identical_foreign_key_is_reused() {
    let mut f = fixture();
    let w = wire(&mut f);
    let properties: Vec<_> = f.model.foreign_key(w.left_fk).unwrap().properties.iter().copied().collect();
    let again = f.model.add_foreign_key(w.join, &properties, f.blog, EXPLICIT).unwrap();
    assert_eq!(again, w.left_fk);
    assert_eq!(f.model.foreign_key(w.left_fk).unwrap().source, EXPLICIT);
}

#[test]
fn principal_needs_a_primary_key() {
    let mut f = fixture();
    let shape = f.model.catalog().lookup("Post").unwrap();
    let post = f.model.find_or_create_entity_type(shape, None, EXPLICIT).unwrap();
    let blog_id = f
        .model
        .add_property(post, "BlogId", ScalarType::Int, PropertyFlags::MEMBER, EXPLICIT)
        .unwrap();
    let err = f.model.add_foreign_key(f.blog, &[], post, EXPLICIT).unwrap_err();
    assert_eq!(err.kind, ErrorKind::MissingPrimaryKey("Post".into()));

    let fk = f.model.add_foreign_key(post, &[blog_id], f.blog, EXPLICIT).unwrap();
    assert!(f.model.foreign_key(fk).unwrap().is_unnavigated());
}

// =============================================================================
// Navigations
// =============================================================================

#[test]
fn navigations_fill_foreign_key_slots() {
    let mut f = fixture();
    let shape = f.model.catalog().lookup("Post").unwrap();
    let post = f.model.find_or_create_entity_type(shape, None, EXPLICIT).unwrap();
    let blog_id = f
        .model
        .add_property(post, "BlogId", ScalarType::Int, PropertyFlags::MEMBER, EXPLICIT)
        .unwrap();
    let fk = f.model.add_foreign_key(post, &[blog_id], f.blog, EXPLICIT).unwrap();

    let reference = f.model.add_navigation(post, "Blog", fk, true, EXPLICIT).unwrap();
    let collection = f.model.add_navigation(f.blog, "Posts", fk, false, EXPLICIT).unwrap();
    let fk_meta = f.model.foreign_key(fk).unwrap();
    assert_eq!(fk_meta.dependent_to_principal, Some(reference));
    assert_eq!(fk_meta.principal_to_dependent, Some(collection));
    assert!(f.model.navigation(collection).unwrap().is_collection);

    let err = f.model.add_navigation(f.blog, "Wrong", fk, true, EXPLICIT).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::Internal(_)));

    f.model.remove_navigation(reference).unwrap();
    assert_eq!(f.model.foreign_key(fk).unwrap().dependent_to_principal, None);
}

// =============================================================================
// Skip Navigations
// =============================================================================

#[test]
fn skip_navigations_are_symmetric() {
    let mut f = fixture();
    let w = wire(&mut f);
    assert_eq!(f.model.skip_navigation(w.tags).unwrap().inverse, Some(w.blogs));
    assert_eq!(f.model.skip_navigation(w.blogs).unwrap().inverse, Some(w.tags));
    assert_eq!(f.model.join_entity_type(w.tags), Some(w.join));
    assert_eq!(f.model.join_entity_type(w.blogs), Some(w.join));
    assert_eq!(f.model.qualified_name(f.blog, "Tags"), "Blog.Tags");
}

#[test]
fn skip_navigation_foreign_key_must_point_back() {
    let mut f = fixture();
    let w = wire(&mut f);
    let err = f
        .model
        .set_skip_navigation_foreign_key(w.tags, Some(w.right_fk))
        .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::InvalidJoinEntity { .. }));
}

#[test]
fn same_name_different_target_is_rejected() {
    let mut f = fixture();
    wire(&mut f);
    let err = f
        .model
        .add_skip_navigation(f.blog, "Tags", f.blog, CONVENTION)
        .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::NavigationTargetMismatch { .. }));
}

#[test]
fn access_modes_resolve_member_then_entity_then_model() {
    let mut f = fixture();
    let w = wire(&mut f);
    f.model.set_default_access_mode(PropertyAccessMode::PreferProperty).unwrap();
    assert_eq!(f.model.skip_navigation_access_mode(w.tags), PropertyAccessMode::PreferProperty);

    f.model.set_entity_type_access_mode(f.blog, PropertyAccessMode::Field).unwrap();
    assert_eq!(f.model.skip_navigation_access_mode(w.tags), PropertyAccessMode::Field);

    f.model.set_skip_navigation_access_mode(w.tags, PropertyAccessMode::Property).unwrap();
    assert_eq!(f.model.skip_navigation_access_mode(w.tags), PropertyAccessMode::Property);
    assert_eq!(f.model.skip_navigation_access_mode(w.blogs), PropertyAccessMode::PreferProperty);
}

// =============================================================================
// Cascading Removal
// =============================================================================

#[test]
fn removing_either_side_removes_the_implicit_join() {
    for remove_blog in [true, false] {
        let mut f = fixture();
        let w = wire(&mut f);
        let removed = if remove_blog { f.blog } else { f.tag };
        f.model.remove_entity_type(removed).unwrap();

        assert!(f.model.entity_type(w.join).is_none());
        assert!(f.model.find_entity_type("BlogTag").is_none());
        assert!(f.model.skip_navigation(w.tags).is_none());
        assert!(f.model.skip_navigation(w.blogs).is_none());
        assert!(f.model.foreign_key(w.left_fk).is_none());
        assert!(f.model.foreign_key(w.right_fk).is_none());
    }
}

#[test]
fn ignoring_one_side_removes_the_pair() {
    let mut f = fixture();
    let w = wire(&mut f);
    f.model.ignore_member(f.tag, "Blogs").unwrap();

    assert!(f.model.skip_navigation(w.tags).is_none());
    assert!(f.model.skip_navigation(w.blogs).is_none());
    assert!(f.model.entity_type(w.join).is_none());
    assert!(f.model.is_member_ignored(f.tag, "Blogs"));
    assert!(!f.model.is_member_ignored(f.blog, "Tags"));
}

#[test]
fn orphan_check_keeps_a_wired_join() {
    let mut f = fixture();
    let w = wire(&mut f);
    assert!(!f.model.remove_orphaned_join(w.join).unwrap());
    assert!(f.model.entity_type(w.join).is_some());
}

#[test]
fn removing_a_join_foreign_key_removes_the_orphaned_join() {
    let mut f = fixture();
    let w = wire(&mut f);
    f.model.remove_foreign_key(w.left_fk).unwrap();

    assert!(f.model.entity_type(w.join).is_none());
    assert!(f.model.skip_navigation(w.tags).is_none());
    assert!(f.model.skip_navigation(w.blogs).is_none());
    assert!(f.model.foreign_key(w.right_fk).is_none());
}

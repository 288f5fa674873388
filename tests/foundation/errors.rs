//! Integration tests for Error types
//!
//! Tests error construction, display, context, and error kinds.

use skipnav_foundation::{EntityTypeId, Error, ErrorContext, ErrorKind};

// =============================================================================
// Error Construction
// =============================================================================

#[test]
fn error_conflicting_navigation() {
    let err = Error::conflicting_navigation(
        "ManyToManyNavPrincipal.Dependents",
        "NavDependent.ManyToManyPrincipals",
        "ManyToManyNavPrincipal.Dependents",
        "NavDependent",
    );
    assert!(matches!(err.kind, ErrorKind::ConflictingRelationshipNavigation { .. }));
    let msg = format!("{err}");
    assert!(msg.contains("'ManyToManyNavPrincipal.Dependents'"));
    assert!(msg.contains("'NavDependent.ManyToManyPrincipals'"));
    assert!(msg.contains("'NavDependent'"));
}

#[test]
fn error_missing_inverse() {
    let err = Error::missing_inverse("ManyToManyNavPrincipal", "NavDependent");
    assert_eq!(
        err.kind,
        ErrorKind::MissingInverseManyToManyNavigation {
            left: "ManyToManyNavPrincipal".into(),
            right: "NavDependent".into(),
        }
    );
    let msg = format!("{err}");
    assert!(msg.contains("'ManyToManyNavPrincipal' and 'NavDependent'"));
}

#[test]
fn error_shared_type_kinds() {
    let clashing = Error::clashing_shared_type("PropertyBag");
    assert_eq!(clashing.kind, ErrorKind::ClashingSharedType("PropertyBag".into()));
    assert!(clashing.to_string().contains("'PropertyBag'"));

    let unshared = Error::not_marked_as_shared("ManyToManyJoinWithFields");
    assert_eq!(
        unshared.kind,
        ErrorKind::TypeNotMarkedAsShared("ManyToManyJoinWithFields".into())
    );
    assert!(unshared.to_string().contains("'ManyToManyJoinWithFields'"));
}

#[test]
fn error_stale_handle() {
    let err = Error::stale_handle(EntityTypeId::new(5, 2));
    assert!(matches!(err.kind, ErrorKind::StaleHandle(_)));
    let msg = format!("{err}");
    assert!(msg.contains("5"));
}

// =============================================================================
// Error Display
// =============================================================================

#[test]
fn error_display_ignores_context() {
    let plain = Error::model_finalized();
    let with_context = Error::model_finalized()
        .with_context(ErrorContext::new().with_call("entity(Blog)").with_frame("finalize_model"));
    assert_eq!(plain.to_string(), with_context.to_string());
}

#[test]
fn error_display_member_not_found() {
    let err = Error::member_not_found("Blog", "Tags");
    let msg = format!("{err}");
    assert!(msg.contains("Blog"));
    assert!(msg.contains("Tags"));
}

// =============================================================================
// Error Context
// =============================================================================

#[test]
fn context_keeps_first_call_and_appends_frames() {
    let err = Error::internal("boom")
        .with_context(ErrorContext::new().with_call("Blog.has_key(Id)"))
        .with_context(ErrorContext::new().with_call("ignored").with_frame("finalize_model"));
    let context = err.context.unwrap();
    assert_eq!(context.call.as_deref(), Some("Blog.has_key(Id)"));
    assert_eq!(context.stack, vec!["finalize_model".to_string()]);
    assert_eq!(context.to_string(), "in Blog.has_key(Id)\n  during finalize_model\n");
}

#[test]
fn error_kinds_compare_by_value() {
    assert_eq!(
        Error::entity_type_not_found("Blog").kind,
        ErrorKind::EntityTypeNotFound("Blog".into())
    );
    assert_ne!(
        Error::entity_type_not_found("Blog").kind,
        ErrorKind::EntityTypeNotFound("Tag".into())
    );
}

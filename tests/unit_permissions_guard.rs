mod common;

use std::sync::Arc;

use uuid::Uuid;

use common::{InMemoryStore, role_context};
use schoolyard::middleware::permissions::{GuardError, PermissionsGuard};
use schoolyard::utils::errors::AuthzError;

fn setup(granted: &[&str]) -> (PermissionsGuard, Arc<InMemoryStore>, Uuid) {
    let store = Arc::new(InMemoryStore::new());
    let role_id = Uuid::new_v4();
    store.grant(role_id, granted);
    let guard = PermissionsGuard::new(store.clone());
    (guard, store, role_id)
}

#[tokio::test]
async fn empty_requirement_always_passes() {
    let (guard, store, role_id) = setup(&[]);
    let ctx = role_context(Uuid::new_v4(), Some(Uuid::new_v4()), role_id);

    assert!(guard.check(&[], Some(&ctx)).await.is_ok());
    assert!(guard.check(&[], None).await.is_ok());
    // No lookup happens for unguarded routes.
    assert_eq!(store.lookup_count(), 0);
}

#[tokio::test]
async fn missing_context_fails_regardless_of_metadata() {
    let (guard, _, _) = setup(&["grades.view", "grades.edit"]);

    for required in [&["grades.view"][..], &["grades.view", "grades.edit"][..]] {
        let err = guard.check(required, None).await.unwrap_err();
        assert!(matches!(
            err,
            GuardError::Denied(AuthzError::IdentityUnresolved)
        ));
    }
}

#[tokio::test]
async fn granted_superset_passes() {
    let (guard, _, role_id) = setup(&["grades.view", "grades.edit"]);
    let ctx = role_context(Uuid::new_v4(), Some(Uuid::new_v4()), role_id);

    assert!(guard.check(&["grades.view"], Some(&ctx)).await.is_ok());
    assert!(guard.check(&["grades.edit"], Some(&ctx)).await.is_ok());
    assert!(
        guard
            .check(&["grades.view", "grades.edit"], Some(&ctx))
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn partial_grant_fails() {
    let (guard, _, role_id) = setup(&["grades.view"]);
    let ctx = role_context(Uuid::new_v4(), Some(Uuid::new_v4()), role_id);

    let err = guard
        .check(&["grades.view", "grades.edit"], Some(&ctx))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        GuardError::Denied(AuthzError::InsufficientPermissions)
    ));
}

#[tokio::test]
async fn teacher_scenario() {
    // Role "teacher" granted {grades.view, grades.edit}: editing passes,
    // deleting does not.
    let (guard, _, teacher_role) = setup(&["grades.view", "grades.edit"]);
    let ctx = role_context(Uuid::new_v4(), Some(Uuid::new_v4()), teacher_role);

    assert!(guard.check(&["grades.edit"], Some(&ctx)).await.is_ok());

    let err = guard.check(&["grades.delete"], Some(&ctx)).await.unwrap_err();
    assert!(matches!(
        err,
        GuardError::Denied(AuthzError::InsufficientPermissions)
    ));
}

#[tokio::test]
async fn grants_are_scoped_per_tenant_role() {
    // The same user holds a permissive role in school 1 and a bare role in
    // school 2. Acting in school 2 must not borrow school 1's grants.
    let store = Arc::new(InMemoryStore::new());
    let guard = PermissionsGuard::new(store.clone());

    let user_id = Uuid::new_v4();
    let school_1 = Uuid::new_v4();
    let school_2 = Uuid::new_v4();
    let role_in_school_1 = Uuid::new_v4();
    let role_in_school_2 = Uuid::new_v4();
    store.grant(role_in_school_1, &["grades.edit"]);
    store.grant(role_in_school_2, &[]);

    let ctx_1 = role_context(user_id, Some(school_1), role_in_school_1);
    assert!(guard.check(&["grades.edit"], Some(&ctx_1)).await.is_ok());

    let ctx_2 = role_context(user_id, Some(school_2), role_in_school_2);
    let err = guard.check(&["grades.edit"], Some(&ctx_2)).await.unwrap_err();
    assert!(matches!(
        err,
        GuardError::Denied(AuthzError::InsufficientPermissions)
    ));
}

#[tokio::test]
async fn deactivated_role_fails_closed() {
    let (guard, store, role_id) = setup(&["grades.view"]);
    let ctx = role_context(Uuid::new_v4(), Some(Uuid::new_v4()), role_id);

    assert!(guard.check(&["grades.view"], Some(&ctx)).await.is_ok());

    store.deactivate_role(role_id);
    let err = guard.check(&["grades.view"], Some(&ctx)).await.unwrap_err();
    assert!(matches!(
        err,
        GuardError::Denied(AuthzError::InsufficientPermissions)
    ));
}

#[tokio::test]
async fn evaluation_is_idempotent() {
    let (guard, store, role_id) = setup(&["grades.view"]);
    let ctx = role_context(Uuid::new_v4(), Some(Uuid::new_v4()), role_id);

    let first = guard.check(&["grades.view"], Some(&ctx)).await.is_ok();
    let second = guard.check(&["grades.view"], Some(&ctx)).await.is_ok();
    assert_eq!(first, second);
    assert!(first);

    let first = guard.check(&["grades.delete"], Some(&ctx)).await.is_err();
    let second = guard.check(&["grades.delete"], Some(&ctx)).await.is_err();
    assert_eq!(first, second);
    assert!(first);

    // One read per evaluation, nothing else.
    assert_eq!(store.lookup_count(), 4);
}

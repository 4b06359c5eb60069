//! Inspector name picklist integration tests

mod common;

use app_lib::app::{
    inspector_name_create, inspector_name_delete, inspector_name_list, inspector_name_update,
    security_check_create, InspectorNameCreateReq, InspectorNameUpdateReq,
};
use app_lib::domain::Role;
use app_lib::infra::db::init_test_db;
use common::{admin, check_req, make_inspector, make_user};

fn named(name: &str) -> InspectorNameCreateReq {
    InspectorNameCreateReq {
        name: name.to_string(),
    }
}

#[test]
fn create_collapses_whitespace() {
    let pool = init_test_db();
    let root = admin(&pool);
    let dto = inspector_name_create(&pool, &root, named("  Ana   Maria  Ruiz ")).unwrap();
    assert_eq!(dto.name, "Ana Maria Ruiz");
    assert!(dto.is_active);
}

#[test]
fn names_are_unique_ignoring_case() {
    let pool = init_test_db();
    let root = admin(&pool);
    inspector_name_create(&pool, &root, named("Carlos Diaz")).unwrap();
    let err = inspector_name_create(&pool, &root, named("carlos diaz")).unwrap_err();
    assert_eq!(err.code(), "CONFLICT");

    let err = inspector_name_create(&pool, &root, named("   ")).unwrap_err();
    assert_eq!(err.code(), "VALIDATION_ERROR");
}

#[test]
fn accented_names_are_unique_ignoring_case() {
    let pool = init_test_db();
    let root = admin(&pool);
    inspector_name_create(&pool, &root, named("Ángel Núñez")).unwrap();
    let err = inspector_name_create(&pool, &root, named("ángel núñez")).unwrap_err();
    assert_eq!(err.code(), "CONFLICT");

    let other = make_inspector(&pool, &root, "Óscar");
    let err = inspector_name_update(
        &pool,
        &root,
        &other,
        InspectorNameUpdateReq {
            name: Some("ÁNGEL NÚÑEZ".into()),
            is_active: None,
        },
    )
    .unwrap_err();
    assert_eq!(err.code(), "CONFLICT");
    assert_eq!(inspector_name_list(&pool, &root, false).unwrap().len(), 2);
}

#[test]
fn only_admins_edit_but_everyone_reads() {
    let pool = init_test_db();
    let root = admin(&pool);
    let checker = make_user(&pool, &root, "checker", Role::Checker);
    make_inspector(&pool, &root, "Beatriz");

    let err = inspector_name_create(&pool, &checker, named("Sneaky")).unwrap_err();
    assert_eq!(err.code(), "FORBIDDEN");
    assert_eq!(inspector_name_list(&pool, &checker, true).unwrap().len(), 1);
}

#[test]
fn deactivated_names_leave_the_active_list() {
    let pool = init_test_db();
    let root = admin(&pool);
    let a = make_inspector(&pool, &root, "Alpha");
    make_inspector(&pool, &root, "bravo");

    let updated = inspector_name_update(
        &pool,
        &root,
        &a,
        InspectorNameUpdateReq {
            name: None,
            is_active: Some(false),
        },
    )
    .unwrap();
    assert!(!updated.is_active);
    assert_eq!(updated.name, "Alpha");

    let active = inspector_name_list(&pool, &root, true).unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].name, "bravo");
    let all = inspector_name_list(&pool, &root, false).unwrap();
    assert_eq!(
        all.iter().map(|i| i.name.as_str()).collect::<Vec<_>>(),
        vec!["Alpha", "bravo"]
    );
}

#[test]
fn inactive_name_cannot_be_used_for_new_checks() {
    let pool = init_test_db();
    let root = admin(&pool);
    let officer = make_user(&pool, &root, "guard", Role::Security);
    let id = make_inspector(&pool, &root, "Retired");
    inspector_name_update(
        &pool,
        &root,
        &id,
        InspectorNameUpdateReq {
            name: None,
            is_active: Some(false),
        },
    )
    .unwrap();

    let err = security_check_create(&pool, &officer, check_req(&id, "CSQU3054383")).unwrap_err();
    assert_eq!(err.code(), "VALIDATION_ERROR");
}

#[test]
fn rename_conflicts_with_existing_name() {
    let pool = init_test_db();
    let root = admin(&pool);
    make_inspector(&pool, &root, "Delta");
    let e = make_inspector(&pool, &root, "Echo");
    let err = inspector_name_update(
        &pool,
        &root,
        &e,
        InspectorNameUpdateReq {
            name: Some("DELTA".to_string()),
            is_active: None,
        },
    )
    .unwrap_err();
    assert_eq!(err.code(), "CONFLICT");
}

#[test]
fn referenced_name_cannot_be_deleted() {
    let pool = init_test_db();
    let root = admin(&pool);
    let officer = make_user(&pool, &root, "guard", Role::Security);
    let used = make_inspector(&pool, &root, "Used");
    let unused = make_inspector(&pool, &root, "Unused");
    security_check_create(&pool, &officer, check_req(&used, "CSQU3054383")).unwrap();

    assert_eq!(
        inspector_name_delete(&pool, &root, &used).unwrap_err().code(),
        "CONFLICT"
    );
    inspector_name_delete(&pool, &root, &unused).unwrap();
    assert_eq!(
        inspector_name_delete(&pool, &root, &unused).unwrap_err().code(),
        "NOT_FOUND"
    );
}

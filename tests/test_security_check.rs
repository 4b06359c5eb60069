//! Security check lifecycle integration tests

mod common;

use app_lib::app::{
    checker_data_create, report_generate, security_check_create, security_check_delete, security_check_get,
    security_check_list, security_check_update, ReportFilter, SecurityCheckListReq,
    SecurityCheckUpdateReq,
};
use app_lib::domain::{CheckerVerdict, ChecklistResult, InspectionStatus, Role, CHECKLIST};
use app_lib::infra::db::init_test_db;
use app_lib::infra::MemoryPhotoStore;
use common::{
    admin, all_pass, check_req, checker_req, make_inspector, make_user, record_check,
    with_failures,
};

#[test]
fn create_normalizes_and_starts_pending() {
    let pool = init_test_db();
    let root = admin(&pool);
    let officer = make_user(&pool, &root, "guard", Role::Security);
    let inspector = make_inspector(&pool, &root, "Maria");

    let mut req = check_req(&inspector, " csqu 305438-3 ");
    req.seal_number = " sl-77 ".to_string();
    req.responses = with_failures(&["TIRES", "DOORS"]);
    let check = security_check_create(&pool, &officer, req).unwrap();

    assert_eq!(check.container_number, "CSQU3054383");
    assert_eq!(check.seal_number, "SL-77");
    assert_eq!(check.truck_plate, "ABC 123");
    assert_eq!(check.status, InspectionStatus::Pending);
    assert_eq!(check.created_by, officer.id);
    assert_eq!(check.inspector_name, "Maria");
    assert!(check.checker_data.is_none());

    assert_eq!(check.responses.len(), CHECKLIST.len());
    assert_eq!(check.responses[0].item_code, CHECKLIST[0].code);
    let failed: Vec<&str> = check
        .responses
        .iter()
        .filter(|r| r.result == ChecklistResult::Fail)
        .map(|r| r.item_code.as_str())
        .collect();
    assert_eq!(failed, vec!["TIRES", "DOORS"]);
}

#[test]
fn bad_check_digit_is_rejected() {
    let pool = init_test_db();
    let root = admin(&pool);
    let inspector = make_inspector(&pool, &root, "Maria");
    let err = security_check_create(&pool, &root, check_req(&inspector, "CSQU3054384")).unwrap_err();
    assert_eq!(err.code(), "VALIDATION_ERROR");
    assert!(err.to_string().contains("check digit"));
}

#[test]
fn incomplete_checklist_is_rejected() {
    let pool = init_test_db();
    let root = admin(&pool);
    let inspector = make_inspector(&pool, &root, "Maria");

    let mut req = check_req(&inspector, "CSQU3054383");
    req.responses.pop();
    let err = security_check_create(&pool, &root, req).unwrap_err();
    assert_eq!(err.code(), "VALIDATION_ERROR");

    let mut req = check_req(&inspector, "CSQU3054383");
    req.responses[0].result = ChecklistResult::Fail;
    req.responses[0].note = Some("   ".to_string());
    let err = security_check_create(&pool, &root, req).unwrap_err();
    assert_eq!(err.code(), "VALIDATION_ERROR");
}

#[test]
fn checkers_cannot_record_security_checks() {
    let pool = init_test_db();
    let root = admin(&pool);
    let checker = make_user(&pool, &root, "checker", Role::Checker);
    let inspector = make_inspector(&pool, &root, "Maria");
    let err = security_check_create(&pool, &checker, check_req(&inspector, "CSQU3054383")).unwrap_err();
    assert_eq!(err.code(), "FORBIDDEN");
}

#[test]
fn inspected_at_is_normalized_to_utc() {
    let pool = init_test_db();
    let root = admin(&pool);
    let inspector = make_inspector(&pool, &root, "Maria");
    let mut req = check_req(&inspector, "CSQU3054383");
    req.inspected_at = Some("2024-06-01T07:15:00-05:00".to_string());
    let check = security_check_create(&pool, &root, req).unwrap();
    assert_eq!(check.inspected_at, "2024-06-01T12:15:00.000Z");
}

#[test]
fn officers_only_see_their_own_checks() {
    let pool = init_test_db();
    let root = admin(&pool);
    let alice = make_user(&pool, &root, "alice", Role::Security);
    let bob = make_user(&pool, &root, "bob", Role::Security);
    let checker = make_user(&pool, &root, "checker", Role::Checker);
    let inspector = make_inspector(&pool, &root, "Maria");

    let mine = record_check(&pool, &alice, &inspector, "CSQU3054383");
    record_check(&pool, &bob, &inspector, "MSKU9070323");

    let page = security_check_list(&pool, &alice, SecurityCheckListReq::default()).unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].id, mine.id);

    let err = security_check_get(&pool, &bob, &mine.id).unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");

    assert_eq!(
        security_check_list(&pool, &checker, SecurityCheckListReq::default())
            .unwrap()
            .total,
        2
    );
    assert!(security_check_get(&pool, &checker, &mine.id).is_ok());
}

#[test]
fn list_filters_and_pages() {
    let pool = init_test_db();
    let root = admin(&pool);
    let maria = make_inspector(&pool, &root, "Maria");
    let jose = make_inspector(&pool, &root, "Jose");

    for (container, inspector, day) in [
        ("CSQU3054383", &maria, "2024-05-01T10:00:00Z"),
        ("MSKU9070323", &maria, "2024-05-02T10:00:00Z"),
        ("TGHU1234567", &jose, "2024-05-03T23:59:59Z"),
    ] {
        let mut req = check_req(inspector, container);
        req.inspected_at = Some(day.to_string());
        security_check_create(&pool, &root, req).unwrap();
    }

    let by_container = security_check_list(
        &pool,
        &root,
        SecurityCheckListReq {
            container: Some("msku 907".to_string()),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(by_container.total, 1);
    assert_eq!(by_container.items[0].container_number, "MSKU9070323");

    let by_inspector = security_check_list(
        &pool,
        &root,
        SecurityCheckListReq {
            inspector_name_ids: Some(vec![jose.clone()]),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(by_inspector.total, 1);

    let by_dates = security_check_list(
        &pool,
        &root,
        SecurityCheckListReq {
            from: Some("2024-05-02".to_string()),
            to: Some("2024-05-03".to_string()),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(by_dates.total, 2);
    // newest first
    assert_eq!(by_dates.items[0].container_number, "TGHU1234567");

    let page = security_check_list(
        &pool,
        &root,
        SecurityCheckListReq {
            limit: Some(2),
            offset: Some(2),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].container_number, "CSQU3054383");

    let err = security_check_list(
        &pool,
        &root,
        SecurityCheckListReq {
            status: Some("DONE".to_string()),
            ..Default::default()
        },
    )
    .unwrap_err();
    assert_eq!(err.code(), "VALIDATION_ERROR");
}

#[test]
fn container_filter_treats_wildcards_literally() {
    let pool = init_test_db();
    let root = admin(&pool);
    let maria = make_inspector(&pool, &root, "Maria");
    record_check(&pool, &root, &maria, "CSQU3054383");

    for query in ["CS_U", "CS%U", "%"] {
        let listed = security_check_list(
            &pool,
            &root,
            SecurityCheckListReq {
                container: Some(query.to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        let reported = report_generate(
            &pool,
            &root,
            ReportFilter {
                container: Some(query.to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(listed.total, 0, "query {}", query);
        assert_eq!(reported.totals.total, 0, "query {}", query);
    }

    let listed = security_check_list(
        &pool,
        &root,
        SecurityCheckListReq {
            container: Some("squ30".to_string()),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(listed.total, 1);
}

#[test]
fn update_replaces_fields_and_checklist() {
    let pool = init_test_db();
    let root = admin(&pool);
    let officer = make_user(&pool, &root, "guard", Role::Security);
    let inspector = make_inspector(&pool, &root, "Maria");
    let check = record_check(&pool, &officer, &inspector, "CSQU3054383");

    let updated = security_check_update(
        &pool,
        &officer,
        &check.id,
        SecurityCheckUpdateReq {
            seal_number: Some("sl-2002".to_string()),
            responses: Some(with_failures(&["FLOOR"])),
            remarks: Some("  floor patched ".to_string()),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(updated.seal_number, "SL-2002");
    assert_eq!(updated.container_number, "CSQU3054383");
    assert_eq!(updated.remarks, "floor patched");
    assert_eq!(updated.responses.len(), CHECKLIST.len());
    assert_eq!(
        updated
            .responses
            .iter()
            .filter(|r| r.result == ChecklistResult::Fail)
            .count(),
        1
    );
}

#[test]
fn another_officer_cannot_edit() {
    let pool = init_test_db();
    let root = admin(&pool);
    let alice = make_user(&pool, &root, "alice", Role::Security);
    let checker = make_user(&pool, &root, "checker", Role::Checker);
    let inspector = make_inspector(&pool, &root, "Maria");
    let check = record_check(&pool, &alice, &inspector, "CSQU3054383");

    let err = security_check_update(&pool, &checker, &check.id, SecurityCheckUpdateReq::default())
        .unwrap_err();
    assert_eq!(err.code(), "FORBIDDEN");
}

#[test]
fn checked_checks_are_locked_even_for_admins() {
    let pool = init_test_db();
    let root = admin(&pool);
    let officer = make_user(&pool, &root, "guard", Role::Security);
    let checker = make_user(&pool, &root, "checker", Role::Checker);
    let inspector = make_inspector(&pool, &root, "Maria");
    let check = record_check(&pool, &officer, &inspector, "CSQU3054383");
    checker_data_create(
        &pool,
        &checker,
        &check.id,
        checker_req(&inspector, "SL-1001", CheckerVerdict::Approved),
    )
    .unwrap();

    for actor in [&officer, &root] {
        let err = security_check_update(
            &pool,
            actor,
            &check.id,
            SecurityCheckUpdateReq {
                responses: Some(all_pass()),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert_eq!(err.code(), "CHECK_LOCKED");
    }
}

#[tokio::test]
async fn delete_is_admin_only_and_cascades() {
    let pool = init_test_db();
    let store = MemoryPhotoStore::new();
    let root = admin(&pool);
    let officer = make_user(&pool, &root, "guard", Role::Security);
    let checker = make_user(&pool, &root, "checker", Role::Checker);
    let inspector = make_inspector(&pool, &root, "Maria");
    let check = record_check(&pool, &officer, &inspector, "CSQU3054383");
    checker_data_create(
        &pool,
        &checker,
        &check.id,
        checker_req(&inspector, "SL-1001", CheckerVerdict::Approved),
    )
    .unwrap();

    let err = security_check_delete(&pool, &store, &officer, &check.id)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "FORBIDDEN");

    let outcome = security_check_delete(&pool, &store, &root, &check.id)
        .await
        .unwrap();
    assert_eq!(outcome.photos_removed, 0);
    assert_eq!(
        security_check_get(&pool, &root, &check.id).unwrap_err().code(),
        "NOT_FOUND"
    );
    assert_eq!(
        security_check_list(&pool, &root, SecurityCheckListReq::default())
            .unwrap()
            .total,
        0
    );
}

//! Checker data integration tests

mod common;

use app_lib::app::{
    checker_data_create, checker_data_get, checker_data_update, security_check_get,
    CheckerDataUpdateReq,
};
use app_lib::domain::{CheckerVerdict, ChecklistResult, InspectionStatus, Role};
use app_lib::infra::db::init_test_db;
use common::{admin, checker_req, make_inspector, make_user, record_check, with_failures};

#[test]
fn approving_closes_the_check() {
    let pool = init_test_db();
    let root = admin(&pool);
    let officer = make_user(&pool, &root, "guard", Role::Security);
    let checker = make_user(&pool, &root, "checker", Role::Checker);
    let inspector = make_inspector(&pool, &root, "Maria");
    let check = record_check(&pool, &officer, &inspector, "CSQU3054383");

    let data = checker_data_create(
        &pool,
        &checker,
        &check.id,
        checker_req(&inspector, " sl-1001 ", CheckerVerdict::Approved),
    )
    .unwrap();
    assert!(data.seal_matches);
    assert_eq!(data.seal_number_observed, "SL-1001");
    assert_eq!(data.checker_id, checker.id);
    assert_eq!(data.verdict, CheckerVerdict::Approved);
    assert_eq!(data.responses.len(), 17);

    let detail = security_check_get(&pool, &officer, &check.id).unwrap();
    assert_eq!(detail.status, InspectionStatus::Checked);
    assert_eq!(detail.checker_data.unwrap().id, data.id);
    // the officer's own checklist is untouched
    assert_eq!(detail.responses.len(), 17);
}

#[test]
fn seal_mismatch_is_recorded() {
    let pool = init_test_db();
    let root = admin(&pool);
    let checker = make_user(&pool, &root, "checker", Role::Checker);
    let inspector = make_inspector(&pool, &root, "Maria");
    let check = record_check(&pool, &root, &inspector, "CSQU3054383");

    let data = checker_data_create(
        &pool,
        &checker,
        &check.id,
        checker_req(&inspector, "SL-9999", CheckerVerdict::Rejected),
    )
    .unwrap();
    assert!(!data.seal_matches);
    assert_eq!(data.verdict, CheckerVerdict::Rejected);
}

#[test]
fn second_checker_gets_already_checked() {
    let pool = init_test_db();
    let root = admin(&pool);
    let first = make_user(&pool, &root, "first", Role::Checker);
    let second = make_user(&pool, &root, "second", Role::Checker);
    let inspector = make_inspector(&pool, &root, "Maria");
    let check = record_check(&pool, &root, &inspector, "CSQU3054383");

    checker_data_create(
        &pool,
        &first,
        &check.id,
        checker_req(&inspector, "SL-1001", CheckerVerdict::Approved),
    )
    .unwrap();
    let err = checker_data_create(
        &pool,
        &second,
        &check.id,
        checker_req(&inspector, "SL-1001", CheckerVerdict::Approved),
    )
    .unwrap_err();
    assert_eq!(err.code(), "ALREADY_CHECKED");
}

#[test]
fn rejection_needs_remarks() {
    let pool = init_test_db();
    let root = admin(&pool);
    let checker = make_user(&pool, &root, "checker", Role::Checker);
    let inspector = make_inspector(&pool, &root, "Maria");
    let check = record_check(&pool, &root, &inspector, "CSQU3054383");

    let mut req = checker_req(&inspector, "SL-1001", CheckerVerdict::Rejected);
    req.remarks = Some("  ".to_string());
    let err = checker_data_create(&pool, &checker, &check.id, req).unwrap_err();
    assert_eq!(err.code(), "VALIDATION_ERROR");

    // nothing was written
    let detail = security_check_get(&pool, &root, &check.id).unwrap();
    assert_eq!(detail.status, InspectionStatus::Pending);
}

#[test]
fn security_officers_cannot_record_checker_data() {
    let pool = init_test_db();
    let root = admin(&pool);
    let officer = make_user(&pool, &root, "guard", Role::Security);
    let inspector = make_inspector(&pool, &root, "Maria");
    let check = record_check(&pool, &officer, &inspector, "CSQU3054383");

    let err = checker_data_create(
        &pool,
        &officer,
        &check.id,
        checker_req(&inspector, "SL-1001", CheckerVerdict::Approved),
    )
    .unwrap_err();
    assert_eq!(err.code(), "FORBIDDEN");
}

#[test]
fn missing_check_is_not_found() {
    let pool = init_test_db();
    let root = admin(&pool);
    let inspector = make_inspector(&pool, &root, "Maria");
    let err = checker_data_create(
        &pool,
        &root,
        "no-such-check",
        checker_req(&inspector, "SL-1001", CheckerVerdict::Approved),
    )
    .unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");
    assert_eq!(
        checker_data_get(&pool, &root, "no-such-check").unwrap_err().code(),
        "NOT_FOUND"
    );
}

#[test]
fn update_recomputes_seal_match_and_checklist() {
    let pool = init_test_db();
    let root = admin(&pool);
    let checker = make_user(&pool, &root, "checker", Role::Checker);
    let other = make_user(&pool, &root, "other", Role::Checker);
    let inspector = make_inspector(&pool, &root, "Maria");
    let check = record_check(&pool, &root, &inspector, "CSQU3054383");
    checker_data_create(
        &pool,
        &checker,
        &check.id,
        checker_req(&inspector, "SL-1001", CheckerVerdict::Approved),
    )
    .unwrap();

    let err = checker_data_update(&pool, &other, &check.id, CheckerDataUpdateReq::default())
        .unwrap_err();
    assert_eq!(err.code(), "FORBIDDEN");

    let updated = checker_data_update(
        &pool,
        &checker,
        &check.id,
        CheckerDataUpdateReq {
            seal_number_observed: Some("SL-1002".to_string()),
            responses: Some(with_failures(&["EXHAUST"])),
            verdict: Some(CheckerVerdict::Rejected),
            remarks: Some("exhaust hides a compartment".to_string()),
            ..Default::default()
        },
    )
    .unwrap();
    assert!(!updated.seal_matches);
    assert_eq!(updated.verdict, CheckerVerdict::Rejected);
    let failed: Vec<_> = updated
        .responses
        .iter()
        .filter(|r| r.result == ChecklistResult::Fail)
        .map(|r| r.item_code.clone())
        .collect();
    assert_eq!(failed, vec!["EXHAUST".to_string()]);

    // switching to a rejection without remarks is refused
    let err = checker_data_update(
        &pool,
        &root,
        &check.id,
        CheckerDataUpdateReq {
            remarks: Some(String::new()),
            ..Default::default()
        },
    )
    .unwrap_err();
    assert_eq!(err.code(), "VALIDATION_ERROR");
}

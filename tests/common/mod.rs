//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use app_lib::app::{
    bootstrap_admin, inspector_name_create, security_check_create, user_create,
    CheckerDataCreateReq, CurrentUser, InspectorNameCreateReq, SecurityCheckCreateReq,
    SecurityCheckDetailDto, UserCreateReq,
};
use app_lib::domain::{CheckerVerdict, ChecklistResponseInput, ChecklistResult, Role, CHECKLIST};
use app_lib::infra::DbPool;

pub const PASSWORD: &str = "correct-horse-1";

pub fn admin(pool: &DbPool) -> CurrentUser {
    let dto = bootstrap_admin(pool, "admin", PASSWORD)
        .unwrap()
        .expect("fresh db bootstraps an admin");
    CurrentUser::from(&dto)
}

pub fn make_user(pool: &DbPool, admin: &CurrentUser, username: &str, role: Role) -> CurrentUser {
    let dto = user_create(
        pool,
        admin,
        UserCreateReq {
            username: username.to_string(),
            display_name: format!("{} user", username),
            role,
            password: PASSWORD.to_string(),
        },
    )
    .unwrap();
    CurrentUser::from(&dto)
}

pub fn make_inspector(pool: &DbPool, admin: &CurrentUser, name: &str) -> String {
    inspector_name_create(
        pool,
        admin,
        InspectorNameCreateReq {
            name: name.to_string(),
        },
    )
    .unwrap()
    .id
}

pub fn all_pass() -> Vec<ChecklistResponseInput> {
    CHECKLIST
        .iter()
        .map(|item| ChecklistResponseInput {
            item_code: item.code.to_string(),
            result: ChecklistResult::Pass,
            note: None,
        })
        .collect()
}

/// Every item passes except `failed`, which fail with a note.
pub fn with_failures(failed: &[&str]) -> Vec<ChecklistResponseInput> {
    all_pass()
        .into_iter()
        .map(|mut r| {
            if failed.contains(&r.item_code.as_str()) {
                r.result = ChecklistResult::Fail;
                r.note = Some(format!("{} damaged", r.item_code));
            }
            r
        })
        .collect()
}

pub fn check_req(inspector_id: &str, container: &str) -> SecurityCheckCreateReq {
    SecurityCheckCreateReq {
        container_number: container.to_string(),
        seal_number: "SL-1001".to_string(),
        truck_plate: "abc 123".to_string(),
        driver_name: "Juan Perez".to_string(),
        inspector_name_id: inspector_id.to_string(),
        responses: all_pass(),
        remarks: None,
        inspected_at: None,
    }
}

pub fn checker_req(inspector_id: &str, seal: &str, verdict: CheckerVerdict) -> CheckerDataCreateReq {
    CheckerDataCreateReq {
        inspector_name_id: inspector_id.to_string(),
        seal_number_observed: seal.to_string(),
        responses: all_pass(),
        verdict,
        remarks: match verdict {
            CheckerVerdict::Rejected => Some("seal tampered".to_string()),
            CheckerVerdict::Approved => None,
        },
    }
}

pub fn record_check(
    pool: &DbPool,
    officer: &CurrentUser,
    inspector_id: &str,
    container: &str,
) -> SecurityCheckDetailDto {
    security_check_create(pool, officer, check_req(inspector_id, container)).unwrap()
}

//! Login, session resolution and password change.

mod common;

use app_lib::app::{
    auth_change_password, auth_login, auth_logout, auth_resolve, bootstrap_admin, user_update,
    ChangePasswordReq, LoginReq, UserUpdateReq,
};
use app_lib::domain::Role;
use app_lib::infra::db::{get_connection, init_test_db};
use common::{admin, make_user, PASSWORD};

fn login(username: &str, password: &str) -> LoginReq {
    LoginReq {
        username: username.to_string(),
        password: password.to_string(),
    }
}

#[test]
fn bootstrap_only_runs_on_empty_db() {
    let pool = init_test_db();
    let first = bootstrap_admin(&pool, "Admin", PASSWORD).unwrap().unwrap();
    assert_eq!(first.username, "admin");
    assert_eq!(first.role, Role::Admin);

    assert!(bootstrap_admin(&pool, "other", PASSWORD).unwrap().is_none());
}

#[test]
fn login_then_resolve_session() {
    let pool = init_test_db();
    admin(&pool);

    let result = auth_login(&pool, login("  ADMIN ", PASSWORD), 12).unwrap();
    assert_eq!(result.user.username, "admin");
    assert!(result.token.len() >= 32);
    assert!(result.expires_at.ends_with('Z'));

    let me = auth_resolve(&pool, &result.token).unwrap();
    assert_eq!(me.id, result.user.id);
    assert!(me.is_admin());
}

#[test]
fn wrong_password_and_unknown_user_look_the_same() {
    let pool = init_test_db();
    admin(&pool);

    let bad_password = auth_login(&pool, login("admin", "nope-nope-nope"), 12).unwrap_err();
    let unknown = auth_login(&pool, login("ghost", PASSWORD), 12).unwrap_err();
    assert_eq!(bad_password.code(), "INVALID_CREDENTIALS");
    assert_eq!(unknown.code(), "INVALID_CREDENTIALS");
    assert_eq!(bad_password.to_string(), unknown.to_string());
}

#[test]
fn logout_invalidates_token_and_is_idempotent() {
    let pool = init_test_db();
    admin(&pool);
    let token = auth_login(&pool, login("admin", PASSWORD), 12).unwrap().token;

    auth_logout(&pool, &token).unwrap();
    assert_eq!(auth_resolve(&pool, &token).unwrap_err().code(), "UNAUTHORIZED");
    auth_logout(&pool, &token).unwrap();
}

#[test]
fn expired_session_is_rejected() {
    let pool = init_test_db();
    admin(&pool);
    let token = auth_login(&pool, login("admin", PASSWORD), -1).unwrap().token;
    assert_eq!(auth_resolve(&pool, &token).unwrap_err().code(), "UNAUTHORIZED");
}

#[test]
fn login_purges_expired_sessions() {
    let pool = init_test_db();
    admin(&pool);
    let stale = auth_login(&pool, login("admin", PASSWORD), -1).unwrap().token;
    let session_count = || -> i64 {
        get_connection(&pool)
            .query_row("SELECT COUNT(*) FROM sessions", [], |r| r.get(0))
            .unwrap()
    };
    assert_eq!(session_count(), 1);

    let fresh = auth_login(&pool, login("admin", PASSWORD), 12).unwrap().token;
    assert_eq!(session_count(), 1);
    assert!(auth_resolve(&pool, &fresh).is_ok());
    assert_eq!(auth_resolve(&pool, &stale).unwrap_err().code(), "UNAUTHORIZED");
}

#[test]
fn garbage_token_is_unauthorized() {
    let pool = init_test_db();
    assert_eq!(auth_resolve(&pool, "").unwrap_err().code(), "UNAUTHORIZED");
    assert_eq!(auth_resolve(&pool, "deadbeef").unwrap_err().code(), "UNAUTHORIZED");
}

#[test]
fn deactivated_user_loses_sessions_and_cannot_log_in() {
    let pool = init_test_db();
    let root = admin(&pool);
    let officer = make_user(&pool, &root, "guard", Role::Security);
    let token = auth_login(&pool, login("guard", PASSWORD), 12).unwrap().token;

    user_update(
        &pool,
        &root,
        &officer.id,
        UserUpdateReq {
            is_active: Some(false),
            ..Default::default()
        },
    )
    .unwrap();

    assert_eq!(auth_resolve(&pool, &token).unwrap_err().code(), "UNAUTHORIZED");
    assert_eq!(
        auth_login(&pool, login("guard", PASSWORD), 12).unwrap_err().code(),
        "INVALID_CREDENTIALS"
    );
}

#[test]
fn change_password_keeps_current_session_only() {
    let pool = init_test_db();
    let root = admin(&pool);
    let here = auth_login(&pool, login("admin", PASSWORD), 12).unwrap().token;
    let elsewhere = auth_login(&pool, login("admin", PASSWORD), 12).unwrap().token;

    auth_change_password(
        &pool,
        &root,
        Some(&here),
        ChangePasswordReq {
            current_password: PASSWORD.to_string(),
            new_password: "brand-new-secret".to_string(),
        },
    )
    .unwrap();

    assert!(auth_resolve(&pool, &here).is_ok());
    assert!(auth_resolve(&pool, &elsewhere).is_err());
    assert!(auth_login(&pool, login("admin", PASSWORD), 12).is_err());
    assert!(auth_login(&pool, login("admin", "brand-new-secret"), 12).is_ok());
}

#[test]
fn change_password_requires_current_password() {
    let pool = init_test_db();
    let root = admin(&pool);
    let err = auth_change_password(
        &pool,
        &root,
        None,
        ChangePasswordReq {
            current_password: "not-my-password".to_string(),
            new_password: "brand-new-secret".to_string(),
        },
    )
    .unwrap_err();
    assert_eq!(err.code(), "INVALID_CREDENTIALS");

    let err = auth_change_password(
        &pool,
        &root,
        None,
        ChangePasswordReq {
            current_password: PASSWORD.to_string(),
            new_password: "short".to_string(),
        },
    )
    .unwrap_err();
    assert_eq!(err.code(), "VALIDATION_ERROR");
}

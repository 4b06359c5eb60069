//! Authentication use cases: login, logout, session resolution, password change.

use crate::app::now_ts;
use crate::app::user::{load_user, UserDto};
use crate::domain::{Permission, Role};
use crate::error::AppError;
use crate::infra::password::{hash_password, validate_password, verify_password};
use crate::infra::{get_connection, DbPool};
use chrono::{Duration, SecondsFormat, Utc};
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// The authenticated caller every use case is evaluated against.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    pub id: String,
    pub username: String,
    pub display_name: String,
    pub role: Role,
}

impl CurrentUser {
    pub fn require(&self, permission: Permission) -> Result<(), AppError> {
        if self.role.allows(permission) {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "{} may not {}",
                self.role.as_str(),
                permission.as_str()
            )))
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<&UserDto> for CurrentUser {
    fn from(u: &UserDto) -> Self {
        Self {
            id: u.id.clone(),
            username: u.username.clone(),
            display_name: u.display_name.clone(),
            role: u.role,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginReq {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResult {
    /// Also set as the session cookie; Bearer clients keep it from here.
    pub token: String,
    pub user: UserDto,
    pub expires_at: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordReq {
    pub current_password: String,
    pub new_password: String,
}

fn token_hash(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

fn new_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

pub fn auth_login(pool: &DbPool, req: LoginReq, ttl_hours: i64) -> Result<LoginResult, AppError> {
    let username = req.username.trim().to_lowercase();
    if username.is_empty() || req.password.is_empty() {
        return Err(AppError::InvalidCredentials);
    }

    let conn = get_connection(pool);
    let found: Option<(String, String, bool)> = conn
        .query_row(
            "SELECT id, password_hash, is_active FROM users WHERE username = ?1",
            [&username],
            |r| Ok((r.get(0)?, r.get(1)?, r.get::<_, i32>(2)? != 0)),
        )
        .optional()?;

    let Some((user_id, phc, is_active)) = found else {
        log::info!("login rejected: unknown user {}", username);
        return Err(AppError::InvalidCredentials);
    };
    if !is_active || !verify_password(&req.password, &phc) {
        log::info!("login rejected for {}", username);
        return Err(AppError::InvalidCredentials);
    }

    let now = Utc::now();
    let now_s = now.to_rfc3339_opts(SecondsFormat::Millis, true);
    let expires_at = (now + Duration::hours(ttl_hours)).to_rfc3339_opts(SecondsFormat::Millis, true);
    let token = new_token();

    conn.execute("DELETE FROM sessions WHERE expires_at <= ?1", [&now_s])?;
    conn.execute(
        "INSERT INTO sessions (id, token_hash, user_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![Uuid::new_v4().to_string(), token_hash(&token), &user_id, &now_s, &expires_at],
    )?;

    let user = load_user(&conn, &user_id)?;
    log::info!("user {} logged in", user.username);
    Ok(LoginResult {
        token,
        user,
        expires_at,
    })
}

/// Idempotent: an unknown token is not an error.
pub fn auth_logout(pool: &DbPool, token: &str) -> Result<(), AppError> {
    let conn = get_connection(pool);
    conn.execute("DELETE FROM sessions WHERE token_hash = ?1", [token_hash(token)])?;
    Ok(())
}

pub fn auth_resolve(pool: &DbPool, token: &str) -> Result<CurrentUser, AppError> {
    if token.is_empty() {
        return Err(AppError::Unauthorized);
    }
    let conn = get_connection(pool);
    let row: Option<(String, String, String, String, bool)> = conn
        .query_row(
            "SELECT u.id, u.username, u.display_name, u.role, u.is_active
             FROM sessions s JOIN users u ON u.id = s.user_id
             WHERE s.token_hash = ?1 AND s.expires_at > ?2",
            params![token_hash(token), now_ts()],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get::<_, i32>(4)? != 0)),
        )
        .optional()?;

    match row {
        Some((id, username, display_name, role, true)) => Ok(CurrentUser {
            id,
            username,
            display_name,
            role: Role::from_str(&role)
                .ok_or_else(|| AppError::Db(format!("unknown role in users table: {}", role)))?,
        }),
        _ => Err(AppError::Unauthorized),
    }
}

/// Verifies the current password, stores the new one and signs out every other session.
pub fn auth_change_password(
    pool: &DbPool,
    actor: &CurrentUser,
    keep_token: Option<&str>,
    req: ChangePasswordReq,
) -> Result<(), AppError> {
    validate_password(&req.new_password)?;

    let conn = get_connection(pool);
    let phc: String = conn
        .query_row(
            "SELECT password_hash FROM users WHERE id = ?1",
            [&actor.id],
            |r| r.get(0),
        )
        .map_err(|_| AppError::NotFound(format!("user {}", actor.id)))?;
    if !verify_password(&req.current_password, &phc) {
        return Err(AppError::InvalidCredentials);
    }

    let new_hash = hash_password(&req.new_password)?;
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "UPDATE users SET password_hash = ?1, updated_at = ?2 WHERE id = ?3",
        params![new_hash, now_ts(), &actor.id],
    )?;
    match keep_token {
        Some(token) => tx.execute(
            "DELETE FROM sessions WHERE user_id = ?1 AND token_hash <> ?2",
            params![&actor.id, token_hash(token)],
        )?,
        None => tx.execute("DELETE FROM sessions WHERE user_id = ?1", [&actor.id])?,
    };
    tx.commit()?;
    log::info!("user {} changed their password", actor.username);
    Ok(())
}

/// Drop every session of a user (deactivation, password reset, deletion).
pub(crate) fn revoke_sessions(conn: &rusqlite::Connection, user_id: &str) -> Result<usize, AppError> {
    Ok(conn.execute("DELETE FROM sessions WHERE user_id = ?1", [user_id])?)
}

/// Create the first administrator. Does nothing once any user exists.
pub fn bootstrap_admin(
    pool: &DbPool,
    username: &str,
    password: &str,
) -> Result<Option<UserDto>, AppError> {
    {
        let conn = get_connection(pool);
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?;
        if count > 0 {
            return Ok(None);
        }
    } // release conn before insert_user takes it again

    let user = crate::app::user::insert_user(pool, username, "Administrator", Role::Admin, password)?;
    log::warn!("bootstrapped administrator account {}", user.username);
    Ok(Some(user))
}

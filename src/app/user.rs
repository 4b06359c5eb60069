//! User administration use cases.

use crate::app::auth::{revoke_sessions, CurrentUser};
use crate::app::now_ts;
use crate::domain::{Permission, Role};
use crate::error::AppError;
use crate::infra::password::{hash_password, validate_password};
use crate::infra::{get_connection, DbPool};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: String,
    pub username: String,
    pub display_name: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCreateReq {
    pub username: String,
    pub display_name: String,
    pub role: Role,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdateReq {
    pub display_name: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    /// Administrative reset; signs the user out everywhere.
    pub password: Option<String>,
}

const USER_COLUMNS: &str =
    "id, username, display_name, role, is_active, created_at, updated_at";

fn map_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserDto> {
    let role: String = row.get(3)?;
    Ok(UserDto {
        id: row.get(0)?,
        username: row.get(1)?,
        display_name: row.get(2)?,
        role: Role::from_str(&role).unwrap_or(Role::Security),
        is_active: row.get::<_, i32>(4)? != 0,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

pub(crate) fn load_user(conn: &Connection, id: &str) -> Result<UserDto, AppError> {
    conn.query_row(
        &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
        [id],
        map_user,
    )
    .map_err(|_| AppError::NotFound(format!("user {}", id)))
}

fn normalize_username(raw: &str) -> Result<String, AppError> {
    let username = raw.trim().to_lowercase();
    let len = username.chars().count();
    if !(3..=32).contains(&len) {
        return Err(AppError::Validation(
            "username must be 3-32 characters".into(),
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-'))
    {
        return Err(AppError::Validation(
            "username may only contain a-z, 0-9, '.', '_' and '-'".into(),
        ));
    }
    Ok(username)
}

fn normalize_display_name(raw: &str) -> Result<String, AppError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(AppError::Validation("display_name is required".into()));
    }
    if name.chars().count() > 80 {
        return Err(AppError::Validation(
            "display_name must be at most 80 characters".into(),
        ));
    }
    Ok(name.to_string())
}

/// Validate and insert without an authorization check (bootstrap and `user_create`).
pub(crate) fn insert_user(
    pool: &DbPool,
    username: &str,
    display_name: &str,
    role: Role,
    password: &str,
) -> Result<UserDto, AppError> {
    let username = normalize_username(username)?;
    let display_name = normalize_display_name(display_name)?;
    validate_password(password)?;
    let password_hash = hash_password(password)?;

    let id = Uuid::new_v4().to_string();
    let now = now_ts();

    let conn = get_connection(pool);
    let taken: i64 = conn.query_row(
        "SELECT COUNT(1) FROM users WHERE username = ?1",
        [&username],
        |r| r.get(0),
    )?;
    if taken > 0 {
        return Err(AppError::Conflict(format!("username {} is taken", username)));
    }

    conn.execute(
        "INSERT INTO users (id, username, display_name, password_hash, role, is_active, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6, ?6)",
        params![&id, &username, &display_name, password_hash, role.as_str(), &now],
    )?;

    Ok(UserDto {
        id,
        username,
        display_name,
        role,
        is_active: true,
        created_at: now.clone(),
        updated_at: now,
    })
}

pub fn user_create(
    pool: &DbPool,
    actor: &CurrentUser,
    req: UserCreateReq,
) -> Result<UserDto, AppError> {
    actor.require(Permission::ManageUsers)?;
    let user = insert_user(pool, &req.username, &req.display_name, req.role, &req.password)?;
    log::info!(
        "{} created user {} ({})",
        actor.username,
        user.username,
        user.role.as_str()
    );
    Ok(user)
}

pub fn user_list(
    pool: &DbPool,
    actor: &CurrentUser,
    only_active: bool,
) -> Result<Vec<UserDto>, AppError> {
    actor.require(Permission::ManageUsers)?;
    let conn = get_connection(pool);
    let sql = if only_active {
        format!(
            "SELECT {} FROM users WHERE is_active = 1 ORDER BY display_name COLLATE NOCASE",
            USER_COLUMNS
        )
    } else {
        format!(
            "SELECT {} FROM users ORDER BY display_name COLLATE NOCASE",
            USER_COLUMNS
        )
    };
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], map_user)?;
    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

pub fn user_get(pool: &DbPool, actor: &CurrentUser, id: &str) -> Result<UserDto, AppError> {
    if actor.id != id {
        actor.require(Permission::ManageUsers)?;
    }
    let conn = get_connection(pool);
    load_user(&conn, id)
}

fn other_active_admins(conn: &Connection, excluding: &str) -> Result<i64, AppError> {
    Ok(conn.query_row(
        "SELECT COUNT(1) FROM users WHERE role = 'ADMIN' AND is_active = 1 AND id <> ?1",
        [excluding],
        |r| r.get(0),
    )?)
}

pub fn user_update(
    pool: &DbPool,
    actor: &CurrentUser,
    id: &str,
    req: UserUpdateReq,
) -> Result<UserDto, AppError> {
    actor.require(Permission::ManageUsers)?;

    let display_name = req
        .display_name
        .as_deref()
        .map(normalize_display_name)
        .transpose()?;
    if let Some(ref password) = req.password {
        validate_password(password)?;
    }
    let password_hash = req.password.as_deref().map(hash_password).transpose()?;

    let conn = get_connection(pool);
    let current = load_user(&conn, id)?;

    let role = req.role.unwrap_or(current.role);
    let is_active = req.is_active.unwrap_or(current.is_active);

    let loses_admin = current.role == Role::Admin
        && current.is_active
        && (role != Role::Admin || !is_active);
    if loses_admin && other_active_admins(&conn, id)? == 0 {
        return Err(AppError::LastAdmin);
    }

    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "UPDATE users SET display_name = ?1, role = ?2, is_active = ?3, updated_at = ?4 WHERE id = ?5",
        params![
            display_name.unwrap_or(current.display_name),
            role.as_str(),
            is_active as i32,
            now_ts(),
            id
        ],
    )?;
    if let Some(hash) = password_hash {
        tx.execute(
            "UPDATE users SET password_hash = ?1 WHERE id = ?2",
            params![hash, id],
        )?;
        revoke_sessions(&tx, id)?;
    }
    if !is_active {
        revoke_sessions(&tx, id)?;
    }
    tx.commit()?;

    log::info!("{} updated user {}", actor.username, current.username);
    load_user(&conn, id)
}

/// Users referenced by inspection records are kept; deactivate them instead.
pub fn user_delete(pool: &DbPool, actor: &CurrentUser, id: &str) -> Result<(), AppError> {
    actor.require(Permission::ManageUsers)?;
    if actor.id == id {
        return Err(AppError::Conflict("cannot delete your own account".into()));
    }

    let conn = get_connection(pool);
    let target = load_user(&conn, id)?;
    if target.role == Role::Admin && target.is_active && other_active_admins(&conn, id)? == 0 {
        return Err(AppError::LastAdmin);
    }

    let references: i64 = conn.query_row(
        "SELECT (SELECT COUNT(1) FROM security_checks WHERE created_by = ?1)
              + (SELECT COUNT(1) FROM checker_data WHERE checker_id = ?1)
              + (SELECT COUNT(1) FROM photos WHERE uploaded_by = ?1)",
        [id],
        |r| r.get(0),
    )?;
    if references > 0 {
        return Err(AppError::Conflict(format!(
            "user {} has inspection records; deactivate instead",
            target.username
        )));
    }

    conn.execute("DELETE FROM users WHERE id = ?1", [id])?;
    log::info!("{} deleted user {}", actor.username, target.username);
    Ok(())
}

//! Inspector name picklist use cases.

use crate::app::auth::CurrentUser;
use crate::app::now_ts;
use crate::domain::Permission;
use crate::error::AppError;
use crate::infra::{get_connection, DbPool};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectorNameDto {
    pub id: String,
    pub name: String,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectorNameCreateReq {
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectorNameUpdateReq {
    pub name: Option<String>,
    pub is_active: Option<bool>,
}

fn map_inspector(row: &rusqlite::Row<'_>) -> rusqlite::Result<InspectorNameDto> {
    Ok(InspectorNameDto {
        id: row.get(0)?,
        name: row.get(1)?,
        is_active: row.get::<_, i32>(2)? != 0,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

fn normalize_name(raw: &str) -> Result<String, AppError> {
    let name = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if name.is_empty() {
        return Err(AppError::Validation("inspector name is required".into()));
    }
    if name.chars().count() > 80 {
        return Err(AppError::Validation(
            "inspector name must be at most 80 characters".into(),
        ));
    }
    Ok(name)
}

/// Uniqueness key: Unicode lowercase, so "Ángel" and "ángel" collide.
fn name_key(name: &str) -> String {
    name.to_lowercase()
}

fn ensure_name_free(conn: &Connection, name: &str, except_id: Option<&str>) -> Result<(), AppError> {
    let taken: i64 = conn.query_row(
        "SELECT COUNT(1) FROM inspector_names WHERE name_key = ?1 AND id <> COALESCE(?2, '')",
        params![name_key(name), except_id],
        |r| r.get(0),
    )?;
    if taken > 0 {
        return Err(AppError::Conflict(format!("inspector name {} already exists", name)));
    }
    Ok(())
}

pub(crate) fn inspector_get(conn: &Connection, id: &str) -> Result<InspectorNameDto, AppError> {
    conn.query_row(
        "SELECT id, name, is_active, created_at, updated_at FROM inspector_names WHERE id = ?1",
        [id],
        map_inspector,
    )
    .map_err(|_| AppError::NotFound(format!("inspector name {}", id)))
}

/// Picklist entries referenced by new inspections must exist and be active.
pub(crate) fn require_active_inspector(conn: &Connection, id: &str) -> Result<(), AppError> {
    let inspector = inspector_get(conn, id.trim())?;
    if !inspector.is_active {
        return Err(AppError::Validation(format!(
            "inspector name {} is inactive",
            inspector.name
        )));
    }
    Ok(())
}

pub fn inspector_name_create(
    pool: &DbPool,
    actor: &CurrentUser,
    req: InspectorNameCreateReq,
) -> Result<InspectorNameDto, AppError> {
    actor.require(Permission::ManageInspectorNames)?;
    let name = normalize_name(&req.name)?;

    let conn = get_connection(pool);
    ensure_name_free(&conn, &name, None)?;

    let id = Uuid::new_v4().to_string();
    let now = now_ts();
    conn.execute(
        "INSERT INTO inspector_names (id, name, name_key, is_active, created_at, updated_at) VALUES (?1, ?2, ?3, 1, ?4, ?4)",
        params![&id, &name, name_key(&name), &now],
    )?;

    Ok(InspectorNameDto {
        id,
        name,
        is_active: true,
        created_at: now.clone(),
        updated_at: now,
    })
}

/// Any signed-in user may read the picklist.
pub fn inspector_name_list(
    pool: &DbPool,
    _actor: &CurrentUser,
    only_active: bool,
) -> Result<Vec<InspectorNameDto>, AppError> {
    let conn = get_connection(pool);
    let sql = if only_active {
        "SELECT id, name, is_active, created_at, updated_at FROM inspector_names WHERE is_active = 1 ORDER BY name_key"
    } else {
        "SELECT id, name, is_active, created_at, updated_at FROM inspector_names ORDER BY name_key"
    };
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([], map_inspector)?;
    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

pub fn inspector_name_update(
    pool: &DbPool,
    actor: &CurrentUser,
    id: &str,
    req: InspectorNameUpdateReq,
) -> Result<InspectorNameDto, AppError> {
    actor.require(Permission::ManageInspectorNames)?;
    let new_name = req.name.as_deref().map(normalize_name).transpose()?;

    let conn = get_connection(pool);
    let current = inspector_get(&conn, id)?;
    if let Some(ref name) = new_name {
        ensure_name_free(&conn, name, Some(id))?;
    }

    let name = new_name.unwrap_or(current.name);
    conn.execute(
        "UPDATE inspector_names SET name = ?1, name_key = ?2, is_active = ?3, updated_at = ?4 WHERE id = ?5",
        params![
            &name,
            name_key(&name),
            req.is_active.unwrap_or(current.is_active) as i32,
            now_ts(),
            id
        ],
    )?;
    inspector_get(&conn, id)
}

pub fn inspector_name_delete(pool: &DbPool, actor: &CurrentUser, id: &str) -> Result<(), AppError> {
    actor.require(Permission::ManageInspectorNames)?;

    let conn = get_connection(pool);
    let current = inspector_get(&conn, id)?;
    let references: i64 = conn.query_row(
        "SELECT (SELECT COUNT(1) FROM security_checks WHERE inspector_name_id = ?1)
              + (SELECT COUNT(1) FROM checker_data WHERE inspector_name_id = ?1)",
        [id],
        |r| r.get(0),
    )?;
    if references > 0 {
        return Err(AppError::Conflict(format!(
            "inspector name {} is used by {} inspection(s); deactivate instead",
            current.name, references
        )));
    }
    conn.execute("DELETE FROM inspector_names WHERE id = ?1", [id])?;
    log::info!("{} deleted inspector name {}", actor.username, current.name);
    Ok(())
}

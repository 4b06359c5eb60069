//! Security check use cases: the initial inspection recorded by a security officer.

use crate::app::auth::CurrentUser;
use crate::app::checker::{load_checker_data, CheckerDataDto};
use crate::app::inspector::require_active_inspector;
use crate::app::photo::{load_photos, PhotoDto};
use crate::app::{date_bounds, normalize_timestamp, now_ts};
use crate::domain::checklist::find_item;
use crate::domain::container::normalize_container_number;
use crate::domain::{
    normalize_seal_number, validate_responses, CheckerVerdict, ChecklistResponseInput,
    ChecklistResult, ContainerNumber, InspectionStatus, Permission, Stage, ValidResponse,
};
use crate::error::AppError;
use crate::infra::{get_connection, DbPool, PhotoStore};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityCheckCreateReq {
    pub container_number: String,
    pub seal_number: String,
    pub truck_plate: String,
    pub driver_name: String,
    pub inspector_name_id: String,
    pub responses: Vec<ChecklistResponseInput>,
    pub remarks: Option<String>,
    /// RFC 3339; defaults to now.
    pub inspected_at: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityCheckUpdateReq {
    pub container_number: Option<String>,
    pub seal_number: Option<String>,
    pub truck_plate: Option<String>,
    pub driver_name: Option<String>,
    pub inspector_name_id: Option<String>,
    pub responses: Option<Vec<ChecklistResponseInput>>,
    pub remarks: Option<String>,
    pub inspected_at: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityCheckListReq {
    pub status: Option<String>,
    /// Substring of the container number, separators ignored.
    pub container: Option<String>,
    pub inspector_name_ids: Option<Vec<String>>,
    /// Inclusive `YYYY-MM-DD` bounds on `inspected_at`.
    pub from: Option<String>,
    pub to: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseDto {
    pub item_code: String,
    pub label: String,
    pub result: ChecklistResult,
    pub note: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityCheckDetailDto {
    pub id: String,
    pub container_number: String,
    pub seal_number: String,
    pub truck_plate: String,
    pub driver_name: String,
    pub inspector_name_id: String,
    pub inspector_name: String,
    pub created_by: String,
    pub created_by_name: String,
    pub status: InspectionStatus,
    pub remarks: String,
    pub inspected_at: String,
    pub created_at: String,
    pub updated_at: String,
    pub responses: Vec<ResponseDto>,
    pub photos: Vec<PhotoDto>,
    pub checker_data: Option<CheckerDataDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityCheckListItemDto {
    pub id: String,
    pub container_number: String,
    pub seal_number: String,
    pub truck_plate: String,
    pub inspector_name: String,
    pub created_by_name: String,
    pub status: InspectionStatus,
    pub failed_items: i64,
    pub verdict: Option<CheckerVerdict>,
    pub inspected_at: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityCheckListPage {
    pub items: Vec<SecurityCheckListItemDto>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOutcome {
    pub photos_removed: usize,
    pub photos_failed: usize,
}

/// The columns authorization decisions are made on.
#[derive(Debug, Clone)]
pub(crate) struct CheckHeader {
    pub id: String,
    pub seal_number: String,
    pub created_by: String,
    pub status: InspectionStatus,
}

pub(crate) fn load_header(conn: &Connection, id: &str) -> Result<CheckHeader, AppError> {
    let (id, seal_number, created_by, status): (String, String, String, String) = conn
        .query_row(
            "SELECT id, seal_number, created_by, status FROM security_checks WHERE id = ?1",
            [id],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
        )
        .map_err(|_| AppError::NotFound(format!("security check {}", id)))?;
    Ok(CheckHeader {
        id,
        seal_number,
        created_by,
        status: InspectionStatus::from_str(&status).unwrap_or(InspectionStatus::Pending),
    })
}

/// Officers only see their own checks; others' checks look nonexistent to them.
pub(crate) fn ensure_visible(actor: &CurrentUser, header: &CheckHeader) -> Result<(), AppError> {
    actor.require(Permission::ViewChecks)?;
    if !actor.role.sees_all_checks() && header.created_by != actor.id {
        return Err(AppError::NotFound(format!("security check {}", header.id)));
    }
    Ok(())
}

pub(crate) fn insert_responses(
    conn: &Connection,
    check_id: &str,
    stage: Stage,
    responses: &[ValidResponse],
) -> Result<(), AppError> {
    let mut stmt = conn.prepare(
        "INSERT INTO check_responses (id, security_check_id, stage, item_code, position, result, note) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )?;
    for r in responses {
        stmt.execute(params![
            Uuid::new_v4().to_string(),
            check_id,
            stage.as_str(),
            r.item_code,
            r.position as i64,
            r.result.as_str(),
            &r.note
        ])?;
    }
    Ok(())
}

pub(crate) fn load_responses(
    conn: &Connection,
    check_id: &str,
    stage: Stage,
) -> Result<Vec<ResponseDto>, AppError> {
    let mut stmt = conn.prepare(
        "SELECT item_code, result, note FROM check_responses
         WHERE security_check_id = ?1 AND stage = ?2
         ORDER BY position",
    )?;
    let rows = stmt.query_map(params![check_id, stage.as_str()], |r| {
        Ok((
            r.get::<_, String>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
        ))
    })?;
    let mut out = Vec::new();
    for row in rows {
        let (item_code, result, note) = row?;
        let label = find_item(&item_code)
            .map(|(_, item)| item.label.to_string())
            .unwrap_or_else(|| item_code.clone());
        out.push(ResponseDto {
            item_code,
            label,
            result: ChecklistResult::from_str(&result).unwrap_or(ChecklistResult::NotApplicable),
            note,
        });
    }
    Ok(out)
}

pub(crate) fn validate_checklist(input: &[ChecklistResponseInput]) -> Result<Vec<ValidResponse>, AppError> {
    validate_responses(input).map_err(AppError::Validation)
}

fn normalize_truck_plate(raw: &str) -> Result<String, AppError> {
    let plate = raw.split_whitespace().collect::<Vec<_>>().join(" ").to_uppercase();
    if plate.is_empty() {
        return Err(AppError::Validation("truck plate is required".into()));
    }
    if plate.chars().count() > 20 {
        return Err(AppError::Validation(
            "truck plate must be at most 20 characters".into(),
        ));
    }
    Ok(plate)
}

fn normalize_driver_name(raw: &str) -> Result<String, AppError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(AppError::Validation("driver name is required".into()));
    }
    if name.chars().count() > 80 {
        return Err(AppError::Validation(
            "driver name must be at most 80 characters".into(),
        ));
    }
    Ok(name.to_string())
}

pub(crate) fn normalize_remarks(raw: Option<&str>) -> Result<String, AppError> {
    let remarks = raw.unwrap_or("").trim();
    if remarks.chars().count() > 1000 {
        return Err(AppError::Validation(
            "remarks must be at most 1000 characters".into(),
        ));
    }
    Ok(remarks.to_string())
}

fn container(raw: &str) -> Result<String, AppError> {
    ContainerNumber::parse(raw)
        .map(ContainerNumber::into_string)
        .map_err(AppError::Validation)
}

fn seal(raw: &str) -> Result<String, AppError> {
    normalize_seal_number(raw).map_err(AppError::Validation)
}

pub fn security_check_create(
    pool: &DbPool,
    actor: &CurrentUser,
    req: SecurityCheckCreateReq,
) -> Result<SecurityCheckDetailDto, AppError> {
    actor.require(Permission::CreateSecurityCheck)?;

    let container_number = container(&req.container_number)?;
    let seal_number = seal(&req.seal_number)?;
    let truck_plate = normalize_truck_plate(&req.truck_plate)?;
    let driver_name = normalize_driver_name(&req.driver_name)?;
    let remarks = normalize_remarks(req.remarks.as_deref())?;
    let responses = validate_checklist(&req.responses)?;
    let now = now_ts();
    let inspected_at = match req.inspected_at.as_deref() {
        Some(raw) if !raw.trim().is_empty() => normalize_timestamp(raw)?,
        _ => now.clone(),
    };

    let id = Uuid::new_v4().to_string();
    let conn = get_connection(pool);
    require_active_inspector(&conn, &req.inspector_name_id)?;

    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO security_checks (id, container_number, seal_number, truck_plate, driver_name, inspector_name_id, created_by, status, remarks, inspected_at, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'PENDING', ?8, ?9, ?10, ?10)",
        params![
            &id,
            &container_number,
            &seal_number,
            &truck_plate,
            &driver_name,
            req.inspector_name_id.trim(),
            &actor.id,
            &remarks,
            &inspected_at,
            &now
        ],
    )?;
    insert_responses(&tx, &id, Stage::Security, &responses)?;
    tx.commit()?;

    log::info!(
        "{} recorded security check {} for container {}",
        actor.username,
        id,
        container_number
    );
    load_detail(&conn, &id)
}

pub(crate) fn load_detail(conn: &Connection, id: &str) -> Result<SecurityCheckDetailDto, AppError> {
    let mut detail = conn
        .query_row(
            "SELECT c.id, c.container_number, c.seal_number, c.truck_plate, c.driver_name,
                    c.inspector_name_id, COALESCE(i.name, '?'), c.created_by, COALESCE(u.display_name, '?'),
                    c.status, c.remarks, c.inspected_at, c.created_at, c.updated_at
             FROM security_checks c
             LEFT JOIN inspector_names i ON i.id = c.inspector_name_id
             LEFT JOIN users u ON u.id = c.created_by
             WHERE c.id = ?1",
            [id],
            |r| {
                let status: String = r.get(9)?;
                Ok(SecurityCheckDetailDto {
                    id: r.get(0)?,
                    container_number: r.get(1)?,
                    seal_number: r.get(2)?,
                    truck_plate: r.get(3)?,
                    driver_name: r.get(4)?,
                    inspector_name_id: r.get(5)?,
                    inspector_name: r.get(6)?,
                    created_by: r.get(7)?,
                    created_by_name: r.get(8)?,
                    status: InspectionStatus::from_str(&status)
                        .unwrap_or(InspectionStatus::Pending),
                    remarks: r.get(10)?,
                    inspected_at: r.get(11)?,
                    created_at: r.get(12)?,
                    updated_at: r.get(13)?,
                    responses: Vec::new(),
                    photos: Vec::new(),
                    checker_data: None,
                })
            },
        )
        .map_err(|_| AppError::NotFound(format!("security check {}", id)))?;

    detail.responses = load_responses(conn, id, Stage::Security)?;
    detail.photos = load_photos(conn, id)?;
    detail.checker_data = load_checker_data(conn, id)?;
    Ok(detail)
}

pub fn security_check_get(
    pool: &DbPool,
    actor: &CurrentUser,
    id: &str,
) -> Result<SecurityCheckDetailDto, AppError> {
    let conn = get_connection(pool);
    let header = load_header(&conn, id)?;
    ensure_visible(actor, &header)?;
    load_detail(&conn, id)
}

pub fn security_check_list(
    pool: &DbPool,
    actor: &CurrentUser,
    req: SecurityCheckListReq,
) -> Result<SecurityCheckListPage, AppError> {
    use rusqlite::types::Value;

    actor.require(Permission::ViewChecks)?;
    let limit = req.limit.unwrap_or(50).clamp(1, 200);
    let offset = req.offset.unwrap_or(0).max(0);

    // --- build dynamic WHERE clauses ---
    let mut conditions: Vec<String> = Vec::new();
    let mut bind_values: Vec<Value> = Vec::new();

    if !actor.role.sees_all_checks() {
        conditions.push("c.created_by = ?".to_string());
        bind_values.push(Value::Text(actor.id.clone()));
    }

    if let Some(status) = req.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let status = InspectionStatus::from_str(status)
            .ok_or_else(|| AppError::Validation(format!("unknown status: {}", status)))?;
        conditions.push("c.status = ?".to_string());
        bind_values.push(Value::Text(status.as_str().to_string()));
    }

    if let Some(ref q) = req.container {
        let q = normalize_container_number(q);
        if !q.is_empty() {
            // plain substring; `%` and `_` in the query are literal
            conditions.push("instr(c.container_number, ?) > 0".to_string());
            bind_values.push(Value::Text(q));
        }
    }

    if let Some(ref ids) = req.inspector_name_ids {
        let v: Vec<&String> = ids.iter().filter(|s| !s.is_empty()).collect();
        if !v.is_empty() {
            let ph: Vec<&str> = v.iter().map(|_| "?").collect();
            conditions.push(format!("c.inspector_name_id IN ({})", ph.join(",")));
            for s in v {
                bind_values.push(Value::Text(s.clone()));
            }
        }
    }

    let (from, to) = date_bounds(req.from.as_deref(), req.to.as_deref())?;
    if let Some(from) = from {
        conditions.push("c.inspected_at >= ?".to_string());
        bind_values.push(Value::Text(from));
    }
    if let Some(to) = to {
        conditions.push("c.inspected_at < ?".to_string());
        bind_values.push(Value::Text(to));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };

    let conn = get_connection(pool);

    // --- COUNT total ---
    let count_sql = format!("SELECT COUNT(*) FROM security_checks c{}", where_clause);
    let total: i64 = conn.query_row(
        &count_sql,
        rusqlite::params_from_iter(bind_values.iter()),
        |r| r.get(0),
    )?;

    // --- main query ---
    let data_sql = format!(
        "SELECT c.id, c.container_number, c.seal_number, c.truck_plate, \
         COALESCE(i.name, '?'), COALESCE(u.display_name, '?'), c.status, \
         (SELECT COUNT(1) FROM check_responses r WHERE r.security_check_id = c.id AND r.stage = 'SECURITY' AND r.result = 'FAIL'), \
         (SELECT d.verdict FROM checker_data d WHERE d.security_check_id = c.id), \
         c.inspected_at \
         FROM security_checks c \
         LEFT JOIN inspector_names i ON i.id = c.inspector_name_id \
         LEFT JOIN users u ON u.id = c.created_by\
         {} ORDER BY c.inspected_at DESC, c.created_at DESC LIMIT ? OFFSET ?",
        where_clause
    );

    let mut all_params = bind_values;
    all_params.push(Value::Integer(limit));
    all_params.push(Value::Integer(offset));

    let mut stmt = conn.prepare(&data_sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(all_params.iter()), |r| {
        let status: String = r.get(6)?;
        let verdict: Option<String> = r.get(8)?;
        Ok(SecurityCheckListItemDto {
            id: r.get(0)?,
            container_number: r.get(1)?,
            seal_number: r.get(2)?,
            truck_plate: r.get(3)?,
            inspector_name: r.get(4)?,
            created_by_name: r.get(5)?,
            status: InspectionStatus::from_str(&status).unwrap_or(InspectionStatus::Pending),
            failed_items: r.get(7)?,
            verdict: verdict.as_deref().and_then(CheckerVerdict::from_str),
            inspected_at: r.get(9)?,
        })
    })?;
    let mut items = Vec::new();
    for r in rows {
        items.push(r?);
    }

    Ok(SecurityCheckListPage {
        items,
        total,
        limit,
        offset,
    })
}

pub fn security_check_update(
    pool: &DbPool,
    actor: &CurrentUser,
    id: &str,
    req: SecurityCheckUpdateReq,
) -> Result<SecurityCheckDetailDto, AppError> {
    let container_number = req.container_number.as_deref().map(container).transpose()?;
    let seal_number = req.seal_number.as_deref().map(seal).transpose()?;
    let truck_plate = req
        .truck_plate
        .as_deref()
        .map(normalize_truck_plate)
        .transpose()?;
    let driver_name = req
        .driver_name
        .as_deref()
        .map(normalize_driver_name)
        .transpose()?;
    let remarks = req
        .remarks
        .as_deref()
        .map(|r| normalize_remarks(Some(r)))
        .transpose()?;
    let inspected_at = req
        .inspected_at
        .as_deref()
        .map(normalize_timestamp)
        .transpose()?;
    let responses = req
        .responses
        .as_deref()
        .map(validate_checklist)
        .transpose()?;

    let conn = get_connection(pool);
    let header = load_header(&conn, id)?;
    ensure_visible(actor, &header)?;
    if !actor.is_admin() && header.created_by != actor.id {
        return Err(AppError::Forbidden(
            "only the recording officer may edit a security check".into(),
        ));
    }
    if header.status == InspectionStatus::Checked {
        return Err(AppError::CheckLocked);
    }
    if let Some(ref inspector_id) = req.inspector_name_id {
        require_active_inspector(&conn, inspector_id)?;
    }

    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "UPDATE security_checks SET
            container_number = COALESCE(?1, container_number),
            seal_number = COALESCE(?2, seal_number),
            truck_plate = COALESCE(?3, truck_plate),
            driver_name = COALESCE(?4, driver_name),
            inspector_name_id = COALESCE(?5, inspector_name_id),
            remarks = COALESCE(?6, remarks),
            inspected_at = COALESCE(?7, inspected_at),
            updated_at = ?8
         WHERE id = ?9",
        params![
            container_number,
            seal_number,
            truck_plate,
            driver_name,
            req.inspector_name_id.as_deref().map(str::trim),
            remarks,
            inspected_at,
            now_ts(),
            id
        ],
    )?;
    if let Some(responses) = responses {
        tx.execute(
            "DELETE FROM check_responses WHERE security_check_id = ?1 AND stage = 'SECURITY'",
            [id],
        )?;
        insert_responses(&tx, id, Stage::Security, &responses)?;
    }
    tx.commit()?;

    log::info!("{} updated security check {}", actor.username, id);
    load_detail(&conn, id)
}

/// Removes every row of the check in one transaction and hands back the photo
/// object keys for cleanup once the rows are gone.
fn delete_check_rows(pool: &DbPool, actor: &CurrentUser, id: &str) -> Result<Vec<String>, AppError> {
    actor.require(Permission::DeleteChecks)?;

    let conn = get_connection(pool);
    load_header(&conn, id)?;

    let tx = conn.unchecked_transaction()?;
    let keys = {
        let mut stmt = tx.prepare("SELECT object_key FROM photos WHERE security_check_id = ?1")?;
        let rows = stmt.query_map([id], |r| r.get::<_, String>(0))?;
        let keys = rows.collect::<Result<Vec<_>, _>>()?;
        keys
    };
    tx.execute("DELETE FROM photos WHERE security_check_id = ?1", [id])?;
    tx.execute("DELETE FROM check_responses WHERE security_check_id = ?1", [id])?;
    tx.execute("DELETE FROM checker_data WHERE security_check_id = ?1", [id])?;
    tx.execute("DELETE FROM security_checks WHERE id = ?1", [id])?;
    tx.commit()?;

    log::info!(
        "{} deleted security check {} ({} photo(s))",
        actor.username,
        id,
        keys.len()
    );
    Ok(keys)
}

pub async fn security_check_delete(
    pool: &DbPool,
    store: &dyn PhotoStore,
    actor: &CurrentUser,
    id: &str,
) -> Result<DeleteOutcome, AppError> {
    let keys = delete_check_rows(pool, actor, id)?;

    let mut outcome = DeleteOutcome {
        photos_removed: 0,
        photos_failed: 0,
    };
    for key in keys {
        match store.delete(&key).await {
            Ok(()) => outcome.photos_removed += 1,
            Err(e) => {
                log::warn!("photo cleanup failed for {}: {}", key, e);
                outcome.photos_failed += 1;
            }
        }
    }
    Ok(outcome)
}

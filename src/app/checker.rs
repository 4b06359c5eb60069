//! Checker data use cases: the follow-up inspection that closes a security check.

use crate::app::auth::CurrentUser;
use crate::app::inspector::require_active_inspector;
use crate::app::now_ts;
use crate::app::security_check::{
    ensure_visible, insert_responses, load_header, load_responses, normalize_remarks,
    validate_checklist, ResponseDto,
};
use crate::domain::{
    normalize_seal_number, CheckerVerdict, ChecklistResponseInput, InspectionStatus, Permission,
    Stage,
};
use crate::error::AppError;
use crate::infra::{get_connection, DbPool};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckerDataDto {
    pub id: String,
    pub security_check_id: String,
    pub checker_id: String,
    pub checker_name: String,
    pub inspector_name_id: String,
    pub inspector_name: String,
    pub seal_number_observed: String,
    pub seal_matches: bool,
    pub verdict: CheckerVerdict,
    pub remarks: String,
    pub checked_at: String,
    pub updated_at: String,
    pub responses: Vec<ResponseDto>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckerDataCreateReq {
    pub inspector_name_id: String,
    pub seal_number_observed: String,
    pub responses: Vec<ChecklistResponseInput>,
    pub verdict: CheckerVerdict,
    pub remarks: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckerDataUpdateReq {
    pub inspector_name_id: Option<String>,
    pub seal_number_observed: Option<String>,
    pub responses: Option<Vec<ChecklistResponseInput>>,
    pub verdict: Option<CheckerVerdict>,
    pub remarks: Option<String>,
}

pub(crate) fn load_checker_data(
    conn: &Connection,
    check_id: &str,
) -> Result<Option<CheckerDataDto>, AppError> {
    let found = conn
        .query_row(
            "SELECT d.id, d.security_check_id, d.checker_id, COALESCE(u.display_name, '?'),
                    d.inspector_name_id, COALESCE(i.name, '?'), d.seal_number_observed,
                    d.seal_matches, d.verdict, d.remarks, d.checked_at, d.updated_at
             FROM checker_data d
             LEFT JOIN users u ON u.id = d.checker_id
             LEFT JOIN inspector_names i ON i.id = d.inspector_name_id
             WHERE d.security_check_id = ?1",
            [check_id],
            |r| {
                let verdict: String = r.get(8)?;
                Ok(CheckerDataDto {
                    id: r.get(0)?,
                    security_check_id: r.get(1)?,
                    checker_id: r.get(2)?,
                    checker_name: r.get(3)?,
                    inspector_name_id: r.get(4)?,
                    inspector_name: r.get(5)?,
                    seal_number_observed: r.get(6)?,
                    seal_matches: r.get::<_, i32>(7)? != 0,
                    verdict: CheckerVerdict::from_str(&verdict).unwrap_or(CheckerVerdict::Rejected),
                    remarks: r.get(9)?,
                    checked_at: r.get(10)?,
                    updated_at: r.get(11)?,
                    responses: Vec::new(),
                })
            },
        )
        .optional()?;

    match found {
        Some(mut data) => {
            data.responses = load_responses(conn, check_id, Stage::Checker)?;
            Ok(Some(data))
        }
        None => Ok(None),
    }
}

fn require_remarks(verdict: CheckerVerdict, remarks: &str) -> Result<(), AppError> {
    if verdict.remarks_required() && remarks.is_empty() {
        return Err(AppError::Validation(
            "remarks are required when rejecting a container".into(),
        ));
    }
    Ok(())
}

pub fn checker_data_create(
    pool: &DbPool,
    actor: &CurrentUser,
    check_id: &str,
    req: CheckerDataCreateReq,
) -> Result<CheckerDataDto, AppError> {
    actor.require(Permission::CreateCheckerData)?;

    let observed = normalize_seal_number(&req.seal_number_observed).map_err(AppError::Validation)?;
    let remarks = normalize_remarks(req.remarks.as_deref())?;
    require_remarks(req.verdict, &remarks)?;
    let responses = validate_checklist(&req.responses)?;

    let conn = get_connection(pool);
    let header = load_header(&conn, check_id)?;
    ensure_visible(actor, &header)?;
    if header.status == InspectionStatus::Checked {
        return Err(AppError::AlreadyChecked);
    }
    require_active_inspector(&conn, &req.inspector_name_id)?;

    let seal_matches = observed == header.seal_number;
    let now = now_ts();
    let tx = conn.unchecked_transaction()?;

    // Only a still-pending check may be closed; a concurrent checker loses here.
    let closed = tx.execute(
        "UPDATE security_checks SET status = 'CHECKED', updated_at = ?1 WHERE id = ?2 AND status = 'PENDING'",
        params![&now, check_id],
    )?;
    if closed == 0 {
        return Err(AppError::AlreadyChecked);
    }
    tx.execute(
        "INSERT INTO checker_data (id, security_check_id, checker_id, inspector_name_id, seal_number_observed, seal_matches, verdict, remarks, checked_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
        params![
            Uuid::new_v4().to_string(),
            check_id,
            &actor.id,
            req.inspector_name_id.trim(),
            &observed,
            seal_matches as i32,
            req.verdict.as_str(),
            &remarks,
            &now
        ],
    )?;
    insert_responses(&tx, check_id, Stage::Checker, &responses)?;
    tx.commit()?;

    if !seal_matches {
        log::warn!(
            "seal mismatch on security check {}: recorded {}, observed {}",
            check_id,
            header.seal_number,
            observed
        );
    }
    log::info!(
        "{} checked security check {}: {}",
        actor.username,
        check_id,
        req.verdict.as_str()
    );

    load_checker_data(&conn, check_id)?
        .ok_or_else(|| AppError::NotFound(format!("checker data for {}", check_id)))
}

pub fn checker_data_get(
    pool: &DbPool,
    actor: &CurrentUser,
    check_id: &str,
) -> Result<CheckerDataDto, AppError> {
    let conn = get_connection(pool);
    let header = load_header(&conn, check_id)?;
    ensure_visible(actor, &header)?;
    load_checker_data(&conn, check_id)?
        .ok_or_else(|| AppError::NotFound(format!("checker data for {}", check_id)))
}

pub fn checker_data_update(
    pool: &DbPool,
    actor: &CurrentUser,
    check_id: &str,
    req: CheckerDataUpdateReq,
) -> Result<CheckerDataDto, AppError> {
    actor.require(Permission::CreateCheckerData)?;

    let observed = req
        .seal_number_observed
        .as_deref()
        .map(|s| normalize_seal_number(s).map_err(AppError::Validation))
        .transpose()?;
    let remarks = req
        .remarks
        .as_deref()
        .map(|r| normalize_remarks(Some(r)))
        .transpose()?;
    let responses = req
        .responses
        .as_deref()
        .map(validate_checklist)
        .transpose()?;

    let conn = get_connection(pool);
    let header = load_header(&conn, check_id)?;
    ensure_visible(actor, &header)?;
    let current = load_checker_data(&conn, check_id)?
        .ok_or_else(|| AppError::NotFound(format!("checker data for {}", check_id)))?;
    if !actor.is_admin() && current.checker_id != actor.id {
        return Err(AppError::Forbidden(
            "only the recording checker may edit checker data".into(),
        ));
    }
    if let Some(ref inspector_id) = req.inspector_name_id {
        require_active_inspector(&conn, inspector_id)?;
    }

    let verdict = req.verdict.unwrap_or(current.verdict);
    let remarks = remarks.unwrap_or(current.remarks);
    require_remarks(verdict, &remarks)?;
    let observed = observed.unwrap_or(current.seal_number_observed);
    let seal_matches = observed == header.seal_number;

    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "UPDATE checker_data SET inspector_name_id = ?1, seal_number_observed = ?2, seal_matches = ?3,
                verdict = ?4, remarks = ?5, updated_at = ?6
         WHERE security_check_id = ?7",
        params![
            req.inspector_name_id
                .as_deref()
                .map(str::trim)
                .unwrap_or(&current.inspector_name_id),
            &observed,
            seal_matches as i32,
            verdict.as_str(),
            &remarks,
            now_ts(),
            check_id
        ],
    )?;
    if let Some(responses) = responses {
        tx.execute(
            "DELETE FROM check_responses WHERE security_check_id = ?1 AND stage = 'CHECKER'",
            [check_id],
        )?;
        insert_responses(&tx, check_id, Stage::Checker, &responses)?;
    }
    tx.commit()?;

    log::info!("{} updated checker data on {}", actor.username, check_id);
    load_checker_data(&conn, check_id)?
        .ok_or_else(|| AppError::NotFound(format!("checker data for {}", check_id)))
}

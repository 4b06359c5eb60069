//! Export use cases: CSV of inspection rows, JSON backup, gzip backup.

use crate::app::auth::CurrentUser;
use crate::app::now_ts;
use crate::app::report::{collect_rows, ReportFilter, ReportRow};
use crate::domain::Permission;
use crate::error::AppError;
use crate::infra::{get_connection, DbPool};
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::Serialize;
use std::io::Write;

pub const EXPORT_SCHEMA_VERSION: i32 = 1;

const CSV_HEADER: [&str; 14] = [
    "container_number",
    "seal_number",
    "truck_plate",
    "driver_name",
    "inspector",
    "security_officer",
    "inspected_at",
    "status",
    "failed_items",
    "checker",
    "verdict",
    "seal_matches",
    "checked_at",
    "remarks",
];

/// Quote a field when it contains a comma, quote or line break.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn push_record(out: &mut String, fields: &[&str]) {
    let line: Vec<String> = fields.iter().map(|f| csv_field(f)).collect();
    out.push_str(&line.join(","));
    out.push_str("\r\n");
}

fn csv_record(row: &ReportRow) -> Vec<String> {
    let mut failed = row.failed_items.clone();
    let (checker, verdict, seal_matches, checked_at) = match row.checker {
        Some(ref c) => {
            failed.extend(c.failed_items.iter().map(|code| format!("{} (checker)", code)));
            (
                c.checker_name.clone(),
                c.verdict.as_str().to_string(),
                if c.seal_matches { "yes" } else { "no" }.to_string(),
                c.checked_at.clone(),
            )
        }
        None => Default::default(),
    };
    let remarks = match row.checker {
        Some(ref c) if !c.remarks.is_empty() && !row.remarks.is_empty() => {
            format!("{} | {}", row.remarks, c.remarks)
        }
        Some(ref c) if !c.remarks.is_empty() => c.remarks.clone(),
        _ => row.remarks.clone(),
    };
    vec![
        row.container_number.clone(),
        row.seal_number.clone(),
        row.truck_plate.clone(),
        row.driver_name.clone(),
        row.inspector_name.clone(),
        row.security_officer.clone(),
        row.inspected_at.clone(),
        row.status.as_str().to_string(),
        failed.join("; "),
        checker,
        verdict,
        seal_matches,
        checked_at,
        remarks,
    ]
}

/// Export checks matching the report filter as CSV (header plus one line per check).
pub fn export_checks_csv(
    pool: &DbPool,
    actor: &CurrentUser,
    filter: &ReportFilter,
) -> Result<String, AppError> {
    actor.require(Permission::ExportData)?;

    let rows = {
        let conn = get_connection(pool);
        collect_rows(&conn, filter)?
    };

    let mut out = String::new();
    push_record(&mut out, &CSV_HEADER);
    for row in &rows {
        let record = csv_record(row);
        let fields: Vec<&str> = record.iter().map(String::as_str).collect();
        push_record(&mut out, &fields);
    }
    log::info!("CSV export: {} checks by {}", rows.len(), actor.username);
    Ok(out)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRoot {
    pub schema_version: i32,
    pub exported_at: String,
    pub users: Vec<ExportUser>,
    pub inspector_names: Vec<ExportInspectorName>,
    pub security_checks: Vec<ExportSecurityCheck>,
    pub check_responses: Vec<ExportResponse>,
    pub checker_data: Vec<ExportCheckerData>,
    pub photos: Vec<ExportPhoto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportUser {
    pub id: String,
    pub username: String,
    pub display_name: String,
    pub role: String,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportInspectorName {
    pub id: String,
    pub name: String,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSecurityCheck {
    pub id: String,
    pub container_number: String,
    pub seal_number: String,
    pub truck_plate: String,
    pub driver_name: String,
    pub inspector_name_id: String,
    pub created_by: String,
    pub status: String,
    pub remarks: String,
    pub inspected_at: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportResponse {
    pub security_check_id: String,
    pub stage: String,
    pub item_code: String,
    pub position: i64,
    pub result: String,
    pub note: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportCheckerData {
    pub id: String,
    pub security_check_id: String,
    pub checker_id: String,
    pub inspector_name_id: String,
    pub seal_number_observed: String,
    pub seal_matches: bool,
    pub verdict: String,
    pub remarks: String,
    pub checked_at: String,
    pub updated_at: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportPhoto {
    pub id: String,
    pub security_check_id: String,
    pub stage: String,
    pub object_key: String,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub uploaded_by: String,
    pub created_at: String,
}

fn build_export(conn: &rusqlite::Connection) -> Result<ExportRoot, AppError> {
    // 1. Users, never with password hashes
    let mut users = Vec::new();
    let mut stmt = conn.prepare(
        "SELECT id, username, display_name, role, is_active, created_at, updated_at
         FROM users ORDER BY username",
    )?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        users.push(ExportUser {
            id: row.get(0)?,
            username: row.get(1)?,
            display_name: row.get(2)?,
            role: row.get(3)?,
            is_active: row.get::<_, i32>(4)? != 0,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        });
    }

    // 2. Inspector names
    let mut inspector_names = Vec::new();
    let mut stmt = conn.prepare(
        "SELECT id, name, is_active, created_at, updated_at FROM inspector_names ORDER BY name",
    )?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        inspector_names.push(ExportInspectorName {
            id: row.get(0)?,
            name: row.get(1)?,
            is_active: row.get::<_, i32>(2)? != 0,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
        });
    }

    // 3. Security checks
    let mut security_checks = Vec::new();
    let mut stmt = conn.prepare(
        "SELECT id, container_number, seal_number, truck_plate, driver_name, inspector_name_id,
                created_by, status, remarks, inspected_at, created_at, updated_at
         FROM security_checks ORDER BY inspected_at DESC",
    )?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        security_checks.push(ExportSecurityCheck {
            id: row.get(0)?,
            container_number: row.get(1)?,
            seal_number: row.get(2)?,
            truck_plate: row.get(3)?,
            driver_name: row.get(4)?,
            inspector_name_id: row.get(5)?,
            created_by: row.get(6)?,
            status: row.get(7)?,
            remarks: row.get(8)?,
            inspected_at: row.get(9)?,
            created_at: row.get(10)?,
            updated_at: row.get(11)?,
        });
    }

    // 4. Checklist responses
    let mut check_responses = Vec::new();
    let mut stmt = conn.prepare(
        "SELECT security_check_id, stage, item_code, position, result, note
         FROM check_responses ORDER BY security_check_id, stage, position",
    )?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        check_responses.push(ExportResponse {
            security_check_id: row.get(0)?,
            stage: row.get(1)?,
            item_code: row.get(2)?,
            position: row.get(3)?,
            result: row.get(4)?,
            note: row.get(5)?,
        });
    }

    // 5. Checker data
    let mut checker_data = Vec::new();
    let mut stmt = conn.prepare(
        "SELECT id, security_check_id, checker_id, inspector_name_id, seal_number_observed,
                seal_matches, verdict, remarks, checked_at, updated_at
         FROM checker_data ORDER BY checked_at DESC",
    )?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        checker_data.push(ExportCheckerData {
            id: row.get(0)?,
            security_check_id: row.get(1)?,
            checker_id: row.get(2)?,
            inspector_name_id: row.get(3)?,
            seal_number_observed: row.get(4)?,
            seal_matches: row.get::<_, i32>(5)? != 0,
            verdict: row.get(6)?,
            remarks: row.get(7)?,
            checked_at: row.get(8)?,
            updated_at: row.get(9)?,
        });
    }

    // 6. Photo metadata (object bytes stay in the bucket)
    let mut photos = Vec::new();
    let mut stmt = conn.prepare(
        "SELECT id, security_check_id, stage, object_key, file_name, content_type, size_bytes,
                uploaded_by, created_at
         FROM photos ORDER BY created_at",
    )?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        photos.push(ExportPhoto {
            id: row.get(0)?,
            security_check_id: row.get(1)?,
            stage: row.get(2)?,
            object_key: row.get(3)?,
            file_name: row.get(4)?,
            content_type: row.get(5)?,
            size_bytes: row.get(6)?,
            uploaded_by: row.get(7)?,
            created_at: row.get(8)?,
        });
    }

    Ok(ExportRoot {
        schema_version: EXPORT_SCHEMA_VERSION,
        exported_at: now_ts(),
        users,
        inspector_names,
        security_checks,
        check_responses,
        checker_data,
        photos,
    })
}

/// Export all data as a pretty-printed JSON string.
pub fn export_json_string(pool: &DbPool, actor: &CurrentUser) -> Result<String, AppError> {
    actor.require(Permission::ExportData)?;

    let export_root = {
        let conn = get_connection(pool);
        build_export(&conn)?
    };

    serde_json::to_string_pretty(&export_root)
        .map_err(|e| AppError::Db(format!("JSON serialization failed: {}", e)))
}

/// The JSON backup, gzip-compressed.
pub fn export_backup_gz(pool: &DbPool, actor: &CurrentUser) -> Result<Vec<u8>, AppError> {
    let json = export_json_string(pool, actor)?;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(json.as_bytes())
        .map_err(|e| AppError::Db(format!("gzip failed: {}", e)))?;
    encoder
        .finish()
        .map_err(|e| AppError::Db(format!("gzip failed: {}", e)))
}

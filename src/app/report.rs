//! Aggregate inspection reports for administrators.

use crate::app::auth::CurrentUser;
use crate::app::{date_bounds, now_ts};
use crate::domain::checklist::find_item;
use crate::domain::container::normalize_container_number;
use crate::domain::{CheckerVerdict, InspectionStatus, Permission, Stage};
use crate::error::AppError;
use crate::infra::{get_connection, DbPool};
use rusqlite::types::Value;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportFilter {
    /// Inclusive `YYYY-MM-DD` bounds on `inspected_at`.
    pub from: Option<String>,
    pub to: Option<String>,
    pub status: Option<String>,
    pub verdict: Option<String>,
    pub inspector_name_id: Option<String>,
    pub security_user_id: Option<String>,
    pub checker_user_id: Option<String>,
    pub container: Option<String>,
    pub only_with_failures: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportCheckerSummary {
    pub checker_id: String,
    pub checker_name: String,
    pub verdict: CheckerVerdict,
    pub seal_matches: bool,
    pub checked_at: String,
    pub remarks: String,
    pub failed_items: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    pub id: String,
    pub container_number: String,
    pub seal_number: String,
    pub truck_plate: String,
    pub driver_name: String,
    pub inspector_name_id: String,
    pub inspector_name: String,
    pub security_user_id: String,
    pub security_officer: String,
    pub status: InspectionStatus,
    pub remarks: String,
    pub inspected_at: String,
    pub failed_items: Vec<String>,
    pub checker: Option<ReportCheckerSummary>,
}

impl ReportRow {
    pub fn has_failures(&self) -> bool {
        !self.failed_items.is_empty()
            || self
                .checker
                .as_ref()
                .is_some_and(|c| !c.failed_items.is_empty())
    }
}

#[derive(Debug, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReportTotals {
    pub total: usize,
    pub pending: usize,
    pub checked: usize,
    pub approved: usize,
    pub rejected: usize,
    pub with_failures: usize,
    pub seal_mismatches: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectorTally {
    pub inspector_name_id: String,
    pub inspector_name: String,
    pub total: usize,
    pub failures: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayTally {
    pub date: String,
    pub total: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemTally {
    /// Security and checker failures of the same item are tallied apart.
    pub stage: Stage,
    pub item_code: String,
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDto {
    pub generated_at: String,
    pub filter: ReportFilter,
    pub totals: ReportTotals,
    pub by_inspector: Vec<InspectorTally>,
    pub by_day: Vec<DayTally>,
    pub most_failed_items: Vec<ItemTally>,
    pub rows: Vec<ReportRow>,
}

/// Parsed form of the string-typed filter fields.
struct RowPredicate {
    status: Option<InspectionStatus>,
    verdict: Option<CheckerVerdict>,
    inspector_name_id: Option<String>,
    security_user_id: Option<String>,
    checker_user_id: Option<String>,
    container: Option<String>,
    only_with_failures: bool,
}

fn non_empty(v: &Option<String>) -> Option<String> {
    v.as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

impl RowPredicate {
    fn from_filter(filter: &ReportFilter) -> Result<Self, AppError> {
        let status = non_empty(&filter.status)
            .map(|s| {
                InspectionStatus::from_str(&s)
                    .ok_or_else(|| AppError::Validation(format!("unknown status: {}", s)))
            })
            .transpose()?;
        let verdict = non_empty(&filter.verdict)
            .map(|s| {
                CheckerVerdict::from_str(&s)
                    .ok_or_else(|| AppError::Validation(format!("unknown verdict: {}", s)))
            })
            .transpose()?;
        Ok(Self {
            status,
            verdict,
            inspector_name_id: non_empty(&filter.inspector_name_id),
            security_user_id: non_empty(&filter.security_user_id),
            checker_user_id: non_empty(&filter.checker_user_id),
            container: non_empty(&filter.container)
                .map(|c| normalize_container_number(&c))
                .filter(|c| !c.is_empty()),
            only_with_failures: filter.only_with_failures.unwrap_or(false),
        })
    }

    fn matches(&self, row: &ReportRow) -> bool {
        if self.status.is_some_and(|s| s != row.status) {
            return false;
        }
        if let Some(verdict) = self.verdict {
            if row.checker.as_ref().map(|c| c.verdict) != Some(verdict) {
                return false;
            }
        }
        if let Some(ref id) = self.inspector_name_id {
            if &row.inspector_name_id != id {
                return false;
            }
        }
        if let Some(ref id) = self.security_user_id {
            if &row.security_user_id != id {
                return false;
            }
        }
        if let Some(ref id) = self.checker_user_id {
            if row.checker.as_ref().map(|c| &c.checker_id) != Some(id) {
                return false;
            }
        }
        if let Some(ref q) = self.container {
            if !row.container_number.contains(q.as_str()) {
                return false;
            }
        }
        !self.only_with_failures || row.has_failures()
    }
}

/// Checks in the date range with their nested responses and checker data,
/// reshaped into flat rows and narrowed by the remaining filter fields.
pub(crate) fn collect_rows(conn: &Connection, filter: &ReportFilter) -> Result<Vec<ReportRow>, AppError> {
    let predicate = RowPredicate::from_filter(filter)?;
    let (from, to) = date_bounds(filter.from.as_deref(), filter.to.as_deref())?;

    let mut conditions: Vec<&str> = Vec::new();
    let mut bind_values: Vec<Value> = Vec::new();
    if let Some(from) = from {
        conditions.push("c.inspected_at >= ?");
        bind_values.push(Value::Text(from));
    }
    if let Some(to) = to {
        conditions.push("c.inspected_at < ?");
        bind_values.push(Value::Text(to));
    }
    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };

    // failed items per (check, stage)
    let mut failures: HashMap<(String, String), Vec<(usize, String)>> = HashMap::new();
    {
        let sql = format!(
            "SELECT r.security_check_id, r.stage, r.item_code, r.position
             FROM check_responses r JOIN security_checks c ON c.id = r.security_check_id{}{}",
            where_clause,
            if where_clause.is_empty() {
                " WHERE r.result = 'FAIL'"
            } else {
                " AND r.result = 'FAIL'"
            }
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(rusqlite::params_from_iter(bind_values.iter()))?;
        while let Some(row) = rows.next()? {
            let position: i64 = row.get(3)?;
            failures
                .entry((row.get(0)?, row.get(1)?))
                .or_default()
                .push((position as usize, row.get(2)?));
        }
    }
    let mut take_failures = |check_id: &str, stage: &str| -> Vec<String> {
        let mut items = failures
            .remove(&(check_id.to_string(), stage.to_string()))
            .unwrap_or_default();
        items.sort();
        items.into_iter().map(|(_, code)| code).collect()
    };

    let sql = format!(
        "SELECT c.id, c.container_number, c.seal_number, c.truck_plate, c.driver_name,
                c.inspector_name_id, COALESCE(i.name, '?'), c.created_by, COALESCE(su.display_name, '?'),
                c.status, c.remarks, c.inspected_at,
                d.checker_id, COALESCE(cu.display_name, '?'), d.verdict, d.seal_matches, d.checked_at, d.remarks
         FROM security_checks c
         LEFT JOIN inspector_names i ON i.id = c.inspector_name_id
         LEFT JOIN users su ON su.id = c.created_by
         LEFT JOIN checker_data d ON d.security_check_id = c.id
         LEFT JOIN users cu ON cu.id = d.checker_id{}
         ORDER BY c.inspected_at DESC, c.created_at DESC",
        where_clause
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(rusqlite::params_from_iter(bind_values.iter()))?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let id: String = row.get(0)?;
        let status: String = row.get(9)?;
        let checker_id: Option<String> = row.get(12)?;
        let checker = match checker_id {
            Some(checker_id) => {
                let verdict: String = row.get(14)?;
                Some(ReportCheckerSummary {
                    checker_id,
                    checker_name: row.get(13)?,
                    verdict: CheckerVerdict::from_str(&verdict).unwrap_or(CheckerVerdict::Rejected),
                    seal_matches: row.get::<_, i32>(15)? != 0,
                    checked_at: row.get(16)?,
                    remarks: row.get(17)?,
                    failed_items: take_failures(&id, "CHECKER"),
                })
            }
            None => None,
        };
        let report_row = ReportRow {
            failed_items: take_failures(&id, "SECURITY"),
            id,
            container_number: row.get(1)?,
            seal_number: row.get(2)?,
            truck_plate: row.get(3)?,
            driver_name: row.get(4)?,
            inspector_name_id: row.get(5)?,
            inspector_name: row.get(6)?,
            security_user_id: row.get(7)?,
            security_officer: row.get(8)?,
            status: InspectionStatus::from_str(&status).unwrap_or(InspectionStatus::Pending),
            remarks: row.get(10)?,
            inspected_at: row.get(11)?,
            checker,
        };
        if predicate.matches(&report_row) {
            out.push(report_row);
        }
    }
    Ok(out)
}

pub fn summarize(rows: &[ReportRow]) -> ReportTotals {
    let mut totals = ReportTotals {
        total: rows.len(),
        ..ReportTotals::default()
    };
    for row in rows {
        match row.status {
            InspectionStatus::Pending => totals.pending += 1,
            InspectionStatus::Checked => totals.checked += 1,
        }
        if let Some(ref c) = row.checker {
            match c.verdict {
                CheckerVerdict::Approved => totals.approved += 1,
                CheckerVerdict::Rejected => totals.rejected += 1,
            }
            if !c.seal_matches {
                totals.seal_mismatches += 1;
            }
        }
        if row.has_failures() {
            totals.with_failures += 1;
        }
    }
    totals
}

fn tally_inspectors(rows: &[ReportRow]) -> Vec<InspectorTally> {
    let mut by_id: HashMap<&str, InspectorTally> = HashMap::new();
    for row in rows {
        let entry = by_id
            .entry(row.inspector_name_id.as_str())
            .or_insert_with(|| InspectorTally {
                inspector_name_id: row.inspector_name_id.clone(),
                inspector_name: row.inspector_name.clone(),
                total: 0,
                failures: 0,
            });
        entry.total += 1;
        if row.has_failures() {
            entry.failures += 1;
        }
    }
    let mut out: Vec<InspectorTally> = by_id.into_values().collect();
    out.sort_by(|a, b| {
        b.total
            .cmp(&a.total)
            .then_with(|| a.inspector_name.to_lowercase().cmp(&b.inspector_name.to_lowercase()))
    });
    out
}

fn tally_days(rows: &[ReportRow]) -> Vec<DayTally> {
    let mut by_day: BTreeMap<String, usize> = BTreeMap::new();
    for row in rows {
        let day = row.inspected_at.get(..10).unwrap_or(&row.inspected_at);
        *by_day.entry(day.to_string()).or_default() += 1;
    }
    by_day
        .into_iter()
        .map(|(date, total)| DayTally { date, total })
        .collect()
}

fn tally_failed_items(rows: &[ReportRow]) -> Vec<ItemTally> {
    let mut counts: HashMap<(Stage, &str), usize> = HashMap::new();
    for row in rows {
        for code in &row.failed_items {
            *counts.entry((Stage::Security, code.as_str())).or_default() += 1;
        }
        for code in row.checker.iter().flat_map(|c| c.failed_items.iter()) {
            *counts.entry((Stage::Checker, code.as_str())).or_default() += 1;
        }
    }
    let mut out: Vec<(usize, ItemTally)> = counts
        .into_iter()
        .map(|((stage, code), count)| {
            let (position, label) = find_item(code)
                .map(|(pos, item)| (pos, item.label.to_string()))
                .unwrap_or((usize::MAX, code.to_string()));
            (
                position,
                ItemTally {
                    stage,
                    item_code: code.to_string(),
                    label,
                    count,
                },
            )
        })
        .collect();
    out.sort_by(|(pa, a), (pb, b)| {
        b.count
            .cmp(&a.count)
            .then((a.stage == Stage::Checker).cmp(&(b.stage == Stage::Checker)))
            .then(pa.cmp(pb))
    });
    out.into_iter().map(|(_, tally)| tally).collect()
}

pub fn report_generate(
    pool: &DbPool,
    actor: &CurrentUser,
    filter: ReportFilter,
) -> Result<ReportDto, AppError> {
    actor.require(Permission::ViewReports)?;

    let rows = {
        let conn = get_connection(pool);
        collect_rows(&conn, &filter)?
    };

    Ok(ReportDto {
        generated_at: now_ts(),
        totals: summarize(&rows),
        by_inspector: tally_inspectors(&rows),
        by_day: tally_days(&rows),
        most_failed_items: tally_failed_items(&rows),
        filter,
        rows,
    })
}

//! Application use cases and transactions.

mod auth;
mod checker;
mod export;
mod inspector;
mod photo;
mod report;
mod security_check;
mod user;

use crate::error::AppError;
use chrono::{DateTime, Duration, NaiveDate, SecondsFormat, Utc};

pub use auth::{
    auth_change_password, auth_login, auth_logout, auth_resolve, bootstrap_admin,
    ChangePasswordReq, CurrentUser, LoginReq, LoginResult,
};
pub use checker::{
    checker_data_create, checker_data_get, checker_data_update, CheckerDataCreateReq,
    CheckerDataDto, CheckerDataUpdateReq,
};
pub use export::{
    export_backup_gz, export_checks_csv, export_json_string, ExportRoot, EXPORT_SCHEMA_VERSION,
};
pub use inspector::{
    inspector_name_create, inspector_name_delete, inspector_name_list, inspector_name_update,
    InspectorNameCreateReq, InspectorNameDto, InspectorNameUpdateReq,
};
pub use photo::{
    photo_delete, photo_fetch, photo_upload, PhotoDto, PhotoPolicy, PhotoUploadReq,
    ALLOWED_CONTENT_TYPES,
};
pub use report::{
    report_generate, DayTally, InspectorTally, ItemTally, ReportCheckerSummary, ReportDto,
    ReportFilter, ReportRow, ReportTotals,
};
pub use security_check::{
    security_check_create, security_check_delete, security_check_get, security_check_list,
    security_check_update, DeleteOutcome, ResponseDto, SecurityCheckCreateReq,
    SecurityCheckDetailDto, SecurityCheckListItemDto, SecurityCheckListPage,
    SecurityCheckListReq, SecurityCheckUpdateReq,
};
pub use user::{
    user_create, user_delete, user_get, user_list, user_update, UserCreateReq, UserDto,
    UserUpdateReq,
};

/// Current time as fixed-width RFC 3339 UTC (`2024-05-01T08:30:00.000Z`), so stored
/// timestamps sort as strings.
pub fn now_ts() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Accept any RFC 3339 timestamp and store it in the `now_ts` shape.
pub(crate) fn normalize_timestamp(raw: &str) -> Result<String, AppError> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|dt| {
            dt.with_timezone(&Utc)
                .to_rfc3339_opts(SecondsFormat::Millis, true)
        })
        .map_err(|_| AppError::Validation(format!("invalid timestamp: {}", raw)))
}

fn parse_date(raw: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("invalid date (expected YYYY-MM-DD): {}", raw)))
}

/// Turn inclusive `YYYY-MM-DD` bounds into a half-open timestamp range
/// `[from 00:00, day after to 00:00)`.
pub(crate) fn date_bounds(
    from: Option<&str>,
    to: Option<&str>,
) -> Result<(Option<String>, Option<String>), AppError> {
    let from = from
        .filter(|s| !s.trim().is_empty())
        .map(parse_date)
        .transpose()?;
    let to = to
        .filter(|s| !s.trim().is_empty())
        .map(parse_date)
        .transpose()?;

    if let (Some(f), Some(t)) = (from, to) {
        if f > t {
            return Err(AppError::Validation(format!(
                "from ({}) is after to ({})",
                f, t
            )));
        }
    }

    let start = from.map(|d| format!("{}T00:00:00.000Z", d.format("%Y-%m-%d")));
    let end = to
        .map(|d| d + Duration::days(1))
        .map(|d| format!("{}T00:00:00.000Z", d.format("%Y-%m-%d")));
    Ok((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_ts_is_fixed_width_utc() {
        let ts = now_ts();
        assert_eq!(ts.len(), 24);
        assert!(ts.ends_with('Z'));
    }

    #[test]
    fn timestamps_are_normalized_to_utc() {
        assert_eq!(
            normalize_timestamp("2024-05-01T10:30:00+02:00").unwrap(),
            "2024-05-01T08:30:00.000Z"
        );
        assert!(normalize_timestamp("yesterday").is_err());
    }

    #[test]
    fn date_bounds_are_half_open() {
        let (from, to) = date_bounds(Some("2024-02-28"), Some("2024-02-29")).unwrap();
        assert_eq!(from.as_deref(), Some("2024-02-28T00:00:00.000Z"));
        assert_eq!(to.as_deref(), Some("2024-03-01T00:00:00.000Z"));

        assert_eq!(date_bounds(None, Some("")).unwrap(), (None, None));
    }

    #[test]
    fn reversed_date_bounds_fail() {
        let err = date_bounds(Some("2024-03-02"), Some("2024-03-01")).unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
        assert!(date_bounds(Some("03/01/2024"), None).is_err());
    }
}

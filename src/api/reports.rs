use super::{AppState, Session};
use crate::app::{
    export_backup_gz, export_checks_csv, now_ts, report_generate, ReportDto, ReportFilter,
};
use crate::error::AppError;
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;

pub(super) async fn report(
    State(state): State<AppState>,
    session: Session,
    Query(filter): Query<ReportFilter>,
) -> Result<Json<ReportDto>, AppError> {
    state
        .blocking(move |pool| report_generate(pool, &session.user, filter))
        .await
        .map(Json)
}

fn attachment(name: &str, ext: &str) -> String {
    let day = now_ts().get(..10).unwrap_or_default().to_string();
    format!("attachment; filename=\"{}-{}.{}\"", name, day, ext)
}

pub(super) async fn export_csv(
    State(state): State<AppState>,
    session: Session,
    Query(filter): Query<ReportFilter>,
) -> Result<impl IntoResponse, AppError> {
    let csv = state
        .blocking(move |pool| export_checks_csv(pool, &session.user, &filter))
        .await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, attachment("security-checks", "csv")),
        ],
        csv,
    ))
}

pub(super) async fn export_backup(
    State(state): State<AppState>,
    session: Session,
) -> Result<impl IntoResponse, AppError> {
    let bytes = state
        .blocking(move |pool| export_backup_gz(pool, &session.user))
        .await?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/gzip".to_string()),
            (header::CONTENT_DISPOSITION, attachment("inspection-backup", "json.gz")),
        ],
        bytes,
    ))
}

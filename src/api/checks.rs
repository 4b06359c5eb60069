use super::{AppState, Payload, Session};
use crate::app::{
    checker_data_create, checker_data_update, security_check_create, security_check_delete,
    security_check_get, security_check_list, security_check_update, CheckerDataCreateReq,
    CheckerDataDto, CheckerDataUpdateReq, DeleteOutcome, SecurityCheckCreateReq,
    SecurityCheckDetailDto, SecurityCheckListPage, SecurityCheckListReq, SecurityCheckUpdateReq,
};
use crate::error::AppError;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

/// Query-string shape of [`SecurityCheckListReq`]; inspector ids come comma separated.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct CheckListQuery {
    pub status: Option<String>,
    pub container: Option<String>,
    pub inspector_name_ids: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl From<CheckListQuery> for SecurityCheckListReq {
    fn from(q: CheckListQuery) -> Self {
        let inspector_name_ids = q.inspector_name_ids.map(|ids| {
            ids.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        });
        Self {
            status: q.status,
            container: q.container,
            inspector_name_ids,
            from: q.from,
            to: q.to,
            limit: q.limit,
            offset: q.offset,
        }
    }
}

pub(super) async fn list(
    State(state): State<AppState>,
    session: Session,
    Query(q): Query<CheckListQuery>,
) -> Result<Json<SecurityCheckListPage>, AppError> {
    let req: SecurityCheckListReq = q.into();
    state
        .blocking(move |pool| security_check_list(pool, &session.user, req))
        .await
        .map(Json)
}

pub(super) async fn create(
    State(state): State<AppState>,
    session: Session,
    Payload(req): Payload<SecurityCheckCreateReq>,
) -> Result<(StatusCode, Json<SecurityCheckDetailDto>), AppError> {
    let check = state
        .blocking(move |pool| security_check_create(pool, &session.user, req))
        .await?;
    Ok((StatusCode::CREATED, Json(check)))
}

pub(super) async fn get_one(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> Result<Json<SecurityCheckDetailDto>, AppError> {
    state
        .blocking(move |pool| security_check_get(pool, &session.user, &id))
        .await
        .map(Json)
}

pub(super) async fn update(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
    Payload(req): Payload<SecurityCheckUpdateReq>,
) -> Result<Json<SecurityCheckDetailDto>, AppError> {
    state
        .blocking(move |pool| security_check_update(pool, &session.user, &id, req))
        .await
        .map(Json)
}

pub(super) async fn remove(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> Result<Json<DeleteOutcome>, AppError> {
    security_check_delete(&state.pool, state.store.as_ref(), &session.user, &id)
        .await
        .map(Json)
}

pub(super) async fn checker_create(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
    Payload(req): Payload<CheckerDataCreateReq>,
) -> Result<(StatusCode, Json<CheckerDataDto>), AppError> {
    let data = state
        .blocking(move |pool| checker_data_create(pool, &session.user, &id, req))
        .await?;
    Ok((StatusCode::CREATED, Json(data)))
}

pub(super) async fn checker_update(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
    Payload(req): Payload<CheckerDataUpdateReq>,
) -> Result<Json<CheckerDataDto>, AppError> {
    state
        .blocking(move |pool| checker_data_update(pool, &session.user, &id, req))
        .await
        .map(Json)
}

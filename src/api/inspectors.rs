use super::{AppState, Payload, Session};
use crate::app::{
    inspector_name_create, inspector_name_delete, inspector_name_list, inspector_name_update,
    InspectorNameCreateReq, InspectorNameDto, InspectorNameUpdateReq,
};
use crate::error::AppError;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct InspectorListQuery {
    /// Defaults to the active names shown in pickers.
    pub only_active: Option<bool>,
}

pub(super) async fn list(
    State(state): State<AppState>,
    session: Session,
    Query(q): Query<InspectorListQuery>,
) -> Result<Json<Vec<InspectorNameDto>>, AppError> {
    let only_active = q.only_active.unwrap_or(true);
    state
        .blocking(move |pool| inspector_name_list(pool, &session.user, only_active))
        .await
        .map(Json)
}

pub(super) async fn create(
    State(state): State<AppState>,
    session: Session,
    Payload(req): Payload<InspectorNameCreateReq>,
) -> Result<(StatusCode, Json<InspectorNameDto>), AppError> {
    let name = state
        .blocking(move |pool| inspector_name_create(pool, &session.user, req))
        .await?;
    Ok((StatusCode::CREATED, Json(name)))
}

pub(super) async fn update(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
    Payload(req): Payload<InspectorNameUpdateReq>,
) -> Result<Json<InspectorNameDto>, AppError> {
    state
        .blocking(move |pool| inspector_name_update(pool, &session.user, &id, req))
        .await
        .map(Json)
}

pub(super) async fn remove(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state
        .blocking(move |pool| inspector_name_delete(pool, &session.user, &id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

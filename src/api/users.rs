use super::{AppState, Payload, Session};
use crate::app::{
    user_create, user_delete, user_get, user_list, user_update, UserCreateReq, UserDto,
    UserUpdateReq,
};
use crate::error::AppError;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct UserListQuery {
    pub only_active: Option<bool>,
}

pub(super) async fn list(
    State(state): State<AppState>,
    session: Session,
    Query(q): Query<UserListQuery>,
) -> Result<Json<Vec<UserDto>>, AppError> {
    let only_active = q.only_active.unwrap_or(false);
    state
        .blocking(move |pool| user_list(pool, &session.user, only_active))
        .await
        .map(Json)
}

pub(super) async fn create(
    State(state): State<AppState>,
    session: Session,
    Payload(req): Payload<UserCreateReq>,
) -> Result<(StatusCode, Json<UserDto>), AppError> {
    let user = state
        .blocking(move |pool| user_create(pool, &session.user, req))
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub(super) async fn get_one(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> Result<Json<UserDto>, AppError> {
    state
        .blocking(move |pool| user_get(pool, &session.user, &id))
        .await
        .map(Json)
}

pub(super) async fn update(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
    Payload(req): Payload<UserUpdateReq>,
) -> Result<Json<UserDto>, AppError> {
    state
        .blocking(move |pool| user_update(pool, &session.user, &id, req))
        .await
        .map(Json)
}

pub(super) async fn remove(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state
        .blocking(move |pool| user_delete(pool, &session.user, &id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

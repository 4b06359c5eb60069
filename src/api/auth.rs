use super::session::{cleared_cookie, session_cookie};
use super::{AppState, Payload, Session};
use crate::app::{
    auth_change_password, auth_login, auth_logout, ChangePasswordReq, CurrentUser, LoginReq,
    LoginResult,
};
use crate::error::AppError;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;

pub(super) async fn login(
    State(state): State<AppState>,
    Payload(req): Payload<LoginReq>,
) -> Result<impl IntoResponse, AppError> {
    let username = req.username.clone();
    let ttl_hours = state.config.session.ttl_hours;
    let result: LoginResult = state
        .blocking(move |pool| auth_login(pool, req, ttl_hours))
        .await
        .inspect_err(|e| log::warn!("login failed for {}: {}", username, e.code()))?;
    let cookie = session_cookie(&state.config.session, &result.token);
    Ok(([(header::SET_COOKIE, cookie)], Json(result)))
}

pub(super) async fn logout(
    State(state): State<AppState>,
    session: Session,
) -> Result<impl IntoResponse, AppError> {
    let token = session.token.clone();
    state.blocking(move |pool| auth_logout(pool, &token)).await?;
    log::info!("{} signed out", session.user.username);
    Ok((
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, cleared_cookie(&state.config.session))],
    ))
}

pub(super) async fn me(session: Session) -> Json<CurrentUser> {
    Json(session.user)
}

pub(super) async fn change_password(
    State(state): State<AppState>,
    session: Session,
    Payload(req): Payload<ChangePasswordReq>,
) -> Result<StatusCode, AppError> {
    let Session { token, user } = session;
    state
        .blocking(move |pool| auth_change_password(pool, &user, Some(&token), req))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

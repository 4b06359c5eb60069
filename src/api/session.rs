//! Session cookie handling and the authenticated-caller extractor.

use super::AppState;
use crate::app::{auth_resolve, CurrentUser};
use crate::config::SessionConfig;
use crate::error::AppError;
use axum::extract::{FromRequestParts, Request};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::Response;

/// The caller behind the request's session token.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user: CurrentUser,
}

/// Cookie first, then `Authorization: Bearer`.
pub fn session_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let from_cookie = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == cookie_name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty());

    from_cookie.or_else(|| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    })
}

pub fn session_cookie(cfg: &SessionConfig, token: &str) -> String {
    format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}{}",
        cfg.cookie_name,
        token,
        cfg.ttl_hours * 3600,
        if cfg.secure { "; Secure" } else { "" }
    )
}

pub fn cleared_cookie(cfg: &SessionConfig) -> String {
    format!(
        "{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0{}",
        cfg.cookie_name,
        if cfg.secure { "; Secure" } else { "" }
    )
}

impl FromRequestParts<AppState> for Session {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // Already resolved by the admin gate.
        if let Some(session) = parts.extensions.get::<Session>() {
            return Ok(session.clone());
        }
        let token = session_token(&parts.headers, &state.config.session.cookie_name)
            .ok_or(AppError::Unauthorized)?;
        let lookup = token.clone();
        let user = state
            .blocking(move |pool| auth_resolve(pool, &lookup))
            .await?;
        Ok(Session { token, user })
    }
}

/// Route gate for the administrator-only surface.
pub(crate) async fn require_admin(
    session: Session,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !session.user.is_admin() {
        log::warn!(
            "{} ({}) denied {}",
            session.user.username,
            session.user.role.as_str(),
            request.uri().path()
        );
        return Err(AppError::Forbidden("administrators only".into()));
    }
    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}

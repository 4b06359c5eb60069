//! HTTP surface (axum). Handlers stay thin; rules live in `app`.

mod auth;
mod checks;
mod error;
mod inspectors;
mod middleware;
mod photos;
mod reports;
pub mod session;
mod users;

use crate::app::PhotoPolicy;
use crate::config::AppConfig;
use crate::domain::CHECKLIST;
use crate::error::AppError;
use crate::infra::{DbPool, PhotoStore};
use axum::extract::DefaultBodyLimit;
use axum::http::header;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;

pub use error::Payload;
pub use session::Session;

/// Multipart framing and the `stage` field on top of the photo itself.
const UPLOAD_OVERHEAD_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub pool: Arc<DbPool>,
    pub store: Arc<dyn PhotoStore>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(pool: DbPool, store: Arc<dyn PhotoStore>, config: AppConfig) -> Self {
        Self {
            pool: Arc::new(pool),
            store,
            config: Arc::new(config),
        }
    }

    /// Run a synchronous use case on the blocking pool. Password hashing and
    /// SQLite calls must not stall the async workers.
    pub async fn blocking<T, F>(&self, f: F) -> Result<T, AppError>
    where
        F: FnOnce(&DbPool) -> Result<T, AppError> + Send + 'static,
        T: Send + 'static,
    {
        let pool = Arc::clone(&self.pool);
        tokio::task::spawn_blocking(move || f(&pool))
            .await
            .map_err(|e| AppError::Db(format!("blocking task failed: {}", e)))?
    }

    pub fn photo_policy(&self) -> PhotoPolicy {
        PhotoPolicy {
            max_bytes: self.config.storage.max_photo_bytes,
            key_prefix: self.config.storage.prefix.clone(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let admin = Router::new()
        .route("/api/users", get(users::list).post(users::create))
        .route(
            "/api/users/{id}",
            get(users::get_one).patch(users::update).delete(users::remove),
        )
        .route("/api/reports", get(reports::report))
        .route("/api/export/checks.csv", get(reports::export_csv))
        .route("/api/export/backup.json.gz", get(reports::export_backup))
        .route_layer(from_fn_with_state(state.clone(), session::require_admin));

    let body_limit = state.config.storage.max_photo_bytes + UPLOAD_OVERHEAD_BYTES;

    Router::new()
        .route("/health", get(health))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/password", post(auth::change_password))
        .route("/api/checklist", get(checklist))
        .route(
            "/api/inspector-names",
            get(inspectors::list).post(inspectors::create),
        )
        .route(
            "/api/inspector-names/{id}",
            axum::routing::patch(inspectors::update).delete(inspectors::remove),
        )
        .route(
            "/api/security-checks",
            get(checks::list).post(checks::create),
        )
        .route(
            "/api/security-checks/{id}",
            get(checks::get_one)
                .patch(checks::update)
                .delete(checks::remove),
        )
        .route(
            "/api/security-checks/{id}/checker-data",
            post(checks::checker_create).patch(checks::checker_update),
        )
        .route("/api/security-checks/{id}/photos", post(photos::upload))
        .route("/api/photos/{id}", get(photos::fetch).delete(photos::remove))
        .merge(admin)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(from_fn(middleware::log_requests))
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> impl IntoResponse {
    (
        [(header::CACHE_CONTROL, "no-store")],
        Json(HealthResponse {
            status: "up",
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChecklistItemDto {
    position: usize,
    code: &'static str,
    label: &'static str,
}

async fn checklist(_session: Session) -> Json<Vec<ChecklistItemDto>> {
    Json(
        CHECKLIST
            .iter()
            .enumerate()
            .map(|(position, item)| ChecklistItemDto {
                position,
                code: item.code,
                label: item.label,
            })
            .collect(),
    )
}

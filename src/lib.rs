pub mod api;
pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod infra;

use crate::config::{AppConfig, StorageConfig};
use crate::error::StartupError;
use crate::infra::{init_db, MemoryPhotoStore, PhotoStore, S3PhotoStore};
use std::net::SocketAddr;
use std::sync::Arc;

fn given(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// S3 when a bucket is configured, process memory otherwise. A custom endpoint
/// needs both keys.
pub async fn build_store(cfg: &StorageConfig) -> Result<Arc<dyn PhotoStore>, StartupError> {
    if cfg.bucket.trim().is_empty() {
        log::warn!("no storage bucket configured; photos are kept in memory only");
        return Ok(Arc::new(MemoryPhotoStore::new()));
    }
    let bucket = cfg.bucket.trim().to_string();
    let Some(endpoint) = given(&cfg.endpoint) else {
        return Ok(Arc::new(S3PhotoStore::new(bucket).await));
    };
    match (given(&cfg.access_key), given(&cfg.secret_key)) {
        (Some(access_key), Some(secret_key)) => Ok(Arc::new(
            S3PhotoStore::new_with_endpoint(bucket, endpoint, access_key, secret_key).await,
        )),
        _ => Err(StartupError::Config(::config::ConfigError::Message(format!(
            "storage.endpoint {} needs storage.access_key and storage.secret_key",
            endpoint
        )))),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    log::info!("shutting down");
}

pub async fn run() -> Result<(), StartupError> {
    let cfg = AppConfig::load()?;

    log::info!("DB path: {:?}", cfg.database.path);
    let pool = init_db(&cfg.database.path).inspect_err(|e| log::error!("DB init failed: {}", e))?;

    if cfg.bootstrap.admin_password.is_empty() {
        log::debug!("no bootstrap password configured");
    } else {
        app::bootstrap_admin(
            &pool,
            &cfg.bootstrap.admin_username,
            &cfg.bootstrap.admin_password,
        )?;
    }

    let store = build_store(&cfg.storage).await?;
    log::info!("photo store: {}", store.describe());

    let addr = SocketAddr::new(cfg.server.address, cfg.server.port);
    let state = api::AppState::new(pool, store, cfg);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("listening on {}", addr);

    axum::serve(listener, api::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

use super::{AppState, Session};
use crate::app::{photo_delete, photo_fetch, photo_upload, PhotoDto, PhotoUploadReq};
use crate::domain::Stage;
use crate::error::AppError;
use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;

fn malformed(e: impl std::fmt::Display) -> AppError {
    AppError::Validation(format!("malformed upload: {}", e))
}

/// Multipart form with a `stage` text field and a `file` part.
pub(super) async fn upload(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<PhotoDto>), AppError> {
    let mut stage: Option<Stage> = None;
    let mut file: Option<(String, String, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "stage" => {
                let raw = field.text().await.map_err(malformed)?;
                let parsed = Stage::from_str(&raw.trim().to_ascii_uppercase())
                    .ok_or_else(|| AppError::Validation(format!("unknown stage: {}", raw)))?;
                stage = Some(parsed);
            }
            "file" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(malformed)?;
                file = Some((file_name, content_type, bytes.to_vec()));
            }
            _ => {}
        }
    }

    let stage = stage.ok_or_else(|| AppError::Validation("stage is required".into()))?;
    let (file_name, content_type, bytes) =
        file.ok_or_else(|| AppError::Validation("file is required".into()))?;

    let req = PhotoUploadReq {
        security_check_id: id,
        stage,
        file_name,
        content_type,
        bytes,
    };
    let photo = photo_upload(
        &state.pool,
        state.store.as_ref(),
        &state.photo_policy(),
        &session.user,
        req,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(photo)))
}

pub(super) async fn fetch(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let (photo, object) = photo_fetch(&state.pool, state.store.as_ref(), &session.user, &id).await?;
    let content_type = if object.content_type.is_empty() {
        photo.content_type
    } else {
        object.content_type
    };
    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, "private, max-age=3600".to_string()),
        ],
        object.bytes,
    ))
}

pub(super) async fn remove(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    photo_delete(&state.pool, state.store.as_ref(), &session.user, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

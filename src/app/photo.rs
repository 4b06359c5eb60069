//! Photo use cases. Objects live in the photo store; rows in `photos` index them.

use crate::app::auth::CurrentUser;
use crate::app::now_ts;
use crate::app::security_check::{ensure_visible, load_header};
use crate::domain::{InspectionStatus, Permission, Stage};
use crate::error::AppError;
use crate::infra::{get_connection, DbPool, PhotoStore, StoredObject};
use rusqlite::{params, Connection};
use serde::Serialize;
use uuid::Uuid;

pub const ALLOWED_CONTENT_TYPES: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/webp", "webp"),
    ("image/heic", "heic"),
];

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoDto {
    pub id: String,
    pub security_check_id: String,
    pub stage: Stage,
    #[serde(skip_serializing)]
    pub object_key: String,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub uploaded_by: String,
    pub uploaded_by_name: String,
    pub created_at: String,
}

#[derive(Debug)]
pub struct PhotoUploadReq {
    pub security_check_id: String,
    pub stage: Stage,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Size ceiling and key prefix, taken from the storage configuration.
#[derive(Debug, Clone)]
pub struct PhotoPolicy {
    pub max_bytes: usize,
    pub key_prefix: String,
}

impl PhotoPolicy {
    fn object_key(&self, check_id: &str, stage: Stage, photo_id: &str, ext: &str) -> String {
        format!(
            "{}security-checks/{}/{}/{}.{}",
            self.key_prefix,
            check_id,
            stage.path_segment(),
            photo_id,
            ext
        )
    }
}

const PHOTO_SELECT: &str = "SELECT p.id, p.security_check_id, p.stage, p.object_key, p.file_name, p.content_type,
            p.size_bytes, p.uploaded_by, COALESCE(u.display_name, '?'), p.created_at
     FROM photos p LEFT JOIN users u ON u.id = p.uploaded_by";

fn map_photo(r: &rusqlite::Row<'_>) -> rusqlite::Result<PhotoDto> {
    let stage: String = r.get(2)?;
    Ok(PhotoDto {
        id: r.get(0)?,
        security_check_id: r.get(1)?,
        stage: Stage::from_str(&stage).unwrap_or(Stage::Security),
        object_key: r.get(3)?,
        file_name: r.get(4)?,
        content_type: r.get(5)?,
        size_bytes: r.get(6)?,
        uploaded_by: r.get(7)?,
        uploaded_by_name: r.get(8)?,
        created_at: r.get(9)?,
    })
}

pub(crate) fn load_photos(conn: &Connection, check_id: &str) -> Result<Vec<PhotoDto>, AppError> {
    let mut stmt = conn.prepare(&format!(
        "{} WHERE p.security_check_id = ?1 ORDER BY p.created_at, p.id",
        PHOTO_SELECT
    ))?;
    let rows = stmt.query_map([check_id], map_photo)?;
    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

fn load_photo(conn: &Connection, photo_id: &str) -> Result<PhotoDto, AppError> {
    conn.query_row(
        &format!("{} WHERE p.id = ?1", PHOTO_SELECT),
        [photo_id],
        map_photo,
    )
    .map_err(|_| AppError::NotFound(format!("photo {}", photo_id)))
}

fn extension_for(content_type: &str) -> Option<&'static str> {
    ALLOWED_CONTENT_TYPES
        .iter()
        .find(|(ct, _)| *ct == content_type)
        .map(|(_, ext)| *ext)
}

fn clean_file_name(raw: &str, ext: &str) -> String {
    let base = raw
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or("")
        .trim()
        .chars()
        .filter(|c| !c.is_control())
        .take(255)
        .collect::<String>();
    if base.is_empty() {
        format!("photo.{}", ext)
    } else {
        base
    }
}

/// Who may attach a photo to which stage, evaluated against the current row.
fn authorize_upload(conn: &Connection, actor: &CurrentUser, check_id: &str, stage: Stage) -> Result<(), AppError> {
    let header = load_header(conn, check_id)?;
    ensure_visible(actor, &header)?;
    match stage {
        Stage::Security => {
            actor.require(Permission::CreateSecurityCheck)?;
            if !actor.is_admin() && header.created_by != actor.id {
                return Err(AppError::Forbidden(
                    "only the recording officer may add security photos".into(),
                ));
            }
            if header.status == InspectionStatus::Checked {
                return Err(AppError::CheckLocked);
            }
        }
        Stage::Checker => actor.require(Permission::CreateCheckerData)?,
    }
    Ok(())
}

fn check_upload_allowed(pool: &DbPool, actor: &CurrentUser, check_id: &str, stage: Stage) -> Result<(), AppError> {
    let conn = get_connection(pool);
    authorize_upload(&conn, actor, check_id, stage)
}

fn insert_photo_row(pool: &DbPool, actor: &CurrentUser, photo: &PhotoDto) -> Result<PhotoDto, AppError> {
    let conn = get_connection(pool);
    // The check may have been closed or deleted while the object was uploading.
    authorize_upload(&conn, actor, &photo.security_check_id, photo.stage)?;
    conn.execute(
        "INSERT INTO photos (id, security_check_id, stage, object_key, file_name, content_type, size_bytes, uploaded_by, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            &photo.id,
            &photo.security_check_id,
            photo.stage.as_str(),
            &photo.object_key,
            &photo.file_name,
            &photo.content_type,
            photo.size_bytes,
            &actor.id,
            &photo.created_at
        ],
    )?;
    load_photo(&conn, &photo.id)
}

pub async fn photo_upload(
    pool: &DbPool,
    store: &dyn PhotoStore,
    policy: &PhotoPolicy,
    actor: &CurrentUser,
    req: PhotoUploadReq,
) -> Result<PhotoDto, AppError> {
    let content_type = req.content_type.trim().to_ascii_lowercase();
    let ext = extension_for(&content_type).ok_or_else(|| {
        AppError::Validation(format!("unsupported photo type: {}", content_type))
    })?;
    if req.bytes.is_empty() {
        return Err(AppError::Validation("photo is empty".into()));
    }
    if req.bytes.len() > policy.max_bytes {
        return Err(AppError::Validation(format!(
            "photo exceeds {} bytes",
            policy.max_bytes
        )));
    }

    check_upload_allowed(pool, actor, &req.security_check_id, req.stage)?;

    let photo_id = Uuid::new_v4().to_string();
    let object_key = policy.object_key(&req.security_check_id, req.stage, &photo_id, ext);
    let pending = PhotoDto {
        id: photo_id,
        security_check_id: req.security_check_id,
        stage: req.stage,
        object_key,
        file_name: clean_file_name(&req.file_name, ext),
        content_type,
        size_bytes: req.bytes.len() as i64,
        uploaded_by: actor.id.clone(),
        uploaded_by_name: actor.display_name.clone(),
        created_at: now_ts(),
    };

    store
        .put(&pending.object_key, req.bytes, &pending.content_type)
        .await?;

    match insert_photo_row(pool, actor, &pending) {
        Ok(saved) => {
            log::info!(
                "{} attached {} photo {} to {}",
                actor.username,
                saved.stage.as_str(),
                saved.id,
                saved.security_check_id
            );
            Ok(saved)
        }
        Err(e) => {
            if let Err(cleanup) = store.delete(&pending.object_key).await {
                log::warn!(
                    "orphaned photo object {} after failed insert: {}",
                    pending.object_key,
                    cleanup
                );
            }
            Err(e)
        }
    }
}

fn load_visible_photo(pool: &DbPool, actor: &CurrentUser, photo_id: &str) -> Result<PhotoDto, AppError> {
    let conn = get_connection(pool);
    let photo = load_photo(&conn, photo_id)?;
    let header = load_header(&conn, &photo.security_check_id)?;
    ensure_visible(actor, &header)?;
    Ok(photo)
}

pub async fn photo_fetch(
    pool: &DbPool,
    store: &dyn PhotoStore,
    actor: &CurrentUser,
    photo_id: &str,
) -> Result<(PhotoDto, StoredObject), AppError> {
    let photo = load_visible_photo(pool, actor, photo_id)?;
    let object = store.get(&photo.object_key).await?;
    Ok((photo, object))
}

fn delete_photo_row(pool: &DbPool, actor: &CurrentUser, photo_id: &str) -> Result<PhotoDto, AppError> {
    let conn = get_connection(pool);
    let photo = load_photo(&conn, photo_id)?;
    let header = load_header(&conn, &photo.security_check_id)?;
    ensure_visible(actor, &header)?;
    if !actor.is_admin() && photo.uploaded_by != actor.id {
        return Err(AppError::Forbidden(
            "only the uploader may remove a photo".into(),
        ));
    }
    if photo.stage == Stage::Security && header.status == InspectionStatus::Checked {
        return Err(AppError::CheckLocked);
    }
    conn.execute("DELETE FROM photos WHERE id = ?1", [photo_id])?;
    Ok(photo)
}

/// Row first, then the object; a failed object delete only leaves an orphan.
pub async fn photo_delete(
    pool: &DbPool,
    store: &dyn PhotoStore,
    actor: &CurrentUser,
    photo_id: &str,
) -> Result<(), AppError> {
    let photo = delete_photo_row(pool, actor, photo_id)?;
    if let Err(e) = store.delete(&photo.object_key).await {
        log::warn!("photo object {} not removed: {}", photo.object_key, e);
    }
    log::info!("{} removed photo {}", actor.username, photo.id);
    Ok(())
}

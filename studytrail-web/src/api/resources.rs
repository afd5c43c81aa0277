//! Resource upload and deletion
//!
//! Uploaded files land under `<root>/uploads/<user guid>/` with a
//! timestamp-prefixed, sanitized filename; the stored URL is
//! server-relative and served by the static file route.

use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use serde_json::json;
use studytrail_common::config::uploads_dir;

use crate::api::session_middleware::CurrentUser;
use crate::db::chapters::load_chapter;
use crate::db::resources::{create_resource, delete_resource as remove_resource, load_resource};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// POST /api/resources/upload
pub async fn upload(
    State(state): State<AppState>,
    user: CurrentUser,
    mut multipart: Multipart,
) -> ApiResult<Json<serde_json::Value>> {
    let mut title: Option<String> = None;
    let mut chapter_id: Option<String> = None;
    let mut file: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        match field.name() {
            Some("title") => {
                title = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiError::BadRequest(format!("Invalid title field: {}", e)))?,
                );
            }
            Some("chapter_id") => {
                chapter_id = Some(field.text().await.map_err(|e| {
                    ApiError::BadRequest(format!("Invalid chapter_id field: {}", e))
                })?);
            }
            Some("file") => {
                let filename = field.file_name().unwrap_or("upload.pdf").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Invalid file field: {}", e)))?;
                file = Some((filename, bytes.to_vec()));
            }
            _ => {}
        }
    }

    let title = title.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
    let (title, chapter_id, (filename, bytes)) = match (title, chapter_id, file) {
        (Some(t), Some(c), Some(f)) => (t, c, f),
        _ => {
            return Err(ApiError::BadRequest(
                "Missing required fields: file, title, chapter_id".to_string(),
            ))
        }
    };

    if bytes.is_empty() {
        return Err(ApiError::BadRequest("Uploaded file is empty".to_string()));
    }
    if bytes.len() > state.upload_max_bytes {
        return Err(ApiError::BadRequest(format!(
            "File exceeds the {} byte upload limit",
            state.upload_max_bytes
        )));
    }

    // Verify chapter belongs to the caller's subject
    load_chapter(&state.db, &user.user_id, &chapter_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Chapter not found".to_string()))?;

    // Unique name: epoch millis prefix + sanitized original name
    let stored_name = format!(
        "{}-{}",
        chrono::Utc::now().timestamp_millis(),
        sanitize_filename(&filename)
    );

    let user_dir = uploads_dir(&state.root_folder).join(&user.user_id);
    tokio::fs::create_dir_all(&user_dir)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to create upload dir: {}", e)))?;

    let dest = user_dir.join(&stored_name);
    tokio::fs::write(&dest, &bytes)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to write upload: {}", e)))?;

    let url = format!("/uploads/{}/{}", user.user_id, stored_name);
    let resource = create_resource(&state.db, &chapter_id, &title, "pdf", &url).await?;

    tracing::info!(resource = %resource.guid, bytes = bytes.len(), "Stored upload");

    Ok(Json(json!({
        "success": true,
        "resource": resource,
    })))
}

/// DELETE /api/resources/:resource_id
pub async fn delete_resource(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(resource_id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let resource = load_resource(&state.db, &user.user_id, &resource_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Resource not found".to_string()))?;

    remove_resource(&state.db, &resource.guid).await?;

    // Best-effort unlink; the row is already gone
    if let Some(relative) = resource.url.strip_prefix("/uploads/") {
        let path = uploads_dir(&state.root_folder).join(relative);
        if let Err(e) = tokio::fs::remove_file(&path).await {
            tracing::warn!("Failed to remove uploaded file {}: {}", path.display(), e);
        }
    }

    Ok(Json(json!({ "success": true })))
}

/// Replace anything outside `[A-Za-z0-9.-]` with underscores
fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.is_empty() {
        "upload.pdf".to_string()
    } else {
        cleaned
    }
}

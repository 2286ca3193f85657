use axum::{Extension, Json, body::Bytes, extract::State, http::StatusCode, response::IntoResponse};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use carelink_types::api::{BlobResponse, Claims};

use crate::auth::AppState;
use crate::error::ApiError;

/// 50 MB upload limit for media blobs
pub const MAX_BLOB_SIZE: usize = 50 * 1024 * 1024;

/// Accepts raw bytes, writes `{media_dir}/{uuid}`, returns the storage path
/// a subsequent media upload call refers to. The directory is also served
/// statically under /uploads.
pub async fn upload_blob(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
    bytes: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    if bytes.is_empty() {
        return Err(ApiError::Validation { field: "blob", reason: "must not be empty" });
    }
    if bytes.len() > MAX_BLOB_SIZE {
        return Err(ApiError::BlobTooLarge);
    }

    let blob_id = Uuid::new_v4().to_string();
    let size = bytes.len() as u64;

    tokio::fs::create_dir_all(&state.media_dir)
        .await
        .map_err(|e| anyhow::anyhow!("failed to create media directory: {}", e))?;

    let path = state.media_dir.join(&blob_id);
    let mut file = tokio::fs::File::create(&path)
        .await
        .map_err(|e| anyhow::anyhow!("failed to create blob {}: {}", path.display(), e))?;
    file.write_all(&bytes)
        .await
        .map_err(|e| anyhow::anyhow!("failed to write blob {}: {}", path.display(), e))?;

    Ok((
        StatusCode::CREATED,
        Json(BlobResponse {
            blob_path: format!("uploads/{}", blob_id),
            size,
        }),
    ))
}

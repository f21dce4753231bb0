/// Tag registration API routes
///
/// The reader operations here are blocking serial I/O, so they run on the
/// blocking pool while the request handler awaits.
use crate::{
    error::{Result, ServerError},
    state::AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tagbox_nfc::registrar;

/// How long registration waits for the user to present a tag.
const TAG_WAIT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
pub struct TagListResponse {
    /// uid (uppercase hex) → registered filename
    pub tags: HashMap<String, String>,
}

/// GET /api/tags - List registered tags
pub async fn list_tags(State(app_state): State<AppState>) -> Json<TagListResponse> {
    Json(TagListResponse {
        tags: app_state.registry.list().await,
    })
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub song: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub uid: String,
    pub song: String,
    pub hash: String,
}

/// POST /api/tags/register - Link a presented tag to a song
///
/// Computes the song's content hash, waits for a tag, burns the hash into
/// the tag's user memory, and records the uid → song pair.
pub async fn register_tag(
    State(app_state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>> {
    // Validates the filename as a side effect.
    app_state.library.path_of(&request.song)?;
    let hash = app_state.library.hash_of(&request.song).await?;

    let link = Arc::clone(&app_state.link);
    let write_hash = hash.clone();
    let uid = tokio::task::spawn_blocking(move || {
        registrar::write_hash_to_tag(link.as_ref(), &write_hash, TAG_WAIT)
    })
    .await
    .map_err(|e| ServerError::Internal(format!("registration task failed: {e}")))??;

    let uid_hex = uid.to_string();
    app_state
        .registry
        .insert(uid_hex.clone(), request.song.clone())
        .await?;

    Ok(Json(RegisterResponse {
        uid: uid_hex,
        song: request.song,
        hash: hash.to_string(),
    }))
}

#[derive(Debug, Serialize)]
pub struct ScanResponse {
    pub uid: Option<String>,
}

/// GET /api/tags/scan - One-shot UID scan of a presented tag
pub async fn scan_uid(State(app_state): State<AppState>) -> Result<Json<ScanResponse>> {
    let link = Arc::clone(&app_state.link);
    let uid = tokio::task::spawn_blocking(move || {
        registrar::scan_uid_once(link.as_ref(), TAG_WAIT)
    })
    .await
    .map_err(|e| ServerError::Internal(format!("scan task failed: {e}")))??;

    Ok(Json(ScanResponse {
        uid: uid.map(|u| u.to_string()),
    }))
}

/// DELETE /api/tags/:uid - Forget a tag registration
pub async fn delete_tag(
    State(app_state): State<AppState>,
    Path(uid): Path<String>,
) -> Result<StatusCode> {
    app_state.registry.remove(&uid).await?;
    Ok(StatusCode::NO_CONTENT)
}

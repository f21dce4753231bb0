/// Music library API routes
use crate::{
    error::{Result, ServerError},
    state::AppState,
};
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct LibraryResponse {
    pub songs: Vec<String>,
}

/// GET /api/library - List library songs
pub async fn list_songs(State(app_state): State<AppState>) -> Json<LibraryResponse> {
    Json(LibraryResponse {
        songs: app_state.library.list().await,
    })
}

/// POST /api/library - Upload one or more .mp3 files (multipart)
pub async fn upload_songs(
    State(app_state): State<AppState>,
    mut multipart: Multipart,
) -> Result<StatusCode> {
    let mut stored = 0usize;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Invalid multipart body: {e}")))?
    {
        let Some(filename) = field.file_name().map(ToString::to_string) else {
            continue;
        };
        let data = field
            .bytes()
            .await
            .map_err(|e| ServerError::BadRequest(format!("Invalid multipart body: {e}")))?;

        app_state.library.store(&filename, &data).await?;
        stored += 1;
    }

    if stored == 0 {
        return Err(ServerError::BadRequest(
            "No files in upload".to_string(),
        ));
    }
    Ok(StatusCode::CREATED)
}

/// DELETE /api/library/:filename - Remove a song from the library
pub async fn delete_song(
    State(app_state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<StatusCode> {
    app_state.library.remove(&filename).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Playback API routes
use crate::{error::Result, state::AppState};
use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use tagbox_nfc::TagLink;

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Song the playback slot is attributed to (may outlive the process)
    pub now_playing: Option<String>,
    /// Whether a player process is currently running
    pub playing: bool,
    /// Whether the tag reader link is up
    pub reader_connected: bool,
}

/// GET /api/status - Current playback and reader status
pub async fn status(State(app_state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        now_playing: app_state.player.now_playing().await,
        playing: app_state.player.is_active().await,
        reader_connected: app_state.link.is_connected(),
    })
}

#[derive(Debug, Serialize)]
pub struct PlayResponse {
    pub now_playing: String,
}

/// POST /api/playback/play/:filename - Start playing a library song
pub async fn play(
    State(app_state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Json<PlayResponse>> {
    let path = app_state.library.path_of(&filename)?;

    app_state.bluetooth.ensure_connected().await;
    app_state.player.play(&path, &filename).await?;

    Ok(Json(PlayResponse {
        now_playing: filename,
    }))
}

#[derive(Debug, Serialize)]
pub struct StopResponse {
    pub stopped: bool,
}

/// POST /api/playback/stop - Stop playback
///
/// The one and only stop entry point; tag removal goes through the same
/// player operation internally.
pub async fn stop(State(app_state): State<AppState>) -> Json<StopResponse> {
    let stopped = app_state.player.stop().await;
    Json(StopResponse { stopped })
}

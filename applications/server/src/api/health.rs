/// Health check API routes
use crate::state::AppState;
use axum::{extract::State, Json};
use serde::Serialize;
use tagbox_nfc::TagLink;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Whether the NFC reader link is currently up. The server keeps
    /// serving API requests while the reader reconnects.
    pub reader_connected: bool,
    pub bluetooth_enabled: bool,
}

/// GET /api/health - Health check with subsystem readiness
pub async fn health(State(app_state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        reader_connected: app_state.link.is_connected(),
        bluetooth_enabled: app_state.bluetooth.is_enabled(),
    })
}

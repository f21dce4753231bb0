/// Settings API routes
use crate::{error::Result, state::AppState};
use axum::{extract::State, Json};
use tagbox_core::Settings;

/// GET /api/settings - Current settings
pub async fn get_settings(State(app_state): State<AppState>) -> Json<Settings> {
    Json(app_state.settings.snapshot())
}

/// PUT /api/settings - Replace settings
///
/// Takes effect immediately: the loop session and the idle watchdog read
/// the live store on every cycle.
pub async fn update_settings(
    State(app_state): State<AppState>,
    Json(settings): Json<Settings>,
) -> Result<Json<Settings>> {
    app_state.settings.update(settings)?;
    Ok(Json(app_state.settings.snapshot()))
}

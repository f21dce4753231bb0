/// Bluetooth API routes
use crate::{
    error::Result,
    services::{BtDevice, BtStatus},
    state::AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct DevicesResponse {
    pub devices: Vec<BtDevice>,
}

/// GET /api/bluetooth/scan - Discover nearby devices (blocks for the scan
/// window)
pub async fn scan(State(app_state): State<AppState>) -> Result<Json<DevicesResponse>> {
    let devices = app_state.bluetooth.scan().await?;
    Ok(Json(DevicesResponse { devices }))
}

/// GET /api/bluetooth/devices - Known devices
pub async fn devices(State(app_state): State<AppState>) -> Result<Json<DevicesResponse>> {
    let devices = app_state.bluetooth.devices().await?;
    Ok(Json(DevicesResponse { devices }))
}

/// GET /api/bluetooth/connected - Currently connected devices
pub async fn connected(State(app_state): State<AppState>) -> Result<Json<DevicesResponse>> {
    let devices = app_state.bluetooth.connected().await?;
    Ok(Json(DevicesResponse { devices }))
}

#[derive(Debug, Serialize)]
pub struct InfoResponse {
    pub mac: String,
    pub status: BtStatus,
    pub info: String,
}

/// GET /api/bluetooth/info/:mac - Device details
pub async fn info(
    State(app_state): State<AppState>,
    Path(mac): Path<String>,
) -> Result<Json<InfoResponse>> {
    let info = app_state.bluetooth.info(&mac).await?;
    let status = app_state.bluetooth.status(&mac).await?;
    Ok(Json(InfoResponse { mac, status, info }))
}

/// POST /api/bluetooth/connect/:mac - Pair if needed and connect
pub async fn connect(
    State(app_state): State<AppState>,
    Path(mac): Path<String>,
) -> Result<StatusCode> {
    app_state.bluetooth.connect(&mac).await?;
    app_state.bluetooth.save_current_device(&mac)?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/bluetooth/disconnect/:mac
pub async fn disconnect(
    State(app_state): State<AppState>,
    Path(mac): Path<String>,
) -> Result<StatusCode> {
    app_state.bluetooth.disconnect(&mac).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/bluetooth/pair/:mac
pub async fn pair(
    State(app_state): State<AppState>,
    Path(mac): Path<String>,
) -> Result<StatusCode> {
    app_state.bluetooth.pair(&mac).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/bluetooth/trust/:mac
pub async fn trust(
    State(app_state): State<AppState>,
    Path(mac): Path<String>,
) -> Result<StatusCode> {
    app_state.bluetooth.trust(&mac).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/bluetooth/devices/:mac - Remove the device from the adapter
pub async fn remove(
    State(app_state): State<AppState>,
    Path(mac): Path<String>,
) -> Result<StatusCode> {
    app_state.bluetooth.remove(&mac).await?;
    app_state.bluetooth.remove_auto_connect(&mac)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
pub struct AutoConnectResponse {
    pub devices: Vec<String>,
}

/// GET /api/bluetooth/autoconnect - MACs tried at startup
pub async fn autoconnect_list(State(app_state): State<AppState>) -> Json<AutoConnectResponse> {
    Json(AutoConnectResponse {
        devices: app_state.bluetooth.auto_connect_devices(),
    })
}

/// POST /api/bluetooth/autoconnect/:mac
pub async fn autoconnect_add(
    State(app_state): State<AppState>,
    Path(mac): Path<String>,
) -> Result<StatusCode> {
    app_state.bluetooth.add_auto_connect(&mac)?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/bluetooth/autoconnect/:mac
pub async fn autoconnect_remove(
    State(app_state): State<AppState>,
    Path(mac): Path<String>,
) -> Result<StatusCode> {
    app_state.bluetooth.remove_auto_connect(&mac)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
pub struct CurrentDeviceResponse {
    pub mac: Option<String>,
}

/// GET /api/bluetooth/current - The speaker playback routes to
pub async fn current(State(app_state): State<AppState>) -> Json<CurrentDeviceResponse> {
    Json(CurrentDeviceResponse {
        mac: app_state.bluetooth.current_device(),
    })
}

/// PUT /api/bluetooth/current/:mac - Choose the playback speaker
pub async fn set_current(
    State(app_state): State<AppState>,
    Path(mac): Path<String>,
) -> Result<StatusCode> {
    app_state.bluetooth.save_current_device(&mac)?;
    Ok(StatusCode::NO_CONTENT)
}

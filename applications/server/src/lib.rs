//! Tagbox Server Library
//!
//! NFC tag jukebox: tag arrivals start playback, removals stop it, and a
//! JSON HTTP API manages the music library, tag registration, settings,
//! and the Bluetooth speaker.
//!
//! This library exposes the core components for testing purposes.

pub mod api;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod jobs;
pub mod services;
pub mod state;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};

// Re-export commonly used types for convenience
pub use config::ServerConfig;
pub use dispatch::Dispatcher;
pub use error::{Result, ServerError};
pub use services::{BluetoothService, MusicLibrary, TagRegistry};
pub use state::AppState;

/// Upload cap. Uploads carry whole audio files, so the default 2 MB body
/// limit is far too small.
const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

/// Build the full application router.
pub fn create_router(app_state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(api::health::health))
        .route("/status", get(api::playback::status))
        // Playback
        .route("/playback/play/:filename", post(api::playback::play))
        .route("/playback/stop", post(api::playback::stop))
        // Library
        .route(
            "/library",
            get(api::library::list_songs)
                .post(api::library::upload_songs)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/library/:filename", delete(api::library::delete_song))
        // Tags
        .route("/tags", get(api::tags::list_tags))
        .route("/tags/register", post(api::tags::register_tag))
        .route("/tags/scan", get(api::tags::scan_uid))
        .route("/tags/:uid", delete(api::tags::delete_tag))
        // Settings
        .route("/settings", get(api::settings::get_settings))
        .route("/settings", put(api::settings::update_settings))
        // Bluetooth
        .route("/bluetooth/scan", get(api::bluetooth::scan))
        .route("/bluetooth/devices", get(api::bluetooth::devices))
        .route("/bluetooth/devices/:mac", delete(api::bluetooth::remove))
        .route("/bluetooth/connected", get(api::bluetooth::connected))
        .route("/bluetooth/info/:mac", get(api::bluetooth::info))
        .route("/bluetooth/connect/:mac", post(api::bluetooth::connect))
        .route(
            "/bluetooth/disconnect/:mac",
            post(api::bluetooth::disconnect),
        )
        .route("/bluetooth/pair/:mac", post(api::bluetooth::pair))
        .route("/bluetooth/trust/:mac", post(api::bluetooth::trust))
        .route(
            "/bluetooth/autoconnect",
            get(api::bluetooth::autoconnect_list),
        )
        .route(
            "/bluetooth/autoconnect/:mac",
            post(api::bluetooth::autoconnect_add),
        )
        .route(
            "/bluetooth/autoconnect/:mac",
            delete(api::bluetooth::autoconnect_remove),
        )
        .route("/bluetooth/current", get(api::bluetooth::current))
        .route("/bluetooth/current/:mac", put(api::bluetooth::set_current));

    Router::new()
        .nest("/api", api_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(false)),
        )
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}

/// API route modules
pub mod bluetooth;
pub mod health;
pub mod library;
pub mod playback;
pub mod settings;
pub mod tags;

/// Server services
pub mod bluetooth;
pub mod library;
pub mod registry;

pub use bluetooth::{BluetoothService, BtDevice, BtStatus};
pub use library::MusicLibrary;
pub use registry::TagRegistry;

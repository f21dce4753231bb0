/// Background jobs
pub mod idle;

pub use idle::IdleWatchdog;

//! Background health polling and live health event delivery.

pub mod events;
pub mod monitor;

pub use events::{HealthEventBus, DEFAULT_WINDOW};
pub use monitor::{HealthMonitor, MonitorConfig};

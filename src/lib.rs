//! RideBridge - cycling power sensor bridge
//!
//! Receives power and cadence from an ANT+ power meter or a broadcasting
//! BLE bike, smooths it with a short moving average, and republishes it
//! once per second. An activity supervisor puts the device to sleep when
//! the sensor goes quiet or nobody is listening.

pub mod bridge;
pub mod metrics;
pub mod runtime;
pub mod sensors;
pub mod storage;

// Re-export commonly used types
pub use bridge::ActivityBridge;
pub use metrics::model::{CyclingData, CyclingDataModel};
pub use runtime::{RunOutcome, Supervisor};
pub use sensors::manager::DataSourceManager;
pub use storage::config::BridgeConfig;

//! Data source types shared by every acquisition backend.
//!
//! Defines the `DataSource` lifecycle contract, the transport events that
//! drive it, and the errors a backend can report to its owner.

use serde::{Deserialize, Serialize};
use std::time::Instant;
use thiserror::Error;

/// One (power, cadence) reading attributed to the configured target device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Sample {
    /// Power in watts
    pub power_watts: u16,
    /// Cadence in RPM
    pub cadence_rpm: u8,
}

impl Sample {
    /// Create a new sample.
    pub fn new(power_watts: u16, cadence_rpm: u8) -> Self {
        Self {
            power_watts,
            cadence_rpm,
        }
    }

    /// The zero sample used to mark data as stale.
    pub fn zero() -> Self {
        Self::default()
    }
}

/// Acquisition backend kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSourceKind {
    /// ANT+ bicycle power receiver (one channel bound to one device number)
    AntPlus,
    /// BLE advertisement scanner for a broadcasting bike
    KeiserBle,
}

impl std::fmt::Display for DataSourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataSourceKind::AntPlus => write!(f, "ANT+ Power"),
            DataSourceKind::KeiserBle => write!(f, "Keiser BLE"),
        }
    }
}

/// Callback invoked once per decoded sample.
pub type SampleCallback = Box<dyn FnMut(Sample) + Send>;

/// Configuration handed to a backend at `init`.
pub struct DataSourceConfig {
    /// Backend kind this configuration was built for
    pub kind: DataSourceKind,
    /// Paired device identifier
    pub device_id: u16,
    /// Where decoded samples go
    pub callback: SampleCallback,
}

impl std::fmt::Debug for DataSourceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataSourceConfig")
            .field("kind", &self.kind)
            .field("device_id", &self.device_id)
            .finish_non_exhaustive()
    }
}

/// Advertisement report delivered by the BLE scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvReport {
    /// Peer address as it arrives over the air (little-endian)
    pub peer_addr: [u8; 6],
    /// Raw advertising payload (AD structures)
    pub data: Vec<u8>,
}

/// Transport-level event delivered to the active backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RadioEvent {
    /// Broadcast data received on an ANT channel
    ChannelRx {
        channel: u8,
        device_number: u16,
        /// Signal strength in dBm, when the radio reports extended fields
        rssi: Option<i8>,
        payload: [u8; 8],
    },
    /// Channel gave up searching for its device
    ChannelSearchTimeout { channel: u8 },
    /// Channel was closed by the radio
    ChannelClosed { channel: u8 },
    /// A receive slot was missed
    ChannelRxFail { channel: u8 },
    /// Receive buffer overflowed
    ChannelRxOverflow { channel: u8 },
    /// BLE advertisement report
    Advertisement(AdvReport),
}

/// Loss-of-signal notification returned by a backend to its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalLost {
    /// Backend that lost its device
    pub kind: DataSourceKind,
}

/// Returned by a backend whose data has gone stale while it keeps listening.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceStale {
    /// Backend whose watchdog fired
    pub kind: DataSourceKind,
}

/// Lifecycle contract implemented by every acquisition backend.
pub trait DataSource: Send {
    /// Kind of this backend.
    fn kind(&self) -> DataSourceKind;

    /// Validate and store the configuration.
    fn init(&mut self, config: DataSourceConfig) -> Result<(), SourceError>;

    /// Begin seeking the configured device.
    fn start(&mut self) -> Result<(), SourceError>;

    /// Release the channel or listener. No-op when already stopped.
    fn stop(&mut self);

    /// Whether the backend currently believes it can receive data.
    fn is_active(&self) -> bool;

    /// Deliver one transport event. Returns `Some` when the device was lost.
    fn handle_event(&mut self, event: &RadioEvent, now: Instant) -> Option<SignalLost>;

    /// Time-driven housekeeping. Returns `Some` when the data just went stale.
    fn poll(&mut self, _now: Instant) -> Option<SourceStale> {
        None
    }
}

/// Error raised by a radio transport.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The requested channel is already assigned
    #[error("channel {0} already in use")]
    ChannelInUse(u8),

    /// Radio stack or scanner is disabled
    #[error("radio disabled")]
    Disabled,

    /// Any other radio failure
    #[error("radio error: {0}")]
    Other(String),
}

/// Errors that can occur in the data source subsystem.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Configuration rejected by the backend
    #[error("Invalid data source configuration: {0}")]
    InvalidConfig(String),

    /// Underlying radio could not be armed
    #[error("Transport unavailable: {0}")]
    TransportUnavailable(String),

    /// `start` called before a successful `init`
    #[error("Data source not initialized")]
    NotInitialized,

    /// Operation needs a selected backend
    #[error("No active data source")]
    NoActiveSource,

    /// New backend rejected its configuration
    #[error("Backend initialization failed: {0}")]
    BackendInitFailed(Box<SourceError>),

    /// New backend could not be started
    #[error("Backend start failed: {0}")]
    BackendStartFailed(Box<SourceError>),
}

impl From<TransportError> for SourceError {
    fn from(err: TransportError) -> Self {
        SourceError::TransportUnavailable(err.to_string())
    }
}

//! Bridge types: timing parameters, state and the collaborator traits the
//! supervisor drives.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Timing parameters of the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeTiming {
    /// Output tick period
    pub tick: Duration,
    /// Inactivity check period
    pub check: Duration,
    /// Age after which data is pushed as zero
    pub data_timeout: Duration,
    /// Idle time after which the device halts
    pub inactivity_timeout: Duration,
}

impl Default for BridgeTiming {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(1000),
            check: Duration::from_millis(2000),
            data_timeout: Duration::from_millis(3000),
            inactivity_timeout: Duration::from_millis(20000),
        }
    }
}

/// The two periodic timers owned by the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerId {
    /// Pushes a reading to the output sink
    OutputTick,
    /// Checks for inactivity
    InactivityCheck,
}

/// Lifecycle of the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BridgeState {
    /// Not forwarding data
    #[default]
    Stopped,
    /// Timers armed, output sink running
    Active,
    /// Output sink running, no timers; waiting for a sensor to be picked
    Setup,
    /// Low-power halt requested; terminal
    HaltedForSleep,
}

impl std::fmt::Display for BridgeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BridgeState::Stopped => write!(f, "Stopped"),
            BridgeState::Active => write!(f, "Active"),
            BridgeState::Setup => write!(f, "Setup"),
            BridgeState::HaltedForSleep => write!(f, "Halted for sleep"),
        }
    }
}

/// Activity bookkeeping, mutated only by the bridge's own handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityState {
    /// A consumer is attached to the output
    pub connected: bool,
    /// When the last sample arrived, if any
    pub last_sample_time: Option<Instant>,
    /// Last connect/disconnect edge, re-stamped while connected
    pub last_connection_time: Instant,
    /// Timers are armed and the sink is running
    pub bridge_active: bool,
    /// The source reported stale data and nothing nonzero arrived since
    pub stale: bool,
}

impl ActivityState {
    pub fn new(now: Instant) -> Self {
        Self {
            connected: false,
            last_sample_time: None,
            last_connection_time: now,
            bridge_active: false,
            stale: false,
        }
    }
}

/// Why the bridge halted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltReason {
    /// Connected, but the sensor went quiet
    NoData,
    /// Nobody connected for too long
    NoConsumer,
    /// The data source reported loss of signal
    SourceLost,
}

impl std::fmt::Display for HaltReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HaltReason::NoData => write!(f, "no data while connected"),
            HaltReason::NoConsumer => write!(f, "no consumer connected"),
            HaltReason::SourceLost => write!(f, "data source lost"),
        }
    }
}

/// Consumer-facing output (advertising plus notifications).
pub trait OutputSink: Send {
    /// Begin advertising and accepting consumers
    fn start(&mut self);

    /// Stop advertising and drop consumers
    fn stop(&mut self);

    /// Publish one reading. Dropped silently when nobody listens.
    fn push_reading(&mut self, power_watts: u16, cadence_rpm: u8);

    /// Publish the supply battery level.
    fn update_battery_level(&mut self, _percent: u8) {}

    /// Announce a sensor found while in setup mode.
    fn report_found_device(&mut self, _device_id: u16, _rssi: Option<i8>) {}
}

/// Sleep/wake primitive.
pub trait PowerControl: Send {
    /// Arm the external wake condition (e.g. the flywheel reed switch)
    fn arm_wake_source(&mut self);

    /// Enter the lowest power state. On hardware this does not return.
    fn enter_low_power_halt(&mut self);
}

/// Periodic timer service.
pub trait TimerDriver: Send {
    /// Register a timer. Called once per timer at bridge init.
    fn create(&mut self, timer: TimerId);

    /// Start (or restart) a repeating timer.
    fn arm(&mut self, timer: TimerId, period: Duration);

    /// Stop a timer. No-op if not armed.
    fn disarm(&mut self, timer: TimerId);
}

/// Errors from the bridge lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BridgeError {
    #[error("bridge already initialized")]
    AlreadyInitialized,

    #[error("bridge not initialized")]
    NotInitialized,

    #[error("bridge halted for sleep")]
    Halted,
}

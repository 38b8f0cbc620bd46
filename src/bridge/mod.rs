//! Activity bridge: forwards averaged data to the output sink and decides
//! when the device goes to sleep.
//!
//! Two repeating timers drive it. The output tick pushes the latest average,
//! or zeros once the data is older than the data timeout. The inactivity
//! check halts the device when nobody has connected for the inactivity
//! timeout, or when a connected consumer has seen no sample for that long.
//! Loss of the data source halts immediately.
//!
//! Setup mode keeps the output sink running without either timer, so the
//! device stays awake while a user picks a sensor.

pub mod clock;
pub mod types;

use crate::metrics::model::CyclingData;

pub use clock::{Clock, ManualClock, SystemClock};
pub use types::{
    ActivityState, BridgeError, BridgeState, BridgeTiming, HaltReason, OutputSink, PowerControl,
    TimerDriver, TimerId,
};

/// Power-state supervisor.
pub struct ActivityBridge {
    timing: BridgeTiming,
    clock: Box<dyn Clock>,
    sink: Box<dyn OutputSink>,
    power: Box<dyn PowerControl>,
    timers: Box<dyn TimerDriver>,
    activity: ActivityState,
    latest: CyclingData,
    state: BridgeState,
    initialized: bool,
    halt_reason: Option<HaltReason>,
}

impl ActivityBridge {
    /// Create a bridge. Nothing is armed until [`init`](Self::init) and
    /// [`start`](Self::start).
    pub fn new(
        timing: BridgeTiming,
        clock: Box<dyn Clock>,
        sink: Box<dyn OutputSink>,
        power: Box<dyn PowerControl>,
        timers: Box<dyn TimerDriver>,
    ) -> Self {
        let now = clock.now();
        Self {
            timing,
            clock,
            sink,
            power,
            timers,
            activity: ActivityState::new(now),
            latest: CyclingData::default(),
            state: BridgeState::Stopped,
            initialized: false,
            halt_reason: None,
        }
    }

    /// Create both timers and stamp the connection clock. Once per process.
    pub fn init(&mut self) -> Result<(), BridgeError> {
        if self.initialized {
            return Err(BridgeError::AlreadyInitialized);
        }

        self.timers.create(TimerId::OutputTick);
        self.timers.create(TimerId::InactivityCheck);
        self.activity = ActivityState::new(self.clock.now());
        self.initialized = true;

        tracing::info!("Activity bridge initialized");

        Ok(())
    }

    /// Start the output sink and arm both timers.
    ///
    /// From setup mode the sink is already running and only the timers are armed.
    pub fn start(&mut self) -> Result<(), BridgeError> {
        match self.state {
            BridgeState::HaltedForSleep => return Err(BridgeError::Halted),
            BridgeState::Active => return Ok(()),
            BridgeState::Stopped | BridgeState::Setup => {}
        }

        if !self.initialized {
            return Err(BridgeError::NotInitialized);
        }

        if self.state == BridgeState::Stopped {
            self.sink.start();
        }
        self.timers.arm(TimerId::OutputTick, self.timing.tick);
        self.timers.arm(TimerId::InactivityCheck, self.timing.check);

        self.activity.last_sample_time = None;
        self.activity.stale = false;
        self.activity.last_connection_time = self.clock.now();
        self.activity.bridge_active = true;
        self.latest = CyclingData::default();
        self.state = BridgeState::Active;

        tracing::info!(
            "Activity bridge started (tick {:?}, check {:?})",
            self.timing.tick,
            self.timing.check
        );

        Ok(())
    }

    /// Run the output sink with no timers armed. Nothing halts in this mode.
    pub fn enter_setup(&mut self) -> Result<(), BridgeError> {
        match self.state {
            BridgeState::HaltedForSleep => return Err(BridgeError::Halted),
            BridgeState::Setup => return Ok(()),
            BridgeState::Active => {
                self.timers.disarm(TimerId::OutputTick);
                self.timers.disarm(TimerId::InactivityCheck);
            }
            BridgeState::Stopped => {
                if !self.initialized {
                    return Err(BridgeError::NotInitialized);
                }
                self.sink.start();
            }
        }

        self.activity.bridge_active = false;
        self.state = BridgeState::Setup;

        tracing::warn!("Setup mode: no sensor paired, output stays on");

        Ok(())
    }

    /// Disarm both timers and stop the output sink. Safe at any time.
    pub fn stop(&mut self) {
        self.timers.disarm(TimerId::OutputTick);
        self.timers.disarm(TimerId::InactivityCheck);

        if matches!(self.state, BridgeState::Active | BridgeState::Setup) {
            self.sink.stop();
            self.activity.bridge_active = false;
            self.state = BridgeState::Stopped;
            tracing::info!("Activity bridge stopped");
        }
    }

    /// Record that data arrived.
    ///
    /// While the source is stale only a nonzero reading makes the data fresh
    /// again; the zero reading that announced the staleness does not.
    pub fn on_data(&mut self, data: CyclingData) {
        if self.is_halted() {
            return;
        }

        self.activity.last_sample_time = Some(self.clock.now());
        self.latest = data;

        let nonzero = data.instantaneous_power > 0 || data.instantaneous_cadence > 0;
        if self.activity.stale && nonzero {
            self.activity.stale = false;
            tracing::debug!("Data source fresh again");
        }

        tracing::debug!(
            "Bridge data updated - Power={} W, Cadence={} RPM",
            data.average_power,
            data.average_cadence
        );
    }

    /// A consumer attached or detached. Either edge counts as activity.
    pub fn on_connection_event(&mut self, connected: bool) {
        if self.is_halted() {
            return;
        }

        self.activity.connected = connected;
        self.activity.last_connection_time = self.clock.now();

        if connected {
            tracing::info!("Consumer connected");
        } else {
            tracing::info!("Consumer disconnected");
        }
    }

    /// The source stopped delivering but keeps listening: push zeros until it
    /// reports a nonzero reading again.
    pub fn on_data_stale(&mut self) {
        if self.is_halted() || self.activity.stale {
            return;
        }

        self.activity.stale = true;
        tracing::info!("Data source stale, output zeroed");
    }

    /// Forward a sensor found during discovery. Only meaningful in setup mode.
    pub fn report_found_device(&mut self, device_id: u16, rssi: Option<i8>) {
        if self.state == BridgeState::Setup {
            self.sink.report_found_device(device_id, rssi);
        }
    }

    /// The data source lost its device: halt without waiting for a timer.
    pub fn on_data_source_lost(&mut self) {
        self.halt(HaltReason::SourceLost);
    }

    /// Output tick handler.
    pub fn on_tick(&mut self) {
        if self.state != BridgeState::Active {
            return;
        }

        let now = self.clock.now();
        let fresh = !self.activity.stale
            && self
                .activity
                .last_sample_time
                .is_some_and(|t| now.saturating_duration_since(t) < self.timing.data_timeout);

        if fresh {
            tracing::trace!(
                "Pushing Power={} W, Cadence={} RPM",
                self.latest.average_power,
                self.latest.average_cadence
            );
            self.sink.push_reading(self.latest.average_power, self.latest.average_cadence);
        } else {
            tracing::trace!("Data stale, pushing zeros");
            self.sink.push_reading(0, 0);
        }
    }

    /// Inactivity check handler.
    pub fn on_inactivity_check(&mut self) {
        if self.state != BridgeState::Active {
            return;
        }

        let now = self.clock.now();
        let timeout = self.timing.inactivity_timeout;

        if self.activity.connected {
            self.activity.last_connection_time = now;

            if let Some(last) = self.activity.last_sample_time {
                if now.saturating_duration_since(last) >= timeout {
                    self.halt(HaltReason::NoData);
                }
            }
        } else if now.saturating_duration_since(self.activity.last_connection_time) >= timeout {
            self.halt(HaltReason::NoConsumer);
        }
    }

    /// Dispatch a timer expiry to its handler.
    pub fn on_timer(&mut self, timer: TimerId) {
        match timer {
            TimerId::OutputTick => self.on_tick(),
            TimerId::InactivityCheck => self.on_inactivity_check(),
        }
    }

    /// Publish the supply battery level through the output sink.
    pub fn update_battery_level(&mut self, percent: u8) {
        if matches!(self.state, BridgeState::Active | BridgeState::Setup) {
            self.sink.update_battery_level(percent);
        }
    }

    fn halt(&mut self, reason: HaltReason) {
        if self.is_halted() {
            return;
        }

        tracing::warn!("Entering low-power halt: {}", reason);

        self.timers.disarm(TimerId::OutputTick);
        self.timers.disarm(TimerId::InactivityCheck);
        if matches!(self.state, BridgeState::Active | BridgeState::Setup) {
            self.sink.stop();
        }

        self.activity.bridge_active = false;
        self.state = BridgeState::HaltedForSleep;
        self.halt_reason = Some(reason);

        self.power.arm_wake_source();
        self.power.enter_low_power_halt();
    }

    /// Current lifecycle state.
    pub fn state(&self) -> BridgeState {
        self.state
    }

    /// Whether the halt primitive has been invoked.
    pub fn is_halted(&self) -> bool {
        self.state == BridgeState::HaltedForSleep
    }

    /// Why the bridge halted, if it did.
    pub fn halt_reason(&self) -> Option<HaltReason> {
        self.halt_reason
    }

    /// Activity bookkeeping.
    pub fn activity(&self) -> &ActivityState {
        &self.activity
    }

    /// Timing parameters in use.
    pub fn timing(&self) -> &BridgeTiming {
        &self.timing
    }
}

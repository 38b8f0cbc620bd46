//! Hosted event loop.
//!
//! Radio callbacks, timers and the connection source all feed one queue.
//! The supervisor drains it on a single thread and owns every component,
//! so no component state is shared or locked.
//!
//! An ANT+ selection without a paired meter boots into setup mode: the
//! bridge runs without timers, discovery lists the meters in range and
//! [`Event::SelectDevice`] pairs one and starts normal operation.

pub mod loopback;
pub mod timers;

use crate::bridge::{
    ActivityBridge, BridgeError, BridgeState, BridgeTiming, Clock, OutputSink, PowerControl,
    TimerDriver,
};
use crate::metrics::model::{CyclingData, CyclingDataModel};
use crate::sensors::ant::AntDiscovery;
use crate::sensors::battery::BatteryMonitor;
use crate::sensors::manager::{BackendFactory, DataSourceManager, SampleSink};
use crate::sensors::types::{DataSourceKind, RadioEvent, Sample, SourceError};
use crossbeam::channel::{unbounded, Receiver, Sender};
use std::sync::Arc;
use thiserror::Error;

pub use timers::{spawn_ticker, TokioTimers};

/// Everything the supervisor reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Transport event for the active backend
    Radio(RadioEvent),
    /// Raw sample produced by the backend
    Sample(Sample),
    /// Fresh snapshot from the data model
    Data(CyclingData),
    /// Output tick timer fired
    Tick,
    /// Inactivity check timer fired
    InactivityCheck,
    /// Consumer attached (`true`) or detached (`false`)
    Connection(bool),
    /// Time-driven backend checks
    SourcePoll,
    /// Battery measurement due
    BatteryMeasure,
    /// Leave normal operation (if running) and list nearby power meters
    StartDiscovery,
    /// Pair with a discovered ANT+ device number and start collecting
    SelectDevice(u16),
    /// Stop the loop
    Shutdown,
}

/// Why [`Supervisor::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The bridge entered low-power halt
    Halted,
    /// Shutdown was requested
    Shutdown,
}

/// Unbounded single-consumer event queue.
pub struct EventQueue {
    tx: Sender<Event>,
    rx: Receiver<Event>,
}

impl EventQueue {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    /// A producer handle.
    pub fn sender(&self) -> Sender<Event> {
        self.tx.clone()
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Source selection applied at boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceSelection {
    pub kind: DataSourceKind,
    pub device_id: u16,
}

impl SourceSelection {
    /// ANT+ without a paired meter.
    pub fn is_setup_mode(&self) -> bool {
        self.kind == DataSourceKind::AntPlus && self.device_id == 0
    }
}

/// Collaborators handed to [`Supervisor::boot`].
pub struct Components<C> {
    pub factory: Box<dyn BackendFactory>,
    pub sink: Box<dyn OutputSink>,
    pub power: Box<dyn PowerControl>,
    pub timers: Box<dyn TimerDriver>,
    /// Shared by the bridge and backend timestamps
    pub clock: C,
    pub battery: Option<BatteryMonitor>,
    /// Wildcard ANT+ scan used in setup mode
    pub discovery: Option<AntDiscovery>,
}

/// Errors raised while booting.
#[derive(Debug, Error)]
pub enum BootError {
    #[error("data source: {0}")]
    Source(#[from] SourceError),

    #[error("bridge: {0}")]
    Bridge(#[from] BridgeError),
}

/// Owns the manager, model and bridge and dispatches events to them.
pub struct Supervisor {
    manager: DataSourceManager,
    model: CyclingDataModel,
    bridge: ActivityBridge,
    battery: Option<BatteryMonitor>,
    discovery: Option<AntDiscovery>,
    clock: Box<dyn Clock>,
    queue: EventQueue,
}

impl Supervisor {
    /// Wire the pipeline, select the source and start the bridge, or enter
    /// setup mode when no ANT+ meter is paired.
    pub fn boot<C>(
        selection: SourceSelection,
        timing: BridgeTiming,
        components: Components<C>,
        queue: EventQueue,
    ) -> Result<Self, BootError>
    where
        C: Clock + Clone + 'static,
    {
        let Components {
            factory,
            sink,
            power,
            timers,
            clock,
            battery,
            mut discovery,
        } = components;

        let data_tx = queue.sender();
        let mut model = CyclingDataModel::new();
        model.subscribe(Box::new(move |data| {
            if data_tx.send(Event::Data(data)).is_err() {
                tracing::debug!("Event queue closed, dropping data update");
            }
        }));

        let sample_tx = queue.sender();
        let sample_sink: SampleSink = Arc::new(move |sample| {
            if sample_tx.send(Event::Sample(sample)).is_err() {
                tracing::debug!("Event queue closed, dropping sample");
            }
        });

        let mut manager = DataSourceManager::new(factory, sample_sink);
        let mut bridge = ActivityBridge::new(timing, Box::new(clock.clone()), sink, power, timers);
        bridge.init()?;

        if selection.is_setup_mode() {
            bridge.enter_setup()?;
            match discovery.as_mut() {
                Some(scan) => scan.start()?,
                None => tracing::warn!("No ANT+ discovery available, waiting for a device id"),
            }
        } else {
            manager.set_source(selection.kind, selection.device_id)?;
            manager.start_collection(&mut model)?;
            bridge.start()?;
        }

        if battery.is_some() {
            // first reading right away, the periodic ticker follows
            if queue.sender().send(Event::BatteryMeasure).is_err() {
                tracing::debug!("Event queue closed, dropping battery request");
            }
        }

        tracing::info!("Supervisor booted with {} source ({})", selection.kind, bridge.state());

        Ok(Self {
            manager,
            model,
            bridge,
            battery,
            discovery,
            clock: Box::new(clock),
            queue,
        })
    }

    /// A producer handle for transports and the connection source.
    pub fn sender(&self) -> Sender<Event> {
        self.queue.sender()
    }

    /// Handle one event. Returns an outcome once the loop should end.
    pub fn dispatch(&mut self, event: Event) -> Option<RunOutcome> {
        match event {
            Event::Radio(radio) if self.in_setup() => {
                let found = self.discovery.as_mut().and_then(|d| d.handle_event(&radio));
                if let Some(device) = found {
                    self.bridge.report_found_device(device.device_id, device.rssi);
                }
            }
            Event::Radio(radio) => {
                let now = self.clock.now();
                if let Some(lost) = self.manager.handle_event(&radio, now) {
                    tracing::warn!("{} data source lost its device", lost.kind);
                    self.manager.stop_collection();
                    self.bridge.on_data_source_lost();
                }
            }
            Event::Sample(sample) => {
                self.manager.relay(sample, &mut self.model);
            }
            Event::Data(data) => self.bridge.on_data(data),
            Event::Tick => self.bridge.on_tick(),
            Event::InactivityCheck => self.bridge.on_inactivity_check(),
            Event::Connection(connected) => self.bridge.on_connection_event(connected),
            Event::SourcePoll => {
                let now = self.clock.now();
                if let Some(stale) = self.manager.poll(now) {
                    tracing::debug!("{} data source went quiet", stale.kind);
                    self.bridge.on_data_stale();
                }
            }
            Event::BatteryMeasure => {
                if let Some(level) = self.battery.as_mut().and_then(|b| b.measure()) {
                    self.bridge.update_battery_level(level);
                }
            }
            Event::StartDiscovery => self.start_discovery(),
            Event::SelectDevice(device_id) => self.select_device(device_id),
            Event::Shutdown => {
                tracing::info!("Shutdown requested");
                self.shutdown();
                return Some(RunOutcome::Shutdown);
            }
        }

        if self.bridge.is_halted() {
            self.manager.stop_collection();
            self.stop_discovery();
            return Some(RunOutcome::Halted);
        }

        None
    }

    /// Drain the queue until halt or shutdown.
    pub fn run(&mut self) -> RunOutcome {
        loop {
            let Ok(event) = self.queue.rx.recv() else {
                self.shutdown();
                return RunOutcome::Shutdown;
            };

            if let Some(outcome) = self.dispatch(event) {
                tracing::info!("Supervisor loop finished: {:?}", outcome);
                return outcome;
            }
        }
    }

    /// Process whatever is queued right now without blocking.
    pub fn drain(&mut self) -> Option<RunOutcome> {
        while let Ok(event) = self.queue.rx.try_recv() {
            if let Some(outcome) = self.dispatch(event) {
                return Some(outcome);
            }
        }
        None
    }

    fn shutdown(&mut self) {
        self.manager.stop_collection();
        self.stop_discovery();
        self.bridge.stop();
    }

    fn start_discovery(&mut self) {
        let Some(scan) = self.discovery.as_mut() else {
            tracing::warn!("Discovery requested but no ANT+ discovery is available");
            return;
        };

        if let Err(e) = self.bridge.enter_setup() {
            tracing::warn!("Cannot enter setup mode: {}", e);
            return;
        }

        self.manager.stop_collection();
        scan.stop();
        if let Err(e) = scan.start() {
            tracing::error!("ANT+ discovery failed to start: {}", e);
        }
    }

    fn stop_discovery(&mut self) {
        if let Some(scan) = self.discovery.as_mut() {
            scan.stop();
        }
    }

    fn select_device(&mut self, device_id: u16) {
        if !self.in_setup() {
            tracing::warn!("Device {} selected outside setup mode, ignoring", device_id);
            return;
        }

        if device_id == 0 {
            tracing::warn!("Wildcard device number cannot be paired");
            return;
        }

        self.stop_discovery();
        tracing::info!("Pairing with ANT+ power meter {}", device_id);

        let paired = self
            .manager
            .set_source(DataSourceKind::AntPlus, device_id)
            .and_then(|()| self.manager.start_collection(&mut self.model));

        if let Err(e) = paired {
            tracing::error!("Pairing with device {} failed: {}", device_id, e);
            self.manager.stop_collection();
            if let Some(Err(e)) = self.discovery.as_mut().map(|d| d.start()) {
                tracing::error!("ANT+ discovery failed to restart: {}", e);
            }
            return;
        }

        if let Err(e) = self.bridge.start() {
            tracing::error!("Bridge failed to start after pairing: {}", e);
        }
    }

    /// Whether the supervisor is waiting for a device to be picked.
    pub fn in_setup(&self) -> bool {
        self.bridge.state() == BridgeState::Setup
    }

    pub fn discovery(&self) -> Option<&AntDiscovery> {
        self.discovery.as_ref()
    }

    pub fn bridge(&self) -> &ActivityBridge {
        &self.bridge
    }

    pub fn manager(&self) -> &DataSourceManager {
        &self.manager
    }

    /// Latest model snapshot.
    pub fn latest_data(&self) -> CyclingData {
        self.manager.latest_data(&self.model)
    }
}

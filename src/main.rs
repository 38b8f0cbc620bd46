//! RideBridge - cycling power sensor bridge
//!
//! Main entry point. Without attached radio hardware the loopback
//! transports are used and a simulated power meter feeds the pipeline.

use anyhow::Context;
use ridebridge::bridge::SystemClock;
use ridebridge::runtime::loopback::{
    spawn_simulated_power_meter, FixedSupply, HostPower, LogSink, LoopbackAntRadio,
    LoopbackScanner,
};
use ridebridge::runtime::{
    spawn_ticker, Components, Event, EventQueue, RunOutcome, SourceSelection, Supervisor,
    TokioTimers,
};
use ridebridge::sensors::battery::BatteryMonitor;
use ridebridge::sensors::types::{DataSource, DataSourceKind};
use ridebridge::sensors::{AntDataSource, AntDiscovery, ScanDataSource};
use ridebridge::storage::config::load_config;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Raw ADC reading for two fresh AA cells (about 2.9 V)
const NOMINAL_SUPPLY_RAW: u16 = 825;

/// Device number of the simulated meter when none is paired
const SIMULATED_METER_ID: u16 = 12345;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting RideBridge v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config().context("loading configuration")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_time()
        .build()
        .context("starting timer runtime")?;
    let handle = runtime.handle().clone();

    let queue = EventQueue::new();

    let source = config.source.clone();
    let watchdog = config.timing.scan_watchdog();
    let factory = move |kind: DataSourceKind| -> Option<Box<dyn DataSource>> {
        match kind {
            DataSourceKind::AntPlus => Some(Box::new(AntDataSource::new(
                Box::new(LoopbackAntRadio),
                source.transmission_type,
            ))),
            DataSourceKind::KeiserBle => Some(Box::new(
                ScanDataSource::new(Box::new(LoopbackScanner::default()), source.target_address)
                    .with_watchdog(watchdog),
            )),
        }
    };

    let discovery = config
        .source
        .is_setup_mode()
        .then(|| AntDiscovery::new(Box::new(LoopbackAntRadio)));

    let battery = (config.battery.interval_secs > 0)
        .then(|| BatteryMonitor::new(Box::new(FixedSupply(NOMINAL_SUPPLY_RAW))));

    let components = Components {
        factory: Box::new(factory),
        sink: Box::new(LogSink::new(config.device.name.clone())),
        power: Box::new(HostPower::default()),
        timers: Box::new(TokioTimers::new(handle.clone(), queue.sender())),
        clock: SystemClock,
        battery,
        discovery,
    };

    let selection = SourceSelection {
        kind: config.source.kind,
        device_id: config.source.device_id,
    };

    let mut supervisor = Supervisor::boot(
        selection,
        config.timing.bridge_timing(),
        components,
        queue,
    )
    .context("booting supervisor")?;

    let events = supervisor.sender();
    let _poll = spawn_ticker(
        &handle,
        config.timing.source_poll(),
        events.clone(),
        Event::SourcePoll,
    );
    let _battery = (config.battery.interval_secs > 0).then(|| {
        spawn_ticker(
            &handle,
            Duration::from_secs(config.battery.interval_secs),
            events.clone(),
            Event::BatteryMeasure,
        )
    });

    if config.source.kind == DataSourceKind::AntPlus {
        let device_number = match config.source.device_id {
            0 => SIMULATED_METER_ID,
            id => id,
        };
        let _meter = spawn_simulated_power_meter(
            &handle,
            events.clone(),
            device_number,
            Duration::from_millis(250),
        );
    }

    match supervisor.run() {
        RunOutcome::Halted => {
            let reason = supervisor
                .bridge()
                .halt_reason()
                .map(|r| r.to_string())
                .unwrap_or_default();
            tracing::info!("Device halted ({}), exiting", reason);
        }
        RunOutcome::Shutdown => tracing::info!("Shut down"),
    }

    runtime.shutdown_timeout(Duration::from_millis(100));

    Ok(())
}

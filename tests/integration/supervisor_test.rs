//! End-to-end runs through the supervisor's event queue.

use crate::mocks::{bike_advert, power_page, Shared};
use ridebridge::bridge::{BridgeState, BridgeTiming, HaltReason, ManualClock, TimerId};
use ridebridge::runtime::loopback::FixedSupply;
use ridebridge::runtime::{Components, Event, EventQueue, RunOutcome, SourceSelection, Supervisor};
use ridebridge::sensors::battery::BatteryMonitor;
use ridebridge::sensors::types::{AdvReport, DataSource, DataSourceKind, RadioEvent};
use ridebridge::sensors::{AntDataSource, AntDiscovery, MacAddress, ScanDataSource};
use std::time::Duration;

const BIKE: MacAddress = MacAddress([0xC1, 0x02, 0x03, 0x04, 0x05, 0x06]);
const BIKE_AIR: [u8; 6] = [0x06, 0x05, 0x04, 0x03, 0x02, 0xC1];

fn boot(
    kind: DataSourceKind,
    battery: Option<BatteryMonitor>,
) -> (Supervisor, ManualClock, Shared) {
    boot_with(SourceSelection { kind, device_id: 42 }, battery, false)
}

fn boot_unpaired() -> (Supervisor, ManualClock, Shared) {
    let selection = SourceSelection {
        kind: DataSourceKind::AntPlus,
        device_id: 0,
    };
    boot_with(selection, None, true)
}

fn boot_with(
    selection: SourceSelection,
    battery: Option<BatteryMonitor>,
    with_discovery: bool,
) -> (Supervisor, ManualClock, Shared) {
    let clock = ManualClock::new();
    let shared = Shared::new();

    let transports = shared.clone();
    let factory = move |kind: DataSourceKind| -> Option<Box<dyn DataSource>> {
        match kind {
            DataSourceKind::AntPlus => Some(Box::new(AntDataSource::new(transports.radio(), 5))),
            DataSourceKind::KeiserBle => Some(Box::new(ScanDataSource::new(
                transports.scanner(true),
                BIKE,
            ))),
        }
    };

    let components = Components {
        factory: Box::new(factory),
        sink: shared.sink(),
        power: shared.power(),
        timers: shared.timers(),
        clock: clock.clone(),
        battery,
        discovery: with_discovery.then(|| AntDiscovery::new(shared.radio())),
    };

    let supervisor = Supervisor::boot(
        selection,
        BridgeTiming::default(),
        components,
        EventQueue::new(),
    )
    .unwrap();

    (supervisor, clock, shared)
}

fn power_frame(power: u16, cadence: u8) -> Event {
    meter_frame(42, None, power, cadence)
}

fn meter_frame(device_number: u16, rssi: Option<i8>, power: u16, cadence: u8) -> Event {
    Event::Radio(RadioEvent::ChannelRx {
        channel: 1,
        device_number,
        rssi,
        payload: power_page(power, cadence),
    })
}

fn bike(power: u16, cadence: u8) -> Event {
    Event::Radio(RadioEvent::Advertisement(AdvReport {
        peer_addr: BIKE_AIR,
        data: bike_advert(power, cadence),
    }))
}

#[test]
fn test_boot_arms_timers_and_opens_channel() {
    let (supervisor, _, shared) = boot(DataSourceKind::AntPlus, None);

    assert_eq!(supervisor.bridge().state(), BridgeState::Active);
    assert!(supervisor.manager().is_active());
    let r = shared.get();
    assert!(r.sink_running);
    assert_eq!(r.armed.get(&TimerId::OutputTick), Some(&Duration::from_millis(1000)));
    assert_eq!(r.armed.get(&TimerId::InactivityCheck), Some(&Duration::from_millis(2000)));
    assert_eq!(r.opened_channels.len(), 1);
}

#[test]
fn test_frames_flow_through_to_output() {
    let (mut supervisor, clock, shared) = boot(DataSourceKind::AntPlus, None);
    let tx = supervisor.sender();

    tx.send(Event::Connection(true)).unwrap();
    for (p, c) in [(100, 80), (110, 82), (120, 84), (130, 86), (140, 88), (150, 90)] {
        tx.send(power_frame(p, c)).unwrap();
    }
    assert_eq!(supervisor.drain(), None);

    let data = supervisor.latest_data();
    assert_eq!((data.average_power, data.average_cadence), (125, 85));

    clock.advance(Duration::from_millis(1000));
    tx.send(Event::Tick).unwrap();
    supervisor.drain();
    assert_eq!(shared.get().readings, vec![(125, 85)]);

    clock.advance(Duration::from_millis(3000));
    tx.send(Event::Tick).unwrap();
    supervisor.drain();
    assert_eq!(shared.get().readings.last(), Some(&(0, 0)));
}

#[test]
fn test_search_timeout_halts_immediately() {
    let (mut supervisor, _, shared) = boot(DataSourceKind::AntPlus, None);
    let tx = supervisor.sender();

    tx.send(Event::Radio(RadioEvent::ChannelSearchTimeout { channel: 1 }))
        .unwrap();
    tx.send(Event::Tick).unwrap();

    assert_eq!(supervisor.drain(), Some(RunOutcome::Halted));
    assert_eq!(supervisor.bridge().halt_reason(), Some(HaltReason::SourceLost));

    let r = shared.get();
    assert_eq!(r.halts, 1);
    assert!(r.armed.is_empty());
    assert!(r.readings.is_empty());
    // the radio already closed the channel on its side
    assert!(r.closed_channels.is_empty());
}

#[test]
fn test_idle_without_consumer_halts_and_stops_collection() {
    let (mut supervisor, clock, shared) = boot(DataSourceKind::KeiserBle, None);
    let tx = supervisor.sender();

    let mut outcome = None;
    for _ in 0..10 {
        clock.advance(Duration::from_millis(2000));
        tx.send(Event::InactivityCheck).unwrap();
        outcome = supervisor.drain();
        if outcome.is_some() {
            break;
        }
    }

    assert_eq!(outcome, Some(RunOutcome::Halted));
    assert_eq!(clock.elapsed(), Duration::from_millis(20000));
    assert!(!supervisor.manager().is_active());
    let r = shared.get();
    assert_eq!(r.halts, 1);
    assert!(!r.scanning);
}

#[test]
fn test_scan_watchdog_zero_reaches_model() {
    let (mut supervisor, clock, _) = boot(DataSourceKind::KeiserBle, None);
    let tx = supervisor.sender();

    tx.send(bike(240, 92)).unwrap();
    supervisor.drain();
    assert_eq!(supervisor.latest_data().instantaneous_power, 240);

    clock.advance(Duration::from_millis(1000));
    tx.send(Event::SourcePoll).unwrap();
    supervisor.drain();

    let data = supervisor.latest_data();
    assert_eq!(data.instantaneous_power, 0);
    assert_eq!(data.instantaneous_cadence, 0);
    // partial window: average follows the latest value
    assert_eq!(data.average_power, 0);
}

#[test]
fn test_battery_level_published_at_boot() {
    // 825 raw -> 2900 mV -> 90 %
    let monitor = BatteryMonitor::new(Box::new(FixedSupply(825)));
    let (mut supervisor, _, shared) = boot(DataSourceKind::AntPlus, Some(monitor));

    supervisor.drain();
    assert_eq!(shared.get().battery_levels, vec![90]);
}

#[test]
fn test_shutdown_stops_everything() {
    let (mut supervisor, _, shared) = boot(DataSourceKind::AntPlus, None);
    supervisor.sender().send(Event::Shutdown).unwrap();

    assert_eq!(supervisor.run(), RunOutcome::Shutdown);
    assert_eq!(supervisor.bridge().state(), BridgeState::Stopped);
    let r = shared.get();
    assert!(r.armed.is_empty());
    assert!(!r.sink_running);
    assert_eq!(r.closed_channels, vec![1]);
    assert_eq!(r.halts, 0);
}

#[test]
fn test_silent_bike_pushes_zeros_not_watchdog_average() {
    let (mut supervisor, clock, shared) = boot(DataSourceKind::KeiserBle, None);
    let tx = supervisor.sender();
    tx.send(Event::Connection(true)).unwrap();

    for _ in 0..6 {
        clock.advance(Duration::from_millis(250));
        tx.send(bike(240, 90)).unwrap();
        supervisor.drain();
    }

    // last advert at 1500 ms; the watchdog fires one window later
    clock.set(Duration::from_millis(2500));
    tx.send(Event::SourcePoll).unwrap();
    supervisor.drain();
    let data = supervisor.latest_data();
    assert_eq!((data.average_power, data.average_cadence), (200, 75));

    clock.set(Duration::from_millis(5000));
    tx.send(Event::Tick).unwrap();
    supervisor.drain();
    assert_eq!(shared.get().readings, vec![(0, 0)]);
    assert!(supervisor.bridge().activity().stale);

    // riding again clears the zeros
    tx.send(bike(180, 80)).unwrap();
    tx.send(Event::Tick).unwrap();
    supervisor.drain();
    assert_ne!(shared.get().readings.last(), Some(&(0, 0)));
    assert!(!supervisor.bridge().activity().stale);
}

#[test]
fn test_discovery_request_without_scanner_keeps_running() {
    let (mut supervisor, _, shared) = boot(DataSourceKind::AntPlus, None);
    let tx = supervisor.sender();

    tx.send(Event::StartDiscovery).unwrap();
    supervisor.drain();
    // no discovery attached: stays in normal operation
    assert!(!supervisor.in_setup());
    assert!(supervisor.manager().is_active());
    assert_eq!(shared.get().opened_channels.len(), 1);
}

#[test]
fn test_unpaired_boot_enters_setup_without_timers() {
    let (mut supervisor, clock, shared) = boot_unpaired();
    let tx = supervisor.sender();

    assert!(supervisor.in_setup());
    assert_eq!(supervisor.bridge().state(), BridgeState::Setup);
    assert_eq!(supervisor.manager().active_kind(), None);
    {
        let r = shared.get();
        assert!(r.sink_running);
        assert!(r.armed.is_empty());
        assert_eq!(r.opened_channels.len(), 1);
        assert_eq!(r.opened_channels[0].device_id, 0);
        assert_eq!(r.opened_channels[0].transmission_type, 0);
    }

    clock.advance(Duration::from_secs(60));
    tx.send(Event::InactivityCheck).unwrap();
    tx.send(Event::Tick).unwrap();
    assert_eq!(supervisor.drain(), None);
    let r = shared.get();
    assert_eq!(r.halts, 0);
    assert!(r.readings.is_empty());
}

#[test]
fn test_setup_reports_each_meter_once() {
    let (mut supervisor, _, shared) = boot_unpaired();
    let tx = supervisor.sender();

    tx.send(meter_frame(501, Some(-48), 200, 90)).unwrap();
    tx.send(meter_frame(501, Some(-40), 210, 91)).unwrap();
    tx.send(meter_frame(777, Some(-71), 150, 80)).unwrap();
    supervisor.drain();

    assert_eq!(
        shared.get().found_devices,
        vec![(501, Some(-48)), (777, Some(-71))]
    );
    let discovery = supervisor.discovery().unwrap();
    assert_eq!(discovery.found_devices().len(), 2);
    // frames in setup mode never reach the model
    assert!(!supervisor.latest_data().data_available);
}

#[test]
fn test_selecting_a_meter_starts_normal_operation() {
    let (mut supervisor, clock, shared) = boot_unpaired();
    let tx = supervisor.sender();

    tx.send(meter_frame(501, Some(-48), 200, 90)).unwrap();
    tx.send(Event::SelectDevice(501)).unwrap();
    supervisor.drain();

    assert!(!supervisor.in_setup());
    assert_eq!(supervisor.bridge().state(), BridgeState::Active);
    assert!(!supervisor.discovery().unwrap().is_active());
    assert_eq!(supervisor.manager().active_kind(), Some(DataSourceKind::AntPlus));
    {
        let r = shared.get();
        assert_eq!(r.sink_starts, 1);
        assert_eq!(r.closed_channels, vec![1]);
        assert_eq!(r.opened_channels.len(), 2);
        assert_eq!(r.opened_channels[1].device_id, 501);
        assert!(r.armed.contains_key(&TimerId::OutputTick));
    }

    tx.send(Event::Connection(true)).unwrap();
    tx.send(meter_frame(501, None, 220, 88)).unwrap();
    clock.advance(Duration::from_millis(1000));
    tx.send(Event::Tick).unwrap();
    supervisor.drain();
    assert_eq!(shared.get().readings, vec![(220, 88)]);
}

#[test]
fn test_select_outside_setup_is_ignored() {
    let (mut supervisor, _, shared) = boot(DataSourceKind::AntPlus, None);
    supervisor.sender().send(Event::SelectDevice(501)).unwrap();
    supervisor.drain();

    assert_eq!(shared.get().opened_channels.len(), 1);
    assert_eq!(shared.get().opened_channels[0].device_id, 42);
}

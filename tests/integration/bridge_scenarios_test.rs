//! Timed scenarios for the activity bridge.
//!
//! Timers are simulated: the harness fires the output tick and the
//! inactivity check at their period boundaries while advancing a manual
//! clock, stopping as soon as the bridge halts.

use crate::mocks::Shared;
use ridebridge::bridge::{
    ActivityBridge, BridgeState, BridgeTiming, HaltReason, ManualClock, TimerId,
};
use ridebridge::metrics::CyclingDataModel;
use std::time::Duration;

struct Sim {
    bridge: ActivityBridge,
    clock: ManualClock,
    shared: Shared,
    now_ms: u64,
}

impl Sim {
    fn started() -> Self {
        let clock = ManualClock::new();
        let shared = Shared::new();
        let mut bridge = ActivityBridge::new(
            BridgeTiming::default(),
            Box::new(clock.clone()),
            shared.sink(),
            shared.power(),
            shared.timers(),
        );
        bridge.init().unwrap();
        bridge.start().unwrap();
        Self {
            bridge,
            clock,
            shared,
            now_ms: 0,
        }
    }

    /// Advance to `target_ms`, firing every armed timer boundary on the way.
    fn advance_to(&mut self, target_ms: u64) {
        while self.now_ms < target_ms {
            let next = self.now_ms + 1;
            self.clock.set(Duration::from_millis(next));
            self.now_ms = next;

            if next % 1000 == 0 && self.shared.is_armed(TimerId::OutputTick) {
                self.bridge.on_tick();
            }
            if next % 2000 == 0 && self.shared.is_armed(TimerId::InactivityCheck) {
                self.bridge.on_inactivity_check();
            }
        }
    }
}

#[test]
fn test_never_connected_halts_near_inactivity_timeout() {
    let mut sim = Sim::started();

    sim.advance_to(18000);
    assert_eq!(sim.shared.get().halts, 0);
    assert_eq!(sim.bridge.state(), BridgeState::Active);

    sim.advance_to(20000);
    assert_eq!(sim.shared.get().halts, 1);
    assert_eq!(sim.bridge.halt_reason(), Some(HaltReason::NoConsumer));

    // nothing armed, nothing more happens
    sim.advance_to(60000);
    let record = sim.shared.get();
    assert_eq!(record.halts, 1);
    assert!(record.armed.is_empty());
    assert!(record.wake_armed);
}

#[test]
fn test_six_samples_then_silence() {
    let mut sim = Sim::started();
    let mut model = CyclingDataModel::new();
    sim.bridge.on_connection_event(true);

    let samples = [(100, 80), (110, 82), (120, 84), (130, 86), (140, 88), (150, 90)];
    for (i, (p, c)) in samples.into_iter().enumerate() {
        let at = i as u64 * 1000;
        if at > 0 {
            // sample lands just before the tick at the same millisecond
            sim.advance_to(at - 1);
            sim.clock.set(Duration::from_millis(at));
        }
        let data = model.update(p, c);
        sim.bridge.on_data(data);
        if at > 0 {
            sim.now_ms = at;
            sim.bridge.on_tick();
        }
    }

    assert_eq!(sim.shared.get().readings.last(), Some(&(125, 85)));

    // ticks at 6000 and 7000 still see fresh data
    sim.advance_to(7000);
    assert_eq!(sim.shared.get().readings.last(), Some(&(125, 85)));

    // stop firing periodic ticks and look at t = 8001 directly
    sim.clock.set(Duration::from_millis(8001));
    sim.bridge.on_tick();
    assert_eq!(sim.shared.get().readings.last(), Some(&(0, 0)));
    assert_eq!(sim.shared.get().halts, 0);
}

#[test]
fn test_staleness_boundary() {
    let mut sim = Sim::started();
    let mut model = CyclingDataModel::new();

    sim.clock.set(Duration::from_millis(500));
    sim.bridge.on_data(model.update(210, 88));

    sim.clock.set(Duration::from_millis(3499));
    sim.bridge.on_tick();
    sim.clock.set(Duration::from_millis(3500));
    sim.bridge.on_tick();

    let record = sim.shared.get();
    assert_eq!(record.readings, vec![(210, 88), (0, 0)]);
}

#[test]
fn test_connected_sensor_quiet_halts_once() {
    let mut sim = Sim::started();
    let mut model = CyclingDataModel::new();

    sim.bridge.on_connection_event(true);
    sim.bridge.on_data(model.update(180, 85));

    sim.advance_to(18000);
    assert_eq!(sim.shared.get().halts, 0);

    sim.advance_to(20000);
    assert_eq!(sim.shared.get().halts, 1);
    assert_eq!(sim.bridge.halt_reason(), Some(HaltReason::NoData));

    // late events after the halt are ignored
    sim.bridge.on_data_source_lost();
    sim.bridge.on_connection_event(false);
    sim.bridge.on_data(model.update(180, 85));
    sim.bridge.on_inactivity_check();
    assert_eq!(sim.shared.get().halts, 1);
}

#[test]
fn test_data_source_lost_halts_immediately() {
    let mut sim = Sim::started();
    sim.advance_to(1500);
    sim.bridge.on_data_source_lost();

    let record = sim.shared.get();
    assert_eq!(record.halts, 1);
    assert!(record.wake_armed);
    assert!(record.armed.is_empty());
    assert!(!record.sink_running);
    assert_eq!(sim.bridge.halt_reason(), Some(HaltReason::SourceLost));
}

#[test]
fn test_reconnects_keep_device_awake() {
    let mut sim = Sim::started();

    for k in 1..=5u64 {
        sim.advance_to(k * 15000);
        sim.bridge.on_connection_event(k % 2 == 1);
    }

    assert_eq!(sim.shared.get().halts, 0);
}

#[test]
fn test_stop_then_start_restamps_connection_clock() {
    let mut sim = Sim::started();
    sim.advance_to(15000);
    sim.bridge.stop();
    assert!(sim.shared.get().armed.is_empty());

    sim.clock.set(Duration::from_millis(30000));
    sim.now_ms = 30000;
    sim.bridge.start().unwrap();
    assert_eq!(sim.shared.get().sink_starts, 2);

    sim.advance_to(48000);
    assert_eq!(sim.shared.get().halts, 0);
    sim.advance_to(50000);
    assert_eq!(sim.shared.get().halts, 1);
}

//! Host stand-ins for the radio and power hardware.
//!
//! Used by the binary when no real transport is attached: the output sink
//! logs readings, the power control logs the halt, and the radios accept
//! every command. `spawn_simulated_power_meter` feeds ANT power pages so
//! the whole pipeline can be watched end to end.

use super::Event;
use crate::bridge::{OutputSink, PowerControl};
use crate::sensors::ant::channels::{AntRadio, ChannelConfig, POWER_CHANNEL_NUMBER};
use crate::sensors::ant::profiles::power::PowerOnlyPage;
use crate::sensors::battery::BatterySampler;
use crate::sensors::scan::AdvertisementScanner;
use crate::sensors::types::{RadioEvent, TransportError};
use crossbeam::channel::Sender;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Output sink that writes each reading to the log.
pub struct LogSink {
    name: String,
    running: bool,
}

impl LogSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            running: false,
        }
    }
}

impl OutputSink for LogSink {
    fn start(&mut self) {
        self.running = true;
        tracing::info!("Advertising as \"{}\"", self.name);
    }

    fn stop(&mut self) {
        self.running = false;
        tracing::info!("Stopped advertising \"{}\"", self.name);
    }

    fn push_reading(&mut self, power_watts: u16, cadence_rpm: u8) {
        if self.running {
            tracing::info!("Output: {} W, {} RPM", power_watts, cadence_rpm);
        }
    }

    fn update_battery_level(&mut self, percent: u8) {
        tracing::info!("Output battery level: {}%", percent);
    }

    fn report_found_device(&mut self, device_id: u16, rssi: Option<i8>) {
        match rssi {
            Some(dbm) => tracing::info!("Output scan result: device {} at {} dBm", device_id, dbm),
            None => tracing::info!("Output scan result: device {}", device_id),
        }
    }
}

/// Power control that only records the halt request.
#[derive(Debug, Default)]
pub struct HostPower {
    halted: bool,
}

impl HostPower {
    pub fn halted(&self) -> bool {
        self.halted
    }
}

impl PowerControl for HostPower {
    fn arm_wake_source(&mut self) {
        tracing::info!("Wake source armed");
    }

    fn enter_low_power_halt(&mut self) {
        self.halted = true;
        tracing::info!("Low-power halt requested; the host process will exit");
    }
}

/// ANT radio that accepts every channel command.
#[derive(Debug, Default)]
pub struct LoopbackAntRadio;

impl AntRadio for LoopbackAntRadio {
    fn open_channel(&mut self, config: &ChannelConfig) -> Result<(), TransportError> {
        tracing::debug!(
            "Loopback radio: channel {} open for device {}",
            config.channel,
            config.device_id
        );
        Ok(())
    }

    fn close_channel(&mut self, channel: u8) -> Result<(), TransportError> {
        tracing::debug!("Loopback radio: channel {} closed", channel);
        Ok(())
    }
}

/// Always-enabled scanner.
#[derive(Debug, Default)]
pub struct LoopbackScanner {
    scanning: bool,
}

impl AdvertisementScanner for LoopbackScanner {
    fn is_enabled(&self) -> bool {
        true
    }

    fn start_scan(&mut self) -> Result<(), TransportError> {
        self.scanning = true;
        Ok(())
    }

    fn stop_scan(&mut self) -> Result<(), TransportError> {
        self.scanning = false;
        Ok(())
    }
}

/// Battery sampler returning one fixed raw reading.
#[derive(Debug, Clone, Copy)]
pub struct FixedSupply(pub u16);

impl BatterySampler for FixedSupply {
    fn sample(&mut self) -> Option<u16> {
        Some(self.0)
    }
}

/// Encode a power-only page the way a power meter broadcasts it.
pub fn power_only_payload(event_count: u8, accumulated: u16, power: u16, cadence: u8) -> [u8; 8] {
    let acc = accumulated.to_le_bytes();
    let pwr = power.to_le_bytes();
    [
        PowerOnlyPage::PAGE,
        0xFF,
        cadence,
        event_count,
        acc[0],
        acc[1],
        pwr[0],
        pwr[1],
    ]
}

/// Broadcast a gently varying ride from `device_number` every `period`.
pub fn spawn_simulated_power_meter(
    handle: &Handle,
    events: Sender<Event>,
    device_number: u16,
    period: Duration,
) -> JoinHandle<()> {
    handle.spawn(async move {
        let mut ticker = tokio::time::interval(period);
        let mut event_count: u8 = 0;
        let mut accumulated: u16 = 0;

        loop {
            ticker.tick().await;

            let step = (event_count % 8) as u16;
            let power = 180 + step * 5;
            let cadence = 85 + (step as u8);
            event_count = event_count.wrapping_add(1);
            accumulated = accumulated.wrapping_add(power);

            let frame = RadioEvent::ChannelRx {
                channel: POWER_CHANNEL_NUMBER,
                device_number,
                rssi: None,
                payload: power_only_payload(event_count, accumulated, power, cadence),
            };
            if events.send(Event::Radio(frame)).is_err() {
                break;
            }
        }
    })
}

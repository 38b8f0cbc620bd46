//! ANT+ power meter discovery.
//!
//! Runs while no meter is paired. A wildcard channel picks up any power
//! meter in range and keeps a short list of the device numbers heard so a
//! user can pick one.

use super::channels::{AntRadio, ChannelConfig, ANT_PLUS_RF_FREQUENCY, POWER_CHANNEL_NUMBER};
use super::{AntChannel, AntDeviceType, ChannelStatus};
use crate::sensors::types::{RadioEvent, SourceError};

/// Most devices remembered per discovery run
pub const MAX_ANT_DEVICES: usize = 10;

/// Search period of the wildcard channel
const DISCOVERY_PERIOD: u16 = 8192;

/// A power meter heard during discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FoundDevice {
    pub device_id: u16,
    /// Signal strength of the first frame heard, in dBm
    pub rssi: Option<i8>,
}

impl ChannelConfig {
    /// Wildcard search for any bicycle power meter.
    pub fn discovery() -> Self {
        Self {
            channel: POWER_CHANNEL_NUMBER,
            device_type: AntDeviceType::Power,
            device_id: 0,
            transmission_type: 0,
            period: DISCOVERY_PERIOD,
            rf_frequency: ANT_PLUS_RF_FREQUENCY,
        }
    }
}

/// Wildcard scan collecting nearby power meters.
pub struct AntDiscovery {
    radio: Box<dyn AntRadio>,
    channel: AntChannel,
    found: Vec<FoundDevice>,
}

impl AntDiscovery {
    pub fn new(radio: Box<dyn AntRadio>) -> Self {
        Self {
            radio,
            channel: AntChannel::new(POWER_CHANNEL_NUMBER),
            found: Vec::with_capacity(MAX_ANT_DEVICES),
        }
    }

    /// Open the wildcard channel and forget earlier results.
    pub fn start(&mut self) -> Result<(), SourceError> {
        if self.channel.is_active() {
            tracing::info!("ANT+ discovery already running");
            return Ok(());
        }

        self.found.clear();

        let config = ChannelConfig::discovery();
        self.radio.open_channel(&config).map_err(|e| {
            tracing::error!("Failed to open ANT+ discovery channel {}: {}", config.channel, e);
            SourceError::from(e)
        })?;

        self.channel.status = ChannelStatus::Searching;
        self.channel.device_id = None;

        tracing::info!(
            "ANT+ discovery started on channel {} (period {})",
            config.channel,
            config.period
        );

        Ok(())
    }

    pub fn stop(&mut self) {
        if !self.channel.is_active() {
            return;
        }

        if let Err(e) = self.radio.close_channel(self.channel.number) {
            tracing::warn!("ANT+ discovery close reported: {}", e);
        }

        self.channel.status = ChannelStatus::Closed;
        tracing::info!("ANT+ discovery stopped with {} device(s)", self.found.len());
    }

    pub fn is_active(&self) -> bool {
        self.channel.is_active()
    }

    /// Devices heard so far, in the order they were first heard.
    pub fn found_devices(&self) -> &[FoundDevice] {
        &self.found
    }

    /// Feed a radio event. Returns the device if it was heard for the first time.
    pub fn handle_event(&mut self, event: &RadioEvent) -> Option<FoundDevice> {
        match event {
            RadioEvent::ChannelRx {
                channel,
                device_number,
                rssi,
                ..
            } if *channel == self.channel.number && self.channel.is_active() => {
                self.record(*device_number, *rssi)
            }
            RadioEvent::ChannelClosed { channel } if *channel == self.channel.number => {
                if self.channel.is_active() {
                    self.channel.status = ChannelStatus::Closed;
                    tracing::warn!("ANT+ discovery channel {} closed by the radio", channel);
                }
                None
            }
            _ => None,
        }
    }

    fn record(&mut self, device_id: u16, rssi: Option<i8>) -> Option<FoundDevice> {
        if device_id == 0 || self.found.iter().any(|d| d.device_id == device_id) {
            return None;
        }

        if self.found.len() >= MAX_ANT_DEVICES {
            tracing::debug!("Discovery list full, ignoring device {}", device_id);
            return None;
        }

        let device = FoundDevice { device_id, rssi };
        self.found.push(device);
        tracing::info!("Found ANT+ power meter {} (RSSI {:?} dBm)", device_id, rssi);

        Some(device)
    }
}

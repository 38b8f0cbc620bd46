//! ANT+ Bicycle Power Receiver
//!
//! The radio backend: one receive channel bound to a single paired power
//! meter. Power-only pages become samples; common pages are logged.
//! Without a paired meter, [`AntDiscovery`] lists the meters in range.

pub mod channels;
pub mod profiles;
pub mod scanner;

use crate::sensors::types::{
    DataSource, DataSourceConfig, DataSourceKind, RadioEvent, SampleCallback, SignalLost,
    SourceError,
};
use std::time::Instant;

pub use channels::{AntChannel, AntRadio, ChannelConfig, ChannelStatus};
pub use profiles::{PowerChannelPage, PowerOnlyPage};
pub use scanner::{AntDiscovery, FoundDevice, MAX_ANT_DEVICES};

/// ANT+ device types known to this receiver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum AntDeviceType {
    /// Bike Power (Device Type 11)
    Power,
    /// Unknown device type
    Unknown(u8),
}

impl AntDeviceType {
    /// Get the ANT+ device type number
    pub fn device_type_number(&self) -> u8 {
        match self {
            AntDeviceType::Power => 11,
            AntDeviceType::Unknown(n) => *n,
        }
    }

    /// Create from device type number
    pub fn from_number(n: u8) -> Self {
        match n {
            11 => AntDeviceType::Power,
            _ => AntDeviceType::Unknown(n),
        }
    }

    /// Channel period in 32768 Hz ticks
    pub fn channel_period(&self) -> u16 {
        match self {
            AntDeviceType::Power => 8182, // ~4.00 Hz
            AntDeviceType::Unknown(_) => 8192,
        }
    }
}

/// ANT+ power meter data source.
pub struct AntDataSource {
    radio: Box<dyn AntRadio>,
    channel: AntChannel,
    transmission_type: u8,
    device_id: u16,
    callback: Option<SampleCallback>,
}

impl AntDataSource {
    /// Create a receiver that programs channels through `radio`.
    pub fn new(radio: Box<dyn AntRadio>, transmission_type: u8) -> Self {
        Self {
            radio,
            channel: AntChannel::new(channels::POWER_CHANNEL_NUMBER),
            transmission_type,
            device_id: 0,
            callback: None,
        }
    }

    /// Current channel state.
    pub fn channel(&self) -> &AntChannel {
        &self.channel
    }

    fn handle_rx(&mut self, device_number: u16, payload: &[u8; 8]) {
        if !self.channel.is_active() {
            return;
        }

        if device_number != self.device_id {
            tracing::debug!(
                "Ignoring frame from device {} (paired with {})",
                device_number,
                self.device_id
            );
            return;
        }

        self.channel.status = ChannelStatus::Open;

        match PowerChannelPage::decode(payload) {
            Some(PowerChannelPage::PowerOnly(page)) => {
                let sample = page.to_sample();
                tracing::debug!(
                    "ANT+ power: {} W, cadence: {} RPM",
                    sample.power_watts,
                    sample.cadence_rpm
                );
                if let Some(callback) = self.callback.as_mut() {
                    callback(sample);
                }
            }
            Some(PowerChannelPage::Manufacturer(info)) => {
                tracing::info!(
                    "Power meter manufacturer {} model {} hw rev {}",
                    info.manufacturer_id,
                    info.model_number,
                    info.hw_revision
                );
            }
            Some(PowerChannelPage::Product(info)) => {
                tracing::info!(
                    "Power meter software {} serial {}",
                    info.software_version(),
                    info.serial_number
                );
            }
            Some(PowerChannelPage::Battery(status)) => {
                tracing::info!(
                    "Power meter battery {:.2} V ({:?})",
                    status.battery_voltage,
                    status.battery_status
                );
            }
            None => {
                tracing::trace!("Unhandled ANT+ page 0x{:02X}", payload[0]);
            }
        }
    }

    fn lose_channel(&mut self, reason: &str) -> Option<SignalLost> {
        if !self.channel.is_active() {
            return None;
        }

        self.channel.status = ChannelStatus::Closed;
        tracing::warn!("ANT+ channel {} lost: {}", self.channel.number, reason);

        Some(SignalLost {
            kind: DataSourceKind::AntPlus,
        })
    }
}

impl DataSource for AntDataSource {
    fn kind(&self) -> DataSourceKind {
        DataSourceKind::AntPlus
    }

    fn init(&mut self, config: DataSourceConfig) -> Result<(), SourceError> {
        if config.kind != DataSourceKind::AntPlus {
            return Err(SourceError::InvalidConfig(format!(
                "{} configuration given to ANT+ receiver",
                config.kind
            )));
        }

        if config.device_id == 0 {
            return Err(SourceError::InvalidConfig(
                "wildcard device number not allowed".to_string(),
            ));
        }

        self.device_id = config.device_id;
        self.callback = Some(config.callback);

        tracing::info!("ANT+ data source initialized with device ID {}", self.device_id);

        Ok(())
    }

    fn start(&mut self) -> Result<(), SourceError> {
        if self.callback.is_none() {
            return Err(SourceError::NotInitialized);
        }

        if self.channel.is_active() {
            return Ok(());
        }

        let config = ChannelConfig::power_meter(self.device_id, self.transmission_type);

        self.radio.open_channel(&config).map_err(|e| {
            tracing::error!("Failed to open ANT+ channel {}: {}", config.channel, e);
            SourceError::from(e)
        })?;

        self.channel.status = ChannelStatus::Searching;
        self.channel.device_id = Some(self.device_id);

        tracing::info!(
            "Opened ANT+ channel {} for device {}",
            config.channel,
            self.device_id
        );

        Ok(())
    }

    fn stop(&mut self) {
        if !self.channel.is_active() {
            return;
        }

        if let Err(e) = self.radio.close_channel(self.channel.number) {
            tracing::warn!("ANT+ channel {} close reported: {}", self.channel.number, e);
        }

        self.channel.status = ChannelStatus::Closed;
        tracing::info!("Closed ANT+ channel {}", self.channel.number);
    }

    fn is_active(&self) -> bool {
        self.channel.is_active()
    }

    fn handle_event(&mut self, event: &RadioEvent, _now: Instant) -> Option<SignalLost> {
        match event {
            RadioEvent::ChannelRx {
                channel,
                device_number,
                payload,
                ..
            } if *channel == self.channel.number => {
                self.handle_rx(*device_number, payload);
                None
            }
            RadioEvent::ChannelSearchTimeout { channel } if *channel == self.channel.number => {
                self.lose_channel("search timeout")
            }
            RadioEvent::ChannelClosed { channel } if *channel == self.channel.number => {
                self.lose_channel("channel closed")
            }
            RadioEvent::ChannelRxFail { channel } if *channel == self.channel.number => {
                tracing::warn!("ANT+ RX fail on channel {}", channel);
                None
            }
            RadioEvent::ChannelRxOverflow { channel } if *channel == self.channel.number => {
                tracing::warn!("ANT+ RX overflow on channel {}", channel);
                None
            }
            _ => None,
        }
    }
}

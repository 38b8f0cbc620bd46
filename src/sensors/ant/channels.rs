//! ANT+ Channel Management
//!
//! Channel configuration for the bicycle power receiver and the radio
//! trait the channel is programmed through.

use super::AntDeviceType;
use crate::sensors::types::TransportError;

/// ANT+ RF frequency offset from 2400 MHz (2457 MHz)
pub const ANT_PLUS_RF_FREQUENCY: u8 = 57;

/// Channel used for the power receiver. Channel 0 is left to the stack.
pub const POWER_CHANNEL_NUMBER: u8 = 1;

/// Default transmission type of paired power meters
pub const DEFAULT_TRANSMISSION_TYPE: u8 = 5;

/// Status of an ANT+ channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelStatus {
    /// Channel is unassigned
    Unassigned,
    /// Channel is searching for its device
    Searching,
    /// Channel is open and receiving data
    Open,
    /// Channel is closed
    Closed,
}

/// Represents an ANT+ channel
#[derive(Debug, Clone)]
pub struct AntChannel {
    /// Channel number (0-7 typically)
    pub number: u8,
    /// Current status
    pub status: ChannelStatus,
    /// Device ID the channel is bound to
    pub device_id: Option<u16>,
}

impl AntChannel {
    /// Create a new unassigned channel
    pub fn new(number: u8) -> Self {
        Self {
            number,
            status: ChannelStatus::Unassigned,
            device_id: None,
        }
    }

    /// Check if channel is available for assignment
    pub fn is_available(&self) -> bool {
        matches!(
            self.status,
            ChannelStatus::Unassigned | ChannelStatus::Closed
        )
    }

    /// Check if the channel is searching or receiving
    pub fn is_active(&self) -> bool {
        matches!(self.status, ChannelStatus::Searching | ChannelStatus::Open)
    }
}

/// Channel configuration handed to the radio
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Channel number to program
    pub channel: u8,
    /// Device type to receive from
    pub device_type: AntDeviceType,
    /// Exact device number
    pub device_id: u16,
    /// Transmission type
    pub transmission_type: u8,
    /// Channel period (in 32768 Hz ticks)
    pub period: u16,
    /// RF frequency offset from 2400 MHz
    pub rf_frequency: u8,
}

impl ChannelConfig {
    /// Create config for a specific power meter
    pub fn power_meter(device_id: u16, transmission_type: u8) -> Self {
        Self {
            channel: POWER_CHANNEL_NUMBER,
            device_type: AntDeviceType::Power,
            device_id,
            transmission_type,
            period: AntDeviceType::Power.channel_period(),
            rf_frequency: ANT_PLUS_RF_FREQUENCY,
        }
    }
}

/// Radio the receiver channel is programmed through.
///
/// Frames, search timeouts and closures come back asynchronously as
/// [`RadioEvent`](crate::sensors::types::RadioEvent)s.
pub trait AntRadio: Send {
    /// Assign, configure and open a receive channel
    fn open_channel(&mut self, config: &ChannelConfig) -> Result<(), TransportError>;

    /// Close a channel. Closing an already closed channel is not an error.
    fn close_channel(&mut self, channel: u8) -> Result<(), TransportError>;
}

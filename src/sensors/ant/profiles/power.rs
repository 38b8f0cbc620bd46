//! ANT+ Bicycle Power Profile
//!
//! Decodes the pages a bicycle power display needs.
//! Device Type: 11

use super::AntProfilePage;
use crate::sensors::types::Sample;

/// Cadence byte value meaning "not available"
pub const CADENCE_INVALID: u8 = 0xFF;

/// Power-only data page (Page 0x10 / 16)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PowerOnlyPage {
    /// Update event count (wraps at 255)
    pub event_count: u8,
    /// Pedal power balance (if supported)
    pub pedal_balance: Option<PedalBalance>,
    /// Instantaneous cadence (if available)
    pub cadence: Option<u8>,
    /// Accumulated power (wraps at 65535)
    pub accumulated_power: u16,
    /// Instantaneous power in watts
    pub instantaneous_power: u16,
}

/// Pedal power balance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PedalBalance {
    /// Right pedal percentage (0-100)
    pub right_percent: u8,
    /// Whether balance data refers to the right pedal
    pub is_valid: bool,
}

impl PowerOnlyPage {
    /// Page number of the power-only page.
    pub const PAGE: u8 = 0x10;

    /// Reduce the page to a pipeline sample. Missing cadence reads as 0 RPM.
    pub fn to_sample(&self) -> Sample {
        Sample::new(self.instantaneous_power, self.cadence.unwrap_or(0))
    }
}

impl AntProfilePage for PowerOnlyPage {
    fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < 8 || data[0] != Self::PAGE {
            return None;
        }

        let balance_byte = data[1];
        let pedal_balance = if balance_byte == 0xFF {
            None
        } else {
            Some(PedalBalance {
                right_percent: balance_byte & 0x7F,
                is_valid: (balance_byte & 0x80) != 0,
            })
        };

        let cadence = if data[2] == CADENCE_INVALID {
            None
        } else {
            Some(data[2])
        };

        Some(Self {
            event_count: data[3],
            pedal_balance,
            cadence,
            accumulated_power: u16::from_le_bytes([data[4], data[5]]),
            instantaneous_power: u16::from_le_bytes([data[6], data[7]]),
        })
    }
}

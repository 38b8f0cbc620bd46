//! ANT+ Device Profiles
//!
//! Page parsers for the bicycle power profile and the common pages every
//! ANT+ sensor interleaves with its data pages.

pub mod power;

pub use power::PowerOnlyPage;

/// Common trait for ANT+ profile data pages
pub trait AntProfilePage: Send + Sync {
    /// Parse raw data into this page type
    fn parse(data: &[u8]) -> Option<Self>
    where
        Self: Sized;
}

/// Common manufacturer information page (Page 80)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManufacturerInfo {
    pub hw_revision: u8,
    pub manufacturer_id: u16,
    pub model_number: u16,
}

impl ManufacturerInfo {
    /// Parse manufacturer info page
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < 8 || data[0] != 80 {
            return None;
        }

        Some(Self {
            hw_revision: data[3],
            manufacturer_id: u16::from_le_bytes([data[4], data[5]]),
            model_number: u16::from_le_bytes([data[6], data[7]]),
        })
    }
}

/// Product information page (Page 81)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductInfo {
    pub sw_revision_supplemental: u8,
    pub sw_revision_main: u8,
    pub serial_number: u32,
}

impl ProductInfo {
    /// Parse product info page
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < 8 || data[0] != 81 {
            return None;
        }

        Some(Self {
            sw_revision_supplemental: data[2],
            sw_revision_main: data[3],
            serial_number: u32::from_le_bytes([data[4], data[5], data[6], data[7]]),
        })
    }

    /// Combined software version, e.g. main 2 + supplemental 5 reads as 205.
    ///
    /// A supplemental revision of 0xFF means "not used".
    pub fn software_version(&self) -> u16 {
        if self.sw_revision_supplemental == 0xFF {
            self.sw_revision_main as u16
        } else {
            self.sw_revision_main as u16 * 100 + self.sw_revision_supplemental as u16
        }
    }
}

/// Battery status page (Page 82)
#[derive(Debug, Clone, PartialEq)]
pub struct BatteryStatus {
    pub operating_time: u32, // in 2-second units
    pub battery_voltage: f32,
    pub battery_status: BatteryStatusValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatteryStatusValue {
    New,
    Good,
    Ok,
    Low,
    Critical,
    Invalid,
    Unknown(u8),
}

impl BatteryStatus {
    /// Parse battery status page
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < 8 || data[0] != 82 {
            return None;
        }

        let operating_time = u32::from_le_bytes([data[3], data[4], data[5], 0]) & 0x00FFFFFF;

        let voltage_fractional = data[6];
        let coarse_and_status = data[7];
        let voltage_coarse = coarse_and_status & 0x0F;
        let status_bits = (coarse_and_status >> 4) & 0x07;

        let battery_voltage = voltage_coarse as f32 + (voltage_fractional as f32 / 256.0);

        let battery_status = match status_bits {
            1 => BatteryStatusValue::New,
            2 => BatteryStatusValue::Good,
            3 => BatteryStatusValue::Ok,
            4 => BatteryStatusValue::Low,
            5 => BatteryStatusValue::Critical,
            7 => BatteryStatusValue::Invalid,
            x => BatteryStatusValue::Unknown(x),
        };

        Some(Self {
            operating_time,
            battery_voltage,
            battery_status,
        })
    }
}

/// A decoded bicycle power channel page.
#[derive(Debug, Clone, PartialEq)]
pub enum PowerChannelPage {
    PowerOnly(PowerOnlyPage),
    Manufacturer(ManufacturerInfo),
    Product(ProductInfo),
    Battery(BatteryStatus),
}

impl PowerChannelPage {
    /// Decode one 8-byte broadcast payload. Unknown pages yield `None`.
    pub fn decode(data: &[u8]) -> Option<Self> {
        match data.first()? {
            0x10 => PowerOnlyPage::parse(data).map(PowerChannelPage::PowerOnly),
            80 => ManufacturerInfo::parse(data).map(PowerChannelPage::Manufacturer),
            81 => ProductInfo::parse(data).map(PowerChannelPage::Product),
            82 => BatteryStatus::parse(data).map(PowerChannelPage::Battery),
            _ => None,
        }
    }
}

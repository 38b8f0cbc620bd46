//! Advertisement parsing for broadcasting bikes.
//!
//! A Keiser-style bike puts its live data in the manufacturer-specific AD
//! structure of every advertisement. Nothing is connected; the scanner
//! only has to recognise the right bike and read the payload.

use crate::sensors::types::Sample;
use std::fmt;
use std::str::FromStr;

/// AD type of manufacturer-specific data
pub const AD_TYPE_MANUFACTURER_DATA: u8 = 0xFF;

/// Company identifier the bike advertises under
pub const KEISER_MANUFACTURER_ID: u16 = 0x0102;

/// Bytes of bike data following the company identifier
pub const KEISER_PAYLOAD_LEN: usize = 17;

/// Hardware address in its conventional big-endian written form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MacAddress(pub [u8; 6]);

impl MacAddress {
    /// Whether every byte is zero (an unset address).
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }

    /// Compare against an address as received over the air.
    ///
    /// Air byte `i` must equal configured byte `5 - i`.
    pub fn matches_air_order(&self, air: &[u8; 6]) -> bool {
        air.iter()
            .enumerate()
            .all(|(i, &b)| b == self.0[5 - i])
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

/// Error parsing a textual MAC address.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid MAC address: {0}")]
pub struct MacParseError(pub String);

impl FromStr for MacAddress {
    type Err = MacParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 6 {
            return Err(MacParseError(s.to_string()));
        }

        let mut bytes = [0u8; 6];
        for (slot, part) in bytes.iter_mut().zip(parts) {
            if part.len() != 2 {
                return Err(MacParseError(s.to_string()));
            }
            *slot = u8::from_str_radix(part, 16).map_err(|_| MacParseError(s.to_string()))?;
        }

        Ok(MacAddress(bytes))
    }
}

impl serde::Serialize for MacAddress {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for MacAddress {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Live data broadcast by the bike.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeiserBikeData {
    pub version_major: u8,
    pub version_minor: u8,
    pub data_type: u8,
    pub equipment_id: u8,
    /// Cadence in 0.1 RPM
    pub cadence_tenths: u16,
    /// Heart rate in 0.1 BPM
    pub heart_rate_tenths: u16,
    /// Power in watts
    pub power_watts: u16,
    pub calories: u16,
    pub duration_min: u8,
    pub duration_sec: u8,
    pub distance: u16,
    pub gear: u8,
}

impl KeiserBikeData {
    /// Parse the bytes following the company identifier.
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < KEISER_PAYLOAD_LEN {
            return None;
        }

        Some(Self {
            version_major: data[0],
            version_minor: data[1],
            data_type: data[2],
            equipment_id: data[3],
            cadence_tenths: u16::from_le_bytes([data[4], data[5]]),
            heart_rate_tenths: u16::from_le_bytes([data[6], data[7]]),
            power_watts: u16::from_le_bytes([data[8], data[9]]),
            calories: u16::from_le_bytes([data[10], data[11]]),
            duration_min: data[12],
            duration_sec: data[13],
            distance: u16::from_le_bytes([data[14], data[15]]),
            gear: data[16],
        })
    }

    /// Cadence in whole RPM, saturated to the sample range.
    pub fn cadence_rpm(&self) -> u8 {
        u8::try_from(self.cadence_tenths / 10).unwrap_or(u8::MAX)
    }

    /// Reduce to a pipeline sample.
    pub fn to_sample(&self) -> Sample {
        Sample::new(self.power_watts, self.cadence_rpm())
    }
}

/// Iterate the AD structures of an advertising payload as `(ad_type, body)`.
///
/// Stops at the first zero-length or truncated structure.
pub fn ad_structures(data: &[u8]) -> impl Iterator<Item = (u8, &[u8])> {
    let mut rest = data;
    std::iter::from_fn(move || {
        let (&len, tail) = rest.split_first()?;
        let len = len as usize;
        if len == 0 || tail.len() < len {
            return None;
        }
        let (structure, remaining) = tail.split_at(len);
        rest = remaining;
        Some((structure[0], &structure[1..]))
    })
}

/// Find the bike data in an advertising payload.
///
/// Returns `None` when there is no manufacturer data under the expected
/// company identifier or when it is too short.
pub fn find_bike_data(data: &[u8]) -> Option<KeiserBikeData> {
    ad_structures(data)
        .filter(|(ad_type, _)| *ad_type == AD_TYPE_MANUFACTURER_DATA)
        .find_map(|(_, body)| {
            if body.len() < 2 {
                return None;
            }
            let company = u16::from_le_bytes([body[0], body[1]]);
            if company != KEISER_MANUFACTURER_ID {
                return None;
            }
            KeiserBikeData::parse(&body[2..])
        })
}

//! Supply battery monitoring.
//!
//! Converts raw VDD readings into a charge percentage for two AA cells.

/// Internal ADC reference in millivolts
const ADC_REF_MILLIVOLTS: u32 = 600;
/// Input prescaler compensation (1/6 gain)
const ADC_PRESCALE: u32 = 6;
/// 10-bit full scale
const ADC_FULL_SCALE: u32 = 1024;

/// Fresh cells
pub const BATTERY_MAX_MILLIVOLTS: u16 = 3000;
/// Empty cells
pub const BATTERY_MIN_MILLIVOLTS: u16 = 2000;

/// Source of raw supply-voltage readings.
pub trait BatterySampler: Send {
    /// One raw 10-bit ADC conversion of VDD, or `None` if the ADC is busy.
    fn sample(&mut self) -> Option<u16>;
}

/// Convert a raw ADC reading to millivolts.
pub fn millivolts_from_raw(raw: u16) -> u16 {
    let mv = ADC_REF_MILLIVOLTS * raw as u32 * ADC_PRESCALE / ADC_FULL_SCALE;
    mv.min(u16::MAX as u32) as u16
}

/// Map a supply voltage onto 0-100 %.
pub fn level_from_millivolts(millivolts: u16) -> u8 {
    if millivolts >= BATTERY_MAX_MILLIVOLTS {
        100
    } else if millivolts <= BATTERY_MIN_MILLIVOLTS {
        0
    } else {
        let span = (BATTERY_MAX_MILLIVOLTS - BATTERY_MIN_MILLIVOLTS) as u32;
        ((millivolts - BATTERY_MIN_MILLIVOLTS) as u32 * 100 / span) as u8
    }
}

/// Periodic battery measurement.
pub struct BatteryMonitor {
    sampler: Box<dyn BatterySampler>,
    millivolts: u16,
    level: u8,
}

impl BatteryMonitor {
    /// Create a monitor. Reports full charge until the first measurement.
    pub fn new(sampler: Box<dyn BatterySampler>) -> Self {
        Self {
            sampler,
            millivolts: BATTERY_MAX_MILLIVOLTS,
            level: 100,
        }
    }

    /// Take a reading. Returns the new level, or `None` if no sample was available.
    pub fn measure(&mut self) -> Option<u8> {
        let raw = self.sampler.sample()?;
        self.millivolts = millivolts_from_raw(raw);
        self.level = level_from_millivolts(self.millivolts);

        tracing::info!("Battery voltage: {} mV, level: {}%", self.millivolts, self.level);

        Some(self.level)
    }

    /// Last measured level in percent.
    pub fn level(&self) -> u8 {
        self.level
    }

    /// Last measured voltage in millivolts.
    pub fn millivolts(&self) -> u16 {
        self.millivolts
    }
}

//! Cycling data model.
//!
//! Holds the latest instantaneous and averaged power/cadence and notifies a
//! single subscriber on every update.

use super::smoothing::CyclingAverage;

/// Snapshot of the pipeline output. Handed out by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CyclingData {
    /// Instantaneous power in watts
    pub instantaneous_power: u16,
    /// Moving-average power in watts
    pub average_power: u16,
    /// Instantaneous cadence in RPM
    pub instantaneous_cadence: u8,
    /// Moving-average cadence in RPM
    pub average_cadence: u8,
    /// Whether at least one sample arrived since the last reset
    pub data_available: bool,
}

/// Subscriber notified with each new snapshot.
pub type DataSubscriber = Box<dyn FnMut(CyclingData) + Send>;

/// Stateful power/cadence filter.
pub struct CyclingDataModel {
    data: CyclingData,
    power: CyclingAverage,
    cadence: CyclingAverage,
    subscriber: Option<DataSubscriber>,
}

impl CyclingDataModel {
    /// Create an empty model.
    pub fn new() -> Self {
        tracing::info!("Cycling data model initialized");
        Self {
            data: CyclingData::default(),
            power: CyclingAverage::new(),
            cadence: CyclingAverage::new(),
            subscriber: None,
        }
    }

    /// Register the subscriber, replacing any previous one.
    pub fn subscribe(&mut self, subscriber: DataSubscriber) {
        self.subscriber = Some(subscriber);
        tracing::info!("Cycling data model subscriber registered");
    }

    /// Feed one sample through the filter and notify the subscriber.
    pub fn update(&mut self, power_watts: u16, cadence_rpm: u8) -> CyclingData {
        let average_power = self.power.add(power_watts);
        let average_cadence = self.cadence.add(cadence_rpm as u16);

        self.data = CyclingData {
            instantaneous_power: power_watts,
            average_power,
            instantaneous_cadence: cadence_rpm,
            // mean of u8 values always fits in u8
            average_cadence: average_cadence as u8,
            data_available: true,
        };

        tracing::debug!(
            "Cycling data: power={} W (avg={} W), cadence={} RPM (avg={} RPM)",
            self.data.instantaneous_power,
            self.data.average_power,
            self.data.instantaneous_cadence,
            self.data.average_cadence
        );

        if let Some(subscriber) = self.subscriber.as_mut() {
            subscriber(self.data);
        }

        self.data
    }

    /// Latest snapshot.
    pub fn get(&self) -> CyclingData {
        self.data
    }

    /// Clear the snapshot and both filters. The subscriber stays registered.
    pub fn reset(&mut self) {
        self.data = CyclingData::default();
        self.power.reset();
        self.cadence.reset();
        tracing::info!("Cycling data model reset");
    }
}

impl Default for CyclingDataModel {
    fn default() -> Self {
        Self::new()
    }
}

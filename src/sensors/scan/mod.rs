//! BLE Broadcast Scanner
//!
//! The scan backend: listens passively for advertisements from one bike,
//! identified by hardware address and manufacturer tag, and turns its
//! broadcast data into samples.

pub mod advert;

use crate::sensors::types::{
    DataSource, DataSourceConfig, DataSourceKind, RadioEvent, Sample, SampleCallback, SignalLost,
    SourceError, SourceStale, TransportError,
};
use std::time::{Duration, Instant};

pub use advert::{find_bike_data, KeiserBikeData, MacAddress};

/// Default window without a matching advertisement before data is marked stale
pub const DEFAULT_WATCHDOG: Duration = Duration::from_millis(1000);

/// Scanner the listener is armed through.
pub trait AdvertisementScanner: Send {
    /// Whether the BLE stack is up
    fn is_enabled(&self) -> bool;

    /// Begin continuous passive scanning
    fn start_scan(&mut self) -> Result<(), TransportError>;

    /// Stop scanning. Stopping an idle scanner is not an error.
    fn stop_scan(&mut self) -> Result<(), TransportError>;
}

/// Broadcast-scan data source.
pub struct ScanDataSource {
    scanner: Box<dyn AdvertisementScanner>,
    target: MacAddress,
    watchdog: Duration,
    callback: Option<SampleCallback>,
    listening: bool,
    last_seen: Option<Instant>,
    stale_reported: bool,
}

impl ScanDataSource {
    /// Create a scanner looking for the bike at `target`.
    pub fn new(scanner: Box<dyn AdvertisementScanner>, target: MacAddress) -> Self {
        Self {
            scanner,
            target,
            watchdog: DEFAULT_WATCHDOG,
            callback: None,
            listening: false,
            last_seen: None,
            stale_reported: false,
        }
    }

    /// Override the stale-data watchdog window.
    pub fn with_watchdog(mut self, watchdog: Duration) -> Self {
        self.watchdog = watchdog;
        self
    }

    /// Address this scanner is filtering for.
    pub fn target(&self) -> MacAddress {
        self.target
    }

    fn emit(&mut self, sample: Sample) {
        if let Some(callback) = self.callback.as_mut() {
            callback(sample);
        }
    }

    fn handle_advertisement(&mut self, peer_addr: &[u8; 6], data: &[u8], now: Instant) {
        let Some(bike) = find_bike_data(data) else {
            return;
        };

        if !self.target.matches_air_order(peer_addr) {
            return;
        }

        let sample = bike.to_sample();
        tracing::debug!(
            "Bike {}: {} W, {} RPM, gear {}",
            self.target,
            sample.power_watts,
            sample.cadence_rpm,
            bike.gear
        );

        self.last_seen = Some(now);
        self.stale_reported = false;
        self.emit(sample);
    }
}

impl DataSource for ScanDataSource {
    fn kind(&self) -> DataSourceKind {
        DataSourceKind::KeiserBle
    }

    fn init(&mut self, config: DataSourceConfig) -> Result<(), SourceError> {
        if config.kind != DataSourceKind::KeiserBle {
            return Err(SourceError::InvalidConfig(format!(
                "{} configuration given to BLE scanner",
                config.kind
            )));
        }

        if self.target.is_zero() {
            return Err(SourceError::InvalidConfig("target address not set".to_string()));
        }

        self.callback = Some(config.callback);
        self.last_seen = None;
        self.stale_reported = false;

        tracing::info!(
            "BLE scan data source initialized for {} (device ID {})",
            self.target,
            config.device_id
        );

        Ok(())
    }

    fn start(&mut self) -> Result<(), SourceError> {
        if self.callback.is_none() {
            return Err(SourceError::NotInitialized);
        }

        if self.listening {
            return Ok(());
        }

        if !self.scanner.is_enabled() {
            tracing::error!("BLE stack not enabled, cannot scan for {}", self.target);
            return Err(TransportError::Disabled.into());
        }

        self.scanner.start_scan().map_err(|e| {
            tracing::error!("Failed to start BLE scanning: {}", e);
            SourceError::from(e)
        })?;

        self.listening = true;
        tracing::info!("Scanning for bike {}", self.target);

        Ok(())
    }

    fn stop(&mut self) {
        if !self.listening {
            return;
        }

        if let Err(e) = self.scanner.stop_scan() {
            tracing::warn!("BLE scan stop reported: {}", e);
        }

        self.listening = false;
        self.last_seen = None;
        tracing::info!("Stopped scanning for {}", self.target);
    }

    fn is_active(&self) -> bool {
        self.listening
    }

    fn handle_event(&mut self, event: &RadioEvent, now: Instant) -> Option<SignalLost> {
        if let RadioEvent::Advertisement(report) = event {
            if self.listening {
                self.handle_advertisement(&report.peer_addr, &report.data, now);
            }
        }
        None
    }

    fn poll(&mut self, now: Instant) -> Option<SourceStale> {
        if !self.listening || self.stale_reported {
            return None;
        }

        let seen = self.last_seen?;
        if now.saturating_duration_since(seen) < self.watchdog {
            return None;
        }

        tracing::info!("No data from {} for {:?}, marking stale", self.target, self.watchdog);
        self.stale_reported = true;
        self.emit(Sample::zero());

        Some(SourceStale {
            kind: DataSourceKind::KeiserBle,
        })
    }
}

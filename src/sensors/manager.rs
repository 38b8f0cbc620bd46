//! Data source manager.
//!
//! Owns at most one acquisition backend, switches between them, and relays
//! their samples into the cycling data model.

use crate::metrics::model::{CyclingData, CyclingDataModel};
use crate::sensors::types::{
    DataSource, DataSourceConfig, DataSourceKind, RadioEvent, Sample, SignalLost, SourceError,
    SourceStale,
};
use std::sync::Arc;
use std::time::Instant;

/// Where backend callbacks deliver their samples.
pub type SampleSink = Arc<dyn Fn(Sample) + Send + Sync>;

/// Builds a fresh backend for a kind.
pub trait BackendFactory: Send {
    /// Construct an uninitialized backend, or `None` if the kind is not built in.
    fn create(&mut self, kind: DataSourceKind) -> Option<Box<dyn DataSource>>;
}

impl<F> BackendFactory for F
where
    F: FnMut(DataSourceKind) -> Option<Box<dyn DataSource>> + Send,
{
    fn create(&mut self, kind: DataSourceKind) -> Option<Box<dyn DataSource>> {
        self(kind)
    }
}

/// Selects and owns the active data source.
pub struct DataSourceManager {
    factory: Box<dyn BackendFactory>,
    sink: SampleSink,
    active: Option<Box<dyn DataSource>>,
}

impl DataSourceManager {
    /// Create a manager with no backend selected.
    pub fn new(factory: Box<dyn BackendFactory>, sink: SampleSink) -> Self {
        Self {
            factory,
            sink,
            active: None,
        }
    }

    /// Replace the active backend with a freshly started one.
    ///
    /// The previous backend is always stopped first. On failure no backend
    /// is left selected.
    pub fn set_source(&mut self, kind: DataSourceKind, device_id: u16) -> Result<(), SourceError> {
        tracing::info!("Setting data source: {} (device {})", kind, device_id);

        if let Some(mut previous) = self.active.take() {
            tracing::info!("Stopping current data source: {}", previous.kind());
            previous.stop();
        }

        let mut backend = self.factory.create(kind).ok_or_else(|| {
            SourceError::BackendInitFailed(Box::new(SourceError::InvalidConfig(format!(
                "{} backend not available",
                kind
            ))))
        })?;

        let sink = self.sink.clone();
        let config = DataSourceConfig {
            kind,
            device_id,
            callback: Box::new(move |sample| sink(sample)),
        };

        if let Err(e) = backend.init(config) {
            tracing::error!("Failed to initialize {} data source: {}", kind, e);
            return Err(SourceError::BackendInitFailed(Box::new(e)));
        }

        if let Err(e) = backend.start() {
            tracing::error!("Failed to start {} data source: {}", kind, e);
            backend.stop();
            return Err(SourceError::BackendStartFailed(Box::new(e)));
        }

        tracing::info!("Data source {} started", kind);
        self.active = Some(backend);

        Ok(())
    }

    /// Kind of the selected backend.
    pub fn active_kind(&self) -> Option<DataSourceKind> {
        self.active.as_ref().map(|b| b.kind())
    }

    /// Begin a collection run: clears the model so stale averages don't leak in,
    /// then restarts the backend if an earlier `stop_collection` stopped it.
    pub fn start_collection(&mut self, model: &mut CyclingDataModel) -> Result<(), SourceError> {
        let Some(backend) = self.active.as_mut() else {
            tracing::error!("No active data source to start");
            return Err(SourceError::NoActiveSource);
        };

        model.reset();

        if !backend.is_active() {
            if let Err(e) = backend.start() {
                tracing::error!("Failed to restart {} data source: {}", backend.kind(), e);
                return Err(SourceError::BackendStartFailed(Box::new(e)));
            }
        }

        tracing::info!("Started data collection");

        Ok(())
    }

    /// Stop the backend if it is running. The backend stays selected.
    pub fn stop_collection(&mut self) {
        if let Some(backend) = self.active.as_mut() {
            if backend.is_active() {
                backend.stop();
                tracing::info!("Stopped data collection");
            }
        }
    }

    /// Whether the selected backend is active.
    pub fn is_active(&self) -> bool {
        self.active.as_ref().is_some_and(|b| b.is_active())
    }

    /// Forward a transport event to the backend.
    pub fn handle_event(&mut self, event: &RadioEvent, now: Instant) -> Option<SignalLost> {
        self.active.as_mut()?.handle_event(event, now)
    }

    /// Give the backend a chance to run its time-driven checks.
    pub fn poll(&mut self, now: Instant) -> Option<SourceStale> {
        self.active.as_mut()?.poll(now)
    }

    /// Push one raw sample into the model.
    pub fn relay(&self, sample: Sample, model: &mut CyclingDataModel) -> CyclingData {
        tracing::debug!(
            "Received data update - Power: {} W, Cadence: {} RPM",
            sample.power_watts,
            sample.cadence_rpm
        );
        model.update(sample.power_watts, sample.cadence_rpm)
    }

    /// Latest snapshot from the model.
    pub fn latest_data(&self, model: &CyclingDataModel) -> CyclingData {
        model.get()
    }
}

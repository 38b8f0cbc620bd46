//! Sensor module: acquisition backends and the manager that owns them.

pub mod ant;
pub mod battery;
pub mod manager;
pub mod scan;
pub mod types;

pub use ant::{AntDataSource, AntDiscovery, AntRadio, ChannelConfig, FoundDevice};
pub use battery::{BatteryMonitor, BatterySampler};
pub use manager::{BackendFactory, DataSourceManager, SampleSink};
pub use scan::{AdvertisementScanner, MacAddress, ScanDataSource};
pub use types::{
    AdvReport, DataSource, DataSourceConfig, DataSourceKind, RadioEvent, Sample, SampleCallback,
    SignalLost, SourceError, SourceStale, TransportError,
};

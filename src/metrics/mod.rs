//! Metrics module: the cycling data pipeline.

pub mod model;
pub mod smoothing;

pub use model::{CyclingData, CyclingDataModel, DataSubscriber};
pub use smoothing::{CyclingAverage, MovingAverage, MOVING_AVG_SIZE};

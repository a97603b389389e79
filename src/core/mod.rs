pub mod engine;
pub mod geodesy;
pub mod matrix;
pub mod normalizer;
pub mod series;

pub use crate::domain::model::{ProximityResult, SeriesReport, Snapshot, Timestamp};
pub use crate::domain::ports::{ConfigProvider, DistanceModel, Pipeline, Storage};
pub use crate::utils::error::Result;

pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::{LocalStorage, TomlConfig};

pub use app::pipelines::FeedPipeline;
pub use core::{engine::ProximityEngine, series::detect_series};
pub use domain::model::{
    Coordinates, DetectionConfig, DistanceMatrix, DistanceUnit, EarthModel, Position,
    ProximityResult, SeriesReport, SeriesResult, Snapshot, Timestamp,
};
pub use utils::error::{ProximityError, Result};

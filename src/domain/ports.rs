use crate::domain::model::{Coordinates, DetectionConfig, SeriesReport};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn input_path(&self) -> &str;
    fn output_path(&self) -> &str;
    fn output_formats(&self) -> &[String];
    fn detection(&self) -> DetectionConfig;
}

/// Geodesic distance primitive.
///
/// Implementations must return exactly `0.0` for coincident points and the same
/// value regardless of argument order, and must not panic on antipodal input.
pub trait DistanceModel: Send + Sync {
    fn name(&self) -> &'static str;
    fn distance_m(&self, a: Coordinates, b: Coordinates) -> f64;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<serde_json::Value>>;
    async fn transform(&self, data: Vec<serde_json::Value>) -> Result<SeriesReport>;
    async fn load(&self, report: SeriesReport) -> Result<String>;
}

use crate::core::geodesy::distance_model;
use crate::core::series::detect_series;
use crate::core::{ConfigProvider, Pipeline, SeriesReport, Storage, Timestamp};
use crate::utils::error::{ProximityError, Result};
use serde::Serialize;
use serde_json::Value;

pub const REPORT_FILENAME: &str = "proximity_report.json";
pub const SUMMARY_FILENAME: &str = "proximity_summary.csv";

/// Reads a JSON array of feed records, runs detection and writes the report files.
pub struct FeedPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
}

impl<S: Storage, C: ConfigProvider> FeedPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self { storage, config }
    }

    fn wants_format(&self, format: &str) -> bool {
        self.config.output_formats().iter().any(|f| f == format)
    }

    fn output_file(&self, name: &str) -> String {
        format!("{}/{}", self.config.output_path().trim_end_matches('/'), name)
    }
}

#[derive(Debug, Serialize)]
struct SummaryRow<'a> {
    timestamp: Timestamp,
    time_utc: String,
    technicians: usize,
    flagged: bool,
    closest_first: &'a str,
    closest_second: &'a str,
    closest_distance: Option<f64>,
}

fn summary_csv(report: &SeriesReport) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    for (timestamp, result) in &report.results {
        let time_utc = timestamp
            .to_datetime()
            .map(|t| t.to_rfc3339())
            .unwrap_or_default();
        let closest = result.closest_pair.as_ref();
        writer.serialize(SummaryRow {
            timestamp: *timestamp,
            time_utc,
            technicians: result.distance_matrix.len(),
            flagged: result.flagged,
            closest_first: closest.map(|p| p.first.as_str()).unwrap_or(""),
            closest_second: closest.map(|p| p.second.as_str()).unwrap_or(""),
            closest_distance: closest.map(|p| p.distance),
        })?;
    }

    writer
        .into_inner()
        .map_err(|e| ProximityError::IoError(e.into_error()))
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for FeedPipeline<S, C> {
    async fn extract(&self) -> Result<Vec<Value>> {
        tracing::debug!("Reading feed from: {}", self.config.input_path());
        let bytes = self.storage.read_file(self.config.input_path()).await?;

        match serde_json::from_slice::<Value>(&bytes)? {
            Value::Array(records) => Ok(records),
            other => Err(ProximityError::malformed(format!(
                "feed must be a JSON array of records, found {}",
                match other {
                    Value::Object(_) => "an object",
                    Value::Null => "null",
                    _ => "a scalar",
                }
            ))),
        }
    }

    async fn transform(&self, data: Vec<Value>) -> Result<SeriesReport> {
        let detection = self.config.detection();
        let model = distance_model(detection.model);
        tracing::debug!(
            "Detecting with {} at threshold {}{}",
            model.name(),
            detection.threshold,
            detection.unit
        );
        detect_series(&data, &detection, model.as_ref())
    }

    async fn load(&self, report: SeriesReport) -> Result<String> {
        let report_path = self.output_file(REPORT_FILENAME);

        if self.wants_format("json") {
            let json = serde_json::to_vec_pretty(&report)?;
            tracing::debug!("Writing JSON report ({} bytes)", json.len());
            self.storage.write_file(&report_path, &json).await?;
        }

        if self.wants_format("csv") {
            let csv_data = summary_csv(&report)?;
            tracing::debug!("Writing CSV summary ({} bytes)", csv_data.len());
            self.storage
                .write_file(&self.output_file(SUMMARY_FILENAME), &csv_data)
                .await?;
        }

        Ok(self.config.output_path().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::DetectionConfig;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone, Default)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        async fn put_file(&self, path: &str, data: Vec<u8>) {
            self.files.lock().await.insert(path.to_string(), data);
        }

        async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            self.files.lock().await.get(path).cloned()
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                ProximityError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            self.files.lock().await.insert(path.to_string(), data.to_vec());
            Ok(())
        }
    }

    struct MockConfig {
        formats: Vec<String>,
    }

    impl ConfigProvider for MockConfig {
        fn input_path(&self) -> &str {
            "feed.json"
        }

        fn output_path(&self) -> &str {
            "out"
        }

        fn output_formats(&self) -> &[String] {
            &self.formats
        }

        fn detection(&self) -> DetectionConfig {
            DetectionConfig::default()
        }
    }

    fn feed() -> Value {
        json!([
            { "features": [
                { "properties": { "name": "Tech 1", "bearing": 10, "tsecs": 1592078400 },
                  "geometry": { "coordinates": [-122.4194, 37.7749] } },
                { "properties": { "name": "Tech 2", "bearing": 20, "tsecs": 1592078400 },
                  "geometry": { "coordinates": [-122.4195, 37.7749] } }
            ] },
            { "features": [] }
        ])
    }

    #[tokio::test]
    async fn test_feed_pipeline_writes_both_formats() {
        let storage = MockStorage::default();
        storage
            .put_file("feed.json", serde_json::to_vec(&feed()).unwrap())
            .await;
        let pipeline = FeedPipeline::new(
            storage.clone(),
            MockConfig {
                formats: vec!["json".to_string(), "csv".to_string()],
            },
        );

        let raw = pipeline.extract().await.unwrap();
        assert_eq!(raw.len(), 2);

        let report = pipeline.transform(raw).await.unwrap();
        assert_eq!(report.results.len(), 1);
        assert!(report.results[&Timestamp::from(1592078400)].flagged);

        let output = pipeline.load(report).await.unwrap();
        assert_eq!(output, "out");

        let json_bytes = storage.get_file("out/proximity_report.json").await.unwrap();
        let written: Value = serde_json::from_slice(&json_bytes).unwrap();
        assert_eq!(written["results"]["1592078400"]["flagged"], json!(true));
        assert_eq!(written["skippedEmpty"], json!(1));

        let csv_bytes = storage.get_file("out/proximity_summary.csv").await.unwrap();
        let csv_text = String::from_utf8(csv_bytes).unwrap();
        let mut lines = csv_text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "timestamp,time_utc,technicians,flagged,closest_first,closest_second,closest_distance"
        );
        let row = lines.next().unwrap();
        assert!(row.starts_with("1592078400,2020-06-13T20:00:00+00:00,2,true,Tech 1,Tech 2,"));
    }

    #[tokio::test]
    async fn test_extract_rejects_non_array_feed() {
        let storage = MockStorage::default();
        storage.put_file("feed.json", b"{\"features\": []}".to_vec()).await;
        let pipeline = FeedPipeline::new(
            storage,
            MockConfig {
                formats: vec!["json".to_string()],
            },
        );

        let err = pipeline.extract().await.unwrap_err();
        assert!(matches!(err, ProximityError::MalformedRecord { .. }));
    }

    #[tokio::test]
    async fn test_missing_input_is_io_error() {
        let pipeline = FeedPipeline::new(
            MockStorage::default(),
            MockConfig {
                formats: vec!["json".to_string()],
            },
        );
        assert!(matches!(
            pipeline.extract().await.unwrap_err(),
            ProximityError::IoError(_)
        ));
    }
}

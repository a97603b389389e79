use crate::core::Pipeline;
use crate::utils::error::Result;

pub struct ProximityEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> ProximityEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub async fn run(&self) -> Result<String> {
        tracing::info!("Starting proximity detection...");

        // Extract
        let raw_records = self.pipeline.extract().await?;
        tracing::info!("Extracted {} raw records", raw_records.len());

        // Transform
        let report = self.pipeline.transform(raw_records).await?;
        let flagged = report.flagged_timestamps().count();
        if flagged > 0 {
            tracing::warn!(
                "⚠️ {} of {} snapshots have technicians closer than {}{}",
                flagged,
                report.results.len(),
                report.threshold,
                report.unit
            );
        } else {
            tracing::info!("No proximity violations in {} snapshots", report.results.len());
        }

        // Load
        let output_path = self.pipeline.load(report).await?;
        tracing::info!("Report saved to: {}", output_path);

        Ok(output_path)
    }
}

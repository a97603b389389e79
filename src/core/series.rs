use crate::core::matrix::ProximityMatrixBuilder;
use crate::core::normalizer::RecordNormalizer;
use crate::domain::model::{
    DetectionConfig, ProximityResult, RecordError, RecordErrorPolicy, SeriesReport, SeriesResult,
    Timestamp, TimestampPolicy,
};
use crate::domain::ports::DistanceModel;
use crate::utils::error::{ProximityError, Result};
use serde_json::Value;
use std::collections::btree_map::Entry;

/// Runs normalization and proximity detection over a sequence of raw feed records.
///
/// Records with an empty feature list produce no entry. Failures are handled per
/// `config.on_record_error`: `abort` returns the first error, `collect` records it
/// in the report and moves on to the next record.
pub fn detect_series(
    raw_records: &[Value],
    config: &DetectionConfig,
    model: &dyn DistanceModel,
) -> Result<SeriesReport> {
    let normalizer = RecordNormalizer::new(config.validate_timestamps);
    let builder = ProximityMatrixBuilder::new(model, config.threshold, config.unit);

    let mut results = SeriesResult::new();
    let mut skipped_empty = 0;
    let mut overwritten = 0;
    let mut errors = Vec::new();

    for (index, raw) in raw_records.iter().enumerate() {
        let outcome = detect_record(&normalizer, &builder, raw).and_then(|detected| {
            let Some((timestamp, result)) = detected else {
                tracing::debug!("Record {} has no technicians, skipping", index);
                skipped_empty += 1;
                return Ok(());
            };

            match results.entry(timestamp) {
                Entry::Vacant(slot) => {
                    slot.insert(result);
                }
                Entry::Occupied(mut slot) => match config.duplicate_timestamps {
                    TimestampPolicy::Reject => {
                        return Err(ProximityError::DuplicateTimestamp { timestamp });
                    }
                    TimestampPolicy::Overwrite => {
                        tracing::warn!(
                            "Record {} repeats timestamp {}, replacing the earlier result",
                            index,
                            timestamp
                        );
                        slot.insert(result);
                        overwritten += 1;
                    }
                },
            }
            Ok(())
        });

        if let Err(e) = outcome {
            match config.on_record_error {
                RecordErrorPolicy::Abort => return Err(e),
                RecordErrorPolicy::Collect => {
                    tracing::warn!("Record {} rejected: {}", index, e);
                    errors.push(RecordError {
                        index,
                        message: e.to_string(),
                    });
                }
            }
        }
    }

    let report = SeriesReport {
        threshold: config.threshold,
        unit: config.unit,
        results,
        skipped_empty,
        overwritten,
        errors,
    };

    tracing::info!(
        "Processed {} records with {}: {} snapshots, {} flagged, {} empty, {} rejected",
        raw_records.len(),
        model.name(),
        report.results.len(),
        report.flagged_timestamps().count(),
        report.skipped_empty,
        report.errors.len()
    );

    Ok(report)
}

fn detect_record(
    normalizer: &RecordNormalizer,
    builder: &ProximityMatrixBuilder<'_>,
    raw: &Value,
) -> Result<Option<(Timestamp, ProximityResult)>> {
    let Some(snapshot) = normalizer.normalize(raw)? else {
        return Ok(None);
    };
    let result = builder.build(&snapshot)?;
    tracing::debug!(
        "Snapshot {}: {} technicians, flagged={}",
        snapshot.timestamp,
        snapshot.technicians.len(),
        result.flagged
    );
    Ok(Some((snapshot.timestamp, result)))
}

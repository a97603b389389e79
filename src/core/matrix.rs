use crate::domain::model::{ClosestPair, DistanceMatrix, DistanceUnit, ProximityResult, Snapshot};
use crate::domain::ports::DistanceModel;
use crate::utils::error::{ProximityError, Result};
use std::collections::{BTreeMap, HashSet};

/// Builds the pairwise distance matrix for one snapshot and flags it when two
/// distinct technicians are strictly closer than the threshold.
pub struct ProximityMatrixBuilder<'a> {
    model: &'a dyn DistanceModel,
    threshold: f64,
    unit: DistanceUnit,
}

impl<'a> ProximityMatrixBuilder<'a> {
    pub fn new(model: &'a dyn DistanceModel, threshold: f64, unit: DistanceUnit) -> Self {
        Self {
            model,
            threshold,
            unit,
        }
    }

    pub fn build(&self, snapshot: &Snapshot) -> Result<ProximityResult> {
        let technicians = &snapshot.technicians;

        let mut seen = HashSet::with_capacity(technicians.len());
        for tech in technicians {
            if !seen.insert(tech.name.as_str()) {
                return Err(ProximityError::DuplicateName {
                    timestamp: snapshot.timestamp,
                    name: tech.name.clone(),
                });
            }
        }

        let mut distance_matrix = DistanceMatrix::new();
        let mut flagged = false;
        let mut closest_pair: Option<ClosestPair> = None;

        // Every ordered pair is visited, self-pairs included, so the matrix is complete.
        for (i, from) in technicians.iter().enumerate() {
            let mut row = BTreeMap::new();
            for (j, to) in technicians.iter().enumerate() {
                let distance = self
                    .unit
                    .from_meters(self.model.distance_m(from.coordinates, to.coordinates));

                if i != j {
                    if distance < self.threshold {
                        flagged = true;
                    }
                    let closer = closest_pair
                        .as_ref()
                        .map_or(true, |pair| distance < pair.distance);
                    if i < j && closer {
                        closest_pair = Some(ClosestPair {
                            first: from.name.clone(),
                            second: to.name.clone(),
                            distance,
                        });
                    }
                }

                row.insert(to.name.clone(), distance);
            }
            distance_matrix.insert(from.name.clone(), row);
        }

        if flagged {
            if let Some(pair) = &closest_pair {
                tracing::debug!(
                    "⚠️ {}: {} and {} are {:.1}{} apart (threshold {}{})",
                    snapshot.timestamp,
                    pair.first,
                    pair.second,
                    pair.distance,
                    self.unit,
                    self.threshold,
                    self.unit
                );
            }
        }

        Ok(ProximityResult {
            distance_matrix,
            flagged,
            closest_pair,
        })
    }
}

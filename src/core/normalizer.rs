use crate::domain::model::{Coordinates, Position, Snapshot, Timestamp};
use crate::utils::error::{ProximityError, Result};
use serde_json::Value;

/// Converts raw feed records (GeoJSON feature collections) into [`Snapshot`]s.
///
/// Expected shape:
///
/// ```json
/// { "features": [
///     { "properties": { "name": "Tech 1", "bearing": 90, "tsecs": 1592078400 },
///       "geometry": { "coordinates": [-122.4194, 37.7749] } }
/// ] }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RecordNormalizer {
    validate_timestamps: bool,
}

impl Default for RecordNormalizer {
    fn default() -> Self {
        Self::new(true)
    }
}

impl RecordNormalizer {
    /// With `validate_timestamps` off, the first feature's timestamp is authoritative
    /// and later features are not checked against it.
    pub fn new(validate_timestamps: bool) -> Self {
        Self {
            validate_timestamps,
        }
    }

    /// Returns `Ok(None)` for a record with an empty feature list; callers skip it.
    pub fn normalize(&self, raw: &Value) -> Result<Option<Snapshot>> {
        let features = raw
            .get("features")
            .ok_or_else(|| ProximityError::malformed("record is missing the 'features' list"))?
            .as_array()
            .ok_or_else(|| ProximityError::malformed("'features' is not a list"))?;

        if features.is_empty() {
            return Ok(None);
        }

        let timestamp = feature_timestamp(0, &features[0])?;
        let mut technicians = Vec::with_capacity(features.len());

        for (index, feature) in features.iter().enumerate() {
            if self.validate_timestamps && index > 0 {
                let found = feature_timestamp(index, feature)?;
                if found != timestamp {
                    return Err(ProximityError::InconsistentTimestamp {
                        feature: index,
                        expected: timestamp,
                        found,
                    });
                }
            }
            technicians.push(normalize_feature(index, feature)?);
        }

        Ok(Some(Snapshot {
            timestamp,
            technicians,
        }))
    }
}

fn properties(index: usize, feature: &Value) -> Result<&Value> {
    feature.get("properties").ok_or_else(|| {
        ProximityError::malformed(format!("feature {} is missing 'properties'", index))
    })
}

fn feature_timestamp(index: usize, feature: &Value) -> Result<Timestamp> {
    let value = properties(index, feature)?.get("tsecs").ok_or_else(|| {
        ProximityError::malformed(format!("feature {} is missing 'properties.tsecs'", index))
    })?;

    value
        .as_f64()
        .and_then(Timestamp::from_seconds)
        .ok_or_else(|| {
            ProximityError::malformed(format!(
                "feature {} has a non-numeric timestamp: {}",
                index, value
            ))
        })
}

fn normalize_feature(index: usize, feature: &Value) -> Result<Position> {
    let props = properties(index, feature)?;

    let name = props
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            ProximityError::malformed(format!(
                "feature {} is missing a string 'properties.name'",
                index
            ))
        })?
        .to_string();

    let bearing = props.get("bearing").and_then(Value::as_f64).ok_or_else(|| {
        ProximityError::malformed(format!(
            "feature {} ('{}') is missing a numeric 'properties.bearing'",
            index, name
        ))
    })?;

    let pair = feature
        .get("geometry")
        .and_then(|geometry| geometry.get("coordinates"))
        .and_then(Value::as_array)
        .ok_or_else(|| {
            ProximityError::malformed(format!(
                "feature {} ('{}') is missing 'geometry.coordinates'",
                index, name
            ))
        })?;

    let numbers: Vec<f64> = pair.iter().filter_map(Value::as_f64).collect();
    if pair.len() != 2 || numbers.len() != 2 {
        return Err(ProximityError::malformed(format!(
            "feature {} ('{}') coordinates must be [longitude, latitude], got {}",
            index,
            name,
            Value::Array(pair.clone())
        )));
    }

    let coordinates = Coordinates::from_lon_lat([numbers[0], numbers[1]]);
    if !coordinates.longitude.is_finite() || !(-90.0..=90.0).contains(&coordinates.latitude) {
        return Err(ProximityError::malformed(format!(
            "feature {} ('{}') has out-of-range coordinates: lat {}, lon {}",
            index, name, coordinates.latitude, coordinates.longitude
        )));
    }

    Ok(Position {
        name,
        bearing,
        coordinates,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn feature(name: &str, tsecs: i64, lon: f64, lat: f64) -> Value {
        json!({
            "type": "Feature",
            "properties": { "name": name, "bearing": 45, "tsecs": tsecs, "speed": 3.2 },
            "geometry": { "type": "Point", "coordinates": [lon, lat] }
        })
    }

    #[test]
    fn test_normalize_extracts_positions() {
        let raw = json!({
            "type": "FeatureCollection",
            "features": [
                feature("Tech 1", 1592078400, -122.41, 37.77),
                feature("Tech 2", 1592078400, -122.42, 37.78)
            ]
        });

        let snapshot = RecordNormalizer::default().normalize(&raw).unwrap().unwrap();

        assert_eq!(snapshot.timestamp, Timestamp::from(1592078400));
        assert_eq!(snapshot.technicians.len(), 2);
        assert_eq!(snapshot.technicians[0].name, "Tech 1");
        assert_eq!(snapshot.technicians[0].bearing, 45.0);
        assert_eq!(snapshot.technicians[0].coordinates.latitude, 37.77);
        assert_eq!(snapshot.technicians[0].coordinates.longitude, -122.41);
        assert_eq!(snapshot.technicians[1].name, "Tech 2");
    }

    #[test]
    fn test_empty_feature_list_is_skipped() {
        let raw = json!({ "features": [] });
        assert!(RecordNormalizer::default().normalize(&raw).unwrap().is_none());
    }

    #[test]
    fn test_missing_features_is_malformed() {
        let err = RecordNormalizer::default()
            .normalize(&json!({ "type": "FeatureCollection" }))
            .unwrap_err();
        assert!(matches!(err, ProximityError::MalformedRecord { .. }));
    }

    #[test]
    fn test_missing_fields_are_malformed() {
        let normalizer = RecordNormalizer::default();

        let no_name = json!({ "features": [{
            "properties": { "bearing": 0, "tsecs": 1 },
            "geometry": { "coordinates": [0.0, 0.0] }
        }]});
        let no_bearing = json!({ "features": [{
            "properties": { "name": "A", "tsecs": 1 },
            "geometry": { "coordinates": [0.0, 0.0] }
        }]});
        let no_coordinates = json!({ "features": [{
            "properties": { "name": "A", "bearing": 0, "tsecs": 1 },
            "geometry": {}
        }]});

        for raw in [no_name, no_bearing, no_coordinates] {
            let err = normalizer.normalize(&raw).unwrap_err();
            assert!(matches!(err, ProximityError::MalformedRecord { .. }), "{}", err);
        }
    }

    #[test]
    fn test_bad_coordinate_pairs_are_malformed() {
        let normalizer = RecordNormalizer::default();
        for coordinates in [json!([1.0]), json!([1.0, "x"]), json!([0.0, 91.0]), json!([1.0, 2.0, 3.0])] {
            let raw = json!({ "features": [{
                "properties": { "name": "A", "bearing": 0, "tsecs": 1 },
                "geometry": { "coordinates": coordinates }
            }]});
            assert!(normalizer.normalize(&raw).is_err());
        }
    }

    #[test]
    fn test_inconsistent_timestamps() {
        let raw = json!({
            "features": [feature("Tech 1", 100, 0.0, 0.0), feature("Tech 2", 101, 0.0, 0.0)]
        });

        let err = RecordNormalizer::new(true).normalize(&raw).unwrap_err();
        assert!(matches!(
            err,
            ProximityError::InconsistentTimestamp { feature: 1, expected, found }
                if expected == Timestamp::from(100) && found == Timestamp::from(101)
        ));

        let snapshot = RecordNormalizer::new(false).normalize(&raw).unwrap().unwrap();
        assert_eq!(snapshot.timestamp, Timestamp::from(100));
    }

    #[test]
    fn test_float_timestamps() {
        let whole = json!({ "features": [{
            "properties": { "name": "A", "bearing": 0, "tsecs": 1592078400.0 },
            "geometry": { "coordinates": [0.0, 0.0] }
        }]});
        let snapshot = RecordNormalizer::default().normalize(&whole).unwrap().unwrap();
        assert_eq!(snapshot.timestamp, Timestamp::from(1592078400));
    }

    #[test]
    fn test_fractional_timestamp_is_kept() {
        let raw = json!({ "features": [
            { "properties": { "name": "A", "bearing": 0, "tsecs": 1592078400.5 },
              "geometry": { "coordinates": [0.0, 0.0] } },
            { "properties": { "name": "B", "bearing": 0, "tsecs": 1592078400.5 },
              "geometry": { "coordinates": [0.0, 0.001] } }
        ]});
        let snapshot = RecordNormalizer::default().normalize(&raw).unwrap().unwrap();
        assert_eq!(snapshot.timestamp.seconds(), 1592078400.5);
        assert_ne!(snapshot.timestamp, Timestamp::from(1592078400));

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["timestamp"], json!("1592078400.5"));
        let back: Snapshot = serde_json::from_value(json).unwrap();
        assert_eq!(back, snapshot);
    }

    #[test]
    fn test_non_numeric_timestamp_is_malformed() {
        let raw = json!({ "features": [{
            "properties": { "name": "A", "bearing": 0, "tsecs": "noon" },
            "geometry": { "coordinates": [0.0, 0.0] }
        }]});
        let err = RecordNormalizer::default().normalize(&raw).unwrap_err();
        assert!(matches!(err, ProximityError::MalformedRecord { .. }));
    }
}

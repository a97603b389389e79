use chrono::{DateTime, Utc};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// A point on the Earth's surface in degrees.
///
/// The feed orders coordinate pairs as `[longitude, latitude]`; build from that
/// ordering with [`Coordinates::from_lon_lat`] so the swap happens in exactly one place.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn from_lon_lat(pair: [f64; 2]) -> Self {
        Self::new(pair[1], pair[0])
    }
}

/// Seconds since the Unix epoch, as reported by the feed. Fractional seconds are kept.
///
/// Ordered with `total_cmp` so it can key a [`SeriesResult`]. Serializes as a string so
/// it is usable as a JSON object key.
#[derive(Debug, Clone, Copy)]
pub struct Timestamp(f64);

impl Timestamp {
    /// `None` for NaN or infinite seconds.
    pub fn from_seconds(seconds: f64) -> Option<Self> {
        // Adding 0.0 folds -0.0 into 0.0.
        seconds.is_finite().then_some(Self(seconds + 0.0))
    }

    pub fn seconds(self) -> f64 {
        self.0
    }

    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        let whole = self.0.floor();
        let nanos = ((self.0 - whole) * 1e9).round().min(999_999_999.0) as u32;
        DateTime::from_timestamp(whole as i64, nanos)
    }
}

impl From<i64> for Timestamp {
    fn from(seconds: i64) -> Self {
        Self(seconds as f64)
    }
}

impl PartialEq for Timestamp {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Timestamp {}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.fract() == 0.0 && self.0.abs() < 9_007_199_254_740_992.0 {
            write!(f, "{}", self.0 as i64)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

struct TimestampVisitor;

impl<'de> Visitor<'de> for TimestampVisitor {
    type Value = Timestamp;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a finite number of seconds")
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<Timestamp, E> {
        Timestamp::from_seconds(v).ok_or_else(|| E::custom(format!("non-finite timestamp {}", v)))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Timestamp, E> {
        Ok(Timestamp::from(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Timestamp, E> {
        self.visit_f64(v as f64)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Timestamp, E> {
        let seconds: f64 = v
            .parse()
            .map_err(|_| E::custom(format!("invalid timestamp '{}'", v)))?;
        self.visit_f64(seconds)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(TimestampVisitor)
    }
}

/// A technician's location at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub name: String,
    /// Heading in degrees. Carried through, not used by detection.
    pub bearing: f64,
    pub coordinates: Coordinates,
}

/// Every technician position recorded at one timestamp, in feed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub timestamp: Timestamp,
    pub technicians: Vec<Position>,
}

/// `matrix[a][b]` is the distance between technicians `a` and `b`.
pub type DistanceMatrix = BTreeMap<String, BTreeMap<String, f64>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosestPair {
    pub first: String,
    pub second: String,
    pub distance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProximityResult {
    pub distance_matrix: DistanceMatrix,
    pub flagged: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub closest_pair: Option<ClosestPair>,
}

pub type SeriesResult = BTreeMap<Timestamp, ProximityResult>;

/// A record that failed under the `collect` error policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordError {
    pub index: usize,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesReport {
    pub threshold: f64,
    pub unit: DistanceUnit,
    pub results: SeriesResult,
    pub skipped_empty: usize,
    pub overwritten: usize,
    pub errors: Vec<RecordError>,
}

impl SeriesReport {
    pub fn flagged_timestamps(&self) -> impl Iterator<Item = Timestamp> + '_ {
        self.results
            .iter()
            .filter(|(_, result)| result.flagged)
            .map(|(timestamp, _)| *timestamp)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum DistanceUnit {
    #[default]
    Feet,
    Meters,
    Kilometers,
    Miles,
}

impl DistanceUnit {
    const METERS_PER_FOOT: f64 = 0.3048;
    const METERS_PER_MILE: f64 = 1609.344;

    pub fn from_meters(self, meters: f64) -> f64 {
        match self {
            Self::Feet => meters / Self::METERS_PER_FOOT,
            Self::Meters => meters,
            Self::Kilometers => meters / 1000.0,
            Self::Miles => meters / Self::METERS_PER_MILE,
        }
    }

    pub fn abbreviation(self) -> &'static str {
        match self {
            Self::Feet => "ft",
            Self::Meters => "m",
            Self::Kilometers => "km",
            Self::Miles => "mi",
        }
    }
}

impl fmt::Display for DistanceUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.abbreviation())
    }
}

/// Earth model used for the distance primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum EarthModel {
    #[default]
    Ellipsoidal,
    Spherical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum TimestampPolicy {
    #[default]
    Reject,
    Overwrite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum RecordErrorPolicy {
    #[default]
    Abort,
    Collect,
}

pub const DEFAULT_THRESHOLD: f64 = 1000.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Distinct technicians strictly closer than this (in `unit`) flag the snapshot.
    pub threshold: f64,
    pub unit: DistanceUnit,
    pub model: EarthModel,
    pub validate_timestamps: bool,
    pub duplicate_timestamps: TimestampPolicy,
    pub on_record_error: RecordErrorPolicy,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            unit: DistanceUnit::default(),
            model: EarthModel::default(),
            validate_timestamps: true,
            duplicate_timestamps: TimestampPolicy::default(),
            on_record_error: RecordErrorPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_lon_lat_swaps_ordering() {
        let coords = Coordinates::from_lon_lat([-122.4, 37.8]);
        assert_eq!(coords.latitude, 37.8);
        assert_eq!(coords.longitude, -122.4);
    }

    #[test]
    fn test_timestamp_ordering_and_display() {
        let whole = Timestamp::from(1592078400);
        let half = Timestamp::from_seconds(1592078400.5).unwrap();
        assert!(whole < half);
        assert_eq!(whole.to_string(), "1592078400");
        assert_eq!(half.to_string(), "1592078400.5");
        assert_eq!(Timestamp::from_seconds(-0.0), Timestamp::from_seconds(0.0));
        assert!(Timestamp::from_seconds(f64::NAN).is_none());
    }

    #[test]
    fn test_fractional_timestamp_round_trips_as_map_key() {
        let mut series: BTreeMap<Timestamp, bool> = BTreeMap::new();
        series.insert(Timestamp::from_seconds(1592078400.5).unwrap(), true);
        series.insert(Timestamp::from(1592078401), false);

        let json = serde_json::to_string(&series).unwrap();
        assert_eq!(json, r#"{"1592078400.5":true,"1592078401":false}"#);

        let back: BTreeMap<Timestamp, bool> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, series);
    }

    #[test]
    fn test_timestamp_to_datetime() {
        let t = Timestamp::from_seconds(1592078400.5).unwrap().to_datetime().unwrap();
        assert_eq!(t.to_rfc3339(), "2020-06-13T20:00:00.500+00:00");
        let t = Timestamp::from(1592078400).to_datetime().unwrap();
        assert_eq!(t.to_rfc3339(), "2020-06-13T20:00:00+00:00");
    }

    #[test]
    fn test_unit_conversion() {
        assert!((DistanceUnit::Feet.from_meters(0.3048) - 1.0).abs() < 1e-12);
        assert_eq!(DistanceUnit::Meters.from_meters(42.0), 42.0);
        assert!((DistanceUnit::Kilometers.from_meters(1500.0) - 1.5).abs() < 1e-12);
        assert!((DistanceUnit::Miles.from_meters(1609.344) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_detection_config_defaults() {
        let config = DetectionConfig::default();
        assert_eq!(config.threshold, 1000.0);
        assert_eq!(config.unit, DistanceUnit::Feet);
        assert_eq!(config.model, EarthModel::Ellipsoidal);
        assert!(config.validate_timestamps);
    }

    #[test]
    fn test_proximity_result_serializes_camel_case() {
        let result = ProximityResult {
            distance_matrix: DistanceMatrix::new(),
            flagged: false,
            closest_pair: None,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("distanceMatrix").is_some());
        assert!(json.get("closestPair").is_none());
    }
}

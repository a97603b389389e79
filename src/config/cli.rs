use crate::config::OUTPUT_FORMATS;
use crate::core::ConfigProvider;
use crate::domain::model::{
    DetectionConfig, DistanceUnit, EarthModel, RecordErrorPolicy, TimestampPolicy,
    DEFAULT_THRESHOLD,
};
use crate::utils::error::Result;
use crate::utils::validation::{
    validate_output_formats, validate_path, validate_positive_distance, Validate,
};
use clap::Parser;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "tech-proximity")]
#[command(about = "Flag technicians that come closer than a safety distance")]
pub struct CliConfig {
    /// JSON array of technician location snapshots
    #[arg(long, default_value = "api_technician_response_data.json")]
    pub input: String,

    #[arg(long, default_value = "./output")]
    pub output_path: String,

    /// Proximity threshold, in --unit
    #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
    pub threshold: f64,

    #[arg(long, value_enum, default_value_t = DistanceUnit::Feet)]
    pub unit: DistanceUnit,

    #[arg(long, value_enum, default_value_t = EarthModel::Ellipsoidal)]
    pub model: EarthModel,

    #[arg(long, value_delimiter = ',', default_value = "json")]
    pub output_formats: Vec<String>,

    /// Use the first feature's timestamp without checking the others against it
    #[arg(long)]
    pub trust_first_timestamp: bool,

    #[arg(long, value_enum, default_value_t = TimestampPolicy::Reject)]
    pub duplicate_timestamps: TimestampPolicy,

    #[arg(long, value_enum, default_value_t = RecordErrorPolicy::Abort)]
    pub on_record_error: RecordErrorPolicy,

    /// Load settings from a TOML file instead of the flags above
    #[arg(long)]
    pub config: Option<String>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,
}

impl ConfigProvider for CliConfig {
    fn input_path(&self) -> &str {
        &self.input
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn output_formats(&self) -> &[String] {
        &self.output_formats
    }

    fn detection(&self) -> DetectionConfig {
        DetectionConfig {
            threshold: self.threshold,
            unit: self.unit,
            model: self.model,
            validate_timestamps: !self.trust_first_timestamp,
            duplicate_timestamps: self.duplicate_timestamps,
            on_record_error: self.on_record_error,
        }
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_path("input", &self.input)?;
        validate_path("output_path", &self.output_path)?;
        validate_positive_distance("threshold", self.threshold)?;
        validate_output_formats("output_formats", &self.output_formats, &OUTPUT_FORMATS)
    }
}

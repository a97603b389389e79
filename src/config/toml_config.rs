use crate::config::OUTPUT_FORMATS;
use crate::core::ConfigProvider;
use crate::domain::model::{
    DetectionConfig, DistanceUnit, EarthModel, RecordErrorPolicy, TimestampPolicy,
};
use crate::utils::error::{ProximityError, Result};
use crate::utils::validation::{
    validate_output_formats, validate_path, validate_positive_distance, Validate,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub pipeline: Option<PipelineConfig>,
    pub source: SourceConfig,
    pub detection: Option<DetectionSection>,
    pub load: LoadConfig,
    pub error_handling: Option<ErrorHandlingConfig>,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub input_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionSection {
    pub threshold: Option<f64>,
    pub unit: Option<DistanceUnit>,
    pub model: Option<EarthModel>,
    pub validate_timestamps: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    pub output_path: String,
    #[serde(default = "default_output_formats")]
    pub output_formats: Vec<String>,
}

fn default_output_formats() -> Vec<String> {
    vec!["json".to_string()]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorHandlingConfig {
    pub on_record_error: Option<RecordErrorPolicy>,
    pub duplicate_timestamps: Option<TimestampPolicy>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub verbose: Option<bool>,
    pub json: Option<bool>,
}

impl TomlConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ProximityError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// Parses configuration from a TOML string, after `${VAR}` substitution.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| ProximityError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` references (e.g. `${FEED_PATH}`) with environment values.
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ProximityError::ConfigValidationError {
            field: "environment".to_string(),
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn verbose(&self) -> bool {
        self.logging
            .as_ref()
            .and_then(|l| l.verbose)
            .unwrap_or(false)
    }

    pub fn json_logs(&self) -> bool {
        self.logging.as_ref().and_then(|l| l.json).unwrap_or(false)
    }
}

impl ConfigProvider for TomlConfig {
    fn input_path(&self) -> &str {
        &self.source.input_path
    }

    fn output_path(&self) -> &str {
        &self.load.output_path
    }

    fn output_formats(&self) -> &[String] {
        &self.load.output_formats
    }

    fn detection(&self) -> DetectionConfig {
        let mut detection = DetectionConfig::default();

        if let Some(section) = &self.detection {
            if let Some(threshold) = section.threshold {
                detection.threshold = threshold;
            }
            if let Some(unit) = section.unit {
                detection.unit = unit;
            }
            if let Some(model) = section.model {
                detection.model = model;
            }
            if let Some(validate) = section.validate_timestamps {
                detection.validate_timestamps = validate;
            }
        }

        if let Some(handling) = &self.error_handling {
            if let Some(policy) = handling.on_record_error {
                detection.on_record_error = policy;
            }
            if let Some(policy) = handling.duplicate_timestamps {
                detection.duplicate_timestamps = policy;
            }
        }

        detection
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        validate_path("source.input_path", &self.source.input_path)?;
        validate_path("load.output_path", &self.load.output_path)?;
        validate_positive_distance("detection.threshold", self.detection().threshold)?;
        validate_output_formats("load.output_formats", self.output_formats(), &OUTPUT_FORMATS)
    }
}

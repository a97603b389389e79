use crate::domain::model::Timestamp;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProximityError {
    #[error("Malformed record: {message}")]
    MalformedRecord { message: String },

    #[error("Duplicate technician name '{name}' in snapshot at {timestamp}")]
    DuplicateName { timestamp: Timestamp, name: String },

    #[error("Inconsistent timestamps in record: feature {feature} has {found}, expected {expected}")]
    InconsistentTimestamp {
        feature: usize,
        expected: Timestamp,
        found: Timestamp,
    },

    #[error("Duplicate timestamp {timestamp} in input sequence")]
    DuplicateTimestamp { timestamp: Timestamp },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Configuration error in {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Data,
    Io,
    Configuration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ProximityError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedRecord {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::MalformedRecord { .. }
            | Self::DuplicateName { .. }
            | Self::InconsistentTimestamp { .. }
            | Self::DuplicateTimestamp { .. }
            | Self::SerializationError(_)
            | Self::CsvError(_) => ErrorCategory::Data,
            Self::IoError(_) => ErrorCategory::Io,
            Self::ConfigValidationError { .. } | Self::InvalidConfigValueError { .. } => {
                ErrorCategory::Configuration
            }
        }
    }

    /// None of these are transient: there is no retryable condition in this crate.
    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Data => ErrorSeverity::High,
            ErrorCategory::Io => ErrorSeverity::Critical,
            ErrorCategory::Configuration => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::MalformedRecord { .. } => {
                "Check that every feature carries properties.name, properties.bearing, properties.tsecs and geometry.coordinates"
            }
            Self::DuplicateName { .. } => {
                "Technician names must be unique within one snapshot; fix the feed or deduplicate upstream"
            }
            Self::InconsistentTimestamp { .. } => {
                "Split the record per timestamp, or disable timestamp validation to trust the first feature"
            }
            Self::DuplicateTimestamp { .. } => {
                "Remove repeated snapshots, or set duplicate_timestamps = \"overwrite\""
            }
            Self::IoError(_) => "Verify the input path exists and the output directory is writable",
            Self::SerializationError(_) => "Make sure the input file is a JSON array of records",
            Self::CsvError(_) => "Check the output directory and retry without the csv format",
            Self::ConfigValidationError { .. } | Self::InvalidConfigValueError { .. } => {
                "Review the configuration file or CLI arguments"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Data => format!("The location feed could not be processed: {}", self),
            ErrorCategory::Io => format!("File access failed: {}", self),
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, ProximityError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_errors_are_high_severity() {
        let err = ProximityError::DuplicateName {
            timestamp: Timestamp::from(10),
            name: "Tech 1".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Data);
        assert_eq!(err.severity(), ErrorSeverity::High);
        assert!(err.to_string().contains("Tech 1"));
    }

    #[test]
    fn test_config_errors_are_critical() {
        let err = ProximityError::InvalidConfigValueError {
            field: "detection.threshold".to_string(),
            value: "0".to_string(),
            reason: "Value must be a finite number greater than 0".to_string(),
        };
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert!(err.user_friendly_message().starts_with("Invalid configuration"));
    }
}

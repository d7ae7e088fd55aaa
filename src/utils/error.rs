use thiserror::Error;

#[derive(Error, Debug)]
pub enum GalfitError {
    #[error("Unknown parameter: {key}")]
    UnknownParameterError { key: String },

    #[error("Unknown component: {name}")]
    UnknownComponentError { name: String },

    #[error("Invalid argument: {reason}")]
    InvalidArgumentError { reason: String },

    #[error("Malformed feedme record at line {line}: {reason} ({content:?})")]
    MalformedRecordError {
        line: usize,
        content: String,
        reason: String,
    },

    #[error("GalfitM exited with {}", exit_description(.code))]
    ExternalToolFailure {
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error("GalfitM did not finish within {seconds}s")]
    ExternalToolTimeout { seconds: u64 },

    #[error("Survey query failed: {message}")]
    QueryError { message: String },

    #[error("FITS header error: {message}")]
    FitsError { message: String },

    #[error("No zero point for field {field:?} band {band:?}")]
    MissingZeroPointError { field: String, band: String },

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error in {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value {value:?} for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Schema,
    Format,
    ExternalTool,
    Network,
    Data,
    System,
    Configuration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl GalfitError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            GalfitError::UnknownParameterError { .. }
            | GalfitError::UnknownComponentError { .. }
            | GalfitError::InvalidArgumentError { .. } => ErrorCategory::Schema,
            GalfitError::MalformedRecordError { .. } | GalfitError::FitsError { .. } => {
                ErrorCategory::Format
            }
            GalfitError::ExternalToolFailure { .. } | GalfitError::ExternalToolTimeout { .. } => {
                ErrorCategory::ExternalTool
            }
            GalfitError::ApiError(_) | GalfitError::QueryError { .. } => ErrorCategory::Network,
            GalfitError::CsvError(_)
            | GalfitError::SerializationError(_)
            | GalfitError::MissingZeroPointError { .. } => ErrorCategory::Data,
            GalfitError::IoError(_) => ErrorCategory::System,
            GalfitError::ConfigValidationError { .. }
            | GalfitError::InvalidConfigValueError { .. }
            | GalfitError::MissingConfigError { .. } => ErrorCategory::Configuration,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::ExternalTool | ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Schema | ErrorCategory::Format | ErrorCategory::Data => {
                ErrorSeverity::High
            }
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Schema => "Check the base keys, component types and parameter keys against the registry",
            ErrorCategory::Format => "Inspect the file at the reported line; it does not follow the feedme grammar",
            ErrorCategory::ExternalTool => "Check the GalfitM executable path, its stderr output and the timeout",
            ErrorCategory::Network => "Check the survey endpoints, credentials and network connectivity",
            ErrorCategory::Data => "Check the input tables (object list, zero points) for missing rows or columns",
            ErrorCategory::System => "Check file permissions and free disk space",
            ErrorCategory::Configuration => "Fix the configuration file or command-line arguments",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            GalfitError::ExternalToolFailure { stderr, stdout, .. } => {
                let detail = if stderr.trim().is_empty() { stdout } else { stderr };
                let last_line = detail.lines().last().unwrap_or("").trim();
                if last_line.is_empty() {
                    self.to_string()
                } else {
                    format!("{}: {}", self, last_line)
                }
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GalfitError>;

fn exit_description(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_failure_message_uses_last_stderr_line() {
        let err = GalfitError::ExternalToolFailure {
            code: Some(1),
            stdout: "iteration 1\n".to_string(),
            stderr: "reading feedme\nSegmentation fault\n".to_string(),
        };

        assert_eq!(err.category(), ErrorCategory::ExternalTool);
        assert_eq!(err.severity(), ErrorSeverity::Medium);
        assert!(err.user_friendly_message().ends_with("Segmentation fault"));
    }

    #[test]
    fn test_malformed_record_reports_line() {
        let err = GalfitError::MalformedRecordError {
            line: 19,
            content: "3) 10,11,12".to_string(),
            reason: "expected at least 4 segments".to_string(),
        };

        assert_eq!(err.category(), ErrorCategory::Format);
        assert!(err.to_string().contains("line 19"));
        assert!(err.to_string().contains("3) 10,11,12"));
    }
}

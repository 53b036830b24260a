use thiserror::Error;

#[derive(Error, Debug)]
pub enum VizError {
    #[error("Archive request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("FITS error: {0}")]
    FitsError(#[from] fitsio::errors::Error),

    #[error("Archive error: {message}")]
    ArchiveError { message: String },

    #[error("Dataset #{ordinal} could not be materialized: {message}")]
    MaterializationError { ordinal: usize, message: String },

    #[error("Dataset index {index} is out of range ({count} datasets available)")]
    IndexOutOfRange { index: usize, count: usize },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Plotting error: {message}")]
    PlotError { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for '{field}': {value} ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },
}

pub type Result<T> = std::result::Result<T, VizError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Archive,
    Data,
    Rendering,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl VizError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            VizError::ApiError(_) => ErrorCategory::Network,
            VizError::ArchiveError { .. } | VizError::MaterializationError { .. } => {
                ErrorCategory::Archive
            }
            VizError::FitsError(_)
            | VizError::SerializationError(_)
            | VizError::ProcessingError { .. }
            | VizError::IndexOutOfRange { .. } => ErrorCategory::Data,
            VizError::PlotError { .. } => ErrorCategory::Rendering,
            VizError::ConfigError { .. }
            | VizError::InvalidConfigValueError { .. }
            | VizError::MissingConfigError { .. }
            | VizError::ConfigValidationError { .. } => ErrorCategory::Configuration,
            VizError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            // 網路與檔案庫錯誤通常重試即可
            ErrorCategory::Network | ErrorCategory::Archive => ErrorSeverity::Medium,
            ErrorCategory::Data | ErrorCategory::Rendering | ErrorCategory::Configuration => {
                ErrorSeverity::High
            }
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            VizError::ApiError(_) => {
                "Check your network connection and the archive endpoint, then try again".to_string()
            }
            VizError::ArchiveError { .. } => {
                "The archive rejected the request; verify the target identifier".to_string()
            }
            VizError::MaterializationError { .. } => {
                "Retry later, or set flux_on_failure = \"skip\" to render the remaining datasets"
                    .to_string()
            }
            VizError::IndexOutOfRange { count, .. } => {
                format!("Choose a dataset number between 1 and {}", count)
            }
            VizError::FitsError(_) => {
                "The downloaded file is not a readable light curve; try another dataset".to_string()
            }
            VizError::ProcessingError { .. } => {
                "The dataset has too few valid samples for this operation".to_string()
            }
            VizError::PlotError { .. } => {
                "Try a different output format (svg/png) or check installed fonts".to_string()
            }
            VizError::ConfigError { .. }
            | VizError::InvalidConfigValueError { .. }
            | VizError::MissingConfigError { .. }
            | VizError::ConfigValidationError { .. } => {
                "Fix the configuration file or command-line flags".to_string()
            }
            VizError::SerializationError(_) => {
                "The archive returned an unexpected response format".to_string()
            }
            VizError::IoError(_) => {
                "Check that the output directory exists and is writable".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            VizError::ApiError(_) => "Could not reach the light-curve archive".to_string(),
            VizError::IndexOutOfRange { index, count } => format!(
                "Dataset #{} does not exist; this target has {} datasets",
                index, count
            ),
            other => other.to_string(),
        }
    }
}

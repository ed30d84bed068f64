use thiserror::Error;

#[derive(Error, Debug)]
pub enum TranscriptError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid configuration value for '{field}' ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Record store returned HTTP {status}: {message}")]
    StoreError { status: u16, message: String },

    #[error("Record '{record_id}' not found in any candidate table ({tables}): {last}")]
    RecordNotFound {
        record_id: String,
        tables: String,
        #[source]
        last: Box<TranscriptError>,
    },

    #[error("Record '{record_id}' has no student name")]
    MissingStudentName { record_id: String },

    #[error("Attachment via '{transport}' failed: {message}")]
    AttachmentError { transport: String, message: String },

    #[error("Rendering error: {message}")]
    RenderError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Resolution,
    Data,
    Transport,
    Rendering,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl TranscriptError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            Self::RecordNotFound { .. } => ErrorCategory::Resolution,
            Self::MissingStudentName { .. } | Self::SerializationError(_) => ErrorCategory::Data,
            Self::ApiError(_) | Self::StoreError { .. } | Self::AttachmentError { .. } => {
                ErrorCategory::Transport
            }
            Self::RenderError { .. } => ErrorCategory::Rendering,
            Self::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Data => ErrorSeverity::Low,
            ErrorCategory::Resolution | ErrorCategory::Transport => ErrorSeverity::Medium,
            ErrorCategory::Rendering => ErrorSeverity::High,
            ErrorCategory::Configuration | ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    /// True when the store answered 404 for a point lookup.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::StoreError { status: 404, .. })
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::MissingConfigError { .. } => {
                "Provide the missing value via command-line flag, environment variable or config file"
            }
            Self::ConfigError { .. } | Self::InvalidConfigValueError { .. } => {
                "Check the configuration file and environment variables"
            }
            Self::RecordNotFound { .. } => {
                "Verify the record id and that the configured candidate tables include its table"
            }
            Self::MissingStudentName { .. } => "Fill in the student name on the source record",
            Self::StoreError { status: 401 | 403, .. } => {
                "Check the API key and its access to the configured base"
            }
            Self::StoreError { status: 429, .. } => "Rate limited by the record store; retry later",
            Self::ApiError(_) | Self::StoreError { .. } => {
                "Check network connectivity and the record store endpoint"
            }
            Self::AttachmentError { .. } => "Upload the generated PDF manually to the log record",
            Self::RenderError { .. } => "Check the logo and signature files and the output directory",
            Self::IoError(_) => "Check file permissions and free disk space",
            Self::SerializationError(_) => "The record store returned an unexpected payload",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Resolution => format!("Could not find the requested record: {}", self),
            ErrorCategory::Data => format!("Source data problem: {}", self),
            ErrorCategory::Transport => format!("Record store communication failed: {}", self),
            ErrorCategory::Rendering => format!("Transcript rendering failed: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, TranscriptError>;

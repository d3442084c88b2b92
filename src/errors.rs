use thiserror::Error;

/// Custom error types for the annotation pipeline
#[derive(Debug, Error)]
pub enum AnnotatorError {
    #[error("Model gateway error ({role}): {message}")]
    GatewayError { role: String, message: String },

    #[error("HTTP error: {status} - {message}")]
    HttpError { status: u16, message: String },

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Failed to parse model API response: {0}")]
    ResponseFormatError(String),

    #[error("Failed to load image {path}: {message}")]
    ImageError { path: String, message: String },

    #[error("Batch size mismatch: sent {expected} requests, received {actual} responses")]
    BatchMismatch { expected: usize, actual: usize },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Template error: {0}")]
    TemplateError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Dataset error: {0}")]
    DatasetError(String),

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),
}

/// Result type specific to annotation operations
pub type AnnotatorResult<T> = Result<T, AnnotatorError>;

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Stops the whole run
    Fatal,
    /// Loses one sample, the run continues
    Error,
}

/// Recoverable vs. non-recoverable errors
pub trait RecoverableError {
    fn severity(&self) -> ErrorSeverity;

    fn is_recoverable(&self) -> bool {
        self.severity() != ErrorSeverity::Fatal
    }

    fn recovery_strategy(&self) -> Option<String>;
}

impl RecoverableError for AnnotatorError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            AnnotatorError::GatewayError { .. }
            | AnnotatorError::HttpError { .. }
            | AnnotatorError::NetworkError(_)
            | AnnotatorError::ResponseFormatError(_)
            | AnnotatorError::ImageError { .. }
            | AnnotatorError::BatchMismatch { .. } => ErrorSeverity::Error,
            AnnotatorError::ConfigError(_)
            | AnnotatorError::TemplateError(_)
            | AnnotatorError::InvalidInput(_)
            | AnnotatorError::DatasetError(_)
            | AnnotatorError::IoError(_)
            | AnnotatorError::SerdeError(_) => ErrorSeverity::Fatal,
        }
    }

    fn recovery_strategy(&self) -> Option<String> {
        match self {
            AnnotatorError::HttpError { status, .. } if *status == 429 || *status >= 500 =>
                Some("Retry the run later; the model server is overloaded or failing".to_string()),
            AnnotatorError::NetworkError(_) =>
                Some("Check that the model endpoint is reachable".to_string()),
            AnnotatorError::ImageError { .. } =>
                Some("Check --image-root and the image paths in the input dataset".to_string()),
            AnnotatorError::ConfigError(_) =>
                Some("Check the configuration file and API key environment variables".to_string()),
            _ => None,
        }
    }
}

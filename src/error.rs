//! Error types for upscaling operations

use axum::http::StatusCode;
use thiserror::Error;

/// Result type alias for upscaling operations
pub type Result<T> = std::result::Result<T, UpscaleError>;

/// Fixed diagnostic returned while the enhancement engines are unavailable
pub const SERVICE_NOT_READY_MESSAGE: &str = "AI models failed to load; the service is not ready";

/// Error types for the upscaling pipeline
#[derive(Error, Debug)]
pub enum UpscaleError {
    /// Uploaded bytes are not a recognizable image container
    #[error("Failed to read image file: {0}")]
    Decode(String),

    /// Malformed request (multipart body, missing fields, bad form values)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Enhancement engines failed to initialize at startup
    #[error("{}", SERVICE_NOT_READY_MESSAGE)]
    ServiceNotReady,

    /// Engine failure during model execution
    #[error("Inference error: {0}")]
    Inference(String),

    /// Output codec rejected the result
    #[error("Failed to encode result image: {0}")]
    Encode(String),

    /// Model loading or initialization errors
    #[error("Model error: {0}")]
    Model(String),

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Input/output errors (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

impl UpscaleError {
    /// Create a new decode error
    pub fn decode<S: Into<String>>(msg: S) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a new bad request error
    pub fn bad_request<S: Into<String>>(msg: S) -> Self {
        Self::BadRequest(msg.into())
    }

    /// Create a new inference error
    pub fn inference<S: Into<String>>(msg: S) -> Self {
        Self::Inference(msg.into())
    }

    /// Create a new encode error
    pub fn encode<S: Into<String>>(msg: S) -> Self {
        Self::Encode(msg.into())
    }

    /// Create a new model error
    pub fn model<S: Into<String>>(msg: S) -> Self {
        Self::Model(msg.into())
    }

    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Create model error with troubleshooting context
    pub fn model_error_with_context<P: AsRef<std::path::Path>>(
        operation: &str,
        model_path: P,
        error: &str,
        suggestions: &[&str],
    ) -> Self {
        let path_display = model_path.as_ref().display();
        let suggestion_text = if suggestions.is_empty() {
            String::new()
        } else {
            format!(" Suggestions: {}", suggestions.join(", "))
        };

        Self::Model(format!(
            "Failed to {} model '{}': {}.{}",
            operation, path_display, error, suggestion_text
        ))
    }

    /// Create configuration error with valid ranges
    pub fn config_value_error<T: std::fmt::Display>(
        parameter: &str,
        value: T,
        valid_range: &str,
        recommended: Option<T>,
    ) -> Self {
        let recommendation = match recommended {
            Some(rec) => format!(" Recommended: {}", rec),
            None => String::new(),
        };

        Self::InvalidConfig(format!(
            "Invalid {}: {} (valid range: {}).{}",
            parameter, value, valid_range, recommendation
        ))
    }

    /// Create inference error with engine stage context
    pub fn inference_stage_error(engine: &str, stage: &str, details: &str) -> Self {
        Self::Inference(format!("{} failed at stage '{}': {}", engine, stage, details))
    }

    /// HTTP status the request boundary reports for this error
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Decode(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::ServiceNotReady
            | Self::Inference(_)
            | Self::Encode(_)
            | Self::Model(_)
            | Self::InvalidConfig(_)
            | Self::Io(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the caller, not the service, is at fault
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

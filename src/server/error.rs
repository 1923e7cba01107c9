//! Mapping of pipeline errors onto HTTP responses

use crate::error::{UpscaleError, SERVICE_NOT_READY_MESSAGE};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// JSON error body: `{"detail": "..."}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

/// Request-boundary wrapper around `UpscaleError`
#[derive(Debug)]
pub struct ApiError(pub UpscaleError);

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.0.status_code()
    }

    /// Client-facing message
    ///
    /// Client errors carry their own text, the readiness error a fixed one, and
    /// every other failure is wrapped as an internal processing error.
    #[must_use]
    pub fn detail(&self) -> String {
        match &self.0 {
            UpscaleError::ServiceNotReady => SERVICE_NOT_READY_MESSAGE.to_string(),
            err if err.is_client_error() => err.to_string(),
            err => format!("Internal processing error: {err}"),
        }
    }
}

/// `outer: inner: root` rendering of an error and its sources
fn error_chain(error: &dyn std::error::Error) -> String {
    let mut chain = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        chain.push_str(": ");
        chain.push_str(&cause.to_string());
        source = cause.source();
    }
    chain
}

impl From<UpscaleError> for ApiError {
    fn from(error: UpscaleError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = self.detail();
        tracing::error!(
            status = status.as_u16(),
            error = %error_chain(&self.0),
            "Request failed"
        );
        (status, Json(ErrorBody { detail })).into_response()
    }
}

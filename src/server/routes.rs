//! Handlers for `GET /` and `POST /upscale`

use super::{multipart::parse_upscale_form, ApiError, AppState};
use crate::{
    error::UpscaleError,
    services::OutputFormatHandler,
    tracing_config::spans,
    types::UpscaleOutput,
};
use axum::{
    body::Body,
    extract::{multipart::MultipartRejection, Multipart, State},
    http::{header, HeaderValue, StatusCode},
    response::Response,
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use tracing::{info, warn, Instrument, Span};

/// Body of the health check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}

/// `GET /`
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        message: "Upscale API is running".to_string(),
    })
}

/// `POST /upscale`
pub async fn upscale(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let request_id = uuid::Uuid::new_v4().to_string();
    let span = spans::upscale_request(&request_id);

    async move {
        // Readiness is decided before the body is read.
        if !state.processor.is_ready() {
            return Err(ApiError(UpscaleError::ServiceNotReady));
        }

        let multipart =
            multipart.map_err(|rejection| UpscaleError::bad_request(rejection.body_text()))?;
        let request = parse_upscale_form(multipart).await?;
        info!(
            filename = %request.image.filename,
            bytes = request.image.bytes.len(),
            scale = %request.scale,
            format = ?request.format,
            face_enhance = request.use_face_enhance,
            "Upscale request received"
        );

        let processor = state.processor.clone();
        let span = Span::current();
        let output = tokio::task::spawn_blocking(move || {
            span.in_scope(|| processor.process(&request))
        })
        .await
        .map_err(|e| UpscaleError::internal(format!("processing task failed: {e}")))??;

        file_response(output)
    }
    .instrument(span)
    .await
}

/// Binary attachment response for an encoded artifact
fn file_response(output: UpscaleOutput) -> Result<Response, ApiError> {
    let media_type = OutputFormatHandler::get_media_type(output.format);
    let length = output.bytes.len();

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, media_type)
        .header(header::CONTENT_DISPOSITION, content_disposition(&output.filename))
        .header(header::CONTENT_LENGTH, length)
        .body(Body::from(output.bytes))
        .map_err(|e| ApiError(UpscaleError::internal(format!("failed to build response: {e}"))))
}

/// `attachment; filename="..."` with quotes and control characters neutralized
///
/// Non-ASCII names keep an ASCII `filename` fallback and carry the exact name
/// in an RFC 5987 `filename*` parameter.
fn content_disposition(filename: &str) -> HeaderValue {
    let fallback: String = filename
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_control() || !c.is_ascii() => '_',
            c => c,
        })
        .collect();

    let mut value = format!("attachment; filename=\"{fallback}\"");
    if !filename.is_ascii() {
        value.push_str("; filename*=UTF-8''");
        for byte in filename.bytes() {
            if byte.is_ascii_alphanumeric() || b"!#$&+-.^_`|~".contains(&byte) {
                value.push(char::from(byte));
            } else {
                let _ = write!(value, "%{byte:02X}");
            }
        }
    }

    HeaderValue::from_str(&value).unwrap_or_else(|e| {
        warn!(filename, error = %e, "Unrepresentable download name, omitting it");
        HeaderValue::from_static("attachment")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition() {
        assert_eq!(
            content_disposition("photo_out.jpg"),
            "attachment; filename=\"photo_out.jpg\""
        );
        assert_eq!(
            content_disposition("a\"b\\c\n_out.png"),
            "attachment; filename=\"a_b_c__out.png\""
        );
    }

    #[test]
    fn test_content_disposition_non_ascii_name() {
        assert_eq!(
            content_disposition("café_out.jpg"),
            "attachment; filename=\"caf__out.jpg\"; filename*=UTF-8''caf%C3%A9_out.jpg"
        );
        assert_eq!(
            content_disposition("фото 1_out.png"),
            "attachment; filename=\"____ 1_out.png\"; \
             filename*=UTF-8''%D1%84%D0%BE%D1%82%D0%BE%201_out.png"
        );
    }

    #[tokio::test]
    async fn test_health() {
        let Json(body) = health().await;
        assert_eq!(body.status, "ok");
        assert_eq!(body.message, "Upscale API is running");
    }
}

//! Parsing of the `/upscale` multipart form

use crate::{
    error::{Result, UpscaleError},
    types::{FormatRequest, ScaleOption, UpscaleRequest, UploadedImage},
};
use axum::extract::{multipart::MultipartError, Multipart};

/// Filename used when the `image` part carries none
pub const DEFAULT_UPLOAD_NAME: &str = "upload";

/// Read every form field and build the pipeline request
///
/// Unknown fields are skipped. Text fields keep their defaults when absent.
///
/// # Errors
/// - `UpscaleError::BadRequest` for a malformed body, a missing `image` part
///   or an unparseable `use_face_enhance` value
pub async fn parse_upscale_form(mut multipart: Multipart) -> Result<UpscaleRequest> {
    let mut image: Option<UploadedImage> = None;
    let mut scale = ScaleOption::default();
    let mut format = FormatRequest::default();
    let mut use_face_enhance = true;

    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => {
                let filename = field
                    .file_name()
                    .filter(|name| !name.is_empty())
                    .unwrap_or(DEFAULT_UPLOAD_NAME)
                    .to_string();
                let bytes = field.bytes().await.map_err(malformed)?;
                tracing::debug!(%filename, bytes = bytes.len(), "Received image part");
                image = Some(UploadedImage::new(bytes, filename));
            },
            "scale_option" => {
                scale = ScaleOption::parse(field.text().await.map_err(malformed)?.trim());
            },
            "format" => {
                format = FormatRequest::parse(field.text().await.map_err(malformed)?.trim());
            },
            "use_face_enhance" => {
                use_face_enhance = parse_bool(&field.text().await.map_err(malformed)?)?;
            },
            other => {
                tracing::debug!(field = other, "Ignoring unknown form field");
            },
        }
    }

    let image = image
        .ok_or_else(|| UpscaleError::bad_request("Missing required file field 'image'"))?;

    Ok(UpscaleRequest::new(image)
        .with_scale(scale)
        .with_format(format)
        .with_face_enhance(use_face_enhance))
}

/// Form boolean: `true/false/1/0/yes/no/on/off`, case-insensitive
///
/// # Errors
/// - `UpscaleError::BadRequest` for anything else
pub fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(UpscaleError::bad_request(format!(
            "Invalid boolean for 'use_face_enhance': '{other}'"
        ))),
    }
}

fn malformed(error: MultipartError) -> UpscaleError {
    UpscaleError::bad_request(format!("Malformed multipart body: {}", error.body_text()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool_accepted_values() {
        for value in ["true", "TRUE", "1", "yes", "On", " true "] {
            assert!(parse_bool(value).unwrap(), "{value}");
        }
        for value in ["false", "False", "0", "no", "OFF"] {
            assert!(!parse_bool(value).unwrap(), "{value}");
        }
    }

    #[test]
    fn test_parse_bool_rejects_other_values() {
        for value in ["", "maybe", "2", "y"] {
            let err = parse_bool(value).unwrap_err();
            assert!(matches!(err, UpscaleError::BadRequest(_)));
            assert!(err.is_client_error());
        }
    }
}

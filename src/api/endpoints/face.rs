//! Face descriptor endpoints.

use axum::extract::State;
use axum::Json;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::face::{FaceDescriptor, DEFAULT_MATCH_THRESHOLD};

/// Largest accepted image after decoding (8 MB).
const MAX_IMAGE_BYTES: usize = 8 * 1024 * 1024;

#[derive(Debug, Deserialize)]
pub struct CompareRequest {
    pub a: Vec<f32>,
    pub b: Vec<f32>,
    #[serde(default)]
    pub threshold: Option<f32>,
}

#[derive(Debug, Serialize)]
pub struct CompareResponse {
    pub distance: f32,
    pub threshold: f32,
    pub same_person: bool,
}

/// `POST /api/face/compare`: distance between two descriptors. Both must
/// be full 128-value descriptors.
pub async fn compare(Json(request): Json<CompareRequest>) -> Result<Json<CompareResponse>, ApiError> {
    let threshold = request.threshold.unwrap_or(DEFAULT_MATCH_THRESHOLD);
    if !threshold.is_finite() || threshold <= 0.0 {
        return Err(ApiError::Validation(format!(
            "threshold must be a positive number, got {threshold}"
        )));
    }
    let a = FaceDescriptor::new(request.a)?;
    let b = FaceDescriptor::new(request.b)?;
    let distance = a.distance(&b);
    Ok(Json(CompareResponse {
        distance,
        threshold,
        same_person: distance < threshold,
    }))
}

#[derive(Debug, Deserialize)]
pub struct EmbedRequest {
    /// Base64 image, optionally as a `data:image/...;base64,` URL.
    pub image: String,
}

#[derive(Debug, Serialize)]
pub struct EmbedResponse {
    pub face_detected: bool,
    pub descriptor: Option<FaceDescriptor>,
}

/// `POST /api/face/embed`: descriptor for the most prominent face.
pub async fn embed(
    State(ctx): State<ApiContext>,
    Json(request): Json<EmbedRequest>,
) -> Result<Json<EmbedResponse>, ApiError> {
    let embedder = ctx
        .embedder
        .clone()
        .ok_or_else(|| ApiError::Unavailable("No face model is loaded".into()))?;

    let bytes = decode_data_url(&request.image).map_err(ApiError::BadRequest)?;
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(ApiError::BadRequest(format!(
            "Image exceeds {MAX_IMAGE_BYTES} bytes"
        )));
    }

    let descriptor = tokio::task::spawn_blocking(move || embedder.embed(&bytes))
        .await
        .map_err(|e| ApiError::Internal(format!("Embedding task failed: {e}")))??;

    Ok(Json(EmbedResponse {
        face_detected: descriptor.is_some(),
        descriptor,
    }))
}

/// Decode a base64 data URL to raw bytes.
///
/// Handles both `data:image/jpeg;base64,...` and raw base64 strings.
fn decode_data_url(data_url: &str) -> Result<Vec<u8>, String> {
    let base64_data = match data_url.find(',') {
        Some(idx) => &data_url[idx + 1..],
        None => data_url,
    };

    base64::engine::general_purpose::STANDARD
        .decode(base64_data.trim())
        .map_err(|e| format!("Base64 decode failed: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_data_url_png() {
        let data = "data:image/png;base64,iVBORw0KGgo=";
        let bytes = decode_data_url(data).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
    }

    #[test]
    fn decode_data_url_raw_base64() {
        let raw = base64::engine::general_purpose::STANDARD.encode(b"hello");
        assert_eq!(decode_data_url(&raw).unwrap(), b"hello");
    }

    #[test]
    fn decode_data_url_invalid_base64() {
        assert!(decode_data_url("not-valid-base64!!!").is_err());
    }
}

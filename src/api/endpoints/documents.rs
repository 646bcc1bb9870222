//! Document rendering endpoint.
//!
//! `POST /api/documents/:kind`: body is the document record as JSON,
//! response is the rendered PDF. With `?save=true` a copy is also
//! written to the configured output directory.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::documents::{output_file_name, render_pdf, write_atomically, DocumentError, DocumentKind};

/// Largest accepted record body (1 MB).
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Debug, Default, Deserialize)]
pub struct RenderQuery {
    #[serde(default)]
    pub save: bool,
}

pub async fn render(
    State(ctx): State<ApiContext>,
    Path(kind): Path<String>,
    Query(query): Query<RenderQuery>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let kind: DocumentKind = kind.parse()?;
    if body.len() > MAX_BODY_BYTES {
        return Err(ApiError::BadRequest(format!(
            "Document data exceeds {MAX_BODY_BYTES} bytes"
        )));
    }

    let output_dir = ctx.output_dir.clone();
    let save = query.save;

    // Layout and PDF emission are CPU-bound; keep them off the runtime threads.
    let (file_name, pdf) = tokio::task::spawn_blocking(move || {
        let (stem, layout) = kind.layout_from_json(&body)?;
        let pdf = render_pdf(&layout)?;
        let file_name = output_file_name(&stem);
        if save {
            write_atomically(&output_dir.join(&file_name), &pdf)?;
        }
        Ok::<_, DocumentError>((file_name, pdf))
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Render task failed: {e}")))??;

    tracing::info!(%kind, file = %file_name, bytes = pdf.len(), save, "Document rendered");

    Ok((
        StatusCode::OK,
        [
            (CONTENT_TYPE, "application/pdf".to_string()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        pdf,
    )
        .into_response())
}

//! Health check endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::db::sqlite::get_current_version;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub schema_version: i64,
    pub push_enabled: bool,
    pub face_model_loaded: bool,
}

/// `GET /api/health`: liveness plus what is configured.
pub async fn check(State(ctx): State<ApiContext>) -> Result<Json<HealthResponse>, ApiError> {
    let schema_version = {
        let conn = ctx
            .db
            .lock()
            .map_err(|_| ApiError::Internal("database lock poisoned".into()))?;
        get_current_version(&conn)
    };

    Ok(Json(HealthResponse {
        status: "ok",
        version: crate::config::APP_VERSION,
        schema_version,
        push_enabled: ctx.transport.is_some(),
        face_model_loaded: ctx.embedder.is_some(),
    }))
}

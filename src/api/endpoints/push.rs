//! Push subscription and dispatch endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::push::{self, DispatchReport, NotificationPayload, PushSubscription};

#[derive(Debug, Serialize)]
pub struct SubscribeResponse {
    pub endpoint: String,
    pub role: String,
}

/// `POST /api/push/subscriptions`: store (or replace) a subscription.
pub async fn subscribe(
    State(ctx): State<ApiContext>,
    Json(subscription): Json<PushSubscription>,
) -> Result<(StatusCode, Json<SubscribeResponse>), ApiError> {
    push::subscribe(&ctx.db, &subscription)?;
    Ok((
        StatusCode::CREATED,
        Json(SubscribeResponse {
            endpoint: subscription.endpoint,
            role: subscription.role,
        }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct UnsubscribeRequest {
    pub endpoint: String,
}

#[derive(Debug, Serialize)]
pub struct UnsubscribeResponse {
    pub removed: bool,
}

/// `DELETE /api/push/subscriptions`: idempotent; `removed` says whether
/// a row existed.
pub async fn unsubscribe(
    State(ctx): State<ApiContext>,
    Json(request): Json<UnsubscribeRequest>,
) -> Result<Json<UnsubscribeResponse>, ApiError> {
    if request.endpoint.trim().is_empty() {
        return Err(ApiError::BadRequest("endpoint is required".into()));
    }
    let removed = push::unsubscribe(&ctx.db, &request.endpoint)?;
    Ok(Json(UnsubscribeResponse { removed }))
}

/// `POST /api/push/notify/:role`: fan the payload out to the role.
pub async fn notify(
    State(ctx): State<ApiContext>,
    Path(role): Path<String>,
    Json(payload): Json<NotificationPayload>,
) -> Result<Json<DispatchReport>, ApiError> {
    let transport = ctx
        .transport
        .clone()
        .ok_or_else(|| ApiError::Unavailable("Push delivery is not configured".into()))?;
    if payload.title.trim().is_empty() {
        return Err(ApiError::BadRequest("title is required".into()));
    }

    let report = push::notify_role(&ctx.db, transport.as_ref(), &role, &payload).await?;
    Ok(Json(report))
}

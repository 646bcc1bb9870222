//! API router.
//!
//! Returns a composable `Router` with every route nested under `/api/`.
//! Path params use `:param` syntax (matchit 0.7 / axum 0.7).

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;

pub fn api_router(ctx: ApiContext) -> Router {
    let routes = Router::new()
        .route("/health", get(endpoints::health::check))
        .route(
            "/push/subscriptions",
            post(endpoints::push::subscribe).delete(endpoints::push::unsubscribe),
        )
        .route("/push/notify/:role", post(endpoints::push::notify))
        .route("/documents/:kind", post(endpoints::documents::render))
        .route("/face/compare", post(endpoints::face::compare))
        .route(
            "/face/embed",
            // Base64 inflates the image by a third.
            post(endpoints::face::embed).layer(DefaultBodyLimit::max(12 * 1024 * 1024)),
        )
        .with_state(ctx);

    Router::new()
        .nest("/api", routes)
        .layer(axum::middleware::from_fn(middleware::request_id::tag_and_log))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::response::Response;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::api::types::fixtures::context;
    use crate::db::subscriptions::{count_subscriptions, upsert_subscription};
    use crate::face::MockFaceEmbedder;
    use crate::push::transport::MockTransport;
    use crate::push::types::fixtures::{keys, subscription};

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn quotation_json() -> Value {
        json!({
            "number": "QT/7",
            "date": "2025-05-02",
            "seller": {"name": "Acme Steel Traders", "state": "Maharashtra"},
            "customer": {"name": "Nirmal Engineering Works", "state": "Gujarat"},
            "items": [
                {"description": "MS Angle 50x50x5 mm", "quantity": 120, "rate": 68.5, "tax_percent": 18}
            ]
        })
    }

    #[tokio::test]
    async fn health_reports_schema_version() {
        let (ctx, _tmp) = context();
        let app = api_router(ctx);
        let req = Request::builder().uri("/api/health").body(Body::empty()).unwrap();
        let response = app.oneshot(req).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("X-Request-Id"));
        let json = body_json(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["schema_version"], 2);
        assert_eq!(json["push_enabled"], false);
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let (ctx, _tmp) = context();
        let req = Request::builder().uri("/api/nope").body(Body::empty()).unwrap();
        let response = api_router(ctx).oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn subscribe_then_unsubscribe() {
        let (ctx, _tmp) = context();
        let db = ctx.db.clone();
        let app = api_router(ctx);

        let body = json!({
            "endpoint": "https://push.example.com/send/abc",
            "expirationTime": null,
            "keys": keys(),
            "role": "dispatch"
        });
        let response = app
            .clone()
            .oneshot(json_request("POST", "/api/push/subscriptions", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let json = body_json(response).await;
        assert_eq!(json["role"], "dispatch");
        assert_eq!(count_subscriptions(&db.lock().unwrap(), Some("dispatch")).unwrap(), 1);

        let body = json!({"endpoint": "https://push.example.com/send/abc"});
        let response = app
            .clone()
            .oneshot(json_request("DELETE", "/api/push/subscriptions", body.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["removed"], true);

        let response = app
            .oneshot(json_request("DELETE", "/api/push/subscriptions", body))
            .await
            .unwrap();
        assert_eq!(body_json(response).await["removed"], false);
    }

    #[tokio::test]
    async fn subscribe_rejects_plain_http_endpoint() {
        let (ctx, _tmp) = context();
        let body = json!({
            "endpoint": "http://push.example.com/send/abc",
            "keys": keys()
        });
        let response = api_router(ctx)
            .oneshot(json_request("POST", "/api/push/subscriptions", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body_json(response).await["error"]["code"], "VALIDATION_FAILED");
    }

    #[tokio::test]
    async fn notify_without_transport_is_503() {
        let (ctx, _tmp) = context();
        let body = json!({"title": "New order", "body": "PO-7 received"});
        let response = api_router(ctx)
            .oneshot(json_request("POST", "/api/push/notify/admin", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn notify_prunes_gone_subscriptions() {
        let (ctx, _tmp) = context();
        {
            let conn = ctx.db.lock().unwrap();
            upsert_subscription(&conn, &subscription("https://push.example.com/live", "admin")).unwrap();
            upsert_subscription(&conn, &subscription("https://push.example.com/gone", "admin")).unwrap();
        }
        let transport = MockTransport::new().with_status("https://push.example.com/gone", 410);
        let ctx = ctx.with_transport(Arc::new(transport));
        let db = ctx.db.clone();

        let body = json!({"title": "New order", "body": "PO-7 received", "url": "/orders/7"});
        let response = api_router(ctx)
            .oneshot(json_request("POST", "/api/push/notify/admin", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["attempted"], 2);
        assert_eq!(json["delivered"], 1);
        assert_eq!(json["removed"], json!(["https://push.example.com/gone"]));
        assert_eq!(count_subscriptions(&db.lock().unwrap(), Some("admin")).unwrap(), 1);
    }

    #[tokio::test]
    async fn render_document_returns_pdf() {
        let (ctx, _tmp) = context();
        let response = api_router(ctx)
            .oneshot(json_request("POST", "/api/documents/quotation", quotation_json()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get("Content-Type").unwrap(), "application/pdf");
        assert_eq!(
            response.headers().get("Content-Disposition").unwrap(),
            "attachment; filename=\"QT-7.pdf\""
        );
        let bytes = to_bytes(response.into_body(), 10 * 1024 * 1024).await.unwrap();
        assert_eq!(&bytes[0..4], b"%PDF");
    }

    #[tokio::test]
    async fn render_with_save_writes_output() {
        let (ctx, tmp) = context();
        let response = api_router(ctx)
            .oneshot(json_request("POST", "/api/documents/quote?save=true", quotation_json()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(tmp.path().join("QT-7.pdf").exists());
    }

    #[tokio::test]
    async fn render_validation_failure_is_422() {
        let (ctx, _tmp) = context();
        let mut body = quotation_json();
        body["items"] = json!([]);
        let response = api_router(ctx)
            .oneshot(json_request("POST", "/api/documents/quotation", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let json = body_json(response).await;
        assert!(json["error"]["message"].as_str().unwrap().contains("items"));
    }

    #[tokio::test]
    async fn render_unknown_kind_is_404() {
        let (ctx, _tmp) = context();
        let response = api_router(ctx)
            .oneshot(json_request("POST", "/api/documents/receipt", json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    fn descriptor_json(head: &[f32]) -> Value {
        let mut values = vec![0.0f32; 128];
        values[..head.len()].copy_from_slice(head);
        json!(values)
    }

    #[tokio::test]
    async fn face_compare_reports_distance() {
        let (ctx, _tmp) = context();
        let body = json!({"a": descriptor_json(&[]), "b": descriptor_json(&[0.3, 0.4])});
        let response = api_router(ctx)
            .oneshot(json_request("POST", "/api/face/compare", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert!((json["distance"].as_f64().unwrap() - 0.5).abs() < 1e-6);
        assert_eq!(json["same_person"], true);
    }

    #[tokio::test]
    async fn face_compare_rejects_short_descriptors() {
        for body in [
            json!({"a": [], "b": []}),
            json!({"a": [0.1], "b": [0.1]}),
            json!({"a": descriptor_json(&[]), "b": [0.3]}),
        ] {
            let (ctx, _tmp) = context();
            let response = api_router(ctx)
                .oneshot(json_request("POST", "/api/face/compare", body))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
            let json = body_json(response).await;
            assert_eq!(json["error"]["code"], "VALIDATION_FAILED");
            assert!(json["error"]["message"].as_str().unwrap().contains("128"));
        }
    }

    #[tokio::test]
    async fn face_embed_uses_configured_embedder() {
        let (ctx, _tmp) = context();
        let ctx = ctx.with_embedder(Arc::new(MockFaceEmbedder::new()));
        let image = base64::Engine::encode(&base64::engine::general_purpose::STANDARD, b"portrait");
        let body = json!({"image": format!("data:image/jpeg;base64,{image}")});
        let response = api_router(ctx)
            .oneshot(json_request("POST", "/api/face/embed", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["face_detected"], true);
        assert_eq!(json["descriptor"].as_array().unwrap().len(), 128);
    }

    #[tokio::test]
    async fn face_embed_without_model_is_503() {
        let (ctx, _tmp) = context();
        let body = json!({"image": "aGVsbG8="});
        let response = api_router(ctx)
            .oneshot(json_request("POST", "/api/face/embed", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}

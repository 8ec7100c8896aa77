//! Read-only diagnostics endpoints.
//!
//! - `GET /admin/status`: version and whether the engine is shut down
//! - `GET /admin/correlations`: store sizes, merge states, hostname index

pub mod handlers;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use self::handlers::*;
use crate::engine::CorrelationEngine;

pub fn setup_admin_router(engine: Arc<CorrelationEngine>) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/correlations", get(get_correlations))
        .layer(TraceLayer::new_for_http())
        .with_state(engine)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::correlation::CorrelationId;
    use crate::interceptor::{OutboundRequest, RawHeaders};
    use crate::span::{InMemoryExporter, Span, SpanId, SpanKind, TraceId};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    async fn get_json(router: Router, uri: &str) -> serde_json::Value {
        let response = router
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_status() {
        let engine = Arc::new(
            CorrelationEngine::new(&EngineConfig::default(), Arc::new(InMemoryExporter::new())).unwrap(),
        );
        let json = get_json(setup_admin_router(engine), "/admin/status").await;
        assert_eq!(json["status"], "operational");
    }

    #[tokio::test]
    async fn test_correlations_report_hostnames() {
        let engine = Arc::new(
            CorrelationEngine::new(&EngineConfig::default(), Arc::new(InMemoryExporter::new())).unwrap(),
        );
        let span = Span::start(TraceId(1), SpanId(1), "GET", SpanKind::Client);
        engine
            .on_span_start(&span, RawHeaders::from("x-correlation-id: d1"))
            .unwrap();
        engine.on_request_sent(
            &CorrelationId::from("d1"),
            &OutboundRequest {
                method: "GET".into(),
                url: "http://api.example.com/items".into(),
                headers: Vec::new(),
                body: String::new(),
            },
        );

        let json = get_json(setup_admin_router(engine), "/admin/correlations").await;
        assert_eq!(json["live_tasks"], 1);
        assert_eq!(json["pending_exchanges"], 1);
        assert_eq!(json["hostnames"]["api.example.com"], 1);
    }
}

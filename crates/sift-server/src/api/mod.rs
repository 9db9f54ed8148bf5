//! HTTP API surface

mod curation;
mod events;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/health", get(events::health))
        .route("/v1/status", get(curation::status))
        .route("/v1/curation/start", post(curation::start))
        .route("/v1/curation/stop", post(curation::stop))
        .route("/v1/interests", post(curation::set_interests))
        .route("/v1/evaluate", post(curation::evaluate))
        .route("/v1/classify", post(curation::classify))
        .route("/v1/mark", post(curation::mark))
        .route("/v1/model/retry", post(curation::retry_model))
        .route("/v1/log/export", get(curation::export_log))
        .route("/v1/message", post(curation::message))
        .route("/v1/events", get(events::events))
        .route("/v1/observer/events", get(events::observer_events))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;

    use crate::observer::ChannelObserver;
    use sift_core::{CuratorConfig, HubConfig, HubProviderFactory, MemoryStore, Orchestrator};

    fn test_app() -> Router {
        let observer = Arc::new(ChannelObserver::new(16));
        let curator = Orchestrator::spawn(
            CuratorConfig::default(),
            Arc::new(MemoryStore::new()),
            observer.clone(),
            Arc::new(HubProviderFactory::new(HubConfig::default())),
        );
        create_router(AppState::new(curator, observer))
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/v1/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn status_reflects_a_fresh_session() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/v1/status")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["isRunning"], false);
        assert_eq!(json["aiStatus"], "stopped");
    }

    #[tokio::test]
    async fn classify_answers_with_a_reason() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/classify")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        r#"{"id":"c1","text":"RT if you agree with this"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["id"], "c1");
        assert_eq!(json["isUninteresting"], true);
        assert!(json["reason"].as_str().unwrap().contains("bait"));
    }

    #[tokio::test]
    async fn unknown_wire_message_is_a_bad_request() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/message")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"type":"SELF_DESTRUCT"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn start_off_feed_is_declined_not_an_error() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/curation/start")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"url":"https://example.com/"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["started"], false);
        assert!(json["reason"].as_str().unwrap().contains("eligible"));
    }
}

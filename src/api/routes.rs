//! HTTP API route definitions.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{health, post_signal, ready, status, AppState};

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health endpoints
        .route("/health", get(health))
        .route("/ready", get(ready))
        // Status and signal injection
        .route("/api/v1/status", get(status))
        .route("/api/v1/signal", post(post_signal))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::{signal_channel, TradeSignal};
    use crate::trading::Position;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use std::sync::Arc;
    use tokio::sync::{mpsc, Mutex};
    use tower::ServiceExt;

    fn test_state() -> (AppState, mpsc::Receiver<TradeSignal>) {
        let (tx, rx) = signal_channel();
        let state = AppState::new(
            "ETHUSDT".to_string(),
            Arc::new(Mutex::new(Position::flat())),
            tx,
        );
        (state, rx)
    }

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let (state, _rx) = test_state();
        let app = create_router(state);

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn ready_endpoint_returns_503_when_not_ready() {
        let (state, _rx) = test_state();
        let app = create_router(state);

        let response = app
            .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn ready_endpoint_returns_200_when_ready() {
        let (state, _rx) = test_state();
        state.set_ready(true);
        let app = create_router(state);

        let response = app
            .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn status_reports_flat_position() {
        let (state, _rx) = test_state();
        let app = create_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/status")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["position"]["side"], "flat");
        assert_eq!(json["symbol"], "ETHUSDT");
    }

    #[tokio::test]
    async fn signal_webhook_queues_signal() {
        let (state, mut rx) = test_state();
        let app = create_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/signal")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"signal":"enter_long"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(rx.recv().await, Some(TradeSignal::EnterLong));
    }

    #[tokio::test]
    async fn signal_webhook_rejects_when_queue_closed() {
        let (state, rx) = test_state();
        drop(rx);
        let app = create_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/signal")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"signal":"flatten"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn signal_webhook_rejects_unknown_signal() {
        let (state, _rx) = test_state();
        let app = create_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/signal")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"signal":"moon"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}

//! HTTP API route definitions.

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use super::handlers::{create_item, health, home, list_items, metrics, AppState};

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/health", get(health))
        .route("/items", get(list_items).post(create_item))
        .route("/metrics", get(metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use metrics_exporter_prometheus::PrometheusBuilder;
    use tower::ServiceExt;

    use crate::db::{ItemStore, PgManager, Pool, PoolConfig};

    /// State whose pool points at a closed port. Handlers that skip the
    /// database work normally; DB-touching ones fail fast.
    fn test_state() -> AppState {
        let mut pg = tokio_postgres::Config::new();
        pg.host("127.0.0.1")
            .port(1)
            .dbname("unreachable")
            .user("nobody")
            .password("")
            .connect_timeout(Duration::from_millis(100));

        let pool = Pool::new(
            PgManager::new(pg),
            PoolConfig {
                max_size: 1,
                min_idle: 0,
                acquire_timeout: Duration::from_millis(200),
            },
        );

        let recorder = PrometheusBuilder::new().build_recorder();
        AppState::new(ItemStore::new(pool), recorder.handle())
    }

    fn post_items(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/items")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let app = create_router(test_state());

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).expect("request"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        assert_eq!(&body[..], br#"{"status":"ok"}"#);
    }

    #[tokio::test]
    async fn home_returns_welcome_message() {
        let app = create_router(test_state());

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).expect("request"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let text = String::from_utf8(body.to_vec()).expect("utf8");
        assert!(text.contains("/items"));
    }

    #[tokio::test]
    async fn create_item_without_name_returns_400() {
        let app = create_router(test_state());

        let response = app.oneshot(post_items("{}")).await.expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let text = String::from_utf8(body.to_vec()).expect("utf8");
        assert!(text.contains("name required"));
    }

    #[tokio::test]
    async fn create_item_with_empty_name_returns_400() {
        let app = create_router(test_state());

        let response = app
            .oneshot(post_items("{\"name\":\"\"}"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn create_item_without_body_returns_400() {
        let app = create_router(test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/items")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn list_items_surfaces_db_failure_as_500() {
        let app = create_router(test_state());

        let response = app
            .oneshot(Request::builder().uri("/items").body(Body::empty()).expect("request"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let text = String::from_utf8(body.to_vec()).expect("utf8");
        // Clients get a generic body; driver detail stays in the logs.
        assert!(text.contains("internal server error"));
    }

    #[tokio::test]
    async fn metrics_endpoint_returns_text() {
        let app = create_router(test_state());

        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).expect("request"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
    }
}

//! HTTP API handlers.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};

use crate::db::ItemStore;
use crate::error::ApiError;
use crate::metrics::inc_endpoint_request;

/// Counter labels. GET and POST on /items share one label.
pub const ENDPOINT_HOME: &str = "/";
pub const ENDPOINT_HEALTH: &str = "/health";
pub const ENDPOINT_ITEMS: &str = "/items";
pub const ENDPOINT_METRICS: &str = "/metrics";

/// Application state shared with handlers.
#[derive(Clone)]
pub struct AppState {
    /// Item repository over the connection pool.
    pub store: ItemStore,
    /// Prometheus recorder handle backing the scrape endpoint.
    pub metrics: PrometheusHandle,
}

impl AppState {
    /// Create new app state.
    pub fn new(store: ItemStore, metrics: PrometheusHandle) -> Self {
        Self { store, metrics }
    }
}

/// Root response.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    /// Welcome message.
    pub message: &'static str,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Status: "ok".
    pub status: &'static str,
}

/// Body of POST /items.
#[derive(Debug, Deserialize)]
pub struct CreateItemRequest {
    /// Item name; required and non-empty.
    #[serde(default)]
    pub name: Option<String>,
}

/// Response of a successful POST /items.
#[derive(Debug, Serialize)]
pub struct CreateItemResponse {
    /// Assigned id.
    pub id: i32,
    /// Echoed name.
    pub name: String,
}

/// Root handler - service banner.
pub async fn home() -> impl IntoResponse {
    inc_endpoint_request(ENDPOINT_HOME);
    Json(MessageResponse {
        message: "Welcome to the items API. Try /health, /items, or /metrics.",
    })
}

/// Health check handler - always returns 200, never touches the database.
pub async fn health() -> impl IntoResponse {
    inc_endpoint_request(ENDPOINT_HEALTH);
    Json(HealthResponse { status: "ok" })
}

/// List all items, newest first.
pub async fn list_items(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    inc_endpoint_request(ENDPOINT_ITEMS);
    let items = state.store.list().await?;
    Ok(Json(items))
}

/// Insert one item.
///
/// A missing, empty, or unparseable `name` is rejected with 400 before any
/// connection is leased.
pub async fn create_item(
    State(state): State<AppState>,
    body: Option<Json<CreateItemRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    inc_endpoint_request(ENDPOINT_ITEMS);

    let name = match body.and_then(|Json(request)| request.name) {
        Some(name) if !name.is_empty() => name,
        _ => return Err(ApiError::Validation("name required".to_string())),
    };

    let id = state.store.insert(&name).await?;
    Ok((StatusCode::CREATED, Json(CreateItemResponse { id, name })))
}

/// Prometheus scrape endpoint.
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    inc_endpoint_request(ENDPOINT_METRICS);
    state.metrics.render()
}

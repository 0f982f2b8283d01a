use axum::{http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;

use crate::shared_state::AppState;

#[derive(Serialize)]
struct HealthResponse {
    healthy: bool,
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { healthy: true }))
}

pub fn configure() -> Router<AppState> {
    Router::new().route("/healthz", get(health))
}

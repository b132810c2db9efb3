use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

/// Liveness probe. Unconditional; consults no dependencies.
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "alive": true })))
}

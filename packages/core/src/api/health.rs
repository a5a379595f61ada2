use axum::{
    http::{header, HeaderValue, StatusCode},
    response::IntoResponse,
};

/// `GET /health`: liveness probe.
pub async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CACHE_CONTROL, HeaderValue::from_static("no-store"))],
        "ok",
    )
}

use axum::http::StatusCode;

/// Liveness probe, the proxy has no dependency worth checking ahead of a request.
pub async fn handler() -> StatusCode {
    StatusCode::OK
}

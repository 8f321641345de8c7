use axum::http::StatusCode;

/// GET /healthz
pub(crate) async fn health() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}

use std::borrow::Cow;

use axum::response::IntoResponse;
use axum::routing::{any, get};

use crate::adapter_http_server::ServerState;
use crate::domain::entity::ProxyError;

mod health;
mod pool_proxy;

pub fn build<PR>(static_dir: Option<&std::path::Path>) -> axum::Router<ServerState<PR>>
where
    PR: crate::domain::prelude::PackageResolver + Clone,
{
    let router = axum::Router::new()
        .route("/health", get(health::handler))
        // Every method is proxied the same way, only the path matters.
        .route("/pool/{*path}", any(pool_proxy::handler::<PR>));
    match static_dir {
        Some(dir) => router.fallback_service(tower_http::services::ServeDir::new(dir)),
        None => router.fallback(not_found),
    }
}

async fn not_found() -> ApiError {
    ApiError::not_found("Not Found")
}

#[derive(Debug)]
struct ApiError {
    status_code: axum::http::StatusCode,
    message: Cow<'static, str>,
}

impl ApiError {
    #[inline]
    fn not_found(message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            status_code: axum::http::StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

impl From<ProxyError> for ApiError {
    fn from(value: ProxyError) -> Self {
        Self {
            status_code: value.status_code(),
            message: value.message(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status_code, self.message).into_response()
    }
}

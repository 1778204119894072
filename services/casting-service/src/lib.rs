pub mod actor_handlers;
pub mod app;
pub mod app_state;
pub mod config;
pub mod jwks_refresh;
pub mod movie_handlers;
pub mod permissions;
pub mod store;

use std::net::SocketAddr;

use anyhow::Context;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::Path;
use axum::Json;
use common_http_errors::{ApiError, ApiResult};
use tokio::net::TcpListener;
use tracing::debug;

pub use app::build_router;
pub use app_state::AppState;

/// Label used on service-scoped metrics.
pub const SERVICE_NAME: &str = "casting-service";

/// Unparseable or mistyped bodies become the 400 envelope.
pub(crate) fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    match body {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => {
            debug!(error = %rejection.body_text(), "rejected request body");
            Err(ApiError::bad_request("invalid_body"))
        }
    }
}

/// An id that does not parse cannot name an existing record.
pub(crate) fn path_id(id: Result<Path<u64>, PathRejection>) -> ApiResult<u64> {
    id.map(|Path(id)| id).map_err(|_| ApiError::not_found())
}

pub async fn bind_listener(addr: SocketAddr) -> anyhow::Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))
}

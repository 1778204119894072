use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method, Request};
use axum::middleware::{self, from_fn_with_state, Next};
use axum::response::Response;
use axum::routing::{delete, get, patch, post, MethodRouter};
use axum::Router;
use common_auth::{require_permission, JwtVerifier, PermissionGuard};
use common_http_errors::{ApiError, ERROR_CODE_HEADER};
use common_observability::CastingMetrics;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::error;

use crate::actor_handlers::{create_actor, delete_actor, list_actors, update_actor};
use crate::app_state::AppState;
use crate::movie_handlers::{
    cast_actor, create_movie, delete_movie, list_cast, list_movies, update_movie,
};
use crate::permissions::{
    DELETE_ACTOR, DELETE_MOVIE, PATCH_ACTOR, PATCH_MOVIE, POST_ACTOR, POST_MOVIE,
};
use crate::SERVICE_NAME;

const GREETING: &str = "Hello";
const EXCITED_SUFFIX: &str = "!!!!! You are doing great in this Udacity project.";
const COOL_KIDS: &str = "Be cool, man, be coooool! You're almost a FSND grad!";

async fn greeting(State(state): State<AppState>) -> String {
    if state.excited {
        format!("{GREETING}{EXCITED_SUFFIX}")
    } else {
        GREETING.to_string()
    }
}

async fn cool_kids() -> &'static str {
    COOL_KIDS
}

async fn health() -> &'static str {
    "ok"
}

async fn metrics_endpoint(State(metrics): State<CastingMetrics>) -> Result<String, ApiError> {
    metrics.render().map_err(|err| {
        error!(error = %err, "metrics encode error");
        ApiError::internal(err)
    })
}

async fn fallback() -> ApiError {
    ApiError::not_found()
}

async fn error_metrics_mw(
    State(metrics): State<CastingMetrics>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let resp = next.run(req).await;
    let status = resp.status();
    if status.as_u16() >= 400 {
        let code = resp
            .headers()
            .get(ERROR_CODE_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown");
        metrics.record_http_error(SERVICE_NAME, code, status.as_u16());
    }
    resp
}

/// Only the methods of `route` are guarded; merge public methods in afterwards.
fn require(
    verifier: &Arc<JwtVerifier>,
    permission: &'static str,
    route: MethodRouter<AppState>,
) -> MethodRouter<AppState> {
    route.route_layer(from_fn_with_state(
        PermissionGuard::new(verifier.clone(), permission),
        require_permission,
    ))
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(
            allowed_origins
                .iter()
                .filter_map(|origin| origin.parse::<HeaderValue>().ok())
                .collect::<Vec<_>>(),
        ))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([ACCEPT, CONTENT_TYPE, AUTHORIZATION])
}

pub fn build_router(state: AppState, allowed_origins: &[String]) -> Router {
    let verifier = state.jwt_verifier.clone();
    let metrics = state.metrics.clone();

    Router::new()
        .route("/", get(greeting))
        .route("/coolkids", get(cool_kids))
        .route("/healthz", get(health))
        .route("/metrics", get(metrics_endpoint))
        .route(
            "/actors",
            get(list_actors).merge(require(&verifier, POST_ACTOR, post(create_actor))),
        )
        .route(
            "/actors/:id",
            require(&verifier, PATCH_ACTOR, patch(update_actor))
                .merge(require(&verifier, DELETE_ACTOR, delete(delete_actor))),
        )
        .route(
            "/movies",
            get(list_movies).merge(require(&verifier, POST_MOVIE, post(create_movie))),
        )
        .route(
            "/movies/:id",
            require(&verifier, PATCH_MOVIE, patch(update_movie))
                .merge(require(&verifier, DELETE_MOVIE, delete(delete_movie))),
        )
        .route(
            "/movies/:id/actors",
            get(list_cast).merge(require(&verifier, PATCH_MOVIE, post(cast_actor))),
        )
        .fallback(fallback)
        .with_state(state)
        .layer(middleware::from_fn_with_state(metrics, error_metrics_mw))
        .layer(cors_layer(allowed_origins))
}

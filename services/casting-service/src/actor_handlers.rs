use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::Json;
use common_auth::AuthContext;
use common_http_errors::ApiResult;
use serde_json::{json, Value};
use tracing::info;

use crate::store::{ActorInput, CastingStore};
use crate::{json_body, path_id};

pub async fn list_actors(State(store): State<CastingStore>) -> Json<Value> {
    let actors = store.list_actors();
    Json(json!({
        "success": true,
        "total_actors": actors.len(),
        "actors": actors,
    }))
}

pub async fn create_actor(
    auth: AuthContext,
    State(store): State<CastingStore>,
    body: Result<Json<ActorInput>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let actor = store.create_actor(json_body(body)?)?;
    info!(actor_id = actor.id, subject = %auth.claims.subject, "actor created");
    Ok(Json(json!({ "success": true, "created": actor.id })))
}

pub async fn update_actor(
    auth: AuthContext,
    State(store): State<CastingStore>,
    id: Result<Path<u64>, PathRejection>,
    body: Result<Json<ActorInput>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let id = path_id(id)?;
    let actor = store.update_actor(id, json_body(body)?)?;
    info!(actor_id = actor.id, subject = %auth.claims.subject, "actor updated");
    Ok(Json(json!({ "success": true, "edited": actor.id })))
}

pub async fn delete_actor(
    auth: AuthContext,
    State(store): State<CastingStore>,
    id: Result<Path<u64>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let id = path_id(id)?;
    store.delete_actor(id)?;
    info!(actor_id = id, subject = %auth.claims.subject, "actor deleted");
    Ok(Json(json!({ "success": true, "deleted": id })))
}

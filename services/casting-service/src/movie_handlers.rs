use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::Json;
use common_auth::AuthContext;
use common_http_errors::ApiResult;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::store::{CastingStore, MovieInput};
use crate::{json_body, path_id};

#[derive(Debug, Deserialize)]
pub struct CastRequest {
    pub actor_id: u64,
}

pub async fn list_movies(State(store): State<CastingStore>) -> Json<Value> {
    let movies = store.list_movies();
    Json(json!({
        "success": true,
        "total_movies": movies.len(),
        "movies": movies,
    }))
}

pub async fn create_movie(
    auth: AuthContext,
    State(store): State<CastingStore>,
    body: Result<Json<MovieInput>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let movie = store.create_movie(json_body(body)?)?;
    info!(movie_id = movie.id, subject = %auth.claims.subject, "movie created");
    Ok(Json(json!({ "success": true, "created": movie.id })))
}

pub async fn update_movie(
    auth: AuthContext,
    State(store): State<CastingStore>,
    id: Result<Path<u64>, PathRejection>,
    body: Result<Json<MovieInput>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let id = path_id(id)?;
    let movie = store.update_movie(id, json_body(body)?)?;
    info!(movie_id = movie.id, subject = %auth.claims.subject, "movie updated");
    Ok(Json(json!({ "success": true, "edited": movie.id })))
}

pub async fn delete_movie(
    auth: AuthContext,
    State(store): State<CastingStore>,
    id: Result<Path<u64>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let id = path_id(id)?;
    store.delete_movie(id)?;
    info!(movie_id = id, subject = %auth.claims.subject, "movie deleted");
    Ok(Json(json!({ "success": true, "deleted": id })))
}

pub async fn list_cast(
    State(store): State<CastingStore>,
    id: Result<Path<u64>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let movie_id = path_id(id)?;
    let actors = store.movie_cast(movie_id)?;
    Ok(Json(json!({
        "success": true,
        "movie": movie_id,
        "total_actors": actors.len(),
        "actors": actors,
    })))
}

pub async fn cast_actor(
    auth: AuthContext,
    State(store): State<CastingStore>,
    id: Result<Path<u64>, PathRejection>,
    body: Result<Json<CastRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let movie_id = path_id(id)?;
    let CastRequest { actor_id } = json_body(body)?;
    let actors = store.cast_actor(movie_id, actor_id)?;
    info!(movie_id, actor_id, subject = %auth.claims.subject, "actor cast");
    Ok(Json(json!({
        "success": true,
        "movie": movie_id,
        "total_actors": actors.len(),
        "actors": actors,
    })))
}

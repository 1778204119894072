use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, TimeZone, Utc};
use common_http_errors::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Actor {
    pub id: u64,
    pub name: String,
    pub age: Option<u32>,
    pub gender: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Movie {
    pub id: u64,
    pub title: String,
    pub release_date: Option<DateTime<Utc>>,
}

/// Body of `POST /actors` and `PATCH /actors/:id`. On PATCH absent fields are left alone.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActorInput {
    pub name: Option<String>,
    pub age: Option<u32>,
    pub gender: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MovieInput {
    pub title: Option<String>,
    /// Unix timestamp, seconds.
    pub release_date: Option<i64>,
}

#[derive(Debug, Default)]
struct Tables {
    next_actor_id: u64,
    next_movie_id: u64,
    actors: BTreeMap<u64, Actor>,
    movies: BTreeMap<u64, Movie>,
    // (movie_id, actor_id)
    cast: BTreeSet<(u64, u64)>,
}

/// In-memory catalogue of actors, movies and who plays in what.
#[derive(Clone, Default)]
pub struct CastingStore {
    tables: Arc<RwLock<Tables>>,
}

fn required(value: Option<String>, code: &'static str, field: &str) -> ApiResult<String> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ApiError::Unprocessable {
            code,
            message: Some(format!("'{field}' is required")),
        }),
    }
}

fn rejects_blank(value: &Option<String>, code: &'static str, field: &str) -> ApiResult<()> {
    match value {
        Some(v) if v.trim().is_empty() => Err(ApiError::Unprocessable {
            code,
            message: Some(format!("'{field}' must not be blank")),
        }),
        _ => Ok(()),
    }
}

fn release_date(value: Option<i64>) -> ApiResult<Option<DateTime<Utc>>> {
    value
        .map(|secs| {
            Utc.timestamp_opt(secs, 0).single().ok_or_else(|| ApiError::Unprocessable {
                code: "invalid_movie",
                message: Some(format!("'release_date' out of range: {secs}")),
            })
        })
        .transpose()
}

impl CastingStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn list_actors(&self) -> Vec<Actor> {
        self.read().actors.values().cloned().collect()
    }

    pub fn create_actor(&self, input: ActorInput) -> ApiResult<Actor> {
        let name = required(input.name, "invalid_actor", "name")?;
        let mut tables = self.write();
        tables.next_actor_id += 1;
        let actor = Actor {
            id: tables.next_actor_id,
            name,
            age: input.age,
            gender: input.gender,
        };
        tables.actors.insert(actor.id, actor.clone());
        Ok(actor)
    }

    pub fn update_actor(&self, id: u64, input: ActorInput) -> ApiResult<Actor> {
        rejects_blank(&input.name, "invalid_actor", "name")?;
        let mut tables = self.write();
        let actor = tables.actors.get_mut(&id).ok_or_else(ApiError::not_found)?;
        if let Some(name) = input.name {
            actor.name = name.trim().to_string();
        }
        if input.age.is_some() {
            actor.age = input.age;
        }
        if input.gender.is_some() {
            actor.gender = input.gender;
        }
        Ok(actor.clone())
    }

    /// Removes the actor and every casting that referenced it.
    pub fn delete_actor(&self, id: u64) -> ApiResult<()> {
        let mut tables = self.write();
        tables.actors.remove(&id).ok_or_else(ApiError::not_found)?;
        tables.cast.retain(|(_, actor_id)| *actor_id != id);
        Ok(())
    }

    pub fn list_movies(&self) -> Vec<Movie> {
        self.read().movies.values().cloned().collect()
    }

    pub fn create_movie(&self, input: MovieInput) -> ApiResult<Movie> {
        let title = required(input.title, "invalid_movie", "title")?;
        let release_date = release_date(input.release_date)?;
        let mut tables = self.write();
        tables.next_movie_id += 1;
        let movie = Movie {
            id: tables.next_movie_id,
            title,
            release_date,
        };
        tables.movies.insert(movie.id, movie.clone());
        Ok(movie)
    }

    pub fn update_movie(&self, id: u64, input: MovieInput) -> ApiResult<Movie> {
        rejects_blank(&input.title, "invalid_movie", "title")?;
        let release_date = release_date(input.release_date)?;
        let mut tables = self.write();
        let movie = tables.movies.get_mut(&id).ok_or_else(ApiError::not_found)?;
        if let Some(title) = input.title {
            movie.title = title.trim().to_string();
        }
        if release_date.is_some() {
            movie.release_date = release_date;
        }
        Ok(movie.clone())
    }

    pub fn delete_movie(&self, id: u64) -> ApiResult<()> {
        let mut tables = self.write();
        tables.movies.remove(&id).ok_or_else(ApiError::not_found)?;
        tables.cast.retain(|(movie_id, _)| *movie_id != id);
        Ok(())
    }

    pub fn movie_cast(&self, movie_id: u64) -> ApiResult<Vec<Actor>> {
        let tables = self.read();
        if !tables.movies.contains_key(&movie_id) {
            return Err(ApiError::not_found());
        }
        Ok(tables
            .cast
            .range((movie_id, 0)..=(movie_id, u64::MAX))
            .filter_map(|(_, actor_id)| tables.actors.get(actor_id).cloned())
            .collect())
    }

    /// Casting the same actor twice is a no-op.
    pub fn cast_actor(&self, movie_id: u64, actor_id: u64) -> ApiResult<Vec<Actor>> {
        {
            let mut tables = self.write();
            if !tables.movies.contains_key(&movie_id) || !tables.actors.contains_key(&actor_id) {
                return Err(ApiError::not_found());
            }
            tables.cast.insert((movie_id, actor_id));
        }
        self.movie_cast(movie_id)
    }
}

//! Landing page data

use axum::{extract::State, Json};
use cinelog_common::db::{actors, movies, users, Actor, Movie};
use serde::Serialize;

use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct IndexResponse {
    /// Display name of the catalog owner
    pub user: Option<String>,
    pub movies: Vec<Movie>,
    pub actors: Vec<Actor>,
}

/// GET /api/index
pub async fn get_index(State(state): State<AppState>) -> ApiResult<Json<IndexResponse>> {
    let user = users::first_user(&state.db).await?.and_then(|u| u.name);
    Ok(Json(IndexResponse {
        user,
        movies: movies::list_movies(&state.db).await?,
        actors: actors::list_actors(&state.db).await?,
    }))
}

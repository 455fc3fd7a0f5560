//! Actor endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use cinelog_common::db::{actors, relations, Actor, ActorFields, Movie, Role};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::info;

use super::{required, MessageResponse, SearchParams};
use crate::error::{ApiError, ApiResult};
use crate::session::CurrentUser;
use crate::AppState;

const NAME_MAX: usize = 60;
const GENDER_MAX: usize = 10;
const COUNTRY_MAX: usize = 60;

/// Every field is mandatory when an actor is entered by hand
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActorForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub country: String,
}

impl ActorForm {
    pub fn validate(&self) -> ApiResult<ActorFields> {
        Ok(ActorFields {
            name: Some(required(&self.name, NAME_MAX)?),
            gender: Some(required(&self.gender, GENDER_MAX)?),
            country: Some(required(&self.country, COUNTRY_MAX)?),
        })
    }
}

/// An actor with the movies they appear in and direct
#[derive(Debug, Serialize)]
pub struct ActorDetail {
    pub actor: Actor,
    pub acted: Vec<Movie>,
    pub directed: Vec<Movie>,
}

#[derive(Debug, Serialize)]
pub struct ActorSaved {
    pub message: String,
    pub actor: Actor,
}

async fn load_detail(pool: &SqlitePool, actor: Actor) -> ApiResult<ActorDetail> {
    Ok(ActorDetail {
        acted: relations::filmography_for_actor(pool, actor.id, Role::Actor).await?,
        directed: relations::filmography_for_actor(pool, actor.id, Role::Director).await?,
        actor,
    })
}

fn not_found(id: i64) -> ApiError {
    ApiError::NotFound(format!("Actor {} not found", id))
}

/// POST /api/actors
pub async fn create_actor(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(form): Json<ActorForm>,
) -> ApiResult<(StatusCode, Json<ActorSaved>)> {
    let fields = form.validate()?;
    let actor = actors::insert_actor(&state.db, &fields).await?;

    info!("{} created actor {}", user.username, actor.id);
    Ok((
        StatusCode::CREATED,
        Json(ActorSaved {
            message: "Item created.".to_string(),
            actor,
        }),
    ))
}

/// GET /api/actors/:id
pub async fn get_actor_detail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<ActorDetail>> {
    let actor = actors::get_actor(&state.db, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(load_detail(&state.db, actor).await?))
}

/// PUT /api/actors/:id
pub async fn update_actor(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(form): Json<ActorForm>,
) -> ApiResult<Json<ActorSaved>> {
    if actors::get_actor(&state.db, id).await?.is_none() {
        return Err(not_found(id));
    }
    let fields = form.validate()?;
    actors::update_actor(&state.db, id, &fields).await?;

    info!("{} updated actor {}", user.username, id);

    let actor = actors::get_actor(&state.db, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(ActorSaved {
        message: "Item updated.".to_string(),
        actor,
    }))
}

/// DELETE /api/actors/:id
///
/// Removes the actor from every movie it was linked to.
pub async fn delete_actor(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> ApiResult<Json<MessageResponse>> {
    let mut tx = state.db.begin().await?;
    if !actors::delete_actor(&mut *tx, id).await? {
        return Err(not_found(id));
    }
    tx.commit().await?;

    info!("{} deleted actor {}", user.username, id);
    Ok(Json(MessageResponse::new("Item deleted.")))
}

/// GET /api/actors/search?search_query=
pub async fn search_actors(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<Vec<ActorDetail>>> {
    let mut results = Vec::new();
    for actor in actors::search_actors(&state.db, &params.search_query).await? {
        results.push(load_detail(&state.db, actor).await?);
    }
    Ok(Json(results))
}

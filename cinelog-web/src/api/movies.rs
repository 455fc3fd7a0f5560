//! Movie endpoints
//!
//! Create and edit run field validation, the row write and cast
//! reconciliation in one transaction.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::NaiveDate;
use cinelog_common::analytics::{self, Prediction};
use cinelog_common::db::{movies, relations, Actor, Movie, MovieFields, Role};
use cinelog_common::{reconcile_cast, CastEdit, ReconcileReport};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::info;

use super::{optional, required, MessageResponse, SearchParams};
use crate::error::{ApiError, ApiResult};
use crate::session::CurrentUser;
use crate::AppState;

const TITLE_MAX: usize = 60;
const COUNTRY_MAX: usize = 60;
const GENRE_MAX: usize = 60;
const YEAR_MAX: usize = 4;

/// Placeholder the legacy forms submit for "no value"
const NONE_LITERAL: &str = "None";

/// Box office as typed: a number, or text that may be blank
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum BoxOfficeInput {
    Number(f64),
    Text(String),
}

impl BoxOfficeInput {
    fn parse(&self) -> ApiResult<Option<f64>> {
        match self {
            BoxOfficeInput::Number(n) if n.is_finite() => Ok(Some(*n)),
            BoxOfficeInput::Number(_) => Err(ApiError::invalid_input()),
            BoxOfficeInput::Text(text) => {
                let text = text.trim();
                if text.is_empty() || text == NONE_LITERAL {
                    return Ok(None);
                }
                text.parse::<f64>()
                    .ok()
                    .filter(|n| n.is_finite())
                    .map(Some)
                    .ok_or_else(ApiError::invalid_input)
            }
        }
    }
}

/// Movie columns as submitted by the create and edit forms
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MovieForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub year: String,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    /// `YYYY-MM-DD`
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub box_office: Option<BoxOfficeInput>,
}

impl MovieForm {
    pub fn validate(&self) -> ApiResult<MovieFields> {
        let release_date = match self.release_date.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(text) => Some(
                NaiveDate::parse_from_str(text, "%Y-%m-%d")
                    .map_err(|_| ApiError::invalid_input())?,
            ),
        };

        let year = required(&self.year, YEAR_MAX)?;
        if !year.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ApiError::invalid_input());
        }

        Ok(MovieFields {
            title: required(&self.title, TITLE_MAX)?,
            year: Some(year),
            country: optional(self.country.as_deref(), COUNTRY_MAX)?,
            genre: optional(self.genre.as_deref(), GENRE_MAX)?,
            release_date,
            box_office: match &self.box_office {
                Some(input) => input.parse()?,
                None => None,
            },
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateMovieRequest {
    #[serde(flatten)]
    pub movie: MovieForm,
    /// Lead actor name, may be blank
    #[serde(default)]
    pub actor: String,
    /// Director name, may be blank
    #[serde(default)]
    pub director: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMovieRequest {
    #[serde(flatten)]
    pub movie: MovieForm,
    #[serde(default)]
    pub cast: CastEdit,
}

/// A movie with the people linked to it
#[derive(Debug, Serialize)]
pub struct MovieDetail {
    pub movie: Movie,
    pub actors: Vec<Actor>,
    pub directors: Vec<Actor>,
}

#[derive(Debug, Serialize)]
pub struct MovieSaved {
    pub message: String,
    pub notices: Vec<String>,
    pub movie: MovieDetail,
    pub reconcile: ReconcileReport,
}

#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    pub movie: Movie,
    /// Percentile position within the genre; `None` without a box office
    pub rank: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    #[serde(flatten)]
    pub prediction: Prediction,
    pub notice: String,
}

async fn load_detail(pool: &SqlitePool, movie: Movie) -> ApiResult<MovieDetail> {
    Ok(MovieDetail {
        actors: relations::cast_for_movie(pool, movie.id, Role::Actor).await?,
        directors: relations::cast_for_movie(pool, movie.id, Role::Director).await?,
        movie,
    })
}

fn check_cast(cast: &CastEdit) -> ApiResult<()> {
    cast.check_names().map_err(|_| ApiError::invalid_input())
}

async fn load_movie(pool: &SqlitePool, id: i64) -> ApiResult<Movie> {
    movies::get_movie(pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Movie {} not found", id)))
}

/// POST /api/movies
pub async fn create_movie(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(request): Json<CreateMovieRequest>,
) -> ApiResult<(StatusCode, Json<MovieSaved>)> {
    let fields = request.movie.validate()?;
    let cast = CastEdit::single(request.actor, request.director);
    check_cast(&cast)?;

    let mut tx = state.db.begin().await?;
    if movies::find_movie_by_title(&mut *tx, &fields.title)
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict("The movie has already existed!".to_string()));
    }

    let movie = movies::insert_movie(&mut *tx, &fields).await?;
    let report = reconcile_cast(&mut *tx, movie.id, &cast).await?;
    tx.commit().await?;

    info!("{} created movie {} ({})", user.username, movie.id, movie.title);

    Ok((
        StatusCode::CREATED,
        Json(MovieSaved {
            message: "Item created.".to_string(),
            notices: report.notices(),
            movie: load_detail(&state.db, movie).await?,
            reconcile: report,
        }),
    ))
}

/// GET /api/movies/:id
pub async fn get_movie_detail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<MovieDetail>> {
    let movie = load_movie(&state.db, id).await?;
    Ok(Json(load_detail(&state.db, movie).await?))
}

/// PUT /api/movies/:id
///
/// Updates the columns, then reconciles the submitted cast slots.
pub async fn update_movie(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateMovieRequest>,
) -> ApiResult<Json<MovieSaved>> {
    check_cast(&request.cast)?;

    let mut tx = state.db.begin().await?;
    if movies::get_movie(&mut *tx, id).await?.is_none() {
        return Err(ApiError::NotFound(format!("Movie {} not found", id)));
    }

    let fields = request.movie.validate()?;
    if let Some(other) = movies::find_movie_by_title(&mut *tx, &fields.title).await? {
        if other.id != id {
            return Err(ApiError::Conflict("The movie has already existed!".to_string()));
        }
    }

    movies::update_movie(&mut *tx, id, &fields).await?;
    let report = reconcile_cast(&mut *tx, id, &request.cast).await?;
    tx.commit().await?;

    info!("{} updated movie {}", user.username, id);

    let movie = load_movie(&state.db, id).await?;
    Ok(Json(MovieSaved {
        message: "Item updated.".to_string(),
        notices: report.notices(),
        movie: load_detail(&state.db, movie).await?,
        reconcile: report,
    }))
}

/// DELETE /api/movies/:id
pub async fn delete_movie(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> ApiResult<Json<MessageResponse>> {
    let mut tx = state.db.begin().await?;
    if !movies::delete_movie(&mut *tx, id).await? {
        return Err(ApiError::NotFound(format!("Movie {} not found", id)));
    }
    tx.commit().await?;

    info!("{} deleted movie {}", user.username, id);
    Ok(Json(MessageResponse::new("Item deleted.")))
}

/// GET /api/movies/search?search_query=
pub async fn search_movies(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<Vec<MovieDetail>>> {
    let mut results = Vec::new();
    for movie in movies::search_movies(&state.db, &params.search_query).await? {
        results.push(load_detail(&state.db, movie).await?);
    }
    Ok(Json(results))
}

/// GET /api/movies/:id/analysis
pub async fn analyse_movie(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<AnalysisResponse>> {
    let movie = load_movie(&state.db, id).await?;
    let rank = analytics::rank_in_genre(&state.db, &movie).await?;
    let notice = rank
        .is_none()
        .then(|| "This movie has no box office record".to_string());

    Ok(Json(AnalysisResponse {
        movie,
        rank,
        notice,
    }))
}

/// GET /api/movies/:id/prediction
pub async fn predict_movie(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<PredictionResponse>> {
    let prediction = analytics::predict_box_office(&state.db, id).await?;
    let notice = prediction.notice().to_string();
    Ok(Json(PredictionResponse { prediction, notice }))
}

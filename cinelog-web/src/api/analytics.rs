//! Genre-level box-office views

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use cinelog_common::analytics::{genre_boxes, render_svg, GenreBox};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// GET /api/analytics/boxplot
pub async fn boxplot_stats(State(state): State<AppState>) -> ApiResult<Json<Vec<GenreBox>>> {
    Ok(Json(genre_boxes(&state.db).await?))
}

/// GET /analytics/boxplot.svg
pub async fn boxplot_svg(State(state): State<AppState>) -> ApiResult<Response> {
    let boxes = genre_boxes(&state.db).await?;
    let svg = render_svg(&boxes).map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok((StatusCode::OK, [(header::CONTENT_TYPE, "image/svg+xml")], svg)
        .into_response())
}

//! Within-genre box-office rank

use sqlx::SqlitePool;

use crate::db::models::Movie;
use crate::db::movies;
use crate::Result;

/// Percentile position of `movie_id` in an ascending box-office ranking
///
/// `ranking` holds `(movie_id, box_office)` pairs already sorted ascending.
/// Position is 1-based, result is rounded to two decimals. `None` when the
/// movie is not in the ranking.
pub fn genre_rank(movie_id: i64, ranking: &[(i64, f64)]) -> Option<f64> {
    let position = ranking.iter().position(|(id, _)| *id == movie_id)? + 1;
    let percent = position as f64 * 100.0 / ranking.len() as f64;
    Some((percent * 100.0).round() / 100.0)
}

/// Rank a movie among the movies sharing its genre
///
/// Only movies with a recorded (non-zero) box office take part. A movie
/// without one has no rank.
pub async fn rank_in_genre(pool: &SqlitePool, movie: &Movie) -> Result<Option<f64>> {
    if movie.recorded_box_office().is_none() {
        return Ok(None);
    }

    let ranking: Vec<(i64, f64)> = movies::movies_in_genre(pool, movie.genre.as_deref())
        .await?
        .into_iter()
        .filter_map(|m| m.recorded_box_office().map(|b| (m.id, b)))
        .collect();

    Ok(genre_rank(movie.id, &ranking))
}

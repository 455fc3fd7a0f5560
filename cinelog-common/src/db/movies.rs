//! Movie database operations

use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite, SqliteConnection};
use tracing::info;

use super::models::{Movie, MovieFields};
use crate::Result;

pub(crate) fn movie_from_row(row: &SqliteRow) -> Result<Movie> {
    Ok(Movie {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        release_date: row.try_get("release_date")?,
        country: row.try_get("country")?,
        genre: row.try_get("genre")?,
        year: row.try_get("year")?,
        box_office: row.try_get("box_office")?,
    })
}

/// Build a `LIKE` pattern matching `query` anywhere, with wildcards escaped
pub(crate) fn contains_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for c in query.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

pub async fn list_movies<'e, E>(executor: E) -> Result<Vec<Movie>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query(
        "SELECT id, title, release_date, country, genre, year, box_office FROM movies ORDER BY id",
    )
    .fetch_all(executor)
    .await?;

    rows.iter().map(movie_from_row).collect()
}

pub async fn get_movie<'e, E>(executor: E, id: i64) -> Result<Option<Movie>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(
        "SELECT id, title, release_date, country, genre, year, box_office FROM movies WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(executor)
    .await?;

    row.as_ref().map(movie_from_row).transpose()
}

/// Exact title lookup, used to reject duplicate entries
pub async fn find_movie_by_title<'e, E>(executor: E, title: &str) -> Result<Option<Movie>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(
        "SELECT id, title, release_date, country, genre, year, box_office
         FROM movies WHERE title = ? ORDER BY id LIMIT 1",
    )
    .bind(title)
    .fetch_optional(executor)
    .await?;

    row.as_ref().map(movie_from_row).transpose()
}

/// Case-insensitive substring search on title
pub async fn search_movies<'e, E>(executor: E, query: &str) -> Result<Vec<Movie>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query(
        "SELECT id, title, release_date, country, genre, year, box_office
         FROM movies WHERE title LIKE ? ESCAPE '\\' ORDER BY id",
    )
    .bind(contains_pattern(query))
    .fetch_all(executor)
    .await?;

    rows.iter().map(movie_from_row).collect()
}

/// Movies of one genre, ascending by box office (NULLs first), ties by id
///
/// `None` selects the movies without a genre.
pub async fn movies_in_genre<'e, E>(executor: E, genre: Option<&str>) -> Result<Vec<Movie>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query(
        "SELECT id, title, release_date, country, genre, year, box_office
         FROM movies WHERE genre IS ? ORDER BY box_office, id",
    )
    .bind(genre)
    .fetch_all(executor)
    .await?;

    rows.iter().map(movie_from_row).collect()
}

/// Distinct non-null genres, sorted
pub async fn list_genres<'e, E>(executor: E) -> Result<Vec<String>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let genres = sqlx::query_scalar(
        "SELECT DISTINCT genre FROM movies WHERE genre IS NOT NULL ORDER BY genre",
    )
    .fetch_all(executor)
    .await?;

    Ok(genres)
}

pub async fn insert_movie<'e, E>(executor: E, fields: &MovieFields) -> Result<Movie>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO movies (title, release_date, country, genre, year, box_office)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&fields.title)
    .bind(fields.release_date)
    .bind(&fields.country)
    .bind(&fields.genre)
    .bind(&fields.year)
    .bind(fields.box_office)
    .execute(executor)
    .await?;

    let id = result.last_insert_rowid();
    info!("Inserted movie {} ({})", id, fields.title);

    Ok(Movie {
        id,
        title: fields.title.clone(),
        release_date: fields.release_date,
        country: fields.country.clone(),
        genre: fields.genre.clone(),
        year: fields.year.clone(),
        box_office: fields.box_office,
    })
}

/// Returns false when no such movie exists
pub async fn update_movie<'e, E>(executor: E, id: i64, fields: &MovieFields) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE movies
        SET title = ?, release_date = ?, country = ?, genre = ?, year = ?, box_office = ?
        WHERE id = ?
        "#,
    )
    .bind(&fields.title)
    .bind(fields.release_date)
    .bind(&fields.country)
    .bind(&fields.genre)
    .bind(&fields.year)
    .bind(fields.box_office)
    .bind(id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete a movie and every relation pointing at it
///
/// Returns false when no such movie exists.
pub async fn delete_movie(conn: &mut SqliteConnection, id: i64) -> Result<bool> {
    let relations = sqlx::query("DELETE FROM relations WHERE movie_id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    let movie = sqlx::query("DELETE FROM movies WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    if movie.rows_affected() > 0 {
        info!(
            "Deleted movie {} and {} relation(s)",
            id,
            relations.rows_affected()
        );
    }
    Ok(movie.rows_affected() > 0)
}

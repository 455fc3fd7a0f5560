//! Movie ↔ actor relation operations

use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite};

use super::actors::actor_from_row;
use super::models::{Actor, Movie, Relation, Role};
use super::movies::movie_from_row;
use crate::Result;

fn relation_from_row(row: &SqliteRow) -> Result<Relation> {
    let role: String = row.try_get("role")?;
    Ok(Relation {
        id: row.try_get("id")?,
        movie_id: row.try_get("movie_id")?,
        actor_id: row.try_get("actor_id")?,
        role: role.parse()?,
    })
}

/// Relations of one movie for one role, oldest first
pub async fn relations_for_movie<'e, E>(executor: E, movie_id: i64, role: Role) -> Result<Vec<Relation>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query(
        "SELECT id, movie_id, actor_id, role FROM relations WHERE movie_id = ? AND role = ? ORDER BY id",
    )
    .bind(movie_id)
    .bind(role.as_str())
    .fetch_all(executor)
    .await?;

    rows.iter().map(relation_from_row).collect()
}

/// Relations of one actor for one role, oldest first
pub async fn relations_for_actor<'e, E>(executor: E, actor_id: i64, role: Role) -> Result<Vec<Relation>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query(
        "SELECT id, movie_id, actor_id, role FROM relations WHERE actor_id = ? AND role = ? ORDER BY id",
    )
    .bind(actor_id)
    .bind(role.as_str())
    .fetch_all(executor)
    .await?;

    rows.iter().map(relation_from_row).collect()
}

pub async fn find_relation<'e, E>(
    executor: E,
    movie_id: i64,
    actor_id: i64,
    role: Role,
) -> Result<Option<Relation>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(
        "SELECT id, movie_id, actor_id, role FROM relations WHERE movie_id = ? AND actor_id = ? AND role = ?",
    )
    .bind(movie_id)
    .bind(actor_id)
    .bind(role.as_str())
    .fetch_optional(executor)
    .await?;

    row.as_ref().map(relation_from_row).transpose()
}

/// People attached to a movie in one role, in relation order
pub async fn cast_for_movie<'e, E>(executor: E, movie_id: i64, role: Role) -> Result<Vec<Actor>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query(
        r#"
        SELECT a.id, a.name, a.gender, a.country
        FROM relations r
        JOIN actors a ON a.id = r.actor_id
        WHERE r.movie_id = ? AND r.role = ?
        ORDER BY r.id
        "#,
    )
    .bind(movie_id)
    .bind(role.as_str())
    .fetch_all(executor)
    .await?;

    rows.iter().map(actor_from_row).collect()
}

/// Movies an actor is attached to in one role, in relation order
pub async fn filmography_for_actor<'e, E>(executor: E, actor_id: i64, role: Role) -> Result<Vec<Movie>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query(
        r#"
        SELECT m.id, m.title, m.release_date, m.country, m.genre, m.year, m.box_office
        FROM relations r
        JOIN movies m ON m.id = r.movie_id
        WHERE r.actor_id = ? AND r.role = ?
        ORDER BY r.id
        "#,
    )
    .bind(actor_id)
    .bind(role.as_str())
    .fetch_all(executor)
    .await?;

    rows.iter().map(movie_from_row).collect()
}

/// Insert a relation; an identical existing row is left alone
///
/// Returns the id of the new or already-present row.
pub async fn insert_relation<'e, E>(executor: E, movie_id: i64, actor_id: i64, role: Role) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO relations (movie_id, actor_id, role) VALUES (?, ?, ?)
        ON CONFLICT(movie_id, actor_id, role) DO UPDATE SET role = excluded.role
        RETURNING id
        "#,
    )
    .bind(movie_id)
    .bind(actor_id)
    .bind(role.as_str())
    .fetch_one(executor)
    .await?;

    Ok(id)
}

pub async fn delete_relation<'e, E>(executor: E, id: i64) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM relations WHERE id = ?")
        .bind(id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn count_relations<'e, E>(executor: E, movie_id: i64, role: Role) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM relations WHERE movie_id = ? AND role = ?")
        .bind(movie_id)
        .bind(role.as_str())
        .fetch_one(executor)
        .await?;

    Ok(count)
}

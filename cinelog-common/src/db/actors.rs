//! Actor database operations
//!
//! Directors live in the same table; the role is carried by the relation.

use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite, SqliteConnection};
use tracing::info;

use super::models::{Actor, ActorFields};
use super::movies::contains_pattern;
use crate::Result;

pub(crate) fn actor_from_row(row: &SqliteRow) -> Result<Actor> {
    Ok(Actor {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        gender: row.try_get("gender")?,
        country: row.try_get("country")?,
    })
}

pub async fn list_actors<'e, E>(executor: E) -> Result<Vec<Actor>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query("SELECT id, name, gender, country FROM actors ORDER BY id")
        .fetch_all(executor)
        .await?;

    rows.iter().map(actor_from_row).collect()
}

pub async fn get_actor<'e, E>(executor: E, id: i64) -> Result<Option<Actor>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query("SELECT id, name, gender, country FROM actors WHERE id = ?")
        .bind(id)
        .fetch_optional(executor)
        .await?;

    row.as_ref().map(actor_from_row).transpose()
}

/// Exact, case-sensitive name match; the oldest row wins on duplicates
pub async fn find_actor_by_name<'e, E>(executor: E, name: &str) -> Result<Option<Actor>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(
        "SELECT id, name, gender, country FROM actors WHERE name = ? ORDER BY id LIMIT 1",
    )
    .bind(name)
    .fetch_optional(executor)
    .await?;

    row.as_ref().map(actor_from_row).transpose()
}

/// Case-insensitive substring search on name
pub async fn search_actors<'e, E>(executor: E, query: &str) -> Result<Vec<Actor>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query(
        "SELECT id, name, gender, country FROM actors WHERE name LIKE ? ESCAPE '\\' ORDER BY id",
    )
    .bind(contains_pattern(query))
    .fetch_all(executor)
    .await?;

    rows.iter().map(actor_from_row).collect()
}

pub async fn insert_actor<'e, E>(executor: E, fields: &ActorFields) -> Result<Actor>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("INSERT INTO actors (name, gender, country) VALUES (?, ?, ?)")
        .bind(&fields.name)
        .bind(&fields.gender)
        .bind(&fields.country)
        .execute(executor)
        .await?;

    let id = result.last_insert_rowid();
    info!("Inserted actor {} ({})", id, fields.name.as_deref().unwrap_or(""));

    Ok(Actor {
        id,
        name: fields.name.clone(),
        gender: fields.gender.clone(),
        country: fields.country.clone(),
    })
}

/// Returns false when no such actor exists
pub async fn update_actor<'e, E>(executor: E, id: i64, fields: &ActorFields) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("UPDATE actors SET name = ?, gender = ?, country = ? WHERE id = ?")
        .bind(&fields.name)
        .bind(&fields.gender)
        .bind(&fields.country)
        .bind(id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete an actor and every relation pointing at it
///
/// Returns false when no such actor exists.
pub async fn delete_actor(conn: &mut SqliteConnection, id: i64) -> Result<bool> {
    let relations = sqlx::query("DELETE FROM relations WHERE actor_id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    let actor = sqlx::query("DELETE FROM actors WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    if actor.rows_affected() > 0 {
        info!(
            "Deleted actor {} and {} relation(s)",
            id,
            relations.rows_affected()
        );
    }
    Ok(actor.rows_affected() > 0)
}

//! User account operations
//!
//! The catalog has a single editing account: the first row of `users`.

use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite};

use super::models::User;
use crate::Result;

fn user_from_row(row: &SqliteRow) -> Result<User> {
    Ok(User {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        username: row.try_get("username")?,
        password_hash: row.try_get("password_hash")?,
    })
}

pub async fn first_user<'e, E>(executor: E) -> Result<Option<User>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query("SELECT id, name, username, password_hash FROM users ORDER BY id LIMIT 1")
        .fetch_optional(executor)
        .await?;

    row.as_ref().map(user_from_row).transpose()
}

pub async fn get_user<'e, E>(executor: E, id: i64) -> Result<Option<User>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query("SELECT id, name, username, password_hash FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(executor)
        .await?;

    row.as_ref().map(user_from_row).transpose()
}

pub async fn insert_user<'e, E>(
    executor: E,
    name: Option<&str>,
    username: Option<&str>,
    password_hash: Option<&str>,
) -> Result<User>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("INSERT INTO users (name, username, password_hash) VALUES (?, ?, ?)")
        .bind(name)
        .bind(username)
        .bind(password_hash)
        .execute(executor)
        .await?;

    Ok(User {
        id: result.last_insert_rowid(),
        name: name.map(str::to_string),
        username: username.map(str::to_string),
        password_hash: password_hash.map(str::to_string),
    })
}

pub async fn update_user_name<'e, E>(executor: E, id: i64, name: &str) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("UPDATE users SET name = ? WHERE id = ?")
        .bind(name)
        .bind(id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn update_credentials<'e, E>(
    executor: E,
    id: i64,
    username: &str,
    password_hash: &str,
) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("UPDATE users SET username = ?, password_hash = ? WHERE id = ?")
        .bind(username)
        .bind(password_hash)
        .bind(id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() > 0)
}

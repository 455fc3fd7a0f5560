//! Bundled sample catalog used by the `forge` command

use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::info;

use crate::db::models::{Actor, Movie, Relation};
use crate::db::users;
use crate::{Error, Result};

const FORGE_JSON: &str = include_str!("../seed/forge.json");

#[derive(Debug, Clone, Deserialize)]
pub struct SeedData {
    pub user_name: String,
    pub movies: Vec<Movie>,
    pub people: Vec<Actor>,
    pub relations: Vec<Relation>,
}

/// Rows written by [`forge`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForgeSummary {
    pub movies: u64,
    pub people: u64,
    pub relations: u64,
    pub user_created: bool,
}

/// Parse the bundled sample data
pub fn bundled() -> Result<SeedData> {
    serde_json::from_str(FORGE_JSON).map_err(|e| Error::Internal(format!("Invalid seed data: {}", e)))
}

/// Insert the sample data in one transaction
///
/// Rows keep their fixed ids; rows whose id already exists are skipped, so
/// running it twice is harmless. The display user is only added when the
/// users table is empty.
pub async fn forge(pool: &SqlitePool, data: &SeedData) -> Result<ForgeSummary> {
    let mut tx = pool.begin().await?;
    let mut summary = ForgeSummary::default();

    if users::first_user(&mut *tx).await?.is_none() {
        users::insert_user(&mut *tx, Some(&data.user_name), None, None).await?;
        summary.user_created = true;
    }

    for movie in &data.movies {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO movies (id, title, release_date, country, genre, year, box_office)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(movie.id)
        .bind(&movie.title)
        .bind(movie.release_date)
        .bind(&movie.country)
        .bind(&movie.genre)
        .bind(&movie.year)
        .bind(movie.box_office)
        .execute(&mut *tx)
        .await?;
        summary.movies += result.rows_affected();
    }

    for person in &data.people {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO actors (id, name, gender, country) VALUES (?, ?, ?, ?)",
        )
        .bind(person.id)
        .bind(&person.name)
        .bind(&person.gender)
        .bind(&person.country)
        .execute(&mut *tx)
        .await?;
        summary.people += result.rows_affected();
    }

    for relation in &data.relations {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO relations (id, movie_id, actor_id, role) VALUES (?, ?, ?, ?)",
        )
        .bind(relation.id)
        .bind(relation.movie_id)
        .bind(relation.actor_id)
        .bind(relation.role.as_str())
        .execute(&mut *tx)
        .await?;
        summary.relations += result.rows_affected();
    }

    tx.commit().await?;

    info!(
        "Forged {} movies, {} people, {} relations",
        summary.movies, summary.people, summary.relations
    );
    Ok(summary)
}

//! Cast reconciliation
//!
//! Turns the cast/director names submitted for a movie into Actor and
//! Relation rows. Each submitted slot carries the actor currently shown in
//! that position (if any) and the name now typed there:
//!
//! - blank name: the slot's relation is dropped
//! - name of the actor already in the slot: nothing changes
//! - name of another existing actor: the slot's relation is replaced by one
//!   pointing at that actor
//! - unknown name: a name-only actor is created and linked
//!
//! Matching is exact and case-sensitive. Slots are applied in order (actors,
//! then directors) on one connection, so a person created by an actor slot
//! is found again by a director slot with the same name and both roles end
//! up on the same row.
//!
//! Every reconciliation ends with [`sweep_orphans`]: placeholder actors
//! (NULL, blank or `None` names) are deleted along with their relations, and
//! relations pointing at missing actors or movies are removed.

use serde::{Deserialize, Serialize};
use sqlx::{Executor, Sqlite, SqliteConnection};
use tracing::{debug, warn};

use crate::db::models::{ActorFields, Role};
use crate::db::{actors, movies, relations};
use crate::{Error, Result};

/// Names treated as "nothing entered"
const PLACEHOLDER_NAME: &str = "None";

/// Longest actor name, in characters
pub const ACTOR_NAME_MAX: usize = 60;

/// One name field of the cast form
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CastSlot {
    /// Actor currently linked through this slot; `None` for the blank "add" slot
    #[serde(default)]
    pub current_actor_id: Option<i64>,
    #[serde(default)]
    pub name: String,
}

impl CastSlot {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            current_actor_id: None,
            name: name.into(),
        }
    }

    pub fn existing(current_actor_id: i64, name: impl Into<String>) -> Self {
        Self {
            current_actor_id: Some(current_actor_id),
            name: name.into(),
        }
    }
}

/// Submitted cast form state for one movie
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CastEdit {
    #[serde(default)]
    pub actors: Vec<CastSlot>,
    #[serde(default)]
    pub directors: Vec<CastSlot>,
}

impl CastEdit {
    /// One lead actor and one director, as entered on the create form
    pub fn single(actor_name: impl Into<String>, director_name: impl Into<String>) -> Self {
        Self {
            actors: vec![CastSlot::new(actor_name)],
            directors: vec![CastSlot::new(director_name)],
        }
    }

    pub fn slots(&self, role: Role) -> &[CastSlot] {
        match role {
            Role::Actor => &self.actors,
            Role::Director => &self.directors,
        }
    }

    /// Reject names that could not be stored as an actor
    pub fn check_names(&self) -> Result<()> {
        let too_long = self
            .actors
            .iter()
            .chain(&self.directors)
            .filter(|slot| !is_placeholder_name(&slot.name))
            .find(|slot| slot.name.trim().chars().count() > ACTOR_NAME_MAX);

        match too_long {
            Some(slot) => Err(Error::InvalidInput(format!(
                "Name longer than {} characters: {}...",
                ACTOR_NAME_MAX,
                slot.name.trim().chars().take(20).collect::<String>()
            ))),
            None => Ok(()),
        }
    }
}

/// An actor row a slot resolved to
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assignment {
    pub role: Role,
    pub actor_id: i64,
    pub name: String,
}

/// Rows removed by [`sweep_orphans`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub placeholder_actors: u64,
    pub dangling_relations: u64,
}

/// What one reconciliation did
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconcileReport {
    /// Slots that matched an existing actor other than the one already there
    pub reused: Vec<Assignment>,
    /// Actors created because no row carried the name
    pub created: Vec<Assignment>,
    pub relations_inserted: u64,
    pub relations_removed: u64,
    pub swept: SweepReport,
}

impl ReconcileReport {
    /// User-facing notices for reused names
    pub fn notices(&self) -> Vec<String> {
        self.reused
            .iter()
            .map(|a| match a.role {
                Role::Actor => "The actor has already existed!".to_string(),
                Role::Director => "The director has already existed!".to_string(),
            })
            .collect()
    }
}

/// Blank, whitespace-only and the literal `None` count as no name
pub fn is_placeholder_name(name: &str) -> bool {
    let trimmed = name.trim();
    trimmed.is_empty() || trimmed == PLACEHOLDER_NAME
}

/// Apply a cast form to a movie
///
/// Run inside the request's transaction; nothing is committed here.
pub async fn reconcile_cast(
    conn: &mut SqliteConnection,
    movie_id: i64,
    edit: &CastEdit,
) -> Result<ReconcileReport> {
    edit.check_names()?;
    if movies::get_movie(&mut *conn, movie_id).await?.is_none() {
        return Err(Error::NotFound(format!("Movie {}", movie_id)));
    }

    let mut report = ReconcileReport::default();

    for role in Role::ALL {
        for slot in edit.slots(role) {
            reconcile_slot(conn, movie_id, role, slot, &mut report).await?;
        }
    }

    report.swept = sweep_orphans(conn).await?;

    debug!(
        "Reconciled cast of movie {}: {} reused, {} created, +{} / -{} relations",
        movie_id,
        report.reused.len(),
        report.created.len(),
        report.relations_inserted,
        report.relations_removed
    );

    Ok(report)
}

async fn reconcile_slot(
    conn: &mut SqliteConnection,
    movie_id: i64,
    role: Role,
    slot: &CastSlot,
    report: &mut ReconcileReport,
) -> Result<()> {
    let stale = match slot.current_actor_id {
        Some(actor_id) => relations::find_relation(&mut *conn, movie_id, actor_id, role).await?,
        None => None,
    };

    if is_placeholder_name(&slot.name) {
        if let Some(relation) = stale {
            relations::delete_relation(&mut *conn, relation.id).await?;
            report.relations_removed += 1;
        }
        return Ok(());
    }

    let name = slot.name.trim();

    let (actor_id, created) = match actors::find_actor_by_name(&mut *conn, name).await? {
        Some(actor) => {
            if stale.is_some() && slot.current_actor_id == Some(actor.id) {
                return Ok(());
            }
            (actor.id, false)
        }
        None => {
            let actor = actors::insert_actor(&mut *conn, &ActorFields::named(name)).await?;
            (actor.id, true)
        }
    };

    if let Some(relation) = stale {
        relations::delete_relation(&mut *conn, relation.id).await?;
        report.relations_removed += 1;
    }

    let already_linked = relations::find_relation(&mut *conn, movie_id, actor_id, role)
        .await?
        .is_some();
    if !already_linked {
        relations::insert_relation(&mut *conn, movie_id, actor_id, role).await?;
        report.relations_inserted += 1;
    }

    let assignment = Assignment {
        role,
        actor_id,
        name: name.to_string(),
    };
    if created {
        report.created.push(assignment);
    } else {
        report.reused.push(assignment);
    }

    Ok(())
}

/// Delete placeholder actors and dangling relations
pub async fn sweep_orphans(conn: &mut SqliteConnection) -> Result<SweepReport> {
    let placeholder_ids: Vec<i64> = sqlx::query_scalar(
        "SELECT id FROM actors WHERE name IS NULL OR TRIM(name) = '' OR name = ?",
    )
    .bind(PLACEHOLDER_NAME)
    .fetch_all(&mut *conn)
    .await?;

    let mut report = SweepReport::default();

    for id in &placeholder_ids {
        let removed = sqlx::query("DELETE FROM relations WHERE actor_id = ?")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        report.dangling_relations += removed.rows_affected();

        sqlx::query("DELETE FROM actors WHERE id = ?")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        report.placeholder_actors += 1;
    }

    let dangling = sqlx::query(
        r#"
        DELETE FROM relations
        WHERE actor_id NOT IN (SELECT id FROM actors)
           OR movie_id NOT IN (SELECT id FROM movies)
        "#,
    )
    .execute(&mut *conn)
    .await?;
    report.dangling_relations += dangling.rows_affected();

    if report != SweepReport::default() {
        warn!(
            "Swept {} placeholder actor(s) and {} dangling relation(s)",
            report.placeholder_actors, report.dangling_relations
        );
    }

    Ok(report)
}

/// Count rows breaking the catalog invariants
///
/// Zero means every relation points at an existing actor and movie and no
/// actor carries a placeholder name.
pub async fn integrity_violations<'e, E>(executor: E) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let count = sqlx::query_scalar(
        r#"
        SELECT
            (SELECT COUNT(*) FROM actors WHERE name IS NULL OR TRIM(name) = '' OR name = ?)
          + (SELECT COUNT(*) FROM relations
             WHERE actor_id NOT IN (SELECT id FROM actors)
                OR movie_id NOT IN (SELECT id FROM movies))
        "#,
    )
    .bind(PLACEHOLDER_NAME)
    .fetch_one(executor)
    .await?;

    Ok(count)
}

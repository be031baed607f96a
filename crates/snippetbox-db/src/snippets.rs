use std::sync::Arc;

use rusqlite::{OptionalExtension, Row};
use snippetbox_types::{Snippet, SnippetId};
use tracing::debug;

use crate::clock::column_utc;
use crate::error::{DomainError, ModelResult};
use crate::Database;

/// Size of the tail window returned by [`SnippetModel::latest`].
pub const LATEST_LIMIT: usize = 10;

/// Operations over the `snippets` relation.
///
/// Every read applies the visibility predicate `expires > now()` in the
/// store, so an expired snippet is indistinguishable from one that never
/// existed. Implementations are stateless and safe to call concurrently.
pub trait SnippetModel: Send + Sync {
    /// The visible snippet with this id, or [`DomainError::NoRecord`].
    fn get(&self, id: SnippetId) -> ModelResult<Snippet>;

    /// Append a snippet living `expires_days` days from the store's `now()`.
    /// A zero-day lifetime stores a snippet that is already invisible.
    fn insert(&self, title: &str, content: &str, expires_days: u32) -> ModelResult<SnippetId>;

    /// Up to [`LATEST_LIMIT`] visible snippets, newest first; ties on
    /// `created` break by id, highest first.
    fn latest(&self) -> ModelResult<Vec<Snippet>>;
}

const GET_SQL: &str = concat!(
    "SELECT id, title, content, created, expires FROM snippets
     WHERE expires > ",
    store_now!(),
    " AND id = ?1"
);

const INSERT_SQL: &str = concat!(
    "INSERT INTO snippets (title, content, created, expires)
     VALUES (?1, ?2, ",
    store_now!(),
    ", strftime('%Y-%m-%d %H:%M:%f', 'now', ?3))
     RETURNING id"
);

const LATEST_SQL: &str = concat!(
    "SELECT id, title, content, created, expires FROM snippets
     WHERE expires > ",
    store_now!(),
    " ORDER BY created DESC, id DESC
     LIMIT ?1"
);

/// [`SnippetModel`] backed by the shared SQLite store.
#[derive(Clone)]
pub struct SqliteSnippetModel {
    db: Arc<Database>,
}

impl SqliteSnippetModel {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

impl SnippetModel for SqliteSnippetModel {
    fn get(&self, id: SnippetId) -> ModelResult<Snippet> {
        self.db.with_conn(|conn| {
            conn.prepare_cached(GET_SQL)?
                .query_row([id], snippet_from_row)
                .optional()?
                .ok_or_else(|| DomainError::NoRecord.into())
        })
    }

    fn insert(&self, title: &str, content: &str, expires_days: u32) -> ModelResult<SnippetId> {
        let lifetime = format!("+{} days", expires_days);
        let id = self.db.with_conn_mut(|conn| {
            conn.prepare_cached(INSERT_SQL)?
                .query_row(rusqlite::params![title, content, lifetime], |row| row.get(0))
                .map_err(crate::ModelError::from)
        })?;

        debug!("Inserted snippet {} expiring in {} days", id, expires_days);
        Ok(id)
    }

    fn latest(&self) -> ModelResult<Vec<Snippet>> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(LATEST_SQL)?;
            // Dropping the row iterator resets the statement on every exit,
            // including an early return from a failed row.
            let rows = stmt
                .query_map([LATEST_LIMIT as i64], snippet_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn snippet_from_row(row: &Row<'_>) -> rusqlite::Result<Snippet> {
    Ok(Snippet {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        created: column_utc(row, 3)?,
        expires: column_utc(row, 4)?,
    })
}

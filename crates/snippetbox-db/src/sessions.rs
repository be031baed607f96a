use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension;

use crate::clock::to_store_timestamp;
use crate::error::StoreError;
use crate::Database;

/// Persistence for the session manager. Keys are token digests, values
/// are opaque serialized session data.
pub trait SessionStore: Send + Sync {
    /// Data for an unexpired session.
    fn find(&self, digest: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Insert or replace.
    fn commit(&self, digest: &str, data: &[u8], expiry: DateTime<Utc>) -> Result<(), StoreError>;

    fn delete(&self, digest: &str) -> Result<(), StoreError>;

    /// Remove every expired session, returning how many went.
    fn delete_expired(&self) -> Result<usize, StoreError>;
}

const FIND_SQL: &str = concat!(
    "SELECT data FROM sessions WHERE token = ?1 AND expiry > ",
    store_now!()
);

const COMMIT_SQL: &str = "INSERT INTO sessions (token, data, expiry) VALUES (?1, ?2, ?3)
     ON CONFLICT(token) DO UPDATE SET data = excluded.data, expiry = excluded.expiry";

const DELETE_EXPIRED_SQL: &str = concat!("DELETE FROM sessions WHERE expiry <= ", store_now!());

/// [`SessionStore`] sharing the application's SQLite handle.
#[derive(Clone)]
pub struct SqliteSessionStore {
    db: Arc<Database>,
}

impl SqliteSessionStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

impl SessionStore for SqliteSessionStore {
    fn find(&self, digest: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.db.with_conn(|conn| {
            let data = conn
                .prepare_cached(FIND_SQL)?
                .query_row([digest], |row| row.get(0))
                .optional()?;
            Ok(data)
        })
    }

    fn commit(&self, digest: &str, data: &[u8], expiry: DateTime<Utc>) -> Result<(), StoreError> {
        let expiry = to_store_timestamp(expiry);
        self.db.with_conn_mut(|conn| {
            conn.prepare_cached(COMMIT_SQL)?
                .execute(rusqlite::params![digest, data, expiry])?;
            Ok(())
        })
    }

    fn delete(&self, digest: &str) -> Result<(), StoreError> {
        self.db.with_conn_mut(|conn| {
            conn.execute("DELETE FROM sessions WHERE token = ?1", [digest])?;
            Ok(())
        })
    }

    fn delete_expired(&self) -> Result<usize, StoreError> {
        self.db
            .with_conn_mut(|conn| Ok(conn.execute(DELETE_EXPIRED_SQL, [])?))
    }
}

//! Cookie sessions on `tower-sessions`, persisted through the model
//! layer's [`SessionStore`].
//!
//! The cookie carries the session id; rows are keyed by the id's digest so
//! a copy of the `sessions` table does not hand out live cookies. A row's
//! deadline is fixed when it is first written and never pushed back, which
//! makes the 12 hour lifetime absolute even though the cookie is refreshed.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use snippetbox_crypto::token::token_digest;
use snippetbox_db::{SessionStore, StoreError};
use time::OffsetDateTime;
use tower_sessions::cookie::SameSite;
use tower_sessions::session::{Id, Record};
use tower_sessions::session_store::{self, Error};
use tower_sessions::{Expiry, SessionManagerLayer};

pub use tower_sessions::Session;

pub const SESSION_COOKIE: &str = "session";

/// Lifetime of a session, counted from its first write.
pub const SESSION_LIFETIME: time::Duration = time::Duration::hours(12);

pub type SessionLayer = SessionManagerLayer<HashedSessionStore>;

/// Session middleware writing to `store`. `secure` is false only for local
/// development over plain HTTP.
pub fn session_layer(store: Arc<dyn SessionStore>, secure: bool) -> SessionLayer {
    SessionManagerLayer::new(HashedSessionStore::new(store))
        .with_name(SESSION_COOKIE)
        .with_secure(secure)
        .with_http_only(true)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(SESSION_LIFETIME))
}

/// Adapter from the blocking model-layer store to `tower-sessions`.
#[derive(Clone)]
pub struct HashedSessionStore {
    inner: Arc<dyn SessionStore>,
}

impl HashedSessionStore {
    pub fn new(inner: Arc<dyn SessionStore>) -> Self {
        Self { inner }
    }

    async fn find(&self, id: &Id) -> session_store::Result<Option<StoredRecord>> {
        let store = self.inner.clone();
        let digest = digest(id);
        match off_runtime(move || store.find(&digest)).await? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| Error::Decode(e.to_string())),
            None => Ok(None),
        }
    }

    async fn write(&self, record: &Record, deadline: Option<i64>) -> session_store::Result<()> {
        let requested = record.expiry_date.unix_timestamp();
        let deadline = deadline.map_or(requested, |d| d.min(requested));
        let expiry = DateTime::<Utc>::from_timestamp(deadline, 0)
            .ok_or_else(|| Error::Encode(format!("deadline {} out of range", deadline)))?;
        let bytes = serde_json::to_vec(&StoredRecord {
            deadline,
            data: record.data.clone(),
        })
        .map_err(|e| Error::Encode(e.to_string()))?;

        let store = self.inner.clone();
        let digest = digest(&record.id);
        off_runtime(move || store.commit(&digest, &bytes, expiry)).await
    }
}

impl fmt::Debug for HashedSessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashedSessionStore").finish_non_exhaustive()
    }
}

#[async_trait]
impl session_store::SessionStore for HashedSessionStore {
    async fn create(&self, record: &mut Record) -> session_store::Result<()> {
        while self.find(&record.id).await?.is_some() {
            record.id = Id::default();
        }
        self.write(record, None).await
    }

    async fn save(&self, record: &Record) -> session_store::Result<()> {
        let deadline = self.find(&record.id).await?.map(|stored| stored.deadline);
        self.write(record, deadline).await
    }

    async fn load(&self, id: &Id) -> session_store::Result<Option<Record>> {
        let Some(stored) = self.find(id).await? else {
            return Ok(None);
        };
        let expiry_date = OffsetDateTime::from_unix_timestamp(stored.deadline)
            .map_err(|e| Error::Decode(e.to_string()))?;
        Ok(Some(Record {
            id: *id,
            data: stored.data,
            expiry_date,
        }))
    }

    async fn delete(&self, id: &Id) -> session_store::Result<()> {
        let store = self.inner.clone();
        let digest = digest(id);
        off_runtime(move || store.delete(&digest)).await
    }
}

#[derive(Serialize, Deserialize)]
struct StoredRecord {
    /// Unix seconds.
    deadline: i64,
    data: HashMap<String, Value>,
}

fn digest(id: &Id) -> String {
    token_digest(&id.to_string())
}

async fn off_runtime<F, T>(f: F) -> session_store::Result<T>
where
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Backend(e.to_string()))?
        .map_err(|e| Error::Backend(e.to_string()))
}

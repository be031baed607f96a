//! In-memory fakes of the model traits, for handler tests.
//!
//! They follow the same contract as the SQLite models (visibility,
//! ordering, case-insensitive email, indistinguishable credential
//! failures) using the process clock instead of the store clock.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use snippetbox_types::{Snippet, SnippetId, User, UserId};

use crate::error::{DomainError, ModelResult, StoreError};
use crate::sessions::SessionStore;
use crate::snippets::{LATEST_LIMIT, SnippetModel};
use crate::users::{UserModel, normalize_email};

fn lock<T>(m: &Mutex<T>) -> Result<std::sync::MutexGuard<'_, T>, StoreError> {
    m.lock().map_err(|_| StoreError::Poisoned)
}

#[derive(Default)]
pub struct MemorySnippetModel {
    rows: Mutex<Vec<Snippet>>,
}

impl MemorySnippetModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move a snippet's expiry into the past.
    pub fn expire(&self, id: SnippetId) {
        if let Ok(mut rows) = self.rows.lock() {
            if let Some(s) = rows.iter_mut().find(|s| s.id == id) {
                s.expires = Utc::now() - Duration::seconds(1);
            }
        }
    }
}

impl SnippetModel for MemorySnippetModel {
    fn get(&self, id: SnippetId) -> ModelResult<Snippet> {
        let now = Utc::now();
        lock(&self.rows)?
            .iter()
            .find(|s| s.id == id && s.is_visible_at(now))
            .cloned()
            .ok_or_else(|| DomainError::NoRecord.into())
    }

    fn insert(&self, title: &str, content: &str, expires_days: u32) -> ModelResult<SnippetId> {
        let mut rows = lock(&self.rows)?;
        let id = rows.last().map_or(1, |s| s.id + 1);
        let created = Utc::now();
        rows.push(Snippet {
            id,
            title: title.to_string(),
            content: content.to_string(),
            created,
            expires: created + Duration::days(i64::from(expires_days)),
        });
        Ok(id)
    }

    fn latest(&self) -> ModelResult<Vec<Snippet>> {
        let now = Utc::now();
        let mut visible: Vec<Snippet> = lock(&self.rows)?
            .iter()
            .filter(|s| s.is_visible_at(now))
            .cloned()
            .collect();
        visible.sort_by(|a, b| b.created.cmp(&a.created).then(b.id.cmp(&a.id)));
        visible.truncate(LATEST_LIMIT);
        Ok(visible)
    }
}

struct MemoryAccount {
    user: User,
    password: String,
}

#[derive(Default)]
pub struct MemoryUserModel {
    accounts: Mutex<Vec<MemoryAccount>>,
}

impl MemoryUserModel {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UserModel for MemoryUserModel {
    fn insert(&self, name: &str, email: &str, password: &str) -> ModelResult<()> {
        let email = normalize_email(email);
        let mut accounts = lock(&self.accounts)?;
        if accounts.iter().any(|a| a.user.email == email) {
            return Err(DomainError::DuplicateEmail.into());
        }
        let id = accounts.last().map_or(1, |a| a.user.id + 1);
        accounts.push(MemoryAccount {
            user: User {
                id,
                name: name.to_string(),
                email,
                created: Utc::now(),
            },
            password: password.to_string(),
        });
        Ok(())
    }

    fn authenticate(&self, email: &str, password: &str) -> ModelResult<UserId> {
        let email = normalize_email(email);
        lock(&self.accounts)?
            .iter()
            .find(|a| a.user.email == email && a.password == password)
            .map(|a| a.user.id)
            .ok_or_else(|| DomainError::InvalidCredentials.into())
    }

    fn get(&self, id: UserId) -> ModelResult<User> {
        lock(&self.accounts)?
            .iter()
            .find(|a| a.user.id == id)
            .map(|a| a.user.clone())
            .ok_or_else(|| DomainError::NoRecord.into())
    }
}

#[derive(Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<String, (Vec<u8>, DateTime<Utc>)>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionStore for MemorySessionStore {
    fn find(&self, digest: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let now = Utc::now();
        Ok(lock(&self.sessions)?
            .get(digest)
            .filter(|(_, expiry)| *expiry > now)
            .map(|(data, _)| data.clone()))
    }

    fn commit(&self, digest: &str, data: &[u8], expiry: DateTime<Utc>) -> Result<(), StoreError> {
        lock(&self.sessions)?.insert(digest.to_string(), (data.to_vec(), expiry));
        Ok(())
    }

    fn delete(&self, digest: &str) -> Result<(), StoreError> {
        lock(&self.sessions)?.remove(digest);
        Ok(())
    }

    fn delete_expired(&self) -> Result<usize, StoreError> {
        let now = Utc::now();
        let mut sessions = lock(&self.sessions)?;
        let before = sessions.len();
        sessions.retain(|_, (_, expiry)| *expiry > now);
        Ok(before - sessions.len())
    }
}

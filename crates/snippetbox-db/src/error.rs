//! Error vocabulary of the models.
//!
//! Two layers: the closed set of [`DomainError`]s a handler dispatches on,
//! and [`StoreError`] for everything the store itself reports. Models never
//! retry and never reinterpret a store failure.

use snippetbox_crypto::PasswordError;
use thiserror::Error;

/// Semantic failures the models distinguish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum DomainError {
    /// Zero rows where at most one was expected. Also covers expired
    /// snippets, which behave as if absent.
    #[error("no matching record found")]
    NoRecord,

    /// Unknown email or wrong password; callers cannot tell which.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("duplicate email")]
    DuplicateEmail,
}

/// Transport-level failures, surfaced verbatim.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("store handle is closed")]
    Closed,

    #[error("connection lock poisoned")]
    Poisoned,

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error("corrupt row: {0}")]
    Corrupt(String),
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type ModelResult<T> = std::result::Result<T, ModelError>;

impl ModelError {
    /// The domain kind, if this is one. Transport errors yield `None`.
    pub fn domain(&self) -> Option<DomainError> {
        match self {
            Self::Domain(kind) => Some(*kind),
            Self::Store(_) => None,
        }
    }
}

impl PartialEq<DomainError> for ModelError {
    fn eq(&self, other: &DomainError) -> bool {
        self.domain() == Some(*other)
    }
}

impl From<rusqlite::Error> for ModelError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Store(StoreError::Sqlite(e))
    }
}

impl From<PasswordError> for ModelError {
    fn from(e: PasswordError) -> Self {
        Self::Store(StoreError::Password(e))
    }
}

/// Whether `err` is a UNIQUE violation on `table.column`.
pub(crate) fn is_unique_violation(err: &rusqlite::Error, column: &str) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, Some(msg)) => {
            e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE && msg.contains(column)
        }
        _ => false,
    }
}

use std::sync::Arc;

use rusqlite::OptionalExtension;
use snippetbox_crypto::{PasswordHasher, PasswordParams};
use snippetbox_types::{User, UserId};
use tracing::debug;

use crate::clock::column_utc;
use crate::error::{DomainError, ModelResult, StoreError, is_unique_violation};
use crate::Database;

/// Operations over the `users` relation.
///
/// Emails compare case-insensitively; they are lowercased before every
/// write and lookup. The password verifier is only ever read by
/// [`UserModel::authenticate`].
pub trait UserModel: Send + Sync {
    /// Create an account. [`DomainError::DuplicateEmail`] if the email is
    /// taken, reported only after the verifier has been derived.
    fn insert(&self, name: &str, email: &str, password: &str) -> ModelResult<()>;

    /// The account id for matching credentials, otherwise
    /// [`DomainError::InvalidCredentials`] whether the email is unknown or
    /// the password is wrong.
    fn authenticate(&self, email: &str, password: &str) -> ModelResult<UserId>;

    /// Profile lookup, or [`DomainError::NoRecord`].
    fn get(&self, id: UserId) -> ModelResult<User>;
}

const INSERT_SQL: &str = concat!(
    "INSERT INTO users (name, email, hashed_password, created)
     VALUES (?1, ?2, ?3, ",
    store_now!(),
    ")"
);

const CREDENTIALS_SQL: &str = "SELECT id, hashed_password FROM users WHERE email = ?1";

const GET_SQL: &str = "SELECT id, name, email, created FROM users WHERE id = ?1";

/// [`UserModel`] backed by the shared SQLite store.
pub struct SqliteUserModel {
    db: Arc<Database>,
    hasher: PasswordHasher,
}

impl SqliteUserModel {
    pub fn new(db: Arc<Database>, params: PasswordParams) -> Result<Self, StoreError> {
        Ok(Self {
            db,
            hasher: PasswordHasher::new(params)?,
        })
    }
}

impl UserModel for SqliteUserModel {
    fn insert(&self, name: &str, email: &str, password: &str) -> ModelResult<()> {
        let email = normalize_email(email);
        // Derived before the insert so a duplicate costs the same as a success.
        let verifier = self.hasher.hash(password)?;

        self.db.with_conn_mut(|conn| -> ModelResult<()> {
            match conn.execute(INSERT_SQL, rusqlite::params![name, email, verifier.as_bytes()]) {
                Ok(_) => Ok(()),
                Err(e) if is_unique_violation(&e, "users.email") => {
                    Err(DomainError::DuplicateEmail.into())
                }
                Err(e) => Err(e.into()),
            }
        })?;

        debug!("Created user account for {}", email);
        Ok(())
    }

    fn authenticate(&self, email: &str, password: &str) -> ModelResult<UserId> {
        let email = normalize_email(email);

        // Release the connection before the (deliberately slow) verification.
        let credentials: Option<(UserId, Vec<u8>)> = self.db.with_conn(|conn| {
            conn.prepare_cached(CREDENTIALS_SQL)?
                .query_row([&email], |row| Ok((row.get(0)?, row.get(1)?)))
                .optional()
                .map_err(crate::ModelError::from)
        })?;

        let Some((id, verifier)) = credentials else {
            self.hasher.verify_dummy(password);
            return Err(DomainError::InvalidCredentials.into());
        };

        let verifier = String::from_utf8(verifier)
            .map_err(|_| StoreError::Corrupt(format!("verifier of user {} is not UTF-8", id)))?;

        if self.hasher.verify(password, &verifier)? {
            Ok(id)
        } else {
            Err(DomainError::InvalidCredentials.into())
        }
    }

    fn get(&self, id: UserId) -> ModelResult<User> {
        self.db.with_conn(|conn| {
            conn.prepare_cached(GET_SQL)?
                .query_row([id], |row| {
                    Ok(User {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        email: row.get(2)?,
                        created: column_utc(row, 3)?,
                    })
                })
                .optional()?
                .ok_or_else(|| DomainError::NoRecord.into())
        })
    }
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.to_lowercase()
}

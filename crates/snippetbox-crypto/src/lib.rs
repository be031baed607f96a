/// Snippetbox Crypto Library
///
/// Password verifiers (Argon2id with a per-record salt) and the digest under
/// which session ids are persisted. Nothing in here touches the store.

pub mod password;
pub mod token;

pub use password::{PasswordError, PasswordHasher, PasswordParams};

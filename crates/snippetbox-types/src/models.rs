use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type SnippetId = i64;
pub type UserId = i64;

/// A short text post with a server-assigned lifetime.
///
/// Snippets are never mutated after insert. Once `expires` has passed the
/// store stops returning them, so a `Snippet` in hand was visible at the
/// moment it was read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snippet {
    pub id: SnippetId,
    pub title: String,
    pub content: String,
    pub created: DateTime<Utc>,
    pub expires: DateTime<Utc>,
}

impl Snippet {
    /// Whether the snippet is still visible at `now`.
    pub fn is_visible_at(&self, now: DateTime<Utc>) -> bool {
        self.expires > now
    }
}

/// Profile view of an account. The password verifier never leaves the
/// user model, so it has no field here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub created: DateTime<Utc>,
}

//! Values shared between the store layer and the handler layer.
//!
//! Everything here is plain owned data: nothing holds a reference back to
//! the store, so a value can outlive the request that fetched it.

pub mod forms;
pub mod models;

pub use models::{Snippet, SnippetId, User, UserId};

//! Decoded `application/x-www-form-urlencoded` bodies.
//!
//! These are raw user input. Field validation lives in the handler layer so
//! a rejected form can be re-rendered with what the user typed.

use serde::Deserialize;

#[derive(Debug, Default, Clone, Deserialize)]
pub struct SnippetCreateForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    /// Lifetime in days. Kept as text so a tampered value re-renders the
    /// form instead of failing extraction.
    #[serde(default)]
    pub expires: String,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct UserSignupForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct UserLoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

//! User domain entity and related types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User domain entity.
///
/// Serialized as-is into the cache, so every field (including the password
/// hash) must round-trip through JSON unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: Option<String>,
    /// Argon2 PHC string, never plaintext
    pub password: Option<String>,
    pub created_at: DateTime<Utc>,
    /// None until the first update
    pub updated_at: Option<DateTime<Utc>>,
}

impl User {
    /// Username or an empty string when unset.
    pub fn username_or_default(&self) -> &str {
        self.username.as_deref().unwrap_or_default()
    }
}

/// User creation data transfer object
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateUser {
    pub username: Option<String>,
    /// Plaintext, hashed before it reaches the store
    pub password: Option<String>,
}

impl CreateUser {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            password: Some(password.into()),
        }
    }
}

/// User update data transfer object.
///
/// Only the fields that are `Some` are written.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateUser {
    pub id: i64,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl UpdateUser {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            username: None,
            password: None,
        }
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }
}

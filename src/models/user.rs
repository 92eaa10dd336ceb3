//! Account records and the session a logged-in user carries in state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::UserId;
use super::ModelError;

/// Stored account. `password_hash` is a PHC-format Argon2 string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub password_hash: String,
    #[serde(default)]
    pub tokens: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(username: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            id: UserId::new(),
            username: normalize_username(&username.into()),
            password_hash: password_hash.into(),
            tokens: Vec::new(),
            created_at: Utc::now(),
        }
    }
}

/// The `user` slice of application state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSession {
    pub user_id: UserId,
    pub username: String,
    pub token: String,
}

/// Usernames compare case-insensitively
pub fn normalize_username(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// 3 to 32 characters: letters, digits, `.`, `_`, `-`
pub fn validate_username(raw: &str) -> Result<(), ModelError> {
    let name = normalize_username(raw);
    if name.is_empty() {
        return Err(ModelError::Empty("Username"));
    }
    if name.chars().count() > 32 {
        return Err(ModelError::TooLong("Username"));
    }
    if name.chars().count() < 3 {
        return Err(ModelError::TooShort("Username", 3));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    {
        return Err(ModelError::Invalid("Username"));
    }
    Ok(())
}

pub fn validate_password(raw: &str) -> Result<(), ModelError> {
    if raw.is_empty() {
        return Err(ModelError::Empty("Password"));
    }
    if raw.chars().count() < 8 {
        return Err(ModelError::TooShort("Password", 8));
    }
    Ok(())
}

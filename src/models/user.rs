use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::validation::{FieldErrors, MAX_NAME_LENGTH};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// The authenticated identity a request acts as. Resolved once by the auth
/// middleware and passed explicitly into every service call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: i64,
    pub email: String,
}

impl From<&User> for Principal {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            email: user.email.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub email: String,
    pub name: String,
}

impl NewUser {
    pub fn new(email: &str, name: Option<&str>) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::new();

        let email = match normalize_email(email) {
            Some(email) => email,
            None => {
                errors.add("email", "Enter a valid email address.");
                String::new()
            }
        };

        let name = name.map(str::trim).unwrap_or_default().to_string();
        if name.chars().count() > MAX_NAME_LENGTH {
            errors.add("name", format!("Ensure this field has no more than {} characters.", MAX_NAME_LENGTH));
        }

        errors.finish(|| Self { email, name })
    }
}

/// Lowercases the domain part; the local part is kept as typed
pub fn normalize_email(email: &str) -> Option<String> {
    let email = email.trim();
    let (local, domain) = email.rsplit_once('@')?;
    if local.is_empty() || domain.is_empty() || !domain.contains('.') || email.contains(char::is_whitespace) {
        return None;
    }
    Some(format!("{}@{}", local, domain.to_ascii_lowercase()))
}

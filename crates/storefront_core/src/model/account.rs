//! User account domain model.
//!
//! # Responsibility
//! - Define the account record persisted in `users`.
//! - Own the field-level rules checked before an account is created.
//!
//! # Invariants
//! - `id == 0` until the row is persisted.
//! - `password` holds plaintext only between intake and the hashing step.
//! - `version` starts at 1 and only grows.

use crate::model::validation::{validate_email, ValidationError, ValidationResult};
use serde::{Deserialize, Serialize};

/// Generated row identifier for users, addresses, contacts and categories.
pub type EntityId = i64;

pub const USERNAME_MIN_CHARS: usize = 3;
pub const USERNAME_MAX_CHARS: usize = 50;
pub const EMAIL_MAX_CHARS: usize = 100;
pub const PASSWORD_MIN_CHARS: usize = 8;

fn default_active() -> bool {
    true
}

fn default_version() -> i64 {
    1
}

/// Store customer account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    #[serde(default)]
    pub id: EntityId,
    pub username: String,
    pub email: String,
    /// Plaintext on intake, hash after `SecretHasher::hash`. Never serialized.
    #[serde(default, skip_serializing)]
    pub password: String,
    #[serde(default = "default_active")]
    pub active: bool,
    /// Optimistic concurrency counter.
    #[serde(default = "default_version")]
    pub version: i64,
    /// Epoch milliseconds, assigned by storage.
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

impl Account {
    /// Creates an unsaved, active account.
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
            username: username.into(),
            email: email.into(),
            password: password.into(),
            active: true,
            version: default_version(),
            created_at: 0,
            updated_at: 0,
        }
    }

    /// Validates username, email and plaintext password rules.
    ///
    /// Must run before hashing; a hash always satisfies the length rule and
    /// would mask a weak password.
    pub fn validate(&self) -> ValidationResult {
        let username_chars = self.username.trim().chars().count();
        if !(USERNAME_MIN_CHARS..=USERNAME_MAX_CHARS).contains(&username_chars) {
            return Err(ValidationError::UsernameLength {
                min: USERNAME_MIN_CHARS,
                max: USERNAME_MAX_CHARS,
            });
        }

        validate_email(&self.email, EMAIL_MAX_CHARS)?;
        validate_password(&self.password)
    }

    pub fn is_persisted(&self) -> bool {
        self.id > 0
    }
}

/// Checks password presence, minimum length and character-class mix.
pub fn validate_password(password: &str) -> ValidationResult {
    if password.is_empty() {
        return Err(ValidationError::PasswordRequired);
    }
    if password.chars().count() < PASSWORD_MIN_CHARS {
        return Err(ValidationError::PasswordTooShort {
            min: PASSWORD_MIN_CHARS,
        });
    }

    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !(has_upper && has_lower && has_digit) {
        return Err(ValidationError::PasswordComplexity);
    }

    Ok(())
}

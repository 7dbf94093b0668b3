//! Structural validation rules shared by all store entities.
//!
//! # Responsibility
//! - Describe every field-level rule violation with a stable message.
//! - Provide the small field checks reused by entity validators.
//!
//! # Invariants
//! - Validators are pure and return the first violated rule only.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$").expect("valid email regex")
});

/// First rule violated by an entity or aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    AccountRequired,
    AddressRequired,
    ContactRequired,
    CategoriesRequired,
    UsernameLength { min: usize, max: usize },
    EmailRequired,
    EmailTooLong { max: usize },
    EmailFormat,
    PasswordRequired,
    PasswordTooShort { min: usize },
    PasswordComplexity,
    /// Required text field is missing or blank.
    MissingField(&'static str),
    FieldTooLong { field: &'static str, max: usize },
    /// Identifier or reference must be a positive integer.
    NonPositive(&'static str),
    /// Numeric field must not be negative.
    Negative(&'static str),
    ContactChannelRequired,
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AccountRequired => write!(f, "account is required"),
            Self::AddressRequired => write!(f, "address is required"),
            Self::ContactRequired => write!(f, "contact is required"),
            Self::CategoriesRequired => write!(f, "at least one category is required"),
            Self::UsernameLength { min, max } => {
                write!(f, "username must be between {min} and {max} characters")
            }
            Self::EmailRequired => write!(f, "email is required"),
            Self::EmailTooLong { max } => write!(f, "email must be at most {max} characters"),
            Self::EmailFormat => write!(f, "email format is invalid"),
            Self::PasswordRequired => write!(f, "password is required"),
            Self::PasswordTooShort { min } => {
                write!(f, "password must be at least {min} characters")
            }
            Self::PasswordComplexity => write!(
                f,
                "password must contain an uppercase letter, a lowercase letter and a digit"
            ),
            Self::MissingField(field) => write!(f, "{field} is required"),
            Self::FieldTooLong { field, max } => {
                write!(f, "{field} must be at most {max} characters")
            }
            Self::NonPositive(field) => write!(f, "{field} must be a positive integer"),
            Self::Negative(field) => write!(f, "{field} must not be negative"),
            Self::ContactChannelRequired => write!(f, "phone or email is required"),
        }
    }
}

impl Error for ValidationError {}

pub type ValidationResult = Result<(), ValidationError>;

/// Checks a required text field against a maximum length in characters.
pub(crate) fn require_text(
    field: &'static str,
    value: &str,
    max_chars: usize,
) -> ValidationResult {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    if trimmed.chars().count() > max_chars {
        return Err(ValidationError::FieldTooLong {
            field,
            max: max_chars,
        });
    }
    Ok(())
}

/// Checks an optional text field against a maximum length in characters.
pub(crate) fn optional_text(
    field: &'static str,
    value: Option<&str>,
    max_chars: usize,
) -> ValidationResult {
    match value {
        Some(value) if value.chars().count() > max_chars => Err(ValidationError::FieldTooLong {
            field,
            max: max_chars,
        }),
        _ => Ok(()),
    }
}

pub(crate) fn require_positive(field: &'static str, value: i64) -> ValidationResult {
    if value <= 0 {
        return Err(ValidationError::NonPositive(field));
    }
    Ok(())
}

/// Checks that an owner reference is set and positive.
pub(crate) fn require_owner(value: Option<i64>) -> ValidationResult {
    match value {
        Some(id) => require_positive("user_id", id),
        None => Err(ValidationError::MissingField("user_id")),
    }
}

/// Validates email presence, length and `local@domain.tld` shape.
pub fn validate_email(value: &str, max_chars: usize) -> ValidationResult {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmailRequired);
    }
    if trimmed.chars().count() > max_chars {
        return Err(ValidationError::EmailTooLong { max: max_chars });
    }
    if !EMAIL_RE.is_match(trimmed) {
        return Err(ValidationError::EmailFormat);
    }
    Ok(())
}

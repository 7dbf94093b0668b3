//! Catalog categories and account-to-category memberships.

use crate::model::account::EntityId;
use crate::model::validation::{optional_text, require_positive, require_text, ValidationResult};
use serde::{Deserialize, Serialize};

const CATEGORY_NAME_MAX_CHARS: usize = 100;
const CATEGORY_DESCRIPTION_MAX_CHARS: usize = 500;

/// Product/customer category persisted in `categories`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    #[serde(default)]
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created_at: i64,
}

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            description: None,
            created_at: 0,
        }
    }

    pub fn validate(&self) -> ValidationResult {
        require_text("name", &self.name, CATEGORY_NAME_MAX_CHARS)?;
        optional_text(
            "description",
            self.description.as_deref(),
            CATEGORY_DESCRIPTION_MAX_CHARS,
        )
    }
}

/// Link between an account and a category (`user_categories`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryMembership {
    pub user_id: EntityId,
    pub category_id: EntityId,
    #[serde(default)]
    pub created_at: i64,
}

impl CategoryMembership {
    pub fn new(user_id: EntityId, category_id: EntityId) -> Self {
        Self {
            user_id,
            category_id,
            created_at: 0,
        }
    }

    /// Both sides of the link must be positive identifiers.
    pub fn validate(&self) -> ValidationResult {
        require_positive("user_id", self.user_id)?;
        require_positive("category_id", self.category_id)
    }
}

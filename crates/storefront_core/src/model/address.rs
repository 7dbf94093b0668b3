//! Postal address owned by an account.

use crate::model::account::EntityId;
use crate::model::validation::{optional_text, require_owner, require_text, ValidationResult};
use serde::{Deserialize, Serialize};

const ADDRESS_FIELD_MAX_CHARS: usize = 255;
const POSTAL_CODE_MAX_CHARS: usize = 20;

/// Shipping/billing address persisted in `addresses`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub id: EntityId,
    /// Owning account; unknown until the account row exists.
    #[serde(default)]
    pub user_id: Option<EntityId>,
    pub street: String,
    pub city: String,
    #[serde(default)]
    pub state: Option<String>,
    pub postal_code: String,
    pub country: String,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

impl Address {
    /// Creates an unsaved address without an owner.
    pub fn new(
        street: impl Into<String>,
        city: impl Into<String>,
        postal_code: impl Into<String>,
        country: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
            user_id: None,
            street: street.into(),
            city: city.into(),
            state: None,
            postal_code: postal_code.into(),
            country: country.into(),
            created_at: 0,
            updated_at: 0,
        }
    }

    /// Validates the owner reference and required postal fields.
    pub fn validate(&self) -> ValidationResult {
        require_owner(self.user_id)?;
        require_text("street", &self.street, ADDRESS_FIELD_MAX_CHARS)?;
        require_text("city", &self.city, ADDRESS_FIELD_MAX_CHARS)?;
        optional_text("state", self.state.as_deref(), ADDRESS_FIELD_MAX_CHARS)?;
        require_text("postal_code", &self.postal_code, POSTAL_CODE_MAX_CHARS)?;
        require_text("country", &self.country, ADDRESS_FIELD_MAX_CHARS)
    }
}

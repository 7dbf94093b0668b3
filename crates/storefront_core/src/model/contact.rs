//! Contact details owned by an account.

use crate::model::account::{EntityId, EMAIL_MAX_CHARS};
use crate::model::validation::{
    optional_text, require_owner, require_text, validate_email, ValidationError,
    ValidationResult,
};
use serde::{Deserialize, Serialize};

const CONTACT_NAME_MAX_CHARS: usize = 100;
const PHONE_MAX_CHARS: usize = 30;

/// Contact record persisted in `contacts`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    #[serde(default)]
    pub id: EntityId,
    #[serde(default)]
    pub user_id: Option<EntityId>,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

impl ContactInfo {
    /// Creates an unsaved contact without an owner or channels.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: 0,
            user_id: None,
            name: name.into(),
            phone: None,
            email: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Validates owner, name and that at least one channel is reachable.
    pub fn validate(&self) -> ValidationResult {
        require_owner(self.user_id)?;
        require_text("name", &self.name, CONTACT_NAME_MAX_CHARS)?;
        optional_text("phone", self.phone.as_deref(), PHONE_MAX_CHARS)?;

        let phone = self.phone.as_deref().map(str::trim).unwrap_or("");
        let email = self.email.as_deref().map(str::trim).unwrap_or("");
        if phone.is_empty() && email.is_empty() {
            return Err(ValidationError::ContactChannelRequired);
        }
        if !email.is_empty() {
            validate_email(email, EMAIL_MAX_CHARS)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::ContactInfo;
    use crate::model::validation::ValidationError;

    #[test]
    fn contact_needs_a_channel() {
        let mut contact = ContactInfo::new("Alice");
        contact.user_id = Some(1);
        assert_eq!(
            contact.validate(),
            Err(ValidationError::ContactChannelRequired)
        );

        let contact = contact.with_phone("+1 555 0100");
        assert!(contact.validate().is_ok());
    }

    #[test]
    fn contact_email_must_be_well_formed() {
        let mut contact = ContactInfo::new("Alice").with_email("nope");
        contact.user_id = Some(1);
        assert_eq!(contact.validate(), Err(ValidationError::EmailFormat));
    }
}

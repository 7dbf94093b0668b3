//! Account registration aggregate.
//!
//! # Responsibility
//! - Describe the inbound "create everything" request and its composed result.
//! - Check aggregate completeness before any I/O.
//!
//! # Invariants
//! - A request is complete only with account, address, contact and at least
//!   one category id.
//! - The aggregate is a transient unit of work; it is never stored as a whole.

use crate::model::account::{Account, EntityId};
use crate::model::address::Address;
use crate::model::contact::ContactInfo;
use crate::model::validation::{ValidationError, ValidationResult};
use serde::{Deserialize, Serialize};

/// Inbound registration request.
///
/// Parts are optional so an incomplete request surfaces as a validation
/// error instead of a decode failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateFullRequest {
    #[serde(default)]
    pub account: Option<Account>,
    #[serde(default)]
    pub address: Option<Address>,
    #[serde(default)]
    pub contact: Option<ContactInfo>,
    /// Requested category memberships, in creation order.
    #[serde(default)]
    pub category_ids: Vec<EntityId>,
}

impl CreateFullRequest {
    pub fn new(
        account: Account,
        address: Address,
        contact: ContactInfo,
        category_ids: Vec<EntityId>,
    ) -> Self {
        Self {
            account: Some(account),
            address: Some(address),
            contact: Some(contact),
            category_ids,
        }
    }
}

/// Persisted registration result with generated identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAggregate {
    pub account: Account,
    pub address: Address,
    pub contact: ContactInfo,
    pub category_ids: Vec<EntityId>,
}

/// Checks completeness in order, then the account field rules.
///
/// Address and contact field rules are not checked here: their owner
/// reference is only known after the account row exists.
pub fn validate_aggregate(request: &CreateFullRequest) -> ValidationResult {
    let account = request
        .account
        .as_ref()
        .ok_or(ValidationError::AccountRequired)?;
    if request.address.is_none() {
        return Err(ValidationError::AddressRequired);
    }
    if request.contact.is_none() {
        return Err(ValidationError::ContactRequired);
    }
    if request.category_ids.is_empty() {
        return Err(ValidationError::CategoriesRequired);
    }
    account.validate()
}

#[cfg(test)]
mod tests {
    use super::{validate_aggregate, CreateFullRequest};
    use crate::model::account::Account;
    use crate::model::address::Address;
    use crate::model::contact::ContactInfo;
    use crate::model::validation::ValidationError;

    fn complete_request() -> CreateFullRequest {
        CreateFullRequest::new(
            Account::new("alice", "a@x.com", "Secret123!"),
            Address::new("1 Main St", "Springfield", "12345", "US"),
            ContactInfo::new("Alice").with_phone("555-0100"),
            vec![1],
        )
    }

    #[test]
    fn complete_request_is_valid() {
        assert!(validate_aggregate(&complete_request()).is_ok());
    }

    #[test]
    fn missing_parts_are_reported_in_order() {
        let mut request = complete_request();
        request.account = None;
        request.address = None;
        assert_eq!(
            validate_aggregate(&request),
            Err(ValidationError::AccountRequired)
        );

        let mut request = complete_request();
        request.address = None;
        request.contact = None;
        assert_eq!(
            validate_aggregate(&request),
            Err(ValidationError::AddressRequired)
        );

        let mut request = complete_request();
        request.contact = None;
        assert_eq!(
            validate_aggregate(&request),
            Err(ValidationError::ContactRequired)
        );

        let mut request = complete_request();
        request.category_ids.clear();
        assert_eq!(
            validate_aggregate(&request),
            Err(ValidationError::CategoriesRequired)
        );
    }

    #[test]
    fn account_rules_run_after_completeness() {
        let mut request = complete_request();
        if let Some(account) = request.account.as_mut() {
            account.password = "weak".to_string();
        }
        assert_eq!(
            validate_aggregate(&request),
            Err(ValidationError::PasswordTooShort { min: 8 })
        );
    }

    #[test]
    fn request_decodes_with_optional_parts_missing() {
        let request: CreateFullRequest =
            serde_json::from_str(r#"{"category_ids":[2,3]}"#).unwrap();
        assert!(request.account.is_none());
        assert_eq!(request.category_ids, vec![2, 3]);
        assert_eq!(
            validate_aggregate(&request),
            Err(ValidationError::AccountRequired)
        );
    }
}

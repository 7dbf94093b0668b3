//! Catalog product model.
//!
//! # Invariants
//! - `price_cents` and `stock` are never negative.
//! - Every successful update, enable or disable bumps `version` by one.

use crate::model::account::EntityId;
use crate::model::validation::{optional_text, require_text, ValidationError, ValidationResult};
use serde::{Deserialize, Serialize};

const PRODUCT_NAME_MAX_CHARS: usize = 200;
const PRODUCT_DESCRIPTION_MAX_CHARS: usize = 2000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    #[serde(default)]
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Price in minor currency units.
    pub price_cents: i64,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub category_id: Option<EntityId>,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub version: i64,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

impl Product {
    /// Creates an unsaved, active product with no stock.
    pub fn new(name: impl Into<String>, price_cents: i64) -> Self {
        Self {
            id: 0,
            name: name.into(),
            description: None,
            price_cents,
            stock: 0,
            category_id: None,
            active: true,
            version: 1,
            created_at: 0,
            updated_at: 0,
        }
    }

    pub fn validate(&self) -> ValidationResult {
        require_text("name", &self.name, PRODUCT_NAME_MAX_CHARS)?;
        optional_text(
            "description",
            self.description.as_deref(),
            PRODUCT_DESCRIPTION_MAX_CHARS,
        )?;
        if self.price_cents < 0 {
            return Err(ValidationError::Negative("price_cents"));
        }
        if self.stock < 0 {
            return Err(ValidationError::Negative("stock"));
        }
        if let Some(category_id) = self.category_id {
            if category_id <= 0 {
                return Err(ValidationError::NonPositive("category_id"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::Product;
    use crate::model::validation::ValidationError;

    #[test]
    fn negative_price_is_rejected() {
        let product = Product::new("Mug", -1);
        assert_eq!(
            product.validate(),
            Err(ValidationError::Negative("price_cents"))
        );
    }
}

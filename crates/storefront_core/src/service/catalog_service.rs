//! Catalog use-case service.
//!
//! # Responsibility
//! - Provide stable product/category entry points for core callers.
//! - Delegate persistence to repository implementations.
//!
//! # Invariants
//! - Product mutations always carry the caller's last seen `version`.
//! - Service layer remains storage-agnostic.

use crate::model::account::EntityId;
use crate::model::category::Category;
use crate::model::product::Product;
use crate::repo::category_repo::CategoryRepository;
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::product_repo::{ProductListQuery, ProductRepository};
use log::info;

pub struct CatalogService<P: ProductRepository, C: CategoryRepository> {
    products: P,
    categories: C,
}

impl<P: ProductRepository, C: CategoryRepository> CatalogService<P, C> {
    pub fn new(products: P, categories: C) -> Self {
        Self {
            products,
            categories,
        }
    }

    /// Creates a product, checking its category exists first.
    pub fn create_product(&self, product: &Product) -> RepoResult<Product> {
        if let Some(category_id) = product.category_id {
            self.require_category(category_id)?;
        }
        let created = self.products.create_product(product)?;
        info!(
            "event=product_create module=service status=ok product_id={}",
            created.id
        );
        Ok(created)
    }

    pub fn get_product(&self, id: EntityId) -> RepoResult<Option<Product>> {
        self.products.get_product(id)
    }

    pub fn list_products(&self, query: &ProductListQuery) -> RepoResult<Vec<Product>> {
        self.products.list_products(query)
    }

    /// Updates a product when `product.version` is still current.
    ///
    /// Returns `VersionConflict` when another writer got there first.
    pub fn update_product(&self, product: &Product) -> RepoResult<Product> {
        if let Some(category_id) = product.category_id {
            self.require_category(category_id)?;
        }
        self.products.update_product(product)
    }

    pub fn enable_product(&self, id: EntityId, expected_version: i64) -> RepoResult<Product> {
        self.products.set_active(id, expected_version, true)
    }

    pub fn disable_product(&self, id: EntityId, expected_version: i64) -> RepoResult<Product> {
        self.products.set_active(id, expected_version, false)
    }

    pub fn create_category(&self, name: &str, description: Option<&str>) -> RepoResult<Category> {
        let mut category = Category::new(name);
        category.description = description.map(str::to_string);
        self.categories.create_category(&category)
    }

    pub fn get_category(&self, id: EntityId) -> RepoResult<Option<Category>> {
        self.categories.get_category(id)
    }

    pub fn list_categories(&self) -> RepoResult<Vec<Category>> {
        self.categories.list_categories()
    }

    fn require_category(&self, id: EntityId) -> RepoResult<Category> {
        self.categories
            .get_category(id)?
            .ok_or(RepoError::NotFound {
                entity: "category",
                id,
            })
    }
}

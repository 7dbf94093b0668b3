//! Product repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide product CRUD over the `products` table.
//! - Enforce optimistic concurrency on every mutation of an existing row.
//!
//! # Invariants
//! - Update, enable and disable only apply when the caller's `version`
//!   matches the stored one, and bump it by exactly one.
//! - A zero-row update is reported as `NotFound` or `VersionConflict`,
//!   never silently ignored.

use crate::model::account::EntityId;
use crate::model::product::Product;
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::user_repo::bool_to_int;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

const PRODUCTS_DEFAULT_LIMIT: u32 = 20;
const PRODUCTS_LIMIT_MAX: u32 = 100;

const PRODUCT_SELECT_SQL: &str = "SELECT
    id,
    name,
    description,
    price_cents,
    stock,
    category_id,
    active,
    version,
    created_at,
    updated_at
FROM products";

/// Query options for listing products.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductListQuery {
    pub active_only: bool,
    pub category_id: Option<EntityId>,
    /// Defaults to 20 and clamps to 100.
    pub limit: Option<u32>,
    pub offset: u32,
}

pub trait ProductRepository {
    fn create_product(&self, product: &Product) -> RepoResult<Product>;
    fn get_product(&self, id: EntityId) -> RepoResult<Option<Product>>;
    fn list_products(&self, query: &ProductListQuery) -> RepoResult<Vec<Product>>;
    /// Replaces mutable fields when `product.version` is current.
    fn update_product(&self, product: &Product) -> RepoResult<Product>;
    fn set_active(&self, id: EntityId, expected_version: i64, active: bool) -> RepoResult<Product>;
}

pub struct SqliteProductRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteProductRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn require_product(&self, id: EntityId) -> RepoResult<Product> {
        self.get_product(id)?.ok_or(RepoError::NotFound {
            entity: "product",
            id,
        })
    }

    /// Distinguishes a missing row from a stale version after a zero-row update.
    fn stale_or_missing(&self, id: EntityId, expected_version: i64) -> RepoError {
        match self.get_product(id) {
            Ok(Some(_)) => RepoError::VersionConflict {
                entity: "product",
                id,
                expected_version,
            },
            Ok(None) => RepoError::NotFound {
                entity: "product",
                id,
            },
            Err(err) => err,
        }
    }
}

impl ProductRepository for SqliteProductRepository<'_> {
    fn create_product(&self, product: &Product) -> RepoResult<Product> {
        product.validate()?;

        let id: EntityId = self.conn.query_row(
            "INSERT INTO products (name, description, price_cents, stock, category_id, active)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             RETURNING id;",
            params![
                product.name.trim(),
                product.description.as_deref(),
                product.price_cents,
                product.stock,
                product.category_id,
                bool_to_int(product.active),
            ],
            |row| row.get(0),
        )?;

        self.require_product(id)
    }

    fn get_product(&self, id: EntityId) -> RepoResult<Option<Product>> {
        let product = self
            .conn
            .query_row(
                &format!("{PRODUCT_SELECT_SQL} WHERE id = ?1;"),
                [id],
                parse_product_row,
            )
            .optional()?;
        Ok(product)
    }

    fn list_products(&self, query: &ProductListQuery) -> RepoResult<Vec<Product>> {
        let mut sql = format!("{PRODUCT_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if query.active_only {
            sql.push_str(" AND active = 1");
        }
        if let Some(category_id) = query.category_id {
            sql.push_str(" AND category_id = ?");
            bind_values.push(Value::Integer(category_id));
        }

        sql.push_str(" ORDER BY id ASC LIMIT ?");
        bind_values.push(Value::Integer(i64::from(normalize_product_limit(
            query.limit,
        ))));
        if query.offset > 0 {
            sql.push_str(" OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_product_row(row)?);
        }
        Ok(items)
    }

    fn update_product(&self, product: &Product) -> RepoResult<Product> {
        product.validate()?;

        let changed = self.conn.execute(
            "UPDATE products
             SET
                name = ?3,
                description = ?4,
                price_cents = ?5,
                stock = ?6,
                category_id = ?7,
                version = version + 1,
                updated_at = (CAST((julianday('now') - 2440587.5) * 86400000 AS INTEGER))
             WHERE id = ?1
               AND version = ?2;",
            params![
                product.id,
                product.version,
                product.name.trim(),
                product.description.as_deref(),
                product.price_cents,
                product.stock,
                product.category_id,
            ],
        )?;

        if changed == 0 {
            return Err(self.stale_or_missing(product.id, product.version));
        }
        self.require_product(product.id)
    }

    fn set_active(&self, id: EntityId, expected_version: i64, active: bool) -> RepoResult<Product> {
        let changed = self.conn.execute(
            "UPDATE products
             SET
                active = ?3,
                version = version + 1,
                updated_at = (CAST((julianday('now') - 2440587.5) * 86400000 AS INTEGER))
             WHERE id = ?1
               AND version = ?2;",
            params![id, expected_version, bool_to_int(active)],
        )?;

        if changed == 0 {
            return Err(self.stale_or_missing(id, expected_version));
        }
        self.require_product(id)
    }
}

/// Normalizes list limit according to the product listing contract.
pub fn normalize_product_limit(limit: Option<u32>) -> u32 {
    match limit {
        Some(0) | None => PRODUCTS_DEFAULT_LIMIT,
        Some(value) if value > PRODUCTS_LIMIT_MAX => PRODUCTS_LIMIT_MAX,
        Some(value) => value,
    }
}

fn parse_product_row(row: &Row<'_>) -> rusqlite::Result<Product> {
    Ok(Product {
        id: row.get("id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        price_cents: row.get("price_cents")?,
        stock: row.get("stock")?,
        category_id: row.get("category_id")?,
        active: row.get::<_, i64>("active")? == 1,
        version: row.get("version")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

//! Category and membership repositories with SQLite implementations.
//!
//! # Invariants
//! - Category names are unique case-insensitively.
//! - A membership row can only reference existing users and categories
//!   (enforced by foreign keys).

use crate::context::CallContext;
use crate::model::account::EntityId;
use crate::model::category::{Category, CategoryMembership};
use crate::repo::error::{ensure_active, RepoResult};
use crate::repo::store::SqliteTx;
use rusqlite::{params, Connection, OptionalExtension, Row};

/// Persists one membership within an open transaction scope.
pub trait MembershipCreator<Tx> {
    fn create_within_tx(
        &self,
        ctx: &CallContext,
        tx: &mut Tx,
        membership: CategoryMembership,
    ) -> RepoResult<CategoryMembership>;
}

pub trait CategoryRepository {
    fn create_category(&self, category: &Category) -> RepoResult<Category>;
    fn get_category(&self, id: EntityId) -> RepoResult<Option<Category>>;
    /// All categories ordered by name.
    fn list_categories(&self) -> RepoResult<Vec<Category>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteMembershipCreator;

impl MembershipCreator<SqliteTx> for SqliteMembershipCreator {
    fn create_within_tx(
        &self,
        ctx: &CallContext,
        tx: &mut SqliteTx,
        mut membership: CategoryMembership,
    ) -> RepoResult<CategoryMembership> {
        ensure_active(ctx)?;
        membership.validate()?;

        membership.created_at = tx.connection()?.query_row(
            "INSERT INTO user_categories (user_id, category_id)
             VALUES (?1, ?2)
             RETURNING created_at;",
            params![membership.user_id, membership.category_id],
            |row| row.get::<_, i64>(0),
        )?;
        Ok(membership)
    }
}

pub struct SqliteCategoryRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCategoryRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl CategoryRepository for SqliteCategoryRepository<'_> {
    fn create_category(&self, category: &Category) -> RepoResult<Category> {
        category.validate()?;

        let (id, created_at) = self.conn.query_row(
            "INSERT INTO categories (name, description)
             VALUES (?1, ?2)
             RETURNING id, created_at;",
            params![category.name.trim(), category.description.as_deref()],
            |row| Ok((row.get::<_, EntityId>(0)?, row.get::<_, i64>(1)?)),
        )?;

        Ok(Category {
            id,
            name: category.name.trim().to_string(),
            description: category.description.clone(),
            created_at,
        })
    }

    fn get_category(&self, id: EntityId) -> RepoResult<Option<Category>> {
        let category = self
            .conn
            .query_row(
                "SELECT id, name, description, created_at
                 FROM categories
                 WHERE id = ?1;",
                [id],
                parse_category_row,
            )
            .optional()?;
        Ok(category)
    }

    fn list_categories(&self) -> RepoResult<Vec<Category>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, description, created_at
             FROM categories
             ORDER BY name COLLATE NOCASE ASC, id ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_category_row(row)?);
        }
        Ok(items)
    }
}

fn parse_category_row(row: &Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get("id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        created_at: row.get("created_at")?,
    })
}

//! Contact repository contracts and SQLite implementation.

use crate::context::CallContext;
use crate::model::account::EntityId;
use crate::model::contact::ContactInfo;
use crate::repo::error::{ensure_active, RepoResult};
use crate::repo::store::SqliteTx;
use rusqlite::{params, Connection, Row};

/// Persists one contact within an open transaction scope.
pub trait ContactCreator<Tx> {
    fn create_within_tx(
        &self,
        ctx: &CallContext,
        tx: &mut Tx,
        contact: ContactInfo,
    ) -> RepoResult<ContactInfo>;
}

pub trait ContactRepository {
    fn list_for_user(&self, user_id: EntityId) -> RepoResult<Vec<ContactInfo>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteContactCreator;

impl ContactCreator<SqliteTx> for SqliteContactCreator {
    fn create_within_tx(
        &self,
        ctx: &CallContext,
        tx: &mut SqliteTx,
        mut contact: ContactInfo,
    ) -> RepoResult<ContactInfo> {
        ensure_active(ctx)?;
        contact.validate()?;

        let (id, created_at, updated_at) = tx.connection()?.query_row(
            "INSERT INTO contacts (user_id, name, phone, email)
             VALUES (?1, ?2, ?3, ?4)
             RETURNING id, created_at, updated_at;",
            params![
                contact.user_id,
                contact.name.trim(),
                contact.phone.as_deref(),
                contact.email.as_deref(),
            ],
            |row| {
                Ok((
                    row.get::<_, EntityId>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            },
        )?;

        contact.id = id;
        contact.created_at = created_at;
        contact.updated_at = updated_at;
        Ok(contact)
    }
}

pub struct SqliteContactRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteContactRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ContactRepository for SqliteContactRepository<'_> {
    fn list_for_user(&self, user_id: EntityId) -> RepoResult<Vec<ContactInfo>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, name, phone, email, created_at, updated_at
             FROM contacts
             WHERE user_id = ?1
             ORDER BY id ASC;",
        )?;
        let mut rows = stmt.query([user_id])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_contact_row(row)?);
        }
        Ok(items)
    }
}

fn parse_contact_row(row: &Row<'_>) -> rusqlite::Result<ContactInfo> {
    Ok(ContactInfo {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        name: row.get("name")?,
        phone: row.get("phone")?,
        email: row.get("email")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

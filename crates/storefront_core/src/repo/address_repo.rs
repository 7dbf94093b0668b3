//! Address repository contracts and SQLite implementation.

use crate::context::CallContext;
use crate::model::account::EntityId;
use crate::model::address::Address;
use crate::repo::error::{ensure_active, RepoResult};
use crate::repo::store::SqliteTx;
use rusqlite::{params, Connection, OptionalExtension, Row};

const ADDRESS_SELECT_SQL: &str = "SELECT
    id,
    user_id,
    street,
    city,
    state,
    postal_code,
    country,
    created_at,
    updated_at
FROM addresses";

/// Persists one address within an open transaction scope.
pub trait AddressCreator<Tx> {
    fn create_within_tx(
        &self,
        ctx: &CallContext,
        tx: &mut Tx,
        address: Address,
    ) -> RepoResult<Address>;
}

pub trait AddressRepository {
    fn get_address(&self, id: EntityId) -> RepoResult<Option<Address>>;
    fn list_for_user(&self, user_id: EntityId) -> RepoResult<Vec<Address>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteAddressCreator;

impl AddressCreator<SqliteTx> for SqliteAddressCreator {
    fn create_within_tx(
        &self,
        ctx: &CallContext,
        tx: &mut SqliteTx,
        mut address: Address,
    ) -> RepoResult<Address> {
        ensure_active(ctx)?;
        address.validate()?;

        let (id, created_at, updated_at) = tx.connection()?.query_row(
            "INSERT INTO addresses (user_id, street, city, state, postal_code, country)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             RETURNING id, created_at, updated_at;",
            params![
                address.user_id,
                address.street.as_str(),
                address.city.as_str(),
                address.state.as_deref(),
                address.postal_code.as_str(),
                address.country.as_str(),
            ],
            |row| {
                Ok((
                    row.get::<_, EntityId>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            },
        )?;

        address.id = id;
        address.created_at = created_at;
        address.updated_at = updated_at;
        Ok(address)
    }
}

pub struct SqliteAddressRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAddressRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl AddressRepository for SqliteAddressRepository<'_> {
    fn get_address(&self, id: EntityId) -> RepoResult<Option<Address>> {
        let address = self
            .conn
            .query_row(
                &format!("{ADDRESS_SELECT_SQL} WHERE id = ?1;"),
                [id],
                parse_address_row,
            )
            .optional()?;
        Ok(address)
    }

    fn list_for_user(&self, user_id: EntityId) -> RepoResult<Vec<Address>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ADDRESS_SELECT_SQL} WHERE user_id = ?1 ORDER BY id ASC;"))?;
        let mut rows = stmt.query([user_id])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_address_row(row)?);
        }
        Ok(items)
    }
}

fn parse_address_row(row: &Row<'_>) -> rusqlite::Result<Address> {
    Ok(Address {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        street: row.get("street")?,
        city: row.get("city")?,
        state: row.get("state")?,
        postal_code: row.get("postal_code")?,
        country: row.get("country")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

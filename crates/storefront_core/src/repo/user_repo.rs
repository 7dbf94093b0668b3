//! Account repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist accounts inside a caller-owned transaction scope.
//! - Provide account read paths for callers outside registration.
//!
//! # Invariants
//! - Accounts reach this layer validated and with an already hashed password;
//!   storage only adds its own constraints (unique email and username).
//! - Generated `id`, `created_at` and `updated_at` come from storage.

use crate::context::CallContext;
use crate::model::account::{Account, EntityId};
use crate::repo::error::{ensure_active, RepoResult};
use crate::repo::store::SqliteTx;
use rusqlite::{params, Connection, OptionalExtension, Row};

const USER_SELECT_SQL: &str = "SELECT
    id,
    username,
    email,
    password,
    active,
    version,
    created_at,
    updated_at
FROM users";

/// Persists one account within an open transaction scope.
pub trait AccountCreator<Tx> {
    fn create_within_tx(
        &self,
        ctx: &CallContext,
        tx: &mut Tx,
        account: Account,
    ) -> RepoResult<Account>;
}

/// Read paths for stored accounts.
pub trait UserRepository {
    fn get_user(&self, id: EntityId) -> RepoResult<Option<Account>>;
    fn find_by_email(&self, email: &str) -> RepoResult<Option<Account>>;
    /// Category ids the user belongs to, ascending.
    fn list_category_ids(&self, user_id: EntityId) -> RepoResult<Vec<EntityId>>;
}

/// Stateless SQLite account writer; the connection comes from the scope.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteAccountCreator;

impl AccountCreator<SqliteTx> for SqliteAccountCreator {
    fn create_within_tx(
        &self,
        ctx: &CallContext,
        tx: &mut SqliteTx,
        account: Account,
    ) -> RepoResult<Account> {
        ensure_active(ctx)?;
        insert_account(tx.connection()?, account)
    }
}

/// SQLite-backed account reader.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn get_user(&self, id: EntityId) -> RepoResult<Option<Account>> {
        let account = self
            .conn
            .query_row(
                &format!("{USER_SELECT_SQL} WHERE id = ?1;"),
                [id],
                parse_account_row,
            )
            .optional()?;
        Ok(account)
    }

    fn find_by_email(&self, email: &str) -> RepoResult<Option<Account>> {
        let account = self
            .conn
            .query_row(
                &format!("{USER_SELECT_SQL} WHERE email = ?1 COLLATE NOCASE;"),
                [email.trim()],
                parse_account_row,
            )
            .optional()?;
        Ok(account)
    }

    fn list_category_ids(&self, user_id: EntityId) -> RepoResult<Vec<EntityId>> {
        let mut stmt = self.conn.prepare(
            "SELECT category_id
             FROM user_categories
             WHERE user_id = ?1
             ORDER BY category_id ASC;",
        )?;
        let mut rows = stmt.query([user_id])?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            ids.push(row.get(0)?);
        }
        Ok(ids)
    }
}

fn insert_account(conn: &Connection, mut account: Account) -> RepoResult<Account> {
    let (id, version, created_at, updated_at) = conn.query_row(
        "INSERT INTO users (username, email, password, active)
         VALUES (?1, ?2, ?3, ?4)
         RETURNING id, version, created_at, updated_at;",
        params![
            account.username.trim(),
            account.email.trim(),
            account.password.as_str(),
            bool_to_int(account.active),
        ],
        |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
            ))
        },
    )?;

    account.id = id;
    account.username = account.username.trim().to_string();
    account.email = account.email.trim().to_string();
    account.version = version;
    account.created_at = created_at;
    account.updated_at = updated_at;
    Ok(account)
}

fn parse_account_row(row: &Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        id: row.get("id")?,
        username: row.get("username")?,
        email: row.get("email")?,
        password: row.get("password")?,
        active: row.get::<_, i64>("active")? == 1,
        version: row.get("version")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

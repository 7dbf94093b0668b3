//! Transaction scope contracts and the SQLite resource manager.
//!
//! # Responsibility
//! - Define how orchestrators open, commit and roll back a transaction scope.
//! - Provide the SQLite implementation with one connection per transaction.
//!
//! # Invariants
//! - A handle performs at most one successful terminal action.
//! - Rollback never checks cancellation; releasing a scope must always run.
//! - A handle dropped while still open rolls back.

use crate::context::CallContext;
use crate::db::{connect_migrated, open_db, DbResult};
use crate::repo::error::{ensure_active, RepoError, RepoResult};
use log::warn;
use rusqlite::Connection;
use std::path::{Path, PathBuf};

/// Open transaction scope.
pub trait TxHandle {
    fn commit(&mut self, ctx: &CallContext) -> RepoResult<()>;
    fn rollback(&mut self, ctx: &CallContext) -> RepoResult<()>;
}

/// Factory for transaction scopes.
pub trait ResourceManager {
    type Tx: TxHandle;

    /// Opens a new scope.
    ///
    /// `Ok(None)` means the manager reported success without producing a
    /// handle; callers treat it as a fatal, distinct condition.
    fn begin_tx(&self, ctx: &CallContext) -> RepoResult<Option<Self::Tx>>;
}

impl<M: ResourceManager + ?Sized> ResourceManager for &M {
    type Tx = M::Tx;

    fn begin_tx(&self, ctx: &CallContext) -> RepoResult<Option<Self::Tx>> {
        (**self).begin_tx(ctx)
    }
}

/// SQLite-backed resource manager bound to one database file.
///
/// Holds only the path, so one store can be shared by concurrent callers;
/// each scope gets its own connection.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    /// Opens (creating if needed) and migrates the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        let path = path.as_ref().to_path_buf();
        drop(open_db(&path)?);
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// Opens a plain connection for read paths and non-orchestrated writes.
    pub fn connect(&self) -> DbResult<Connection> {
        connect_migrated(&self.path)
    }
}

impl ResourceManager for SqliteStore {
    type Tx = SqliteTx;

    fn begin_tx(&self, ctx: &CallContext) -> RepoResult<Option<SqliteTx>> {
        ensure_active(ctx)?;
        let conn = connect_migrated(&self.path)?;
        conn.execute_batch("BEGIN IMMEDIATE;")?;
        Ok(Some(SqliteTx {
            conn,
            finished: false,
        }))
    }
}

/// Open SQLite transaction owning its connection.
#[derive(Debug)]
pub struct SqliteTx {
    conn: Connection,
    finished: bool,
}

impl SqliteTx {
    /// Connection to issue statements on while the scope is open.
    pub fn connection(&self) -> RepoResult<&Connection> {
        if self.finished {
            return Err(RepoError::TransactionFinished);
        }
        Ok(&self.conn)
    }
}

impl TxHandle for SqliteTx {
    fn commit(&mut self, ctx: &CallContext) -> RepoResult<()> {
        if self.finished {
            return Err(RepoError::TransactionFinished);
        }
        ensure_active(ctx)?;
        self.conn.execute_batch("COMMIT;")?;
        self.finished = true;
        Ok(())
    }

    fn rollback(&mut self, _ctx: &CallContext) -> RepoResult<()> {
        self.finished = true;
        // SQLite may already have ended the transaction on its own (e.g. after
        // a failed COMMIT); there is nothing left to undo then.
        if self.conn.is_autocommit() {
            return Ok(());
        }
        self.conn.execute_batch("ROLLBACK;")?;
        Ok(())
    }
}

impl Drop for SqliteTx {
    fn drop(&mut self) {
        if self.finished || self.conn.is_autocommit() {
            return;
        }
        if let Err(err) = self.conn.execute_batch("ROLLBACK;") {
            warn!(
                "event=tx_drop module=repo status=error error_code=rollback_on_drop_failed error={}",
                err
            );
        }
    }
}

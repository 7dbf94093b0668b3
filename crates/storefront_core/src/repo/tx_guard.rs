//! Scoped ownership of an open transaction.
//!
//! # Responsibility
//! - Hold an open `TxHandle` for the duration of one unit of work.
//! - Roll the scope back if it is dropped without a terminal action, which
//!   includes unwinding from a panic.
//!
//! # Invariants
//! - After a successful `commit` or any `rollback` call, drop does nothing.
//! - Drop never swallows or replaces a panic; it only releases the scope.

use crate::context::CallContext;
use crate::repo::error::RepoResult;
use crate::repo::store::TxHandle;
use log::{error, warn};

pub struct TxGuard<'ctx, T: TxHandle> {
    tx: T,
    ctx: &'ctx CallContext,
    finished: bool,
}

impl<'ctx, T: TxHandle> TxGuard<'ctx, T> {
    pub fn new(tx: T, ctx: &'ctx CallContext) -> Self {
        Self {
            tx,
            ctx,
            finished: false,
        }
    }

    /// Handle to pass into transaction-scoped creators.
    pub fn tx_mut(&mut self) -> &mut T {
        &mut self.tx
    }

    /// Commits the scope.
    ///
    /// On failure the scope stays owned by the guard so the caller can make
    /// its single rollback attempt.
    pub fn commit(&mut self) -> RepoResult<()> {
        self.tx.commit(self.ctx)?;
        self.finished = true;
        Ok(())
    }

    /// Rolls back and consumes the guard.
    pub fn rollback(mut self) -> RepoResult<()> {
        self.finished = true;
        self.tx.rollback(self.ctx)
    }
}

impl<T: TxHandle> Drop for TxGuard<'_, T> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;

        let reason = if std::thread::panicking() {
            "panic"
        } else {
            "scope_exit"
        };
        match self.tx.rollback(self.ctx) {
            Ok(()) => warn!(
                "event=tx_rollback module=repo status=ok trigger=guard reason={}",
                reason
            ),
            Err(err) => error!(
                "event=tx_rollback module=repo status=error trigger=guard reason={} error_code=guard_rollback_failed error={}",
                reason, err
            ),
        }
    }
}

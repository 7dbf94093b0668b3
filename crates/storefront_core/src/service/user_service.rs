//! Account registration use-case service.
//!
//! # Responsibility
//! - Create an account with its address, contact and category memberships
//!   as one atomic unit (`create_full`).
//! - Own every validate/hash/begin/commit/rollback decision of that flow.
//!
//! # Invariants
//! - Validation and hashing finish before a transaction is opened.
//! - Every failure after `begin_tx` triggers exactly one rollback attempt.
//! - A failed rollback is reported together with the error that caused it.
//! - A panic from any collaborator rolls back through `TxGuard` and keeps
//!   unwinding with its original payload.

use crate::context::CallContext;
use crate::hashing::{HashError, SecretHasher};
use crate::model::account::{Account, EntityId};
use crate::model::address::Address;
use crate::model::aggregate::{validate_aggregate, CreateFullRequest, UserAggregate};
use crate::model::category::CategoryMembership;
use crate::model::contact::ContactInfo;
use crate::model::validation::ValidationError;
use crate::repo::address_repo::{AddressCreator, SqliteAddressCreator};
use crate::repo::category_repo::{MembershipCreator, SqliteMembershipCreator};
use crate::repo::contact_repo::{ContactCreator, SqliteContactCreator};
use crate::repo::error::RepoError;
use crate::repo::store::{ResourceManager, SqliteStore, SqliteTx, TxHandle};
use crate::repo::tx_guard::TxGuard;
use crate::repo::user_repo::{AccountCreator, SqliteAccountCreator};
use log::{debug, error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Persistence step that failed inside the transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateStep {
    Account,
    Address,
    Contact,
    Membership { category_id: EntityId },
}

impl Display for CreateStep {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Account => write!(f, "account"),
            Self::Address => write!(f, "address"),
            Self::Contact => write!(f, "contact"),
            Self::Membership { category_id } => {
                write!(f, "membership for category {category_id}")
            }
        }
    }
}

/// Errors from `UserService::create_full`.
#[derive(Debug)]
pub enum CreateFullError {
    /// Request rejected before any I/O.
    Validation(ValidationError),
    Hash(HashError),
    BeginTransaction(RepoError),
    /// Resource manager reported success without a transaction handle.
    InvalidTransaction,
    InvalidAddress(ValidationError),
    InvalidContact(ValidationError),
    InvalidMembership {
        category_id: EntityId,
        source: ValidationError,
    },
    Persistence {
        step: CreateStep,
        source: RepoError,
    },
    Commit(RepoError),
    /// `operation` triggered a rollback, and the rollback failed too.
    RollbackFailed {
        operation: Box<CreateFullError>,
        rollback: RepoError,
    },
}

impl CreateFullError {
    /// Stable code for log records.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_failed",
            Self::Hash(_) => "hash_failed",
            Self::BeginTransaction(_) => "tx_begin_failed",
            Self::InvalidTransaction => "invalid_transaction",
            Self::InvalidAddress(_) => "address_invalid",
            Self::InvalidContact(_) => "contact_invalid",
            Self::InvalidMembership { .. } => "membership_invalid",
            Self::Persistence { .. } => "persistence_failed",
            Self::Commit(_) => "commit_failed",
            Self::RollbackFailed { .. } => "rollback_failed",
        }
    }

    /// The error that caused the failure, looking through a failed rollback.
    pub fn operation_error(&self) -> &CreateFullError {
        match self {
            Self::RollbackFailed { operation, .. } => operation.as_ref(),
            other => other,
        }
    }

    pub fn rollback_error(&self) -> Option<&RepoError> {
        match self {
            Self::RollbackFailed { rollback, .. } => Some(rollback),
            _ => None,
        }
    }

    fn with_rollback_failure(self, rollback: RepoError) -> Self {
        Self::RollbackFailed {
            operation: Box::new(self),
            rollback,
        }
    }
}

impl Display for CreateFullError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Hash(err) => write!(f, "failed to hash password: {err}"),
            Self::BeginTransaction(err) => write!(f, "failed to start transaction: {err}"),
            Self::InvalidTransaction => {
                write!(f, "invalid transaction: resource manager returned no handle")
            }
            Self::InvalidAddress(err) => write!(f, "address invalid: {err}"),
            Self::InvalidContact(err) => write!(f, "contact invalid: {err}"),
            Self::InvalidMembership {
                category_id,
                source,
            } => write!(f, "membership invalid for category {category_id}: {source}"),
            Self::Persistence { step, source } => write!(f, "failed to create {step}: {source}"),
            Self::Commit(err) => write!(f, "failed to commit transaction: {err}"),
            Self::RollbackFailed {
                operation,
                rollback,
            } => write!(f, "{operation}; rollback error: {rollback}"),
        }
    }
}

impl Error for CreateFullError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err)
            | Self::InvalidAddress(err)
            | Self::InvalidContact(err)
            | Self::InvalidMembership { source: err, .. } => Some(err),
            Self::Hash(err) => Some(err),
            Self::BeginTransaction(err)
            | Self::Persistence { source: err, .. }
            | Self::Commit(err) => Some(err),
            Self::InvalidTransaction => None,
            Self::RollbackFailed { operation, .. } => Some(operation.as_ref()),
        }
    }
}

impl From<ValidationError> for CreateFullError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Transaction-scoped creators used by `create_full`.
pub struct UserCreators<Tx> {
    pub accounts: Box<dyn AccountCreator<Tx> + Send + Sync>,
    pub addresses: Box<dyn AddressCreator<Tx> + Send + Sync>,
    pub contacts: Box<dyn ContactCreator<Tx> + Send + Sync>,
    pub memberships: Box<dyn MembershipCreator<Tx> + Send + Sync>,
}

impl UserCreators<SqliteTx> {
    pub fn sqlite() -> Self {
        Self {
            accounts: Box::new(SqliteAccountCreator),
            addresses: Box::new(SqliteAddressCreator),
            contacts: Box::new(SqliteContactCreator),
            memberships: Box::new(SqliteMembershipCreator),
        }
    }
}

/// Account registration service.
///
/// Holds no per-call state; one instance may serve concurrent callers when
/// its resource manager and hasher allow it.
pub struct UserService<M: ResourceManager, H: SecretHasher> {
    manager: M,
    hasher: H,
    creators: UserCreators<M::Tx>,
}

impl<H: SecretHasher> UserService<SqliteStore, H> {
    /// Service wired to SQLite creators over `store`.
    pub fn sqlite(store: SqliteStore, hasher: H) -> Self {
        Self::new(store, hasher, UserCreators::sqlite())
    }
}

impl<M: ResourceManager, H: SecretHasher> UserService<M, H> {
    pub fn new(manager: M, hasher: H, creators: UserCreators<M::Tx>) -> Self {
        Self {
            manager,
            hasher,
            creators,
        }
    }

    /// Creates account, address, contact and memberships atomically.
    ///
    /// # Contract
    /// - Returns the request's first validation failure without touching
    ///   storage.
    /// - On success the result carries generated ids and the requested
    ///   category ids in request order.
    /// - On any failure after the transaction opened, nothing is committed.
    ///
    /// # Panics
    /// Re-raises collaborator panics unchanged after rolling back.
    pub fn create_full(
        &self,
        ctx: &CallContext,
        request: CreateFullRequest,
    ) -> Result<UserAggregate, CreateFullError> {
        let started_at = Instant::now();
        info!(
            "event=user_create_full module=service status=start categories={}",
            request.category_ids.len()
        );

        let result = self.run_create_full(ctx, request);
        match &result {
            Ok(aggregate) => info!(
                "event=user_create_full module=service status=ok user_id={} duration_ms={}",
                aggregate.account.id,
                started_at.elapsed().as_millis()
            ),
            Err(err) => warn!(
                "event=user_create_full module=service status=error duration_ms={} error_code={} error={}",
                started_at.elapsed().as_millis(),
                err.code(),
                err
            ),
        }
        result
    }

    fn run_create_full(
        &self,
        ctx: &CallContext,
        request: CreateFullRequest,
    ) -> Result<UserAggregate, CreateFullError> {
        validate_aggregate(&request)?;

        let CreateFullRequest {
            account,
            address,
            contact,
            category_ids,
        } = request;
        let mut account = account.ok_or(ValidationError::AccountRequired)?;
        let address = address.ok_or(ValidationError::AddressRequired)?;
        let contact = contact.ok_or(ValidationError::ContactRequired)?;

        if !account.password.is_empty() {
            account.password = self
                .hasher
                .hash(&account.password)
                .map_err(CreateFullError::Hash)?;
        }

        let tx = match self.manager.begin_tx(ctx) {
            Ok(Some(tx)) => tx,
            Ok(None) => return Err(CreateFullError::InvalidTransaction),
            Err(err) => return Err(CreateFullError::BeginTransaction(err)),
        };
        let mut guard = TxGuard::new(tx, ctx);

        let persisted = self.persist_within(
            ctx,
            guard.tx_mut(),
            account,
            address,
            contact,
            &category_ids,
        );
        let (account, address, contact) = match persisted {
            Ok(parts) => parts,
            Err(err) => return Err(rollback_after(guard, err)),
        };

        if let Err(err) = guard.commit() {
            return Err(rollback_after(guard, CreateFullError::Commit(err)));
        }

        Ok(UserAggregate {
            account,
            address,
            contact,
            category_ids,
        })
    }

    fn persist_within(
        &self,
        ctx: &CallContext,
        tx: &mut M::Tx,
        account: Account,
        mut address: Address,
        mut contact: ContactInfo,
        category_ids: &[EntityId],
    ) -> Result<(Account, Address, ContactInfo), CreateFullError> {
        let account = self
            .creators
            .accounts
            .create_within_tx(ctx, tx, account)
            .map_err(|source| CreateFullError::Persistence {
                step: CreateStep::Account,
                source,
            })?;
        debug!(
            "event=user_create_full module=service status=step step=account user_id={}",
            account.id
        );

        // Owner references only exist now; re-check both entities with them set.
        address.user_id = Some(account.id);
        contact.user_id = Some(account.id);
        address.validate().map_err(CreateFullError::InvalidAddress)?;
        contact.validate().map_err(CreateFullError::InvalidContact)?;

        let address = self
            .creators
            .addresses
            .create_within_tx(ctx, tx, address)
            .map_err(|source| CreateFullError::Persistence {
                step: CreateStep::Address,
                source,
            })?;
        let contact = self
            .creators
            .contacts
            .create_within_tx(ctx, tx, contact)
            .map_err(|source| CreateFullError::Persistence {
                step: CreateStep::Contact,
                source,
            })?;
        debug!(
            "event=user_create_full module=service status=step step=address_contact address_id={} contact_id={}",
            address.id, contact.id
        );

        for &category_id in category_ids {
            let membership = CategoryMembership::new(account.id, category_id);
            membership
                .validate()
                .map_err(|source| CreateFullError::InvalidMembership {
                    category_id,
                    source,
                })?;
            self.creators
                .memberships
                .create_within_tx(ctx, tx, membership)
                .map_err(|source| CreateFullError::Persistence {
                    step: CreateStep::Membership { category_id },
                    source,
                })?;
        }

        Ok((account, address, contact))
    }
}

/// Makes the single rollback attempt for `err` and composes its outcome.
fn rollback_after<T: TxHandle>(guard: TxGuard<'_, T>, err: CreateFullError) -> CreateFullError {
    match guard.rollback() {
        Ok(()) => {
            debug!(
                "event=tx_rollback module=service status=ok trigger={}",
                err.code()
            );
            err
        }
        Err(rollback) => {
            error!(
                "event=tx_rollback module=service status=error trigger={} error_code=rollback_failed error={}",
                err.code(),
                rollback
            );
            err.with_rollback_failure(rollback)
        }
    }
}

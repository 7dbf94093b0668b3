//! Repository error type shared by every store repository.

use crate::context::{CallContext, ContextState};
use crate::db::DbError;
use crate::model::account::EntityId;
use crate::model::validation::ValidationError;
use rusqlite::ErrorCode;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Error for persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    Db(DbError),
    NotFound {
        entity: &'static str,
        id: EntityId,
    },
    /// Unique or foreign-key constraint rejected the write.
    Conflict(String),
    /// Optimistic update saw a different `version` than expected.
    VersionConflict {
        entity: &'static str,
        id: EntityId,
        expected_version: i64,
    },
    Cancelled,
    DeadlineExceeded,
    /// Transaction handle was used after commit or rollback.
    TransactionFinished,
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::Conflict(message) => write!(f, "conflict: {message}"),
            Self::VersionConflict {
                entity,
                id,
                expected_version,
            } => write!(
                f,
                "{entity} {id} was modified concurrently (expected version {expected_version})"
            ),
            Self::Cancelled => write!(f, "operation cancelled"),
            Self::DeadlineExceeded => write!(f, "operation deadline exceeded"),
            Self::TransactionFinished => write!(f, "transaction already finished"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        match value {
            DbError::Sqlite(err) => err.into(),
            other => Self::Db(other),
        }
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::SqliteFailure(ref err, ref message)
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Self::Conflict(message.clone().unwrap_or_else(|| err.to_string()))
            }
            other => Self::Db(DbError::Sqlite(other)),
        }
    }
}

/// Fails fast when the caller cancelled or the deadline passed.
pub fn ensure_active(ctx: &CallContext) -> RepoResult<()> {
    match ctx.state() {
        ContextState::Active => Ok(()),
        ContextState::Cancelled => Err(RepoError::Cancelled),
        ContextState::DeadlineExceeded => Err(RepoError::DeadlineExceeded),
    }
}

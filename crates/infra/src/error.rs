use thiserror::Error;

use carehub_auth::{Action, DirectoryError, ResourceType};

/// Storage-side failures of scoped data access.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DataAccessError {
    /// A tenant-partition operation was attempted from a scope that names no
    /// single organization.
    #[error("scope does not name a tenant partition")]
    NoTenantPartition,

    /// A registry-wide operation was attempted from a single-tenant scope.
    #[error("operation requires the all-organizations scope")]
    RegistryScopeRequired,

    /// The executor was bound to a different authorization decision than
    /// the mutation it was asked to perform.
    #[error("executor not authorized for {action} {resource}")]
    OperationNotAuthorized {
        action: Action,
        resource: ResourceType,
    },

    #[error("not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("storage operation timed out")]
    Timeout,
}

impl From<DirectoryError> for DataAccessError {
    fn from(value: DirectoryError) -> Self {
        DataAccessError::Storage(value.0)
    }
}

impl From<DataAccessError> for DirectoryError {
    fn from(value: DataAccessError) -> Self {
        DirectoryError(value.to_string())
    }
}

pub(crate) fn map_sqlx_error(operation: &str, err: sqlx::Error) -> DataAccessError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                // Unique violation
                Some("23505") => DataAccessError::Conflict(msg),
                _ => DataAccessError::Storage(msg),
            }
        }
        sqlx::Error::RowNotFound => DataAccessError::NotFound,
        sqlx::Error::PoolClosed => {
            DataAccessError::Storage(format!("connection pool closed in {}", operation))
        }
        sqlx::Error::PoolTimedOut => DataAccessError::Timeout,
        other => DataAccessError::Storage(format!("{} failed: {}", operation, other)),
    }
}

//! # Service Errors
//!
//! What engine operations return. Business rule failures pass through
//! verbatim; storage contention and deadline expiry become
//! `OperationAborted`, which tells the caller to retry the whole operation.

use thiserror::Error;

use crate::error::DbError;
use khata_core::{CoreError, ErrorKind, ValidationError};

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Business rule violation (validation, unit, stock, arithmetic).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Storage failure that retrying won't fix.
    #[error(transparent)]
    Db(DbError),

    /// The transaction was rolled back before it could finish.
    #[error("Operation aborted: {0}")]
    OperationAborted(String),
}

impl ServiceError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        ServiceError::Core(CoreError::not_found(entity, id))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::Core(err) => err.kind(),
            ServiceError::Db(DbError::NotFound { .. }) => ErrorKind::NotFound,
            ServiceError::Db(_) => ErrorKind::Internal,
            ServiceError::OperationAborted(_) => ErrorKind::OperationAborted,
        }
    }
}

impl From<DbError> for ServiceError {
    fn from(err: DbError) -> Self {
        if err.is_retryable() {
            ServiceError::OperationAborted(err.to_string())
        } else {
            ServiceError::Db(err)
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        ServiceError::Core(CoreError::Validation(err))
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_db_errors_abort() {
        let err: ServiceError = DbError::Busy("database is locked".into()).into();
        assert_eq!(err.kind(), ErrorKind::OperationAborted);

        let err: ServiceError = DbError::PoolExhausted.into();
        assert_eq!(err.kind(), ErrorKind::OperationAborted);

        let err: ServiceError = DbError::Internal("disk I/O error".into()).into();
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_core_errors_keep_their_kind() {
        let err: ServiceError = ValidationError::required("name").into();
        assert_eq!(err.kind(), ErrorKind::ValidationError);
        assert_eq!(err.to_string(), "Validation error: name is required");

        let err = ServiceError::not_found("Invoice", "abc");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}

use sea_orm::{DbErr, SqlErr};

/// Errors returned by every [`Store`](crate::store::Store) operation.
///
/// The first four variants carry messages meant for API clients. `Database`
/// and `Password` are internal and should be logged, not echoed.
///
/// # Examples
///
/// ```rust
/// use vigia_storage::error::StorageError;
///
/// let err = StorageError::NotFound {
///     entity: "report",
///     key: "ORC-AP-404".to_string(),
/// };
/// assert_eq!(err.to_string(), "report not found: ORC-AP-404");
/// ```
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A required field is missing or malformed.
    #[error("{0}")]
    Validation(String),

    /// A referenced row or catalog entry does not exist.
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    /// A unique value (folio, username, email) is already taken.
    #[error("{0}")]
    Conflict(String),

    /// A follow-up asked for a status change the lifecycle forbids.
    #[error("cannot move {entity} from {from} to {to}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    /// A status or role column holds a value this build does not know.
    #[error("Storage: unexpected value in column '{column}': {value}")]
    UnexpectedValue { column: &'static str, value: String },

    #[error("Storage: database error: {0}")]
    Database(DbErr),

    #[error("Storage: password hashing failed: {0}")]
    Password(#[from] bcrypt::BcryptError),
}

impl StorageError {
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        StorageError::NotFound {
            entity,
            key: key.to_string(),
        }
    }
}

impl From<DbErr> for StorageError {
    fn from(e: DbErr) -> Self {
        match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => {
                tracing::debug!(detail = %detail, "Unique constraint violated");
                StorageError::Conflict("record already exists".to_string())
            }
            _ => StorageError::Database(e),
        }
    }
}

/// Convenience `Result` alias for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

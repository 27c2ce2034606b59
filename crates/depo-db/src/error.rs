//! # Database Errors
//!
//! One error type for every repository call, plus the coarse [`ErrorKind`]
//! the page layer turns into a status code.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  sqlx::Error ───────────┐                                               │
//! │  MigrateError ──────────┤                                               │
//! │  serde_json::Error ─────┼──► DbError ──► kind() ──► http_status()       │
//! │  CoreError ─────────────┤                   │                           │
//! │  ValidationError ───────┘                   └──► public_message()       │
//! │                                                  (internal → generic)   │
//! │                                                                         │
//! │  404  NotFound                                                          │
//! │  400  UniqueViolation, Conflict, InvalidState, Validation               │
//! │  500  everything else, logged once in public_message()                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use depo_core::{CoreError, ValidationError};
use thiserror::Error;
use tracing::error;

const GENERIC_MESSAGE: &str = "Beklenmeyen bir hata oluştu";

#[derive(Debug, Error)]
pub enum DbError {
    /// Unknown customer, rack, tire, serial number or history id.
    #[error("{entity} bulunamadı: {id}")]
    NotFound { entity: String, id: String },

    /// Rack code, customer name (ignoring case), brand or tire size taken.
    #[error("{field} zaten kayıtlı: '{value}'")]
    UniqueViolation { field: String, value: String },

    /// Refused because of what is stored, e.g. deleting an occupied rack.
    #[error("{reason}")]
    Conflict { reason: String },

    /// Exit or replace of a tire that already left the depot.
    #[error("{0}")]
    InvalidState(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// A stored code or JSON column no longer maps onto the domain types.
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Internal database error: {0}")]
    Internal(String),
}

/// How a failure is reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    InvalidState,
    Validation,
    Internal,
}

impl ErrorKind {
    pub fn http_status(self) -> u16 {
        match self {
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict | ErrorKind::InvalidState | ErrorKind::Validation => 400,
            ErrorKind::Internal => 500,
        }
    }
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn conflict(reason: impl Into<String>) -> Self {
        DbError::Conflict {
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DbError::NotFound { .. } => ErrorKind::NotFound,
            DbError::UniqueViolation { .. } | DbError::Conflict { .. } => ErrorKind::Conflict,
            DbError::InvalidState(_) => ErrorKind::InvalidState,
            DbError::Validation(_) => ErrorKind::Validation,
            _ => ErrorKind::Internal,
        }
    }

    /// Text for depot staff. Internal failures are logged here and hidden
    /// behind a generic message.
    pub fn public_message(&self) -> String {
        if self.kind() == ErrorKind::Internal {
            error!(error = %self, "Internal database failure");
            return GENERIC_MESSAGE.to_string();
        }
        self.to_string()
    }
}

/// `customers.name_folded` → `name`; the first column of a composite key wins.
fn unique_field(target: &str) -> String {
    let first = target.split(',').next().unwrap_or(target).trim();
    let column = first.rsplit('.').next().unwrap_or(first);
    match column {
        "name_folded" => "name".to_string(),
        other => other.to_string(),
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Kayıt", "?"),

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();
                if let Some(target) = msg.strip_prefix("UNIQUE constraint failed: ") {
                    DbError::duplicate(unique_field(target), "?")
                } else if msg.starts_with("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool closed".to_string()),

            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                DbError::Decode(err.to_string())
            }

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

impl From<CoreError> for DbError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidTransition { .. } => DbError::InvalidState(err.to_string()),
            CoreError::UnknownValue { kind, value } => {
                DbError::Validation(ValidationError::InvalidFormat {
                    field: kind.to_string(),
                    reason: format!("'{value}' tanınmıyor"),
                })
            }
            CoreError::Validation(v) => DbError::Validation(v),
        }
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::Decode(err.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;

//! # Error Types
//!
//! Failures raised by the pure depot rules. Messages are Turkish because
//! depot staff see them as-is on the pages.
//!
//! ```text
//! ValidationError ──► CoreError ──► depo_db::DbError ──► page / status code
//!   (form fields)      (status machine, unknown codes)
//! ```

use thiserror::Error;

use crate::types::TireStatus;

/// Rule violations from the status machine and enum parsing.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Exit or replace asked of a tire that is no longer in the depot.
    #[error("{serial_no} numaralı lastik {from} durumunda, {to} yapılamaz")]
    InvalidTransition {
        serial_no: i64,
        from: TireStatus,
        to: TireStatus,
    },

    /// A form or query value matched no code or label.
    #[error("Geçersiz {kind}: '{value}'")]
    UnknownValue { kind: &'static str, value: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Field-level input problems, detected before any database work.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} boş bırakılamaz")]
    Required { field: String },

    #[error("{field} en fazla {max} karakter olabilir")]
    TooLong { field: String, max: usize },

    #[error("{field} {min} ile {max} arasında olmalı")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Rack code with spaces, a malformed date, an unknown status and so on.
    #[error("{field} hatalı: {reason}")]
    InvalidFormat { field: String, reason: String },
}

pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_message_uses_labels() {
        let err = CoreError::InvalidTransition {
            serial_no: 7,
            from: TireStatus::Exited,
            to: TireStatus::Replaced,
        };
        assert_eq!(
            err.to_string(),
            "7 numaralı lastik Çıkmış durumunda, Değiştirildi yapılamaz"
        );
    }

    #[test]
    fn test_field_messages() {
        let err = ValidationError::Required {
            field: "plaka".to_string(),
        };
        assert_eq!(err.to_string(), "plaka boş bırakılamaz");

        let err = ValidationError::OutOfRange {
            field: "adet".to_string(),
            min: 1,
            max: 100,
        };
        assert_eq!(err.to_string(), "adet 1 ile 100 arasında olmalı");
    }

    #[test]
    fn test_validation_is_transparent_inside_core_error() {
        let inner = ValidationError::TooLong {
            field: "not".to_string(),
            max: 500,
        };
        let err: CoreError = inner.clone().into();
        assert!(matches!(err, CoreError::Validation(ref v) if *v == inner));
        assert_eq!(err.to_string(), "not en fazla 500 karakter olabilir");
    }
}

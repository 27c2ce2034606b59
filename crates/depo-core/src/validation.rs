//! # Validation Module
//!
//! Input validation for depot forms.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTML form                                                    │
//! │  └── required fields, select boxes                                     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── lengths, rack code format, slot count                            │
//! │  └── runs before any transaction is opened                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                       │
//! │  ├── UNIQUE (serial_no, rack code, brand, size, folded name)           │
//! │  └── Foreign keys                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::types::{NewCustomer, NewRack, TireAttributes};
use crate::{MAX_BULK_RACKS, MAX_TIRE_SLOTS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_NAME_LEN: usize = 120;
const MAX_PHONE_LEN: usize = 30;
const MAX_PLATE_LEN: usize = 20;
const MAX_RACK_CODE_LEN: usize = 20;
const MAX_RACK_PREFIX_LEN: usize = 10;
const MAX_SIZE_LEN: usize = 40;
const MAX_BRAND_LEN: usize = 60;
const MAX_NOTE_LEN: usize = 500;
const MAX_QUERY_LEN: usize = 100;

fn required(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

// =============================================================================
// Customer
// =============================================================================

/// Validates a customer form. Name, phone and plate are all required.
///
/// ## Example
/// ```rust
/// use depo_core::types::NewCustomer;
/// use depo_core::validation::validate_customer;
///
/// let ok = NewCustomer {
///     name: "Şeyma Öz".into(),
///     phone: "05551234567".into(),
///     plate: "34 ABC 123".into(),
/// };
/// assert!(validate_customer(&ok).is_ok());
/// ```
pub fn validate_customer(input: &NewCustomer) -> ValidationResult<()> {
    required("name", &input.name, MAX_NAME_LEN)?;
    required("phone", &input.phone, MAX_PHONE_LEN)?;
    required("plate", &input.plate, MAX_PLATE_LEN)?;
    Ok(())
}

// =============================================================================
// Racks
// =============================================================================

/// Validates a rack code.
///
/// ## Rules
/// - Must not be empty, at most 20 characters
/// - Letters, digits and hyphens only ("A-3", "B12")
pub fn validate_rack_code(code: &str) -> ValidationResult<()> {
    required("code", code, MAX_RACK_CODE_LEN)?;

    if !code
        .trim()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-')
    {
        return Err(ValidationError::InvalidFormat {
            field: "code".to_string(),
            reason: "must contain only letters, digits and hyphens".to_string(),
        });
    }

    Ok(())
}

/// Validates a rack form.
pub fn validate_rack(input: &NewRack) -> ValidationResult<()> {
    validate_rack_code(&input.code)?;
    validate_note(input.note.as_deref())
}

/// Validates the prefix of a bulk rack request. Letters only.
pub fn validate_rack_prefix(prefix: &str) -> ValidationResult<()> {
    required("prefix", prefix, MAX_RACK_PREFIX_LEN)?;

    if !prefix.trim().chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ValidationError::InvalidFormat {
            field: "prefix".to_string(),
            reason: "must contain only letters".to_string(),
        });
    }

    Ok(())
}

/// Validates a bulk rack count (1..=100).
pub fn validate_bulk_count(count: i64) -> ValidationResult<()> {
    if !(1..=MAX_BULK_RACKS).contains(&count) {
        return Err(ValidationError::OutOfRange {
            field: "count".to_string(),
            min: 1,
            max: MAX_BULK_RACKS,
        });
    }

    Ok(())
}

// =============================================================================
// Tires
// =============================================================================

/// Validates a tire size string such as "205/55 R16".
pub fn validate_tire_size(size: &str) -> ValidationResult<()> {
    required("size", size, MAX_SIZE_LEN)
}

/// Validates a brand name.
pub fn validate_brand_name(name: &str) -> ValidationResult<()> {
    required("brand", name, MAX_BRAND_LEN)
}

/// Validates an optional free-text note.
pub fn validate_note(note: Option<&str>) -> ValidationResult<()> {
    match note {
        Some(n) if n.chars().count() > MAX_NOTE_LEN => Err(ValidationError::TooLong {
            field: "note".to_string(),
            max: MAX_NOTE_LEN,
        }),
        _ => Ok(()),
    }
}

/// Validates the full attribute set of a tire.
///
/// ## Rules
/// - Brand and tire-level size are required
/// - At most [`MAX_TIRE_SLOTS`] slots; each filled slot size obeys the size rule
/// - Note length
pub fn validate_tire_attributes(attrs: &TireAttributes) -> ValidationResult<()> {
    validate_brand_name(&attrs.brand)?;
    validate_tire_size(&attrs.size)?;
    validate_note(attrs.note.as_deref())?;

    if attrs.slots.len() > MAX_TIRE_SLOTS {
        return Err(ValidationError::OutOfRange {
            field: "slots".to_string(),
            min: 0,
            max: MAX_TIRE_SLOTS as i64,
        });
    }

    for slot in attrs.slots.iter().filter(|s| s.is_filled()) {
        if let Some(size) = slot.size.as_deref() {
            validate_tire_size(size)?;
        }
        if let Some(brand) = slot.brand.as_deref().filter(|b| !b.trim().is_empty()) {
            validate_brand_name(brand)?;
        }
    }

    Ok(())
}

/// Validates one free-text search filter.
///
/// Empty is allowed (no filter). Returns the trimmed query.
pub fn validate_search_query(field: &str, query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.chars().count() > MAX_QUERY_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_QUERY_LEN,
        });
    }

    Ok(query.to_string())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Season, TireSlot, TreadCondition};

    fn attrs() -> TireAttributes {
        TireAttributes {
            customer_id: 1,
            rack_id: 1,
            brand: "Michelin".to_string(),
            size: "205/55 R16".to_string(),
            season: Season::Winter,
            condition: TreadCondition::Good,
            note: None,
            slots: vec![],
            entry_at: None,
        }
    }

    #[test]
    fn test_validate_customer() {
        let mut input = NewCustomer {
            name: "Ali Veli".to_string(),
            phone: "05321112233".to_string(),
            plate: "06 AB 1234".to_string(),
        };
        assert!(validate_customer(&input).is_ok());

        input.plate = "  ".to_string();
        assert!(matches!(
            validate_customer(&input),
            Err(ValidationError::Required { field }) if field == "plate"
        ));

        input.plate = "06 AB 1234".to_string();
        input.name = "Ş".repeat(121);
        assert!(validate_customer(&input).is_err());
    }

    #[test]
    fn test_validate_rack_code() {
        assert!(validate_rack_code("A-3").is_ok());
        assert!(validate_rack_code("B12").is_ok());
        assert!(validate_rack_code("").is_err());
        assert!(validate_rack_code("A 3").is_err());
        assert!(validate_rack_code(&"A".repeat(21)).is_err());
    }

    #[test]
    fn test_validate_rack_prefix_and_count() {
        assert!(validate_rack_prefix("A").is_ok());
        assert!(validate_rack_prefix("A1").is_err());
        assert!(validate_rack_prefix("").is_err());

        assert!(validate_bulk_count(1).is_ok());
        assert!(validate_bulk_count(100).is_ok());
        assert!(validate_bulk_count(0).is_err());
        assert!(validate_bulk_count(101).is_err());
    }

    #[test]
    fn test_validate_tire_attributes() {
        assert!(validate_tire_attributes(&attrs()).is_ok());

        let mut no_brand = attrs();
        no_brand.brand = String::new();
        assert!(validate_tire_attributes(&no_brand).is_err());

        let mut too_many = attrs();
        too_many.slots = vec![TireSlot::default(); 7];
        assert!(matches!(
            validate_tire_attributes(&too_many),
            Err(ValidationError::OutOfRange { max: 6, .. })
        ));

        let mut six = attrs();
        six.slots = vec![TireSlot::default(); 6];
        assert!(validate_tire_attributes(&six).is_ok());
    }

    #[test]
    fn test_validate_note_and_query() {
        assert!(validate_note(None).is_ok());
        assert!(validate_note(Some("sol arka yıpranmış")).is_ok());
        assert!(validate_note(Some(&"x".repeat(501))).is_err());

        assert_eq!(validate_search_query("name", "  şeyma ").unwrap(), "şeyma");
        assert!(matches!(
            validate_search_query("plate", &"a".repeat(101)),
            Err(ValidationError::TooLong { field, max: 100 }) if field == "plate"
        ));
    }
}

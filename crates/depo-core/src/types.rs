//! # Domain Types
//!
//! Core domain types used throughout Lastik Depo.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Customer     │   │      Tire       │   │      Rack       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │◄──│  customer_id    │   │  id             │       │
//! │  │  name           │   │  rack_id        │──►│  code (unique)  │       │
//! │  │  phone, plate   │   │  serial_no      │   │  status         │       │
//! │  └─────────────────┘   │  status         │   │  note           │       │
//! │                        │  slots (0..6)   │   └─────────────────┘       │
//! │  ┌─────────────────┐   └────────┬────────┘                             │
//! │  │     Brand       │◄───────────┘                                      │
//! │  └─────────────────┘   ┌─────────────────┐   ┌─────────────────┐       │
//! │                        │  TireHistory    │   │    TireSize     │       │
//! │                        │  (snapshots)    │   │  (reference)    │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every tire has:
//! - `id`: storage primary key, used for relations
//! - `serial_no`: business number printed on the depot label, assigned once

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::CoreError;
use crate::search::normalize_search_text;

// =============================================================================
// Coded Enumerations
// =============================================================================

/// Declares an enumeration persisted by a stable code and shown by a
/// Turkish label. Parsing accepts either form and nothing else.
macro_rules! coded_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident as $kind:literal {
            $(
                $(#[$vmeta:meta])*
                $variant:ident = ($code:literal, $label:literal)
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
        #[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
        #[ts(export)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $code)]
                #[cfg_attr(feature = "sqlx", sqlx(rename = $code))]
                $variant,
            )+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Stable code stored in the database.
            pub const fn code(self) -> &'static str {
                match self {
                    $($name::$variant => $code),+
                }
            }

            /// Display string shown to depot staff.
            pub const fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }

        impl FromStr for $name {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = normalize_search_text(s.trim());
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| {
                        normalize_search_text(v.code()) == wanted
                            || normalize_search_text(v.label()) == wanted
                    })
                    .ok_or_else(|| CoreError::UnknownValue {
                        kind: $kind,
                        value: s.to_string(),
                    })
            }
        }
    };
}

coded_enum! {
    /// Lifecycle state of a tire record.
    ///
    /// ```text
    ///   InDepot ──exit──► Exited
    ///      │
    ///      └──replace──► Replaced   (a new InDepot tire takes its place)
    /// ```
    pub enum TireStatus as "lastik durumu" {
        /// Stored in a rack.
        InDepot = ("DEPODA", "Depoda"),
        /// Handed back to the customer.
        Exited = ("CIKTI", "Çıkmış"),
        /// Swapped for a new set.
        Replaced = ("DEGISTIRILDI", "Değiştirildi"),
    }
}

coded_enum! {
    /// Occupancy of a rack. Derived from the tires that reference it.
    pub enum RackStatus as "raf durumu" {
        Empty = ("BOS", "Boş"),
        Full = ("DOLU", "Dolu"),
    }
}

coded_enum! {
    /// Tire season.
    pub enum Season as "mevsim" {
        Summer = ("YAZ", "Yaz"),
        Winter = ("KIS", "Kış"),
        AllSeason = ("DORT_MEVSIM", "4 Mevsim"),
    }
}

coded_enum! {
    /// Tread condition noted at intake.
    pub enum TreadCondition as "diş durumu" {
        Good = ("IYI", "İyi"),
        Fair = ("ORTA", "Orta"),
        Poor = ("KOTU", "Kötü"),
    }
}

coded_enum! {
    /// Kind of event recorded in the tire history.
    pub enum HistoryAction as "işlem türü" {
        Exit = ("CIKIS", "Çıkış"),
        Replace = ("DEGISIM", "Değişim"),
    }
}

impl Default for TireStatus {
    fn default() -> Self {
        TireStatus::InDepot
    }
}

impl Default for RackStatus {
    fn default() -> Self {
        RackStatus::Empty
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A depot customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Customer {
    pub id: i64,
    /// Full name ("Ad Soyad"). Unique ignoring case.
    pub name: String,
    pub phone: String,
    /// Vehicle license plate.
    pub plate: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Input for creating or updating a customer.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewCustomer {
    pub name: String,
    pub phone: String,
    pub plate: String,
}

/// Customer row for the customers page, with tire counts by status.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CustomerSummary {
    #[serde(flatten)]
    pub customer: Customer,
    pub in_depot: i64,
    pub exited: i64,
    pub replaced: i64,
    pub total: i64,
}

// =============================================================================
// Reference Data
// =============================================================================

/// Tire brand. Created on demand when a tire names an unknown brand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Brand {
    pub id: i64,
    pub name: String,
}

/// Tire size offered in the intake form (e.g. "205/55 R16").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct TireSize {
    pub id: i64,
    pub size: String,
}

// =============================================================================
// Rack
// =============================================================================

/// A physical storage slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Rack {
    pub id: i64,
    /// Unique code such as "A-3".
    pub code: String,
    pub status: RackStatus,
    pub note: Option<String>,
}

/// Input for creating or editing a rack. Status is never accepted here;
/// it is derived from the tires stored in the rack.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewRack {
    pub code: String,
    pub note: Option<String>,
}

/// Rack with its current occupancy, as shown on the racks page.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RackOverview {
    #[serde(flatten)]
    pub rack: Rack,
    /// Number of InDepot tires in the rack.
    pub tire_count: i64,
    /// "Name" or "Name (+N)" when several customers share the rack.
    pub customer_display: String,
}

/// Racks sharing an alphabetic code prefix.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RackGroup {
    pub prefix: String,
    pub racks: Vec<RackOverview>,
}

// =============================================================================
// Tire
// =============================================================================

/// One tire of a multi-tire set. Empty fields fall back to the tire-level
/// values when snapshotted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TireSlot {
    pub size: Option<String>,
    /// Production year/week as written on the sidewall (e.g. "2321").
    pub production_year: Option<String>,
    pub brand: Option<String>,
    pub season: Option<Season>,
}

impl TireSlot {
    /// Returns true when the slot carries a non-blank size.
    pub fn is_filled(&self) -> bool {
        self.size
            .as_deref()
            .map(|s| !s.trim().is_empty())
            .unwrap_or(false)
    }
}

/// A tire set stored for a customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Tire {
    pub id: i64,
    /// Depot serial number, strictly increasing.
    pub serial_no: i64,
    pub customer_id: i64,
    pub brand_id: i64,
    pub rack_id: i64,
    /// Tire-level size ("ebat").
    pub size: String,
    pub season: Season,
    pub condition: TreadCondition,
    pub note: Option<String>,
    /// Up to six sub-tire slots, in slot order.
    pub slots: Vec<TireSlot>,
    pub status: TireStatus,
    #[ts(as = "String")]
    pub entry_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub exit_at: Option<DateTime<Utc>>,
}

/// Tire joined with the names the search pages display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TireDetail {
    #[serde(flatten)]
    pub tire: Tire,
    pub brand_name: String,
    pub rack_code: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_plate: String,
}

/// Attributes of a tire set supplied at intake, on edit, or as the new side
/// of a replacement.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TireAttributes {
    pub customer_id: i64,
    pub rack_id: i64,
    /// Brand name; created if it does not exist yet.
    pub brand: String,
    pub size: String,
    pub season: Season,
    pub condition: TreadCondition,
    pub note: Option<String>,
    #[serde(default)]
    pub slots: Vec<TireSlot>,
    /// Defaults to now when absent.
    #[ts(as = "Option<String>")]
    pub entry_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Tire History
// =============================================================================

/// One sub-tire as it looked when the history entry was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SlotSnapshot {
    pub size: String,
    pub year: Option<String>,
    pub brand: String,
    pub season: Season,
}

/// Frozen copy of one side (old or new) of a history entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TireSnapshot {
    /// Cleared when the tire row is later deleted.
    pub tire_id: Option<i64>,
    pub serial_no: i64,
    pub slots: Vec<SlotSnapshot>,
    pub brand: String,
    pub season: Season,
    #[ts(as = "String")]
    pub entry_at: DateTime<Utc>,
}

/// Immutable audit record of an exit or replacement, before it is stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct HistoryRecord {
    /// Cleared when the customer is later deleted.
    pub customer_id: Option<i64>,
    pub customer_name: String,
    pub plate: String,
    pub phone: String,
    pub action: HistoryAction,
    #[ts(as = "String")]
    pub occurred_at: DateTime<Utc>,
    pub old: TireSnapshot,
    pub new: Option<TireSnapshot>,
    pub rack_code: String,
    pub note: Option<String>,
}

impl HistoryRecord {
    /// Serial number of the tire that left (or was swapped out).
    pub fn old_serial_no(&self) -> i64 {
        self.old.serial_no
    }

    /// Serial number of the replacement tire, if any.
    pub fn new_serial_no(&self) -> Option<i64> {
        self.new.as_ref().map(|n| n.serial_no)
    }
}

/// A stored history entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct HistoryEntry {
    pub id: i64,
    #[serde(flatten)]
    pub record: HistoryRecord,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parses_code_and_label() {
        assert_eq!("DEPODA".parse::<TireStatus>().unwrap(), TireStatus::InDepot);
        assert_eq!("Depoda".parse::<TireStatus>().unwrap(), TireStatus::InDepot);
        assert_eq!("Çıkmış".parse::<TireStatus>().unwrap(), TireStatus::Exited);
        assert_eq!("cikti".parse::<TireStatus>().unwrap(), TireStatus::Exited);
        assert_eq!(
            " Değiştirildi ".parse::<TireStatus>().unwrap(),
            TireStatus::Replaced
        );
    }

    #[test]
    fn test_unknown_status_is_an_error() {
        let err = "kayıp".parse::<TireStatus>().unwrap_err();
        assert!(matches!(err, CoreError::UnknownValue { kind: "lastik durumu", .. }));
        assert!("".parse::<RackStatus>().is_err());
    }

    #[test]
    fn test_labels_and_codes() {
        assert_eq!(Season::AllSeason.code(), "DORT_MEVSIM");
        assert_eq!(Season::AllSeason.to_string(), "4 Mevsim");
        assert_eq!("kış".parse::<Season>().unwrap(), Season::Winter);
        assert_eq!("İyi".parse::<TreadCondition>().unwrap(), TreadCondition::Good);
        assert_eq!(RackStatus::Full.label(), "Dolu");
    }

    #[test]
    fn test_serde_uses_codes() {
        let json = serde_json::to_string(&TireStatus::Replaced).unwrap();
        assert_eq!(json, "\"DEGISTIRILDI\"");
        let back: HistoryAction = serde_json::from_str("\"CIKIS\"").unwrap();
        assert_eq!(back, HistoryAction::Exit);
    }

    #[test]
    fn test_defaults() {
        assert_eq!(TireStatus::default(), TireStatus::InDepot);
        assert_eq!(RackStatus::default(), RackStatus::Empty);
    }

    #[test]
    fn test_slot_is_filled() {
        assert!(!TireSlot::default().is_filled());
        let blank = TireSlot {
            size: Some("   ".to_string()),
            ..TireSlot::default()
        };
        assert!(!blank.is_filled());
        let slot = TireSlot {
            size: Some("205/55 R16".to_string()),
            ..TireSlot::default()
        };
        assert!(slot.is_filled());
    }
}

//! # depo-core: Pure Business Logic for Lastik Depo
//!
//! This crate holds the rules of the tire depot as pure functions with zero
//! I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Lastik Depo Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 HTTP routes + HTML templates                    │   │
//! │  │   /lastikler  /musteriler  /raflar  /gecmis  /lastik/{id}/cikis │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ depo-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │ lifecycle │  │  history  │  │  search   │  │   │
//! │  │   │   Tire    │  │  status   │  │ snapshots │  │  filters  │  │   │
//! │  │   │   Rack    │  │  rules    │  │           │  │  grouping │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    depo-db (Database Layer)                     │   │
//! │  │        SQLite repositories, transactions, migrations            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Customer, Tire, Rack, HistoryEntry, ...)
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//! - [`lifecycle`] - Tire/rack status state machine
//! - [`history`] - Audit snapshots for exits and replacements
//! - [`search`] - Turkish text normalization and search filters
//!
//! ## Example Usage
//!
//! ```rust
//! use depo_core::lifecycle::next_serial;
//! use depo_core::search::contains_normalized;
//! use depo_core::TireStatus;
//!
//! assert_eq!(next_serial(None), 1);
//! assert_eq!(next_serial(Some(41)), 42);
//!
//! assert!(TireStatus::InDepot.can_transition_to(TireStatus::Exited));
//! assert!(contains_normalized("Şeyma Öz", "SEYMA"));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod history;
pub mod lifecycle;
pub mod search;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use search::{LocalZone, SearchContext, StatusFilter};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum number of sub-tire slots on one tire set.
pub const MAX_TIRE_SLOTS: usize = 6;

/// Maximum racks created by a single bulk request.
pub const MAX_BULK_RACKS: i64 = 100;

/// Brands inserted by the seed binary.
pub const DEFAULT_BRANDS: &[&str] = &[
    "Michelin",
    "Pirelli",
    "Goodyear",
    "Lassa",
    "Continental",
    "Petlas",
    "Bridgestone",
    "Uniroyal",
    "Matador",
];

/// Tire sizes inserted by the seed binary.
pub const DEFAULT_TIRE_SIZES: &[&str] = &["195/55 R16", "205/55 R16", "205/60 R15", "215/65 R16"];

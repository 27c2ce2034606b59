//! # Status State Machine
//!
//! Rules for tire status transitions and how each tire operation affects
//! rack occupancy. depo-db applies these rules inside one transaction per
//! operation.
//!
//! ## Tire States
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   create ──► ┌──────────┐ ──exit────► ┌──────────┐                      │
//! │              │  Depoda  │             │  Çıkmış  │  (terminal)          │
//! │              └──────────┘ ──replace─► ┌──────────────┐                  │
//! │                                       │ Değiştirildi │  (terminal)      │
//! │                                       └──────────────┘                  │
//! │                  replace also creates a new Depoda tire                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Rack Effects
//! ```text
//! ┌──────────────┬──────────────────────┬──────────────────────┐
//! │  Operation   │  Rack of old tire    │  Rack of new tire    │
//! ├──────────────┼──────────────────────┼──────────────────────┤
//! │  create      │          -           │  force Dolu          │
//! │  exit        │  recompute           │          -           │
//! │  replace     │  untouched           │  force Dolu          │
//! │  delete      │  recompute           │          -           │
//! │  move (edit) │  recompute           │  force Dolu          │
//! └──────────────┴──────────────────────┴──────────────────────┘
//! ```
//! "Recompute" means: count the remaining Depoda tires in the rack inside the
//! same transaction; zero → Boş, otherwise Dolu.

use crate::error::{CoreError, CoreResult};
use crate::types::{RackStatus, Tire, TireStatus};

// =============================================================================
// Tire Status
// =============================================================================

impl TireStatus {
    /// Returns true when the tire occupies its rack.
    pub fn is_active(self) -> bool {
        self == TireStatus::InDepot
    }

    /// Returns true when `self → to` is a legal transition.
    ///
    /// Only `Depoda → Çıkmış` and `Depoda → Değiştirildi` exist.
    pub fn can_transition_to(self, to: TireStatus) -> bool {
        matches!(
            (self, to),
            (TireStatus::InDepot, TireStatus::Exited) | (TireStatus::InDepot, TireStatus::Replaced)
        )
    }
}

/// Checks that `tire` may move to `to`.
///
/// ## Errors
/// [`CoreError::InvalidTransition`] naming the tire's serial number.
pub fn ensure_transition(tire: &Tire, to: TireStatus) -> CoreResult<()> {
    if tire.status.can_transition_to(to) {
        Ok(())
    } else {
        Err(CoreError::InvalidTransition {
            serial_no: tire.serial_no,
            from: tire.status,
            to,
        })
    }
}

/// Next serial number given the current maximum (none when no tire exists).
pub fn next_serial(current_max: Option<i64>) -> i64 {
    current_max.unwrap_or(0).max(0) + 1
}

// =============================================================================
// Rack Status
// =============================================================================

impl RackStatus {
    /// Rack status implied by the number of Depoda tires referencing it.
    pub fn from_active_count(count: i64) -> Self {
        if count > 0 {
            RackStatus::Full
        } else {
            RackStatus::Empty
        }
    }
}

/// What an operation must do to a rack's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RackEffect {
    /// Leave the stored status alone.
    Untouched,
    /// Set Dolu without counting.
    ForceFull,
    /// Count Depoda tires and derive the status.
    Recompute,
}

/// Tire operations that can change rack occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TireOperation {
    Create,
    Exit,
    Replace,
    Delete,
    /// Editing an in-depot tire so that it points at another rack.
    Move,
}

impl TireOperation {
    /// Effect on the rack the affected (old) tire sits in.
    pub fn source_rack_effect(self) -> RackEffect {
        match self {
            TireOperation::Create => RackEffect::Untouched,
            TireOperation::Exit | TireOperation::Delete | TireOperation::Move => {
                RackEffect::Recompute
            }
            // Old rack keeps its stored status.
            TireOperation::Replace => RackEffect::Untouched,
        }
    }

    /// Effect on the rack receiving a new or moved tire.
    pub fn target_rack_effect(self) -> RackEffect {
        match self {
            TireOperation::Create | TireOperation::Replace | TireOperation::Move => {
                RackEffect::ForceFull
            }
            TireOperation::Exit | TireOperation::Delete => RackEffect::Untouched,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

//! # Repository Module
//!
//! Database repository implementations for Lastik Depo.
//!
//! ## Transaction Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  TireRepository::exit(tire_id, note)                                   │
//! │                                                                         │
//! │  let mut tx = begin_write(&pool)        BEGIN IMMEDIATE                │
//! │       │                                                                 │
//! │       ├── tire::fetch_detail(&mut *tx, id)       read                  │
//! │       ├── lifecycle::ensure_transition(...)      depo-core rule        │
//! │       ├── UPDATE tires SET status = 'CIKTI'      write                 │
//! │       ├── rack::recompute_status(&mut *tx, ..)   re-count + write      │
//! │       └── history::insert(&mut *tx, record)      write                 │
//! │       │                                                                 │
//! │  tx.commit()      (any `?` before this drops tx → rollback)            │
//! │                                                                         │
//! │  Helpers take `&mut SqliteConnection` so they join the caller's        │
//! │  transaction instead of taking a second pool connection.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A deferred `BEGIN` takes the write lock only at the first write, after
//! the reads (max serial, rack status) it depends on. Two such transactions
//! can both read and then one fails with `SQLITE_BUSY` on the upgrade.
//! `BEGIN IMMEDIATE` takes the lock up front; the other writer waits on the
//! connection's busy timeout.
//!
//! ## Available Repositories
//!
//! - [`customer::CustomerRepository`] - Customers and their tire counts
//! - [`brand::BrandRepository`] - Brands (created on demand)
//! - [`tire_size::TireSizeRepository`] - Size choices
//! - [`rack::RackRepository`] - Racks, bulk creation, overview
//! - [`tire::TireRepository`] - Tire lifecycle
//! - [`history::HistoryRepository`] - Exit/replace audit log

pub mod brand;
pub mod customer;
pub mod history;
pub mod rack;
pub mod tire;
pub mod tire_size;

use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::error::DbResult;

/// Opens a transaction that holds the database write lock from its start.
pub(crate) async fn begin_write(pool: &SqlitePool) -> DbResult<Transaction<'static, Sqlite>> {
    Ok(pool.begin_with("BEGIN IMMEDIATE").await?)
}

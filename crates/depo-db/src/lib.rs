//! # depo-db: Database Layer for Lastik Depo
//!
//! This crate provides database access for the depot. It uses SQLite with
//! sqlx for async operations and applies the depo-core status rules inside
//! transactions.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Lastik Depo Data Flow                            │
//! │                                                                         │
//! │  HTTP route (POST /lastik/{id}/cikis)                                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     depo-db (THIS CRATE)                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ CustomerRepo  │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ RackRepo      │    │ 001_initial  │  │   │
//! │  │   │ DbConfig      │    │ TireRepo      │    │  _schema.sql │  │   │
//! │  │   │ DepotSettings │    │ HistoryRepo   │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │                     ./lastik_depo.db                            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`config`] - `DEPO_*` environment settings
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use depo_db::{Database, DepotSettings};
//!
//! let settings = DepotSettings::from_env()?;
//! let db = Database::new(settings.db_config()).await?;
//!
//! let tire = db.tires().exit(tire_id, None).await?;
//! let hits = db.tires().search(&query, &settings.search_context()).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{ConfigError, DepotSettings};
pub use error::{DbError, DbResult, ErrorKind};
pub use pool::{Database, DbConfig, Storage};

// Repository re-exports for convenience
pub use repository::brand::BrandRepository;
pub use repository::customer::CustomerRepository;
pub use repository::history::HistoryRepository;
pub use repository::rack::RackRepository;
pub use repository::tire::TireRepository;
pub use repository::tire_size::TireSizeRepository;

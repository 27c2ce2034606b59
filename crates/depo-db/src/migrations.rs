//! # Schema Migrations
//!
//! The SQL files under `migrations/sqlite` are compiled into the binary and
//! applied by [`Database::new`](crate::Database::new).
//!
//! ```text
//! 001_initial_schema.sql
//!   customers ─┬─< tires >── racks        tires.customer_id  ON DELETE CASCADE
//!              │     └────── brands       tires.rack_id      ON DELETE RESTRICT
//!              └─< tire_history           history.*_id       ON DELETE SET NULL
//!   tire_sizes (reference list)
//!
//! 002_rack_used.sql
//!   racks.used   set when a tire is first placed, never cleared
//! ```
//!
//! Applied files are checksummed in `_sqlx_migrations`; add a new numbered
//! file instead of editing one. Code columns must use the same codes as the
//! `coded_enum!` declarations in depo-core.

use sqlx::migrate::Migrator;
use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::error::DbResult;

pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies every pending migration, each in its own transaction.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    debug!(embedded = MIGRATOR.migrations.len(), "Applying depot migrations");
    MIGRATOR.run(pool).await?;
    Ok(())
}

/// (embedded, applied) counts. A missing bookkeeping table counts as zero
/// applied.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let embedded = MIGRATOR.migrations.len();

    let applied = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1",
    )
    .fetch_one(pool)
    .await
    .unwrap_or_else(|e| {
        warn!(error = %e, "Cannot read _sqlx_migrations");
        0
    });

    Ok((embedded, usize::try_from(applied).unwrap_or(0)))
}

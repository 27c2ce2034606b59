//! # Tire Size Repository
//!
//! Reference list of sizes offered in the intake form. Tires store their
//! size as text and do not reference this table.

use sqlx::SqlitePool;
use tracing::{debug, info};

use super::begin_write;
use crate::error::{DbError, DbResult};
use depo_core::validation::validate_tire_size;
use depo_core::{TireSize, DEFAULT_TIRE_SIZES};

/// Repository for tire size database operations.
#[derive(Debug, Clone)]
pub struct TireSizeRepository {
    pool: SqlitePool,
}

impl TireSizeRepository {
    /// Creates a new TireSizeRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TireSizeRepository { pool }
    }

    /// Lists all sizes ordered by size string.
    pub async fn list(&self) -> DbResult<Vec<TireSize>> {
        let sizes =
            sqlx::query_as::<_, TireSize>("SELECT id, size FROM tire_sizes ORDER BY size")
                .fetch_all(&self.pool)
                .await?;
        Ok(sizes)
    }

    /// Adds a size. The value is trimmed first.
    ///
    /// ## Errors
    /// - `Validation` for a blank size
    /// - `UniqueViolation` when the size already exists
    pub async fn create(&self, size: &str) -> DbResult<TireSize> {
        validate_tire_size(size)?;
        let size = size.trim();

        debug!(size = %size, "Creating tire size");

        let id = sqlx::query("INSERT INTO tire_sizes (size) VALUES (?1)")
            .bind(size)
            .execute(&self.pool)
            .await
            .map_err(|e| match DbError::from(e) {
                DbError::UniqueViolation { field, .. } => DbError::duplicate(field, size),
                other => other,
            })?
            .last_insert_rowid();

        Ok(TireSize {
            id,
            size: size.to_string(),
        })
    }

    /// Inserts the default sizes. Existing sizes are left alone.
    ///
    /// ## Returns
    /// Number of sizes inserted.
    pub async fn ensure_defaults(&self) -> DbResult<u64> {
        let mut tx = begin_write(&self.pool).await?;
        let mut inserted = 0;

        for size in DEFAULT_TIRE_SIZES {
            let result = sqlx::query("INSERT OR IGNORE INTO tire_sizes (size) VALUES (?1)")
                .bind(*size)
                .execute(&mut *tx)
                .await?;
            inserted += result.rows_affected();
        }

        tx.commit().await?;
        info!(inserted, "Default tire sizes ensured");
        Ok(inserted)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

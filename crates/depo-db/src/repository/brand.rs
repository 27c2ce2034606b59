//! # Brand Repository
//!
//! Tire brands. A tire names its brand as free text; unknown names are
//! inserted on the fly inside the tire's transaction.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use super::begin_write;
use crate::error::DbResult;
use depo_core::validation::validate_brand_name;
use depo_core::{Brand, DEFAULT_BRANDS};

/// Repository for brand database operations.
#[derive(Debug, Clone)]
pub struct BrandRepository {
    pool: SqlitePool,
}

impl BrandRepository {
    /// Creates a new BrandRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BrandRepository { pool }
    }

    /// Lists all brands ordered by name.
    pub async fn list(&self) -> DbResult<Vec<Brand>> {
        let brands = sqlx::query_as::<_, Brand>("SELECT id, name FROM brands ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(brands)
    }

    /// Returns the brand called `name`, inserting it when missing.
    pub async fn get_or_create(&self, name: &str) -> DbResult<Brand> {
        let mut conn = self.pool.acquire().await?;
        resolve(&mut *conn, name).await
    }

    /// Inserts the default brand list. Existing names are left alone.
    ///
    /// ## Returns
    /// Number of brands inserted.
    pub async fn ensure_defaults(&self) -> DbResult<u64> {
        let mut tx = begin_write(&self.pool).await?;
        let mut inserted = 0;

        for name in DEFAULT_BRANDS {
            let result = sqlx::query("INSERT OR IGNORE INTO brands (name) VALUES (?1)")
                .bind(*name)
                .execute(&mut *tx)
                .await?;
            inserted += result.rows_affected();
        }

        tx.commit().await?;
        info!(inserted, "Default brands ensured");
        Ok(inserted)
    }
}

/// Finds or inserts a brand on an open connection or transaction.
pub(crate) async fn resolve(conn: &mut SqliteConnection, name: &str) -> DbResult<Brand> {
    validate_brand_name(name)?;
    let name = name.trim();

    let existing = sqlx::query_as::<_, Brand>("SELECT id, name FROM brands WHERE name = ?1")
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?;

    if let Some(brand) = existing {
        return Ok(brand);
    }

    debug!(name = %name, "Creating brand");

    let id = sqlx::query("INSERT INTO brands (name) VALUES (?1)")
        .bind(name)
        .execute(&mut *conn)
        .await?
        .last_insert_rowid();

    Ok(Brand {
        id,
        name: name.to_string(),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

//! # Rack Repository
//!
//! Database operations for storage racks.
//!
//! ## Occupancy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  racks.status is stored, but only tire operations write it:            │
//! │                                                                         │
//! │  force_full(rack)        create / replace target / move target         │
//! │                          also sets racks.used = 1 (never cleared)      │
//! │  recompute_status(rack)  exit / delete / move source / customer delete │
//! │                          SELECT COUNT(*) ... status = 'DEPODA'         │
//! │                          0 → BOS, otherwise DOLU                        │
//! │                                                                         │
//! │  create/update never accept a status from the caller.                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Deletion Guard
//! A rack can be deleted only if no tire was ever placed in it (`used` is
//! still 0 and no tire row points at it) and it is not Full. Deleting the
//! tire or its customer later does not lift the guard.

use sqlx::{SqliteConnection, SqlitePool};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use super::begin_write;
use crate::error::{DbError, DbResult};
use depo_core::lifecycle::RackEffect;
use depo_core::search::{customer_display, group_racks};
use depo_core::validation::{validate_bulk_count, validate_rack, validate_rack_prefix};
use depo_core::{NewRack, Rack, RackGroup, RackOverview, RackStatus, TireStatus};

const RACK_COLUMNS: &str = "id, code, status, note";

/// Repository for rack database operations.
#[derive(Debug, Clone)]
pub struct RackRepository {
    pool: SqlitePool,
}

impl RackRepository {
    /// Creates a new RackRepository.
    pub fn new(pool: SqlitePool) -> Self {
        RackRepository { pool }
    }

    /// Creates a rack. New racks are always Empty.
    ///
    /// ## Errors
    /// - `Validation` for a malformed code or note
    /// - `UniqueViolation` when the code is taken
    pub async fn create(&self, input: &NewRack) -> DbResult<Rack> {
        validate_rack(input)?;
        let code = input.code.trim();

        debug!(code = %code, "Creating rack");

        let mut conn = self.pool.acquire().await?;
        insert(&mut *conn, code, input.note.as_deref()).await
    }

    /// Creates `PREFIX-n` racks up to `count`.
    ///
    /// ## Numbering
    /// ```text
    /// existing: A-1 a-2 A3 (legacy, no hyphen)     max_existing = 3
    /// create_bulk("A", 5)  →  A-4, A-5
    /// create_bulk("a", 5)  →  A-4, A-5             prefix is upper-cased
    /// create_bulk("A", 3)  →  Conflict (nothing to create)
    /// ```
    ///
    /// Existing codes are matched against the prefix ignoring ASCII case,
    /// the same way SQLite's `LIKE` selects them.
    ///
    /// ## Errors
    /// - `Validation` for a bad prefix or a count outside 1..=100
    /// - `Conflict` when `count` does not exceed the highest existing number
    pub async fn create_bulk(&self, prefix: &str, count: i64) -> DbResult<Vec<Rack>> {
        validate_rack_prefix(prefix)?;
        validate_bulk_count(count)?;
        let prefix = prefix.trim().to_ascii_uppercase();
        let prefix = prefix.as_str();

        let mut tx = begin_write(&self.pool).await?;

        let codes: Vec<String> = sqlx::query_scalar("SELECT code FROM racks WHERE code LIKE ?1")
            .bind(format!("{prefix}%"))
            .fetch_all(&mut *tx)
            .await?;

        let max_existing = codes
            .iter()
            .filter_map(|code| existing_rack_number(prefix, code))
            .max()
            .unwrap_or(0);

        let mut created = Vec::new();
        for n in (max_existing + 1)..=(count as u64) {
            let code = format!("{prefix}-{n}");
            if codes.iter().any(|c| c.eq_ignore_ascii_case(&code)) {
                continue;
            }
            created.push(insert(&mut *tx, &code, None).await?);
        }

        if created.is_empty() && count as u64 <= max_existing {
            warn!(prefix = %prefix, count, max_existing, "Bulk rack request creates nothing");
            return Err(DbError::conflict(format!(
                "'{prefix}' için {count} adet raf zaten mevcut. En yüksek numara: {max_existing}"
            )));
        }

        tx.commit().await?;

        info!(prefix = %prefix, created = created.len(), "Racks created");
        Ok(created)
    }

    /// Gets a rack by ID.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Rack> {
        let mut conn = self.pool.acquire().await?;
        fetch(&mut *conn, id).await
    }

    /// Lists all racks ordered by code.
    pub async fn list(&self) -> DbResult<Vec<Rack>> {
        let racks = sqlx::query_as::<_, Rack>(&format!(
            "SELECT {RACK_COLUMNS} FROM racks ORDER BY code"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(racks)
    }

    /// Lists Empty racks ordered by code (choices for a new tire).
    pub async fn list_empty(&self) -> DbResult<Vec<Rack>> {
        let racks = sqlx::query_as::<_, Rack>(&format!(
            "SELECT {RACK_COLUMNS} FROM racks WHERE status = ?1 ORDER BY code"
        ))
        .bind(RackStatus::Empty)
        .fetch_all(&self.pool)
        .await?;
        Ok(racks)
    }

    /// Changes a rack's code and note. Status is not editable.
    pub async fn update(&self, id: i64, input: &NewRack) -> DbResult<Rack> {
        validate_rack(input)?;
        let code = input.code.trim();

        let result = sqlx::query("UPDATE racks SET code = ?2, note = ?3 WHERE id = ?1")
            .bind(id)
            .bind(code)
            .bind(input.note.as_deref())
            .execute(&self.pool)
            .await
            .map_err(|e| unique_code(e, code))?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Rack", id));
        }

        debug!(id, code = %code, "Rack updated");
        self.get_by_id(id).await
    }

    /// Deletes a rack that no tire has ever used.
    ///
    /// ## Errors
    /// - `NotFound` for an unknown id
    /// - `Conflict` when a tire was ever placed in the rack or it is Full
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        let mut tx = begin_write(&self.pool).await?;

        let rack = fetch(&mut *tx, id).await?;
        ensure_deletable(&mut *tx, &rack).await?;

        sqlx::query("DELETE FROM racks WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        info!(id, code = %rack.code, "Rack deleted");
        Ok(())
    }

    /// Deletes several racks. If any of them fails the guard, none is
    /// deleted. Unknown ids are skipped.
    ///
    /// ## Returns
    /// Number of racks deleted.
    pub async fn delete_bulk(&self, ids: &[i64]) -> DbResult<u64> {
        let mut tx = begin_write(&self.pool).await?;

        let mut racks = Vec::with_capacity(ids.len());
        for id in ids {
            match fetch(&mut *tx, *id).await {
                Ok(rack) => racks.push(rack),
                Err(DbError::NotFound { .. }) => continue,
                Err(e) => return Err(e),
            }
        }

        if racks.is_empty() {
            return Err(DbError::not_found("Rack", format!("{ids:?}")));
        }

        for rack in &racks {
            ensure_deletable(&mut *tx, rack).await?;
        }

        for rack in &racks {
            sqlx::query("DELETE FROM racks WHERE id = ?1")
                .bind(rack.id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        info!(count = racks.len(), "Racks deleted");
        Ok(racks.len() as u64)
    }

    /// All racks with occupancy, grouped by code prefix.
    pub async fn overview(&self) -> DbResult<Vec<RackGroup>> {
        let racks = self.list().await?;

        let occupants: Vec<(i64, String)> = sqlx::query_as(
            r#"
            SELECT t.rack_id, c.name
            FROM tires t
            INNER JOIN customers c ON c.id = t.customer_id
            WHERE t.status = ?1
            ORDER BY t.entry_at, t.id
            "#,
        )
        .bind(TireStatus::InDepot)
        .fetch_all(&self.pool)
        .await?;

        let mut by_rack: HashMap<i64, Vec<&str>> = HashMap::new();
        for (rack_id, name) in &occupants {
            by_rack.entry(*rack_id).or_default().push(name.as_str());
        }

        let overview = racks
            .into_iter()
            .map(|rack| {
                let names = by_rack.get(&rack.id).map(Vec::as_slice).unwrap_or(&[]);
                RackOverview {
                    tire_count: names.len() as i64,
                    customer_display: customer_display(names.iter().copied()),
                    rack,
                }
            })
            .collect();

        Ok(group_racks(overview))
    }
}

// =============================================================================
// Transaction Helpers
// =============================================================================

/// Loads a rack on an open connection or transaction.
pub(crate) async fn fetch(conn: &mut SqliteConnection, id: i64) -> DbResult<Rack> {
    sqlx::query_as::<_, Rack>(&format!("SELECT {RACK_COLUMNS} FROM racks WHERE id = ?1"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("Rack", id))
}

/// Marks a rack Full without counting and records that it has been used.
pub(crate) async fn force_full(conn: &mut SqliteConnection, id: i64) -> DbResult<()> {
    let result = sqlx::query("UPDATE racks SET status = ?2, used = 1 WHERE id = ?1")
        .bind(id)
        .bind(RackStatus::Full)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Rack", id));
    }
    Ok(())
}

/// Re-counts InDepot tires in the rack and stores the derived status.
pub(crate) async fn recompute_status(
    conn: &mut SqliteConnection,
    id: i64,
) -> DbResult<RackStatus> {
    let active: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM tires WHERE rack_id = ?1 AND status = ?2")
            .bind(id)
            .bind(TireStatus::InDepot)
            .fetch_one(&mut *conn)
            .await?;

    let status = RackStatus::from_active_count(active);
    set_status(conn, id, status).await?;

    debug!(rack_id = id, active, status = %status, "Rack status recomputed");
    Ok(status)
}

/// Applies one side of a tire operation to a rack.
pub(crate) async fn apply_effect(
    conn: &mut SqliteConnection,
    id: i64,
    effect: RackEffect,
) -> DbResult<()> {
    match effect {
        RackEffect::Untouched => Ok(()),
        RackEffect::ForceFull => force_full(conn, id).await,
        RackEffect::Recompute => recompute_status(conn, id).await.map(|_| ()),
    }
}

async fn set_status(conn: &mut SqliteConnection, id: i64, status: RackStatus) -> DbResult<()> {
    let result = sqlx::query("UPDATE racks SET status = ?2 WHERE id = ?1")
        .bind(id)
        .bind(status)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Rack", id));
    }
    Ok(())
}

async fn insert(conn: &mut SqliteConnection, code: &str, note: Option<&str>) -> DbResult<Rack> {
    let id = sqlx::query("INSERT INTO racks (code, status, note) VALUES (?1, ?2, ?3)")
        .bind(code)
        .bind(RackStatus::Empty)
        .bind(note)
        .execute(&mut *conn)
        .await
        .map_err(|e| unique_code(e, code))?
        .last_insert_rowid();

    Ok(Rack {
        id,
        code: code.to_string(),
        status: RackStatus::Empty,
        note: note.map(str::to_string),
    })
}

async fn ensure_deletable(conn: &mut SqliteConnection, rack: &Rack) -> DbResult<()> {
    let (used, referenced): (bool, i64) = sqlx::query_as(
        "SELECT used, (SELECT COUNT(*) FROM tires WHERE rack_id = ?1) FROM racks WHERE id = ?1",
    )
    .bind(rack.id)
    .fetch_one(&mut *conn)
    .await?;

    if used || referenced > 0 {
        warn!(code = %rack.code, referenced, "Refusing to delete used rack");
        return Err(DbError::conflict(format!(
            "'{}' rafı kullanılmış olduğu için silinemez",
            rack.code
        )));
    }

    if rack.status == RackStatus::Full {
        warn!(code = %rack.code, "Refusing to delete full rack");
        return Err(DbError::conflict(format!(
            "'{}' rafı dolu olduğu için silinemez",
            rack.code
        )));
    }

    Ok(())
}

fn unique_code(err: sqlx::Error, code: &str) -> DbError {
    match DbError::from(err) {
        DbError::UniqueViolation { .. } => DbError::duplicate("code", code),
        other => other,
    }
}

/// Number of an existing rack under `prefix`: "A-4", "a-4" and legacy "A4"
/// → 4.
fn existing_rack_number(prefix: &str, code: &str) -> Option<u64> {
    let head = code.get(..prefix.len())?;
    if !head.eq_ignore_ascii_case(prefix) {
        return None;
    }
    let rest = &code[prefix.len()..];
    let digits = rest.strip_prefix('-').unwrap_or(rest);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

// =============================================================================
// Unit Tests
// =============================================================================

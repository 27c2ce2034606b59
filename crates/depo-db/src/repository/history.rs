//! # History Repository
//!
//! Append-only log of exits and replacements. Rows are written only by
//! [`super::tire::TireRepository`] inside the same transaction as the
//! status change; this repository reads them back.
//!
//! ## Row Layout
//! ```text
//! tire_history
//! ├── customer_id (SET NULL on customer delete), customer_name, plate, phone
//! ├── action CIKIS | DEGISIM, occurred_at
//! ├── old_*  tire_id (SET NULL), serial_no, slots JSON, brand, season, entry_at
//! ├── new_*  same columns, NULL for CIKIS
//! └── rack_code, note
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use depo_core::search::HistoryQuery;
use depo_core::{
    HistoryAction, HistoryEntry, HistoryRecord, SearchContext, Season, SlotSnapshot, TireSnapshot,
};

const HISTORY_SELECT: &str = r#"
    SELECT
        id, customer_id, customer_name, plate, phone, action, occurred_at,
        old_tire_id, old_serial_no, old_slots, old_brand, old_season, old_entry_at,
        new_tire_id, new_serial_no, new_slots, new_brand, new_season, new_entry_at,
        rack_code, note
    FROM tire_history
"#;

#[derive(Debug, sqlx::FromRow)]
struct HistoryRow {
    id: i64,
    customer_id: Option<i64>,
    customer_name: String,
    plate: String,
    phone: String,
    action: HistoryAction,
    occurred_at: DateTime<Utc>,
    old_tire_id: Option<i64>,
    old_serial_no: i64,
    old_slots: String,
    old_brand: String,
    old_season: Season,
    old_entry_at: DateTime<Utc>,
    new_tire_id: Option<i64>,
    new_serial_no: Option<i64>,
    new_slots: Option<String>,
    new_brand: Option<String>,
    new_season: Option<Season>,
    new_entry_at: Option<DateTime<Utc>>,
    rack_code: String,
    note: Option<String>,
}

fn decode_slots(id: i64, json: &str) -> DbResult<Vec<SlotSnapshot>> {
    serde_json::from_str(json).map_err(|e| DbError::Decode(format!("history {id} slots: {e}")))
}

impl TryFrom<HistoryRow> for HistoryEntry {
    type Error = DbError;

    fn try_from(row: HistoryRow) -> Result<Self, Self::Error> {
        let old = TireSnapshot {
            tire_id: row.old_tire_id,
            serial_no: row.old_serial_no,
            slots: decode_slots(row.id, &row.old_slots)?,
            brand: row.old_brand,
            season: row.old_season,
            entry_at: row.old_entry_at,
        };

        let new = match (
            row.new_serial_no,
            row.new_slots,
            row.new_brand,
            row.new_season,
            row.new_entry_at,
        ) {
            (None, ..) => None,
            (Some(serial_no), Some(slots), Some(brand), Some(season), Some(entry_at)) => {
                Some(TireSnapshot {
                    tire_id: row.new_tire_id,
                    serial_no,
                    slots: decode_slots(row.id, &slots)?,
                    brand,
                    season,
                    entry_at,
                })
            }
            _ => {
                return Err(DbError::Decode(format!(
                    "history {} has an incomplete new-tire snapshot",
                    row.id
                )))
            }
        };

        Ok(HistoryEntry {
            id: row.id,
            record: HistoryRecord {
                customer_id: row.customer_id,
                customer_name: row.customer_name,
                plate: row.plate,
                phone: row.phone,
                action: row.action,
                occurred_at: row.occurred_at,
                old,
                new,
                rack_code: row.rack_code,
                note: row.note,
            },
        })
    }
}

/// Repository for tire history reads.
#[derive(Debug, Clone)]
pub struct HistoryRepository {
    pool: SqlitePool,
}

impl HistoryRepository {
    /// Creates a new HistoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        HistoryRepository { pool }
    }

    /// History page: filtered, newest first, paged with `skip`/`limit`.
    pub async fn search(
        &self,
        query: &HistoryQuery,
        ctx: &SearchContext,
    ) -> DbResult<Vec<HistoryEntry>> {
        query.validate()?;
        debug!(?query, "Searching history");

        let rows = sqlx::query_as::<_, HistoryRow>(&format!(
            "{HISTORY_SELECT} WHERE (?1 IS NULL OR old_serial_no = ?1 OR new_serial_no = ?1)"
        ))
        .bind(query.serial_no)
        .fetch_all(&self.pool)
        .await?;

        let entries = rows
            .into_iter()
            .map(HistoryEntry::try_from)
            .collect::<DbResult<Vec<_>>>()?;

        Ok(query.apply(entries, ctx))
    }

    /// Gets one history entry.
    pub async fn get_by_id(&self, id: i64) -> DbResult<HistoryEntry> {
        let row = sqlx::query_as::<_, HistoryRow>(&format!("{HISTORY_SELECT} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("History", id))?;

        row.try_into()
    }

    /// Number of history rows.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tire_history")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

/// Appends a record inside the caller's transaction.
pub(crate) async fn insert(conn: &mut SqliteConnection, record: &HistoryRecord) -> DbResult<i64> {
    let old_slots = serde_json::to_string(&record.old.slots)?;
    let new_slots = record
        .new
        .as_ref()
        .map(|n| serde_json::to_string(&n.slots))
        .transpose()?;
    let new = record.new.as_ref();

    let id = sqlx::query(
        r#"
        INSERT INTO tire_history (
            customer_id, customer_name, plate, phone, action, occurred_at,
            old_tire_id, old_serial_no, old_slots, old_brand, old_season, old_entry_at,
            new_tire_id, new_serial_no, new_slots, new_brand, new_season, new_entry_at,
            rack_code, note
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5, ?6,
            ?7, ?8, ?9, ?10, ?11, ?12,
            ?13, ?14, ?15, ?16, ?17, ?18,
            ?19, ?20
        )
        "#,
    )
    .bind(record.customer_id)
    .bind(&record.customer_name)
    .bind(&record.plate)
    .bind(&record.phone)
    .bind(record.action)
    .bind(record.occurred_at)
    .bind(record.old.tire_id)
    .bind(record.old.serial_no)
    .bind(old_slots)
    .bind(&record.old.brand)
    .bind(record.old.season)
    .bind(record.old.entry_at)
    .bind(new.and_then(|n| n.tire_id))
    .bind(new.map(|n| n.serial_no))
    .bind(new_slots)
    .bind(new.map(|n| n.brand.clone()))
    .bind(new.map(|n| n.season))
    .bind(new.map(|n| n.entry_at))
    .bind(&record.rack_code)
    .bind(record.note.as_deref())
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();

    debug!(
        id,
        action = %record.action,
        old_serial_no = record.old.serial_no,
        new_serial_no = ?record.new_serial_no(),
        "History recorded"
    );
    Ok(id)
}

// =============================================================================
// Unit Tests
// =============================================================================

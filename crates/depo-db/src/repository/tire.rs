//! # Tire Repository
//!
//! Database operations for tire sets, including the status transitions.
//!
//! ## Tire Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tire Lifecycle                                   │
//! │                                                                         │
//! │  1. CREATE                                                             │
//! │     └── create() → Tire { status: Depoda, serial_no: max + 1 }         │
//! │     └── target rack forced Dolu                                        │
//! │                                                                         │
//! │  2. EDIT (optional, any number of times)                               │
//! │     └── update() → attributes only, never status                       │
//! │     └── Depoda tire moved: new rack Dolu, old rack recomputed          │
//! │                                                                         │
//! │  3a. EXIT                                                              │
//! │     └── exit() → Tire { status: Çıkmış, exit_at: now }                 │
//! │     └── rack recomputed, history row (Çıkış)                           │
//! │                                                                         │
//! │  3b. REPLACE                                                           │
//! │     └── replace() → old Tire { status: Değiştirildi }                  │
//! │                     new Tire { status: Depoda, serial_no: max + 1 }    │
//! │     └── old rack untouched, new rack Dolu, history row (Değişim)       │
//! │                                                                         │
//! │  Every numbered step is a single transaction.                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use super::{begin_write, brand, customer, history, rack};
use crate::error::{DbError, DbResult};
use depo_core::lifecycle::{ensure_transition, next_serial, TireOperation};
use depo_core::search::TireQuery;
use depo_core::validation::{validate_note, validate_tire_attributes};
use depo_core::{
    HistoryRecord, SearchContext, Season, StatusFilter, Tire, TireAttributes, TireDetail,
    TireSlot, TireStatus, TreadCondition,
};

const DETAIL_SELECT: &str = r#"
    SELECT
        t.id, t.serial_no, t.customer_id, t.brand_id, t.rack_id,
        t.size, t.season, t.tread_condition, t.note, t.slots, t.status,
        t.entry_at, t.exit_at,
        b.name  AS brand_name,
        r.code  AS rack_code,
        c.name  AS customer_name,
        c.phone AS customer_phone,
        c.plate AS customer_plate
    FROM tires t
    INNER JOIN brands b    ON b.id = t.brand_id
    INNER JOIN racks r     ON r.id = t.rack_id
    INNER JOIN customers c ON c.id = t.customer_id
"#;

/// Joined tire row as stored; slots are still JSON text.
#[derive(Debug, sqlx::FromRow)]
struct TireDetailRow {
    id: i64,
    serial_no: i64,
    customer_id: i64,
    brand_id: i64,
    rack_id: i64,
    size: String,
    season: Season,
    tread_condition: TreadCondition,
    note: Option<String>,
    slots: String,
    status: TireStatus,
    entry_at: DateTime<Utc>,
    exit_at: Option<DateTime<Utc>>,
    brand_name: String,
    rack_code: String,
    customer_name: String,
    customer_phone: String,
    customer_plate: String,
}

impl TryFrom<TireDetailRow> for TireDetail {
    type Error = DbError;

    fn try_from(row: TireDetailRow) -> Result<Self, Self::Error> {
        let slots: Vec<TireSlot> = serde_json::from_str(&row.slots)
            .map_err(|e| DbError::Decode(format!("tire {} slots: {e}", row.serial_no)))?;

        Ok(TireDetail {
            tire: Tire {
                id: row.id,
                serial_no: row.serial_no,
                customer_id: row.customer_id,
                brand_id: row.brand_id,
                rack_id: row.rack_id,
                size: row.size,
                season: row.season,
                condition: row.tread_condition,
                note: row.note,
                slots,
                status: row.status,
                entry_at: row.entry_at,
                exit_at: row.exit_at,
            },
            brand_name: row.brand_name,
            rack_code: row.rack_code,
            customer_name: row.customer_name,
            customer_phone: row.customer_phone,
            customer_plate: row.customer_plate,
        })
    }
}

/// Repository for tire database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.tires();
///
/// let tire = repo.create(&attrs).await?;
/// let exited = repo.exit(tire.id, Some("teslim edildi".into())).await?;
/// ```
#[derive(Debug, Clone)]
pub struct TireRepository {
    pool: SqlitePool,
}

impl TireRepository {
    /// Creates a new TireRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TireRepository { pool }
    }

    /// Stores a new tire set.
    ///
    /// ## What This Does
    /// 1. Checks customer and rack exist
    /// 2. Resolves the brand by name (creates it if missing)
    /// 3. Assigns the next serial number
    /// 4. Inserts the tire as Depoda and forces the rack to Dolu
    ///
    /// ## Errors
    /// - `NotFound` for a missing customer or rack
    /// - `Validation` for bad attributes
    pub async fn create(&self, attrs: &TireAttributes) -> DbResult<Tire> {
        validate_tire_attributes(attrs)?;

        let mut tx = begin_write(&self.pool).await?;
        let tire = insert_tire(&mut *tx, attrs).await?;
        let op = TireOperation::Create;
        rack::apply_effect(&mut *tx, tire.rack_id, op.target_rack_effect()).await?;
        tx.commit().await?;

        info!(
            id = tire.id,
            serial_no = tire.serial_no,
            rack_id = tire.rack_id,
            "Tire stored"
        );
        Ok(tire)
    }

    /// Gets a tire with its display names.
    pub async fn get(&self, id: i64) -> DbResult<TireDetail> {
        let mut conn = self.pool.acquire().await?;
        fetch_detail(&mut *conn, id).await
    }

    /// Gets a tire by its depot serial number.
    pub async fn get_by_serial(&self, serial_no: i64) -> DbResult<TireDetail> {
        let row = sqlx::query_as::<_, TireDetailRow>(&format!(
            "{DETAIL_SELECT} WHERE t.serial_no = ?1"
        ))
        .bind(serial_no)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Tire (serial)", serial_no))?;

        row.try_into()
    }

    /// Tire search page.
    ///
    /// Status and serial number narrow the SQL; the remaining filters, the
    /// ordering and the one-row-per-customer collapse run in depo-core.
    pub async fn search(&self, query: &TireQuery, ctx: &SearchContext) -> DbResult<Vec<TireDetail>> {
        query.validate()?;
        debug!(?query, "Searching tires");

        let status = match query.status {
            StatusFilter::All => None,
            StatusFilter::Only(status) => Some(status),
        };

        let rows = sqlx::query_as::<_, TireDetailRow>(&format!(
            r#"{DETAIL_SELECT}
            WHERE (?1 IS NULL OR t.status = ?1)
              AND (?2 IS NULL OR t.serial_no = ?2)"#
        ))
        .bind(status)
        .bind(query.serial_no)
        .fetch_all(&self.pool)
        .await?;

        let details = rows
            .into_iter()
            .map(TireDetail::try_from)
            .collect::<DbResult<Vec<_>>>()?;

        let hits = query.apply(details, ctx);
        debug!(count = hits.len(), "Tire search returned rows");
        Ok(hits)
    }

    /// All tires of a customer, newest first.
    pub async fn list_for_customer(&self, customer_id: i64) -> DbResult<Vec<TireDetail>> {
        let rows = sqlx::query_as::<_, TireDetailRow>(&format!(
            "{DETAIL_SELECT} WHERE t.customer_id = ?1 ORDER BY t.serial_no DESC"
        ))
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        let mut details = rows
            .into_iter()
            .map(TireDetail::try_from)
            .collect::<DbResult<Vec<_>>>()?;
        details.sort_by(|a, b| b.tire.entry_at.cmp(&a.tire.entry_at));
        Ok(details)
    }

    /// Edits a tire's attributes. Status is never changed here.
    ///
    /// ## Rack Handling
    /// Only a Depoda tire occupies its rack. When such a tire moves, the
    /// new rack is forced Dolu and the old rack is recomputed.
    pub async fn update(&self, id: i64, attrs: &TireAttributes) -> DbResult<Tire> {
        validate_tire_attributes(attrs)?;

        let mut tx = begin_write(&self.pool).await?;

        let current = fetch_detail(&mut *tx, id).await?.tire;
        customer::fetch(&mut *tx, attrs.customer_id).await?;
        rack::fetch(&mut *tx, attrs.rack_id).await?;
        let brand = brand::resolve(&mut *tx, &attrs.brand).await?;
        let slots = serde_json::to_string(&attrs.slots)?;
        let entry_at = attrs.entry_at.unwrap_or(current.entry_at);

        sqlx::query(
            r#"
            UPDATE tires SET
                customer_id = ?2,
                brand_id = ?3,
                rack_id = ?4,
                size = ?5,
                season = ?6,
                tread_condition = ?7,
                note = ?8,
                slots = ?9,
                entry_at = ?10
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(attrs.customer_id)
        .bind(brand.id)
        .bind(attrs.rack_id)
        .bind(attrs.size.trim())
        .bind(attrs.season)
        .bind(attrs.condition)
        .bind(attrs.note.as_deref())
        .bind(slots)
        .bind(entry_at)
        .execute(&mut *tx)
        .await?;

        let moved = current.rack_id != attrs.rack_id;
        if current.status.is_active() && moved {
            let op = TireOperation::Move;
            rack::apply_effect(&mut *tx, attrs.rack_id, op.target_rack_effect()).await?;
            rack::apply_effect(&mut *tx, current.rack_id, op.source_rack_effect()).await?;
        }

        let updated = fetch_detail(&mut *tx, id).await?.tire;
        tx.commit().await?;

        debug!(id, moved, "Tire updated");
        Ok(updated)
    }

    /// Hands a tire back to its customer.
    ///
    /// ## Errors
    /// - `NotFound` for an unknown id
    /// - `InvalidState` unless the tire is Depoda (nothing is written)
    pub async fn exit(&self, id: i64, note: Option<String>) -> DbResult<Tire> {
        validate_note(note.as_deref())?;

        let mut tx = begin_write(&self.pool).await?;

        let detail = fetch_detail(&mut *tx, id).await?;
        if let Err(e) = ensure_transition(&detail.tire, TireStatus::Exited) {
            warn!(id, status = %detail.tire.status, "Exit refused");
            return Err(e.into());
        }

        let now = Utc::now();
        set_status(&mut *tx, id, TireStatus::Exited, now).await?;
        let op = TireOperation::Exit;
        rack::apply_effect(&mut *tx, detail.tire.rack_id, op.source_rack_effect()).await?;

        let record = HistoryRecord::exit(&detail, note, now);
        history::insert(&mut *tx, &record).await?;

        tx.commit().await?;

        info!(id, serial_no = detail.tire.serial_no, "Tire exited");

        let mut tire = detail.tire;
        tire.status = TireStatus::Exited;
        tire.exit_at = Some(now);
        Ok(tire)
    }

    /// Swaps a stored tire for a new set.
    ///
    /// ## What This Does
    /// 1. Marks the old tire Değiştirildi (its rack keeps its status)
    /// 2. Stores the new set as Depoda with the next serial number
    /// 3. Forces the new set's rack to Dolu
    /// 4. Writes one Değişim history row linking both serial numbers
    ///
    /// ## Returns
    /// The new tire.
    pub async fn replace(
        &self,
        old_id: i64,
        attrs: &TireAttributes,
        note: Option<String>,
    ) -> DbResult<Tire> {
        validate_tire_attributes(attrs)?;
        validate_note(note.as_deref())?;

        let mut tx = begin_write(&self.pool).await?;

        let old = fetch_detail(&mut *tx, old_id).await?;
        if let Err(e) = ensure_transition(&old.tire, TireStatus::Replaced) {
            warn!(id = old_id, status = %old.tire.status, "Replace refused");
            return Err(e.into());
        }

        let now = Utc::now();
        set_status(&mut *tx, old_id, TireStatus::Replaced, now).await?;
        let op = TireOperation::Replace;
        rack::apply_effect(&mut *tx, old.tire.rack_id, op.source_rack_effect()).await?;

        let new_tire = insert_tire(&mut *tx, attrs).await?;
        rack::apply_effect(&mut *tx, new_tire.rack_id, op.target_rack_effect()).await?;

        let new = fetch_detail(&mut *tx, new_tire.id).await?;
        let record = HistoryRecord::replace(&old, &new, note, now);
        history::insert(&mut *tx, &record).await?;

        tx.commit().await?;

        info!(
            old_serial_no = old.tire.serial_no,
            new_serial_no = new.tire.serial_no,
            "Tire replaced"
        );
        Ok(new.tire)
    }

    /// Deletes a tire and recomputes its rack.
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        let mut tx = begin_write(&self.pool).await?;

        let tire = fetch_detail(&mut *tx, id).await?.tire;

        sqlx::query("DELETE FROM tires WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let op = TireOperation::Delete;
        rack::apply_effect(&mut *tx, tire.rack_id, op.source_rack_effect()).await?;

        tx.commit().await?;
        info!(id, serial_no = tire.serial_no, "Tire deleted");
        Ok(())
    }

    /// Highest serial number in use.
    pub async fn max_serial(&self) -> DbResult<Option<i64>> {
        let mut conn = self.pool.acquire().await?;
        current_max_serial(&mut *conn).await
    }

    /// Number of tire rows.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tires")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

// =============================================================================
// Transaction Helpers
// =============================================================================

/// Loads a tire with display names on an open connection or transaction.
pub(crate) async fn fetch_detail(conn: &mut SqliteConnection, id: i64) -> DbResult<TireDetail> {
    let row = sqlx::query_as::<_, TireDetailRow>(&format!("{DETAIL_SELECT} WHERE t.id = ?1"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("Tire", id))?;

    row.try_into()
}

async fn current_max_serial(conn: &mut SqliteConnection) -> DbResult<Option<i64>> {
    let max: Option<i64> = sqlx::query_scalar("SELECT MAX(serial_no) FROM tires")
        .fetch_one(&mut *conn)
        .await?;
    Ok(max)
}

/// Inserts a Depoda tire with the next serial number. Rack status is left
/// to the caller.
async fn insert_tire(conn: &mut SqliteConnection, attrs: &TireAttributes) -> DbResult<Tire> {
    customer::fetch(&mut *conn, attrs.customer_id).await?;
    rack::fetch(&mut *conn, attrs.rack_id).await?;
    let brand = brand::resolve(&mut *conn, &attrs.brand).await?;

    let serial_no = next_serial(current_max_serial(&mut *conn).await?);
    let entry_at = attrs.entry_at.unwrap_or_else(Utc::now);
    let slots = serde_json::to_string(&attrs.slots)?;

    debug!(serial_no, customer_id = attrs.customer_id, "Inserting tire");

    let id = sqlx::query(
        r#"
        INSERT INTO tires (
            serial_no, customer_id, brand_id, rack_id,
            size, season, tread_condition, note, slots,
            status, entry_at, exit_at
        ) VALUES (
            ?1, ?2, ?3, ?4,
            ?5, ?6, ?7, ?8, ?9,
            ?10, ?11, NULL
        )
        "#,
    )
    .bind(serial_no)
    .bind(attrs.customer_id)
    .bind(brand.id)
    .bind(attrs.rack_id)
    .bind(attrs.size.trim())
    .bind(attrs.season)
    .bind(attrs.condition)
    .bind(attrs.note.as_deref())
    .bind(slots)
    .bind(TireStatus::InDepot)
    .bind(entry_at)
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();

    Ok(Tire {
        id,
        serial_no,
        customer_id: attrs.customer_id,
        brand_id: brand.id,
        rack_id: attrs.rack_id,
        size: attrs.size.trim().to_string(),
        season: attrs.season,
        condition: attrs.condition,
        note: attrs.note.clone(),
        slots: attrs.slots.clone(),
        status: TireStatus::InDepot,
        entry_at,
        exit_at: None,
    })
}

/// Moves a Depoda tire to a terminal status.
async fn set_status(
    conn: &mut SqliteConnection,
    id: i64,
    status: TireStatus,
    at: DateTime<Utc>,
) -> DbResult<()> {
    let result = sqlx::query("UPDATE tires SET status = ?2, exit_at = ?3 WHERE id = ?1 AND status = ?4")
        .bind(id)
        .bind(status)
        .bind(at)
        .bind(TireStatus::InDepot)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidState(format!(
            "Tire {id} is no longer {}",
            TireStatus::InDepot
        )));
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use depo_core::{NewCustomer, NewRack, RackStatus};

    async fn setup() -> (Database, i64, i64) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let customer = db
            .customers()
            .create(&NewCustomer {
                name: "Şeyma Öz".to_string(),
                phone: "05551234567".to_string(),
                plate: "34 SO 34".to_string(),
            })
            .await
            .unwrap();
        let rack = db
            .racks()
            .create(&NewRack {
                code: "A-1".to_string(),
                note: None,
            })
            .await
            .unwrap();
        (db, customer.id, rack.id)
    }

    fn attrs(customer_id: i64, rack_id: i64) -> TireAttributes {
        TireAttributes {
            customer_id,
            rack_id,
            brand: "Petlas".to_string(),
            size: "205/55 R16".to_string(),
            season: Season::Winter,
            condition: TreadCondition::Good,
            note: None,
            slots: vec![TireSlot {
                size: Some("205/55 R16".to_string()),
                production_year: Some("2322".to_string()),
                brand: None,
                season: None,
            }],
            entry_at: None,
        }
    }

    #[tokio::test]
    async fn test_create_assigns_serial_and_fills_rack() {
        let (db, customer_id, rack_id) = setup().await;

        let first = db.tires().create(&attrs(customer_id, rack_id)).await.unwrap();
        let second = db.tires().create(&attrs(customer_id, rack_id)).await.unwrap();
        assert_eq!(first.serial_no, 1);
        assert_eq!(second.serial_no, 2);
        assert_eq!(first.status, TireStatus::InDepot);

        let rack = db.racks().get_by_id(rack_id).await.unwrap();
        assert_eq!(rack.status, RackStatus::Full);

        let detail = db.tires().get(first.id).await.unwrap();
        assert_eq!(detail.brand_name, "Petlas");
        assert_eq!(detail.rack_code, "A-1");
        assert_eq!(detail.tire.slots.len(), 1);
        assert_eq!(db.tires().get_by_serial(2).await.unwrap().tire.id, second.id);
    }

    #[tokio::test]
    async fn test_create_requires_customer_and_rack() {
        let (db, customer_id, rack_id) = setup().await;

        let err = db.tires().create(&attrs(999, rack_id)).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { ref entity, .. } if entity == "Customer"));

        let err = db.tires().create(&attrs(customer_id, 999)).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { ref entity, .. } if entity == "Rack"));

        assert_eq!(db.tires().count().await.unwrap(), 0);
        assert_eq!(db.tires().max_serial().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_update_moves_rack_occupancy() {
        let (db, customer_id, rack_a) = setup().await;
        let rack_b = db
            .racks()
            .create(&NewRack {
                code: "A-2".to_string(),
                note: None,
            })
            .await
            .unwrap()
            .id;

        let tire = db.tires().create(&attrs(customer_id, rack_a)).await.unwrap();

        let mut edited = attrs(customer_id, rack_b);
        edited.note = Some("sağ ön yama".to_string());
        let updated = db.tires().update(tire.id, &edited).await.unwrap();

        assert_eq!(updated.rack_id, rack_b);
        assert_eq!(updated.status, TireStatus::InDepot);
        assert_eq!(updated.entry_at, tire.entry_at);
        assert_eq!(db.racks().get_by_id(rack_a).await.unwrap().status, RackStatus::Empty);
        assert_eq!(db.racks().get_by_id(rack_b).await.unwrap().status, RackStatus::Full);
    }

    #[tokio::test]
    async fn test_exit_twice_is_invalid_state() {
        let (db, customer_id, rack_id) = setup().await;
        let tire = db.tires().create(&attrs(customer_id, rack_id)).await.unwrap();

        let exited = db.tires().exit(tire.id, None).await.unwrap();
        assert_eq!(exited.status, TireStatus::Exited);
        assert!(exited.exit_at.is_some());

        let err = db.tires().exit(tire.id, None).await.unwrap_err();
        assert!(matches!(err, DbError::InvalidState(_)));
        assert_eq!(db.history().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete_recomputes_rack() {
        let (db, customer_id, rack_id) = setup().await;
        let tire = db.tires().create(&attrs(customer_id, rack_id)).await.unwrap();

        db.tires().delete(tire.id).await.unwrap();
        assert_eq!(db.racks().get_by_id(rack_id).await.unwrap().status, RackStatus::Empty);
        assert!(matches!(db.tires().get(tire.id).await, Err(DbError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_search_defaults_to_in_depot() {
        let (db, customer_id, rack_id) = setup().await;
        let tire = db.tires().create(&attrs(customer_id, rack_id)).await.unwrap();
        db.tires().exit(tire.id, None).await.unwrap();

        let ctx = SearchContext::local();
        let hits = db.tires().search(&TireQuery::default(), &ctx).await.unwrap();
        assert!(hits.is_empty());

        let all = TireQuery {
            status: StatusFilter::All,
            customer_name: Some("seyma".to_string()),
            ..TireQuery::default()
        };
        let hits = db.tires().search(&all, &ctx).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].tire.status, TireStatus::Exited);
    }
}

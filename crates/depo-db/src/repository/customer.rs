//! # Customer Repository
//!
//! Database operations for customers.
//!
//! ## Cascade on Delete
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  delete(customer)                        one transaction               │
//! │       │                                                                 │
//! │       ├── SELECT DISTINCT rack_id FROM tires WHERE customer_id = ?     │
//! │       ├── DELETE FROM customers        → tires removed by CASCADE      │
//! │       │                                → history.customer_id SET NULL  │
//! │       └── recompute_status(rack) for every rack collected above        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use super::{begin_write, rack};
use crate::error::{DbError, DbResult};
use depo_core::search::CustomerQuery;
use depo_core::validation::validate_customer;
use depo_core::{Customer, CustomerSummary, NewCustomer, TireStatus};

const CUSTOMER_COLUMNS: &str = "id, name, phone, plate, created_at";

/// Customer row joined with tire counts.
#[derive(Debug, sqlx::FromRow)]
struct CustomerCountsRow {
    id: i64,
    name: String,
    phone: String,
    plate: String,
    created_at: DateTime<Utc>,
    in_depot: i64,
    exited: i64,
    replaced: i64,
    total: i64,
}

impl From<CustomerCountsRow> for CustomerSummary {
    fn from(row: CustomerCountsRow) -> Self {
        CustomerSummary {
            customer: Customer {
                id: row.id,
                name: row.name,
                phone: row.phone,
                plate: row.plate,
                created_at: row.created_at,
            },
            in_depot: row.in_depot,
            exited: row.exited,
            replaced: row.replaced,
            total: row.total,
        }
    }
}

/// Key enforcing case-insensitive name uniqueness.
fn fold_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Repository for customer database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Creates a customer.
    ///
    /// ## Errors
    /// - `Validation` when name, phone or plate is blank
    /// - `UniqueViolation` when the name exists (ignoring case)
    pub async fn create(&self, input: &NewCustomer) -> DbResult<Customer> {
        validate_customer(input)?;
        let name = input.name.trim();
        let now = Utc::now();

        debug!(name = %name, "Creating customer");

        let id = sqlx::query(
            r#"
            INSERT INTO customers (name, name_folded, phone, plate, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(name)
        .bind(fold_name(name))
        .bind(input.phone.trim())
        .bind(input.plate.trim())
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| unique_name(e, name))?
        .last_insert_rowid();

        Ok(Customer {
            id,
            name: name.to_string(),
            phone: input.phone.trim().to_string(),
            plate: input.plate.trim().to_string(),
            created_at: now,
        })
    }

    /// Gets a customer by ID.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Customer> {
        let mut conn = self.pool.acquire().await?;
        fetch(&mut *conn, id).await
    }

    /// Updates name, phone and plate.
    pub async fn update(&self, id: i64, input: &NewCustomer) -> DbResult<Customer> {
        validate_customer(input)?;
        let name = input.name.trim();

        let result = sqlx::query(
            r#"
            UPDATE customers
            SET name = ?2, name_folded = ?3, phone = ?4, plate = ?5
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(fold_name(name))
        .bind(input.phone.trim())
        .bind(input.plate.trim())
        .execute(&self.pool)
        .await
        .map_err(|e| unique_name(e, name))?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", id));
        }

        self.get_by_id(id).await
    }

    /// Deletes a customer together with all of their tires.
    ///
    /// ## Returns
    /// Number of tires removed.
    pub async fn delete(&self, id: i64) -> DbResult<u64> {
        let mut tx = begin_write(&self.pool).await?;

        fetch(&mut *tx, id).await?;

        let rack_ids: Vec<i64> =
            sqlx::query_scalar("SELECT DISTINCT rack_id FROM tires WHERE customer_id = ?1")
                .bind(id)
                .fetch_all(&mut *tx)
                .await?;

        let tires: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tires WHERE customer_id = ?1")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM customers WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        for rack_id in &rack_ids {
            rack::recompute_status(&mut *tx, *rack_id).await?;
        }

        tx.commit().await?;

        info!(id, tires, racks = rack_ids.len(), "Customer deleted");
        Ok(tires as u64)
    }

    /// Lists customers ordered by name.
    pub async fn list(&self, skip: i64, limit: i64) -> DbResult<Vec<Customer>> {
        let customers = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers ORDER BY name_folded LIMIT ?1 OFFSET ?2"
        ))
        .bind(limit)
        .bind(skip)
        .fetch_all(&self.pool)
        .await?;
        Ok(customers)
    }

    /// Number of customers.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Customers matching `query`, with tire counts per status.
    pub async fn search(&self, query: &CustomerQuery) -> DbResult<Vec<CustomerSummary>> {
        query.validate()?;
        debug!(?query, "Searching customers");

        let rows = sqlx::query_as::<_, CustomerCountsRow>(
            r#"
            SELECT
                c.id, c.name, c.phone, c.plate, c.created_at,
                COALESCE(SUM(CASE WHEN t.status = ?1 THEN 1 ELSE 0 END), 0) AS in_depot,
                COALESCE(SUM(CASE WHEN t.status = ?2 THEN 1 ELSE 0 END), 0) AS exited,
                COALESCE(SUM(CASE WHEN t.status = ?3 THEN 1 ELSE 0 END), 0) AS replaced,
                COUNT(t.id) AS total
            FROM customers c
            LEFT JOIN tires t ON t.customer_id = c.id
            GROUP BY c.id
            "#,
        )
        .bind(TireStatus::InDepot)
        .bind(TireStatus::Exited)
        .bind(TireStatus::Replaced)
        .fetch_all(&self.pool)
        .await?;

        let hits = query.apply(rows.into_iter().map(CustomerSummary::from).collect());
        debug!(count = hits.len(), "Customer search returned rows");
        Ok(hits)
    }
}

/// Loads a customer on an open connection or transaction.
pub(crate) async fn fetch(conn: &mut SqliteConnection, id: i64) -> DbResult<Customer> {
    sqlx::query_as::<_, Customer>(&format!(
        "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| DbError::not_found("Customer", id))
}

fn unique_name(err: sqlx::Error, name: &str) -> DbError {
    match DbError::from(err) {
        DbError::UniqueViolation { .. } => DbError::duplicate("name", name),
        other => other,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

//! # Measurement DAO
//!
//! Database operations for the `measurements` table.
//!
//! ## Write Semantics
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  insert   INSERT … ON CONFLICT(id) DO UPDATE   row replaced in place │
//! │  update   UPDATE … WHERE id = ?                missing id → Ok(0)    │
//! │  delete   DELETE … WHERE id = ?                missing id → Ok(0)    │
//! │                                                                     │
//! │  owner_id must reference an existing item, otherwise the store      │
//! │  rejects the write with DbError::ForeignKeyViolation.               │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use futures::stream::BoxStream;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use crate::observer::{live_query, InvalidationTracker, Table};
use fastca_core::Measurement;

const COLUMNS: &str = "id, owner_id, name, length, width, count, created_at";

/// Data access for measurements.
#[derive(Debug, Clone)]
pub struct MeasurementDao {
    pool: SqlitePool,
    tracker: InvalidationTracker,
}

impl MeasurementDao {
    /// Creates a new MeasurementDao.
    pub fn new(pool: SqlitePool, tracker: InvalidationTracker) -> Self {
        MeasurementDao { pool, tracker }
    }

    /// Lists the measurements of one item, oldest first.
    pub async fn list_for_owner(&self, owner_id: &str) -> DbResult<Vec<Measurement>> {
        let measurements = sqlx::query_as::<_, Measurement>(&format!(
            "SELECT {COLUMNS} FROM measurements WHERE owner_id = ?1 ORDER BY created_at ASC"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(measurements)
    }

    /// Live version of [`MeasurementDao::list_for_owner`].
    pub fn observe_for_owner(
        &self,
        owner_id: impl Into<String>,
    ) -> BoxStream<'static, DbResult<Vec<Measurement>>> {
        let dao = self.clone();
        let owner_id = owner_id.into();
        live_query(&self.tracker, &[Table::Measurements], move || {
            let dao = dao.clone();
            let owner_id = owner_id.clone();
            async move { dao.list_for_owner(&owner_id).await }
        })
    }

    /// Gets a measurement by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Measurement>> {
        let measurement = sqlx::query_as::<_, Measurement>(&format!(
            "SELECT {COLUMNS} FROM measurements WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(measurement)
    }

    /// Inserts a measurement, replacing any row with the same id.
    ///
    /// ## Returns
    /// * `Ok(())` - Row stored
    /// * `Err(DbError::ForeignKeyViolation)` - Owner item does not exist
    pub async fn insert(&self, measurement: &Measurement) -> DbResult<()> {
        debug!(id = %measurement.id, owner_id = %measurement.owner_id, "Inserting measurement");

        sqlx::query(
            r#"
            INSERT INTO measurements (id, owner_id, name, length, width, count, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(id) DO UPDATE SET
                owner_id = excluded.owner_id,
                name = excluded.name,
                length = excluded.length,
                width = excluded.width,
                count = excluded.count,
                created_at = excluded.created_at
            "#,
        )
        .bind(&measurement.id)
        .bind(&measurement.owner_id)
        .bind(&measurement.name)
        .bind(measurement.length)
        .bind(measurement.width)
        .bind(measurement.count)
        .bind(measurement.created_at)
        .execute(&self.pool)
        .await?;

        self.tracker.notify(&[Table::Measurements]);
        Ok(())
    }

    /// Replaces every field of an existing measurement.
    ///
    /// An id that no longer exists is not an error: nothing is written and
    /// `Ok(0)` is returned.
    pub async fn update(&self, measurement: &Measurement) -> DbResult<u64> {
        debug!(id = %measurement.id, "Updating measurement");

        let result = sqlx::query(
            r#"
            UPDATE measurements SET
                owner_id = ?2,
                name = ?3,
                length = ?4,
                width = ?5,
                count = ?6,
                created_at = ?7
            WHERE id = ?1
            "#,
        )
        .bind(&measurement.id)
        .bind(&measurement.owner_id)
        .bind(&measurement.name)
        .bind(measurement.length)
        .bind(measurement.width)
        .bind(measurement.count)
        .bind(measurement.created_at)
        .execute(&self.pool)
        .await?;

        let rows = result.rows_affected();
        if rows > 0 {
            self.tracker.notify(&[Table::Measurements]);
        } else {
            debug!(id = %measurement.id, "Update matched no measurement");
        }

        Ok(rows)
    }

    /// Deletes a measurement by primary key.
    pub async fn delete(&self, measurement: &Measurement) -> DbResult<u64> {
        debug!(id = %measurement.id, "Deleting measurement");

        let result = sqlx::query("DELETE FROM measurements WHERE id = ?1")
            .bind(&measurement.id)
            .execute(&self.pool)
            .await?;

        let rows = result.rows_affected();
        if rows > 0 {
            self.tracker.notify(&[Table::Measurements]);
        }

        Ok(rows)
    }

    /// Counts the measurements of one item (for diagnostics).
    pub async fn count_for_owner(&self, owner_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM measurements WHERE owner_id = ?1")
            .bind(owner_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

//! # Item DAO
//!
//! Database operations for the `items` table.

use futures::stream::BoxStream;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use crate::observer::{live_query, InvalidationTracker, Table};
use fastca_core::Item;

/// Deleting an item also removes its measurements (ON DELETE CASCADE).
const DELETE_AFFECTS: &[Table] = &[Table::Items, Table::Measurements];

/// Data access for items.
///
/// ## Usage
/// ```rust,ignore
/// let dao = db.items();
///
/// dao.insert(&Item::new()).await?;
/// let mut items = dao.observe_all();
/// while let Some(snapshot) = items.next().await {
///     render(snapshot?);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ItemDao {
    pool: SqlitePool,
    tracker: InvalidationTracker,
}

impl ItemDao {
    /// Creates a new ItemDao.
    pub fn new(pool: SqlitePool, tracker: InvalidationTracker) -> Self {
        ItemDao { pool, tracker }
    }

    /// Lists every item ordered by id.
    pub async fn list(&self) -> DbResult<Vec<Item>> {
        let items = sqlx::query_as::<_, Item>("SELECT id FROM items ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;

        Ok(items)
    }

    /// Live version of [`ItemDao::list`].
    ///
    /// Emits the full current list immediately and after every change.
    pub fn observe_all(&self) -> BoxStream<'static, DbResult<Vec<Item>>> {
        let dao = self.clone();
        live_query(&self.tracker, &[Table::Items], move || {
            let dao = dao.clone();
            async move { dao.list().await }
        })
    }

    /// Gets an item by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Item))` - Item found
    /// * `Ok(None)` - Item not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Item>> {
        let item = sqlx::query_as::<_, Item>("SELECT id FROM items WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(item)
    }

    /// Live version of [`ItemDao::get_by_id`].
    ///
    /// Emits `None` while the item does not exist or after it is deleted.
    pub fn observe_by_id(&self, id: impl Into<String>) -> BoxStream<'static, DbResult<Option<Item>>> {
        let dao = self.clone();
        let id = id.into();
        live_query(&self.tracker, &[Table::Items], move || {
            let dao = dao.clone();
            let id = id.clone();
            async move { dao.get_by_id(&id).await }
        })
    }

    /// Inserts an item.
    ///
    /// Inserting an id that already exists keeps the stored row; the
    /// operation is idempotent and never touches the item's measurements.
    pub async fn insert(&self, item: &Item) -> DbResult<()> {
        debug!(id = %item.id, "Inserting item");

        let result = sqlx::query("INSERT INTO items (id) VALUES (?1) ON CONFLICT(id) DO NOTHING")
            .bind(&item.id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() > 0 {
            self.tracker.notify(&[Table::Items]);
        }

        Ok(())
    }

    /// Deletes an item by primary key.
    ///
    /// Its measurements are removed by the store in the same statement.
    ///
    /// ## Returns
    /// Number of items deleted (0 when the id did not exist).
    pub async fn delete(&self, item: &Item) -> DbResult<u64> {
        debug!(id = %item.id, "Deleting item");

        let result = sqlx::query("DELETE FROM items WHERE id = ?1")
            .bind(&item.id)
            .execute(&self.pool)
            .await?;

        let rows = result.rows_affected();
        if rows > 0 {
            self.tracker.notify(DELETE_AFFECTS);
        } else {
            debug!(id = %item.id, "Delete matched no item");
        }

        Ok(rows)
    }

    /// Counts items (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM items")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use futures::StreamExt;

    async fn dao() -> (Database, ItemDao) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let dao = db.items();
        (db, dao)
    }

    fn ids(items: &[Item]) -> Vec<&str> {
        items.iter().map(|i| i.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_list_is_ordered_by_id() {
        let (_db, dao) = dao().await;
        for id in ["c", "a", "b"] {
            dao.insert(&Item::with_id(id)).await.unwrap();
        }

        let items = dao.list().await.unwrap();
        assert_eq!(ids(&items), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_insert_is_idempotent() {
        let (_db, dao) = dao().await;
        let item = Item::with_id("A");

        dao.insert(&item).await.unwrap();
        dao.insert(&item).await.unwrap();

        assert_eq!(dao.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_get_and_delete() {
        let (_db, dao) = dao().await;
        let item = Item::new();
        dao.insert(&item).await.unwrap();

        assert_eq!(dao.get_by_id(&item.id).await.unwrap(), Some(item.clone()));
        assert_eq!(dao.delete(&item).await.unwrap(), 1);
        assert_eq!(dao.get_by_id(&item.id).await.unwrap(), None);

        // Second delete is a silent no-op
        assert_eq!(dao.delete(&item).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_observe_all_tracks_live_set() {
        let (_db, dao) = dao().await;
        let mut stream = dao.observe_all();

        assert!(stream.next().await.unwrap().unwrap().is_empty());

        dao.insert(&Item::with_id("b")).await.unwrap();
        assert_eq!(ids(&stream.next().await.unwrap().unwrap()), vec!["b"]);

        dao.insert(&Item::with_id("a")).await.unwrap();
        assert_eq!(ids(&stream.next().await.unwrap().unwrap()), vec!["a", "b"]);

        dao.delete(&Item::with_id("b")).await.unwrap();
        assert_eq!(ids(&stream.next().await.unwrap().unwrap()), vec!["a"]);
    }

    #[tokio::test]
    async fn test_observe_by_id_emits_absent_after_delete() {
        let (_db, dao) = dao().await;
        let mut stream = dao.observe_by_id("A");

        assert_eq!(stream.next().await.unwrap().unwrap(), None);

        dao.insert(&Item::with_id("A")).await.unwrap();
        assert_eq!(stream.next().await.unwrap().unwrap(), Some(Item::with_id("A")));

        dao.delete(&Item::with_id("A")).await.unwrap();
        assert_eq!(stream.next().await.unwrap().unwrap(), None);
    }
}

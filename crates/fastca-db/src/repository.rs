//! # Item Repository
//!
//! Single entry point for the state layer. Every method forwards to exactly
//! one DAO operation; nothing is cached, validated or reordered here.
//!
//! ```text
//! ┌───────────────────────────────┬────────────────────────────────────────┐
//! │  ItemRepository               │  DAO call                              │
//! ├───────────────────────────────┼────────────────────────────────────────┤
//! │  all_items()                  │  ItemDao::observe_all                  │
//! │  item_by_id(id)               │  ItemDao::observe_by_id                │
//! │  add_item(item)               │  ItemDao::insert                       │
//! │  delete_item(item)            │  ItemDao::delete                       │
//! │  measurements_for(owner)      │  MeasurementDao::observe_for_owner     │
//! │  add_measurement(m)           │  MeasurementDao::insert                │
//! │  update_measurement(m)        │  MeasurementDao::update                │
//! │  delete_measurement(m)        │  MeasurementDao::delete                │
//! └───────────────────────────────┴────────────────────────────────────────┘
//! ```

use futures::stream::BoxStream;

use crate::dao::item::ItemDao;
use crate::dao::measurement::MeasurementDao;
use crate::error::DbResult;
use fastca_core::{Item, Measurement};

/// Facade over [`ItemDao`] and [`MeasurementDao`].
#[derive(Debug, Clone)]
pub struct ItemRepository {
    items: ItemDao,
    measurements: MeasurementDao,
}

impl ItemRepository {
    /// Creates a repository over the given DAOs.
    pub fn new(items: ItemDao, measurements: MeasurementDao) -> Self {
        ItemRepository {
            items,
            measurements,
        }
    }

    /// Live list of all items, ordered by id.
    pub fn all_items(&self) -> BoxStream<'static, DbResult<Vec<Item>>> {
        self.items.observe_all()
    }

    /// Live lookup of one item; `None` while absent.
    pub fn item_by_id(&self, id: &str) -> BoxStream<'static, DbResult<Option<Item>>> {
        self.items.observe_by_id(id)
    }

    /// Stores a new item; an existing id is left untouched.
    pub async fn add_item(&self, item: &Item) -> DbResult<()> {
        self.items.insert(item).await
    }

    /// Deletes an item together with all its measurements.
    pub async fn delete_item(&self, item: &Item) -> DbResult<u64> {
        self.items.delete(item).await
    }

    /// Live list of one item's measurements, oldest first.
    pub fn measurements_for(&self, owner_id: &str) -> BoxStream<'static, DbResult<Vec<Measurement>>> {
        self.measurements.observe_for_owner(owner_id)
    }

    /// Stores a measurement, replacing any row with the same id.
    pub async fn add_measurement(&self, measurement: &Measurement) -> DbResult<()> {
        self.measurements.insert(measurement).await
    }

    /// Replaces a measurement; a missing id is a silent no-op.
    pub async fn update_measurement(&self, measurement: &Measurement) -> DbResult<u64> {
        self.measurements.update(measurement).await
    }

    /// Deletes one measurement.
    pub async fn delete_measurement(&self, measurement: &Measurement) -> DbResult<u64> {
        self.measurements.delete(measurement).await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use fastca_core::total_area;
    use futures::StreamExt;

    async fn repo() -> (Database, ItemRepository) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.repository();
        (db, repo)
    }

    #[tokio::test]
    async fn test_area_scenario() {
        let (_db, repo) = repo().await;
        let item = Item::with_id("A");
        repo.add_item(&item).await.unwrap();

        let m = Measurement {
            length: 1000.0,
            width: 2000.0,
            count: 3,
            ..Measurement::new("A")
        };
        repo.add_measurement(&m).await.unwrap();

        let mut measurements = repo.measurements_for("A");
        let list = measurements.next().await.unwrap().unwrap();
        assert_eq!(list.len(), 1);
        assert!((total_area(&list) - 6.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_delete_item_cascades() {
        let (db, repo) = repo().await;
        let item = Item::with_id("A");
        repo.add_item(&item).await.unwrap();
        for _ in 0..3 {
            repo.add_measurement(&Measurement::new("A")).await.unwrap();
        }
        assert_eq!(db.measurements().count_for_owner("A").await.unwrap(), 3);

        assert_eq!(repo.delete_item(&item).await.unwrap(), 1);

        assert_eq!(db.measurements().count_for_owner("A").await.unwrap(), 0);
        let mut items = repo.all_items();
        assert!(items.next().await.unwrap().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_readding_item_keeps_measurements() {
        let (db, repo) = repo().await;
        let item = Item::with_id("A");
        repo.add_item(&item).await.unwrap();
        repo.add_measurement(&Measurement::new("A")).await.unwrap();

        repo.add_item(&item).await.unwrap();

        assert_eq!(db.measurements().count_for_owner("A").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_after_concurrent_delete_is_noop() {
        let (db, repo) = repo().await;
        repo.add_item(&Item::with_id("A")).await.unwrap();
        let m = Measurement::new("A");
        repo.add_measurement(&m).await.unwrap();

        repo.delete_measurement(&m).await.unwrap();
        let edited = Measurement {
            name: "late edit".to_string(),
            ..m.clone()
        };
        assert_eq!(repo.update_measurement(&edited).await.unwrap(), 0);
        assert_eq!(db.measurements().get_by_id(&m.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_item_by_id_follows_writes() {
        let (_db, repo) = repo().await;
        let mut stream = repo.item_by_id("A");
        assert_eq!(stream.next().await.unwrap().unwrap(), None);

        repo.add_item(&Item::with_id("A")).await.unwrap();
        assert_eq!(stream.next().await.unwrap().unwrap(), Some(Item::with_id("A")));
    }
}

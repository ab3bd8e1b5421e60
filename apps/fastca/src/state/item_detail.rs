//! # Item Detail State
//!
//! State behind the detail screen of one item: the item itself, its
//! measurements and their total area.

use std::time::Duration;

use tracing::{info, warn};

use fastca_core::validation::validate_measurement;
use fastca_core::{total_area, total_count, CoreError, Item, Measurement};
use fastca_db::ItemRepository;

use super::{skip_failures, SharedState, Subscription};
use crate::error::AppResult;

/// State of the detail screen for one owner item.
pub struct ItemDetailState {
    owner_id: String,
    repository: ItemRepository,
    item: SharedState<Option<Item>>,
    measurements: SharedState<Vec<Measurement>>,
}

impl ItemDetailState {
    /// Creates the state for `owner_id`; nothing is queried until observed.
    pub fn new(repository: ItemRepository, owner_id: impl Into<String>, grace: Duration) -> AppResult<Self> {
        let owner_id = owner_id.into();

        let source = repository.clone();
        let id = owner_id.clone();
        let item = SharedState::new(None, grace, move || {
            skip_failures(source.item_by_id(&id), "item_by_id")
        })?;

        let source = repository.clone();
        let id = owner_id.clone();
        let measurements = SharedState::new(Vec::new(), grace, move || {
            skip_failures(source.measurements_for(&id), "measurements_for")
        })?;

        Ok(ItemDetailState {
            owner_id,
            repository,
            item,
            measurements,
        })
    }

    /// The item this screen shows.
    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    /// Observes the item; `None` before the first load or once deleted.
    pub fn item(&self) -> Subscription<Option<Item>> {
        self.item.subscribe()
    }

    /// Observes the measurements, oldest first.
    pub fn measurements(&self) -> Subscription<Vec<Measurement>> {
        self.measurements.subscribe()
    }

    /// Sum of the areas of the current measurements, in m².
    ///
    /// Reflects the last loaded list; it is only kept current while the
    /// measurements are observed.
    pub fn total_area(&self) -> f64 {
        total_area(&self.measurements.get())
    }

    /// Sum of the counts of the current measurements.
    ///
    /// Same freshness as [`ItemDetailState::total_area`].
    pub fn total_count(&self) -> i64 {
        total_count(&self.measurements.get())
    }

    /// Appends an empty measurement row.
    pub async fn add_measurement(&self) -> AppResult<Measurement> {
        let measurement = Measurement::new(&self.owner_id);
        self.repository.add_measurement(&measurement).await?;
        info!(id = %measurement.id, owner_id = %self.owner_id, "Measurement added");
        Ok(measurement)
    }

    /// Saves an edited measurement.
    ///
    /// ## Returns
    /// * `Err(OwnerMismatch)` - `measurement` belongs to another item, nothing written
    /// * `Err(ValidationError)` - Dimensions or count rejected, nothing written
    /// * `Ok(())` - Saved, or the row no longer exists
    pub async fn update_measurement(&self, measurement: &Measurement) -> AppResult<()> {
        if measurement.owner_id != self.owner_id {
            warn!(
                id = %measurement.id,
                expected = %self.owner_id,
                actual = %measurement.owner_id,
                "Refusing update from another item's screen"
            );
            return Err(CoreError::OwnerMismatch {
                measurement_id: measurement.id.clone(),
                expected: self.owner_id.clone(),
                actual: measurement.owner_id.clone(),
            }
            .into());
        }

        validate_measurement(measurement)?;
        self.repository.update_measurement(measurement).await?;
        Ok(())
    }

    /// Removes a measurement row.
    pub async fn delete_measurement(&self, measurement: &Measurement) -> AppResult<()> {
        self.repository.delete_measurement(measurement).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use fastca_db::{Database, DbConfig};

    const WAIT: Duration = Duration::from_secs(5);

    async fn setup() -> (Database, ItemDetailState) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.repository().add_item(&Item::with_id("A")).await.unwrap();
        let state = ItemDetailState::new(db.repository(), "A", Duration::ZERO).unwrap();
        (db, state)
    }

    async fn wait_for<T>(sub: &mut Subscription<T>, predicate: impl FnMut(&T) -> bool) -> T
    where
        T: Clone + PartialEq + Send + Sync + 'static,
    {
        tokio::time::timeout(WAIT, sub.wait_for(predicate))
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn test_item_loads() {
        let (_db, state) = setup().await;
        let mut item = state.item();

        let loaded = wait_for(&mut item, Option::is_some).await;
        assert_eq!(loaded, Some(Item::with_id("A")));
    }

    #[tokio::test]
    async fn test_edit_updates_total_area() {
        let (_db, state) = setup().await;
        let mut rows = state.measurements();

        let added = state.add_measurement().await.unwrap();
        wait_for(&mut rows, |list| list.len() == 1).await;
        assert_eq!(state.total_area(), 0.0);

        let edited = Measurement {
            length: 1000.0,
            width: 2000.0,
            count: 3,
            ..added
        };
        state.update_measurement(&edited).await.unwrap();

        wait_for(&mut rows, |list| list.first().is_some_and(|m| m.count == 3)).await;
        assert!((state.total_area() - 6.0).abs() < 1e-9);
        assert_eq!(state.total_count(), 3);
    }

    #[tokio::test]
    async fn test_total_count_sums_all_rows() {
        let (_db, state) = setup().await;
        let mut rows = state.measurements();
        assert_eq!(state.total_count(), 0);

        let first = state.add_measurement().await.unwrap();
        let second = state.add_measurement().await.unwrap();
        wait_for(&mut rows, |list| list.len() == 2).await;
        assert_eq!(state.total_count(), 2);

        // Rows without dimensions still count
        let edited = Measurement { count: 4, ..second };
        state.update_measurement(&edited).await.unwrap();
        wait_for(&mut rows, |list| list.iter().any(|m| m.count == 4)).await;
        assert_eq!(state.total_count(), 5);
        assert_eq!(state.total_area(), 0.0);

        state.delete_measurement(&first).await.unwrap();
        wait_for(&mut rows, |list| list.len() == 1).await;
        assert_eq!(state.total_count(), 4);
    }

    #[tokio::test]
    async fn test_update_from_other_owner_is_rejected() {
        let (db, state) = setup().await;
        db.repository().add_item(&Item::with_id("B")).await.unwrap();
        let foreign = Measurement::new("B");
        db.repository().add_measurement(&foreign).await.unwrap();

        let edited = Measurement {
            name: "hijack".to_string(),
            ..foreign.clone()
        };
        let err = state.update_measurement(&edited).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::OwnerMismatch);

        let stored = db.measurements().get_by_id(&foreign.id).await.unwrap().unwrap();
        assert_eq!(stored.name, "");
    }

    #[tokio::test]
    async fn test_invalid_count_is_rejected() {
        let (db, state) = setup().await;
        let added = state.add_measurement().await.unwrap();

        let edited = Measurement { count: 0, ..added.clone() };
        let err = state.update_measurement(&edited).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let stored = db.measurements().get_by_id(&added.id).await.unwrap().unwrap();
        assert_eq!(stored.count, 1);
    }

    #[tokio::test]
    async fn test_deleting_item_clears_screen() {
        let (db, state) = setup().await;
        let mut item = state.item();
        let mut rows = state.measurements();
        state.add_measurement().await.unwrap();
        wait_for(&mut item, Option::is_some).await;
        wait_for(&mut rows, |list| list.len() == 1).await;

        db.repository().delete_item(&Item::with_id("A")).await.unwrap();

        wait_for(&mut item, Option::is_none).await;
        wait_for(&mut rows, Vec::is_empty).await;
        assert_eq!(state.total_area(), 0.0);
    }

    #[tokio::test]
    async fn test_delete_measurement() {
        let (_db, state) = setup().await;
        let mut rows = state.measurements();
        let added = state.add_measurement().await.unwrap();
        wait_for(&mut rows, |list| list.len() == 1).await;

        state.delete_measurement(&added).await.unwrap();
        wait_for(&mut rows, Vec::is_empty).await;
    }
}

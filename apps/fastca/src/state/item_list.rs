//! # Item List State
//!
//! State behind the item list screen.
//!
//! ## Delete Confirmation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  request_delete(item) ──► pending_delete = Some(item)   (dialog shown)  │
//! │          │                                                              │
//! │          ├── confirm_delete() ──► delete item (+ its measurements)      │
//! │          │                        pending_delete = None                 │
//! │          │                                                              │
//! │          └── cancel_delete()  ──► pending_delete = None                 │
//! │                                                                         │
//! │  confirm_delete() with nothing pending is a no-op.                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info};

use fastca_core::Item;
use fastca_db::ItemRepository;

use super::{skip_failures, SharedState, Subscription};
use crate::error::AppResult;

/// State of the item list screen.
pub struct ItemListState {
    repository: ItemRepository,
    items: SharedState<Vec<Item>>,
    pending_delete: watch::Sender<Option<Item>>,
}

impl ItemListState {
    /// Creates the state; nothing is queried until the list is observed.
    pub fn new(repository: ItemRepository, grace: Duration) -> AppResult<Self> {
        let source = repository.clone();
        let items = SharedState::new(Vec::new(), grace, move || {
            skip_failures(source.all_items(), "all_items")
        })?;
        let (pending_delete, _) = watch::channel(None);

        Ok(ItemListState {
            repository,
            items,
            pending_delete,
        })
    }

    /// Observes the item list, ordered by id. Empty until the first load.
    pub fn items(&self) -> Subscription<Vec<Item>> {
        self.items.subscribe()
    }

    /// The shared list value.
    pub fn shared_items(&self) -> &SharedState<Vec<Item>> {
        &self.items
    }

    /// Creates and stores a new item.
    pub async fn add_item(&self) -> AppResult<Item> {
        let item = Item::new();
        self.repository.add_item(&item).await?;
        info!(id = %item.id, "Item added");
        Ok(item)
    }

    /// Observes the item awaiting delete confirmation.
    pub fn pending_delete(&self) -> watch::Receiver<Option<Item>> {
        self.pending_delete.subscribe()
    }

    /// Asks for confirmation before deleting `item`.
    pub fn request_delete(&self, item: Item) {
        debug!(id = %item.id, "Delete requested");
        self.pending_delete.send_replace(Some(item));
    }

    /// Deletes the pending item, if any.
    ///
    /// The pending state is cleared even when the delete fails.
    pub async fn confirm_delete(&self) -> AppResult<()> {
        let Some(item) = self.pending_delete.send_replace(None) else {
            debug!("Confirm with nothing pending");
            return Ok(());
        };

        let rows = self.repository.delete_item(&item).await?;
        info!(id = %item.id, rows, "Item deleted");
        Ok(())
    }

    /// Dismisses the confirmation without deleting.
    pub fn cancel_delete(&self) {
        if let Some(item) = self.pending_delete.send_replace(None) {
            debug!(id = %item.id, "Delete cancelled");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fastca_core::Measurement;
    use fastca_db::{Database, DbConfig};

    const WAIT: Duration = Duration::from_secs(5);

    async fn setup() -> (Database, ItemListState) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let state = ItemListState::new(db.repository(), Duration::ZERO).unwrap();
        (db, state)
    }

    async fn wait_len(sub: &mut Subscription<Vec<Item>>, len: usize) -> Vec<Item> {
        tokio::time::timeout(WAIT, sub.wait_for(|items| items.len() == len))
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn test_add_items_shows_sorted_list() {
        let (_db, state) = setup().await;
        let mut sub = state.items();
        assert!(sub.get().is_empty());

        let a = state.add_item().await.unwrap();
        let b = state.add_item().await.unwrap();

        let items = wait_len(&mut sub, 2).await;
        let mut expected = vec![a.id, b.id];
        expected.sort();
        let ids: Vec<String> = items.into_iter().map(|i| i.id).collect();
        assert_eq!(ids, expected);
    }

    #[tokio::test]
    async fn test_cancel_keeps_item() {
        let (_db, state) = setup().await;
        let mut sub = state.items();
        let item = state.add_item().await.unwrap();
        wait_len(&mut sub, 1).await;

        let pending = state.pending_delete();
        state.request_delete(item.clone());
        assert_eq!(*pending.borrow(), Some(item));

        state.cancel_delete();
        assert_eq!(*pending.borrow(), None);

        // Cancel leaves the store untouched
        state.confirm_delete().await.unwrap();
        assert_eq!(sub.get().len(), 1);
    }

    #[tokio::test]
    async fn test_confirm_deletes_item_and_measurements() {
        let (db, state) = setup().await;
        let mut sub = state.items();
        let item = state.add_item().await.unwrap();
        db.repository()
            .add_measurement(&Measurement::new(&item.id))
            .await
            .unwrap();
        wait_len(&mut sub, 1).await;

        state.request_delete(item.clone());
        state.confirm_delete().await.unwrap();

        wait_len(&mut sub, 0).await;
        assert_eq!(*state.pending_delete().borrow(), None);
        assert_eq!(db.measurements().count_for_owner(&item.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_confirm_without_pending_is_noop() {
        let (_db, state) = setup().await;
        state.confirm_delete().await.unwrap();
        assert_eq!(*state.pending_delete().borrow(), None);
    }
}

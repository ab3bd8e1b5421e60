//! # Table Invalidation and Live Queries
//!
//! Push-based read queries: a query registers interest in a set of tables and
//! is re-run after every committed write touching one of them.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Write → Re-emission                                  │
//! │                                                                         │
//! │  DAO write ──► SQLite COMMIT ──► tracker.notify(&[Table])               │
//! │                                        │                                │
//! │                                        ▼                                │
//! │                          broadcast::Sender<Table>                       │
//! │                     ┌──────────────┼──────────────┐                     │
//! │                     ▼              ▼              ▼                     │
//! │               live query A   live query B   live query C                │
//! │               (items)        (measurements) (items)                     │
//! │                     │                             │                     │
//! │                     ▼                             ▼                     │
//! │                re-run SELECT                 re-run SELECT              │
//! │                emit snapshot                 emit snapshot              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Notification happens strictly after the write is durable, so a re-run
//! always observes the committed state.

use std::future::Future;

use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::{debug, trace};

use crate::error::DbResult;

/// Pending notifications buffered per subscriber before it lags.
const INVALIDATION_CAPACITY: usize = 64;

/// Observable tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Items,
    Measurements,
}

impl Table {
    /// SQL table name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Items => "items",
            Table::Measurements => "measurements",
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Invalidation Tracker
// =============================================================================

/// Fan-out of "table changed" events from writers to live queries.
///
/// Cloning is cheap; all clones share one channel.
#[derive(Debug, Clone)]
pub struct InvalidationTracker {
    tx: broadcast::Sender<Table>,
}

impl Default for InvalidationTracker {
    fn default() -> Self {
        InvalidationTracker::new()
    }
}

impl InvalidationTracker {
    /// Creates a tracker with no subscribers.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(INVALIDATION_CAPACITY);
        InvalidationTracker { tx }
    }

    /// Announces committed changes to `tables`.
    pub fn notify(&self, tables: &[Table]) {
        for table in tables {
            // Err only means nobody is listening right now
            let receivers = self.tx.send(*table).unwrap_or(0);
            trace!(%table, receivers, "Table invalidated");
        }
    }

    /// Registers interest in future notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<Table> {
        self.tx.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

// =============================================================================
// Live Query
// =============================================================================

struct LiveQuery<F> {
    rx: broadcast::Receiver<Table>,
    tables: &'static [Table],
    fetch: F,
    primed: bool,
}

impl<F> LiveQuery<F> {
    /// Waits for a change to one of the watched tables.
    ///
    /// Returns false once the tracker is gone.
    async fn wait_for_change(&mut self) -> bool {
        loop {
            match self.rx.recv().await {
                Ok(table) if self.tables.contains(&table) => break,
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "Live query lagged, re-running");
                    break;
                }
                Err(RecvError::Closed) => return false,
            }
        }

        // Coalesce a burst of writes into one re-run
        loop {
            match self.rx.try_recv() {
                Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }

        true
    }
}

/// Builds a stream that runs `fetch` once immediately and again after every
/// change to any of `tables`.
///
/// The subscription is taken before the first run, so a write racing with
/// the initial load is never missed. The stream only ends when every
/// [`InvalidationTracker`] clone has been dropped.
pub fn live_query<T, F, Fut>(
    tracker: &InvalidationTracker,
    tables: &'static [Table],
    fetch: F,
) -> BoxStream<'static, DbResult<T>>
where
    T: Send + 'static,
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = DbResult<T>> + Send + 'static,
{
    let query = LiveQuery {
        rx: tracker.subscribe(),
        tables,
        fetch,
        primed: false,
    };

    stream::unfold(query, |mut query| async move {
        if query.primed && !query.wait_for_change().await {
            return None;
        }
        query.primed = true;

        let result = (query.fetch)().await;
        Some((result, query))
    })
    .boxed()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn counting_query(
        tracker: &InvalidationTracker,
        tables: &'static [Table],
    ) -> (BoxStream<'static, DbResult<usize>>, Arc<AtomicUsize>) {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();
        let stream = live_query(tracker, tables, move || {
            let counter = counter.clone();
            async move { Ok(counter.fetch_add(1, Ordering::SeqCst) + 1) }
        });
        (stream, runs)
    }

    #[tokio::test]
    async fn test_emits_immediately_then_on_change() {
        let tracker = InvalidationTracker::new();
        let (mut stream, _) = counting_query(&tracker, &[Table::Items]);

        assert_eq!(stream.next().await.unwrap().unwrap(), 1);

        tracker.notify(&[Table::Items]);
        assert_eq!(stream.next().await.unwrap().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_ignores_unrelated_tables() {
        let tracker = InvalidationTracker::new();
        let (mut stream, runs) = counting_query(&tracker, &[Table::Measurements]);
        assert_eq!(stream.next().await.unwrap().unwrap(), 1);

        tracker.notify(&[Table::Items]);
        let pending = tokio::time::timeout(Duration::from_millis(50), stream.next()).await;
        assert!(pending.is_err());
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_burst_is_coalesced() {
        let tracker = InvalidationTracker::new();
        let (mut stream, runs) = counting_query(&tracker, &[Table::Items]);
        stream.next().await.unwrap().unwrap();

        tracker.notify(&[Table::Items, Table::Items, Table::Items]);
        assert_eq!(stream.next().await.unwrap().unwrap(), 2);

        let pending = tokio::time::timeout(Duration::from_millis(50), stream.next()).await;
        assert!(pending.is_err());
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_subscriber_count_follows_streams() {
        let tracker = InvalidationTracker::new();
        assert_eq!(tracker.subscriber_count(), 0);

        let (stream, _) = counting_query(&tracker, &[Table::Items]);
        assert_eq!(tracker.subscriber_count(), 1);

        drop(stream);
        assert_eq!(tracker.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_ends_when_tracker_dropped() {
        let tracker = InvalidationTracker::new();
        let (mut stream, _) = counting_query(&tracker, &[Table::Items]);
        stream.next().await.unwrap().unwrap();

        drop(tracker);
        assert!(stream.next().await.is_none());
    }
}

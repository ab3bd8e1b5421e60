//! # State Module
//!
//! Screen state for the presentation collaborator.
//!
//! Each screen gets its own state holder instead of one big app state; a
//! holder only owns the shared values its screen observes.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │  ┌──────────────────────────┐        ┌────────────────────────────────┐ │
//! │  │     ItemListState        │        │      ItemDetailState (owner)   │ │
//! │  │                          │        │                                │ │
//! │  │  items: SharedState      │        │  item: SharedState<Option>     │ │
//! │  │  pending_delete: watch   │        │  measurements: SharedState     │ │
//! │  └────────────┬─────────────┘        └───────────────┬────────────────┘ │
//! │               │                                      │                  │
//! │               └──────────────┬───────────────────────┘                  │
//! │                              ▼                                          │
//! │                     ItemRepository (fastca-db)                          │
//! │                                                                         │
//! │  THREAD SAFETY:                                                        │
//! │  • SharedState: watch channel + refcount behind a std Mutex            │
//! │  • Writes go straight to the repository; live queries bring the        │
//! │    result back into the shared values                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod item_detail;
mod item_list;
mod shared;

pub use item_detail::ItemDetailState;
pub use item_list::ItemListState;
pub use shared::{SharedState, Subscription};

use futures::future;
use futures::stream::{BoxStream, StreamExt};
use tracing::warn;

use fastca_db::DbResult;

/// Drops failed re-runs of a live query, keeping the last good value.
fn skip_failures<T>(
    stream: BoxStream<'static, DbResult<T>>,
    query: &'static str,
) -> BoxStream<'static, T>
where
    T: Send + 'static,
{
    stream
        .filter_map(move |result| {
            future::ready(match result {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!(query, error = %e, "Live query failed");
                    None
                }
            })
        })
        .boxed()
}

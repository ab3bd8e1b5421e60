//! # Shared State
//!
//! Turns a live query into one current value shared by every observer.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 SharedState<T> subscription lifecycle                   │
//! │                                                                         │
//! │  created          value = initial, no upstream                         │
//! │     │                                                                   │
//! │     ▼  subscribers 0 → 1                                               │
//! │  active           upstream task drains the live query into the value   │
//! │     │                                                                   │
//! │     ▼  subscribers 1 → 0                                               │
//! │  grace            upstream keeps running, teardown timer armed         │
//! │     │                                                                   │
//! │     ├── subscribe before the timer fires ──► active (same upstream,    │
//! │     │                                        no fresh initial load)    │
//! │     ▼  timer fires                                                     │
//! │  idle             upstream cancelled, last value retained              │
//! │     │                                                                   │
//! │     ▼  subscribers 0 → 1                                               │
//! │  active           new upstream, fresh initial load                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! One upstream per `SharedState` no matter how many observers attach.
//! Values equal to the current one are not re-published.

use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use futures::stream::{BoxStream, StreamExt};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::error::{AppError, AppResult};

type Source<T> = Box<dyn Fn() -> BoxStream<'static, T> + Send + Sync>;

/// A current value fed by a reference-counted upstream subscription.
///
/// Cloning shares the same value and upstream.
///
/// ## Usage
/// ```rust,ignore
/// let items = SharedState::new(Vec::new(), Duration::from_secs(5), move || {
///     repository.all_items().filter_map(log_errors).boxed()
/// })?;
///
/// let mut sub = items.subscribe();
/// while let Some(list) = sub.changed().await {
///     render(&list);
/// }
/// ```
pub struct SharedState<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for SharedState<T> {
    fn clone(&self) -> Self {
        SharedState {
            inner: self.inner.clone(),
        }
    }
}

struct Inner<T> {
    value: watch::Sender<T>,
    source: Source<T>,
    grace: Duration,
    runtime: Handle,
    control: Mutex<Control>,
}

#[derive(Default)]
struct Control {
    subscribers: usize,
    /// Bumped on every 0↔1 transition; a teardown only runs if it still
    /// matches.
    generation: u64,
    upstream: Option<JoinHandle<()>>,
    teardown: Option<JoinHandle<()>>,
    upstream_starts: u64,
}

impl Control {
    fn upstream_running(&self) -> bool {
        self.upstream.as_ref().is_some_and(|task| !task.is_finished())
    }

    fn stop_upstream(&mut self) {
        if let Some(task) = self.upstream.take() {
            task.abort();
        }
    }
}

impl<T> SharedState<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Creates a shared state holding `initial` until the first emission.
    ///
    /// `source` is called each time the upstream (re)starts and must return
    /// a fresh live query. Nothing is subscribed until the first observer
    /// attaches.
    ///
    /// ## Returns
    /// * `Err(AppError)` - Not called from within a tokio runtime
    pub fn new<F>(initial: T, grace: Duration, source: F) -> AppResult<Self>
    where
        F: Fn() -> BoxStream<'static, T> + Send + Sync + 'static,
    {
        let runtime = Handle::try_current()
            .map_err(|e| AppError::internal(format!("shared state needs a tokio runtime: {}", e)))?;

        let (value, _) = watch::channel(initial);
        Ok(SharedState {
            inner: Arc::new(Inner {
                value,
                source: Box::new(source),
                grace,
                runtime,
                control: Mutex::new(Control::default()),
            }),
        })
    }

    /// Attaches an observer.
    ///
    /// The first observer (or the first one after the grace window expired)
    /// starts the upstream.
    pub fn subscribe(&self) -> Subscription<T> {
        // Receiver first, so the first upstream emission is never marked seen
        let rx = self.inner.value.subscribe();
        self.inner.attach();
        Subscription {
            rx,
            inner: self.inner.clone(),
        }
    }

    /// Current value, without attaching.
    pub fn get(&self) -> T {
        self.inner.value.borrow().clone()
    }
}

impl<T> SharedState<T> {
    /// Number of attached observers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().subscribers
    }

    /// True while the upstream live query is running.
    pub fn is_active(&self) -> bool {
        self.inner.lock().upstream_running()
    }

    /// How many times the upstream has been started.
    pub fn upstream_starts(&self) -> u64 {
        self.inner.lock().upstream_starts
    }
}

impl<T> Inner<T> {
    fn lock(&self) -> MutexGuard<'_, Control> {
        // Control is plain bookkeeping, still consistent after a panic
        self.control.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<T> Inner<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn attach(self: &Arc<Self>) {
        let mut control = self.lock();
        control.subscribers += 1;
        if control.subscribers > 1 {
            return;
        }

        control.generation += 1;
        if let Some(teardown) = control.teardown.take() {
            teardown.abort();
        }

        if control.upstream_running() {
            debug!("Observer re-attached within grace window");
        } else {
            self.start_upstream(&mut control);
        }
    }

    fn detach(self: &Arc<Self>) {
        let mut control = self.lock();
        control.subscribers = control.subscribers.saturating_sub(1);
        if control.subscribers > 0 {
            return;
        }

        control.generation += 1;
        if self.grace.is_zero() {
            control.stop_upstream();
            return;
        }

        let generation = control.generation;
        let grace = self.grace;
        let inner = Arc::downgrade(self);
        control.teardown = Some(self.runtime.spawn(async move {
            tokio::time::sleep(grace).await;
            if let Some(inner) = inner.upgrade() {
                inner.expire(generation);
            }
        }));
        trace!(grace_ms = grace.as_millis() as u64, "Last observer detached");
    }

    fn expire(&self, generation: u64) {
        let mut control = self.lock();
        if control.generation != generation || control.subscribers > 0 {
            return;
        }
        control.teardown = None;
        control.stop_upstream();
        debug!("Grace window elapsed, upstream stopped");
    }

    fn start_upstream(self: &Arc<Self>, control: &mut Control) {
        control.upstream_starts += 1;
        let mut stream = (self.source)();
        let inner: Weak<Self> = Arc::downgrade(self);

        control.upstream = Some(self.runtime.spawn(async move {
            while let Some(next) = stream.next().await {
                let Some(inner) = inner.upgrade() else {
                    break;
                };
                inner.publish(next);
            }
            trace!("Upstream ended");
        }));
        debug!(starts = control.upstream_starts, "Upstream started");
    }

    fn publish(&self, next: T) {
        self.value.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}

impl<T> Drop for Inner<T> {
    fn drop(&mut self) {
        let control = self
            .control
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        control.stop_upstream();
        if let Some(teardown) = control.teardown.take() {
            teardown.abort();
        }
    }
}

// =============================================================================
// Subscription
// =============================================================================

/// One attached observer. Dropping it detaches.
pub struct Subscription<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    rx: watch::Receiver<T>,
    inner: Arc<Inner<T>>,
}

impl<T> Subscription<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Current value.
    pub fn get(&self) -> T {
        self.rx.borrow().clone()
    }

    /// Waits for the next value different from the last one seen.
    ///
    /// Returns `None` only if the state has been torn down entirely.
    pub async fn changed(&mut self) -> Option<T> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Waits until the current value satisfies `predicate`.
    pub async fn wait_for(&mut self, predicate: impl FnMut(&T) -> bool) -> Option<T> {
        self.rx.wait_for(predicate).await.ok().map(|value| value.clone())
    }
}

impl<T> Clone for Subscription<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        self.inner.attach();
        Subscription {
            rx: self.rx.clone(),
            inner: self.inner.clone(),
        }
    }
}

impl<T> Drop for Subscription<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn drop(&mut self) {
        self.inner.detach();
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

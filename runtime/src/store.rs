//! The store: single owner of application state.
//!
//! All state changes flow through [`Store::dispatch`], which folds events
//! through the reducer and publishes the resulting `Arc<AppState>` to
//! subscribers over a `watch` channel. Dispatch is synchronous; events
//! enqueued while a drain is in progress (from effects on other tasks) are
//! processed by the draining thread in arrival order, so a subscriber never
//! observes a partially-applied batch.

use chainflow_core::event::Event;
use chainflow_core::reducer::Reducer;
use chainflow_core::state::AppState;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::watch;

struct Inner {
    state: Arc<AppState>,
    queue: VecDeque<Event>,
    draining: bool,
}

/// Runtime coordinator for the flow reducer.
///
/// Cheap to share: wrap in `Arc` and hand clones of the subscription to
/// anything that needs to observe state.
pub struct Store<R>
where
    R: Reducer<State = AppState, Event = Event>,
{
    reducer: R,
    inner: Mutex<Inner>,
    watch_tx: watch::Sender<Arc<AppState>>,
}

impl<R> Store<R>
where
    R: Reducer<State = AppState, Event = Event>,
{
    /// Create a store with the given initial state and reducer.
    #[must_use]
    pub fn new(initial_state: AppState, reducer: R) -> Self {
        let state = Arc::new(initial_state);
        let (watch_tx, _) = watch::channel(Arc::clone(&state));
        Self {
            reducer,
            inner: Mutex::new(Inner { state, queue: VecDeque::new(), draining: false }),
            watch_tx,
        }
    }

    /// Current state.
    ///
    /// # Panics
    ///
    /// Panics only on a poisoned lock, which is recovered from instead.
    #[must_use]
    pub fn state(&self) -> Arc<AppState> {
        let inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        Arc::clone(&inner.state)
    }

    /// Subscribe to state changes.
    ///
    /// The receiver holds the latest state; no-op events (same `Arc`) are
    /// never published.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<AppState>> {
        self.watch_tx.subscribe()
    }

    /// Dispatch an event.
    ///
    /// If a drain is already in progress on another thread, the event is
    /// queued and processed by that drain; otherwise this call drains the
    /// queue to empty before returning.
    pub fn dispatch(&self, event: Event) {
        {
            let mut inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            inner.queue.push_back(event);
            if inner.draining {
                return;
            }
            inner.draining = true;
        }
        self.drain();
    }

    fn drain(&self) {
        let mut changed = false;

        loop {
            let (event, state) = {
                let mut inner =
                    self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
                match inner.queue.pop_front() {
                    Some(event) => (event, Arc::clone(&inner.state)),
                    None => {
                        inner.draining = false;
                        break;
                    },
                }
            };

            let started = Instant::now();
            let next = self.reducer.reduce(&state, &event);
            metrics::histogram!("store.reduce_duration_seconds")
                .record(started.elapsed().as_secs_f64());
            metrics::counter!("store.events").increment(1);

            if Arc::ptr_eq(&next, &state) {
                tracing::trace!(?event, "event produced no change");
                continue;
            }

            let mut inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            inner.state = next;
            changed = true;
        }

        if changed {
            let snapshot = self.state();
            let _ = self.watch_tx.send(snapshot);
        }
    }
}

impl<R> std::fmt::Debug for Store<R>
where
    R: Reducer<State = AppState, Event = Event>,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chainflow_core::domain::ChainId;
    use chainflow_core::reducer::FlowReducer;
    use chainflow_core::registry::FlowRegistry;
    use chainflow_core::state::CoreContext;

    fn store() -> Store<FlowReducer> {
        let registry = Arc::new(FlowRegistry::new());
        Store::new(
            AppState::new(CoreContext::new(ChainId(1))),
            FlowReducer::new(registry),
        )
    }

    #[test]
    fn dispatch_updates_state_synchronously() {
        let store = store();
        store.dispatch(Event::InputChanged("swap 5 USDC to WETH".to_string()));
        assert_eq!(store.state().input_text, "swap 5 USDC to WETH");
    }

    #[test]
    fn noop_event_does_not_notify_subscribers() {
        let store = store();
        let rx = store.subscribe();

        // Same text twice: second dispatch returns the same Arc.
        store.dispatch(Event::InputChanged("x".to_string()));
        let mut rx2 = store.subscribe();
        rx2.mark_unchanged();
        store.dispatch(Event::InputChanged("x".to_string()));
        assert!(!rx2.has_changed().unwrap());

        drop(rx);
    }

    #[test]
    fn events_are_applied_in_dispatch_order() {
        let store = store();
        store.dispatch(Event::InputChanged("a".to_string()));
        store.dispatch(Event::InputChanged("ab".to_string()));
        store.dispatch(Event::InputChanged("abc".to_string()));
        assert_eq!(store.state().input_text, "abc");
    }

    #[tokio::test]
    async fn subscriber_sees_latest_state() {
        let store = store();
        let mut rx = store.subscribe();
        store.dispatch(Event::InputChanged("hello".to_string()));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().input_text, "hello");
    }
}

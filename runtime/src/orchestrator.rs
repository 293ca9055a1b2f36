//! Wires the store, effect runner, tick, and persistence into one runtime.
//!
//! The feedback loop: effects dispatch through the [`Dispatcher`] channel, a
//! pump task drains that channel into the synchronous store, the store
//! publishes each accepted transition, and the effect runner reconciles. A
//! single root `CancellationToken` tears the whole assembly down.

use crate::effect_runner::EffectRunner;
use crate::persistence::{SnapshotStore, rehydrate, spawn_persistence};
use crate::store::Store;
use crate::{StoreConfig, StoreError};
use chainflow_core::event::{Dispatcher, Event};
use chainflow_core::reducer::FlowReducer;
use chainflow_core::registry::FlowRegistry;
use chainflow_core::services::{Clock, Services};
use chainflow_core::state::{AppState, CoreContext};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A fully-wired runtime instance.
pub struct Runtime {
    store: Arc<Store<FlowReducer>>,
    dispatcher: Dispatcher,
    shutdown: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
    config: StoreConfig,
}

impl Runtime {
    /// Rehydrate state and start all runtime tasks.
    pub async fn start(
        registry: Arc<FlowRegistry>,
        services: Arc<Services>,
        clock: Arc<dyn Clock>,
        snapshot_store: Arc<dyn SnapshotStore>,
        defaults: CoreContext,
        config: StoreConfig,
    ) -> Self {
        let initial = rehydrate(snapshot_store.as_ref(), defaults).await;
        let store =
            Arc::new(Store::new(initial, FlowReducer::new(Arc::clone(&registry))));
        let (dispatcher, mut events) = Dispatcher::channel();
        let shutdown = CancellationToken::new();

        // Pump: the only writer into the store once the runtime is up.
        let pump = {
            let store = Arc::clone(&store);
            let stop = shutdown.clone();
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        () = stop.cancelled() => break,
                        event = events.recv() => match event {
                            Some(event) => store.dispatch(event),
                            None => break,
                        },
                    }
                }
            })
        };

        let runner = EffectRunner::new(
            registry,
            services,
            dispatcher.clone(),
            shutdown.child_token(),
            config.effect_runner.clone(),
        )
        .spawn(store.subscribe());

        // Tick: drives overlay expiry and anything else time-based.
        let tick = {
            let dispatcher = dispatcher.clone();
            let clock = Arc::clone(&clock);
            let stop = shutdown.clone();
            let interval = config.tick_interval;
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
                loop {
                    tokio::select! {
                        () = stop.cancelled() => break,
                        _ = ticker.tick() => dispatcher.dispatch(Event::Tick { now: clock.now() }),
                    }
                }
            })
        };

        let persist = spawn_persistence(
            snapshot_store,
            store.subscribe(),
            config.persist_debounce,
            clock,
            shutdown.child_token(),
        );

        Self {
            store,
            dispatcher,
            shutdown,
            tasks: vec![pump, runner, tick, persist],
            config,
        }
    }

    /// Channel for feeding events into the runtime.
    #[must_use]
    pub fn dispatcher(&self) -> Dispatcher {
        self.dispatcher.clone()
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> Arc<AppState> {
        self.store.state()
    }

    /// Subscribe to state transitions.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<AppState>> {
        self.store.subscribe()
    }

    /// Stop all tasks, flushing the final snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownTimeout`] when tasks are still running
    /// after the configured shutdown timeout.
    pub async fn shutdown(self) -> Result<(), StoreError> {
        tracing::info!("runtime shutting down");
        self.shutdown.cancel();

        let remaining = self.tasks.len();
        let join_all = async {
            for task in self.tasks {
                let _ = task.await;
            }
        };
        match tokio::time::timeout(self.config.shutdown_timeout, join_all).await {
            Ok(()) => Ok(()),
            Err(_) => Err(StoreError::ShutdownTimeout(remaining)),
        }
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime").field("config", &self.config).finish_non_exhaustive()
    }
}

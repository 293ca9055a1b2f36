//! # Chainflow Runtime
//!
//! Runtime for the chainflow orchestrator: the store that owns state, the
//! effect runner that launches and cancels per-stage async work, retry and
//! deadline helpers, and snapshot persistence.
//!
//! ## Core Components
//!
//! - **Store**: synchronous queued dispatch, `watch`-channel subscriptions
//! - **Effect runner**: reconciles the active `(flow, stage, epoch)` against
//!   registry-declared entry effects
//! - **Persistence**: debounced snapshot writer and tolerant rehydration
//! - **Runtime**: wires all of the above behind one shutdown token
//!
//! ## Example
//!
//! ```ignore
//! use chainflow_runtime::{Runtime, StoreConfig};
//!
//! let runtime = Runtime::start(
//!     registry, services, clock, snapshot_store,
//!     CoreContext::new(ChainId(1)),
//!     StoreConfig::default(),
//! ).await;
//!
//! runtime.dispatcher().dispatch(Event::InputChanged("swap 5 USDC to WETH".into()));
//! runtime.dispatcher().dispatch(Event::InputSubmitted);
//! ```

use std::time::Duration;

/// Effect launch/cancel loop.
pub mod effect_runner;

/// Runtime assembly (store + runner + tick + persistence).
pub mod orchestrator;

/// Snapshot persistence.
pub mod persistence;

/// Retry logic with exponential backoff.
pub mod retry;

/// State-owning store.
pub mod store;

pub use effect_runner::{EffectRunner, EffectRunnerConfig};
pub use orchestrator::Runtime;
pub use persistence::{
    FileSnapshotStore, SNAPSHOT_VERSION, Snapshot, SnapshotError, SnapshotStore, rehydrate,
};
pub use retry::{RetryOutcome, RetryPolicy, deadline_token, retry_with_backoff};
pub use store::Store;

/// Errors surfaced by the runtime itself.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Shutdown timed out waiting for tasks to finish.
    #[error("shutdown timed out with {0} tasks still running")]
    ShutdownTimeout(usize),

    /// The event channel into the store was closed.
    #[error("event channel closed")]
    ChannelClosed,
}

/// Configuration for a [`Runtime`].
///
/// # Example
///
/// ```ignore
/// let config = StoreConfig::default()
///     .with_tick_interval(Duration::from_millis(500))
///     .with_persist_debounce(Duration::from_millis(100));
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Interval between `Tick` events.
    pub tick_interval: Duration,
    /// Debounce window for snapshot writes.
    pub persist_debounce: Duration,
    /// Terminal-stage grace periods.
    pub effect_runner: EffectRunnerConfig,
    /// Default retry policy for execution-side service calls.
    pub retry_policy: RetryPolicy,
    /// How long shutdown waits for tasks.
    pub shutdown_timeout: Duration,
}

impl StoreConfig {
    /// Set the tick interval.
    #[must_use]
    pub const fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Set the persistence debounce window.
    #[must_use]
    pub const fn with_persist_debounce(mut self, debounce: Duration) -> Self {
        self.persist_debounce = debounce;
        self
    }

    /// Set the terminal-stage grace periods.
    #[must_use]
    pub fn with_effect_runner(mut self, config: EffectRunnerConfig) -> Self {
        self.effect_runner = config;
        self
    }

    /// Set the default retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Set the shutdown timeout.
    #[must_use]
    pub const fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            persist_debounce: Duration::from_millis(250),
            effect_runner: EffectRunnerConfig::default(),
            retry_policy: RetryPolicy::default(),
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

//! # Chainflow Testing
//!
//! Testing utilities for the chainflow workspace: deterministic clocks,
//! scripted mock collaborators, and an in-memory snapshot store.
//!
//! ## Example
//!
//! ```ignore
//! use chainflow_testing::{fixtures, mocks};
//!
//! let services = fixtures::happy_transfer_services();
//! let runtime = Runtime::start(
//!     Arc::new(standard_registry(&FlowsConfig::default())),
//!     services,
//!     Arc::new(mocks::test_clock()),
//!     Arc::new(mocks::MemorySnapshotStore::default()),
//!     CoreContext::new(ChainId(1)),
//!     StoreConfig::default(),
//! ).await;
//! ```

/// Mock implementations of the collaborator traits.
pub mod mocks {
    use chainflow_core::domain::{
        ChainId, ExecReceipt, MonitorReport, NormalizedIntent, Route, SimReport, TxHash,
    };
    use chainflow_core::error::{ErrorCode, ServiceError};
    use chainflow_core::services::{
        Clock, Executor, IntentResolver, NormalizeError, NormalizeHints, Normalizer, Resolution,
        RoutePlanner, ServiceFuture, Simulator, TxMonitor,
    };
    use chainflow_core::state::{AccountMode, WalletHandle};
    use chainflow_runtime::persistence::{Snapshot, SnapshotError, SnapshotFuture, SnapshotStore};
    use chainflow_core::domain::Address;
    use chrono::{DateTime, Utc};
    use std::collections::VecDeque;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
        m.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Fixed clock for deterministic tests.
    ///
    /// Always returns the same time until [`FixedClock::set`] is called.
    #[derive(Debug)]
    pub struct FixedClock {
        time: Mutex<DateTime<Utc>>,
    }

    impl FixedClock {
        /// Clock pinned at the given instant.
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self { time: Mutex::new(time) }
        }

        /// Move the clock to a new instant.
        pub fn set(&self, time: DateTime<Utc>) {
            *lock(&self.time) = time;
        }

        /// Advance the clock by a duration.
        pub fn advance(&self, by: chrono::Duration) {
            let mut guard = lock(&self.time);
            *guard += by;
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            *lock(&self.time)
        }
    }

    /// Default fixed clock for tests (2026-01-01 00:00:00 UTC).
    ///
    /// # Panics
    ///
    /// Panics if the hardcoded timestamp fails to parse, which cannot happen.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }

    /// Resolver that replays a scripted sequence of resolutions.
    #[derive(Debug, Default)]
    pub struct ScriptedResolver {
        script: Mutex<VecDeque<Result<Resolution, ServiceError>>>,
    }

    impl ScriptedResolver {
        /// Resolver that returns the given results in order.
        #[must_use]
        pub fn new(script: impl IntoIterator<Item = Result<Resolution, ServiceError>>) -> Self {
            Self { script: Mutex::new(script.into_iter().collect()) }
        }

        /// Resolver that always yields the same intent resolution.
        #[must_use]
        pub fn intent(resolution: Resolution) -> Self {
            Self::new([Ok(resolution)])
        }
    }

    impl IntentResolver for ScriptedResolver {
        fn resolve<'a>(&'a self, _raw: &'a str) -> ServiceFuture<'a, Resolution> {
            let mut script = lock(&self.script);
            // Hold the last entry so re-parses (clarify, retry) stay scripted.
            let next = if script.len() > 1 {
                script.pop_front()
            } else {
                script.front().cloned()
            };
            Box::pin(async move {
                next.unwrap_or_else(|| {
                    Err(ServiceError::new(ErrorCode::ResolverUnavailable, "script exhausted"))
                })
            })
        }
    }

    /// Normalizer that replays a scripted sequence of outcomes.
    #[derive(Debug, Default)]
    pub struct ScriptedNormalizer {
        script: Mutex<VecDeque<Result<NormalizedIntent, NormalizeError>>>,
    }

    impl ScriptedNormalizer {
        /// Normalizer returning the given results in order (last one repeats).
        #[must_use]
        pub fn new(
            script: impl IntoIterator<Item = Result<NormalizedIntent, NormalizeError>>,
        ) -> Self {
            Self { script: Mutex::new(script.into_iter().collect()) }
        }

        /// Normalizer that always succeeds with the given intent.
        #[must_use]
        pub fn ok(norm: NormalizedIntent) -> Self {
            Self::new([Ok(norm)])
        }
    }

    impl Normalizer for ScriptedNormalizer {
        fn normalize<'a>(
            &'a self,
            _intent: &'a chainflow_core::domain::Intent,
            _hints: &'a NormalizeHints,
        ) -> Pin<Box<dyn Future<Output = Result<NormalizedIntent, NormalizeError>> + Send + 'a>>
        {
            let mut script = lock(&self.script);
            let next = if script.len() > 1 {
                script.pop_front()
            } else {
                script.front().cloned()
            };
            Box::pin(async move {
                next.unwrap_or_else(|| {
                    Err(NormalizeError::Service(ServiceError::new(
                        ErrorCode::ValidationFailed,
                        "normalizer script exhausted",
                    )))
                })
            })
        }
    }

    /// Planner that always returns the same result.
    #[derive(Debug)]
    pub struct StaticPlanner {
        result: Result<Route, ServiceError>,
    }

    impl StaticPlanner {
        /// Planner that always returns this route.
        #[must_use]
        pub const fn ok(route: Route) -> Self {
            Self { result: Ok(route) }
        }

        /// Planner that always fails.
        #[must_use]
        pub const fn err(error: ServiceError) -> Self {
            Self { result: Err(error) }
        }
    }

    impl RoutePlanner for StaticPlanner {
        fn plan<'a>(
            &'a self,
            _norm: &'a NormalizedIntent,
            _slippage_bps: u16,
        ) -> ServiceFuture<'a, Route> {
            let result = self.result.clone();
            Box::pin(async move { result })
        }
    }

    /// Simulator whose validate and simulate outcomes are fixed.
    #[derive(Debug)]
    pub struct ScriptedSimulator {
        validation: Result<(), ServiceError>,
        simulation: Result<SimReport, ServiceError>,
    }

    impl ScriptedSimulator {
        /// Simulator that passes validation and produces the given report.
        #[must_use]
        pub const fn ok(report: SimReport) -> Self {
            Self { validation: Ok(()), simulation: Ok(report) }
        }

        /// Simulator that rejects validation.
        #[must_use]
        pub fn rejecting(error: ServiceError) -> Self {
            Self {
                validation: Err(error.clone()),
                simulation: Err(error),
            }
        }
    }

    impl Simulator for ScriptedSimulator {
        fn validate<'a>(
            &'a self,
            _norm: &'a NormalizedIntent,
            _sender: Option<&'a Address>,
        ) -> ServiceFuture<'a, ()> {
            let result = self.validation.clone();
            Box::pin(async move { result })
        }

        fn simulate<'a>(
            &'a self,
            _norm: &'a NormalizedIntent,
            _sender: Option<&'a Address>,
        ) -> ServiceFuture<'a, SimReport> {
            let result = self.simulation.clone();
            Box::pin(async move { result })
        }
    }

    /// Executor replaying scripted outcomes, counting calls, optionally slow.
    #[derive(Debug, Default)]
    pub struct ScriptedExecutor {
        script: Mutex<VecDeque<Result<ExecReceipt, ServiceError>>>,
        calls: AtomicUsize,
        delay: Option<Duration>,
    }

    impl ScriptedExecutor {
        /// Executor returning the given results in order (last one repeats).
        #[must_use]
        pub fn new(script: impl IntoIterator<Item = Result<ExecReceipt, ServiceError>>) -> Self {
            Self {
                script: Mutex::new(script.into_iter().collect()),
                calls: AtomicUsize::new(0),
                delay: None,
            }
        }

        /// Add an artificial delay before every response, for cancellation
        /// and staleness tests.
        #[must_use]
        pub const fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        /// Number of times `execute` was called.
        #[must_use]
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Executor for ScriptedExecutor {
        fn execute<'a>(
            &'a self,
            _norm: &'a NormalizedIntent,
            _account_mode: AccountMode,
            _wallet: &'a WalletHandle,
            _route: Option<&'a Route>,
        ) -> ServiceFuture<'a, ExecReceipt> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut script = lock(&self.script);
            let next = if script.len() > 1 {
                script.pop_front()
            } else {
                script.front().cloned()
            };
            let delay = self.delay;
            Box::pin(async move {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                next.unwrap_or_else(|| {
                    Err(ServiceError::new(ErrorCode::ExecutionFailed, "executor script exhausted"))
                })
            })
        }
    }

    /// Monitor replaying a scripted sequence of reports (last one repeats),
    /// matching a polling caller.
    #[derive(Debug, Default)]
    pub struct ScriptedMonitor {
        script: Mutex<VecDeque<Result<MonitorReport, ServiceError>>>,
        polls: AtomicUsize,
    }

    impl ScriptedMonitor {
        /// Monitor returning the given reports in order.
        #[must_use]
        pub fn new(script: impl IntoIterator<Item = Result<MonitorReport, ServiceError>>) -> Self {
            Self { script: Mutex::new(script.into_iter().collect()), polls: AtomicUsize::new(0) }
        }

        /// Number of polls observed.
        #[must_use]
        pub fn polls(&self) -> usize {
            self.polls.load(Ordering::SeqCst)
        }
    }

    impl TxMonitor for ScriptedMonitor {
        fn poll<'a>(
            &'a self,
            _chain_id: ChainId,
            _tx_hash: &'a TxHash,
        ) -> ServiceFuture<'a, MonitorReport> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            let mut script = lock(&self.script);
            let next = if script.len() > 1 {
                script.pop_front()
            } else {
                script.front().cloned()
            };
            Box::pin(async move {
                next.unwrap_or_else(|| {
                    Err(ServiceError::new(ErrorCode::MonitorTimeout, "monitor script exhausted"))
                })
            })
        }
    }

    /// In-memory snapshot store.
    #[derive(Debug, Default)]
    pub struct MemorySnapshotStore {
        snapshot: Mutex<Option<Snapshot>>,
        saves: AtomicUsize,
    }

    impl MemorySnapshotStore {
        /// Store pre-seeded with a snapshot.
        #[must_use]
        pub fn seeded(snapshot: Snapshot) -> Self {
            Self { snapshot: Mutex::new(Some(snapshot)), saves: AtomicUsize::new(0) }
        }

        /// Latest saved snapshot, if any.
        #[must_use]
        pub fn latest(&self) -> Option<Snapshot> {
            lock(&self.snapshot).clone()
        }

        /// Number of saves performed.
        #[must_use]
        pub fn saves(&self) -> usize {
            self.saves.load(Ordering::SeqCst)
        }
    }

    impl SnapshotStore for MemorySnapshotStore {
        fn save<'a>(
            &'a self,
            snapshot: &'a Snapshot,
        ) -> SnapshotFuture<'a, Result<(), SnapshotError>> {
            *lock(&self.snapshot) = Some(snapshot.clone());
            self.saves.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Ok(()) })
        }

        fn load(&self) -> SnapshotFuture<'_, Result<Option<Snapshot>, SnapshotError>> {
            let snapshot = lock(&self.snapshot).clone();
            Box::pin(async move { Ok(snapshot) })
        }
    }

    /// Snapshot store whose reads always fail, for corrupt-storage tests.
    #[derive(Debug, Default)]
    pub struct BrokenSnapshotStore;

    impl SnapshotStore for BrokenSnapshotStore {
        fn save<'a>(
            &'a self,
            _snapshot: &'a Snapshot,
        ) -> SnapshotFuture<'a, Result<(), SnapshotError>> {
            Box::pin(async { Err(SnapshotError::Io(std::io::Error::other("storage broken"))) })
        }

        fn load(&self) -> SnapshotFuture<'_, Result<Option<Snapshot>, SnapshotError>> {
            Box::pin(async { Err(SnapshotError::Io(std::io::Error::other("storage broken"))) })
        }
    }
}

/// Helpers for driving a live runtime in integration tests.
pub mod harness {
    use chainflow_core::state::AppState;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::watch;

    /// Wait until the state satisfies `pred`, returning the matching state.
    ///
    /// # Panics
    ///
    /// Panics when the timeout elapses or the store is gone, with the last
    /// observed state in the message.
    #[allow(clippy::panic)]
    pub async fn wait_for_state(
        rx: &mut watch::Receiver<Arc<AppState>>,
        timeout: Duration,
        pred: impl Fn(&AppState) -> bool,
    ) -> Arc<AppState> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let current = Arc::clone(&rx.borrow_and_update());
            if pred(&current) {
                return current;
            }
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                panic!("timed out waiting for state; last: {current:?}");
            }
            match tokio::time::timeout(remaining, rx.changed()).await {
                Ok(Ok(())) => {},
                Ok(Err(_)) => panic!("store dropped while waiting for state"),
                Err(_) => panic!("timed out waiting for state; last: {:?}", rx.borrow()),
            }
        }
    }
}

/// Ready-made domain values and service bundles.
pub mod fixtures {
    use super::mocks::{
        ScriptedExecutor, ScriptedMonitor, ScriptedNormalizer, ScriptedResolver,
        ScriptedSimulator, StaticPlanner, test_clock,
    };
    use chainflow_core::domain::{
        Address, Amount, ChainId, ExecReceipt, Intent, MonitorReport, NormalizedIntent, SimReport,
        TokenInfo, TxHash, TxReceiptSummary, TxStatus,
    };
    use chainflow_core::services::{Resolution, Services};
    use chainflow_core::state::WalletHandle;
    use std::sync::Arc;
    use uuid::Uuid;

    /// Native ETH on mainnet.
    #[must_use]
    pub fn eth() -> TokenInfo {
        TokenInfo {
            symbol: "ETH".to_string(),
            address: Address("0x0000000000000000000000000000000000000000".to_string()),
            chain_id: ChainId(1),
            decimals: 18,
        }
    }

    /// USDC on mainnet.
    #[must_use]
    pub fn usdc() -> TokenInfo {
        TokenInfo {
            symbol: "USDC".to_string(),
            address: Address("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48".to_string()),
            chain_id: ChainId(1),
            decimals: 6,
        }
    }

    /// WETH on mainnet.
    #[must_use]
    pub fn weth() -> TokenInfo {
        TokenInfo {
            symbol: "WETH".to_string(),
            address: Address("0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2".to_string()),
            chain_id: ChainId(1),
            decimals: 18,
        }
    }

    /// Connected wallet handle.
    #[must_use]
    pub fn wallet() -> WalletHandle {
        WalletHandle { session_id: Uuid::new_v4(), label: "TestWallet".to_string() }
    }

    /// Sending address used across fixtures.
    #[must_use]
    pub fn sender() -> Address {
        Address("0x00000000000000000000000000000000DeaDBeef".to_string())
    }

    /// The canonical "transfer 0.001 ETH to 0xABC" intent.
    #[must_use]
    pub fn transfer_intent() -> Intent {
        Intent::Transfer {
            token: "ETH".to_string(),
            amount: Amount(1_000_000_000_000_000),
            to: Address("0xABC".to_string()),
        }
    }

    /// Normalized form of [`transfer_intent`].
    #[must_use]
    pub fn normalized_transfer() -> NormalizedIntent {
        NormalizedIntent::Transfer {
            token: eth(),
            amount: Amount(1_000_000_000_000_000),
            to: Address("0xABC".to_string()),
        }
    }

    /// Receipt for a broadcast transaction.
    #[must_use]
    pub fn exec_receipt() -> ExecReceipt {
        ExecReceipt {
            tx_hash: TxHash("0xfeedface".to_string()),
            explorer_url: "https://example.org/tx/0xfeedface".to_string(),
            message: "transaction submitted".to_string(),
        }
    }

    /// Monitor report for a confirmed transaction.
    #[must_use]
    pub fn confirmed_report() -> MonitorReport {
        MonitorReport {
            status: TxStatus::Confirmed,
            receipt: Some(TxReceiptSummary { block_number: 19_000_000, gas_used: 21_000 }),
        }
    }

    /// Service bundle scripted for the transfer happy path.
    #[must_use]
    pub fn happy_transfer_services() -> Arc<Services> {
        Arc::new(Services {
            clock: Arc::new(test_clock()),
            resolver: Arc::new(ScriptedResolver::intent(Resolution::Intent(transfer_intent()))),
            normalizer: Arc::new(ScriptedNormalizer::ok(normalized_transfer())),
            planner: Arc::new(StaticPlanner::ok(chainflow_core::domain::Route::direct(eth()))),
            simulator: Arc::new(ScriptedSimulator::ok(SimReport {
                gas_estimate: 21_000,
                notes: None,
            })),
            executor: Arc::new(ScriptedExecutor::new([Ok(exec_receipt())])),
            monitor: Arc::new(ScriptedMonitor::new([Ok(confirmed_report())])),
        })
    }
}

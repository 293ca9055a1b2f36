//! Snapshot persistence: debounced writes, tolerant reads.
//!
//! A [`Snapshot`] is a projection of `AppState` that survives a restart:
//! wallet handles and transient UI (overlays, input, chat) are excluded.
//! Every load failure is treated as "no snapshot" so a corrupt or
//! incompatible file can never prevent startup.

use chainflow_core::domain::{Address, ChainId};
use chainflow_core::ledger::{IdempotencyLedger, LedgerEntry};
use chainflow_core::services::Clock;
use chainflow_core::state::{AccountMode, AppState, CoreContext, FlowContext, Mode, ViewFrame};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Current snapshot schema version. Bump on incompatible layout changes;
/// older files are discarded on load.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Persisted projection of [`AppState`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Schema version of this file.
    pub version: u32,
    /// Top-level mode at save time.
    pub mode: Mode,
    /// In-flight pipeline, if any.
    pub flow: Option<FlowContext>,
    /// Non-flow navigation stack.
    pub view_stack: Vec<ViewFrame>,
    /// Selected chain.
    pub chain_id: ChainId,
    /// Sending address, if one was connected.
    pub sender: Option<Address>,
    /// Bucket width of the idempotency ledger.
    pub ledger_bucket_secs: u64,
    /// Ledger entries, sorted by fingerprint.
    pub ledger: Vec<(String, LedgerEntry)>,
    /// When this snapshot was written.
    pub saved_at: DateTime<Utc>,
}

impl Snapshot {
    /// Project the persistable parts of the state.
    #[must_use]
    pub fn project(state: &AppState, now: DateTime<Utc>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            mode: state.mode,
            flow: state.flow.clone(),
            view_stack: state.view_stack.clone(),
            chain_id: state.core.chain_id,
            sender: state.core.sender.clone(),
            ledger_bucket_secs: state.core.idempotency.bucket_secs(),
            ledger: state.core.idempotency.to_entries(),
            saved_at: now,
        }
    }

    /// Rebuild an `AppState` from this snapshot.
    ///
    /// Wallet handles never survive a restart, so the account always comes
    /// back watch-only until the user reconnects.
    #[must_use]
    pub fn restore(self) -> AppState {
        let core = CoreContext {
            chain_id: self.chain_id,
            account_mode: AccountMode::Watch,
            wallet: None,
            sender: self.sender,
            idempotency: IdempotencyLedger::from_entries(self.ledger_bucket_secs, self.ledger),
        };
        let mut state = AppState::new(core);
        state.view_stack = self.view_stack;
        // The persisted mode wins unless it breaks an invariant: a flow
        // always means flow mode, and view mode needs a non-empty stack.
        state.mode = if self.flow.is_some() {
            Mode::Flow
        } else {
            match self.mode {
                Mode::Flow | Mode::View if state.view_stack.is_empty() => Mode::Idle,
                Mode::Flow => Mode::View,
                mode => mode,
            }
        };
        state.flow = self.flow;
        state
    }
}

/// Snapshot persistence failures.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// Filesystem error reading or writing the snapshot.
    #[error("snapshot I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot file exists but is not valid JSON for the current schema.
    #[error("snapshot decode failed: {0}")]
    Decode(#[from] serde_json::Error),

    /// Snapshot was written by an incompatible schema version.
    #[error("snapshot version {found} is not supported (current {SNAPSHOT_VERSION})")]
    Version {
        /// Version found in the file.
        found: u32,
    },
}

/// Future returned by snapshot store operations.
pub type SnapshotFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Where snapshots are kept.
pub trait SnapshotStore: Send + Sync {
    /// Persist a snapshot, replacing any previous one.
    fn save<'a>(&'a self, snapshot: &'a Snapshot) -> SnapshotFuture<'a, Result<(), SnapshotError>>;

    /// Load the latest snapshot, `None` when none exists.
    fn load(&self) -> SnapshotFuture<'_, Result<Option<Snapshot>, SnapshotError>>;
}

/// JSON file on disk, written atomically via a temp file and rename.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    /// Store backed by the given file path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn save<'a>(&'a self, snapshot: &'a Snapshot) -> SnapshotFuture<'a, Result<(), SnapshotError>> {
        Box::pin(async move {
            let encoded = serde_json::to_vec_pretty(snapshot)?;
            let tmp = self.path.with_extension("tmp");
            tokio::fs::write(&tmp, &encoded).await?;
            tokio::fs::rename(&tmp, &self.path).await?;
            tracing::debug!(path = %self.path.display(), bytes = encoded.len(), "snapshot saved");
            Ok(())
        })
    }

    fn load(&self) -> SnapshotFuture<'_, Result<Option<Snapshot>, SnapshotError>> {
        Box::pin(async move {
            let raw = match tokio::fs::read(&self.path).await {
                Ok(raw) => raw,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
                Err(err) => return Err(err.into()),
            };
            let snapshot: Snapshot = serde_json::from_slice(&raw)?;
            if snapshot.version != SNAPSHOT_VERSION {
                return Err(SnapshotError::Version { found: snapshot.version });
            }
            Ok(Some(snapshot))
        })
    }
}

/// Build the startup state: restore the snapshot if one loads cleanly,
/// otherwise start fresh from `defaults`.
pub async fn rehydrate(store: &dyn SnapshotStore, defaults: CoreContext) -> AppState {
    match store.load().await {
        Ok(Some(snapshot)) => {
            tracing::info!(saved_at = %snapshot.saved_at, "restoring persisted state");
            snapshot.restore()
        },
        Ok(None) => AppState::new(defaults),
        Err(err) => {
            tracing::warn!(error = %err, "snapshot unreadable, starting fresh");
            metrics::counter!("persistence.load_failures").increment(1);
            AppState::new(defaults)
        },
    }
}

/// Debounced writer: coalesces bursts of transitions into one save.
///
/// Waits `debounce` after the first unseen change before projecting the
/// latest state; a final save runs on shutdown so nothing within the window
/// is lost.
pub fn spawn_persistence(
    store: Arc<dyn SnapshotStore>,
    mut rx: watch::Receiver<Arc<AppState>>,
    debounce: Duration,
    clock: Arc<dyn Clock>,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        // The receiver starts with its initial value unseen, so the first
        // iteration may save a state that predates the task. That redundant
        // save is harmless; swallowing a change published before the first
        // poll would not be.
        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                changed = rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                },
            }

            tokio::select! {
                () = shutdown.cancelled() => break,
                () = tokio::time::sleep(debounce) => {},
            }

            let snapshot = Snapshot::project(&rx.borrow_and_update(), clock.now());
            if let Err(err) = store.save(&snapshot).await {
                tracing::warn!(error = %err, "snapshot save failed");
                metrics::counter!("persistence.save_failures").increment(1);
            }
        }

        // Flush whatever the debounce window was still holding.
        let snapshot = Snapshot::project(&rx.borrow_and_update(), clock.now());
        if let Err(err) = store.save(&snapshot).await {
            tracing::warn!(error = %err, "final snapshot save failed");
        }
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use chainflow_core::domain::Amount;
    use chainflow_core::domain::Intent;
    use chainflow_core::ledger::LedgerStatus;
    use chrono::TimeZone;

    fn state_with_ledger() -> AppState {
        let mut core = CoreContext::new(ChainId(8453));
        core.sender = Some(Address("0xSENDER".to_string()));
        core.idempotency.record("fp".to_string(), 7);
        AppState::new(core)
    }

    #[test]
    fn projection_excludes_wallet_and_transient_ui() {
        let mut state = state_with_ledger();
        state.input_text = "typing…".to_string();
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();

        let snapshot = Snapshot::project(&state, now);
        let restored = snapshot.restore();

        assert_eq!(restored.core.chain_id, ChainId(8453));
        assert_eq!(restored.core.account_mode, AccountMode::Watch);
        assert!(restored.core.wallet.is_none());
        assert!(restored.input_text.is_empty());
        assert_eq!(
            restored.core.idempotency.get("fp").map(|e| e.status),
            Some(LedgerStatus::Pending)
        );
    }

    #[test]
    fn huge_amounts_round_trip_exactly_through_json() {
        let mut state = state_with_ledger();
        let mut flow = FlowContext::new("transfer max");
        flow.intent = Some(Intent::Transfer {
            token: "WEI".to_string(),
            amount: Amount(u128::MAX),
            to: Address("0xCAFE".to_string()),
        });
        state.flow = Some(flow);
        state.mode = Mode::Flow;

        let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let snapshot = Snapshot::project(&state, now);
        let json = serde_json::to_string(&snapshot).unwrap();
        let decoded: Snapshot = serde_json::from_str(&json).unwrap();

        let restored = decoded.restore();
        assert_eq!(restored.mode, Mode::Flow);
        let Some(Intent::Transfer { amount, .. }) =
            restored.flow.as_ref().and_then(|f| f.intent.clone())
        else {
            panic!("transfer intent expected");
        };
        assert_eq!(amount, Amount(u128::MAX));
    }

    #[test]
    fn guide_and_auth_modes_survive_a_round_trip() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        for mode in [Mode::Guide, Mode::Auth] {
            let mut state = state_with_ledger();
            state.mode = mode;
            let restored = Snapshot::project(&state, now).restore();
            assert_eq!(restored.mode, mode);
        }
    }

    #[test]
    fn restored_mode_is_reconciled_against_the_flow_invariant() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();

        // A snapshot carrying a flow restores to flow mode whatever it says.
        let mut with_flow = state_with_ledger();
        with_flow.flow = Some(FlowContext::new("transfer 1 ETH to 0xABC"));
        with_flow.mode = Mode::Flow;
        let mut snapshot = Snapshot::project(&with_flow, now);
        snapshot.mode = Mode::Guide;
        assert_eq!(snapshot.restore().mode, Mode::Flow);

        // Flow mode without a flow degrades by view stack.
        let mut snapshot = Snapshot::project(&state_with_ledger(), now);
        snapshot.mode = Mode::Flow;
        assert_eq!(snapshot.clone().restore().mode, Mode::Idle);
        snapshot.view_stack.push(ViewFrame { name: "settings".to_string(), param: None });
        assert_eq!(snapshot.restore().mode, Mode::View);
    }

    #[tokio::test]
    async fn file_store_round_trips_and_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSnapshotStore::new(dir.path().join("state.json"));

        assert!(store.load().await.unwrap().is_none());

        let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let snapshot = Snapshot::project(&state_with_ledger(), now);
        store.save(&snapshot).await.unwrap();

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded, snapshot);
    }

    #[tokio::test]
    async fn corrupt_file_rehydrates_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        tokio::fs::write(&path, b"{ not json").await.unwrap();

        let store = FileSnapshotStore::new(path);
        let state = rehydrate(&store, CoreContext::new(ChainId(1))).await;
        assert_eq!(state.mode, Mode::Idle);
        assert!(state.flow.is_none());
    }

    #[tokio::test]
    async fn change_published_before_writer_first_polls_is_saved() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileSnapshotStore::new(dir.path().join("state.json")));
        let shutdown = CancellationToken::new();

        let (tx, rx) = watch::channel(Arc::new(AppState::new(CoreContext::new(ChainId(1)))));
        let handle = spawn_persistence(
            Arc::clone(&store) as Arc<dyn SnapshotStore>,
            rx,
            Duration::from_millis(10),
            Arc::new(chainflow_core::services::SystemClock),
            shutdown.clone(),
        );

        // Publish before the writer task has had a chance to run; the
        // transition must still land within the debounce window, not only
        // at shutdown.
        tx.send(Arc::new(AppState::new(CoreContext::new(ChainId(42))))).unwrap();

        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            if let Ok(Some(snapshot)) = store.load().await {
                if snapshot.chain_id == ChainId(42) {
                    break;
                }
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "transition was never persisted"
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn version_mismatch_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let mut snapshot = Snapshot::project(&state_with_ledger(), now);
        snapshot.version = 99;
        tokio::fs::write(&path, serde_json::to_vec(&snapshot).unwrap()).await.unwrap();

        let store = FileSnapshotStore::new(path);
        assert!(matches!(store.load().await, Err(SnapshotError::Version { found: 99 })));

        let state = rehydrate(&store, CoreContext::new(ChainId(1))).await;
        assert_eq!(state.core.chain_id, ChainId(1));
    }
}

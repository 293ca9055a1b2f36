//! Events: the complete vocabulary of state transitions.
//!
//! Events are tagged records and never carry executable code. Stage-outcome
//! events name the stage they target; the reducer drops them silently when
//! that stage is no longer current, which is what makes late results from
//! cancelled effects harmless.

use crate::domain::{
    Address, ChainId, ExecReceipt, Intent, MonitorReport, NormalizedIntent, Route, SimReport,
    TokenInfo,
};
use crate::error::FlowError;
use crate::state::{ChatEntry, Overlay, OverlayId, Step, ViewFrame, WalletHandle};
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

/// Payload carried by a successful stage outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum StagePayload {
    /// Parse produced an intent.
    Intent(Intent),
    /// Normalize resolved the intent.
    Norm(NormalizedIntent),
    /// Validate passed (nothing to store).
    Validated,
    /// Plan produced a route.
    Plan(Route),
    /// Simulate produced a report.
    Sim(SimReport),
    /// Execute broadcast a transaction.
    Exec(ExecReceipt),
    /// Monitor observed a final status.
    Monitor(MonitorReport),
}

impl StagePayload {
    /// The stage this payload belongs to. The reducer rejects payloads
    /// arriving under the wrong stage tag.
    #[must_use]
    pub const fn expected_step(&self) -> Step {
        match self {
            Self::Intent(_) => Step::Parse,
            Self::Norm(_) => Step::Normalize,
            Self::Validated => Step::Validate,
            Self::Plan(_) => Step::Plan,
            Self::Sim(_) => Step::Simulate,
            Self::Exec(_) => Step::Execute,
            Self::Monitor(_) => Step::Monitor,
        }
    }
}

/// All inputs to the reducer.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    // ── Input ────────────────────────────────────────────────────────────
    /// The input box changed.
    InputChanged(String),
    /// The user submitted the input box.
    InputSubmitted,

    // ── Stage outcomes ───────────────────────────────────────────────────
    /// A stage finished successfully.
    StageOk {
        /// Stage the outcome targets.
        step: Step,
        /// Stage output.
        payload: StagePayload,
    },
    /// A stage failed.
    StageFail {
        /// Stage the outcome targets.
        step: Step,
        /// Failure record.
        error: FlowError,
    },
    /// The resolver needs more information.
    StageClarify {
        /// Stage the outcome targets.
        step: Step,
        /// Question for the user.
        prompt: String,
        /// Fields that could not be filled.
        missing: Vec<String>,
    },
    /// A token symbol matched several candidates.
    StageTokenSelection {
        /// Stage the outcome targets.
        step: Step,
        /// Ambiguous symbol.
        symbol: String,
        /// Candidate tokens.
        candidates: Vec<TokenInfo>,
    },
    /// The user picked a candidate token.
    TokenSelected(usize),
    /// The execute effect recorded an idempotency fingerprint.
    LedgerRecord {
        /// Content-derived fingerprint.
        fingerprint: String,
        /// Bucket the submission falls in.
        bucket: u64,
    },

    // ── Flow lifecycle ───────────────────────────────────────────────────
    /// Tear down the active flow and return to idle.
    FlowCancel,
    /// Restart the active flow from parse, preserving the raw input.
    FlowRetry,
    /// Rewind one stage where the registry declares a back edge.
    FlowBack,
    /// Explicit user confirmation for the confirm stage.
    FlowConfirm,

    // ── Chat / overlays / navigation ─────────────────────────────────────
    /// Append a chat entry.
    ChatAdd(ChatEntry),
    /// Push an overlay.
    OverlayPush(Overlay),
    /// Remove an overlay by id, or pop the topmost when `None`.
    OverlayPop(Option<OverlayId>),
    /// Push a view frame.
    ViewPush(ViewFrame),
    /// Pop the topmost view frame.
    ViewPop,

    // ── App / environment ────────────────────────────────────────────────
    /// Periodic tick; prunes expired overlays.
    Tick {
        /// Current instant, injected so pruning stays deterministic.
        now: DateTime<Utc>,
    },
    /// Wallet session changed (connected or disconnected).
    AuthChanged {
        /// New wallet handle, if connected.
        wallet: Option<WalletHandle>,
        /// New sender address, if known.
        sender: Option<Address>,
    },
    /// The user switched chains.
    ChainSelected(ChainId),
}

impl Event {
    /// Convenience constructor for a successful stage outcome.
    #[must_use]
    pub fn stage_ok(payload: StagePayload) -> Self {
        Self::StageOk { step: payload.expected_step(), payload }
    }
}

/// Handle effects use to feed events back into the store.
///
/// Events land on an unbounded queue drained by the store's pump task, so a
/// dispatch from inside a notification callback is processed on the next turn
/// rather than re-entering the reducer.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    tx: mpsc::UnboundedSender<Event>,
}

impl Dispatcher {
    /// Build a dispatcher and the receiving end for the store's pump.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queue an event. Silently dropped once the store has shut down.
    pub fn dispatch(&self, event: Event) {
        if self.tx.send(event).is_err() {
            tracing::debug!("dispatch after shutdown ignored");
        }
    }
}

//! Application state: the root snapshot owned by the store plus the flow
//! context that tracks one pipeline run.
//!
//! State is shared as `Arc<AppState>`; the reducer clones-on-write and hands
//! back the same `Arc` when an event changes nothing, so subscribers can rely
//! on pointer equality to skip work.

use crate::domain::{
    Address, ChainId, ExecReceipt, FlowName, Intent, MonitorReport, NormalizedIntent, Route,
    SimReport, TokenInfo,
};
use crate::error::FlowError;
use crate::ledger::IdempotencyLedger;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Top-level UI mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    /// Nothing active; awaiting input.
    #[default]
    Idle,
    /// A transaction pipeline is running. `AppState::flow` is `Some` iff here.
    Flow,
    /// A non-flow view is on top of the view stack.
    View,
    /// Onboarding/guide content is showing.
    Guide,
    /// Authentication is in progress.
    Auth,
}

/// One named phase of a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Step {
    /// Resolve raw text into an intent.
    Parse,
    /// Awaiting amended input after an incomplete intent.
    Clarify,
    /// Resolve symbols and validate amounts.
    Normalize,
    /// Static precondition checks.
    Validate,
    /// Route planning.
    Plan,
    /// On-chain simulation.
    Simulate,
    /// Awaiting explicit user confirmation.
    Confirm,
    /// Sign and broadcast.
    Execute,
    /// Await inclusion.
    Monitor,
    /// Terminal: pipeline completed.
    Success,
    /// Terminal: pipeline failed.
    Failure,
}

impl Step {
    /// Whether this is one of the two terminal stages.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failure)
    }
}

/// How the active account signs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccountMode {
    /// Connected wallet that can sign.
    #[default]
    Wallet,
    /// Watch-only address; execution is unavailable.
    Watch,
}

/// Live wallet/session handle.
///
/// Deliberately not serializable: connection handles never survive a reload
/// and are excluded from persisted snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletHandle {
    /// Session identifier with the wallet bridge.
    pub session_id: Uuid,
    /// Display label ("MetaMask", "Ledger …").
    pub label: String,
}

/// Environment facts needed by stage effects.
#[derive(Debug, Clone, PartialEq)]
pub struct CoreContext {
    /// Currently selected chain.
    pub chain_id: ChainId,
    /// Signing capability of the active account.
    pub account_mode: AccountMode,
    /// Live wallet handle, when connected.
    pub wallet: Option<WalletHandle>,
    /// Address transactions are sent from.
    pub sender: Option<Address>,
    /// Per-user duplicate-submission ledger.
    pub idempotency: IdempotencyLedger,
}

impl CoreContext {
    /// Fresh context for a chain with no wallet connected.
    #[must_use]
    pub fn new(chain_id: ChainId) -> Self {
        Self {
            chain_id,
            account_mode: AccountMode::default(),
            wallet: None,
            sender: None,
            idempotency: IdempotencyLedger::default(),
        }
    }
}

/// A non-flow view pushed onto the navigation stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewFrame {
    /// View name known to the presentation layer.
    pub name: String,
    /// Opaque view parameter.
    pub param: Option<String>,
}

/// Overlay identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OverlayId(pub Uuid);

/// Kind of transient UI directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverlayKind {
    /// Modal confirmation prompt.
    Confirm,
    /// Auto-expiring toast.
    Toast,
}

/// Transient UI directive with a deadline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overlay {
    /// Identifier for targeted removal.
    pub id: OverlayId,
    /// Directive kind.
    pub kind: OverlayKind,
    /// Text shown to the user.
    pub text: String,
    /// Instant after which the overlay is pruned by the tick event.
    pub deadline: DateTime<Utc>,
}

impl Overlay {
    /// Build a toast that expires at `deadline`.
    #[must_use]
    pub fn toast(text: impl Into<String>, deadline: DateTime<Utc>) -> Self {
        Self { id: OverlayId(Uuid::new_v4()), kind: OverlayKind::Toast, text: text.into(), deadline }
    }
}

/// Who authored a chat entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChatRole {
    /// The user's own input.
    User,
    /// Narration produced by stage effects or the resolver.
    Assistant,
}

/// One line of the chat transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEntry {
    /// Author.
    pub role: ChatRole,
    /// Message text.
    pub text: String,
    /// When the entry was appended.
    pub at: DateTime<Utc>,
}

impl ChatEntry {
    /// Assistant-authored entry.
    #[must_use]
    pub fn assistant(text: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self { role: ChatRole::Assistant, text: text.into(), at }
    }

    /// User-authored entry.
    #[must_use]
    pub fn user(text: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self { role: ChatRole::User, text: text.into(), at }
    }
}

/// Pending clarify request raised by the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClarifyRequest {
    /// Question shown to the user.
    pub prompt: String,
    /// Fields the resolver could not fill.
    pub missing: Vec<String>,
}

/// Ambiguous-token disambiguation sub-state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSelection {
    /// Symbol that matched several tokens.
    pub symbol: String,
    /// Candidate tokens offered to the user.
    pub candidates: Vec<TokenInfo>,
    /// Stage that raised the ambiguity; re-entered after selection.
    pub origin: Step,
}

/// One active pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowContext {
    /// Pipeline kind. Provisional (`Transfer`) until parse resolves the
    /// intent; the parse wiring is identical across flows.
    pub name: FlowName,
    /// Current stage.
    pub step: Step,
    /// Re-entry counter: bumped when the same stage must run its entry effect
    /// again (token selection, retry). The effect runner keys on
    /// `(name, step, stage_epoch)`.
    pub stage_epoch: u64,
    /// Original user instruction.
    pub raw: String,
    /// Parse output.
    pub intent: Option<Intent>,
    /// Normalize output.
    pub norm: Option<NormalizedIntent>,
    /// Plan output.
    pub plan: Option<Route>,
    /// Simulate output.
    pub sim: Option<SimReport>,
    /// Execute output.
    pub exec: Option<ExecReceipt>,
    /// Monitor output.
    pub monitor: Option<MonitorReport>,
    /// Last failure, set only by FAIL events.
    pub error: Option<FlowError>,
    /// Pending clarify request while in the clarify stage.
    pub clarify: Option<ClarifyRequest>,
    /// Ambiguous-token sub-state.
    pub token_selection: Option<TokenSelection>,
    /// Index into `token_selection.candidates` once the user picked.
    pub selected_token_index: Option<usize>,
    /// Idempotency fingerprint recorded by this flow's execute stage.
    pub fingerprint: Option<String>,
}

impl FlowContext {
    /// New flow at the parse stage for the given raw instruction.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self {
            name: FlowName::Transfer,
            step: Step::Parse,
            stage_epoch: 0,
            raw: raw.into(),
            intent: None,
            norm: None,
            plan: None,
            sim: None,
            exec: None,
            monitor: None,
            error: None,
            clarify: None,
            token_selection: None,
            selected_token_index: None,
            fingerprint: None,
        }
    }

    /// Token chosen in the disambiguation sub-flow, if any.
    #[must_use]
    pub fn selected_token(&self) -> Option<&TokenInfo> {
        let selection = self.token_selection.as_ref()?;
        selection.candidates.get(self.selected_token_index?)
    }
}

/// Root application snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct AppState {
    /// Top-level mode. Invariant: `flow.is_some()` iff `mode == Mode::Flow`.
    pub mode: Mode,
    /// Active pipeline, when in flow mode.
    pub flow: Option<FlowContext>,
    /// Non-flow navigation stack.
    pub view_stack: Vec<ViewFrame>,
    /// Transient UI directives, pruned by ticks.
    pub overlays: Vec<Overlay>,
    /// Environment facts for effects.
    pub core: CoreContext,
    /// Current input-box contents.
    pub input_text: String,
    /// Chat transcript.
    pub chat: Vec<ChatEntry>,
}

impl AppState {
    /// Fresh state for the given environment context.
    #[must_use]
    pub fn new(core: CoreContext) -> Self {
        Self {
            mode: Mode::Idle,
            flow: None,
            view_stack: Vec::new(),
            overlays: Vec::new(),
            core,
            input_text: String::new(),
            chat: Vec::new(),
        }
    }

    /// Active `(name, step, epoch)` key used by the effect runner to detect
    /// stage changes.
    #[must_use]
    pub fn stage_key(&self) -> Option<(FlowName, Step, u64)> {
        self.flow.as_ref().map(|f| (f.name, f.step, f.stage_epoch))
    }
}

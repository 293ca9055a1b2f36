//! Collaborator service traits injected into stage effects.
//!
//! All external dependencies sit behind dyn-compatible traits so production
//! implementations and test mocks are interchangeable. Traits return explicit
//! `Pin<Box<dyn Future>>` instead of `async fn` to allow `Arc<dyn …>` trait
//! objects inside effect closures.

use crate::domain::{
    Address, ChainId, ExecReceipt, Intent, MonitorReport, NormalizedIntent, Route, SimReport,
    TokenInfo, TxHash,
};
use crate::error::ServiceError;
use crate::state::{AccountMode, WalletHandle};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed future returned by service trait methods.
pub type ServiceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ServiceError>> + Send + 'a>>;

/// Clock trait - abstracts time for testability.
pub trait Clock: Send + Sync {
    /// Current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// System clock used in production.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// What the intent resolver made of the raw instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// A complete transaction intent.
    Intent(Intent),
    /// The instruction was incomplete; ask the user.
    Clarify {
        /// Question for the user.
        prompt: String,
        /// Fields that could not be filled.
        missing: Vec<String>,
    },
    /// Not a transaction at all; plain conversational reply.
    Chat(String),
    /// A token symbol matched several candidates.
    TokenSelection {
        /// Ambiguous symbol.
        symbol: String,
        /// Candidate tokens.
        candidates: Vec<TokenInfo>,
    },
}

/// Natural-language intent resolution.
pub trait IntentResolver: Send + Sync {
    /// Resolve raw instruction text.
    fn resolve<'a>(&'a self, raw: &'a str) -> ServiceFuture<'a, Resolution>;
}

/// Context the normalizer needs beyond the intent itself.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizeHints {
    /// Chain to resolve symbols against when the intent names none.
    pub preferred_chain: ChainId,
    /// Sender, for balance-aware normalization.
    pub sender: Option<Address>,
    /// Token chosen in a disambiguation sub-flow, if any.
    pub token_override: Option<TokenInfo>,
}

/// Failure modes specific to normalization.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NormalizeError {
    /// A symbol matched several tokens; the user must pick one.
    #[error("token symbol {symbol} is ambiguous")]
    TokenAmbiguous {
        /// Ambiguous symbol.
        symbol: String,
        /// Candidate tokens.
        candidates: Vec<TokenInfo>,
    },
    /// Any other normalization failure.
    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// Symbol/amount resolution against live token lists.
pub trait Normalizer: Send + Sync {
    /// Resolve an intent's symbols into concrete tokens.
    fn normalize<'a>(
        &'a self,
        intent: &'a Intent,
        hints: &'a NormalizeHints,
    ) -> Pin<Box<dyn Future<Output = Result<NormalizedIntent, NormalizeError>> + Send + 'a>>;
}

/// Route planning/quoting.
pub trait RoutePlanner: Send + Sync {
    /// Plan an executable route for the normalized intent.
    fn plan<'a>(
        &'a self,
        norm: &'a NormalizedIntent,
        slippage_bps: u16,
    ) -> ServiceFuture<'a, Route>;
}

/// Static validation and on-chain simulation.
pub trait Simulator: Send + Sync {
    /// Cheap static checks (balances, allowances, address sanity).
    fn validate<'a>(
        &'a self,
        norm: &'a NormalizedIntent,
        sender: Option<&'a Address>,
    ) -> ServiceFuture<'a, ()>;

    /// Full simulation of the pipeline against current chain state.
    fn simulate<'a>(
        &'a self,
        norm: &'a NormalizedIntent,
        sender: Option<&'a Address>,
    ) -> ServiceFuture<'a, SimReport>;
}

/// Signing and broadcasting.
pub trait Executor: Send + Sync {
    /// Execute the normalized intent, optionally along a planned route.
    fn execute<'a>(
        &'a self,
        norm: &'a NormalizedIntent,
        account_mode: AccountMode,
        wallet: &'a WalletHandle,
        route: Option<&'a Route>,
    ) -> ServiceFuture<'a, ExecReceipt>;
}

/// Transaction inclusion monitoring.
pub trait TxMonitor: Send + Sync {
    /// Poll the current status of a broadcast transaction.
    fn poll<'a>(&'a self, chain_id: ChainId, tx_hash: &'a TxHash) -> ServiceFuture<'a, MonitorReport>;
}

/// Bundle of collaborator services handed to stage effects.
#[derive(Clone)]
pub struct Services {
    /// Time source.
    pub clock: Arc<dyn Clock>,
    /// Natural-language intent resolution.
    pub resolver: Arc<dyn IntentResolver>,
    /// Symbol/amount resolution.
    pub normalizer: Arc<dyn Normalizer>,
    /// Route planning.
    pub planner: Arc<dyn RoutePlanner>,
    /// Validation and simulation.
    pub simulator: Arc<dyn Simulator>,
    /// Signing and broadcasting.
    pub executor: Arc<dyn Executor>,
    /// Inclusion monitoring.
    pub monitor: Arc<dyn TxMonitor>,
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services").finish_non_exhaustive()
    }
}

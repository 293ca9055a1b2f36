//! Error taxonomy for flows and their collaborating services.
//!
//! Every failure, whether raised by business logic or by a crashed effect,
//! converges on the same [`FlowError`] shape so the failure stage can render
//! one message plus one code-specific remediation hint.

use crate::domain::TxHash;
use crate::state::Step;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Machine-readable failure codes.
///
/// Codes are part of the persisted snapshot and of the UI contract; renaming
/// a variant is a breaking change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// No wallet/session handle available for a signing operation.
    AuthRequired,
    /// Identical transaction already submitted within the idempotency window.
    DuplicateTransaction,
    /// Planner found no executable route.
    NoRouteFound,
    /// Planned route delivers a different final token than requested.
    RouteFinalTokenMismatch,
    /// A route step's declared and deliverable tokens disagree.
    RouteStepTokenMismatch,
    /// Token symbol matched several candidates and none was selected.
    TokenAmbiguous,
    /// Static validation rejected the normalized intent.
    ValidationFailed,
    /// Simulation predicted the transaction would fail on chain.
    SimulationFailed,
    /// Broadcast or signing failed.
    ExecutionFailed,
    /// Transaction was included but reverted.
    TxReverted,
    /// Monitor gave up waiting for inclusion.
    MonitorTimeout,
    /// Intent resolver could not be reached.
    ResolverUnavailable,
    /// A stage effect crashed without reporting an application error.
    EffectError,
}

impl ErrorCode {
    /// Remediation hint shown next to the failure message.
    #[must_use]
    pub const fn hint(self) -> &'static str {
        match self {
            Self::AuthRequired => "connect a wallet and try again",
            Self::DuplicateTransaction => "an identical transaction was just submitted; wait a moment before retrying",
            Self::NoRouteFound => "try a smaller amount or a different token pair",
            Self::RouteFinalTokenMismatch | Self::RouteStepTokenMismatch => {
                "the quoted route was rejected for your safety; retry to request a fresh quote"
            },
            Self::TokenAmbiguous => "pick one of the listed tokens to continue",
            Self::ValidationFailed | Self::SimulationFailed => "check balances and allowances, then retry",
            Self::ExecutionFailed => "the transaction was not broadcast; retry when ready",
            Self::TxReverted => "the transaction reverted on chain; funds were not transferred",
            Self::MonitorTimeout => "inclusion is taking longer than expected; check the explorer link",
            Self::ResolverUnavailable => "the assistant is unreachable; try again shortly",
            Self::EffectError => "an internal error interrupted this step; retry the flow",
        }
    }
}

/// Failure record attached to a flow when it enters the failure stage.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{code:?} during {phase:?}: {message}")]
pub struct FlowError {
    /// Machine-readable code.
    pub code: ErrorCode,
    /// User-facing message.
    pub message: String,
    /// Optional diagnostic detail (not shown inline).
    pub detail: Option<String>,
    /// Stage that was active when the failure happened.
    pub phase: Step,
}

impl FlowError {
    /// Build an error for the given stage.
    #[must_use]
    pub fn new(code: ErrorCode, phase: Step, message: impl Into<String>) -> Self {
        Self { code, message: message.into(), detail: None, phase }
    }

    /// Attach diagnostic detail.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Generic "effect crashed" error synthesized by the runner.
    #[must_use]
    pub fn effect_error(phase: Step) -> Self {
        Self::new(ErrorCode::EffectError, phase, "the step failed unexpectedly")
    }

    /// Missing wallet/session precondition.
    #[must_use]
    pub fn auth_required(phase: Step) -> Self {
        Self::new(ErrorCode::AuthRequired, phase, "a connected wallet is required for this step")
    }

    /// Idempotency-ledger hit, carrying the prior transaction when known.
    #[must_use]
    pub fn duplicate(phase: Step, prior_tx: Option<&TxHash>) -> Self {
        let err = Self::new(
            ErrorCode::DuplicateTransaction,
            phase,
            "this transaction was already submitted",
        );
        match prior_tx {
            Some(hash) => err.with_detail(format!("prior tx {hash}")),
            None => err,
        }
    }

    /// Lift a service error into a flow error for the given stage.
    #[must_use]
    pub fn from_service(err: ServiceError, phase: Step) -> Self {
        Self { code: err.code, message: err.message, detail: err.detail, phase }
    }
}

/// Error reported by a collaborator service, before a stage is attached.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code:?}: {message}")]
pub struct ServiceError {
    /// Machine-readable code.
    pub code: ErrorCode,
    /// User-facing message.
    pub message: String,
    /// Optional diagnostic detail.
    pub detail: Option<String>,
}

impl ServiceError {
    /// Build a service error.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into(), detail: None }
    }

    /// Attach diagnostic detail.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_carries_prior_tx_reference() {
        let hash = TxHash("0xfeed".to_string());
        let err = FlowError::duplicate(Step::Execute, Some(&hash));
        assert_eq!(err.code, ErrorCode::DuplicateTransaction);
        assert_eq!(err.detail.as_deref(), Some("prior tx 0xfeed"));
    }

    #[test]
    fn every_code_has_a_hint() {
        // A missing hint arm would be a compile error, but make sure none are empty.
        let codes = [
            ErrorCode::AuthRequired,
            ErrorCode::DuplicateTransaction,
            ErrorCode::NoRouteFound,
            ErrorCode::RouteFinalTokenMismatch,
            ErrorCode::RouteStepTokenMismatch,
            ErrorCode::TokenAmbiguous,
            ErrorCode::ValidationFailed,
            ErrorCode::SimulationFailed,
            ErrorCode::ExecutionFailed,
            ErrorCode::TxReverted,
            ErrorCode::MonitorTimeout,
            ErrorCode::ResolverUnavailable,
            ErrorCode::EffectError,
        ];
        for code in codes {
            assert!(!code.hint().is_empty());
        }
    }
}

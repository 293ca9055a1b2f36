//! # Chainflow Core
//!
//! Core types and traits for the chainflow transaction orchestrator.
//!
//! A user's free-text request ("transfer 0.1 ETH to 0xabc…") is driven
//! through a staged pipeline — parse, normalize, validate, plan, simulate,
//! confirm, execute, monitor — as a sequence of events folded over shared
//! state by a pure reducer. Side effects live entirely outside the reducer:
//! the runtime diffs consecutive states and launches or cancels per-stage
//! effects declared in a [`FlowRegistry`](registry::FlowRegistry).
//!
//! ## Core Concepts
//!
//! - **State**: [`AppState`](state::AppState), immutable behind `Arc`,
//!   cloned on write
//! - **Event**: [`Event`](event::Event), the only way state changes
//! - **Reducer**: pure `(Arc<State>, Event) → Arc<State>`; returns the same
//!   `Arc` when nothing changed
//! - **Registry**: declarative stage graph per flow (next/back edges, entry
//!   effects, auto-advance predicates)
//! - **Services**: async trait objects ([`services`]) injected into effects
//!
//! ## Example
//!
//! ```ignore
//! use chainflow_core::prelude::*;
//!
//! let reducer = FlowReducer::new(registry);
//! let state = Arc::new(AppState::new(CoreContext::new(ChainId(1))));
//! let next = reducer.reduce(&state, &Event::InputChanged("swap 5 USDC to WETH".into()));
//! assert!(!Arc::ptr_eq(&state, &next));
//! ```

pub mod domain;
pub mod error;
pub mod event;
pub mod ledger;
pub mod reducer;
pub mod registry;
pub mod services;
pub mod state;

/// Commonly used items, re-exported for downstream crates.
pub mod prelude {
    pub use crate::domain::{
        Address, Amount, ChainId, ExecReceipt, FlowName, Intent, MonitorReport, NormalizedIntent,
        Route, RouteStep, SimReport, TokenInfo, TxHash, TxStatus,
    };
    pub use crate::error::{ErrorCode, FlowError, ServiceError};
    pub use crate::event::{Dispatcher, Event, StagePayload};
    pub use crate::ledger::{IdempotencyLedger, LedgerStatus, fingerprint};
    pub use crate::reducer::{FlowReducer, Reducer};
    pub use crate::registry::{EffectContext, FlowRegistry, StageSpec, entry_effect};
    pub use crate::services::{Clock, Services, SystemClock};
    pub use crate::state::{
        AccountMode, AppState, CoreContext, FlowContext, Mode, Overlay, Step,
    };
    pub use std::sync::Arc;
}

pub use chrono::{DateTime, Utc};

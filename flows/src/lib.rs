//! # Chainflow Flows
//!
//! The four transaction pipelines — transfer, swap, bridge, bridge-swap —
//! expressed as registry wiring plus per-stage entry effects. Everything
//! here is declarative glue: stage order lives in the registry, business
//! rules live in the effects, and both talk to the outside world only
//! through the collaborator service traits.

use chainflow_runtime::retry::RetryPolicy;
use std::time::Duration;

mod stages;

/// Registry wiring.
pub mod registry;

pub use registry::standard_registry;

/// Tunables for the stage effects.
#[derive(Debug, Clone)]
pub struct FlowsConfig {
    /// Slippage tolerance passed to the route planner, in basis points.
    pub slippage_bps: u16,
    /// Retry policy for the executor call.
    pub retry_policy: RetryPolicy,
    /// Pause between monitor polls.
    pub monitor_poll_interval: Duration,
    /// Give up monitoring after this long.
    pub monitor_deadline: Duration,
}

impl Default for FlowsConfig {
    fn default() -> Self {
        Self {
            slippage_bps: 50,
            retry_policy: RetryPolicy::default(),
            monitor_poll_interval: Duration::from_secs(3),
            monitor_deadline: Duration::from_secs(120),
        }
    }
}

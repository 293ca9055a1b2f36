//! Domain types shared by every pipeline: chains, tokens, amounts, intents,
//! routes and execution receipts.
//!
//! Stage payloads are sum types keyed by the pipeline kind, so a transfer can
//! never carry a swap route and the compiler checks what each stage may read.

use serde::{Deserialize, Serialize};
use std::fmt;

/// EVM-style chain identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChainId(pub u64);

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Account or contract address, kept as the original checksummed string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address(pub String);

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Transaction hash as returned by the executor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxHash(pub String);

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Token amount in base units (wei-scale).
///
/// Serialized as a decimal string rather than a JSON number: amounts routinely
/// exceed 2^53 and must round-trip exactly through persisted snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(pub u128);

impl Amount {
    /// Zero amount.
    pub const ZERO: Self = Self(0);
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Amount {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse::<u128>()
            .map(Amount)
            .map_err(|e| serde::de::Error::custom(format!("invalid amount {raw:?}: {e}")))
    }
}

/// Fully resolved token reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    /// Ticker symbol as displayed to the user.
    pub symbol: String,
    /// Canonical contract address (native tokens use the zero address).
    pub address: Address,
    /// Chain the token lives on.
    pub chain_id: ChainId,
    /// Decimal places for display scaling.
    pub decimals: u8,
}

/// Which pipeline a flow runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FlowName {
    /// Same-chain token transfer.
    Transfer,
    /// Same-chain token swap.
    Swap,
    /// Cross-chain bridge of one token.
    Bridge,
    /// Cross-chain bridge combined with a swap on the destination chain.
    BridgeSwap,
}

impl FlowName {
    /// All pipeline kinds, for registry wiring.
    pub const ALL: [Self; 4] = [Self::Transfer, Self::Swap, Self::Bridge, Self::BridgeSwap];
}

impl fmt::Display for FlowName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transfer => f.write_str("transfer"),
            Self::Swap => f.write_str("swap"),
            Self::Bridge => f.write_str("bridge"),
            Self::BridgeSwap => f.write_str("bridge-swap"),
        }
    }
}

/// What the user asked for, as resolved from raw text.
///
/// Token fields are still plain symbols here; the normalizer resolves them to
/// [`TokenInfo`] against the selected chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Intent {
    /// Send `amount` of `token` to `to`.
    Transfer {
        /// Token symbol.
        token: String,
        /// Amount in base units.
        amount: Amount,
        /// Recipient address.
        to: Address,
    },
    /// Swap `amount` of `from_token` into `to_token` on the current chain.
    Swap {
        /// Input token symbol.
        from_token: String,
        /// Output token symbol.
        to_token: String,
        /// Input amount in base units.
        amount: Amount,
    },
    /// Bridge `amount` of `token` from one chain to another.
    Bridge {
        /// Token symbol.
        token: String,
        /// Amount in base units.
        amount: Amount,
        /// Source chain.
        from_chain: ChainId,
        /// Destination chain.
        to_chain: ChainId,
    },
    /// Bridge and swap in one pipeline.
    BridgeSwap {
        /// Input token symbol on the source chain.
        from_token: String,
        /// Output token symbol on the destination chain.
        to_token: String,
        /// Input amount in base units.
        amount: Amount,
        /// Source chain.
        from_chain: ChainId,
        /// Destination chain.
        to_chain: ChainId,
    },
}

impl Intent {
    /// Pipeline kind this intent maps to.
    #[must_use]
    pub const fn flow_name(&self) -> FlowName {
        match self {
            Self::Transfer { .. } => FlowName::Transfer,
            Self::Swap { .. } => FlowName::Swap,
            Self::Bridge { .. } => FlowName::Bridge,
            Self::BridgeSwap { .. } => FlowName::BridgeSwap,
        }
    }
}

/// Intent with every token resolved and amounts validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum NormalizedIntent {
    /// Resolved transfer.
    Transfer {
        /// Resolved token.
        token: TokenInfo,
        /// Amount in base units.
        amount: Amount,
        /// Recipient address.
        to: Address,
    },
    /// Resolved swap.
    Swap {
        /// Resolved input token.
        from: TokenInfo,
        /// Resolved output token.
        to: TokenInfo,
        /// Input amount in base units.
        amount: Amount,
    },
    /// Resolved bridge.
    Bridge {
        /// Resolved token on the source chain.
        token: TokenInfo,
        /// Amount in base units.
        amount: Amount,
        /// Source chain.
        from_chain: ChainId,
        /// Destination chain.
        to_chain: ChainId,
    },
    /// Resolved bridge-swap.
    BridgeSwap {
        /// Resolved input token on the source chain.
        from: TokenInfo,
        /// Resolved output token on the destination chain.
        to: TokenInfo,
        /// Input amount in base units.
        amount: Amount,
        /// Source chain.
        from_chain: ChainId,
        /// Destination chain.
        to_chain: ChainId,
    },
}

impl NormalizedIntent {
    /// Pipeline kind this intent maps to.
    #[must_use]
    pub const fn flow_name(&self) -> FlowName {
        match self {
            Self::Transfer { .. } => FlowName::Transfer,
            Self::Swap { .. } => FlowName::Swap,
            Self::Bridge { .. } => FlowName::Bridge,
            Self::BridgeSwap { .. } => FlowName::BridgeSwap,
        }
    }

    /// Token the user expects to end up holding when the pipeline completes.
    #[must_use]
    pub const fn requested_final_token(&self) -> &TokenInfo {
        match self {
            Self::Transfer { token, .. } | Self::Bridge { token, .. } => token,
            Self::Swap { to, .. } | Self::BridgeSwap { to, .. } => to,
        }
    }

    /// Input amount in base units.
    #[must_use]
    pub const fn amount(&self) -> Amount {
        match self {
            Self::Transfer { amount, .. }
            | Self::Swap { amount, .. }
            | Self::Bridge { amount, .. }
            | Self::BridgeSwap { amount, .. } => *amount,
        }
    }

    /// Stable encoding used for idempotency fingerprints.
    ///
    /// Field order is fixed by the variant match below; two intents that are
    /// semantically identical always produce the same encoding.
    #[must_use]
    pub fn canonical_encoding(&self) -> String {
        match self {
            Self::Transfer { token, amount, to } => {
                format!("transfer|{}|{}|{}|{}", token.chain_id, token.address, amount, to)
            },
            Self::Swap { from, to, amount } => {
                format!("swap|{}|{}|{}|{}", from.chain_id, from.address, to.address, amount)
            },
            Self::Bridge { token, amount, from_chain, to_chain } => {
                format!("bridge|{}|{}|{}|{}", from_chain, to_chain, token.address, amount)
            },
            Self::BridgeSwap { from, to, amount, from_chain, to_chain } => {
                format!(
                    "bridge-swap|{}|{}|{}|{}|{}",
                    from_chain, to_chain, from.address, to.address, amount
                )
            },
        }
    }
}

/// One executable leg of a planned route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteStep {
    /// Human-readable description ("swap USDC → WETH on …").
    pub description: String,
    /// Token the planner claims this step delivers.
    pub declared_token: TokenInfo,
    /// Token the step's calldata actually delivers.
    pub delivered_token: TokenInfo,
}

impl RouteStep {
    /// Whether the declared and actually deliverable tokens agree.
    #[must_use]
    pub fn tokens_agree(&self) -> bool {
        self.declared_token.address == self.delivered_token.address
            && self.declared_token.chain_id == self.delivered_token.chain_id
    }
}

/// Planned execution route for a flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    /// Ordered executable steps.
    pub steps: Vec<RouteStep>,
    /// Slippage tolerance in basis points.
    pub slippage_bps: u16,
}

impl Route {
    /// Single-step route for pipelines that need no planning (plain transfer).
    #[must_use]
    pub fn direct(token: TokenInfo) -> Self {
        Self {
            steps: vec![RouteStep {
                description: format!("direct transfer of {}", token.symbol),
                declared_token: token.clone(),
                delivered_token: token,
            }],
            slippage_bps: 0,
        }
    }

    /// Token delivered by the final step, if the route has any steps.
    #[must_use]
    pub fn final_token(&self) -> Option<&TokenInfo> {
        self.steps.last().map(|s| &s.delivered_token)
    }
}

/// Outcome of the simulate stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimReport {
    /// Estimated gas for the full pipeline.
    pub gas_estimate: u64,
    /// Optional simulator notes surfaced to the user.
    pub notes: Option<String>,
}

/// Outcome of the execute stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecReceipt {
    /// Hash of the broadcast transaction.
    pub tx_hash: TxHash,
    /// Block-explorer link for the transaction.
    pub explorer_url: String,
    /// Short status line for the chat transcript.
    pub message: String,
}

/// On-chain status reported by the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TxStatus {
    /// Not yet included.
    Pending,
    /// Included and successful.
    Confirmed,
    /// Included but reverted.
    Failed,
}

/// Outcome of one monitor poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorReport {
    /// Current status.
    pub status: TxStatus,
    /// Inclusion details once the transaction is mined.
    pub receipt: Option<TxReceiptSummary>,
}

/// Minimal receipt projection kept in flow state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceiptSummary {
    /// Block the transaction landed in.
    pub block_number: u64,
    /// Gas actually consumed.
    pub gas_used: u64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn weth() -> TokenInfo {
        TokenInfo {
            symbol: "WETH".to_string(),
            address: Address("0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2".to_string()),
            chain_id: ChainId(1),
            decimals: 18,
        }
    }

    #[test]
    fn amount_serializes_as_decimal_string() {
        let json = serde_json::to_string(&Amount(u128::MAX)).unwrap();
        assert_eq!(json, format!("\"{}\"", u128::MAX));

        let back: Amount = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Amount(u128::MAX));
    }

    #[test]
    fn amount_rejects_non_numeric_strings() {
        let err = serde_json::from_str::<Amount>("\"12abc\"");
        assert!(err.is_err());
    }

    #[test]
    fn canonical_encoding_is_stable() {
        let norm = NormalizedIntent::Transfer {
            token: weth(),
            amount: Amount(1_000_000_000_000_000),
            to: Address("0xABC".to_string()),
        };
        assert_eq!(norm.canonical_encoding(), norm.clone().canonical_encoding());
        assert!(norm.canonical_encoding().starts_with("transfer|1|"));
    }

    #[test]
    fn direct_route_delivers_requested_token() {
        let route = Route::direct(weth());
        assert_eq!(route.steps.len(), 1);
        assert!(route.steps[0].tokens_agree());
        assert_eq!(route.final_token().map(|t| t.symbol.as_str()), Some("WETH"));
    }
}

//! Duplicate-submission protection.
//!
//! The ledger maps a content-derived fingerprint to the coarse time bucket it
//! was first submitted in. Entries are appended when the execute stage starts
//! and never removed within the process lifetime; staleness is decided by
//! bucket comparison, not deletion. The execute effect consults the ledger
//! synchronously against the state snapshot it was launched with, and records
//! through a reducer event, so check-then-act is serialized by dispatch.

use crate::domain::{Address, NormalizedIntent, TxHash};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Default width of one idempotency bucket.
pub const DEFAULT_BUCKET_SECS: u64 = 120;

/// Lifecycle of a recorded submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LedgerStatus {
    /// Execute started; no transaction hash yet.
    Pending,
    /// Transaction broadcast.
    Submitted,
    /// The owning flow failed; the fingerprint no longer blocks resubmission.
    Failed,
}

/// One ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Bucket the submission happened in.
    pub bucket: u64,
    /// Current lifecycle status.
    pub status: LedgerStatus,
    /// Broadcast transaction, once known.
    pub tx_hash: Option<TxHash>,
}

/// Fingerprint → bucket map guarding against duplicate submissions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdempotencyLedger {
    bucket_secs: u64,
    entries: HashMap<String, LedgerEntry>,
}

impl Default for IdempotencyLedger {
    fn default() -> Self {
        Self::new(DEFAULT_BUCKET_SECS)
    }
}

impl IdempotencyLedger {
    /// Ledger with the given bucket width in seconds.
    #[must_use]
    pub fn new(bucket_secs: u64) -> Self {
        Self { bucket_secs: bucket_secs.max(1), entries: HashMap::new() }
    }

    /// Bucket index for an instant.
    #[must_use]
    #[allow(clippy::cast_sign_loss)] // timestamps before 1970 clamp to bucket 0
    pub fn bucket_for(&self, now: DateTime<Utc>) -> u64 {
        (now.timestamp().max(0) as u64) / self.bucket_secs
    }

    /// Look up a blocking entry: same fingerprint, same bucket, not failed.
    #[must_use]
    pub fn blocking_entry(&self, fingerprint: &str, bucket: u64) -> Option<&LedgerEntry> {
        self.entries
            .get(fingerprint)
            .filter(|e| e.bucket == bucket && e.status != LedgerStatus::Failed)
    }

    /// Append an entry for a fingerprint (overwrites a stale bucket's entry).
    pub fn record(&mut self, fingerprint: impl Into<String>, bucket: u64) {
        self.entries.insert(
            fingerprint.into(),
            LedgerEntry { bucket, status: LedgerStatus::Pending, tx_hash: None },
        );
    }

    /// Attach the broadcast transaction to a pending entry.
    pub fn mark_submitted(&mut self, fingerprint: &str, tx_hash: TxHash) {
        if let Some(entry) = self.entries.get_mut(fingerprint) {
            entry.status = LedgerStatus::Submitted;
            entry.tx_hash = Some(tx_hash);
        }
    }

    /// Mark an entry failed so the fingerprint stops blocking resubmission.
    pub fn mark_failed(&mut self, fingerprint: &str) {
        if let Some(entry) = self.entries.get_mut(fingerprint) {
            entry.status = LedgerStatus::Failed;
        }
    }

    /// Entry for a fingerprint regardless of bucket.
    #[must_use]
    pub fn get(&self, fingerprint: &str) -> Option<&LedgerEntry> {
        self.entries.get(fingerprint)
    }

    /// Bucket width in seconds.
    #[must_use]
    pub const fn bucket_secs(&self) -> u64 {
        self.bucket_secs
    }

    /// Explicit key/entry list for snapshot serialization.
    #[must_use]
    pub fn to_entries(&self) -> Vec<(String, LedgerEntry)> {
        let mut entries: Vec<_> =
            self.entries.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// Rebuild from a snapshot's explicit entry list.
    #[must_use]
    pub fn from_entries(bucket_secs: u64, entries: Vec<(String, LedgerEntry)>) -> Self {
        Self { bucket_secs: bucket_secs.max(1), entries: entries.into_iter().collect() }
    }
}

/// Content-derived fingerprint for a submission: sha256 over the sender and
/// the intent's canonical encoding.
#[must_use]
pub fn fingerprint(sender: &Address, norm: &NormalizedIntent) -> String {
    let mut hasher = Sha256::new();
    hasher.update(sender.0.as_bytes());
    hasher.update(b"|");
    hasher.update(norm.canonical_encoding().as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::{Amount, ChainId, TokenInfo};
    use chrono::TimeZone;

    fn usdc() -> TokenInfo {
        TokenInfo {
            symbol: "USDC".to_string(),
            address: Address("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48".to_string()),
            chain_id: ChainId(1),
            decimals: 6,
        }
    }

    fn transfer(amount: u128) -> NormalizedIntent {
        NormalizedIntent::Transfer {
            token: usdc(),
            amount: Amount(amount),
            to: Address("0xABC".to_string()),
        }
    }

    #[test]
    fn same_bucket_blocks_same_fingerprint() {
        let sender = Address("0xSENDER".to_string());
        let mut ledger = IdempotencyLedger::default();
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let bucket = ledger.bucket_for(now);

        let fp = fingerprint(&sender, &transfer(100));
        assert!(ledger.blocking_entry(&fp, bucket).is_none());

        ledger.record(fp.clone(), bucket);
        assert!(ledger.blocking_entry(&fp, bucket).is_some());
    }

    #[test]
    fn different_bucket_or_fingerprint_passes() {
        let sender = Address("0xSENDER".to_string());
        let mut ledger = IdempotencyLedger::new(60);
        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let t1 = t0 + chrono::Duration::seconds(120);

        let fp = fingerprint(&sender, &transfer(100));
        ledger.record(fp.clone(), ledger.bucket_for(t0));

        // Later bucket: passes.
        assert!(ledger.blocking_entry(&fp, ledger.bucket_for(t1)).is_none());

        // Different amount changes the fingerprint: passes in the same bucket.
        let other = fingerprint(&sender, &transfer(101));
        assert_ne!(fp, other);
        assert!(ledger.blocking_entry(&other, ledger.bucket_for(t0)).is_none());
    }

    #[test]
    fn failed_entries_stop_blocking() {
        let mut ledger = IdempotencyLedger::default();
        ledger.record("fp", 7);
        assert!(ledger.blocking_entry("fp", 7).is_some());

        ledger.mark_failed("fp");
        assert!(ledger.blocking_entry("fp", 7).is_none());
        // Entry is retained, only its status changes.
        assert_eq!(ledger.get("fp").map(|e| e.status), Some(LedgerStatus::Failed));
    }

    #[test]
    fn entries_round_trip_through_explicit_list() {
        let mut ledger = IdempotencyLedger::new(90);
        ledger.record("a", 1);
        ledger.record("b", 2);
        ledger.mark_submitted("b", TxHash("0xdead".to_string()));

        let rebuilt = IdempotencyLedger::from_entries(ledger.bucket_secs(), ledger.to_entries());
        assert_eq!(rebuilt, ledger);
    }
}

//! Pending entries and their canonical, deduplicated ordering

use crate::error::PlungerResult;
use crate::sources::PendingSource;

use ethers::types::Address;
use serde::Serialize;
use std::collections::{BTreeSet, VecDeque};
use tracing::{debug, info};

/// One transaction a source believes is not yet mined.
///
/// Ordering is `(nonce, tx_id)`; two entries are the same transaction only
/// when both fields match. Entries sharing a nonce with different ids are
/// competing transactions for one slot and are kept apart.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PendingEntry {
    pub nonce: u64,
    pub tx_id: String,
}

impl PendingEntry {
    /// Hex ids are case-insensitive, so they are stored lowercase
    pub fn new(tx_id: &str, nonce: u64) -> Self {
        Self {
            nonce,
            tx_id: tx_id.trim().to_ascii_lowercase(),
        }
    }

    /// Whether the nonce is still open after `last_confirmed` was mined
    pub fn is_unconfirmed(&self, last_confirmed: Option<u64>) -> bool {
        last_confirmed.map_or(true, |confirmed| self.nonce > confirmed)
    }
}

/// Drop every entry whose nonce has already been used on chain
pub fn filter_unconfirmed(
    entries: impl IntoIterator<Item = PendingEntry>,
    last_confirmed: Option<u64>,
) -> Vec<PendingEntry> {
    entries
        .into_iter()
        .filter(|entry| entry.is_unconfirmed(last_confirmed))
        .collect()
}

/// Snapshot of the account's pending transactions for one run.
///
/// Sorted ascending by `(nonce, tx_id)`, free of exact duplicates, and every
/// nonce is above the last confirmed one at snapshot time. Only the override
/// executor shrinks it, from the front.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CanonicalPendingSet {
    entries: VecDeque<PendingEntry>,
}

impl CanonicalPendingSet {
    /// Filter, deduplicate and order raw source entries
    pub fn from_entries(
        entries: impl IntoIterator<Item = PendingEntry>,
        last_confirmed: Option<u64>,
    ) -> Self {
        let unique: BTreeSet<PendingEntry> = filter_unconfirmed(entries, last_confirmed)
            .into_iter()
            .collect();

        Self {
            entries: unique.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingEntry> {
        self.entries.iter()
    }

    #[cfg(test)]
    pub fn contains(&self, entry: &PendingEntry) -> bool {
        self.entries.contains(entry)
    }

    #[cfg(test)]
    pub fn contains_nonce(&self, nonce: u64) -> bool {
        self.entries.iter().any(|entry| entry.nonce == nonce)
    }

    /// Highest pending nonce, the watcher's target
    pub fn max_nonce(&self) -> Option<u64> {
        self.entries.back().map(|entry| entry.nonce)
    }

    /// Distinct nonces in ascending order
    pub fn unique_nonces(&self) -> Vec<u64> {
        let mut nonces: Vec<u64> = self.entries.iter().map(|entry| entry.nonce).collect();
        nonces.dedup();
        nonces
    }

    /// Remove the head entry once a replacement for it has been dispatched
    pub(crate) fn pop_front(&mut self) -> Option<PendingEntry> {
        self.entries.pop_front()
    }
}

/// Collect pending entries from every enabled source into a canonical set.
///
/// Sources are queried one after the other; the first failing source aborts
/// the aggregation.
pub async fn aggregate(
    sources: &[Box<dyn PendingSource>],
    account: Address,
    last_confirmed: Option<u64>,
) -> PlungerResult<CanonicalPendingSet> {
    let mut collected = Vec::new();

    for source in sources {
        let entries = source.list_pending(account).await?;
        debug!(
            source = source.kind().name(),
            count = entries.len(),
            "Source reported pending transactions"
        );
        collected.extend(entries);
    }

    let reported = collected.len();
    let set = CanonicalPendingSet::from_entries(collected, last_confirmed);

    info!(
        reported,
        pending = set.len(),
        last_confirmed = ?last_confirmed,
        "Aggregated pending transactions"
    );

    Ok(set)
}

//! Pending transaction sources
//!
//! Each source reduces one backend's view of the account's unconfirmed
//! transactions to a list of [`PendingEntry`] values:
//! - `etherscan`: scrapes the block explorer's pending transaction pages
//! - `parity_txqueue`: the node's `parity_pendingTransactions` queue
//! - `jsonrpc_getblock`: transactions of the node's pending block

pub mod etherscan;
pub mod getblock;
pub mod parity;

pub use etherscan::EtherscanSource;
pub use getblock::PendingBlockSource;
pub use parity::ParityTxQueueSource;

use crate::chain::ChainProvider;
use crate::error::{PlungerError, PlungerResult};
use crate::reconcile::PendingEntry;

use async_trait::async_trait;
use ethers::types::Address;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Supported pending transaction sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Etherscan,
    ParityTxQueue,
    JsonRpcGetBlock,
}

impl SourceKind {
    pub const ALL: [SourceKind; 3] = [
        SourceKind::Etherscan,
        SourceKind::ParityTxQueue,
        SourceKind::JsonRpcGetBlock,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SourceKind::Etherscan => "etherscan",
            SourceKind::ParityTxQueue => "parity_txqueue",
            SourceKind::JsonRpcGetBlock => "jsonrpc_getblock",
        }
    }
}

impl FromStr for SourceKind {
    type Err = PlungerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SourceKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| PlungerError::UnknownSource(vec![s.to_string()]))
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A backend able to report the account's pending transactions
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PendingSource: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// Transactions sent by `account` that the backend believes unconfirmed.
    ///
    /// An empty list is a valid answer; transport and parse failures are errors.
    async fn list_pending(&self, account: Address) -> PlungerResult<Vec<PendingEntry>>;
}

/// Instantiate the requested sources in the order given
pub fn build_sources(
    kinds: &[SourceKind],
    provider: Arc<ChainProvider>,
    explorer_url: &str,
    http: reqwest::Client,
) -> Vec<Box<dyn PendingSource>> {
    kinds
        .iter()
        .map(|kind| -> Box<dyn PendingSource> {
            match kind {
                SourceKind::Etherscan => Box::new(EtherscanSource::new(explorer_url, http.clone())),
                SourceKind::ParityTxQueue => Box::new(ParityTxQueueSource::new(provider.clone())),
                SourceKind::JsonRpcGetBlock => Box::new(PendingBlockSource::new(provider.clone())),
            }
        })
        .collect()
}

/// Transaction object as returned by the node's JSON-RPC
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcTransaction {
    pub hash: String,
    pub nonce: String,
    pub from: String,
    #[serde(default)]
    pub block_number: Option<String>,
}

/// Keep the transactions sent by `account` and normalize them
pub(crate) fn entries_from_rpc(
    kind: SourceKind,
    transactions: Vec<RpcTransaction>,
    account: Address,
    unmined_only: bool,
) -> PlungerResult<Vec<PendingEntry>> {
    let account = format!("{:?}", account);

    transactions
        .into_iter()
        .filter(|tx| tx.from.eq_ignore_ascii_case(&account))
        .filter(|tx| !unmined_only || tx.block_number.is_none())
        .map(|tx| {
            let nonce = parse_hex_nonce(&tx.nonce).map_err(|e| {
                PlungerError::source_failure(kind.name(), format!("tx {}: {}", tx.hash, e))
            })?;
            Ok(PendingEntry::new(&tx.hash, nonce))
        })
        .collect()
}

/// Parse a `0x`-prefixed hexadecimal quantity
pub(crate) fn parse_hex_nonce(value: &str) -> Result<u64, String> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .ok_or_else(|| format!("nonce {:?} is not hex encoded", value))?;

    u64::from_str_radix(digits, 16).map_err(|e| format!("invalid nonce {:?}: {}", value, e))
}

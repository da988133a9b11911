//! Pending transactions from the node's `pending` block

use super::{entries_from_rpc, PendingSource, RpcTransaction, SourceKind};
use crate::chain::ChainProvider;
use crate::error::{PlungerError, PlungerResult};
use crate::reconcile::PendingEntry;

use async_trait::async_trait;
use ethers::types::Address;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// `eth_getBlockByNumber("pending", true)` response, full transaction objects
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PendingBlock {
    #[serde(default)]
    pub transactions: Vec<RpcTransaction>,
}

pub struct PendingBlockSource {
    provider: Arc<ChainProvider>,
}

impl PendingBlockSource {
    pub fn new(provider: Arc<ChainProvider>) -> Self {
        warn!("jsonrpc_getblock requires Parity/OpenEthereum in mining configuration");
        Self { provider }
    }
}

#[async_trait]
impl PendingSource for PendingBlockSource {
    fn kind(&self) -> SourceKind {
        SourceKind::JsonRpcGetBlock
    }

    async fn list_pending(&self, account: Address) -> PlungerResult<Vec<PendingEntry>> {
        let block: Option<PendingBlock> = self
            .provider
            .request("eth_getBlockByNumber", ("pending", true))
            .await
            .map_err(|e| PlungerError::source_failure(self.kind().name(), e))?;

        // Nodes without a pending block answer null
        let Some(block) = block else {
            debug!("Node reported no pending block");
            return Ok(Vec::new());
        };

        entries_from_rpc(self.kind(), block.transactions, account, false)
    }
}

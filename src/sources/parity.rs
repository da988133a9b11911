//! Pending transactions from the node's Parity/OpenEthereum transaction queue

use super::{entries_from_rpc, PendingSource, RpcTransaction, SourceKind};
use crate::chain::ChainProvider;
use crate::error::{PlungerError, PlungerResult};
use crate::reconcile::PendingEntry;

use async_trait::async_trait;
use ethers::types::Address;
use std::sync::Arc;
use tracing::debug;

pub struct ParityTxQueueSource {
    provider: Arc<ChainProvider>,
}

impl ParityTxQueueSource {
    pub fn new(provider: Arc<ChainProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl PendingSource for ParityTxQueueSource {
    fn kind(&self) -> SourceKind {
        SourceKind::ParityTxQueue
    }

    async fn list_pending(&self, account: Address) -> PlungerResult<Vec<PendingEntry>> {
        let queue: Vec<RpcTransaction> = self
            .provider
            .request("parity_pendingTransactions", Vec::<()>::new())
            .await
            .map_err(|e| PlungerError::source_failure(self.kind().name(), e))?;

        debug!(
            queued = queue.len(),
            "Fetched transaction queue from {}",
            self.provider.endpoint()
        );

        // The queue holds every sender's transactions, some of them possibly mined already
        entries_from_rpc(self.kind(), queue, account, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::testing::{mock_rpc, node};
    use serde_json::json;

    const ACCOUNT: &str = "0x6c626f45e3b7ae5a3998478753634790fd0e82ee";

    async fn source(server: &mockito::ServerGuard) -> ParityTxQueueSource {
        let provider = ChainProvider::new(&server.url()).await.unwrap();
        ParityTxQueueSource::new(Arc::new(provider))
    }

    #[tokio::test]
    async fn test_lists_unmined_transactions_of_the_account() {
        let (mut server, _chain_id) = node().await;
        let _queue = mock_rpc(
            &mut server,
            "parity_pendingTransactions",
            json!({ "result": [
                { "hash": "0xAA", "nonce": "0x9", "from": ACCOUNT, "blockNumber": null },
                { "hash": "0xbb", "nonce": "0xa", "from": ACCOUNT, "blockNumber": "0x10" },
                { "hash": "0xcc", "nonce": "0xb", "from": "0x0000000000000000000000000000000000000001", "blockNumber": null }
            ]}),
        )
        .await;

        let entries = source(&server)
            .await
            .list_pending(ACCOUNT.parse().unwrap())
            .await
            .unwrap();

        assert_eq!(entries, vec![PendingEntry::new("0xaa", 9)]);
    }

    #[tokio::test]
    async fn test_rpc_error_is_source_error() {
        let (mut server, _chain_id) = node().await;
        let _queue = mock_rpc(
            &mut server,
            "parity_pendingTransactions",
            json!({ "error": { "code": -32601, "message": "Method not found" } }),
        )
        .await;

        let err = source(&server)
            .await
            .list_pending(ACCOUNT.parse().unwrap())
            .await
            .unwrap_err();

        assert!(matches!(err, PlungerError::Source { ref name, .. } if name == "parity_txqueue"));
    }
}

//! Chain provider over a single JSON-RPC endpoint

use super::Chain;
use crate::error::{PlungerError, PlungerResult};

use ethers::prelude::*;
use ethers::providers::{Http, Provider};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use std::time::Duration;
use tracing::debug;

/// JSON-RPC access to the node the account lives on
pub struct ChainProvider {
    /// Endpoint URI, kept for logging
    endpoint: String,
    /// HTTP provider
    http: Provider<Http>,
    /// Chain ID reported by the node
    chain_id: u64,
}

impl ChainProvider {
    /// Connect to the endpoint and identify the chain
    pub async fn new(endpoint: &str) -> PlungerResult<Self> {
        let http = Provider::<Http>::try_from(endpoint)
            .map_err(|e| PlungerError::Config(format!("Invalid RPC endpoint {}: {}", endpoint, e)))?
            .interval(Duration::from_millis(100));

        let chain_id = http
            .get_chainid()
            .await
            .map_err(|e| PlungerError::Rpc(format!("eth_chainId on {}: {}", endpoint, e)))?
            .as_u64();

        debug!("Connected to {} (chain ID {})", endpoint, chain_id);

        Ok(Self {
            endpoint: endpoint.to_string(),
            http,
            chain_id,
        })
    }

    /// Get the HTTP provider
    pub fn http(&self) -> &Provider<Http> {
        &self.http
    }

    /// Get chain ID
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Human label of the chain
    pub fn chain(&self) -> Chain {
        Chain::from_id(self.chain_id)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Number of transactions the account has mined so far
    pub async fn transaction_count(&self, account: Address) -> PlungerResult<u64> {
        let count = self
            .http
            .get_transaction_count(account, Some(BlockNumber::Latest.into()))
            .await
            .map_err(|e| PlungerError::Rpc(format!("eth_getTransactionCount: {}", e)))?;

        Ok(count.as_u64())
    }

    /// Gas price suggested by the node
    pub async fn gas_price(&self) -> PlungerResult<U256> {
        self.http
            .get_gas_price()
            .await
            .map_err(|e| PlungerError::GasPrice(format!("eth_gasPrice: {}", e)))
    }

    /// Raw JSON-RPC call for methods ethers has no wrapper for
    pub async fn request<T, R>(&self, method: &str, params: T) -> PlungerResult<R>
    where
        T: Debug + Serialize + Send + Sync,
        R: Serialize + DeserializeOwned + Debug + Send,
    {
        self.http
            .request(method, params)
            .await
            .map_err(|e| PlungerError::Rpc(format!("{}: {}", method, e)))
    }
}

//! Gas price resolution for replacement transactions
//!
//! Strategies are consulted in priority order at every submission: a fixed
//! price, then a price oracle, then the node's own suggestion.

use crate::chain::ChainProvider;
use crate::config::GasConfig;
use crate::error::{PlungerError, PlungerResult};

use async_trait::async_trait;
use ethers::types::U256;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

const WEI_PER_GWEI: f64 = 1_000_000_000.0;

/// A source of gas price quotes
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GasOracle: Send + Sync {
    fn name(&self) -> &'static str;

    /// Current quote in wei, `None` when the oracle has nothing to offer
    async fn gas_price(&self) -> PlungerResult<Option<U256>>;
}

/// Caller supplied price
pub struct FixedGasPrice(pub U256);

#[async_trait]
impl GasOracle for FixedGasPrice {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn gas_price(&self) -> PlungerResult<Option<U256>> {
        Ok(Some(self.0))
    }
}

/// `eth_gasPrice` of the node, optionally with a buffer on top
pub struct NodeGasPrice {
    provider: Arc<ChainProvider>,
    /// Buffer percentage for gas price
    buffer_percent: u64,
}

impl NodeGasPrice {
    pub fn new(provider: Arc<ChainProvider>, buffer_percent: u64) -> Self {
        Self {
            provider,
            buffer_percent,
        }
    }
}

#[async_trait]
impl GasOracle for NodeGasPrice {
    fn name(&self) -> &'static str {
        "node"
    }

    async fn gas_price(&self) -> PlungerResult<Option<U256>> {
        let price = self.provider.gas_price().await?;
        Ok(Some(with_buffer(price, self.buffer_percent)))
    }
}

/// Etherscan gas tracker, "fast" level
pub struct EtherscanGasOracle {
    url: String,
    api_key: String,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct OracleResponse {
    status: String,
    message: String,
    result: serde_json::Value,
}

impl EtherscanGasOracle {
    pub fn new(url: &str, api_key: &str, http: reqwest::Client) -> Self {
        Self {
            url: url.to_string(),
            api_key: api_key.to_string(),
            http,
        }
    }
}

#[async_trait]
impl GasOracle for EtherscanGasOracle {
    fn name(&self) -> &'static str {
        "etherscan"
    }

    async fn gas_price(&self) -> PlungerResult<Option<U256>> {
        let body = self
            .http
            .get(&self.url)
            .query(&[
                ("module", "gastracker"),
                ("action", "gasoracle"),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        parse_fast_gas_price(&body).map(Some)
    }
}

/// Extract `FastGasPrice` (gwei, possibly fractional) as wei
pub(crate) fn parse_fast_gas_price(body: &str) -> PlungerResult<U256> {
    let response: OracleResponse = serde_json::from_str(body)?;
    if response.status != "1" {
        return Err(PlungerError::GasPrice(format!(
            "Etherscan gas oracle: {} ({})",
            response.message, response.result
        )));
    }

    let gwei: f64 = response
        .result
        .get("FastGasPrice")
        .and_then(|v| v.as_str())
        .and_then(|v| v.parse().ok())
        .filter(|v: &f64| v.is_finite() && *v > 0.0)
        .ok_or_else(|| {
            PlungerError::GasPrice(format!("Etherscan gas oracle: no FastGasPrice in {}", body))
        })?;

    Ok(U256::from((gwei * WEI_PER_GWEI).round() as u128))
}

fn with_buffer(price: U256, buffer_percent: u64) -> U256 {
    price + price * buffer_percent / 100
}

/// Ordered gas price strategies
pub struct GasPricer {
    oracles: Vec<Box<dyn GasOracle>>,
}

impl GasPricer {
    pub fn new(oracles: Vec<Box<dyn GasOracle>>) -> Self {
        Self { oracles }
    }

    /// Fixed price if configured, then the Etherscan oracle if keyed, then the node
    pub fn from_config(
        config: &GasConfig,
        provider: Arc<ChainProvider>,
        http: reqwest::Client,
    ) -> Self {
        let mut oracles: Vec<Box<dyn GasOracle>> = Vec::new();
        if let Some(price) = config.price_wei {
            oracles.push(Box::new(FixedGasPrice(U256::from(price))));
        }
        if let Some(key) = &config.etherscan_api_key {
            oracles.push(Box::new(EtherscanGasOracle::new(&config.oracle_url, key, http)));
        }
        oracles.push(Box::new(NodeGasPrice::new(provider, config.node_buffer_percent)));
        Self::new(oracles)
    }

    /// Resolve the price for one submission.
    ///
    /// A failing strategy falls through to the next one; only the last
    /// strategy's failure is returned.
    pub async fn resolve(&self) -> PlungerResult<U256> {
        let last = self.oracles.len().saturating_sub(1);

        for (idx, oracle) in self.oracles.iter().enumerate() {
            match oracle.gas_price().await {
                Ok(Some(price)) => {
                    debug!(oracle = oracle.name(), %price, "Resolved gas price");
                    return Ok(price);
                }
                Ok(None) => continue,
                Err(e) if idx < last => {
                    warn!("Gas price oracle {} failed, falling back: {}", oracle.name(), e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(PlungerError::GasPrice("No gas price available".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    fn oracle(result: fn() -> PlungerResult<Option<U256>>) -> Box<dyn GasOracle> {
        let mut mock = MockGasOracle::new();
        mock.expect_name().return_const("mock");
        mock.expect_gas_price().returning(result);
        Box::new(mock)
    }

    fn unused_oracle() -> Box<dyn GasOracle> {
        let mut mock = MockGasOracle::new();
        mock.expect_name().return_const("unused");
        mock.expect_gas_price().never();
        Box::new(mock)
    }

    #[tokio::test]
    async fn test_fixed_price_wins() {
        let pricer = GasPricer::new(vec![
            Box::new(FixedGasPrice(U256::from(150_000_000u64))),
            unused_oracle(),
        ]);
        assert_eq!(assert_ok!(pricer.resolve().await), U256::from(150_000_000u64));
    }

    #[tokio::test]
    async fn test_failing_oracle_falls_back_to_next() {
        let pricer = GasPricer::new(vec![
            oracle(|| Err(PlungerError::GasPrice("rate limited".into()))),
            oracle(|| Ok(Some(U256::from(42u64)))),
        ]);
        assert_eq!(assert_ok!(pricer.resolve().await), U256::from(42u64));
    }

    #[tokio::test]
    async fn test_empty_quote_falls_back_to_next() {
        let pricer = GasPricer::new(vec![oracle(|| Ok(None)), oracle(|| Ok(Some(U256::from(7u64))))]);
        assert_eq!(assert_ok!(pricer.resolve().await), U256::from(7u64));
    }

    #[tokio::test]
    async fn test_last_strategy_failure_is_returned() {
        let pricer = GasPricer::new(vec![
            oracle(|| Ok(None)),
            oracle(|| Err(PlungerError::GasPrice("eth_gasPrice: connection refused".into()))),
        ]);
        let err = assert_err!(pricer.resolve().await);
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_parses_fast_gas_price() {
        let body = r#"{"status":"1","message":"OK","result":{"LastBlock":"18000000","SafeGasPrice":"20","ProposeGasPrice":"21","FastGasPrice":"23.5"}}"#;
        assert_eq!(
            parse_fast_gas_price(body).unwrap(),
            U256::from(23_500_000_000u64)
        );
    }

    #[test]
    fn test_oracle_error_response() {
        let body = r#"{"status":"0","message":"NOTOK","result":"Invalid API Key"}"#;
        let err = parse_fast_gas_price(body).unwrap_err();
        assert!(err.to_string().contains("Invalid API Key"));
    }

    #[test]
    fn test_buffer() {
        assert_eq!(with_buffer(U256::from(100u64), 10), U256::from(110u64));
        assert_eq!(with_buffer(U256::from(100u64), 0), U256::from(100u64));
    }

    /// Oracle pointed at a local gas tracker; the server and mock must outlive it
    async fn gas_tracker(
        status: usize,
        body: &str,
    ) -> (mockito::ServerGuard, mockito::Mock, EtherscanGasOracle) {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("module".into(), "gastracker".into()),
                mockito::Matcher::UrlEncoded("action".into(), "gasoracle".into()),
                mockito::Matcher::UrlEncoded("apikey".into(), "KEY".into()),
            ]))
            .with_status(status)
            .with_body(body)
            .create_async()
            .await;

        let oracle =
            EtherscanGasOracle::new(&format!("{}/api", server.url()), "KEY", reqwest::Client::new());
        (server, mock, oracle)
    }

    #[tokio::test]
    async fn test_etherscan_oracle_quotes_fast_price() {
        let (_server, _tracker, oracle) = gas_tracker(
            200,
            r#"{"status":"1","message":"OK","result":{"SafeGasPrice":"20","ProposeGasPrice":"22","FastGasPrice":"25.5"}}"#,
        )
        .await;

        let price = assert_ok!(oracle.gas_price().await);
        assert_eq!(price, Some(U256::from(25_500_000_000u64)));
    }

    #[tokio::test]
    async fn test_etherscan_oracle_http_failure_falls_back() {
        let (_server, _tracker, oracle) = gas_tracker(500, "Internal Server Error").await;
        assert!(matches!(oracle.gas_price().await, Err(PlungerError::Http(_))));

        let pricer = GasPricer::new(vec![
            Box::new(oracle),
            Box::new(FixedGasPrice(U256::from(7u64))),
        ]);
        assert_eq!(assert_ok!(pricer.resolve().await), U256::from(7u64));
    }
}

//! Zero-value replacement transaction sender

use super::nonce::NonceAccount;
use crate::chain::ChainProvider;
use crate::error::{PlungerError, PlungerResult};

use async_trait::async_trait;
use ethers::prelude::*;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip2718::TypedTransaction;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info};

/// Gas of a plain value transfer
const TRANSFER_GAS: u64 = 21_000;

const SEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Sends replacement transactions for one account, signing locally when a
/// key is configured and through the node otherwise
pub struct TransactionSender {
    /// Chain provider
    provider: Arc<ChainProvider>,
    /// Account whose transactions get replaced
    account: Address,
    /// Wallet for signing, `None` when the node holds the key
    wallet: Option<LocalWallet>,
}

impl TransactionSender {
    /// Create a new transaction sender around an already checked signer
    pub fn new(provider: Arc<ChainProvider>, account: Address, wallet: Option<LocalWallet>) -> Self {
        let wallet = wallet.map(|w| w.with_chain_id(provider.chain_id()));
        if wallet.is_none() {
            debug!("Replacement transactions will be signed by the node");
        }

        Self {
            provider,
            account,
            wallet,
        }
    }

    /// Read the signing key named by `private_key_env`, if any.
    ///
    /// Runs before connecting, so a missing or foreign key never costs a
    /// round trip to the node.
    pub fn load_signer(
        private_key_env: Option<&str>,
        account: Address,
    ) -> PlungerResult<Option<LocalWallet>> {
        let Some(var) = private_key_env else {
            return Ok(None);
        };

        let wallet = Self::load_wallet(var)?;
        if wallet.address() != account {
            return Err(PlungerError::Wallet(format!(
                "Key in {} belongs to {:?}, not to {:?}",
                var,
                wallet.address(),
                account
            )));
        }

        info!("Signing replacement transactions locally for {:?}", account);
        Ok(Some(wallet))
    }

    /// Load wallet from environment
    fn load_wallet(var: &str) -> PlungerResult<LocalWallet> {
        let key = std::env::var(var)
            .map_err(|_| PlungerError::Wallet(format!("Environment variable {} is not set", var)))?;

        key.trim()
            .trim_start_matches("0x")
            .parse::<LocalWallet>()
            .map_err(|e| PlungerError::Wallet(format!("Invalid private key in {}: {}", var, e)))
    }

    /// Zero-value transfer to self
    pub fn build_zero_value_tx(&self, nonce: u64, gas_price: U256) -> TypedTransaction {
        TransactionRequest::new()
            .from(self.account)
            .to(self.account)
            .value(U256::zero())
            .nonce(nonce)
            .gas(TRANSFER_GAS)
            .gas_price(gas_price)
            .chain_id(self.provider.chain_id())
            .into()
    }

    async fn send(&self, tx: TypedTransaction) -> Result<H256, String> {
        let http = self.provider.http();

        let pending = match &self.wallet {
            Some(wallet) => {
                let signature = wallet
                    .sign_transaction(&tx)
                    .await
                    .map_err(|e| format!("Failed to sign transaction: {}", e))?;
                timeout(SEND_TIMEOUT, http.send_raw_transaction(tx.rlp_signed(&signature))).await
            }
            None => timeout(SEND_TIMEOUT, http.send_transaction(tx, None)).await,
        };

        match pending {
            Ok(Ok(pending_tx)) => Ok(pending_tx.tx_hash()),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!("No response within {}s", SEND_TIMEOUT.as_secs())),
        }
    }
}

#[async_trait]
impl NonceAccount for TransactionSender {
    fn address(&self) -> Address {
        self.account
    }

    async fn transaction_count(&self) -> PlungerResult<u64> {
        self.provider.transaction_count(self.account).await
    }

    async fn submit_zero_value(&self, nonce: u64, gas_price: U256) -> PlungerResult<H256> {
        let tx = self.build_zero_value_tx(nonce, gas_price);

        self.send(tx)
            .await
            .map_err(|message| PlungerError::Submission { nonce, message })
    }
}

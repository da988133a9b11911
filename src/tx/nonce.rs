//! Nonce accounting for the inspected account
//!
//! The tool only needs two things from the chain: how many transactions the
//! account has mined, and a way to put a zero-value transaction at a given
//! nonce. Nonces are zero-based, so an account with `n` mined transactions
//! has last confirmed nonce `n - 1`, or none at all when `n == 0`.

use crate::error::PlungerResult;

use async_trait::async_trait;
use ethers::types::{Address, H256, U256};

/// Last nonce consumed on chain for a given transaction count
pub fn last_confirmed_nonce(transaction_count: u64) -> Option<u64> {
    transaction_count.checked_sub(1)
}

/// Nonce the next transaction of the account has to use
pub fn next_expected_nonce(last_confirmed: Option<u64>) -> u64 {
    last_confirmed.map_or(0, |nonce| nonce + 1)
}

/// Chain-side view of the account
#[async_trait]
pub trait NonceAccount: Send + Sync {
    fn address(&self) -> Address;

    /// Transactions mined so far, never decreasing barring a reorg
    async fn transaction_count(&self) -> PlungerResult<u64>;

    async fn last_confirmed_nonce(&self) -> PlungerResult<Option<u64>> {
        Ok(last_confirmed_nonce(self.transaction_count().await?))
    }

    /// Send a zero-value transfer to self at `nonce`.
    ///
    /// Fails with `PlungerError::Submission`; a failed submission has no
    /// on-chain effect and may be repeated.
    async fn submit_zero_value(&self, nonce: u64, gas_price: U256) -> PlungerResult<H256>;
}


#[cfg(test)]
mod tests {
    use super::testing::FakeAccount;
    use super::*;

    #[test]
    fn test_nonce_arithmetic() {
        assert_eq!(last_confirmed_nonce(0), None);
        assert_eq!(last_confirmed_nonce(9), Some(8));
        assert_eq!(next_expected_nonce(None), 0);
        assert_eq!(next_expected_nonce(Some(8)), 9);
    }

    #[tokio::test]
    async fn test_last_confirmed_nonce_from_count() {
        assert_eq!(FakeAccount::new(0).last_confirmed_nonce().await.unwrap(), None);
        assert_eq!(FakeAccount::new(11).last_confirmed_nonce().await.unwrap(), Some(10));
    }
}

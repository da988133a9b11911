//! Waiting for the account's confirmed nonce to catch up

use super::pending::CanonicalPendingSet;
use crate::error::{PlungerError, PlungerResult};
use crate::tx::NonceAccount;

use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Polls the confirmed transaction count at a fixed interval
pub struct ConfirmationWatcher {
    poll_interval: Duration,
    /// Unbounded when `None`
    timeout: Option<Duration>,
}

impl ConfirmationWatcher {
    pub fn new(poll_interval: Duration, timeout: Option<Duration>) -> Self {
        Self {
            poll_interval,
            timeout,
        }
    }

    /// Block until every nonce in `pending` has been consumed on chain.
    ///
    /// Any transaction at the highest pending nonce satisfies the wait, the
    /// original or a replacement alike.
    pub async fn wait_until_cleared(
        &self,
        pending: &CanonicalPendingSet,
        account: &dyn NonceAccount,
    ) -> PlungerResult<()> {
        match pending.max_nonce() {
            Some(target) => self.wait_for_nonce(target, account).await,
            None => Ok(()),
        }
    }

    /// Block until the last confirmed nonce reaches `target`
    pub async fn wait_for_nonce(
        &self,
        target: u64,
        account: &dyn NonceAccount,
    ) -> PlungerResult<()> {
        let started = Instant::now();

        loop {
            match account.last_confirmed_nonce().await {
                Ok(Some(confirmed)) if confirmed >= target => {
                    info!(confirmed, target, "Pending nonces cleared");
                    return Ok(());
                }
                Ok(confirmed) => {
                    debug!(confirmed = ?confirmed, target, "Still waiting for confirmations");
                }
                Err(e) => {
                    // Transient node trouble should not end an otherwise unbounded wait
                    warn!("Failed to read transaction count: {}", e);
                }
            }

            if let Some(timeout) = self.timeout {
                if started.elapsed() >= timeout {
                    return Err(PlungerError::Timeout {
                        operation: format!("nonce {} to be mined", target),
                    });
                }
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

//! Replacing stuck transactions with zero-value transfers
//!
//! One replacement per distinct pending nonce, sent strictly in ascending
//! order. When a reported nonce lies above the account's next expected nonce
//! (an earlier transaction vanished from the source's view), the replacement
//! goes to the expected nonce instead, since nothing above a gap can be mined.

use super::pending::CanonicalPendingSet;
use crate::error::{PlungerError, PlungerResult};
use crate::tx::{next_expected_nonce, GasPricer, NonceAccount};

use ethers::types::{H256, U256};
use serde::{Serialize, Serializer};
use tracing::{info, warn};

/// Nonces to act on, one per distinct pending nonce, ascending
pub fn plan_nonces(pending: &CanonicalPendingSet) -> Vec<u64> {
    pending.unique_nonces()
}

/// Result of one replacement attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum OverrideOutcome {
    Sent {
        #[serde(serialize_with = "hex_hash")]
        tx_hash: H256,
    },
    Failed {
        error: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverrideAttempt {
    /// Nonce taken from the pending set
    pub planned_nonce: u64,
    /// Nonce actually submitted, differs from the planned one across a gap
    pub nonce: u64,
    #[serde(serialize_with = "decimal_price")]
    pub gas_price: Option<U256>,
    pub outcome: OverrideOutcome,
}

impl OverrideAttempt {
    pub fn is_sent(&self) -> bool {
        matches!(self.outcome, OverrideOutcome::Sent { .. })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OverrideReport {
    pub attempts: Vec<OverrideAttempt>,
}

impl OverrideReport {
    pub fn sent(&self) -> usize {
        self.attempts.iter().filter(|a| a.is_sent()).count()
    }

    pub fn failed(&self) -> usize {
        self.attempts.len() - self.sent()
    }

    /// Highest nonce a replacement went out for
    pub fn highest_sent_nonce(&self) -> Option<u64> {
        self.attempts
            .iter()
            .filter(|a| a.is_sent())
            .map(|a| a.nonce)
            .max()
    }
}

/// Sequential best-effort sweep over the planned nonces
pub struct OverrideExecutor<'a> {
    account: &'a dyn NonceAccount,
    pricer: &'a GasPricer,
}

impl<'a> OverrideExecutor<'a> {
    pub fn new(account: &'a dyn NonceAccount, pricer: &'a GasPricer) -> Self {
        Self { account, pricer }
    }

    /// Submit one replacement per planned nonce.
    ///
    /// Every attempt is handed to `on_attempt` as soon as it completes. A
    /// successful send drops the head of `pending`; a failed one leaves the
    /// set and the expected nonce untouched and the sweep moves on. Nothing
    /// is retried within a run. Errors other than a rejected submission
    /// end the sweep.
    pub async fn run<F>(
        &self,
        pending: &mut CanonicalPendingSet,
        last_confirmed: Option<u64>,
        mut on_attempt: F,
    ) -> PlungerResult<OverrideReport>
    where
        F: FnMut(&OverrideAttempt) -> PlungerResult<()>,
    {
        let mut report = OverrideReport::default();
        let mut expected = next_expected_nonce(last_confirmed);

        for planned_nonce in plan_nonces(pending) {
            let nonce = planned_nonce.min(expected);
            if nonce != planned_nonce {
                info!(planned_nonce, nonce, "Nonce gap, replacing at the expected nonce");
            }

            let attempt = match self.pricer.resolve().await {
                Ok(gas_price) => match self.account.submit_zero_value(nonce, gas_price).await {
                    Ok(tx_hash) => {
                        expected += 1;
                        pending.pop_front();
                        info!(nonce, %gas_price, ?tx_hash, "Sent replacement transaction");
                        OverrideAttempt {
                            planned_nonce,
                            nonce,
                            gas_price: Some(gas_price),
                            outcome: OverrideOutcome::Sent { tx_hash },
                        }
                    }
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => {
                        warn!(nonce, %gas_price, "Replacement transaction failed: {}", e);
                        OverrideAttempt {
                            planned_nonce,
                            nonce,
                            gas_price: Some(gas_price),
                            outcome: OverrideOutcome::Failed {
                                error: submission_message(e),
                            },
                        }
                    }
                },
                Err(e) => {
                    warn!(nonce, "No gas price for replacement transaction: {}", e);
                    OverrideAttempt {
                        planned_nonce,
                        nonce,
                        gas_price: None,
                        outcome: OverrideOutcome::Failed {
                            error: e.to_string(),
                        },
                    }
                }
            };

            on_attempt(&attempt)?;
            report.attempts.push(attempt);
        }

        info!(
            sent = report.sent(),
            failed = report.failed(),
            "Override sweep finished"
        );
        Ok(report)
    }
}

/// The node's own wording, without our prefix
fn submission_message(err: PlungerError) -> String {
    match err {
        PlungerError::Submission { message, .. } => message,
        other => other.to_string(),
    }
}

fn hex_hash<S: Serializer>(hash: &H256, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("{:?}", hash))
}

fn decimal_price<S: Serializer>(price: &Option<U256>, serializer: S) -> Result<S::Ok, S::Error> {
    match price {
        Some(price) => serializer.serialize_str(&price.to_string()),
        None => serializer.serialize_none(),
    }
}

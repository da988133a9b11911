//! Run driver: snapshot, report, override and wait, in that order

use super::overrides::OverrideExecutor;
use super::pending::aggregate;
use super::watcher::ConfirmationWatcher;
use crate::chain::{Chain, ChainProvider};
use crate::cli::Action;
use crate::config::Settings;
use crate::error::{PlungerError, PlungerResult};
use crate::report::Reporter;
use crate::sources::{build_sources, PendingSource, SourceKind};
use crate::tx::{GasPricer, NonceAccount, TransactionSender};

use ethers::types::Address;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// One account on one chain, with everything a run needs to act on it
pub struct Plunger {
    chain: Chain,
    account: Address,
    /// Pending transaction backends, queried in order
    sources: Vec<Box<dyn PendingSource>>,
    /// Confirmed count reads and replacement submission
    nonce_account: Box<dyn NonceAccount>,
    pricer: GasPricer,
    watcher: ConfirmationWatcher,
}

impl Plunger {
    pub fn new(
        chain: Chain,
        sources: Vec<Box<dyn PendingSource>>,
        nonce_account: Box<dyn NonceAccount>,
        pricer: GasPricer,
        watcher: ConfirmationWatcher,
    ) -> Self {
        Self {
            chain,
            account: nonce_account.address(),
            sources,
            nonce_account,
            pricer,
            watcher,
        }
    }

    /// Connect to the node and wire up the requested sources
    pub async fn connect(
        settings: &Settings,
        kinds: &[SourceKind],
        account: Address,
    ) -> PlungerResult<Self> {
        let signer =
            TransactionSender::load_signer(settings.wallet.private_key_env.as_deref(), account)?;

        let provider = Arc::new(ChainProvider::new(&settings.endpoint_uri()).await?);
        let chain = provider.chain();

        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent(concat!("plunger/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let explorer_url = settings
            .explorer
            .url
            .clone()
            .unwrap_or_else(|| chain.etherscan_url());
        debug!(%explorer_url, "Explorer base URL");

        let sources = build_sources(kinds, provider.clone(), &explorer_url, http.clone());
        let pricer = GasPricer::from_config(&settings.gas, provider.clone(), http);
        let sender = TransactionSender::new(provider, account, signer);
        let watcher = ConfirmationWatcher::new(settings.poll_interval(), settings.wait_timeout());

        info!(%chain, ?account, sources = kinds.len(), "Connected");

        Ok(Self::new(chain, sources, Box::new(sender), pricer, watcher))
    }

    pub fn chain(&self) -> Chain {
        self.chain
    }

    pub fn account(&self) -> Address {
        self.account
    }

    /// Execute one run and write its report.
    ///
    /// Failed replacements are part of the report; source, node and wait
    /// failures end the run with an error.
    pub async fn run<W: Write>(&self, action: Action, reporter: &mut Reporter<W>) -> PlungerResult<()> {
        let last_confirmed = self.nonce_account.last_confirmed_nonce().await?;
        debug!(last_confirmed = ?last_confirmed, "Read confirmed nonce");

        let mut pending = aggregate(&self.sources, self.account, last_confirmed).await?;
        reporter.pending(&pending)?;

        if pending.is_empty() {
            return Ok(());
        }

        match action {
            Action::List => {}
            Action::Wait => {
                reporter.waiting()?;
                self.watcher
                    .wait_until_cleared(&pending, self.nonce_account.as_ref())
                    .await?;
                reporter.cleared()?;
            }
            Action::Override => {
                let report = OverrideExecutor::new(self.nonce_account.as_ref(), &self.pricer)
                    .run(&mut pending, last_confirmed, |attempt| {
                        reporter.attempt(attempt).map_err(PlungerError::from)
                    })
                    .await?;

                // Replacements may sit below the planned nonces after a gap
                let target = pending.max_nonce().max(report.highest_sent_nonce());
                if let Some(target) = target {
                    reporter.waiting()?;
                    self.watcher
                        .wait_for_nonce(target, self.nonce_account.as_ref())
                        .await?;
                    reporter.cleared()?;
                }
            }
        }

        Ok(())
    }
}

//! Rendering run results on stdout, as text or as one JSON document

use crate::chain::Chain;
use crate::reconcile::{CanonicalPendingSet, OverrideAttempt, OverrideOutcome, PendingEntry};

use ethers::types::Address;
use ethers::utils::to_checksum;
use serde::Serialize;
use std::io::{self, Write};

const TX_HEADER: &str = "TxHash";
const NONCE_HEADER: &str = "Nonce";
const COLUMN_GAP: &str = "   ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Json,
}

#[derive(Debug, Default, Serialize)]
struct JsonReport {
    chain: String,
    account: String,
    pending: Vec<PendingEntry>,
    overrides: Vec<OverrideAttempt>,
    cleared: Option<bool>,
}

/// Writes the report as the run progresses.
///
/// Text goes out line by line; JSON is collected and written by `finish`.
pub struct Reporter<W: Write> {
    format: ReportFormat,
    out: W,
    chain: Chain,
    account: String,
    json: JsonReport,
}

impl<W: Write> Reporter<W> {
    pub fn new(format: ReportFormat, chain: Chain, account: Address, out: W) -> Self {
        let account = to_checksum(&account, None);
        Self {
            format,
            out,
            chain,
            json: JsonReport {
                chain: chain.to_string(),
                account: account.clone(),
                ..Default::default()
            },
            account,
        }
    }

    pub fn pending(&mut self, pending: &CanonicalPendingSet) -> io::Result<()> {
        match self.format {
            ReportFormat::Json => {
                self.json.pending = pending.iter().cloned().collect();
                Ok(())
            }
            ReportFormat::Text => {
                let summary = match pending.len() {
                    0 => format!(
                        "There are no pending transactions on {} from {}",
                        self.chain, self.account
                    ),
                    1 => format!(
                        "There is 1 pending transaction on {} from {}:",
                        self.chain, self.account
                    ),
                    n => format!(
                        "There are {} pending transactions on {} from {}:",
                        n, self.chain, self.account
                    ),
                };
                writeln!(self.out, "{}", summary)?;

                if !pending.is_empty() {
                    writeln!(self.out)?;
                    write!(self.out, "{}", pending_table(pending))?;
                    writeln!(self.out)?;
                }
                self.out.flush()
            }
        }
    }

    /// One replacement attempt, written out as soon as it is known
    pub fn attempt(&mut self, attempt: &OverrideAttempt) -> io::Result<()> {
        match self.format {
            ReportFormat::Json => {
                self.json.overrides.push(attempt.clone());
                Ok(())
            }
            ReportFormat::Text => {
                let gas_price = attempt
                    .gas_price
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| "unknown".to_string());

                match &attempt.outcome {
                    OverrideOutcome::Sent { tx_hash } => writeln!(
                        self.out,
                        "Sent replacement transaction with nonce={}, gas_price={}, tx_hash={:?}.",
                        attempt.nonce, gas_price, tx_hash
                    )?,
                    OverrideOutcome::Failed { error } => {
                        writeln!(
                            self.out,
                            "Failed to send replacement transaction with nonce={}, gas_price={}.",
                            attempt.nonce, gas_price
                        )?;
                        writeln!(self.out, "   Error: {}", error)?;
                    }
                }
                self.out.flush()
            }
        }
    }

    pub fn waiting(&mut self) -> io::Result<()> {
        if self.format == ReportFormat::Text {
            writeln!(self.out, "Waiting for the transactions to get mined...")?;
            self.out.flush()?;
        }
        Ok(())
    }

    pub fn cleared(&mut self) -> io::Result<()> {
        match self.format {
            ReportFormat::Json => self.json.cleared = Some(true),
            ReportFormat::Text => {
                writeln!(self.out, "All pending transactions have been mined.")?;
            }
        }
        Ok(())
    }

    /// Flush what is left and hand the writer back
    pub fn finish(mut self) -> io::Result<W> {
        if self.format == ReportFormat::Json {
            serde_json::to_writer_pretty(&mut self.out, &self.json)?;
            writeln!(self.out)?;
        }
        self.out.flush()?;
        Ok(self.out)
    }
}

/// Two column table: hash centred over its column, nonces right aligned
fn pending_table(pending: &CanonicalPendingSet) -> String {
    let hash_width = pending
        .iter()
        .map(|e| e.tx_id.len())
        .chain([TX_HEADER.len()])
        .max()
        .unwrap_or(TX_HEADER.len());
    let nonce_width = pending
        .iter()
        .map(|e| e.nonce.to_string().len())
        .chain([NONCE_HEADER.len()])
        .max()
        .unwrap_or(NONCE_HEADER.len());

    let mut table = format!(
        "{:^hw$}{}{:>nw$}\n{}\n",
        TX_HEADER,
        COLUMN_GAP,
        NONCE_HEADER,
        "=".repeat(hash_width + COLUMN_GAP.len() + nonce_width),
        hw = hash_width,
        nw = nonce_width
    );
    for entry in pending.iter() {
        table.push_str(&format!(
            "{:<hw$}{}{:>nw$}\n",
            entry.tx_id,
            COLUMN_GAP,
            entry.nonce,
            hw = hash_width,
            nw = nonce_width
        ));
    }
    table
}

//! Command line interface

use crate::error::{PlungerError, PlungerResult};
use crate::sources::SourceKind;

use clap::{ArgGroup, Parser};
use ethers::types::Address;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Parser, Debug)]
#[command(name = "plunger", version)]
#[command(about = "Lists, waits for or overrides pending transactions of an Ethereum account")]
#[command(group(
    ArgGroup::new("action")
        .required(true)
        .args(["list", "wait", "override_with_zero_txs"])
))]
pub struct Cli {
    /// Ethereum address to check for pending transactions
    pub address: String,

    /// JSON-RPC host (default: `localhost')
    #[arg(long)]
    pub rpc_host: Option<String>,

    /// JSON-RPC port (default: `8545')
    #[arg(long)]
    pub rpc_port: Option<u16>,

    /// Gas price (in Wei) for overriding transactions
    #[arg(long)]
    pub gas_price: Option<u64>,

    /// Comma-separated list of sources to use for pending transaction discovery
    /// (available: etherscan, parity_txqueue, jsonrpc_getblock)
    #[arg(long, required = true, value_delimiter = ',')]
    pub source: Vec<String>,

    /// List pending transactions
    #[arg(long)]
    pub list: bool,

    /// Wait for the pending transactions to clear
    #[arg(long)]
    pub wait: bool,

    /// Override the pending transactions with zero-value txs
    #[arg(long = "override-with-zero-txs")]
    pub override_with_zero_txs: bool,

    /// Etherscan API key, enables the Etherscan gas price oracle
    #[arg(long, env = "ETHERSCAN_API_KEY")]
    pub etherscan_api_key: Option<String>,

    /// Environment variable holding the private key used to sign overrides
    #[arg(long)]
    pub private_key_env: Option<String>,

    /// Seconds between confirmation checks while waiting
    #[arg(long)]
    pub poll_interval_secs: Option<u64>,

    /// Give up waiting after this many seconds (default: wait forever)
    #[arg(long)]
    pub wait_timeout_secs: Option<u64>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// TOML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Debug logging for plunger
    #[arg(long, short)]
    pub verbose: bool,

    /// Log as JSON lines
    #[arg(long)]
    pub log_json: bool,
}

/// What a run does with the pending transactions it finds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    List,
    Wait,
    Override,
}

impl Cli {
    pub fn action(&self) -> Action {
        if self.override_with_zero_txs {
            Action::Override
        } else if self.wait {
            Action::Wait
        } else {
            Action::List
        }
    }

    /// Requested sources, rejecting every unknown name at once
    pub fn sources(&self) -> PlungerResult<Vec<SourceKind>> {
        let mut unknown = Vec::new();
        let mut kinds = Vec::new();

        for name in self.source.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
            match SourceKind::from_str(name) {
                Ok(kind) if !kinds.contains(&kind) => kinds.push(kind),
                Ok(_) => {}
                Err(_) if !unknown.iter().any(|u| u == name) => unknown.push(name.to_string()),
                Err(_) => {}
            }
        }

        if !unknown.is_empty() {
            return Err(PlungerError::UnknownSource(unknown));
        }
        if kinds.is_empty() {
            return Err(PlungerError::Config("At least one source is required".to_string()));
        }
        Ok(kinds)
    }

    pub fn account(&self) -> PlungerResult<Address> {
        Address::from_str(self.address.trim()).map_err(|e| {
            PlungerError::Config(format!("Invalid address {}: {}", self.address, e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    const ACCOUNT: &str = "0x0000011111222223333322222111110000099999";

    fn parse(args: &str) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("plunger").chain(args.split_whitespace()))
    }

    #[test]
    fn test_requires_source() {
        let err = parse(&format!("--list {}", ACCOUNT)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_requires_exactly_one_action() {
        let err = parse(&format!("--source etherscan {}", ACCOUNT)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);

        let err = parse(&format!("--source etherscan --list --wait {}", ACCOUNT)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_parses_override_action_and_sources() {
        let cli = parse(&format!(
            "--source etherscan,parity_txqueue --override-with-zero-txs {} --gas-price 150000000",
            ACCOUNT
        ))
        .unwrap();

        assert_eq!(cli.action(), Action::Override);
        assert_eq!(
            cli.sources().unwrap(),
            vec![SourceKind::Etherscan, SourceKind::ParityTxQueue]
        );
        assert_eq!(cli.gas_price, Some(150_000_000));
        assert_eq!(cli.account().unwrap(), ACCOUNT.parse::<Address>().unwrap());
    }

    #[test]
    fn test_rejects_unknown_sources() {
        let cli = parse(&format!(
            "--source etherscan,invalid_one,parity_txqueue --wait {}",
            ACCOUNT
        ))
        .unwrap();

        let err = cli.sources().unwrap_err();
        assert_eq!(err.to_string(), "Unknown source(s): 'invalid_one'.");
    }

    #[test]
    fn test_repeated_source_is_used_once() {
        let cli = parse(&format!("--source jsonrpc_getblock,jsonrpc_getblock --list {}", ACCOUNT))
            .unwrap();
        assert_eq!(cli.sources().unwrap(), vec![SourceKind::JsonRpcGetBlock]);
    }

    #[test]
    fn test_rejects_malformed_address() {
        let cli = parse("--source etherscan --list not-an-address").unwrap();
        assert!(matches!(cli.account(), Err(PlungerError::Config(_))));
    }
}

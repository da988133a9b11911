//! Chain module - node access and chain identification

pub mod provider;

pub use provider::ChainProvider;

use serde::Serialize;
use std::fmt;

/// Networks the tool knows by name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Mainnet,
    Ropsten,
    Rinkeby,
    Goerli,
    Kovan,
    Sepolia,
    Unknown,
}

impl Chain {
    pub fn from_id(chain_id: u64) -> Self {
        match chain_id {
            1 => Chain::Mainnet,
            3 => Chain::Ropsten,
            4 => Chain::Rinkeby,
            5 => Chain::Goerli,
            42 => Chain::Kovan,
            11155111 => Chain::Sepolia,
            _ => Chain::Unknown,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Chain::Mainnet => "mainnet",
            Chain::Ropsten => "ropsten",
            Chain::Rinkeby => "rinkeby",
            Chain::Goerli => "goerli",
            Chain::Kovan => "kovan",
            Chain::Sepolia => "sepolia",
            Chain::Unknown => "unknown",
        }
    }

    /// Default Etherscan front end for the chain
    pub fn etherscan_url(&self) -> String {
        match self {
            Chain::Mainnet => "https://etherscan.io".to_string(),
            other => format!("https://{}.etherscan.io", other.name()),
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_labels() {
        assert_eq!(Chain::from_id(1).to_string(), "mainnet");
        assert_eq!(Chain::from_id(42).to_string(), "kovan");
        assert_eq!(Chain::from_id(1337), Chain::Unknown);
    }

    #[test]
    fn test_etherscan_hosts() {
        assert_eq!(Chain::Mainnet.etherscan_url(), "https://etherscan.io");
        assert_eq!(Chain::Kovan.etherscan_url(), "https://kovan.etherscan.io");
        assert_eq!(Chain::Unknown.etherscan_url(), "https://unknown.etherscan.io");
    }
}

//! Configuration management for plunger
//!
//! Settings come from three layers: built-in defaults, an optional TOML file
//! (with `${VAR}` environment variable substitution) and command line flags.

use crate::cli::Cli;
use crate::error::{PlungerError, PlungerResult};

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use std::env;
use std::path::Path;
use std::time::Duration;

lazy_static! {
    static ref ENV_VAR: Regex = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap();
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub rpc: RpcConfig,
    pub explorer: ExplorerConfig,
    pub gas: GasConfig,
    pub wait: WaitConfig,
    pub wallet: WalletConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    pub host: String,
    pub port: u16,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8545,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExplorerConfig {
    /// Explicit explorer base URL; derived from the chain when absent
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GasConfig {
    /// Fixed gas price in wei for replacement transactions
    pub price_wei: Option<u64>,
    pub etherscan_api_key: Option<String>,
    pub oracle_url: String,
    /// Percentage added on top of the node's suggested price
    pub node_buffer_percent: u64,
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            price_wei: None,
            etherscan_api_key: None,
            oracle_url: "https://api.etherscan.io/api".to_string(),
            node_buffer_percent: 0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WaitConfig {
    pub poll_interval_secs: u64,
    /// No deadline when absent
    pub timeout_secs: Option<u64>,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 1,
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Environment variable holding a hex private key
    pub private_key_env: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub json: bool,
    pub verbose: bool,
}

impl Settings {
    /// Load settings from an optional configuration file
    pub fn load(path: Option<&Path>) -> PlungerResult<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let config_str = std::fs::read_to_string(path).map_err(|e| {
            PlungerError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        // Substitute environment variables
        let config_str = substitute_env_vars(&config_str);

        toml::from_str(&config_str).map_err(|e| {
            PlungerError::Config(format!("Failed to parse configuration {:?}: {}", path, e))
        })
    }

    /// Load the file named on the command line and apply flag overrides
    pub fn from_cli(cli: &Cli) -> PlungerResult<Self> {
        let mut settings = Self::load(cli.config.as_deref())?;
        settings.apply_cli(cli);
        settings.validate()?;
        Ok(settings)
    }

    /// Command line flags win over file values
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(host) = &cli.rpc_host {
            self.rpc.host = host.clone();
        }
        if let Some(port) = cli.rpc_port {
            self.rpc.port = port;
        }
        // `--gas-price 0` means "no fixed price"
        match cli.gas_price {
            Some(0) => self.gas.price_wei = None,
            Some(price) => self.gas.price_wei = Some(price),
            None => {}
        }
        if let Some(key) = &cli.etherscan_api_key {
            self.gas.etherscan_api_key = Some(key.clone());
        }
        if let Some(secs) = cli.poll_interval_secs {
            self.wait.poll_interval_secs = secs;
        }
        if let Some(secs) = cli.wait_timeout_secs {
            self.wait.timeout_secs = Some(secs);
        }
        if let Some(var) = &cli.private_key_env {
            self.wallet.private_key_env = Some(var.clone());
        }
        self.logging.json |= cli.log_json;
        self.logging.verbose |= cli.verbose;
    }

    /// Validate configuration
    pub fn validate(&self) -> PlungerResult<()> {
        if self.rpc.host.trim().is_empty() {
            return Err(PlungerError::Config("RPC host must not be empty".to_string()));
        }
        if self.wait.poll_interval_secs == 0 {
            return Err(PlungerError::Config(
                "Poll interval must be at least one second".to_string(),
            ));
        }
        if let Some(url) = &self.explorer.url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(PlungerError::Config(format!(
                    "Explorer URL must start with http:// or https://: {}",
                    url
                )));
            }
        }
        Ok(())
    }

    /// JSON-RPC endpoint of the node
    pub fn endpoint_uri(&self) -> String {
        if self.rpc.host.starts_with("http") {
            format!("{}:{}", self.rpc.host, self.rpc.port)
        } else {
            format!("http://{}:{}", self.rpc.host, self.rpc.port)
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.wait.poll_interval_secs)
    }

    pub fn wait_timeout(&self) -> Option<Duration> {
        self.wait.timeout_secs.map(Duration::from_secs)
    }
}

/// Substitute environment variables in the format ${VAR_NAME}
fn substitute_env_vars(input: &str) -> String {
    ENV_VAR
        .replace_all(input, |caps: &regex::Captures| {
            env::var(&caps[1]).unwrap_or_default()
        })
        .into_owned()
}

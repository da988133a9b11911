//! Error types for plunger

use thiserror::Error;

/// Main error type for plunger
#[derive(Error, Debug)]
pub enum PlungerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown source(s): {}.", quoted(.0))]
    UnknownSource(Vec<String>),

    #[error("Source {name} failed: {message}")]
    Source { name: String, message: String },

    #[error("Submission of nonce {nonce} failed: {message}")]
    Submission { nonce: u64, message: String },

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Gas price error: {0}")]
    GasPrice(String),

    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("Timeout waiting for {operation}")]
    Timeout { operation: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PlungerError {
    /// Build a source error for the named adapter
    pub fn source_failure(name: impl Into<String>, message: impl ToString) -> Self {
        PlungerError::Source {
            name: name.into(),
            message: message.to_string(),
        }
    }

    /// Whether the error ends the whole run.
    ///
    /// Only submission failures are recorded per attempt and skipped over.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, PlungerError::Submission { .. })
    }

    /// Whether the error was raised before any network activity
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            PlungerError::Config(_) | PlungerError::UnknownSource(_) | PlungerError::Wallet(_)
        )
    }

    /// Process exit code for a fatal error
    pub fn exit_code(&self) -> i32 {
        match self {
            PlungerError::Timeout { .. } => 3,
            _ => 1,
        }
    }
}

fn quoted(names: &[String]) -> String {
    names
        .iter()
        .map(|name| format!("'{}'", name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for plunger operations
pub type PlungerResult<T> = Result<T, PlungerError>;

//! Transaction submission: nonce accounting, gas pricing and replacement sending

mod gas;
mod nonce;
mod sender;

pub use gas::GasPricer;
pub use nonce::{next_expected_nonce, NonceAccount};
pub use sender::TransactionSender;

#[cfg(test)]
pub(crate) use gas::FixedGasPrice;
#[cfg(test)]
pub(crate) use nonce::testing;

//! Reconciliation of an account's pending transactions
//!
//! Aggregation into a canonical set, zero-value overrides and the
//! confirmation wait, driven by [`Plunger`].

pub mod engine;
pub mod overrides;
pub mod pending;
pub mod watcher;

pub use engine::Plunger;
pub use overrides::{OverrideAttempt, OverrideOutcome};
pub use pending::{CanonicalPendingSet, PendingEntry};

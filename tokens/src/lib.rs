//! Token balances for a Guild organization.
//!
//! The governance engine treats the balance ledger as an external
//! collaborator: it only ever calls [`BalanceLedger::credit`] as the effect of
//! an `issueTokens` action. Supply limits are this crate's invariant, not the
//! engine's.

pub mod error;
pub mod ledger;

pub use error::BalanceError;
pub use ledger::{BalanceLedger, TokenLedger};

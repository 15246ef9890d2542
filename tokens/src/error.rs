//! Balance-ledger errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BalanceError {
    #[error("supply cap exceeded: issued {issued}, requested {requested}, cap {cap}")]
    SupplyExceeded {
        issued: u128,
        requested: u128,
        cap: u128,
    },

    #[error("balance overflow for account {0}")]
    Overflow(String),

    #[error("balance ledger unavailable: {0}")]
    Unavailable(String),
}

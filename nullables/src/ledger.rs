//! Nullable balance ledger. Records credits instead of keeping balances.

use std::sync::Mutex;

use guild_tokens::{BalanceError, BalanceLedger};
use guild_types::{Principal, TokenAmount};

/// One recorded `credit` call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credit {
    pub account: Principal,
    pub amount: TokenAmount,
}

/// A balance ledger for testing.
///
/// Every successful credit is appended to a log that tests can inspect, so
/// "credited exactly once" is a length check. `fail_next` makes the next
/// credit fail without being logged.
pub struct NullLedger {
    credits: Mutex<Vec<Credit>>,
    fail_next: Mutex<Option<String>>,
}

impl NullLedger {
    pub fn new() -> Self {
        Self {
            credits: Mutex::new(Vec::new()),
            fail_next: Mutex::new(None),
        }
    }

    /// Make the next `credit` call fail with `BalanceError::Unavailable`.
    pub fn fail_next(&self, reason: impl Into<String>) {
        *self.fail_next.lock().unwrap() = Some(reason.into());
    }

    /// All successful credits, oldest first.
    pub fn credits(&self) -> Vec<Credit> {
        self.credits.lock().unwrap().clone()
    }

    pub fn credit_count(&self) -> usize {
        self.credits.lock().unwrap().len()
    }
}

impl Default for NullLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl BalanceLedger for NullLedger {
    fn credit(&self, account: &Principal, amount: TokenAmount) -> Result<(), BalanceError> {
        if let Some(reason) = self.fail_next.lock().unwrap().take() {
            return Err(BalanceError::Unavailable(reason));
        }
        self.credits.lock().unwrap().push(Credit {
            account: account.clone(),
            amount,
        });
        Ok(())
    }

    fn balance_of(&self, account: &Principal) -> TokenAmount {
        self.credits
            .lock()
            .unwrap()
            .iter()
            .filter(|c| &c.account == account)
            .fold(TokenAmount::ZERO, |acc, c| acc + c.amount)
    }

    fn total_issued(&self) -> TokenAmount {
        self.credits
            .lock()
            .unwrap()
            .iter()
            .fold(TokenAmount::ZERO, |acc, c| acc + c.amount)
    }
}

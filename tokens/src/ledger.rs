//! The balance-ledger contract and its in-memory implementation.

use std::collections::HashMap;
use std::sync::Mutex;

use guild_types::{Principal, TokenAmount};

use crate::error::BalanceError;

/// The contract the governance engine consumes.
///
/// Implementations are shared behind an `Arc` and use interior locking, so
/// every method takes `&self`.
pub trait BalanceLedger: Send + Sync {
    /// Credit `amount` to `account`, minting new supply.
    fn credit(&self, account: &Principal, amount: TokenAmount) -> Result<(), BalanceError>;

    /// Current balance of `account` (zero if never credited).
    fn balance_of(&self, account: &Principal) -> TokenAmount;

    /// Total amount credited so far.
    fn total_issued(&self) -> TokenAmount;
}

#[derive(Debug, Default)]
struct Balances {
    accounts: HashMap<Principal, TokenAmount>,
    issued: TokenAmount,
}

/// In-memory token ledger with an optional supply cap.
///
/// A credit that would push total issuance past the cap is rejected and
/// leaves every balance unchanged.
pub struct TokenLedger {
    balances: Mutex<Balances>,
    supply_cap: Option<TokenAmount>,
}

impl TokenLedger {
    /// A ledger with no supply cap.
    pub fn new() -> Self {
        Self {
            balances: Mutex::new(Balances::default()),
            supply_cap: None,
        }
    }

    /// A ledger that refuses to issue more than `cap` in total.
    pub fn with_supply_cap(cap: TokenAmount) -> Self {
        Self {
            balances: Mutex::new(Balances::default()),
            supply_cap: Some(cap),
        }
    }

    pub fn supply_cap(&self) -> Option<TokenAmount> {
        self.supply_cap
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Balances> {
        // A panic while holding the lock cannot leave Balances half-written:
        // every mutation below is computed before it is stored.
        self.balances.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for TokenLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl BalanceLedger for TokenLedger {
    fn credit(&self, account: &Principal, amount: TokenAmount) -> Result<(), BalanceError> {
        let mut balances = self.lock();

        let issued = balances
            .issued
            .checked_add(amount)
            .ok_or_else(|| BalanceError::Overflow(account.to_string()))?;
        if let Some(cap) = self.supply_cap {
            if issued > cap {
                tracing::debug!(%account, %amount, %cap, "credit rejected by supply cap");
                return Err(BalanceError::SupplyExceeded {
                    issued: balances.issued.raw(),
                    requested: amount.raw(),
                    cap: cap.raw(),
                });
            }
        }
        let current = balances
            .accounts
            .get(account)
            .copied()
            .unwrap_or(TokenAmount::ZERO);
        let updated = current
            .checked_add(amount)
            .ok_or_else(|| BalanceError::Overflow(account.to_string()))?;

        balances.accounts.insert(account.clone(), updated);
        balances.issued = issued;
        tracing::trace!(%account, %amount, balance = %updated, "credited");
        Ok(())
    }

    fn balance_of(&self, account: &Principal) -> TokenAmount {
        self.lock()
            .accounts
            .get(account)
            .copied()
            .unwrap_or(TokenAmount::ZERO)
    }

    fn total_issued(&self) -> TokenAmount {
        self.lock().issued
    }
}

//! Value ledger contract used to move stakes into and out of custody.

use crate::error::{Result, WagerError};
use crate::identity::Identity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Balances and custody moves the exchange relies on. Implementations must
/// apply each call completely or not at all.
pub trait ValueLedger {
    fn balance_of(&self, who: &Identity) -> u64;

    /// Move `amount` from `who` into custody.
    fn debit(&mut self, who: &Identity, amount: u64) -> Result<()>;

    /// Move `amount` from custody to `who`.
    fn credit(&mut self, who: &Identity, amount: u64) -> Result<()>;

    /// Value currently held in custody.
    fn custody(&self) -> u64;
}

/// Largest total the ledger will hold. Amounts are stored as SQLite
/// integers, so nothing may exceed `i64::MAX`.
pub const MAX_SUPPLY: u64 = i64::MAX as u64;

/// In-process ledger: a balance table plus one custody account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryLedger {
    balances: BTreeMap<Identity, u64>,
    custody: u64,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_parts(balances: BTreeMap<Identity, u64>, custody: u64) -> Self {
        Self { balances, custody }
    }

    /// Mint `amount` into `who`'s account. Total supply, balances plus
    /// custody, stays within [`MAX_SUPPLY`].
    pub fn deposit(&mut self, who: &Identity, amount: u64) -> Result<u64> {
        who.require("deposit account")?;
        let overflow = || WagerError::Overflow {
            identity: who.clone(),
            amount,
        };
        let supply = self
            .supply()
            .and_then(|supply| supply.checked_add(amount))
            .ok_or_else(overflow)?;
        if supply > MAX_SUPPLY {
            return Err(overflow());
        }
        let updated = self.balance_of(who) + amount;
        self.balances.insert(who.clone(), updated);
        tracing::debug!("Deposited {} to '{}' (balance {})", amount, who, updated);
        Ok(updated)
    }

    pub fn withdraw(&mut self, who: &Identity, amount: u64) -> Result<u64> {
        let available = self.balance_of(who);
        if available < amount {
            return Err(WagerError::InsufficientFunds {
                need: amount,
                available,
            });
        }
        let updated = available - amount;
        self.balances.insert(who.clone(), updated);
        tracing::debug!("Withdrew {} from '{}' (balance {})", amount, who, updated);
        Ok(updated)
    }

    pub fn accounts(&self) -> impl Iterator<Item = (&Identity, u64)> {
        self.balances.iter().map(|(who, balance)| (who, *balance))
    }

    /// Sum of all account balances, excluding custody.
    pub fn circulating(&self) -> u64 {
        self.balances.values().sum()
    }

    fn supply(&self) -> Option<u64> {
        self.balances
            .values()
            .try_fold(self.custody, |total, balance| total.checked_add(*balance))
    }
}

impl ValueLedger for MemoryLedger {
    fn balance_of(&self, who: &Identity) -> u64 {
        self.balances.get(who).copied().unwrap_or(0)
    }

    fn debit(&mut self, who: &Identity, amount: u64) -> Result<()> {
        let available = self.balance_of(who);
        if available < amount {
            return Err(WagerError::InsufficientFunds {
                need: amount,
                available,
            });
        }
        let custody = self
            .custody
            .checked_add(amount)
            .ok_or_else(|| WagerError::internal("custody overflow"))?;
        self.balances.insert(who.clone(), available - amount);
        self.custody = custody;
        Ok(())
    }

    fn credit(&mut self, who: &Identity, amount: u64) -> Result<()> {
        if self.custody < amount {
            return Err(WagerError::internal(format!(
                "custody holds {}, cannot release {}",
                self.custody, amount
            )));
        }
        let balance = self.balance_of(who);
        let updated = balance.checked_add(amount).ok_or_else(|| WagerError::Overflow {
            identity: who.clone(),
            amount,
        })?;
        self.balances.insert(who.clone(), updated);
        self.custody -= amount;
        Ok(())
    }

    fn custody(&self) -> u64 {
        self.custody
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debit_and_credit_move_through_custody() {
        let alice = Identity::new("alice");
        let bob = Identity::new("bob");
        let mut ledger = MemoryLedger::new();
        ledger.deposit(&alice, 100).unwrap();

        ledger.debit(&alice, 60).unwrap();
        assert_eq!(ledger.balance_of(&alice), 40);
        assert_eq!(ledger.custody(), 60);

        ledger.credit(&bob, 60).unwrap();
        assert_eq!(ledger.balance_of(&bob), 60);
        assert_eq!(ledger.custody(), 0);
        assert_eq!(ledger.circulating(), 100);
    }

    #[test]
    fn test_failed_debit_changes_nothing() {
        let alice = Identity::new("alice");
        let mut ledger = MemoryLedger::new();
        ledger.deposit(&alice, 5).unwrap();

        let before = ledger.clone();
        let err = ledger.debit(&alice, 6).unwrap_err();
        assert!(matches!(
            err,
            WagerError::InsufficientFunds {
                need: 6,
                available: 5
            }
        ));
        assert_eq!(ledger, before);
    }

    #[test]
    fn test_credit_beyond_custody_is_refused() {
        let mut ledger = MemoryLedger::new();
        assert!(ledger.credit(&Identity::new("bob"), 1).is_err());
        assert_eq!(ledger.balance_of(&Identity::new("bob")), 0);
    }

    #[test]
    fn test_overflowing_credit_is_refused() {
        let alice = Identity::new("alice");
        let bob = Identity::new("bob");
        let mut ledger = MemoryLedger::from_parts(
            BTreeMap::from([(alice.clone(), 10), (bob.clone(), u64::MAX - 5)]),
            0,
        );
        ledger.debit(&alice, 10).unwrap();

        let err = ledger.credit(&bob, 10).unwrap_err();
        assert_eq!(err.kind(), "Overflow");
        assert_eq!(ledger.custody(), 10);
    }

    #[test]
    fn test_deposit_stays_within_storable_supply() {
        let alice = Identity::new("alice");
        let bob = Identity::new("bob");
        let mut ledger = MemoryLedger::new();
        ledger.deposit(&alice, MAX_SUPPLY - 10).unwrap();
        ledger.debit(&alice, 5).unwrap();

        // custody counts toward the limit
        let err = ledger.deposit(&bob, 11).unwrap_err();
        assert_eq!(err.kind(), "Overflow");
        assert_eq!(ledger.balance_of(&bob), 0);

        assert!(ledger.deposit(&alice, u64::MAX).is_err());
        assert_eq!(ledger.deposit(&bob, 10).unwrap(), 10);
        assert!(ledger.deposit(&bob, 1).is_err());
    }

    #[test]
    fn test_deposit_to_zero_identity_is_refused() {
        let mut ledger = MemoryLedger::new();
        assert!(ledger.deposit(&Identity::zero(), 1).is_err());
    }
}

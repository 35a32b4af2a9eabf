use std::collections::HashMap;

use chrono::{DateTime, Utc};
use forge_types::AccountId;
use tracing::debug;

use crate::error::LedgerError;
use crate::journal::{FlowJournal, FlowKind};

/// A single value ledger: minted/burned totals plus per-holder balances.
///
/// The engine runs three instances: computational units, revenue-currency,
/// and deficit-currency. Negative balances are never permitted; every
/// precondition is checked before any mutation.
#[derive(Debug, Clone)]
pub struct ValueLedger {
    asset: String,
    total_minted: u64,
    total_burned: u64,
    balances: HashMap<AccountId, u64>,
    journal: FlowJournal,
    /// Externally tracked backing reserves. `Some` makes this ledger
    /// reserve-anchored: net supply may never exceed the anchor.
    backing_reserves: Option<u64>,
}

impl ValueLedger {
    /// Create an unanchored ledger.
    pub fn new(asset: impl Into<String>) -> Self {
        Self {
            asset: asset.into(),
            total_minted: 0,
            total_burned: 0,
            balances: HashMap::new(),
            journal: FlowJournal::new(),
            backing_reserves: None,
        }
    }

    /// Create a reserve-anchored ledger with zero initial backing.
    pub fn with_reserve_anchor(asset: impl Into<String>) -> Self {
        Self {
            backing_reserves: Some(0),
            ..Self::new(asset)
        }
    }

    pub fn asset(&self) -> &str {
        &self.asset
    }

    pub fn total_minted(&self) -> u64 {
        self.total_minted
    }

    pub fn total_burned(&self) -> u64 {
        self.total_burned
    }

    /// `total_minted - total_burned`. Burn never exceeds mint, so this
    /// cannot underflow.
    pub fn net_supply(&self) -> u64 {
        self.total_minted - self.total_burned
    }

    pub fn balance(&self, account: &AccountId) -> u64 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    pub fn journal(&self) -> &FlowJournal {
        &self.journal
    }

    pub fn backing_reserves(&self) -> Option<u64> {
        self.backing_reserves
    }

    /// Replace the off-ledger trust anchor reading.
    pub fn set_backing_reserves(&mut self, reserves: u64) {
        self.backing_reserves = Some(reserves);
    }

    /// Increase the off-ledger trust anchor by a fresh deposit.
    pub fn add_backing_reserves(&mut self, deposit: u64) {
        self.backing_reserves = Some(self.backing_reserves.unwrap_or(0) + deposit);
    }

    /// Mint `amount` to `to`.
    pub fn mint(
        &mut self,
        to: &AccountId,
        amount: u64,
        now: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        if let Some(reserves) = self.backing_reserves {
            let net_supply = self.net_supply();
            if net_supply + amount > reserves {
                return Err(LedgerError::InsufficientReserves {
                    requested: amount,
                    net_supply,
                    reserves,
                });
            }
        }

        self.total_minted += amount;
        *self.balances.entry(to.clone()).or_insert(0) += amount;
        self.journal
            .append(FlowKind::Mint, None, Some(to.clone()), amount, now);

        debug!(asset = %self.asset, to = %to, amount, "minted");
        Ok(())
    }

    /// Burn `amount` from `from`.
    pub fn burn(
        &mut self,
        from: &AccountId,
        amount: u64,
        now: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        let available = self.balance(from);
        if amount > available {
            return Err(LedgerError::InsufficientBalance {
                account: from.clone(),
                requested: amount,
                available,
            });
        }

        self.total_burned += amount;
        if let Some(balance) = self.balances.get_mut(from) {
            *balance -= amount;
        }
        self.journal
            .append(FlowKind::Burn, Some(from.clone()), None, amount, now);

        debug!(asset = %self.asset, from = %from, amount, "burned");
        Ok(())
    }

    /// Move `amount` from `from` to `to` without changing supply.
    pub fn transfer(
        &mut self,
        from: &AccountId,
        to: &AccountId,
        amount: u64,
        now: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        let available = self.balance(from);
        if amount > available {
            return Err(LedgerError::InsufficientBalance {
                account: from.clone(),
                requested: amount,
                available,
            });
        }

        if let Some(balance) = self.balances.get_mut(from) {
            *balance -= amount;
        }
        *self.balances.entry(to.clone()).or_insert(0) += amount;
        self.journal.append(
            FlowKind::Transfer,
            Some(from.clone()),
            Some(to.clone()),
            amount,
            now,
        );

        debug!(asset = %self.asset, from = %from, to = %to, amount, "transferred");
        Ok(())
    }

    /// Sum of all holder balances. Always equals `net_supply()`; exposed so
    /// tests and reports can assert the conservation invariant.
    pub fn balance_sum(&self) -> u64 {
        self.balances.values().sum()
    }
}

use forge_types::AccountId;
use thiserror::Error;

/// Errors from value ledger operations.
///
/// Every variant is a precondition failure: the ledger is untouched when one
/// is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("amount must be positive")]
    ZeroAmount,

    #[error("insufficient balance: {account} holds {available}, requested {requested}")]
    InsufficientBalance {
        account: AccountId,
        requested: u64,
        available: u64,
    },

    #[error("insufficient backing reserves: net supply {net_supply} + mint {requested} exceeds reserves {reserves}")]
    InsufficientReserves {
        requested: u64,
        net_supply: u64,
        reserves: u64,
    },
}

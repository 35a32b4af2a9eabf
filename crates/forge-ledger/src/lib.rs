//! Forge Ledger - value ledgers with reserve anchoring and a flow journal
//!
//! Three instances run inside the engine: computational units,
//! revenue-currency (reserve-anchored), and deficit-currency. Each tracks
//! minted/burned totals and per-holder balances, and appends every flow to
//! an append-only journal.

#![deny(unsafe_code)]

pub mod error;
pub mod journal;
pub mod ledger;

pub use error::LedgerError;
pub use journal::{FlowJournal, FlowKind, FlowRecord};
pub use ledger::ValueLedger;

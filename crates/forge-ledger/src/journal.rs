use chrono::{DateTime, Utc};
use forge_types::AccountId;
use serde::{Deserialize, Serialize};

/// Flow record kinds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FlowKind {
    Mint,
    Burn,
    Transfer,
}

/// One economic flow through a ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowRecord {
    pub index: u64,
    pub kind: FlowKind,
    pub from: Option<AccountId>,
    pub to: Option<AccountId>,
    pub amount: u64,
    pub recorded_at: DateTime<Utc>,
}

/// Append-only flow journal.
///
/// Design choice: no in-place mutation APIs are exposed. Every ledger
/// mutation becomes an additional record, which preserves full historical
/// accountability.
#[derive(Debug, Default, Clone)]
pub struct FlowJournal {
    records: Vec<FlowRecord>,
}

impl FlowJournal {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    pub fn records(&self) -> &[FlowRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Append the next flow. Indices are dense and start at zero.
    pub(crate) fn append(
        &mut self,
        kind: FlowKind,
        from: Option<AccountId>,
        to: Option<AccountId>,
        amount: u64,
        recorded_at: DateTime<Utc>,
    ) {
        let record = FlowRecord {
            index: self.records.len() as u64,
            kind,
            from,
            to,
            amount,
            recorded_at,
        };
        self.records.push(record);
    }
}

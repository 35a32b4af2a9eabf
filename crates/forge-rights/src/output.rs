use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use forge_types::{AccountId, ContentRef, OutputId, RightId};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RightsError;

/// A finished, transferable output with full provenance.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Output {
    pub id: OutputId,
    /// Who produced it (the finalized right's holder).
    pub creator: AccountId,
    /// Current owner; starts as the creator.
    pub owner: AccountId,
    pub origin_right: RightId,
    pub content_ref: ContentRef,
    /// Computational units consumed producing it.
    pub units: u64,
    /// Actual incurred cost reported by the finalization backend.
    pub actual_cost: u64,
    pub sponsor: Option<AccountId>,
    pub created_at: DateTime<Utc>,
}

/// Registry of finished outputs.
#[derive(Debug, Default, Clone)]
pub struct OutputRegistry {
    outputs: BTreeMap<OutputId, Output>,
    next_id: u64,
}

impl OutputRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finished output. Only reachable from the engine's finalize
    /// path.
    #[allow(clippy::too_many_arguments)]
    pub fn record(
        &mut self,
        creator: AccountId,
        origin_right: RightId,
        content_ref: ContentRef,
        units: u64,
        actual_cost: u64,
        sponsor: Option<AccountId>,
        now: DateTime<Utc>,
    ) -> OutputId {
        let id = OutputId(self.next_id);
        self.next_id += 1;

        let output = Output {
            id,
            creator: creator.clone(),
            owner: creator.clone(),
            origin_right,
            content_ref,
            units,
            actual_cost,
            sponsor,
            created_at: now,
        };
        self.outputs.insert(id, output);

        debug!(output = %id, creator = %creator, actual_cost, "output recorded");
        id
    }

    pub fn get(&self, id: OutputId) -> Option<&Output> {
        self.outputs.get(&id)
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    /// Outputs are transferable; only the current owner may move one.
    pub fn transfer(
        &mut self,
        id: OutputId,
        from: &AccountId,
        to: AccountId,
    ) -> Result<(), RightsError> {
        let output = self
            .outputs
            .get_mut(&id)
            .ok_or(RightsError::UnknownOutput(id))?;
        if output.owner != *from {
            return Err(RightsError::OutputNotOwned {
                output: id,
                caller: from.clone(),
            });
        }
        output.owner = to;
        Ok(())
    }
}

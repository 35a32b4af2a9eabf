use std::collections::HashSet;

use forge_types::AccountId;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// What an orchestrator caller is authorized to do.
///
/// Checked once per call at the engine boundary, never inside the ledgers
/// or registries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    /// Create bundles (entitlement scheduler, sponsors).
    IssueBundles,
    /// Redeem owned bundles into creation rights.
    RedeemBundles,
    /// Finalize creation rights into outputs (generation backend).
    Finalize,
    /// Invoke the expiry sweep.
    Sweep,
    /// Burn treasury deficit out-of-band (reconciliation authority).
    Reconcile,
}

/// The authorization object passed into each orchestrator call.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CallerContext {
    pub account: AccountId,
    capabilities: HashSet<Capability>,
}

impl CallerContext {
    /// A caller with no capabilities.
    pub fn new(account: AccountId) -> Self {
        Self {
            account,
            capabilities: HashSet::new(),
        }
    }

    pub fn with(account: AccountId, capabilities: impl IntoIterator<Item = Capability>) -> Self {
        Self {
            account,
            capabilities: capabilities.into_iter().collect(),
        }
    }

    pub fn grant(mut self, capability: Capability) -> Self {
        self.capabilities.insert(capability);
        self
    }

    pub fn has(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    /// Fail with `Unauthorized` unless the capability is held.
    pub fn require(&self, capability: Capability) -> Result<(), EngineError> {
        if self.has(capability) {
            Ok(())
        } else {
            Err(EngineError::Unauthorized {
                caller: self.account.clone(),
                capability,
            })
        }
    }
}

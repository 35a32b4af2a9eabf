use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use forge_types::{AccountId, BundleId, BundleKind, SponsorTerms};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RightsError;

/// Bundle lifecycle states. `Active` is the only non-terminal state; a
/// bundle transitions to exactly one of the terminal states, never both and
/// never backward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BundleState {
    Active,
    Redeemed,
    Expired,
}

/// A time-boxed creation-rights bundle.
///
/// Append-only: bundles are never deleted, they become logically inert in a
/// terminal state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bundle {
    pub id: BundleId,
    pub owner: AccountId,
    pub kind: BundleKind,
    pub provider: String,
    /// Wrapped computational-unit amount held in escrow while active.
    pub units: u64,
    pub sponsor_terms: Option<SponsorTerms>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub state: BundleState,
    /// Idempotency guard for the expiry sweep.
    pub expiry_processed: bool,
}

/// Result of an expiry sweep on one bundle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SweepOutcome {
    /// The bundle was newly marked expired; its resources must be reclaimed.
    Processed,
    /// The bundle was already swept. No-op, not an error.
    AlreadyProcessed,
}

/// Registry and state machine for time-boxed bundles.
#[derive(Debug, Default, Clone)]
pub struct BundleRegistry {
    bundles: BTreeMap<BundleId, Bundle>,
    next_id: u64,
}

impl BundleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a bundle owned by `recipient`, active until `expires_at`.
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        &mut self,
        recipient: AccountId,
        kind: BundleKind,
        provider: impl Into<String>,
        units: u64,
        sponsor_terms: Option<SponsorTerms>,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<BundleId, RightsError> {
        if expires_at <= now {
            return Err(RightsError::InvalidExpiryTime);
        }

        let id = BundleId(self.next_id);
        self.next_id += 1;

        let bundle = Bundle {
            id,
            owner: recipient.clone(),
            kind,
            provider: provider.into(),
            units,
            sponsor_terms,
            created_at: now,
            expires_at,
            state: BundleState::Active,
            expiry_processed: false,
        };
        self.bundles.insert(id, bundle);

        debug!(bundle = %id, owner = %recipient, ?kind, units, "bundle created");
        Ok(id)
    }

    pub fn get(&self, id: BundleId) -> Option<&Bundle> {
        self.bundles.get(&id)
    }

    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }

    /// Redeem an active, unexpired bundle. Returns a snapshot of the bundle
    /// for the orchestrator to act on.
    pub fn redeem(
        &mut self,
        id: BundleId,
        caller: &AccountId,
        now: DateTime<Utc>,
    ) -> Result<Bundle, RightsError> {
        let bundle = self
            .bundles
            .get_mut(&id)
            .ok_or(RightsError::UnknownBundle(id))?;

        if bundle.owner != *caller {
            return Err(RightsError::Unauthorized {
                bundle: id,
                caller: caller.clone(),
            });
        }
        match bundle.state {
            BundleState::Active => {}
            BundleState::Redeemed => return Err(RightsError::AlreadyRedeemed(id)),
            BundleState::Expired => return Err(RightsError::BundleExpired(id)),
        }
        if now > bundle.expires_at {
            return Err(RightsError::BundleExpired(id));
        }

        bundle.state = BundleState::Redeemed;
        debug!(bundle = %id, caller = %caller, "bundle redeemed");
        Ok(bundle.clone())
    }

    /// Mark an expired bundle as processed. Idempotent: sweeping a bundle
    /// twice reports `AlreadyProcessed` instead of double-counting.
    pub fn sweep_expired(
        &mut self,
        id: BundleId,
        now: DateTime<Utc>,
    ) -> Result<SweepOutcome, RightsError> {
        let bundle = self
            .bundles
            .get_mut(&id)
            .ok_or(RightsError::UnknownBundle(id))?;

        match bundle.state {
            BundleState::Expired if bundle.expiry_processed => {
                return Ok(SweepOutcome::AlreadyProcessed)
            }
            BundleState::Redeemed => return Err(RightsError::BundleNotExpired(id)),
            _ => {}
        }
        if now <= bundle.expires_at {
            return Err(RightsError::BundleNotExpired(id));
        }

        bundle.state = BundleState::Expired;
        bundle.expiry_processed = true;
        debug!(bundle = %id, "bundle expired");
        Ok(SweepOutcome::Processed)
    }

    /// Transfer ownership of a still-live bundle.
    ///
    /// Blocked at this boundary once the bundle is redeemed or past expiry,
    /// not only at redeem time.
    pub fn transfer(
        &mut self,
        id: BundleId,
        from: &AccountId,
        to: AccountId,
        now: DateTime<Utc>,
    ) -> Result<(), RightsError> {
        let bundle = self
            .bundles
            .get_mut(&id)
            .ok_or(RightsError::UnknownBundle(id))?;

        if bundle.owner != *from {
            return Err(RightsError::Unauthorized {
                bundle: id,
                caller: from.clone(),
            });
        }
        match bundle.state {
            BundleState::Active => {}
            BundleState::Redeemed => return Err(RightsError::AlreadyRedeemed(id)),
            BundleState::Expired => return Err(RightsError::BundleExpired(id)),
        }
        if now > bundle.expires_at {
            return Err(RightsError::BundleExpired(id));
        }

        bundle.owner = to;
        Ok(())
    }

    /// Active bundles past expiry that have not been swept, in ascending id
    /// order. The sweep cap counts fixes, not scans, so the scan order must
    /// be deterministic.
    pub fn expired_candidates(&self, now: DateTime<Utc>) -> Vec<BundleId> {
        self.bundles
            .values()
            .filter(|b| {
                b.state == BundleState::Active && now > b.expires_at && !b.expiry_processed
            })
            .map(|b| b.id)
            .collect()
    }
}

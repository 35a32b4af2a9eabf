use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use forge_types::{AccountId, BundleId, RightId, SponsorTerms};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RightsError;

/// A soulbound creation right: the non-transferable right to produce one
/// output, obtained by redeeming a bundle before expiry.
///
/// The owner is set once at issuance and never changes. Rights carry no
/// expiry of their own; bundle expiry is what matters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CreationRight {
    pub id: RightId,
    pub origin_bundle: BundleId,
    pub provider: String,
    pub owner: AccountId,
    /// Computational units the origin bundle carried, consumed by the
    /// eventual output.
    pub units: u64,
    pub sponsor_terms: Option<SponsorTerms>,
    pub created_at: DateTime<Utc>,
    /// Always false. Checked at the single transfer entry point.
    pub transferable: bool,
}

/// Registry for soulbound creation rights.
#[derive(Debug, Default, Clone)]
pub struct RightRegistry {
    rights: BTreeMap<RightId, CreationRight>,
    next_id: u64,
}

impl RightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a right to `to`. The result is permanently non-transferable.
    pub fn issue(
        &mut self,
        to: AccountId,
        origin_bundle: BundleId,
        provider: impl Into<String>,
        units: u64,
        sponsor_terms: Option<SponsorTerms>,
        now: DateTime<Utc>,
    ) -> RightId {
        let id = RightId(self.next_id);
        self.next_id += 1;

        let right = CreationRight {
            id,
            origin_bundle,
            provider: provider.into(),
            owner: to.clone(),
            units,
            sponsor_terms,
            created_at: now,
            transferable: false,
        };
        self.rights.insert(id, right);

        debug!(right = %id, owner = %to, origin = %origin_bundle, "creation right issued");
        id
    }

    pub fn get(&self, id: RightId) -> Option<&CreationRight> {
        self.rights.get(&id)
    }

    pub fn len(&self) -> usize {
        self.rights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rights.is_empty()
    }

    /// The single ownership-transfer entry point. Rights are soulbound, so
    /// this always fails for an existing right; the sole path that moves a
    /// right out of an account is `finalize_burn`.
    pub fn transfer(
        &mut self,
        id: RightId,
        from: &AccountId,
        to: AccountId,
    ) -> Result<(), RightsError> {
        let right = self.rights.get_mut(&id).ok_or(RightsError::UnknownRight(id))?;
        if !right.transferable {
            return Err(RightsError::SoulboundViolation(id));
        }
        if right.owner != *from {
            return Err(RightsError::NotOwner {
                right: id,
                caller: from.clone(),
            });
        }
        right.owner = to;
        Ok(())
    }

    /// Permanently remove a right as part of output creation.
    ///
    /// `holder` must own the right. This is the burn exception to the
    /// soulbound rule.
    pub fn finalize_burn(
        &mut self,
        id: RightId,
        holder: &AccountId,
    ) -> Result<CreationRight, RightsError> {
        let right = self.rights.get(&id).ok_or(RightsError::UnknownRight(id))?;
        if right.owner != *holder {
            return Err(RightsError::NotOwner {
                right: id,
                caller: holder.clone(),
            });
        }

        // Checks passed; the remove cannot fail now.
        let right = self
            .rights
            .remove(&id)
            .ok_or(RightsError::UnknownRight(id))?;
        debug!(right = %id, holder = %holder, "creation right burned at finalization");
        Ok(right)
    }
}

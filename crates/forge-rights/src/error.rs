use forge_types::{AccountId, BundleId, OutputId, RightId};
use thiserror::Error;

/// Errors from the rights registries.
///
/// All are precondition failures surfaced before any mutation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RightsError {
    #[error("expiry time must be in the future")]
    InvalidExpiryTime,

    #[error("bundle {bundle} is not owned by {caller}")]
    Unauthorized { bundle: BundleId, caller: AccountId },

    #[error("bundle {0} was already redeemed")]
    AlreadyRedeemed(BundleId),

    #[error("bundle {0} is past its expiry time")]
    BundleExpired(BundleId),

    #[error("bundle {0} has not expired")]
    BundleNotExpired(BundleId),

    #[error("creation right {0} is soulbound and cannot change owner")]
    SoulboundViolation(RightId),

    #[error("creation right {right} is not held by {caller}")]
    NotOwner { right: RightId, caller: AccountId },

    #[error("unknown bundle: {0}")]
    UnknownBundle(BundleId),

    #[error("unknown creation right: {0}")]
    UnknownRight(RightId),

    #[error("unknown output: {0}")]
    UnknownOutput(OutputId),

    #[error("output {output} is not owned by {caller}")]
    OutputNotOwned { output: OutputId, caller: AccountId },
}

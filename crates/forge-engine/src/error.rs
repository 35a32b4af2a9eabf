use forge_ledger::LedgerError;
use forge_rights::RightsError;
use forge_types::{AccountId, BundleKind};
use forge_window::WindowError;
use thiserror::Error;

use crate::capability::Capability;

/// Errors from orchestrator operations.
///
/// Every error aborts the call before any mutation: the propagation policy
/// is validate fully, then mutate behind a single commit.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("caller {caller} lacks the {capability:?} capability")]
    Unauthorized {
        caller: AccountId,
        capability: Capability,
    },

    #[error("bundle kind {0:?} requires sponsor terms with a positive amount")]
    MissingSponsorTerms(BundleKind),

    #[error("entitlement bundles carry no sponsor terms")]
    UnexpectedSponsorTerms,

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Rights(#[from] RightsError),

    #[error(transparent)]
    Window(#[from] WindowError),
}

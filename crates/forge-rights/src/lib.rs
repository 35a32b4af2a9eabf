//! Forge Rights - the bundle lifecycle, soulbound creation rights, and
//! transferable outputs
//!
//! Bundles move `Active -> {Redeemed, Expired}` and never backward. A
//! redeemed bundle yields a creation right whose owner can never change; a
//! finalized right yields a transferable output with full provenance.

#![deny(unsafe_code)]

pub mod bundle;
pub mod error;
pub mod output;
pub mod right;

pub use bundle::{Bundle, BundleRegistry, BundleState, SweepOutcome};
pub use error::RightsError;
pub use output::{Output, OutputRegistry};
pub use right::{CreationRight, RightRegistry};

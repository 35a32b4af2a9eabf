//! Forge Engine - the orchestrator for the token-issuance economy
//!
//! One entry point sequences every mutation across the value ledgers, the
//! bundle and right registries, and the 48-hour pricing window:
//!
//! - **create_bundle** — wrap units in a time-boxed bundle, mint the cost
//!   basis as deficit, collect sponsor payments up front
//! - **redeem_bundle** — burn the escrowed units, issue a soulbound
//!   creation right, settle subsidies and premiums
//! - **finalize** — burn the right into a transferable output (or keep it
//!   live on failure), book the incurred cost
//! - **sweep_expired** — the bounded compaction pass that reclaims expired
//!   bundles and nets unused sponsor money against accumulated deficit
//!
//! Each call is one atomic step: validate fully, then mutate. Callers are
//! serialized at this boundary; time enters only through the injected
//! clock, read once per call.

#![deny(unsafe_code)]

pub mod capability;
pub mod config;
pub mod engine;
pub mod error;

pub use capability::{CallerContext, Capability};
pub use config::EngineConfig;
pub use engine::{EngineReport, ForgeEngine};
pub use error::EngineError;

//! Forge Types - shared identifiers, amounts, and the clock abstraction
//!
//! Every other forge crate builds on these: account and item identifiers,
//! the bundle kind taxonomy, sponsor terms, and the injected clock that is
//! the engine's only source of time.

#![deny(unsafe_code)]

use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Fixed-point scale for unit prices: a price of 1.0 is `PRICE_SCALE`.
///
/// A 1000-unit bundle at price `50_000` (0.05) mints `1000 * 50_000 /
/// PRICE_SCALE = 50` deficit-currency.
pub const PRICE_SCALE: u64 = 1_000_000;

/// Account identifier — a string wrapper for holder addresses.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId(pub String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

macro_rules! numeric_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        pub struct $name(pub u64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

numeric_id!(
    /// Monotonically assigned bundle identifier.
    BundleId
);
numeric_id!(
    /// Monotonically assigned creation-right identifier.
    RightId
);
numeric_id!(
    /// Monotonically assigned output identifier.
    OutputId
);

/// The three bundle kinds the orchestrator issues.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BundleKind {
    /// Platform-subsidized entitlement: no sponsor payment attached.
    Entitlement,
    /// Sponsor pays a subsidy the redeemer receives on redemption.
    SponsorSubsidy,
    /// Redeemer owes the sponsor a premium on redemption.
    SponsorPremium,
}

/// Sponsor payment terms attached to a bundle.
///
/// The `kind` of the owning bundle decides the direction: a subsidy is paid
/// *to* the redeemer, a premium is owed *by* the redeemer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SponsorTerms {
    /// Who sponsors the bundle.
    pub sponsor: AccountId,
    /// Monetary amount in minor units.
    pub amount: u64,
    /// Opaque sponsor metadata carried through to the creation right.
    pub metadata: String,
}

/// Reference to produced content stored off-engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRef(pub String);

impl ContentRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }
}

impl std::fmt::Display for ContentRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Source of time for the engine.
///
/// One reading is taken per orchestrator call; implementations must be
/// monotonically non-decreasing.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually advanced clock for tests and replay.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn starting_at(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Advance the clock. Panics if the mutex is poisoned, which cannot
    /// happen outside a panicking test.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        let mut now = self.now.lock().unwrap();
        assert!(to >= *now, "clock must not move backwards");
        *now = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

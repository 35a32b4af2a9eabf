use chrono::Duration;
use forge_types::AccountId;

/// Orchestrator configuration.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// How long a bundle stays redeemable.
    pub bundle_duration: Duration,
    /// Maximum expired bundles fixed per compaction pass.
    pub sweep_cap: usize,
    /// Price used while the unit supply is zero, scaled by `PRICE_SCALE`.
    pub initial_unit_price: u64,
    /// Account holding wrapped units and escrowed sponsor payments.
    pub escrow_account: AccountId,
    /// Account accruing deficit and realized revenue.
    pub treasury_account: AccountId,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bundle_duration: Duration::hours(24),
            sweep_cap: 10,
            initial_unit_price: 50_000, // 0.05 at PRICE_SCALE
            escrow_account: AccountId::new("escrow"),
            treasury_account: AccountId::new("treasury"),
        }
    }
}

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use forge_ledger::{LedgerError, ValueLedger};
use forge_rights::{
    BundleRegistry, BundleState, OutputRegistry, RightRegistry, RightsError, SweepOutcome,
};
use forge_types::{
    AccountId, BundleId, BundleKind, Clock, ContentRef, OutputId, RightId, SponsorTerms,
    PRICE_SCALE,
};
use forge_window::{HealthMetrics, TrendReport, WindowAggregator, WindowTotals};
use serde::Serialize;
use tracing::{debug, info};

use crate::capability::{CallerContext, Capability};
use crate::config::EngineConfig;
use crate::error::EngineError;

/// Aggregate snapshot for operational logging and dashboards.
#[derive(Clone, Debug, Serialize)]
pub struct EngineReport {
    pub compute_supply: u64,
    pub revenue_supply: u64,
    pub deficit_supply: u64,
    pub outstanding_bundles: usize,
    pub live_rights: usize,
    pub outputs: usize,
    pub totals: WindowTotals,
    pub health: HealthMetrics,
}

/// The orchestrator: the single entry point that sequences operations
/// across the ledgers, registries, and the pricing window.
///
/// All collaborators are injected at construction and never reassigned.
/// The `&mut self` API serializes callers; each operation takes one clock
/// reading, validates fully, then mutates.
pub struct ForgeEngine {
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    /// Computational-unit ledger.
    compute: ValueLedger,
    /// Revenue-currency ledger, anchored to externally tracked reserves.
    revenue: ValueLedger,
    /// Deficit-currency ledger: cumulative incurred real cost.
    deficit: ValueLedger,
    bundles: BundleRegistry,
    rights: RightRegistry,
    outputs: OutputRegistry,
    window: WindowAggregator,
}

impl ForgeEngine {
    pub fn new(config: EngineConfig, clock: Arc<dyn Clock>) -> Self {
        let start = clock.now();
        Self {
            config,
            clock,
            compute: ValueLedger::new("compute-units"),
            revenue: ValueLedger::with_reserve_anchor("revenue"),
            deficit: ValueLedger::new("deficit"),
            bundles: BundleRegistry::new(),
            rights: RightRegistry::new(),
            outputs: OutputRegistry::new(),
            window: WindowAggregator::new(start),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn compute(&self) -> &ValueLedger {
        &self.compute
    }

    pub fn revenue(&self) -> &ValueLedger {
        &self.revenue
    }

    pub fn deficit(&self) -> &ValueLedger {
        &self.deficit
    }

    pub fn bundles(&self) -> &BundleRegistry {
        &self.bundles
    }

    pub fn rights(&self) -> &RightRegistry {
        &self.rights
    }

    pub fn outputs(&self) -> &OutputRegistry {
        &self.outputs
    }

    pub fn window(&self) -> &WindowAggregator {
        &self.window
    }

    /// Create a bundle of `units` computational units for `recipient`.
    ///
    /// Mints the units into escrow, mints deficit-currency for their cost
    /// basis at the current unit price, collects any sponsor subsidy up
    /// front, and records the flows in the window.
    #[allow(clippy::too_many_arguments)]
    pub fn create_bundle(
        &mut self,
        caller: &CallerContext,
        kind: BundleKind,
        recipient: AccountId,
        provider: impl Into<String>,
        units: u64,
        sponsor_terms: Option<SponsorTerms>,
        duration: Option<Duration>,
    ) -> Result<BundleId, EngineError> {
        caller.require(Capability::IssueBundles)?;
        let now = self.clock.now();

        if units == 0 {
            return Err(LedgerError::ZeroAmount.into());
        }
        match (kind, &sponsor_terms) {
            (BundleKind::Entitlement, Some(_)) => return Err(EngineError::UnexpectedSponsorTerms),
            (BundleKind::Entitlement, None) => {}
            (_, None) => return Err(EngineError::MissingSponsorTerms(kind)),
            (_, Some(terms)) if terms.amount == 0 => {
                return Err(EngineError::MissingSponsorTerms(kind))
            }
            (_, Some(_)) => {}
        }
        let expires_at = now + duration.unwrap_or(self.config.bundle_duration);
        if expires_at <= now {
            return Err(RightsError::InvalidExpiryTime.into());
        }

        // Price before the mint: the new units must not dilute their own
        // cost basis.
        let price = self.current_unit_price();
        let deficit_amount = (units as u128 * price as u128 / PRICE_SCALE as u128) as u64;

        // All preconditions hold; the mutations below cannot fail.
        let escrow = self.config.escrow_account.clone();
        let treasury = self.config.treasury_account.clone();

        self.compute.mint(&escrow, units, now)?;
        self.window.record_compute_consumed(units, now)?;
        if deficit_amount > 0 {
            self.deficit.mint(&treasury, deficit_amount, now)?;
            self.window.record_deficit(deficit_amount, now)?;
        }
        self.window.record_claim(now);

        if kind == BundleKind::SponsorSubsidy {
            if let Some(terms) = &sponsor_terms {
                // The sponsor's payment backs the minted revenue-currency.
                self.revenue.add_backing_reserves(terms.amount);
                self.revenue.mint(&escrow, terms.amount, now)?;
                self.window.record_revenue(terms.amount, now)?;
            }
        }

        let id = self
            .bundles
            .create(recipient, kind, provider, units, sponsor_terms, expires_at, now)?;

        info!(bundle = %id, ?kind, units, price, deficit_amount, "bundle created");
        Ok(id)
    }

    /// Redeem a bundle into a soulbound creation right.
    pub fn redeem_bundle(
        &mut self,
        caller: &CallerContext,
        id: BundleId,
    ) -> Result<RightId, EngineError> {
        caller.require(Capability::RedeemBundles)?;
        let now = self.clock.now();

        // Validate the full redemption before any ledger mutation.
        let bundle = self
            .bundles
            .get(id)
            .ok_or(RightsError::UnknownBundle(id))?
            .clone();
        if bundle.owner != caller.account {
            return Err(RightsError::Unauthorized {
                bundle: id,
                caller: caller.account.clone(),
            }
            .into());
        }
        match bundle.state {
            BundleState::Active => {}
            BundleState::Redeemed => return Err(RightsError::AlreadyRedeemed(id).into()),
            BundleState::Expired => return Err(RightsError::BundleExpired(id).into()),
        }
        if now > bundle.expires_at {
            return Err(RightsError::BundleExpired(id).into());
        }

        let escrow = self.config.escrow_account.clone();

        // A premium is pulled from the redeemer first: it is the one step
        // that can still fail, and nothing else has mutated yet.
        if bundle.kind == BundleKind::SponsorPremium {
            if let Some(terms) = &bundle.sponsor_terms {
                self.deficit
                    .transfer(&caller.account, &terms.sponsor, terms.amount, now)?;
            }
        }

        self.bundles.redeem(id, &caller.account, now)?;
        self.compute.burn(&escrow, bundle.units, now)?;

        if bundle.kind == BundleKind::SponsorSubsidy {
            if let Some(terms) = &bundle.sponsor_terms {
                self.revenue
                    .transfer(&escrow, &caller.account, terms.amount, now)?;
            }
        }

        let right_id = self.rights.issue(
            caller.account.clone(),
            id,
            bundle.provider.clone(),
            bundle.units,
            bundle.sponsor_terms.clone(),
            now,
        );

        self.sweep_pass(now, self.config.sweep_cap)?;

        info!(bundle = %id, right = %right_id, caller = %caller.account, "bundle redeemed");
        Ok(right_id)
    }

    /// Finalize a creation right after the backend produced (or failed to
    /// produce) content.
    ///
    /// Success burns the right and records an output; failure leaves the
    /// right live for a retry. The incurred cost becomes deficit either
    /// way — it was spent regardless of outcome.
    pub fn finalize(
        &mut self,
        caller: &CallerContext,
        right_id: RightId,
        succeeded: bool,
        actual_cost: u64,
        content_ref: ContentRef,
    ) -> Result<Option<OutputId>, EngineError> {
        caller.require(Capability::Finalize)?;
        let now = self.clock.now();

        let right = self
            .rights
            .get(right_id)
            .ok_or(RightsError::UnknownRight(right_id))?
            .clone();

        let treasury = self.config.treasury_account.clone();
        let output_id = if succeeded {
            let burned = self.rights.finalize_burn(right_id, &right.owner)?;
            let sponsor = burned.sponsor_terms.as_ref().map(|t| t.sponsor.clone());
            let output_id = self.outputs.record(
                burned.owner.clone(),
                right_id,
                content_ref,
                burned.units,
                actual_cost,
                sponsor,
                now,
            );
            info!(right = %right_id, output = %output_id, actual_cost, "finalized");
            Some(output_id)
        } else {
            info!(right = %right_id, actual_cost, "finalization failed, right retained");
            None
        };

        if actual_cost > 0 {
            self.deficit.mint(&treasury, actual_cost, now)?;
            self.window.record_deficit(actual_cost, now)?;
        }

        self.sweep_pass(now, self.config.sweep_cap)?;
        Ok(output_id)
    }

    /// Run a compaction pass over at most `max_batch` expired bundles.
    ///
    /// Best-effort incremental: a backlog larger than the cap needs
    /// repeated invocations to drain. Returns how many bundles were fixed.
    pub fn sweep_expired(
        &mut self,
        caller: &CallerContext,
        max_batch: usize,
    ) -> Result<usize, EngineError> {
        caller.require(Capability::Sweep)?;
        let now = self.clock.now();
        self.sweep_pass(now, max_batch)
    }

    /// Manual deficit reconciliation: the external authority burns treasury
    /// deficit outside the automatic sweep path.
    pub fn reconcile_deficit(
        &mut self,
        caller: &CallerContext,
        amount: u64,
    ) -> Result<(), EngineError> {
        caller.require(Capability::Reconcile)?;
        let now = self.clock.now();
        let treasury = self.config.treasury_account.clone();
        self.deficit.burn(&treasury, amount, now)?;
        info!(amount, "deficit reconciled out-of-band");
        Ok(())
    }

    /// Cost-basis unit price at `PRICE_SCALE`, falling back to the
    /// configured initial price while no units exist.
    pub fn current_unit_price(&self) -> u64 {
        let supply = self.compute.net_supply();
        if supply == 0 {
            self.config.initial_unit_price
        } else {
            self.window.average_price(supply)
        }
    }

    pub fn window_totals(&self) -> WindowTotals {
        self.window.window_totals()
    }

    pub fn health_metrics(&self) -> HealthMetrics {
        self.window.health_metrics()
    }

    pub fn trend(&self) -> TrendReport {
        self.window.trend()
    }

    pub fn report(&self) -> EngineReport {
        EngineReport {
            compute_supply: self.compute.net_supply(),
            revenue_supply: self.revenue.net_supply(),
            deficit_supply: self.deficit.net_supply(),
            outstanding_bundles: self.bundles.len(),
            live_rights: self.rights.len(),
            outputs: self.outputs.len(),
            totals: self.window.window_totals(),
            health: self.window.health_metrics(),
        }
    }

    /// The bounded compaction pass shared by redeem, finalize, and the
    /// explicit sweep entry point.
    ///
    /// Scans outstanding bundles in ascending id order and fixes up to
    /// `cap` newly-expired ones: reclaims their units to the treasury and
    /// nets expired subsidies against accumulated deficit — burn what the
    /// deficit can absorb, realize the remainder as treasury revenue.
    fn sweep_pass(&mut self, now: DateTime<Utc>, cap: usize) -> Result<usize, EngineError> {
        let escrow = self.config.escrow_account.clone();
        let treasury = self.config.treasury_account.clone();

        let mut processed = 0;
        for id in self.bundles.expired_candidates(now) {
            if processed >= cap {
                break;
            }
            if self.bundles.sweep_expired(id, now)? == SweepOutcome::AlreadyProcessed {
                continue;
            }
            let bundle = self
                .bundles
                .get(id)
                .ok_or(RightsError::UnknownBundle(id))?
                .clone();

            // Unused units go back to the circulating pool.
            self.compute.transfer(&escrow, &treasury, bundle.units, now)?;
            self.window.record_compute_returned(bundle.units, now)?;
            self.window.record_expiry(now);

            if bundle.kind == BundleKind::SponsorSubsidy {
                if let Some(terms) = &bundle.sponsor_terms {
                    // Clamped by treasury balance as well: the external
                    // reconciliation authority may have burned deficit
                    // out-of-band already.
                    let burnable = terms
                        .amount
                        .min(self.deficit.net_supply())
                        .min(self.deficit.balance(&treasury));
                    if burnable > 0 {
                        self.deficit.burn(&treasury, burnable, now)?;
                        self.revenue.burn(&escrow, burnable, now)?;
                    }
                    let remainder = terms.amount - burnable;
                    if remainder > 0 {
                        self.revenue.transfer(&escrow, &treasury, remainder, now)?;
                    }
                    self.window.record_expired_sponsor_amount(terms.amount, now)?;
                    debug!(bundle = %id, subsidy = terms.amount, burnable, remainder,
                        "expired subsidy netted against deficit");
                }
            }

            processed += 1;
        }

        if processed > 0 {
            info!(processed, cap, "expiry sweep pass complete");
        }
        Ok(processed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use forge_types::ManualClock;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()
    }

    fn engine() -> (ForgeEngine, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::starting_at(t0()));
        let engine = ForgeEngine::new(EngineConfig::default(), clock.clone());
        (engine, clock)
    }

    fn scheduler() -> CallerContext {
        CallerContext::with(AccountId::new("scheduler"), [Capability::IssueBundles])
    }

    fn redeemer(name: &str) -> CallerContext {
        CallerContext::with(AccountId::new(name), [Capability::RedeemBundles])
    }

    #[test]
    fn capability_gate_rejects_before_anything_else() {
        let (mut engine, _clock) = engine();
        let nobody = CallerContext::new(AccountId::new("nobody"));

        let err = engine
            .create_bundle(
                &nobody,
                BundleKind::Entitlement,
                AccountId::new("alice"),
                "provider-a",
                1000,
                None,
                None,
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::Unauthorized { .. }));
        assert_eq!(engine.compute().net_supply(), 0);
    }

    #[test]
    fn entitlement_bundles_reject_sponsor_terms() {
        let (mut engine, _clock) = engine();
        let terms = SponsorTerms {
            sponsor: AccountId::new("sponsor"),
            amount: 10,
            metadata: String::new(),
        };
        assert_eq!(
            engine.create_bundle(
                &scheduler(),
                BundleKind::Entitlement,
                AccountId::new("alice"),
                "provider-a",
                100,
                Some(terms),
                None,
            ),
            Err(EngineError::UnexpectedSponsorTerms)
        );
    }

    #[test]
    fn sponsor_bundles_require_positive_terms() {
        let (mut engine, _clock) = engine();
        assert_eq!(
            engine.create_bundle(
                &scheduler(),
                BundleKind::SponsorSubsidy,
                AccountId::new("alice"),
                "provider-a",
                100,
                None,
                None,
            ),
            Err(EngineError::MissingSponsorTerms(BundleKind::SponsorSubsidy))
        );
        assert_eq!(
            engine.create_bundle(
                &scheduler(),
                BundleKind::SponsorPremium,
                AccountId::new("alice"),
                "provider-a",
                100,
                Some(SponsorTerms {
                    sponsor: AccountId::new("sponsor"),
                    amount: 0,
                    metadata: String::new(),
                }),
                None,
            ),
            Err(EngineError::MissingSponsorTerms(BundleKind::SponsorPremium))
        );
    }

    #[test]
    fn create_bundle_mints_escrow_and_cost_basis() {
        let (mut engine, _clock) = engine();
        engine
            .create_bundle(
                &scheduler(),
                BundleKind::Entitlement,
                AccountId::new("alice"),
                "provider-a",
                1000,
                None,
                None,
            )
            .unwrap();

        let escrow = engine.config().escrow_account.clone();
        assert_eq!(engine.compute().balance(&escrow), 1000);
        // 1000 units at the 0.05 initial price.
        assert_eq!(engine.deficit().net_supply(), 50);
        assert_eq!(engine.window_totals().deficit, 50);
        assert_eq!(engine.window_totals().compute_consumed, 1000);
        assert_eq!(engine.window_totals().claims, 1);
    }

    #[test]
    fn unit_price_falls_back_then_tracks_window() {
        let (mut engine, _clock) = engine();
        assert_eq!(engine.current_unit_price(), 50_000);

        engine
            .create_bundle(
                &scheduler(),
                BundleKind::Entitlement,
                AccountId::new("alice"),
                "provider-a",
                1000,
                None,
                None,
            )
            .unwrap();

        // 50 deficit over 1000 units: price unchanged at the fixpoint.
        assert_eq!(engine.current_unit_price(), 50_000);
    }

    #[test]
    fn redeem_burns_escrow_and_issues_soulbound_right() {
        let (mut engine, _clock) = engine();
        let alice = redeemer("alice");
        let id = engine
            .create_bundle(
                &scheduler(),
                BundleKind::Entitlement,
                alice.account.clone(),
                "provider-a",
                1000,
                None,
                None,
            )
            .unwrap();

        let right_id = engine.redeem_bundle(&alice, id).unwrap();

        let escrow = engine.config().escrow_account.clone();
        assert_eq!(engine.compute().balance(&escrow), 0);
        assert_eq!(engine.compute().net_supply(), 0);
        assert_eq!(
            engine.bundles().get(id).unwrap().state,
            BundleState::Redeemed
        );
        let right = engine.rights().get(right_id).unwrap();
        assert_eq!(right.owner, alice.account);
        assert_eq!(right.units, 1000);
        assert!(!right.transferable);
    }

    #[test]
    fn redeem_requires_ownership_and_capability() {
        let (mut engine, _clock) = engine();
        let id = engine
            .create_bundle(
                &scheduler(),
                BundleKind::Entitlement,
                AccountId::new("alice"),
                "provider-a",
                100,
                None,
                None,
            )
            .unwrap();

        let mallory = redeemer("mallory");
        assert!(matches!(
            engine.redeem_bundle(&mallory, id),
            Err(EngineError::Rights(RightsError::Unauthorized { .. }))
        ));

        let alice_no_cap = CallerContext::new(AccountId::new("alice"));
        assert!(matches!(
            engine.redeem_bundle(&alice_no_cap, id),
            Err(EngineError::Unauthorized { .. })
        ));
    }

    #[test]
    fn premium_redeem_fails_atomically_without_funds() {
        let (mut engine, _clock) = engine();
        let alice = redeemer("alice");
        let id = engine
            .create_bundle(
                &scheduler(),
                BundleKind::SponsorPremium,
                alice.account.clone(),
                "provider-a",
                100,
                Some(SponsorTerms {
                    sponsor: AccountId::new("sponsor"),
                    amount: 30,
                    metadata: String::new(),
                }),
                None,
            )
            .unwrap();

        // Alice holds no deficit-currency to pay the premium with.
        assert!(matches!(
            engine.redeem_bundle(&alice, id),
            Err(EngineError::Ledger(LedgerError::InsufficientBalance { .. }))
        ));
        // Nothing moved: bundle still active, escrow untouched.
        assert_eq!(engine.bundles().get(id).unwrap().state, BundleState::Active);
        let escrow = engine.config().escrow_account.clone();
        assert_eq!(engine.compute().balance(&escrow), 100);
        assert_eq!(engine.rights().len(), 0);
    }

    #[test]
    fn reconcile_burns_treasury_deficit() {
        let (mut engine, _clock) = engine();
        engine
            .create_bundle(
                &scheduler(),
                BundleKind::Entitlement,
                AccountId::new("alice"),
                "provider-a",
                1000,
                None,
                None,
            )
            .unwrap();
        assert_eq!(engine.deficit().net_supply(), 50);

        let authority = CallerContext::with(AccountId::new("auditor"), [Capability::Reconcile]);
        engine.reconcile_deficit(&authority, 20).unwrap();
        assert_eq!(engine.deficit().net_supply(), 30);

        assert!(matches!(
            engine.reconcile_deficit(&authority, 1000),
            Err(EngineError::Ledger(LedgerError::InsufficientBalance { .. }))
        ));
    }
}

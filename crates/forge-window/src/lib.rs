//! Forge Window - the 48-hour rolling window behind dynamic pricing
//!
//! Eight fixed buckets of six hours each form a ring with an explicit head
//! index. Every recording operation rotates first, then adds into the
//! current bucket. Rotation is single-step by design: a check performed late
//! does not retroactively create intermediate buckets, and after more than
//! 48 hours of silence stale data is dropped on the next rotation rather
//! than replayed.

#![deny(unsafe_code)]

use chrono::{DateTime, Duration, Utc};
use forge_types::PRICE_SCALE;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of buckets in the ring.
pub const BUCKET_COUNT: usize = 8;

/// Width of one bucket.
pub fn bucket_duration() -> Duration {
    Duration::hours(6)
}

/// Errors from window recording operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WindowError {
    #[error("recorded amount must be positive")]
    ZeroAmount,
}

/// One 6-hour aggregation slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    /// When this slot was entered.
    pub started_at: DateTime<Utc>,
    /// Revenue collected.
    pub revenue: u64,
    /// Deficit generated.
    pub deficit: u64,
    /// Computational units committed to bundles.
    pub compute_consumed: u64,
    /// Computational units reclaimed from expired bundles.
    pub compute_returned: u64,
    /// Bundles swept as expired.
    pub expiries: u64,
    /// Bundles issued (entitlement claims on capacity).
    pub claims: u64,
    /// Sponsor amounts on bundles that expired unredeemed.
    pub expired_sponsor_amount: u64,
}

impl Bucket {
    fn enter(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            revenue: 0,
            deficit: 0,
            compute_consumed: 0,
            compute_returned: 0,
            expiries: 0,
            claims: 0,
            expired_sponsor_amount: 0,
        }
    }

    fn net_position(&self) -> i64 {
        self.revenue as i64 - self.deficit as i64
    }
}

/// Totals across all eight buckets — at most the trailing 48 hours, at
/// 6-hour granularity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowTotals {
    pub revenue: u64,
    pub deficit: u64,
    pub compute_consumed: u64,
    pub compute_returned: u64,
    pub expiries: u64,
    pub claims: u64,
    pub expired_sponsor_amount: u64,
}

/// Derived health ratios over the window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthMetrics {
    /// revenue - deficit, signed.
    pub net_position: i64,
    /// expiries / claims x 100, integer truncation, 0 when no claims.
    pub expiry_rate_pct: u64,
    /// consumed / (consumed + returned) x 100, 0 when no activity.
    pub utilization_pct: u64,
}

/// Net-position comparison of the recent 24h against the 24h before it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendReport {
    pub recent_net: i64,
    pub previous_net: i64,
}

impl TrendReport {
    /// Improving iff the recent net position is strictly greater.
    pub fn improving(&self) -> bool {
        self.recent_net > self.previous_net
    }
}

/// The 8-slot ring of 6-hour buckets.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WindowAggregator {
    buckets: [Bucket; BUCKET_COUNT],
    /// Index of the current bucket.
    head: usize,
    last_rotation: DateTime<Utc>,
}

impl WindowAggregator {
    /// Create the ring with all slots empty and the first slot current.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            buckets: [Bucket::enter(start); BUCKET_COUNT],
            head: 0,
            last_rotation: start,
        }
    }

    pub fn current_index(&self) -> usize {
        self.head
    }

    pub fn last_rotation(&self) -> DateTime<Utc> {
        self.last_rotation
    }

    pub fn buckets(&self) -> &[Bucket; BUCKET_COUNT] {
        &self.buckets
    }

    /// Advance the ring by exactly one slot if at least six hours have
    /// elapsed since the last rotation.
    ///
    /// Single-step: intervening data is attributed entirely to the next
    /// bucket regardless of how late the check runs, and a gap past 48h
    /// leaves stale slots to be overwritten one rotation at a time.
    pub fn rotate_if_due(&mut self, now: DateTime<Utc>) {
        if now - self.last_rotation >= bucket_duration() {
            self.head = (self.head + 1) % BUCKET_COUNT;
            self.buckets[self.head] = Bucket::enter(now);
            self.last_rotation = now;
        }
    }

    pub fn record_revenue(&mut self, amount: u64, now: DateTime<Utc>) -> Result<(), WindowError> {
        self.record(now, amount, |bucket, v| bucket.revenue += v)
    }

    pub fn record_deficit(&mut self, amount: u64, now: DateTime<Utc>) -> Result<(), WindowError> {
        self.record(now, amount, |bucket, v| bucket.deficit += v)
    }

    pub fn record_compute_consumed(
        &mut self,
        amount: u64,
        now: DateTime<Utc>,
    ) -> Result<(), WindowError> {
        self.record(now, amount, |bucket, v| bucket.compute_consumed += v)
    }

    pub fn record_compute_returned(
        &mut self,
        amount: u64,
        now: DateTime<Utc>,
    ) -> Result<(), WindowError> {
        self.record(now, amount, |bucket, v| bucket.compute_returned += v)
    }

    pub fn record_expired_sponsor_amount(
        &mut self,
        amount: u64,
        now: DateTime<Utc>,
    ) -> Result<(), WindowError> {
        self.record(now, amount, |bucket, v| bucket.expired_sponsor_amount += v)
    }

    /// Count one swept expiry.
    pub fn record_expiry(&mut self, now: DateTime<Utc>) {
        self.rotate_if_due(now);
        self.buckets[self.head].expiries += 1;
    }

    /// Count one issued bundle.
    pub fn record_claim(&mut self, now: DateTime<Utc>) {
        self.rotate_if_due(now);
        self.buckets[self.head].claims += 1;
    }

    fn record(
        &mut self,
        now: DateTime<Utc>,
        amount: u64,
        add: impl FnOnce(&mut Bucket, u64),
    ) -> Result<(), WindowError> {
        if amount == 0 {
            return Err(WindowError::ZeroAmount);
        }
        self.rotate_if_due(now);
        add(&mut self.buckets[self.head], amount);
        Ok(())
    }

    /// Sum all eight slots. Always exactly eight additions per field.
    pub fn window_totals(&self) -> WindowTotals {
        let mut totals = WindowTotals::default();
        for bucket in &self.buckets {
            totals.revenue += bucket.revenue;
            totals.deficit += bucket.deficit;
            totals.compute_consumed += bucket.compute_consumed;
            totals.compute_returned += bucket.compute_returned;
            totals.expiries += bucket.expiries;
            totals.claims += bucket.claims;
            totals.expired_sponsor_amount += bucket.expired_sponsor_amount;
        }
        totals
    }

    /// Window-level health ratios: signed net position, truncated integer
    /// expiry rate, truncated integer utilization.
    pub fn health_metrics(&self) -> HealthMetrics {
        let totals = self.window_totals();
        let expiry_rate_pct = if totals.claims == 0 {
            0
        } else {
            totals.expiries * 100 / totals.claims
        };
        let compute_total = totals.compute_consumed + totals.compute_returned;
        let utilization_pct = if compute_total == 0 {
            0
        } else {
            totals.compute_consumed * 100 / compute_total
        };
        HealthMetrics {
            net_position: totals.revenue as i64 - totals.deficit as i64,
            expiry_rate_pct,
            utilization_pct,
        }
    }

    /// Compare the most recent four slots against the four before them.
    pub fn trend(&self) -> TrendReport {
        let mut recent_net = 0i64;
        let mut previous_net = 0i64;
        for offset in 0..BUCKET_COUNT {
            // offset 0 is the current slot, 7 the oldest.
            let index = (self.head + BUCKET_COUNT - offset) % BUCKET_COUNT;
            if offset < BUCKET_COUNT / 2 {
                recent_net += self.buckets[index].net_position();
            } else {
                previous_net += self.buckets[index].net_position();
            }
        }
        TrendReport {
            recent_net,
            previous_net,
        }
    }

    /// Cost-basis price signal: window deficit scaled by `PRICE_SCALE` over
    /// the unit supply. Zero when there is no supply.
    pub fn average_price(&self, total_supply: u64) -> u64 {
        if total_supply == 0 {
            return 0;
        }
        let deficit = self.window_totals().deficit as u128;
        (deficit * PRICE_SCALE as u128 / total_supply as u128) as u64
    }
}

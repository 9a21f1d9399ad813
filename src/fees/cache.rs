//! In-memory fee estimate cache
//!
//! Estimates arrive per confirmation target ("fee to confirm within N
//! blocks"). Nothing here is persisted; a restart starts empty.

use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;

/// Fee rate in satoshis per kilobyte
pub type FeeRate = f64;

/// Confirmation targets tracked, slowest first. Dynamic fee index `i` in
/// `0..4` reads `FEE_TARGETS[i]`.
pub const FEE_TARGETS: [u32; 4] = [25, 10, 5, 2];

/// Dynamic fee index of the synthetic tier above the fastest target
pub const HIGH_PRIORITY_INDEX: usize = 4;

/// Target reported for the high priority tier by reverse lookup
pub const HIGH_PRIORITY_TARGET: i32 = 1;

/// Target reported by reverse lookup for rates under the slowest tier
pub const NO_RUSH_TARGET: i32 = -1;

const FASTEST_TARGET: u32 = 2;
const SLOWEST_TARGET: u32 = 25;

/// Default absolute maximum fee rate
pub const MAX_FEE_RATE: FeeRate = 10_000.0;

/// Dynamic fees never exceed this multiple of the maximum fee rate
const DYNAMIC_FEE_CAP_FACTOR: FeeRate = 5.0;

const HIGH_PRIORITY_FACTOR: FeeRate = 1.5;

pub fn stale_after() -> Duration {
    Duration::minutes(20)
}

pub fn request_throttle() -> Duration {
    Duration::seconds(60)
}

#[derive(Debug, Clone, Default)]
pub struct FeeCache {
    estimates: BTreeMap<u32, FeeRate>,
    last_updated: BTreeMap<u32, DateTime<Utc>>,
    /// Starts at the epoch so the first check asks for estimates
    last_requested: DateTime<Utc>,
}

impl FeeCache {
    /// Record an observed rate for `target`.
    ///
    /// The update time never moves backwards.
    pub fn update(&mut self, target: u32, rate: FeeRate, now: DateTime<Utc>) {
        self.estimates.insert(target, rate);
        self.last_updated
            .entry(target)
            .and_modify(|updated| {
                if now > *updated {
                    *updated = now;
                }
            })
            .or_insert(now);
    }

    pub fn estimate(&self, target: u32) -> Option<FeeRate> {
        self.estimates.get(&target).copied()
    }

    pub fn last_updated(&self, target: u32) -> Option<DateTime<Utc>> {
        self.last_updated.get(&target).copied()
    }

    pub fn len(&self) -> usize {
        self.estimates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.estimates.is_empty()
    }

    /// True once every tracked target has an estimate
    pub fn has_full_estimates(&self) -> bool {
        self.estimates.len() == FEE_TARGETS.len()
    }

    /// Fee rate for a priority index, capped at 5x `max_fee_rate`.
    ///
    /// Indices `0..4` read [`FEE_TARGETS`]; index 4 is 1.5x the fastest
    /// target's estimate. `None` when the estimate is missing or the index is
    /// out of range.
    pub fn dynamic_fee(&self, index: usize, max_fee_rate: FeeRate) -> Option<FeeRate> {
        let fee = if index < FEE_TARGETS.len() {
            self.estimate(FEE_TARGETS[index])?
        } else if index == HIGH_PRIORITY_INDEX {
            self.estimate(FASTEST_TARGET)? * HIGH_PRIORITY_FACTOR
        } else {
            return None;
        };

        Some(fee.min(DYNAMIC_FEE_CAP_FACTOR * max_fee_rate))
    }

    /// Confirmation target whose estimate is closest to `fee_per_kb`.
    ///
    /// Candidates are the observed targets in ascending order followed by the
    /// high priority tier as target 1; ties go to the first candidate. A rate
    /// below half the slowest target's estimate reports [`NO_RUSH_TARGET`].
    pub fn reverse_dynamic_fee(&self, fee_per_kb: FeeRate, max_fee_rate: FeeRate) -> Option<i32> {
        let high_priority = self
            .dynamic_fee(HIGH_PRIORITY_INDEX, max_fee_rate)
            .map(|rate| (HIGH_PRIORITY_TARGET, rate));

        let (nearest, _) = self
            .estimates
            .iter()
            .map(|(target, rate)| (*target as i32, *rate))
            .chain(high_priority)
            .min_by(|(_, a), (_, b)| (a - fee_per_kb).abs().total_cmp(&(b - fee_per_kb).abs()))?;

        match self.estimate(SLOWEST_TARGET) {
            Some(slowest) if fee_per_kb < slowest / 2.0 => Some(NO_RUSH_TARGET),
            _ => Some(nearest),
        }
    }

    /// Whether new estimates should be requested at `now`.
    ///
    /// Requires both that the oldest estimate (or the epoch, with none) is
    /// stale and that the last request is older than the throttle window.
    pub fn is_refresh_due(&self, now: DateTime<Utc>) -> bool {
        let oldest = self
            .last_updated
            .values()
            .min()
            .copied()
            .unwrap_or_default();

        let stale = now - oldest > stale_after();
        let old_request = now - self.last_requested > request_throttle();
        stale && old_request
    }

    pub fn mark_requested(&mut self, now: DateTime<Utc>) {
        self.last_requested = now;
    }

    pub fn last_requested(&self) -> DateTime<Utc> {
        self.last_requested
    }
}

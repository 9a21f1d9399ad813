//! Fee estimation through the config store
//!
//! The estimate cache lives inside the store and shares its lock, so a
//! network thread feeding estimates and a UI thread reading them see a
//! consistent cache alongside the fee settings.

use crate::config::keys;
use crate::config::ConfigStore;
use crate::fees::{FeeRate, HIGH_PRIORITY_INDEX, MAX_FEE_RATE};
use crate::types::{ConfigError, Result};
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

/// Fee rate assumed for a new wallet with no fee settings
const DEFAULT_FEE_PER_KB: FeeRate = 1000.0;

impl ConfigStore {
    pub fn update_fee_estimate(&self, target: u32, rate: FeeRate) {
        self.update_fee_estimate_at(target, rate, Utc::now());
    }

    pub fn update_fee_estimate_at(&self, target: u32, rate: FeeRate, now: DateTime<Utc>) {
        debug!("Fee estimate for {} blocks: {} sat/kB", target, rate);
        self.with_state_mut(|state| state.fees.update(target, rate, now));
    }

    pub fn fee_estimate(&self, target: u32) -> Option<FeeRate> {
        self.with_state_mut(|state| state.fees.estimate(target))
    }

    /// Dynamic fee rate for priority `index` (0 slowest to 4 fastest).
    ///
    /// `Ok(None)` means no estimate is available yet for that tier.
    pub fn dynamic_fee(&self, index: usize) -> Result<Option<FeeRate>> {
        if index > HIGH_PRIORITY_INDEX {
            return Err(ConfigError::FeeIndexOutOfRange(index));
        }

        let _guard = self.lock();
        let max_fee_rate = self.max_fee_rate()?;
        Ok(self.with_state_mut(|state| state.fees.dynamic_fee(index, max_fee_rate)))
    }

    /// Confirmation target matching `fee_per_kb`; -1 means below every
    /// tracked tier, `None` means no estimates yet.
    pub fn reverse_dynamic_fee(&self, fee_per_kb: FeeRate) -> Result<Option<i32>> {
        let _guard = self.lock();
        let max_fee_rate = self.max_fee_rate()?;
        Ok(self.with_state_mut(|state| state.fees.reverse_dynamic_fee(fee_per_kb, max_fee_rate)))
    }

    pub fn has_full_fee_estimates(&self) -> bool {
        self.with_state_mut(|state| state.fees.has_full_estimates())
    }

    pub fn is_fee_refresh_due(&self) -> bool {
        self.is_fee_refresh_due_at(Utc::now())
    }

    pub fn is_fee_refresh_due_at(&self, now: DateTime<Utc>) -> bool {
        self.with_state_mut(|state| state.fees.is_refresh_due(now))
    }

    /// Acknowledge that fee estimates were just requested
    pub fn requested_fee_estimates(&self) {
        self.requested_fee_estimates_at(Utc::now());
    }

    pub fn requested_fee_estimates_at(&self, now: DateTime<Utc>) {
        self.with_state_mut(|state| state.fees.mark_requested(now));
    }

    /// Configured maximum fee rate; unset or 0 means [`MAX_FEE_RATE`].
    pub fn max_fee_rate(&self) -> Result<FeeRate> {
        match self.get_as::<FeeRate>(keys::MAX_FEE_RATE, "a number")? {
            Some(rate) if rate != 0.0 => Ok(rate),
            _ => Ok(MAX_FEE_RATE),
        }
    }

    pub fn custom_fee_rate(&self) -> Option<Value> {
        self.get(keys::CUSTOM_FEE)
    }

    /// Whether a usable custom fee rate is set: a non-negative number,
    /// or text that parses as one.
    pub fn has_custom_fee_rate(&self) -> bool {
        let rate = match self.custom_fee_rate() {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        rate.map_or(false, |rate| rate.is_finite() && rate >= 0.0)
    }

    /// Fee rate in use: custom fee, then `fee_per_kb`, then the default.
    pub fn fee_per_kb(&self) -> Result<FeeRate> {
        let _guard = self.lock();
        if let Some(rate) = self.get_as::<FeeRate>(keys::CUSTOM_FEE, "a number")? {
            return Ok(rate);
        }
        Ok(self
            .get_as::<FeeRate>(keys::FEE_PER_KB, "a number")?
            .unwrap_or(DEFAULT_FEE_PER_KB))
    }

    /// Fee in satoshis for a transaction of `size` bytes at the current
    /// rate, rounded down
    pub fn estimate_fee(&self, size: u64) -> Result<u64> {
        let fee = self.fee_per_kb()? * size as f64 / 1000.0;
        // float to int casts saturate; negative rates give 0
        Ok(fee as u64)
    }
}

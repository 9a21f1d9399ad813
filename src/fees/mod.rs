//! Transaction fee estimation
//!
//! Live estimates keyed by confirmation target, plus the static ladder used
//! when dynamic fees are off.

mod cache;
mod estimator;
mod ladder;

pub use cache::{
    request_throttle, stale_after, FeeCache, FeeRate, FEE_TARGETS, HIGH_PRIORITY_INDEX,
    HIGH_PRIORITY_TARGET, MAX_FEE_RATE, NO_RUSH_TARGET,
};
pub use ladder::{static_fee, static_fee_index, STATIC_FEE_RATES};

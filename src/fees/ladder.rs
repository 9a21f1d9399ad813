//! Static fee ladder for manual fee selection

use crate::fees::FeeRate;

pub const STATIC_FEE_RATES: [FeeRate; 10] = [
    1000.0, 2000.0, 3000.0, 4000.0, 5000.0, 6000.0, 7000.0, 8000.0, 9000.0, 10000.0,
];

pub fn static_fee(index: usize) -> Option<FeeRate> {
    STATIC_FEE_RATES.get(index).copied()
}

/// Index of the ladder entry nearest to `value`, lowest index on ties
pub fn static_fee_index(value: FeeRate) -> usize {
    STATIC_FEE_RATES
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| (*a - value).abs().total_cmp(&(*b - value).abs()))
        .map(|(index, _)| index)
        .unwrap_or(0)
}

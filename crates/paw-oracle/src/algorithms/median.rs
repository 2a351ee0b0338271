//! # Weighted Median & Outlier Bands
//!
//! Pure functions over collected submissions. All arithmetic is integral
//! with `U256` intermediates. Input order never matters: every function
//! sorts by `(price, validator)` before weighing.
//!
//! The deviation estimate is the weighted median absolute deviation scaled
//! by 1.4826, the consistency factor that makes the MAD estimate sigma for
//! normally distributed data. A plain standard deviation is useless here: a
//! single large outlier inflates it enough to place itself inside its own
//! 3-sigma band.

use primitive_types::U256;
use shared_types::Address;

/// MAD-to-sigma consistency factor, scaled by 1e4.
const MAD_SCALE_NUM: u128 = 14_826;
const MAD_SCALE_DEN: u128 = 10_000;

/// One weighted price point.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WeightedPoint {
    pub validator: Address,
    pub price_micro: u128,
    pub weight: u128,
}

/// Stake-weighted median: the smallest price at which the cumulative
/// weight reaches half the total.
pub fn weighted_median(points: &[WeightedPoint]) -> Option<u128> {
    let total: u128 = points.iter().map(|p| p.weight).sum();
    if total == 0 {
        return None;
    }
    let mut sorted: Vec<(u128, u128)> = points
        .iter()
        .map(|p| (p.price_micro, p.weight))
        .collect();
    sorted.sort_unstable();
    median_of_sorted(&sorted, total)
}

fn median_of_sorted(sorted: &[(u128, u128)], total: u128) -> Option<u128> {
    let half = (total + 1) / 2;
    let mut acc = 0u128;
    for (value, weight) in sorted {
        acc += weight;
        if acc >= half {
            return Some(*value);
        }
    }
    None
}

/// Stake-weighted mean (used for confidence reporting).
pub fn weighted_mean(points: &[WeightedPoint]) -> Option<u128> {
    let total: u128 = points.iter().map(|p| p.weight).sum();
    if total == 0 {
        return None;
    }
    let mut sum = U256::zero();
    for p in points {
        sum += U256::from(p.price_micro) * U256::from(p.weight);
    }
    Some((sum / U256::from(total)).as_u128())
}

/// Robust sigma estimate: `1.4826 × weighted MAD` around the weighted
/// median.
pub fn robust_sigma(points: &[WeightedPoint]) -> Option<u128> {
    let median = weighted_median(points)?;
    let total: u128 = points.iter().map(|p| p.weight).sum();
    let mut deviations: Vec<(u128, u128)> = points
        .iter()
        .map(|p| (p.price_micro.abs_diff(median), p.weight))
        .collect();
    deviations.sort_unstable();
    let mad = median_of_sorted(&deviations, total)?;
    Some(mad.saturating_mul(MAD_SCALE_NUM) / MAD_SCALE_DEN)
}

/// Band `[median − k·σ, median + k·σ]` over the given set.
pub fn outlier_band(points: &[WeightedPoint], sigma_multiple: u128) -> Option<(u128, u128)> {
    let median = weighted_median(points)?;
    let sigma = robust_sigma(points)?;
    let band = sigma.saturating_mul(sigma_multiple);
    Some((median.saturating_sub(band), median.saturating_add(band)))
}

/// Split points into those inside the band and the outliers, recomputing
/// the band once more over the survivors (`passes` total).
pub fn strip_outliers(
    points: Vec<WeightedPoint>,
    sigma_multiple: u128,
    passes: usize,
) -> (Vec<WeightedPoint>, Vec<WeightedPoint>) {
    let mut kept = points;
    let mut outliers = Vec::new();
    for _ in 0..passes {
        let Some((low, high)) = outlier_band(&kept, sigma_multiple) else {
            break;
        };
        if low == high {
            // Degenerate spread: nothing to strip.
            break;
        }
        let (inside, outside): (Vec<_>, Vec<_>) = kept
            .into_iter()
            .partition(|p| p.price_micro >= low && p.price_micro <= high);
        kept = inside;
        if outside.is_empty() {
            break;
        }
        outliers.extend(outside);
    }
    (kept, outliers)
}

//! # Constant-Product Math
//!
//! All pricing arithmetic for the AMM, in `U256` intermediates with
//! truncation toward zero. The swap fee stays in the pool's reserves, so
//! every trade grows the product `x · y`.

use primitive_types::U256;

/// Basis-point denominator.
pub const BPS: u128 = 10_000;

/// Output for a swap of `amount_in` against `(reserve_in, reserve_out)`
/// with `fee_bps` swap fee.
///
/// The effective input `dx · (1 − f)` prices the trade while the full input
/// joins the reserve, which keeps the fee in the pool:
///
/// `dy = reserve_out · dx_eff / (reserve_in + dx)`
pub fn swap_output(reserve_in: u128, reserve_out: u128, amount_in: u128, fee_bps: u32) -> u128 {
    if reserve_in == 0 || reserve_out == 0 || amount_in == 0 {
        return 0;
    }
    let dx_eff = U256::from(amount_in) * U256::from(BPS - fee_bps as u128) / U256::from(BPS);
    let numerator = U256::from(reserve_out) * dx_eff;
    let denominator = U256::from(reserve_in) + U256::from(amount_in);
    (numerator / denominator).min(U256::from(u128::MAX)).as_u128()
}

/// Shares minted for the pool's first deposit: `⌊√(a · b)⌋`.
pub fn initial_shares(amount_a: u128, amount_b: u128) -> u128 {
    isqrt(U256::from(amount_a) * U256::from(amount_b))
        .min(U256::from(u128::MAX))
        .as_u128()
}

/// Shares minted for a follow-up deposit: the limiting side of
/// `min(da · S / ra, db · S / rb)`.
pub fn shares_for_deposit(
    total_shares: u128,
    reserve_a: u128,
    reserve_b: u128,
    amount_a: u128,
    amount_b: u128,
) -> u128 {
    if reserve_a == 0 || reserve_b == 0 {
        return 0;
    }
    let by_a = U256::from(amount_a) * U256::from(total_shares) / U256::from(reserve_a);
    let by_b = U256::from(amount_b) * U256::from(total_shares) / U256::from(reserve_b);
    by_a.min(by_b).min(U256::from(u128::MAX)).as_u128()
}

/// Pro-rata withdrawal for burning `shares` out of `total_shares`.
pub fn withdraw_amounts(
    total_shares: u128,
    reserve_a: u128,
    reserve_b: u128,
    shares: u128,
) -> (u128, u128) {
    if total_shares == 0 {
        return (0, 0);
    }
    let a = U256::from(reserve_a) * U256::from(shares) / U256::from(total_shares);
    let b = U256::from(reserve_b) * U256::from(shares) / U256::from(total_shares);
    (a.as_u128(), b.as_u128())
}

/// Integer square root (Newton's method), truncating.
pub fn isqrt(n: U256) -> U256 {
    if n.is_zero() {
        return U256::zero();
    }
    let mut x = n;
    let mut y = (x + U256::one()) >> 1;
    while y < x {
        x = y;
        y = (x + n / x) >> 1;
    }
    x
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_swap() {
        // 10,000 upaw into a (1,000,000 upaw, 2,000,000 uusdt) pool at 30 bps.
        let dy = swap_output(1_000_000, 2_000_000, 10_000, 30);
        assert_eq!(dy, 19_742);
        // Product grows.
        let before = 1_000_000u128 * 2_000_000;
        let after = (1_000_000 + 10_000) as u128 * (2_000_000 - dy);
        assert!(after >= before);
    }

    #[test]
    fn test_zero_fee_swap() {
        let dy = swap_output(1_000_000, 1_000_000, 1_000, 0);
        // 1,000,000 * 1,000 / 1,001,000 = 999.0...
        assert_eq!(dy, 999);
    }

    #[test]
    fn test_swap_empty_pool_is_zero() {
        assert_eq!(swap_output(0, 1_000, 10, 30), 0);
        assert_eq!(swap_output(1_000, 0, 10, 30), 0);
        assert_eq!(swap_output(1_000, 1_000, 0, 30), 0);
    }

    #[test]
    fn test_product_monotone_over_many_swaps() {
        let (mut x, mut y) = (5_000_000u128, 3_000_000u128);
        for i in 1..50u128 {
            let dx = 1_000 + i * 37;
            let dy = swap_output(x, y, dx, 30);
            let before = x * y;
            x += dx;
            y -= dy;
            assert!(x * y >= before, "product shrank at step {i}");
        }
    }

    #[test]
    fn test_initial_shares_sqrt() {
        assert_eq!(initial_shares(1_000_000, 2_000_000), 1_414_213);
        assert_eq!(initial_shares(4, 9), 6);
        assert_eq!(initial_shares(0, 9), 0);
    }

    #[test]
    fn test_deposit_shares_limited_by_worse_side() {
        // Pool 2:1; depositing 1:1 is limited by the b side.
        let minted = shares_for_deposit(1_000, 2_000, 1_000, 200, 50);
        // by_a = 200*1000/2000 = 100; by_b = 50*1000/1000 = 50.
        assert_eq!(minted, 50);
    }

    #[test]
    fn test_add_then_remove_round_trip() {
        let (ra, rb, total) = (1_000_000u128, 2_000_000u128, 1_414_213u128);
        let minted = shares_for_deposit(total, ra, rb, 100_000, 200_000);
        let (out_a, out_b) =
            withdraw_amounts(total + minted, ra + 100_000, rb + 200_000, minted);
        // Within truncation bounds of the deposit.
        assert!(out_a <= 100_000 && out_a >= 99_990, "out_a {out_a}");
        assert!(out_b <= 200_000 && out_b >= 199_990, "out_b {out_b}");
    }

    #[test]
    fn test_isqrt_edges() {
        assert_eq!(isqrt(U256::zero()), U256::zero());
        assert_eq!(isqrt(U256::one()), U256::one());
        assert_eq!(isqrt(U256::from(15u8)), U256::from(3u8));
        assert_eq!(isqrt(U256::from(16u8)), U256::from(4u8));
    }
}

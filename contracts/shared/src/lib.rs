//! Shared revenue arithmetic for the charity lottery contracts.
//!
//! Everything here is pure: no storage, no auth, no token calls. The lottery
//! contract uses it to price a settled cycle, and clients can link it to
//! preview the same numbers off-chain.
#![no_std]
#![allow(unexpected_cfgs)]

use soroban_sdk::{contracterror, contracttype};

/// Error codes for the split math.
#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum Error {
    InvalidAmount = 1,
    InvalidSplit = 2,
    Overflow = 3,
}

/// Constant for basis points divisor.
pub const BASIS_POINTS_DIVISOR: u32 = 10_000;

/// Foundation share of every cycle's revenue (5%). Fixed by protocol.
pub const FOUNDATION_BPS: u32 = 500;

/// Developer share of every cycle's revenue (4%). Fixed by protocol.
pub const DEVELOPER_BPS: u32 = 400;

/// Default part of total revenue that stays in the contract as jackpot
/// contribution. It is carved out of the franchisee share.
pub const DEFAULT_PRIZE_POOL_BPS: u32 = 6_000;

/// Largest prize-pool share a franchisee may configure.
pub const MAX_PRIZE_POOL_BPS: u32 = BASIS_POINTS_DIVISOR - FOUNDATION_BPS - DEVELOPER_BPS;

/// How one cycle's stake is divided.
///
/// `foundation_share + developer_share + franchisee_share == total_revenue`
/// always holds; rounding dust lands in `franchisee_share`.
/// `prize_contribution` is the slice of `franchisee_share` that is kept for
/// the prize pool instead of being transferred out.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RevenueSplit {
    pub total_revenue: i128,
    pub foundation_share: i128,
    pub developer_share: i128,
    pub franchisee_share: i128,
    pub prize_contribution: i128,
}

impl RevenueSplit {
    /// Amount actually sent to the franchisee/charity wallet.
    pub fn franchisee_payout(&self) -> i128 {
        self.franchisee_share - self.prize_contribution
    }
}

/// `amount * bps / 10_000`, rounded down.
pub fn bps_share(amount: i128, bps: u32) -> Result<i128, Error> {
    if amount < 0 {
        return Err(Error::InvalidAmount);
    }
    if bps > BASIS_POINTS_DIVISOR {
        return Err(Error::InvalidAmount);
    }
    amount
        .checked_mul(bps as i128)
        .and_then(|v| v.checked_div(BASIS_POINTS_DIVISOR as i128))
        .ok_or(Error::Overflow)
}

/// Split `total` into foundation, developer and franchisee shares.
///
/// Foundation and developer are floored; the franchisee receives whatever is
/// left, so no unit is created or lost. `prize_pool_bps` must fit inside the
/// franchisee's portion.
pub fn split_revenue(total: i128, prize_pool_bps: u32) -> Result<RevenueSplit, Error> {
    if prize_pool_bps > MAX_PRIZE_POOL_BPS {
        return Err(Error::InvalidSplit);
    }

    let foundation_share = bps_share(total, FOUNDATION_BPS)?;
    let developer_share = bps_share(total, DEVELOPER_BPS)?;
    let franchisee_share = total
        .checked_sub(foundation_share)
        .and_then(|v| v.checked_sub(developer_share))
        .ok_or(Error::Overflow)?;

    // Floors can only shrink the fixed shares, so the contribution always
    // fits inside what the franchisee is left with.
    let prize_contribution = bps_share(total, prize_pool_bps)?;

    Ok(RevenueSplit {
        total_revenue: total,
        foundation_share,
        developer_share,
        franchisee_share,
        prize_contribution,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    fn conserved(split: &RevenueSplit) -> bool {
        split.foundation_share + split.developer_share + split.franchisee_share
            == split.total_revenue
    }

    #[test]
    fn test_standard_split() {
        let split = split_revenue(100_000, DEFAULT_PRIZE_POOL_BPS).unwrap();
        assert_eq!(split.foundation_share, 5_000);
        assert_eq!(split.developer_share, 4_000);
        assert_eq!(split.franchisee_share, 91_000);
        assert_eq!(split.prize_contribution, 60_000);
        assert_eq!(split.franchisee_payout(), 31_000);
        assert!(conserved(&split));
    }

    #[test]
    fn test_remainder_goes_to_franchisee() {
        // 17 units: 5% and 4% both floor to zero.
        let split = split_revenue(17, DEFAULT_PRIZE_POOL_BPS).unwrap();
        assert_eq!(split.foundation_share, 0);
        assert_eq!(split.developer_share, 0);
        assert_eq!(split.franchisee_share, 17);
        assert!(conserved(&split));
    }

    #[test]
    fn test_conservation_over_awkward_totals() {
        for total in [1i128, 19, 99, 101, 333, 10_001, 123_457, 9_999_999] {
            let split = split_revenue(total, 6_123).unwrap();
            assert!(conserved(&split), "total {} not conserved", total);
            assert!(split.prize_contribution <= split.franchisee_share);
        }
    }

    #[test]
    fn test_zero_total() {
        let split = split_revenue(0, DEFAULT_PRIZE_POOL_BPS).unwrap();
        assert_eq!(split.franchisee_share, 0);
        assert_eq!(split.prize_contribution, 0);
    }

    #[test]
    fn test_prize_pool_bps_bound() {
        assert!(split_revenue(1_000, MAX_PRIZE_POOL_BPS).is_ok());
        assert_eq!(
            split_revenue(1_000, MAX_PRIZE_POOL_BPS + 1),
            Err(Error::InvalidSplit)
        );
    }

    #[test]
    fn test_max_prize_pool_leaves_no_payout() {
        let split = split_revenue(10_000, MAX_PRIZE_POOL_BPS).unwrap();
        assert_eq!(split.franchisee_payout(), 0);
    }

    #[test]
    fn test_negative_total_rejected() {
        assert_eq!(split_revenue(-1, 0), Err(Error::InvalidAmount));
        assert_eq!(bps_share(100, BASIS_POINTS_DIVISOR + 1), Err(Error::InvalidAmount));
    }
}

//! Bet validation. Pure; never touches storage.
//!
//! Checks run in a fixed order and the first failure wins, so every replica
//! reports the same reason for the same rejected bet:
//!
//! 1. target cycle is the open cycle and betting has not closed
//! 2. stake equals `BET_COST` exactly
//! 3. five distinct numbers in `[1, 50]`
//! 4. the wallet has capacity left
//! 5. the wallet has not already bet this combination in this cycle

use soroban_sdk::Vec;

use crate::types::{CycleStatus, DrawCycle};
use crate::{Error, BET_COST, MAX_BETS_PER_WALLET, MAX_NUMBER, MIN_NUMBER, NUMBERS_PER_BET};

pub type Numbers = [u32; NUMBERS_PER_BET as usize];

/// Check count, range and uniqueness, then sort ascending.
pub fn normalize(numbers: &Vec<u32>) -> Result<Numbers, Error> {
    if numbers.len() != NUMBERS_PER_BET {
        return Err(Error::WrongNumberCount);
    }

    let mut sorted: Numbers = [0; NUMBERS_PER_BET as usize];
    for (i, n) in numbers.iter().enumerate() {
        if !(MIN_NUMBER..=MAX_NUMBER).contains(&n) {
            return Err(Error::NumberOutOfRange);
        }
        sorted[i] = n;
    }
    sorted.sort_unstable();

    if sorted.windows(2).any(|pair| pair[0] == pair[1]) {
        return Err(Error::DuplicateNumbers);
    }
    Ok(sorted)
}

/// Pack a sorted set into 30 bits, six per number. Equal sets pack equally
/// regardless of the order they were submitted in.
pub fn pack(sorted: &Numbers) -> u32 {
    sorted.iter().fold(0u32, |acc, n| (acc << 6) | n)
}

/// Validate one bet.
///
/// `taken` holds the wallet's packed combinations accepted this cycle and
/// `batch_combos` those of earlier members of the same batch, so a batch
/// counts against the limit as it goes and cannot repeat itself.
pub fn validate_bet(
    cycle: &DrawCycle,
    now_tick: u32,
    target_cycle: u64,
    numbers: &Vec<u32>,
    amount: i128,
    taken: &Vec<u32>,
    batch_combos: &[u32],
) -> Result<Numbers, Error> {
    if target_cycle != cycle.cycle_id {
        return Err(Error::WrongCycle);
    }
    if cycle.status != CycleStatus::Open || now_tick >= cycle.scheduled_tick {
        return Err(Error::BettingClosed);
    }

    if amount != BET_COST {
        return Err(Error::WrongStake);
    }

    let sorted = normalize(numbers)?;

    let counted = taken.len() + batch_combos.len() as u32;
    if counted >= MAX_BETS_PER_WALLET {
        return Err(Error::WalletLimitReached);
    }

    let packed = pack(&sorted);
    if batch_combos.contains(&packed) || taken.contains(packed) {
        return Err(Error::DuplicateCombination);
    }

    Ok(sorted)
}

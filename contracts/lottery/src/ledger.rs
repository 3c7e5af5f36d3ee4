//! Bet ledger for the open cycle.
//!
//! Bets are appended in insertion order and packed `BETS_PER_PAGE` to a
//! `BetPage(cycle_id, page)` entry. The ledger is bounded by
//! `LEDGER_CAPACITY`; the cycle record holds the count and the running
//! stake total. Pages are keyed by cycle, so a new cycle starts with an
//! empty ledger and old pages simply age out.

use soroban_sdk::{xdr::ToXdr, Address, BytesN, Env, Vec};

use crate::storage::{set_persistent, DataKey};
use crate::types::{Bet, DrawCycle};
use crate::validation::Numbers;
use crate::{Error, BETS_PER_PAGE, LEDGER_CAPACITY};

/// Fails with `LedgerFull` unless `n` more bets fit.
pub fn ensure_capacity(cycle: &DrawCycle, n: u32) -> Result<(), Error> {
    let wanted = cycle.bet_count.checked_add(n).ok_or(Error::Overflow)?;
    if wanted > LEDGER_CAPACITY {
        return Err(Error::LedgerFull);
    }
    Ok(())
}

/// Transaction hash over wallet, cycle, placement time, numbers and an
/// entropy tick (ledger sequence and ledger position). Identical numbers
/// placed at different moments or positions never collide.
pub fn tx_hash(
    env: &Env,
    wallet: &Address,
    cycle_id: u64,
    placed_at: u64,
    numbers: &Numbers,
    position: u32,
) -> BytesN<32> {
    let mut preimage = wallet.clone().to_xdr(env);
    preimage.extend_from_array(&cycle_id.to_be_bytes());
    preimage.extend_from_array(&placed_at.to_be_bytes());
    for n in numbers.iter() {
        preimage.push_back(*n as u8);
    }
    preimage.extend_from_array(&env.ledger().sequence().to_be_bytes());
    preimage.extend_from_array(&position.to_be_bytes());
    env.crypto().sha256(&preimage).into()
}

pub fn page(env: &Env, cycle_id: u64, index: u32) -> Vec<Bet> {
    env.storage()
        .persistent()
        .get(&DataKey::BetPage(cycle_id, index))
        .unwrap_or(Vec::new(env))
}

/// Append a validated bet. Returns its position and hash.
pub fn accept(
    env: &Env,
    cycle: &mut DrawCycle,
    wallet: &Address,
    numbers: &Numbers,
    stake: i128,
) -> Result<(u32, BytesN<32>), Error> {
    ensure_capacity(cycle, 1)?;

    let position = cycle.bet_count;
    let placed_at = env.ledger().timestamp();
    let hash = tx_hash(env, wallet, cycle.cycle_id, placed_at, numbers, position);

    let bet = Bet {
        wallet: wallet.clone(),
        numbers: Vec::from_array(env, *numbers),
        stake,
        cycle_id: cycle.cycle_id,
        placed_at,
        tx_hash: hash.clone(),
    };

    let index = position / BETS_PER_PAGE;
    let mut bets = page(env, cycle.cycle_id, index);
    bets.push_back(bet);
    set_persistent(env, &DataKey::BetPage(cycle.cycle_id, index), &bets);

    cycle.bet_count = position + 1;
    cycle.total_stake = cycle.total_stake.checked_add(stake).ok_or(Error::Overflow)?;

    Ok((position, hash))
}

pub fn get(env: &Env, cycle_id: u64, position: u32) -> Option<Bet> {
    page(env, cycle_id, position / BETS_PER_PAGE).get(position % BETS_PER_PAGE)
}

/// Bets at the given positions, in the order given.
pub fn bets_at(env: &Env, cycle_id: u64, positions: &Vec<u32>) -> Vec<Bet> {
    let mut out = Vec::new(env);
    for position in positions.iter() {
        if let Some(bet) = get(env, cycle_id, position) {
            out.push_back(bet);
        }
    }
    out
}

pub fn total_stake_for_cycle(cycle: &DrawCycle) -> i128 {
    cycle.total_stake
}

//! Draw executor.
//!
//! ```text
//! Open --execute (tick passed, bets > 0)--> Locked --seed--> Settling --paid--> Archived
//!   \--execute (tick passed, no bets)------------------------------------------^
//!                                             Locked --abort--> Aborting --refunded--> next cycle
//! ```
//!
//! Settlement order: revenue shares, minimum-jackpot top-up, bet matching,
//! winner payouts, history commit, next cycle. Matching and payouts are done
//! in bounded chunks; progress lives in `DrawCycle::settlement` and every
//! `settle_draw` call picks up where the last one stopped. Only a revenue
//! transfer can halt settlement. The seed and winning numbers stay cached on
//! the cycle so a retry replays the same outcome.

use soroban_sdk::{log, token::TokenClient, Address, BytesN, Env, Vec};

use crate::events::{
    CycleAborted, CycleOpened, DrawArchived, DrawLocked, JackpotTopUp, PayoutFailed,
    RandomnessReceived, RefundClaimed, RefundDeferred, WinnerPaid,
};
use crate::storage::{self, set_persistent, DataKey};
use crate::types::{CycleStatus, DrawCycle, DrawResult, FranchiseeConfig, Settlement, WinnerRecord};
use crate::validation::Numbers;
use crate::{
    history, ledger, oracle, revenue, wallet, Error, BETS_PER_PAGE, MAX_RECORDED_WINNERS,
    NUMBERS_PER_BET, PAYOUTS_PER_CALL, REFUNDS_PER_CALL, SETTLE_PAGES_PER_CALL,
};

/// Where a settlement call left the cycle.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Progress {
    /// A revenue transfer failed; nothing past revenue was attempted.
    Halted,
    /// This call's work cap was reached; call again.
    Pending,
    Archived,
}

/// Open a fresh cycle after `previous_id`.
pub fn open_cycle(env: &Env, previous_id: u64, rollover_in: i128) -> Result<DrawCycle, Error> {
    let interval = storage::get_draw_interval(env)?;
    let now = env.ledger().sequence();
    let cycle = DrawCycle {
        cycle_id: previous_id.checked_add(1).ok_or(Error::Overflow)?,
        scheduled_tick: now.checked_add(interval).ok_or(Error::Overflow)?,
        status: CycleStatus::Open,
        bet_count: 0,
        total_stake: 0,
        rollover_in,
        seed: None,
        winning_numbers: Vec::new(env),
        split: None,
        issued_nonces: Vec::new(env),
        opened_at: now,
        settlement: Settlement::new(env),
    };
    storage::set_cycle(env, &cycle);

    CycleOpened {
        cycle_id: cycle.cycle_id,
        scheduled_tick: cycle.scheduled_tick,
        rollover_in,
    }
    .publish(env);

    Ok(cycle)
}

/// Trigger the draw. A cycle that is already locked, settling or aborting
/// is left alone and its status returned.
pub fn execute(env: &Env) -> Result<CycleStatus, Error> {
    let mut cycle = storage::get_cycle(env)?;
    if cycle.is_locked() {
        return Ok(cycle.status);
    }
    let now = env.ledger().sequence();
    if now < cycle.scheduled_tick {
        // A trigger racing the one that archived the previous cycle in this
        // same ledger.
        if cycle.cycle_id > 1 && cycle.opened_at == now {
            return Ok(cycle.status);
        }
        return Err(Error::DrawNotDue);
    }

    if cycle.bet_count == 0 {
        archive_empty(env, &cycle)?;
        return Ok(CycleStatus::Archived);
    }

    cycle.status = CycleStatus::Locked;
    DrawLocked {
        cycle_id: cycle.cycle_id,
        total_bets: cycle.bet_count,
        total_stake: cycle.total_stake,
    }
    .publish(env);

    oracle::request(env, &mut cycle)?;
    storage::set_cycle(env, &cycle);
    Ok(CycleStatus::Locked)
}

/// No bets: archive without asking the oracle. The pool rolls over as is.
fn archive_empty(env: &Env, cycle: &DrawCycle) -> Result<(), Error> {
    let result = DrawResult {
        cycle_id: cycle.cycle_id,
        winning_numbers: Vec::new(env),
        prize_pool: cycle.rollover_in,
        total_bets: 0,
        total_stake: 0,
        winners: Vec::new(env),
        winner_count: 0,
        prize_per_winner: 0,
        paid_winners: 0,
        seed: None,
        has_winner: false,
        reserve_topup: 0,
        rollover_out: cycle.rollover_in,
        settled_at: env.ledger().sequence(),
    };
    commit(env, cycle, &result)
}

/// Accept the oracle's answer, cache it on the cycle and run the first
/// settlement chunk. The numbers are returned even if settlement halts on a
/// revenue transfer or needs further `settle_draw` calls.
pub fn receive_randomness(env: &Env, nonce: u64, seed: BytesN<32>) -> Result<Vec<u32>, Error> {
    let mut cycle = storage::get_cycle(env)?;
    let numbers = oracle::accept(env, &cycle, nonce, &seed)?;
    let winning = Vec::from_array(env, numbers);

    let config = storage::get_config(env)?;
    cycle.split = Some(revenue::compute(
        ledger::total_stake_for_cycle(&cycle),
        &config,
    )?);
    cycle.seed = Some(seed.clone());
    cycle.winning_numbers = winning.clone();
    cycle.status = CycleStatus::Settling;
    storage::set_cycle(env, &cycle);

    RandomnessReceived {
        cycle_id: cycle.cycle_id,
        nonce,
        seed,
        winning_numbers: winning.clone(),
    }
    .publish(env);

    settle(env, cycle)?;
    Ok(winning)
}

/// How many of the bet's numbers appear in the winning set.
pub fn match_count(bet_numbers: &Vec<u32>, winning: &Numbers) -> u32 {
    let mut drawn: u64 = 0;
    for n in winning.iter() {
        drawn |= 1u64 << n;
    }
    bet_numbers
        .iter()
        .filter(|n| *n < 64 && drawn & (1u64 << *n) != 0)
        .count() as u32
}

/// Jackpot rule: all five numbers match.
pub fn is_jackpot(bet_numbers: &Vec<u32>, winning: &Numbers) -> bool {
    match_count(bet_numbers, winning) == NUMBERS_PER_BET
}

fn winning_array(cycle: &DrawCycle) -> Result<Numbers, Error> {
    if cycle.winning_numbers.len() != NUMBERS_PER_BET {
        return Err(Error::InvalidCycleState);
    }
    let mut numbers: Numbers = Default::default();
    for (i, n) in cycle.winning_numbers.iter().enumerate() {
        numbers[i] = n;
    }
    Ok(numbers)
}

/// Run (or resume) settlement of a `Settling` cycle.
pub fn settle(env: &Env, mut cycle: DrawCycle) -> Result<Progress, Error> {
    if cycle.status != CycleStatus::Settling {
        return Err(Error::InvalidCycleState);
    }
    let token = storage::get_token(env)?;
    let config = storage::get_config(env)?;

    if !revenue::distribute(env, &token, &config, &mut cycle)? {
        storage::set_cycle(env, &cycle);
        return Ok(Progress::Halted);
    }

    let client = TokenClient::new(env, &token);
    if !cycle.settlement.pool_fixed {
        fix_pool(env, &client, &config, &mut cycle)?;
    }

    let winning = winning_array(&cycle)?;
    if !match_bets(env, &mut cycle, &winning) || !pay_winners(env, &client, &mut cycle)? {
        storage::set_cycle(env, &cycle);
        return Ok(Progress::Pending);
    }

    let s = &cycle.settlement;
    let winner_count = s.winners.len();
    let result = DrawResult {
        cycle_id: cycle.cycle_id,
        winning_numbers: cycle.winning_numbers.clone(),
        prize_pool: s.prize_pool,
        total_bets: cycle.bet_count,
        total_stake: cycle.total_stake,
        winners: s.records.clone(),
        winner_count,
        prize_per_winner: prize_share(s),
        paid_winners: s.paid_winners,
        seed: cycle.seed.clone(),
        has_winner: winner_count > 0,
        reserve_topup: s.reserve_topup,
        rollover_out: s.prize_pool.checked_sub(s.paid_total).ok_or(Error::Overflow)?,
        settled_at: env.ledger().sequence(),
    };
    commit(env, &cycle, &result)?;
    Ok(Progress::Archived)
}

/// Pool = prize contribution + rollover, topped up to the minimum jackpot
/// from the reserve. A failed top-up shrinks the pool, it does not fail the
/// draw.
fn fix_pool(
    env: &Env,
    client: &TokenClient,
    config: &FranchiseeConfig,
    cycle: &mut DrawCycle,
) -> Result<(), Error> {
    let split = cycle.split.clone().ok_or(Error::InvalidCycleState)?;
    let contract = env.current_contract_address();
    let mut pool = split
        .prize_contribution
        .checked_add(cycle.rollover_in)
        .ok_or(Error::Overflow)?;

    let mut reserve_topup = 0i128;
    if pool < config.minimum_jackpot {
        let shortfall = config.minimum_jackpot - pool;
        let pulled = matches!(
            client.try_transfer_from(&contract, &config.reserve, &contract, &shortfall),
            Ok(Ok(()))
        );
        if pulled {
            reserve_topup = shortfall;
            pool = config.minimum_jackpot;
            JackpotTopUp {
                cycle_id: cycle.cycle_id,
                reserve: config.reserve.clone(),
                amount: shortfall,
            }
            .publish(env);
        } else {
            log!(env, "minimum jackpot top-up failed", cycle.cycle_id, shortfall);
        }
    }

    cycle.settlement.prize_pool = pool;
    cycle.settlement.reserve_topup = reserve_topup;
    cycle.settlement.pool_fixed = true;
    Ok(())
}

/// Match up to `SETTLE_PAGES_PER_CALL` ledger pages from the cursor.
/// Returns `true` once every bet has been matched.
fn match_bets(env: &Env, cycle: &mut DrawCycle, winning: &Numbers) -> bool {
    let mut pages = 0u32;
    while cycle.settlement.cursor < cycle.bet_count {
        if pages == SETTLE_PAGES_PER_CALL {
            return false;
        }
        let index = cycle.settlement.cursor / BETS_PER_PAGE;
        let first = index * BETS_PER_PAGE;
        for (offset, bet) in ledger::page(env, cycle.cycle_id, index).iter().enumerate() {
            let position = first + offset as u32;
            if position >= cycle.settlement.cursor && is_jackpot(&bet.numbers, winning) {
                cycle.settlement.winners.push_back(position);
            }
        }
        cycle.settlement.cursor = (first + BETS_PER_PAGE).min(cycle.bet_count);
        pages += 1;
    }
    true
}

fn prize_share(s: &Settlement) -> i128 {
    if s.winners.is_empty() {
        0
    } else {
        s.prize_pool / s.winners.len() as i128
    }
}

/// Pay up to `PAYOUTS_PER_CALL` winners an even share of the pool. A failed
/// transfer leaves that share in the pool to roll over. Returns `true` once
/// every winner has been attempted.
fn pay_winners(env: &Env, client: &TokenClient, cycle: &mut DrawCycle) -> Result<bool, Error> {
    let cycle_id = cycle.cycle_id;
    let contract = env.current_contract_address();
    let share = prize_share(&cycle.settlement);
    let s = &mut cycle.settlement;

    let mut attempted = 0u32;
    while s.paid < s.winners.len() {
        if attempted == PAYOUTS_PER_CALL {
            return Ok(false);
        }
        let position = s.winners.get(s.paid).ok_or(Error::InvalidCycleState)?;
        let bet = ledger::get(env, cycle_id, position).ok_or(Error::InvalidCycleState)?;

        let mut amount = 0i128;
        if share > 0 {
            if matches!(client.try_transfer(&contract, &bet.wallet, &share), Ok(Ok(()))) {
                amount = share;
                s.paid_winners += 1;
                s.paid_total = s.paid_total.checked_add(share).ok_or(Error::Overflow)?;
                wallet::add_winnings(env, &bet.wallet, share)?;
                WinnerPaid {
                    cycle_id,
                    wallet: bet.wallet.clone(),
                    amount: share,
                }
                .publish(env);
            } else {
                PayoutFailed {
                    cycle_id,
                    wallet: bet.wallet.clone(),
                    amount: share,
                }
                .publish(env);
            }
        }

        if s.records.len() < MAX_RECORDED_WINNERS {
            s.records.push_back(WinnerRecord {
                cycle_id,
                wallet: bet.wallet,
                amount,
            });
        }
        s.paid += 1;
        attempted += 1;
    }
    Ok(true)
}

/// Archive `result`, drop the cycle's oracle state and open the next cycle,
/// which releases the execution lock.
fn commit(env: &Env, cycle: &DrawCycle, result: &DrawResult) -> Result<(), Error> {
    history::push(env, result);

    DrawArchived {
        cycle_id: cycle.cycle_id,
        has_winner: result.has_winner,
        prize_pool: result.prize_pool,
        rollover_out: result.rollover_out,
    }
    .publish(env);

    oracle::clear(env, cycle);
    open_cycle(env, cycle.cycle_id, result.rollover_out)?;
    Ok(())
}

/// Give up on a locked cycle, or continue an abort already under way.
///
/// Stakes go back in chunks of at most `REFUNDS_PER_CALL` transfers; a run
/// of consecutive bets from one wallet is returned in a single transfer. A
/// refund that cannot be sent is set aside for `claim_refund`. Once the last
/// bet is handled the rollover carries forward untouched and the next cycle
/// opens. No draw result is recorded. Returns the stake handled by this
/// call.
pub fn abort(env: &Env, mut cycle: DrawCycle) -> Result<i128, Error> {
    match cycle.status {
        CycleStatus::Locked => {
            oracle::clear(env, &cycle);
            cycle.status = CycleStatus::Aborting;
        }
        CycleStatus::Aborting => {}
        _ => return Err(Error::InvalidCycleState),
    }

    let token = storage::get_token(env)?;
    let client = TokenClient::new(env, &token);
    let contract = env.current_contract_address();

    let mut handled = 0i128;
    let mut transfers = 0u32;
    while cycle.settlement.cursor < cycle.bet_count && transfers < REFUNDS_PER_CALL {
        let start = cycle.settlement.cursor;
        let owner = ledger::get(env, cycle.cycle_id, start)
            .ok_or(Error::InvalidCycleState)?
            .wallet;

        let mut amount = 0i128;
        let mut next = start;
        while next < cycle.bet_count {
            match ledger::get(env, cycle.cycle_id, next) {
                Some(bet) if bet.wallet == owner => {
                    amount = amount.checked_add(bet.stake).ok_or(Error::Overflow)?;
                    next += 1;
                }
                _ => break,
            }
        }

        refund(env, &client, &contract, cycle.cycle_id, &owner, amount)?;
        wallet::sub_wagered(env, &owner, amount)?;
        handled = handled.checked_add(amount).ok_or(Error::Overflow)?;
        cycle.settlement.cursor = next;
        transfers += 1;
    }

    cycle.settlement.refunded = cycle
        .settlement
        .refunded
        .checked_add(handled)
        .ok_or(Error::Overflow)?;

    if cycle.settlement.cursor < cycle.bet_count {
        storage::set_cycle(env, &cycle);
        return Ok(handled);
    }

    CycleAborted {
        cycle_id: cycle.cycle_id,
        refunded: cycle.settlement.refunded,
    }
    .publish(env);

    open_cycle(env, cycle.cycle_id, cycle.rollover_in)?;
    Ok(handled)
}

fn refund(
    env: &Env,
    client: &TokenClient,
    contract: &Address,
    cycle_id: u64,
    owner: &Address,
    amount: i128,
) -> Result<(), Error> {
    if matches!(client.try_transfer(contract, owner, &amount), Ok(Ok(()))) {
        return Ok(());
    }

    let key = DataKey::Refund(owner.clone());
    let owed: i128 = env.storage().persistent().get(&key).unwrap_or(0);
    set_persistent(env, &key, &owed.checked_add(amount).ok_or(Error::Overflow)?);

    RefundDeferred {
        cycle_id,
        wallet: owner.clone(),
        amount,
    }
    .publish(env);
    Ok(())
}

pub fn claimable_refund(env: &Env, owner: &Address) -> i128 {
    env.storage()
        .persistent()
        .get(&DataKey::Refund(owner.clone()))
        .unwrap_or(0)
}

/// Pay out a refund an abort could not send.
pub fn claim_refund(env: &Env, owner: &Address) -> Result<i128, Error> {
    let amount = claimable_refund(env, owner);
    if amount <= 0 {
        return Err(Error::NothingToClaim);
    }
    env.storage()
        .persistent()
        .remove(&DataKey::Refund(owner.clone()));

    let token = storage::get_token(env)?;
    TokenClient::new(env, &token).transfer(&env.current_contract_address(), owner, &amount);

    RefundClaimed {
        wallet: owner.clone(),
        amount,
    }
    .publish(env);
    Ok(amount)
}

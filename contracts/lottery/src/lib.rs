//! Charity Lottery Contract
//!
//! A wallet-limited 5-of-50 lottery with oracle-seeded draws and automatic
//! revenue splits. Each draw cycle moves through
//! `Open -> Locked -> Settling -> Archived`:
//!
//! 1. Wallets call `place_bet` / `place_batch_bets` while the cycle is open.
//!    Each wallet may hold at most five bets per cycle, never the same
//!    combination twice, and every bet costs exactly `BET_COST`.
//! 2. Once the ledger reaches `scheduled_tick`, anyone may call
//!    `execute_draw`. It locks the cycle and requests randomness.
//! 3. The oracle calls `on_randomness_received` with the request's nonce and
//!    a seed. The winning numbers are derived from the seed, revenue is split
//!    (5% foundation, 4% developer, 91% franchisee, part of which stays as
//!    prize pool), the pool is topped up to the minimum jackpot from the
//!    reserve, jackpot winners share the pool evenly, and the result is
//!    archived in a 100-entry ring before the next cycle opens.
//!
//! Settlement matches and pays in bounded chunks. If the oracle callback
//! leaves the cycle `Settling`, call `settle_draw` until it reports
//! `Archived`. A failed revenue transfer halts settlement with the seed
//! cached; `settle_draw` resumes it too. A silent oracle can be worked around
//! with `cancel_pending_request` + `request_randomness`, or `abort_cycle`,
//! which refunds every stake over one or more calls. Refunds the token
//! refuses wait for the bettor's `claim_refund`.
#![no_std]
#![allow(unexpected_cfgs)]

use soroban_sdk::{contract, contracterror, contractimpl, log, token::TokenClient, Address, BytesN, Env, Vec};

mod draw;
mod events;
mod history;
mod ledger;
mod oracle;
mod revenue;
mod storage;
mod types;
mod validation;
mod wallet;

pub use oracle::derive_draw_numbers;
pub use shared::RevenueSplit;
pub use types::{
    BatchReceipt, Bet, BetReceipt, CycleInfo, CycleStatus, DrawCycle, DrawResult,
    FranchiseeConfig, OracleRequest, WalletStatus, WinnerRecord,
};

use events::{BatchPlaced, BetPlaced, ConfigUpdated};
use storage::DataKey;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Persistent storage TTL in ledgers (~30 days at 5 s/ledger).
pub const PERSISTENT_BUMP_LEDGERS: u32 = 518_400;

/// Stake per bet, in token base units.
pub const BET_COST: i128 = 10_000;
pub const NUMBERS_PER_BET: u32 = 5;
pub const MIN_NUMBER: u32 = 1;
pub const MAX_NUMBER: u32 = 50;
pub const MAX_BETS_PER_WALLET: u32 = 5;
pub const MAX_BATCH_SIZE: u32 = 5;
pub const HISTORY_CAPACITY: u32 = 100;
/// Slots in the per-cycle wallet table.
pub const WALLET_TABLE_SIZE: u32 = 1_024;
pub const LEDGER_CAPACITY: u32 = WALLET_TABLE_SIZE * MAX_BETS_PER_WALLET;
/// Hash rounds allowed when deriving five distinct numbers from a seed.
pub const MAX_DERIVATION_ROUNDS: u32 = 512;
/// Slots a wallet lookup may visit before the table counts as full.
pub const WALLET_SCAN_LIMIT: u32 = 32;
pub const BETS_PER_PAGE: u32 = 25;
pub const HISTORY_PAGE_SIZE: u32 = 10;

// Per-invocation work caps. One settlement or abort call stays well under
// the ledger footprint limits; callers repeat until the cycle moves on.
pub const SETTLE_PAGES_PER_CALL: u32 = 8;
pub const PAYOUTS_PER_CALL: u32 = 10;
pub const REFUNDS_PER_CALL: u32 = 10;
/// Winners kept on an archived `DrawResult`; the rest only appear in events.
pub const MAX_RECORDED_WINNERS: u32 = 10;

// ---------------------------------------------------------------------------
// Error Types
// ---------------------------------------------------------------------------

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    AlreadyInitialized      = 1,
    NotInitialized          = 2,
    NotAuthorized           = 3,
    InvalidConfig           = 4,
    Overflow                = 5,
    // --- validation ---
    /// Bet targets a cycle other than the open one.
    WrongCycle              = 10,
    /// The cycle is locked or its scheduled tick has passed.
    BettingClosed           = 11,
    WrongStake              = 12,
    WrongNumberCount        = 13,
    NumberOutOfRange        = 14,
    DuplicateNumbers        = 15,
    WalletLimitReached      = 16,
    DuplicateCombination    = 17,
    EmptyBatch              = 18,
    BatchTooLarge           = 19,
    // --- capacity ---
    LedgerFull              = 30,
    WalletTableFull         = 31,
    // --- draw / oracle ---
    DrawNotDue              = 40,
    InvalidCycleState       = 41,
    RequestPending          = 42,
    RequestAlreadyProcessed = 43,
    /// Response for a nonce that was already answered or cancelled.
    StaleNonce              = 44,
    /// Response for a nonce nothing is waiting on.
    UnmatchedNonce          = 45,
    RandomnessExhausted     = 46,
    NoPendingRequest        = 47,
    // --- settlement ---
    RevenueTransferFailed   = 50,
    NothingToClaim          = 51,
}

impl From<shared::Error> for Error {
    fn from(err: shared::Error) -> Self {
        match err {
            shared::Error::InvalidSplit => Error::InvalidConfig,
            shared::Error::InvalidAmount | shared::Error::Overflow => Error::Overflow,
        }
    }
}

fn validate_config(config: &FranchiseeConfig) -> Result<(), Error> {
    if config.minimum_jackpot < 0 || config.prize_pool_bps > shared::MAX_PRIZE_POOL_BPS {
        return Err(Error::InvalidConfig);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

#[contract]
pub struct CharityLottery;

#[contractimpl]
impl CharityLottery {
    // -----------------------------------------------------------------------
    // init / config
    // -----------------------------------------------------------------------

    /// Initialize the lottery and open cycle 1. May only be called once.
    ///
    /// `token` is the SEP-41 asset bets are paid in. `oracle` is the only
    /// address allowed to deliver randomness. Each cycle accepts bets for
    /// `draw_interval` ledgers.
    pub fn init(
        env: Env,
        admin: Address,
        token: Address,
        oracle: Address,
        draw_interval: u32,
        config: FranchiseeConfig,
    ) -> Result<(), Error> {
        if env.storage().instance().has(&DataKey::Admin) {
            return Err(Error::AlreadyInitialized);
        }

        admin.require_auth();

        if draw_interval == 0 {
            return Err(Error::InvalidConfig);
        }
        validate_config(&config)?;

        env.storage().instance().set(&DataKey::Admin, &admin);
        env.storage().instance().set(&DataKey::Token, &token);
        env.storage().instance().set(&DataKey::Oracle, &oracle);
        env.storage().instance().set(&DataKey::DrawInterval, &draw_interval);
        storage::set_config(&env, &config);
        storage::bump_instance(&env);

        draw::open_cycle(&env, 0, 0)?;
        Ok(())
    }

    /// Replace the franchisee configuration. Admin only, and only while the
    /// current cycle is open so settlement never sees a config change.
    pub fn set_franchisee_config(
        env: Env,
        admin: Address,
        config: FranchiseeConfig,
    ) -> Result<(), Error> {
        storage::require_initialized(&env)?;
        storage::require_admin(&env, &admin)?;
        validate_config(&config)?;

        if storage::get_cycle(&env)?.is_locked() {
            return Err(Error::InvalidCycleState);
        }

        storage::set_config(&env, &config);
        storage::bump_instance(&env);

        ConfigUpdated {
            admin,
            minimum_jackpot: config.minimum_jackpot,
            prize_pool_bps: config.prize_pool_bps,
        }
        .publish(&env);

        Ok(())
    }

    pub fn get_franchisee_config(env: Env) -> Result<FranchiseeConfig, Error> {
        storage::get_config(&env)
    }

    /// How `total` would be split under the current configuration.
    pub fn preview_revenue_split(env: Env, total: i128) -> Result<RevenueSplit, Error> {
        let config = storage::get_config(&env)?;
        revenue::compute(total, &config)
    }

    // -----------------------------------------------------------------------
    // betting
    // -----------------------------------------------------------------------

    /// Place one bet of exactly `BET_COST` on five numbers for `cycle_id`.
    pub fn place_bet(
        env: Env,
        wallet: Address,
        cycle_id: u64,
        numbers: Vec<u32>,
        amount: i128,
    ) -> Result<BetReceipt, Error> {
        storage::require_initialized(&env)?;
        wallet.require_auth();

        let mut cycle = storage::get_cycle(&env)?;
        let found = wallet::lookup(&env, &wallet, cycle.cycle_id);
        let sorted = validation::validate_bet(
            &cycle,
            env.ledger().sequence(),
            cycle_id,
            &numbers,
            amount,
            &found.combos(&env),
            &[],
        )?;

        ledger::ensure_capacity(&cycle, 1)?;
        if matches!(found, wallet::Lookup::Full) {
            return Err(Error::WalletTableFull);
        }

        let token = storage::get_token(&env)?;
        TokenClient::new(&env, &token).transfer(&wallet, env.current_contract_address(), &amount);

        let (position, tx_hash) = ledger::accept(&env, &mut cycle, &wallet, &sorted, amount)?;
        let bet_count = wallet::record_bets(
            &env,
            found,
            &wallet,
            cycle.cycle_id,
            &[validation::pack(&sorted)],
            &[position],
        )?;
        wallet::add_wagered(&env, &wallet, amount, env.ledger().timestamp())?;
        storage::set_cycle(&env, &cycle);
        storage::bump_instance(&env);

        BetPlaced {
            cycle_id: cycle.cycle_id,
            wallet,
            numbers: Vec::from_array(&env, sorted),
            position,
            tx_hash: tx_hash.clone(),
        }
        .publish(&env);

        Ok(BetReceipt {
            success: true,
            position,
            bet_count,
            total_cost: amount,
            tx_hash,
        })
    }

    /// Place up to `MAX_BATCH_SIZE` bets at once, each staking `amount`.
    ///
    /// All or nothing: every member must pass validation and the wallet must
    /// have room for the whole batch, otherwise no bet is accepted and no
    /// stake moves.
    pub fn place_batch_bets(
        env: Env,
        wallet: Address,
        cycle_id: u64,
        bets: Vec<Vec<u32>>,
        amount: i128,
    ) -> Result<BatchReceipt, Error> {
        storage::require_initialized(&env)?;
        wallet.require_auth();

        let n = bets.len();
        if n == 0 {
            return Err(Error::EmptyBatch);
        }
        if n > MAX_BATCH_SIZE {
            return Err(Error::BatchTooLarge);
        }

        let mut cycle = storage::get_cycle(&env)?;
        let found = wallet::lookup(&env, &wallet, cycle.cycle_id);
        let taken = found.combos(&env);
        let now = env.ledger().sequence();

        let mut sorted_sets = [[0u32; NUMBERS_PER_BET as usize]; MAX_BATCH_SIZE as usize];
        let mut packed = [0u32; MAX_BATCH_SIZE as usize];
        for (i, numbers) in bets.iter().enumerate() {
            let sorted = validation::validate_bet(
                &cycle,
                now,
                cycle_id,
                &numbers,
                amount,
                &taken,
                &packed[..i],
            )?;
            sorted_sets[i] = sorted;
            packed[i] = validation::pack(&sorted);
        }

        ledger::ensure_capacity(&cycle, n)?;
        if matches!(found, wallet::Lookup::Full) {
            return Err(Error::WalletTableFull);
        }

        let total_cost = amount.checked_mul(n as i128).ok_or(Error::Overflow)?;
        let token = storage::get_token(&env)?;
        TokenClient::new(&env, &token).transfer(&wallet, env.current_contract_address(), &total_cost);

        let mut tx_hashes = Vec::new(&env);
        let mut positions = [0u32; MAX_BATCH_SIZE as usize];
        for (i, sorted) in sorted_sets.iter().take(n as usize).enumerate() {
            let (position, tx_hash) = ledger::accept(&env, &mut cycle, &wallet, sorted, amount)?;
            positions[i] = position;
            tx_hashes.push_back(tx_hash);
        }
        let bet_count = wallet::record_bets(
            &env,
            found,
            &wallet,
            cycle.cycle_id,
            &packed[..n as usize],
            &positions[..n as usize],
        )?;
        wallet::add_wagered(&env, &wallet, total_cost, env.ledger().timestamp())?;
        storage::set_cycle(&env, &cycle);
        storage::bump_instance(&env);

        BatchPlaced {
            cycle_id: cycle.cycle_id,
            wallet,
            count: n,
            total_cost,
        }
        .publish(&env);

        Ok(BatchReceipt {
            success_count: n,
            bet_count,
            total_cost,
            tx_hashes,
        })
    }

    // -----------------------------------------------------------------------
    // queries
    // -----------------------------------------------------------------------

    pub fn get_wallet_status(env: Env, wallet: Address) -> Result<WalletStatus, Error> {
        let cycle = storage::get_cycle(&env)?;
        let bet_count = wallet::bet_count(&env, &wallet, cycle.cycle_id);
        let stats = wallet::stats(&env, &wallet);
        Ok(WalletStatus {
            bet_count,
            max_bets: MAX_BETS_PER_WALLET,
            remaining: MAX_BETS_PER_WALLET.saturating_sub(bet_count),
            lifetime_wagered: stats.lifetime_wagered,
            lifetime_winnings: stats.lifetime_winnings,
            last_bet_at: stats.last_bet_at,
        })
    }

    /// The wallet's accepted bets in the current cycle.
    pub fn get_wallet_bets(env: Env, wallet: Address) -> Result<Vec<Bet>, Error> {
        let cycle = storage::get_cycle(&env)?;
        let positions = wallet::positions(&env, &wallet, cycle.cycle_id);
        Ok(ledger::bets_at(&env, cycle.cycle_id, &positions))
    }

    pub fn get_current_cycle(env: Env) -> Result<CycleInfo, Error> {
        let cycle = storage::get_cycle(&env)?;
        let config = storage::get_config(&env)?;
        let contribution = shared::bps_share(cycle.total_stake, config.prize_pool_bps)?;
        let estimate = contribution
            .checked_add(cycle.rollover_in)
            .ok_or(Error::Overflow)?
            .max(config.minimum_jackpot);
        Ok(CycleInfo {
            cycle_id: cycle.cycle_id,
            scheduled_tick: cycle.scheduled_tick,
            status: cycle.status,
            total_bets: cycle.bet_count,
            total_stake: cycle.total_stake,
            rollover_in: cycle.rollover_in,
            prize_pool_estimate: estimate,
        })
    }

    /// Status of `cycle_id`: the live status for the current cycle,
    /// `Archived` for any earlier one.
    pub fn get_cycle_status(env: Env, cycle_id: u64) -> Result<CycleStatus, Error> {
        let cycle = storage::get_cycle(&env)?;
        if cycle_id == cycle.cycle_id {
            Ok(cycle.status)
        } else if cycle_id < cycle.cycle_id && cycle_id > 0 {
            Ok(CycleStatus::Archived)
        } else {
            Err(Error::WrongCycle)
        }
    }

    /// Up to `limit` archived draws, most recent first.
    pub fn get_draw_history(env: Env, limit: u32) -> Result<Vec<DrawResult>, Error> {
        storage::require_initialized(&env)?;
        Ok(history::recent(&env, limit))
    }

    pub fn get_recent_winners(env: Env, limit: u32) -> Result<Vec<WinnerRecord>, Error> {
        storage::require_initialized(&env)?;
        Ok(history::recent_winners(&env, limit))
    }

    pub fn get_pending_request(env: Env) -> Result<Option<OracleRequest>, Error> {
        storage::require_initialized(&env)?;
        Ok(storage::get_pending(&env))
    }

    // -----------------------------------------------------------------------
    // draw
    // -----------------------------------------------------------------------

    /// Run the draw for the current cycle. Anyone may call this once the
    /// scheduled tick has passed. It is a no-op while a draw is in flight and
    /// in the ledger that archived the previous cycle.
    pub fn execute_draw(env: Env) -> Result<CycleStatus, Error> {
        storage::require_initialized(&env)?;
        let status = draw::execute(&env)?;
        storage::bump_instance(&env);
        Ok(status)
    }

    /// Issue a randomness request for the locked cycle. Used to retry with a
    /// fresh nonce after `cancel_pending_request`.
    pub fn request_randomness(env: Env, cycle_id: u64) -> Result<OracleRequest, Error> {
        storage::require_initialized(&env)?;
        let mut cycle = storage::get_cycle(&env)?;
        if cycle_id != cycle.cycle_id {
            return Err(Error::WrongCycle);
        }
        let request = oracle::request(&env, &mut cycle)?;
        storage::set_cycle(&env, &cycle);
        Ok(request)
    }

    /// Oracle callback. Returns the winning numbers, sorted ascending.
    pub fn on_randomness_received(
        env: Env,
        oracle: Address,
        nonce: u64,
        seed: BytesN<32>,
    ) -> Result<Vec<u32>, Error> {
        storage::require_initialized(&env)?;
        storage::require_oracle(&env, &oracle)?;

        match draw::receive_randomness(&env, nonce, seed) {
            Err(err @ (Error::StaleNonce | Error::UnmatchedNonce)) => {
                log!(&env, "oracle response ignored", nonce);
                Err(err)
            }
            other => other,
        }
    }

    /// Continue settling the current cycle from the cached seed. Returns
    /// `Settling` while matching or payouts still have work left and
    /// `Archived` once the draw is recorded. Fails with
    /// `RevenueTransferFailed` if a revenue share still cannot be sent.
    pub fn settle_draw(env: Env) -> Result<CycleStatus, Error> {
        storage::require_initialized(&env)?;
        let cycle = storage::get_cycle(&env)?;
        let status = match draw::settle(&env, cycle)? {
            draw::Progress::Halted => return Err(Error::RevenueTransferFailed),
            draw::Progress::Pending => CycleStatus::Settling,
            draw::Progress::Archived => CycleStatus::Archived,
        };
        storage::bump_instance(&env);
        Ok(status)
    }

    // -----------------------------------------------------------------------
    // operator recovery
    // -----------------------------------------------------------------------

    /// Drop the outstanding oracle request. Admin only. The cycle stays
    /// locked; call `request_randomness` for a fresh nonce.
    pub fn cancel_pending_request(env: Env, admin: Address, cycle_id: u64) -> Result<u64, Error> {
        storage::require_initialized(&env)?;
        storage::require_admin(&env, &admin)?;
        let cycle = storage::get_cycle(&env)?;
        if cycle_id != cycle.cycle_id {
            return Err(Error::WrongCycle);
        }
        oracle::cancel(&env, &cycle)
    }

    /// Abort a locked cycle and refund every stake. Admin only.
    ///
    /// Refunds go out in chunks; while the cycle reports `Aborting`, call
    /// again to continue. Returns the stake handled by this call. A refund
    /// the token refuses is kept for `claim_refund`.
    pub fn abort_cycle(env: Env, admin: Address, cycle_id: u64) -> Result<i128, Error> {
        storage::require_initialized(&env)?;
        storage::require_admin(&env, &admin)?;
        let cycle = storage::get_cycle(&env)?;
        if cycle_id != cycle.cycle_id {
            return Err(Error::WrongCycle);
        }
        let refunded = draw::abort(&env, cycle)?;
        storage::bump_instance(&env);
        Ok(refunded)
    }

    /// Collect a refund an abort could not deliver.
    pub fn claim_refund(env: Env, wallet: Address) -> Result<i128, Error> {
        storage::require_initialized(&env)?;
        wallet.require_auth();
        let amount = draw::claim_refund(&env, &wallet)?;
        storage::bump_instance(&env);
        Ok(amount)
    }

    pub fn get_claimable_refund(env: Env, wallet: Address) -> Result<i128, Error> {
        storage::require_initialized(&env)?;
        Ok(draw::claimable_refund(&env, &wallet))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

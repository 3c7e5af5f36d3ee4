//! Storage keys and typed accessors.
//!
//! - `instance()`: Admin, Token, Oracle, DrawInterval, Config, Cycle,
//!   PendingRequest, NonceCounter, HistoryHead, HistoryLen. Small, fixed set
//!   sharing one ledger entry.
//! - `persistent()`: wallet table slots, lifetime wallet stats, ledger bet
//!   pages, history ring pages, stale nonce markers and claimable refunds.
//!   TTL bumped on every write.
//!
//! Bets and history results are packed into pages so a full history read
//! or a settlement chunk touches a handful of entries, well inside the
//! per-invocation footprint.

use soroban_sdk::{contracttype, Address, Env, IntoVal, Val};

use crate::types::{DrawCycle, FranchiseeConfig, OracleRequest};
use crate::{Error, PERSISTENT_BUMP_LEDGERS};

#[contracttype]
#[derive(Clone)]
pub enum DataKey {
    // --- instance() ---
    Admin,
    Token,
    Oracle,
    DrawInterval,
    Config,
    Cycle,
    PendingRequest,
    NonceCounter,
    HistoryHead,
    HistoryLen,
    // --- persistent() ---
    WalletSlot(u32),
    WalletStats(Address),
    /// `BETS_PER_PAGE` consecutive ledger bets keyed by (cycle_id, page).
    BetPage(u64, u32),
    /// `HISTORY_PAGE_SIZE` consecutive ring slots.
    HistoryPage(u32),
    /// A nonce that was answered or cancelled and must not be accepted again.
    StaleNonce(u64),
    /// Stake an abort could not return; the wallet claims it later.
    Refund(Address),
}

pub fn bump_instance(env: &Env) {
    env.storage()
        .instance()
        .extend_ttl(PERSISTENT_BUMP_LEDGERS, PERSISTENT_BUMP_LEDGERS);
}

/// Write a persistent entry and extend its TTL in one step.
pub fn set_persistent<V: IntoVal<Env, Val>>(env: &Env, key: &DataKey, value: &V) {
    env.storage().persistent().set(key, value);
    env.storage()
        .persistent()
        .extend_ttl(key, PERSISTENT_BUMP_LEDGERS, PERSISTENT_BUMP_LEDGERS);
}

pub fn require_initialized(env: &Env) -> Result<(), Error> {
    if !env.storage().instance().has(&DataKey::Admin) {
        return Err(Error::NotInitialized);
    }
    Ok(())
}

/// Verify that `caller` is the stored admin and has signed the invocation.
pub fn require_admin(env: &Env, caller: &Address) -> Result<(), Error> {
    let admin: Address = env
        .storage()
        .instance()
        .get(&DataKey::Admin)
        .ok_or(Error::NotInitialized)?;
    caller.require_auth();
    if caller != &admin {
        return Err(Error::NotAuthorized);
    }
    Ok(())
}

pub fn require_oracle(env: &Env, caller: &Address) -> Result<(), Error> {
    let oracle: Address = env
        .storage()
        .instance()
        .get(&DataKey::Oracle)
        .ok_or(Error::NotInitialized)?;
    caller.require_auth();
    if caller != &oracle {
        return Err(Error::NotAuthorized);
    }
    Ok(())
}

pub fn get_token(env: &Env) -> Result<Address, Error> {
    env.storage()
        .instance()
        .get(&DataKey::Token)
        .ok_or(Error::NotInitialized)
}

pub fn get_draw_interval(env: &Env) -> Result<u32, Error> {
    env.storage()
        .instance()
        .get(&DataKey::DrawInterval)
        .ok_or(Error::NotInitialized)
}

pub fn get_config(env: &Env) -> Result<FranchiseeConfig, Error> {
    env.storage()
        .instance()
        .get(&DataKey::Config)
        .ok_or(Error::NotInitialized)
}

pub fn set_config(env: &Env, config: &FranchiseeConfig) {
    env.storage().instance().set(&DataKey::Config, config);
}

pub fn get_cycle(env: &Env) -> Result<DrawCycle, Error> {
    env.storage()
        .instance()
        .get(&DataKey::Cycle)
        .ok_or(Error::NotInitialized)
}

pub fn set_cycle(env: &Env, cycle: &DrawCycle) {
    env.storage().instance().set(&DataKey::Cycle, cycle);
}

pub fn get_pending(env: &Env) -> Option<OracleRequest> {
    env.storage().instance().get(&DataKey::PendingRequest)
}

pub fn set_pending(env: &Env, request: &OracleRequest) {
    env.storage().instance().set(&DataKey::PendingRequest, request);
}

pub fn clear_pending(env: &Env) {
    env.storage().instance().remove(&DataKey::PendingRequest);
}

pub fn get_u32(env: &Env, key: &DataKey) -> u32 {
    env.storage().instance().get(key).unwrap_or(0)
}

pub fn set_u32(env: &Env, key: &DataKey, value: u32) {
    env.storage().instance().set(key, &value);
}

pub fn next_nonce_counter(env: &Env) -> Result<u64, Error> {
    let current: u64 = env
        .storage()
        .instance()
        .get(&DataKey::NonceCounter)
        .unwrap_or(0);
    let next = current.checked_add(1).ok_or(Error::Overflow)?;
    env.storage().instance().set(&DataKey::NonceCounter, &next);
    Ok(next)
}

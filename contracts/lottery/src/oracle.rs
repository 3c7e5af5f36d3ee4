//! Randomness oracle bridge.
//!
//! Two-phase protocol split across separate invocations:
//!
//! 1. `request` stores a single `OracleRequest` for the locked cycle and
//!    emits `RandomnessRequested` carrying a fresh nonce.
//! 2. `accept` matches the oracle's `(nonce, seed)` against that request,
//!    marks it processed and derives the winning numbers.
//!
//! Answered and cancelled nonces are remembered as stale until the cycle is
//! archived, so a replayed response is told apart from an unknown one.
//!
//! Winning numbers are reproducible by anyone holding the seed:
//!
//!   `state = sha256(seed || cycle_id_be)`, then repeatedly
//!   `n = u64_be(state[0..8]) % 50 + 1`, keep `n` if new, `state = sha256(state)`.

use soroban_sdk::{Bytes, BytesN, Env};

use crate::events::{RandomnessRequested, RequestCancelled};
use crate::storage::{self, set_persistent, DataKey};
use crate::types::{CycleStatus, DrawCycle, OracleRequest};
use crate::validation::Numbers;
use crate::{Error, MAX_DERIVATION_ROUNDS, MAX_NUMBER, NUMBERS_PER_BET};

fn digest(env: &Env, data: &Bytes) -> [u8; 32] {
    let hash: BytesN<32> = env.crypto().sha256(data).into();
    hash.to_array()
}

fn leading_u64(arr: &[u8; 32]) -> u64 {
    u64::from_be_bytes([arr[0], arr[1], arr[2], arr[3], arr[4], arr[5], arr[6], arr[7]])
}

/// Derive five distinct numbers in `[1, 50]` from `seed`, sorted ascending.
pub fn derive_draw_numbers(env: &Env, seed: &BytesN<32>, cycle_id: u64) -> Result<Numbers, Error> {
    let mut preimage = [0u8; 40];
    preimage[..32].copy_from_slice(&seed.to_array());
    preimage[32..].copy_from_slice(&cycle_id.to_be_bytes());
    let mut state = digest(env, &Bytes::from_slice(env, &preimage));

    let mut drawn: Numbers = Default::default();
    let mut count = 0usize;
    for _ in 0..MAX_DERIVATION_ROUNDS {
        let candidate = (leading_u64(&state) % MAX_NUMBER as u64) as u32 + 1;
        if !drawn[..count].contains(&candidate) {
            drawn[count] = candidate;
            count += 1;
            if count == NUMBERS_PER_BET as usize {
                drawn.sort_unstable();
                return Ok(drawn);
            }
        }
        state = digest(env, &Bytes::from_array(env, &state));
    }
    Err(Error::RandomnessExhausted)
}

fn next_nonce(env: &Env, cycle_id: u64) -> Result<u64, Error> {
    let counter = storage::next_nonce_counter(env)?;
    let mut preimage = [0u8; 20];
    preimage[..8].copy_from_slice(&cycle_id.to_be_bytes());
    preimage[8..16].copy_from_slice(&counter.to_be_bytes());
    preimage[16..].copy_from_slice(&env.ledger().sequence().to_be_bytes());
    Ok(leading_u64(&digest(env, &Bytes::from_slice(env, &preimage))))
}

fn is_stale(env: &Env, nonce: u64) -> bool {
    env.storage().persistent().has(&DataKey::StaleNonce(nonce))
}

fn mark_stale(env: &Env, nonce: u64) {
    set_persistent(env, &DataKey::StaleNonce(nonce), &());
}

/// Issue the cycle's randomness request. Rejects a second request while one
/// is pending or after one was answered.
pub fn request(env: &Env, cycle: &mut DrawCycle) -> Result<OracleRequest, Error> {
    if let Some(existing) = storage::get_pending(env) {
        if existing.cycle_id == cycle.cycle_id {
            return Err(if existing.processed {
                Error::RequestAlreadyProcessed
            } else {
                Error::RequestPending
            });
        }
    }
    if cycle.seed.is_some() {
        return Err(Error::RequestAlreadyProcessed);
    }
    if cycle.status != CycleStatus::Locked {
        return Err(Error::InvalidCycleState);
    }

    let nonce = next_nonce(env, cycle.cycle_id)?;
    let request = OracleRequest {
        cycle_id: cycle.cycle_id,
        requested_at: env.ledger().sequence(),
        nonce,
        processed: false,
    };
    storage::set_pending(env, &request);
    cycle.issued_nonces.push_back(nonce);

    RandomnessRequested {
        cycle_id: cycle.cycle_id,
        nonce,
    }
    .publish(env);

    Ok(request)
}

/// Match an oracle response to the pending request.
///
/// `StaleNonce`: the nonce was already answered or cancelled.
/// `UnmatchedNonce`: nothing is waiting for this nonce.
/// Neither changes state; the genuine request stays outstanding.
pub fn accept(
    env: &Env,
    cycle: &DrawCycle,
    nonce: u64,
    seed: &BytesN<32>,
) -> Result<Numbers, Error> {
    let mut pending = match storage::get_pending(env) {
        Some(req) if req.nonce == nonce => req,
        _ if is_stale(env, nonce) => return Err(Error::StaleNonce),
        _ => return Err(Error::UnmatchedNonce),
    };
    if pending.processed
        || pending.cycle_id != cycle.cycle_id
        || cycle.status != CycleStatus::Locked
    {
        return Err(Error::StaleNonce);
    }

    let numbers = derive_draw_numbers(env, seed, cycle.cycle_id)?;

    pending.processed = true;
    storage::set_pending(env, &pending);
    mark_stale(env, nonce);

    Ok(numbers)
}

/// Withdraw the pending request for `cycle` so a fresh one can be issued.
pub fn cancel(env: &Env, cycle: &DrawCycle) -> Result<u64, Error> {
    let pending = storage::get_pending(env)
        .filter(|req| req.cycle_id == cycle.cycle_id && !req.processed)
        .ok_or(Error::NoPendingRequest)?;

    mark_stale(env, pending.nonce);
    storage::clear_pending(env);

    RequestCancelled {
        cycle_id: cycle.cycle_id,
        nonce: pending.nonce,
    }
    .publish(env);

    Ok(pending.nonce)
}

/// Forget every request issued for an archived cycle.
pub fn clear(env: &Env, cycle: &DrawCycle) {
    storage::clear_pending(env);
    for nonce in cycle.issued_nonces.iter() {
        env.storage().persistent().remove(&DataKey::StaleNonce(nonce));
    }
}

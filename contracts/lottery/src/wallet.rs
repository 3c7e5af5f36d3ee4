//! Wallet index and per-cycle limit tracker.
//!
//! Bet counters live in a fixed table of `WALLET_TABLE_SIZE` slots. A wallet
//! hashes to a home slot and scans forward on collision, at most
//! `WALLET_SCAN_LIMIT` slots. Slots carry the cycle id they count for, so a
//! new cycle starts with every slot free and nothing has to be zeroed at
//! rollover. A slot also holds the wallet's packed combinations and ledger
//! positions for the cycle, which keeps the duplicate check to one read.

use soroban_sdk::{xdr::ToXdr, Address, BytesN, Env, Vec};

use crate::storage::{set_persistent, DataKey};
use crate::types::{WalletSlot, WalletStats};
use crate::{Error, MAX_BETS_PER_WALLET, WALLET_SCAN_LIMIT, WALLET_TABLE_SIZE};

/// Result of walking a wallet's collision chain for one cycle.
pub enum Lookup {
    Found(u32, WalletSlot),
    Free(u32),
    Full,
}

impl Lookup {
    pub fn bet_count(&self) -> u32 {
        match self {
            Lookup::Found(_, slot) => slot.bet_count(),
            _ => 0,
        }
    }

    /// Packed combinations the wallet already holds this cycle.
    pub fn combos(&self, env: &Env) -> Vec<u32> {
        match self {
            Lookup::Found(_, slot) => slot.combos.clone(),
            _ => Vec::new(env),
        }
    }
}

/// Home slot of `wallet`: sha256 of its XDR form folded into the table.
pub fn wallet_index(env: &Env, wallet: &Address) -> u32 {
    let encoded = wallet.clone().to_xdr(env);
    let digest: BytesN<32> = env.crypto().sha256(&encoded).into();
    let arr = digest.to_array();
    u32::from_be_bytes([arr[0], arr[1], arr[2], arr[3]]) % WALLET_TABLE_SIZE
}

/// Within a cycle slots are only ever claimed, never released, so the first
/// free slot on the chain proves the wallet has no entry yet.
pub fn lookup(env: &Env, wallet: &Address, cycle_id: u64) -> Lookup {
    let home = wallet_index(env, wallet);
    for step in 0..WALLET_SCAN_LIMIT {
        let index = (home + step) % WALLET_TABLE_SIZE;
        let slot: Option<WalletSlot> = env
            .storage()
            .persistent()
            .get(&DataKey::WalletSlot(index));
        match slot {
            Some(slot) if slot.cycle_id == cycle_id => {
                if &slot.wallet == wallet {
                    return Lookup::Found(index, slot);
                }
            }
            _ => return Lookup::Free(index),
        }
    }
    Lookup::Full
}

pub fn bet_count(env: &Env, wallet: &Address, cycle_id: u64) -> u32 {
    lookup(env, wallet, cycle_id).bet_count()
}

/// Ledger positions of the wallet's bets this cycle.
pub fn positions(env: &Env, wallet: &Address, cycle_id: u64) -> Vec<u32> {
    match lookup(env, wallet, cycle_id) {
        Lookup::Found(_, slot) => slot.positions,
        _ => Vec::new(env),
    }
}

/// Record accepted bets against the slot found by `found`. Only call right
/// after the ledger accepted them. Returns the new count.
pub fn record_bets(
    env: &Env,
    found: Lookup,
    wallet: &Address,
    cycle_id: u64,
    combos: &[u32],
    positions: &[u32],
) -> Result<u32, Error> {
    let (index, mut slot) = match found {
        Lookup::Found(index, slot) => (index, slot),
        Lookup::Free(index) => (
            index,
            WalletSlot {
                wallet: wallet.clone(),
                cycle_id,
                combos: Vec::new(env),
                positions: Vec::new(env),
            },
        ),
        Lookup::Full => return Err(Error::WalletTableFull),
    };

    let updated = slot
        .bet_count()
        .checked_add(combos.len() as u32)
        .ok_or(Error::Overflow)?;
    if updated > MAX_BETS_PER_WALLET {
        return Err(Error::WalletLimitReached);
    }

    for (combo, position) in combos.iter().zip(positions.iter()) {
        slot.combos.push_back(*combo);
        slot.positions.push_back(*position);
    }
    set_persistent(env, &DataKey::WalletSlot(index), &slot);
    Ok(updated)
}

pub fn stats(env: &Env, wallet: &Address) -> WalletStats {
    env.storage()
        .persistent()
        .get(&DataKey::WalletStats(wallet.clone()))
        .unwrap_or_default()
}

pub fn add_wagered(env: &Env, wallet: &Address, amount: i128, at: u64) -> Result<(), Error> {
    let mut s = stats(env, wallet);
    s.lifetime_wagered = s.lifetime_wagered.checked_add(amount).ok_or(Error::Overflow)?;
    s.last_bet_at = at;
    set_persistent(env, &DataKey::WalletStats(wallet.clone()), &s);
    Ok(())
}

/// Undo a wager on refund.
pub fn sub_wagered(env: &Env, wallet: &Address, amount: i128) -> Result<(), Error> {
    let mut s = stats(env, wallet);
    s.lifetime_wagered = s.lifetime_wagered.checked_sub(amount).ok_or(Error::Overflow)?;
    set_persistent(env, &DataKey::WalletStats(wallet.clone()), &s);
    Ok(())
}

pub fn add_winnings(env: &Env, wallet: &Address, amount: i128) -> Result<(), Error> {
    let mut s = stats(env, wallet);
    s.lifetime_winnings = s.lifetime_winnings.checked_add(amount).ok_or(Error::Overflow)?;
    set_persistent(env, &DataKey::WalletStats(wallet.clone()), &s);
    Ok(())
}

//! Fixed-capacity ring of archived draw results.
//!
//! `HistoryHead` is the next slot to write; `HistoryLen` saturates at
//! `HISTORY_CAPACITY`. Writing into a full ring overwrites the oldest entry.
//! Slots are stored `HISTORY_PAGE_SIZE` to a `HistoryPage` entry, so reading
//! the whole ring costs `HISTORY_CAPACITY / HISTORY_PAGE_SIZE` entries.

use soroban_sdk::{Env, Vec};

use crate::storage::{self, set_persistent, DataKey};
use crate::types::{DrawResult, WinnerRecord};
use crate::{HISTORY_CAPACITY, HISTORY_PAGE_SIZE};

fn page(env: &Env, index: u32) -> Vec<DrawResult> {
    env.storage()
        .persistent()
        .get(&DataKey::HistoryPage(index))
        .unwrap_or(Vec::new(env))
}

pub fn push(env: &Env, result: &DrawResult) {
    let head = storage::get_u32(env, &DataKey::HistoryHead);
    let len = storage::get_u32(env, &DataKey::HistoryLen);

    let index = head / HISTORY_PAGE_SIZE;
    let offset = head % HISTORY_PAGE_SIZE;
    let mut results = page(env, index);
    if offset < results.len() {
        results.set(offset, result.clone());
    } else {
        results.push_back(result.clone());
    }
    set_persistent(env, &DataKey::HistoryPage(index), &results);

    storage::set_u32(env, &DataKey::HistoryHead, (head + 1) % HISTORY_CAPACITY);
    if len < HISTORY_CAPACITY {
        storage::set_u32(env, &DataKey::HistoryLen, len + 1);
    }
}

pub fn len(env: &Env) -> u32 {
    storage::get_u32(env, &DataKey::HistoryLen)
}

/// Up to `limit` results, newest first.
pub fn recent(env: &Env, limit: u32) -> Vec<DrawResult> {
    let head = storage::get_u32(env, &DataKey::HistoryHead);
    let take = limit.min(len(env));

    let mut out = Vec::new(env);
    let mut loaded = u32::MAX;
    let mut results: Vec<DrawResult> = Vec::new(env);
    for i in 0..take {
        let slot = (head + HISTORY_CAPACITY - 1 - i) % HISTORY_CAPACITY;
        let index = slot / HISTORY_PAGE_SIZE;
        if index != loaded {
            results = page(env, index);
            loaded = index;
        }
        if let Some(result) = results.get(slot % HISTORY_PAGE_SIZE) {
            out.push_back(result);
        }
    }
    out
}

/// Up to `limit` winners, newest draw first. Each record carries the amount
/// actually paid.
pub fn recent_winners(env: &Env, limit: u32) -> Vec<WinnerRecord> {
    let mut out = Vec::new(env);
    for result in recent(env, len(env)).iter() {
        for record in result.winners.iter() {
            if out.len() >= limit {
                return out;
            }
            out.push_back(record);
        }
    }
    out
}

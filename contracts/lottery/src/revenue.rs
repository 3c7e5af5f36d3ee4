//! Revenue distributor.
//!
//! Shares come off the top of the cycle's stake before any prize is paid:
//! foundation, then developer, then franchisee. Progress is recorded on the
//! cycle after each transfer, so a halted distribution resumes at the first
//! unpaid share and never pays one twice.

use shared::{split_revenue, RevenueSplit};
use soroban_sdk::{token::TokenClient, Address, Env};

use crate::events::{RevenueDistributed, SettlementHalted};
use crate::types::{DrawCycle, FranchiseeConfig};
use crate::Error;

pub const REVENUE_STEPS: u32 = 3;

pub fn compute(total_stake: i128, config: &FranchiseeConfig) -> Result<RevenueSplit, Error> {
    Ok(split_revenue(total_stake, config.prize_pool_bps)?)
}

fn step(split: &RevenueSplit, config: &FranchiseeConfig, index: u32) -> (Address, i128) {
    match index {
        0 => (config.foundation.clone(), split.foundation_share),
        1 => (config.developer.clone(), split.developer_share),
        _ => (config.franchisee.clone(), split.franchisee_payout()),
    }
}

/// Pay every outstanding share. Returns `false` if a transfer failed; the
/// cycle then records how far distribution got and must not pay prizes.
pub fn distribute(
    env: &Env,
    token: &Address,
    config: &FranchiseeConfig,
    cycle: &mut DrawCycle,
) -> Result<bool, Error> {
    if cycle.settlement.revenue_paid >= REVENUE_STEPS {
        return Ok(true);
    }

    let split = cycle.split.clone().ok_or(Error::InvalidCycleState)?;
    let client = TokenClient::new(env, token);
    let contract = env.current_contract_address();

    while cycle.settlement.revenue_paid < REVENUE_STEPS {
        let (to, amount) = step(&split, config, cycle.settlement.revenue_paid);
        if amount > 0 {
            let sent = matches!(client.try_transfer(&contract, &to, &amount), Ok(Ok(())));
            if !sent {
                SettlementHalted {
                    cycle_id: cycle.cycle_id,
                    step: cycle.settlement.revenue_paid,
                    recipient: to,
                    amount,
                }
                .publish(env);
                return Ok(false);
            }
        }
        cycle.settlement.revenue_paid += 1;
    }

    RevenueDistributed {
        cycle_id: cycle.cycle_id,
        total_revenue: split.total_revenue,
        foundation_share: split.foundation_share,
        developer_share: split.developer_share,
        franchisee_share: split.franchisee_share,
        prize_contribution: split.prize_contribution,
    }
    .publish(env);

    Ok(true)
}

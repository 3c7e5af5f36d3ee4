use soroban_sdk::{contractevent, Address, BytesN, Vec};

#[contractevent]
pub struct CycleOpened {
    #[topic]
    pub cycle_id: u64,
    pub scheduled_tick: u32,
    pub rollover_in: i128,
}

#[contractevent]
pub struct BetPlaced {
    #[topic]
    pub cycle_id: u64,
    #[topic]
    pub wallet: Address,
    pub numbers: Vec<u32>,
    pub position: u32,
    pub tx_hash: BytesN<32>,
}

#[contractevent]
pub struct BatchPlaced {
    #[topic]
    pub cycle_id: u64,
    #[topic]
    pub wallet: Address,
    pub count: u32,
    pub total_cost: i128,
}

#[contractevent]
pub struct DrawLocked {
    #[topic]
    pub cycle_id: u64,
    pub total_bets: u32,
    pub total_stake: i128,
}

#[contractevent]
pub struct RandomnessRequested {
    #[topic]
    pub cycle_id: u64,
    pub nonce: u64,
}

/// Emits the seed so off-chain verifiers can re-derive the numbers.
#[contractevent]
pub struct RandomnessReceived {
    #[topic]
    pub cycle_id: u64,
    pub nonce: u64,
    pub seed: BytesN<32>,
    pub winning_numbers: Vec<u32>,
}

#[contractevent]
pub struct RequestCancelled {
    #[topic]
    pub cycle_id: u64,
    pub nonce: u64,
}

#[contractevent]
pub struct RevenueDistributed {
    #[topic]
    pub cycle_id: u64,
    pub total_revenue: i128,
    pub foundation_share: i128,
    pub developer_share: i128,
    pub franchisee_share: i128,
    pub prize_contribution: i128,
}

/// A revenue transfer failed; the cycle stays in `Settling`.
#[contractevent]
pub struct SettlementHalted {
    #[topic]
    pub cycle_id: u64,
    pub step: u32,
    pub recipient: Address,
    pub amount: i128,
}

#[contractevent]
pub struct JackpotTopUp {
    #[topic]
    pub cycle_id: u64,
    pub reserve: Address,
    pub amount: i128,
}

#[contractevent]
pub struct WinnerPaid {
    #[topic]
    pub cycle_id: u64,
    #[topic]
    pub wallet: Address,
    pub amount: i128,
}

#[contractevent]
pub struct PayoutFailed {
    #[topic]
    pub cycle_id: u64,
    #[topic]
    pub wallet: Address,
    pub amount: i128,
}

#[contractevent]
pub struct DrawArchived {
    #[topic]
    pub cycle_id: u64,
    pub has_winner: bool,
    pub prize_pool: i128,
    pub rollover_out: i128,
}

#[contractevent]
pub struct CycleAborted {
    #[topic]
    pub cycle_id: u64,
    pub refunded: i128,
}

#[contractevent]
pub struct ConfigUpdated {
    pub admin: Address,
    pub minimum_jackpot: i128,
    pub prize_pool_bps: u32,
}

/// A refund transfer failed during an abort; the stake waits in
/// `claim_refund`.
#[contractevent]
pub struct RefundDeferred {
    #[topic]
    pub cycle_id: u64,
    #[topic]
    pub wallet: Address,
    pub amount: i128,
}

#[contractevent]
pub struct RefundClaimed {
    #[topic]
    pub wallet: Address,
    pub amount: i128,
}

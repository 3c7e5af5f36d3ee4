use shared::RevenueSplit;
use soroban_sdk::{contracttype, Address, BytesN, Env, Vec};

/// Lifecycle of one draw cycle.
///
/// `Open -> Locked -> Settling -> Archived`, or `Locked -> Aborting` when the
/// admin gives up on the oracle. Only the current cycle is ever in a
/// non-archived state.
#[contracttype]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CycleStatus {
    /// Accepting bets until `scheduled_tick`.
    Open,
    /// Execution lock held, waiting for the oracle.
    Locked,
    /// Seed received; revenue and prizes are being paid.
    Settling,
    /// Abandoned by the admin; stakes are being returned.
    Aborting,
    Archived,
}

/// The current cycle's aggregate state. Lives in instance storage.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DrawCycle {
    pub cycle_id: u64,
    /// Ledger sequence at or after which the draw may execute.
    pub scheduled_tick: u32,
    pub status: CycleStatus,
    /// Number of accepted bets; also the next ledger position.
    pub bet_count: u32,
    pub total_stake: i128,
    /// Unpaid prize money carried in from the previous cycle.
    pub rollover_in: i128,
    /// Oracle seed, cached once received so settlement can be replayed.
    pub seed: Option<BytesN<32>>,
    /// Sorted winning numbers; empty until the seed arrives.
    pub winning_numbers: Vec<u32>,
    /// Fixed when settlement starts.
    pub split: Option<RevenueSplit>,
    /// Every nonce issued for this cycle, cleared on archive.
    pub issued_nonces: Vec<u64>,
    /// Ledger sequence the cycle opened at.
    pub opened_at: u32,
    pub settlement: Settlement,
}

/// Progress of a settlement or abort that spans several invocations.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Settlement {
    /// How many of the three revenue transfers have gone through.
    pub revenue_paid: u32,
    /// Set once the prize pool and any reserve top-up are final.
    pub pool_fixed: bool,
    pub prize_pool: i128,
    pub reserve_topup: i128,
    /// Next ledger position to match (settling) or refund (aborting).
    pub cursor: u32,
    /// Ledger positions of jackpot bets, in ledger order.
    pub winners: Vec<u32>,
    /// Winners whose payout was attempted.
    pub paid: u32,
    pub paid_winners: u32,
    pub paid_total: i128,
    pub records: Vec<WinnerRecord>,
    /// Stake returned or set aside so far while aborting.
    pub refunded: i128,
}

impl Settlement {
    pub fn new(env: &Env) -> Self {
        Settlement {
            revenue_paid: 0,
            pool_fixed: false,
            prize_pool: 0,
            reserve_topup: 0,
            cursor: 0,
            winners: Vec::new(env),
            paid: 0,
            paid_winners: 0,
            paid_total: 0,
            records: Vec::new(env),
            refunded: 0,
        }
    }
}

impl DrawCycle {
    pub fn is_locked(&self) -> bool {
        self.status != CycleStatus::Open
    }
}

/// An accepted bet. Immutable once written to the ledger.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Bet {
    pub wallet: Address,
    /// Five distinct values in [1, 50], ascending.
    pub numbers: Vec<u32>,
    pub stake: i128,
    pub cycle_id: u64,
    pub placed_at: u64,
    pub tx_hash: BytesN<32>,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BetReceipt {
    pub success: bool,
    pub position: u32,
    /// Wallet's bet count in this cycle after the bet.
    pub bet_count: u32,
    pub total_cost: i128,
    pub tx_hash: BytesN<32>,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BatchReceipt {
    pub success_count: u32,
    pub bet_count: u32,
    pub total_cost: i128,
    pub tx_hashes: Vec<BytesN<32>>,
}

/// One entry of the fixed wallet table. Tagged with the cycle it counts for;
/// an entry from an older cycle is a free slot.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WalletSlot {
    pub wallet: Address,
    pub cycle_id: u64,
    /// Packed sorted number sets, one per accepted bet.
    pub combos: Vec<u32>,
    /// Ledger positions of those bets.
    pub positions: Vec<u32>,
}

impl WalletSlot {
    pub fn bet_count(&self) -> u32 {
        self.combos.len()
    }
}

/// Lifetime totals per wallet.
#[contracttype]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct WalletStats {
    pub lifetime_wagered: i128,
    pub lifetime_winnings: i128,
    pub last_bet_at: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WalletStatus {
    pub bet_count: u32,
    pub max_bets: u32,
    pub remaining: u32,
    pub lifetime_wagered: i128,
    pub lifetime_winnings: i128,
    pub last_bet_at: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CycleInfo {
    pub cycle_id: u64,
    pub scheduled_tick: u32,
    pub status: CycleStatus,
    pub total_bets: u32,
    pub total_stake: i128,
    pub rollover_in: i128,
    pub prize_pool_estimate: i128,
}

/// Outstanding or answered randomness request. At most one per cycle.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OracleRequest {
    pub cycle_id: u64,
    /// Ledger sequence of the request.
    pub requested_at: u32,
    pub nonce: u64,
    pub processed: bool,
}

/// Archived outcome of one executed cycle.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DrawResult {
    pub cycle_id: u64,
    /// Empty when the cycle closed with no bets.
    pub winning_numbers: Vec<u32>,
    pub prize_pool: i128,
    pub total_bets: u32,
    pub total_stake: i128,
    /// First `MAX_RECORDED_WINNERS` winners with what each was paid.
    pub winners: Vec<WinnerRecord>,
    pub winner_count: u32,
    pub prize_per_winner: i128,
    pub paid_winners: u32,
    pub seed: Option<BytesN<32>>,
    pub has_winner: bool,
    pub reserve_topup: i128,
    pub rollover_out: i128,
    pub settled_at: u32,
}

/// A jackpot winner. `amount` is what was actually transferred: zero when
/// the payout failed and the share rolled over.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WinnerRecord {
    pub cycle_id: u64,
    pub wallet: Address,
    pub amount: i128,
}

/// Operator settings. Foundation and developer percentages are protocol
/// constants; only the prize-pool slice of the franchisee share is tunable.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FranchiseeConfig {
    pub franchisee: Address,
    pub foundation: Address,
    pub developer: Address,
    /// Funds minimum-jackpot shortfalls through a token allowance granted
    /// to this contract.
    pub reserve: Address,
    pub minimum_jackpot: i128,
    pub prize_pool_bps: u32,
}

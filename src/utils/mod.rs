pub mod ledger;
pub mod transaction;

use rand::Rng;
use solana_sdk::{compute_budget::ComputeBudgetInstruction, instruction::Instruction};

pub use ledger::{LedgerClient, RpcLedger};
pub use transaction::{BundleTransaction, MAX_TX_SIZE};

/// Get a random number between min and max (inclusive)
pub fn get_random_number(min: usize, max: usize) -> usize {
    let mut rng = rand::thread_rng();
    rng.gen_range(min..=max)
}

/// Compute-unit limit followed by an optional priority price.
pub fn compute_budget_instructions(unit_limit: u32, micro_lamports: u64) -> Vec<Instruction> {
    let mut ixs = vec![ComputeBudgetInstruction::set_compute_unit_limit(unit_limit)];
    if micro_lamports > 0 {
        ixs.push(ComputeBudgetInstruction::set_compute_unit_price(micro_lamports));
    }
    ixs
}

/// Formats lamports as SOL with 9 decimals, e.g. `1.250000000 SOL`.
pub fn format_sol(lamports: u64) -> String {
    format!("{:.9} SOL", solana_sdk::native_token::lamports_to_sol(lamports))
}

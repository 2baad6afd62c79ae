use crate::config::{BundlerConfig, FeeSettings};
use crate::errors::{BundlerError, Result};
use crate::models::launch::{TxRole, MAX_WALLETS_PER_BATCH};
use crate::models::wallet::WalletHandle;
use crate::pump_instruction_builders::{
    apply_slippage_to_sol_cost, apply_slippage_to_tokens_out, build_pump_buy_instruction, predict_next_curve_state,
    GlobalState, LaunchAccounts, TOKEN_ACCOUNT_RENT_LAMPORTS,
};
use crate::utils::transaction::{compile_and_sign, ensure_fits_packet};
use crate::utils::{compute_budget_instructions, format_sol, BundleTransaction};
use log::{debug, info};
use solana_sdk::{
    address_lookup_table::AddressLookupTableAccount,
    hash::Hash,
    instruction::Instruction,
    pubkey::Pubkey,
    signature::{Keypair, Signer},
};
use spl_associated_token_account::instruction::create_associated_token_account_idempotent;
use std::collections::HashSet;

pub const BUY_CU_LIMIT: u32 = 1_400_000;
const SIGNATURE_FEE_LAMPORTS: u64 = 5_000;

/// One planned purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuyQuote {
    pub buyer: Pubkey,
    pub spend_lamports: u64,
    /// Minimum tokens requested, slippage already applied.
    pub token_amount: u64,
    pub max_sol_cost: u64,
}

#[derive(Debug, Clone)]
pub struct BuyPlan {
    pub wallet_quotes: Vec<BuyQuote>,
    pub operator_quote: Option<BuyQuote>,
}

impl BuyPlan {
    pub fn total_spend(&self) -> u64 {
        self.wallet_quotes
            .iter()
            .chain(self.operator_quote.iter())
            .map(|q| q.spend_lamports)
            .sum()
    }
}

/// Priority fee paid by a buy batch at the configured price.
pub fn buy_priority_lamports(fees: &FeeSettings) -> u64 {
    let micro = BUY_CU_LIMIT as u128 * fees.buy_priority_fee_micro_lamports as u128;
    micro.div_ceil(1_000_000) as u64
}

/// Most a purchasing wallet can hand to the curve once its token account rent
/// and (as batch payer) the batch fees are set aside.
pub fn wallet_spend_cap(fees: &FeeSettings, per_wallet_lamports: u64) -> u64 {
    let fee_allowance = SIGNATURE_FEE_LAMPORTS * MAX_WALLETS_PER_BATCH as u64 + buy_priority_lamports(fees);
    per_wallet_lamports
        .saturating_sub(TOKEN_ACCOUNT_RENT_LAMPORTS)
        .saturating_sub(fee_allowance)
}

/// Quotes every buy against the curve left by the buys before it:
/// wallets in order, then the operator.
pub fn plan_buys(
    global: &GlobalState,
    fees: &FeeSettings,
    wallets: &[WalletHandle],
    per_wallet_lamports: u64,
    operator: Option<(Pubkey, u64)>,
) -> Result<BuyPlan> {
    let cap = wallet_spend_cap(fees, per_wallet_lamports);
    if cap == 0 {
        return Err(BundlerError::InvalidConfig(format!(
            "{} per wallet does not cover token account rent and batch fees",
            format_sol(per_wallet_lamports)
        )));
    }
    let reserved_share = per_wallet_lamports as u128 * (10_000 - fees.fee_reserve_bps.min(10_000)) as u128 / 10_000;
    let spend = (reserved_share as u64).min(cap);

    let mut curve = global.initial_curve();
    let mut wallet_quotes = Vec::with_capacity(wallets.len());
    for wallet in wallets {
        let (tokens, next) = predict_next_curve_state(&curve, spend, global.fee_basis_points)?;
        wallet_quotes.push(BuyQuote {
            buyer: wallet.pubkey(),
            spend_lamports: spend,
            token_amount: apply_slippage_to_tokens_out(tokens, fees.slippage_bps),
            max_sol_cost: apply_slippage_to_sol_cost(spend, fees.slippage_bps).min(cap),
        });
        curve = next;
    }

    let operator_quote = match operator {
        Some((buyer, lamports)) if lamports > 0 => {
            let (tokens, next) = predict_next_curve_state(&curve, lamports, global.fee_basis_points)?;
            curve = next;
            Some(BuyQuote {
                buyer,
                spend_lamports: lamports,
                token_amount: apply_slippage_to_tokens_out(tokens, fees.slippage_bps),
                max_sol_cost: apply_slippage_to_sol_cost(lamports, fees.slippage_bps),
            })
        }
        _ => None,
    };

    if let Some(zero) = wallet_quotes.iter().chain(operator_quote.iter()).find(|q| q.token_amount == 0) {
        return Err(BundlerError::Calculation(format!(
            "buy for {} would receive no tokens; the curve cannot absorb the planned spend",
            zero.buyer
        )));
    }

    debug!(
        "Planned {} wallet buys of {} each; curve after plan: {} virtual SOL",
        wallet_quotes.len(),
        format_sol(spend),
        curve.virtual_sol_reserves
    );
    Ok(BuyPlan { wallet_quotes, operator_quote })
}

fn buy_instructions(accounts: &LaunchAccounts, quote: &BuyQuote) -> Result<[Instruction; 2]> {
    Ok([
        create_associated_token_account_idempotent(&quote.buyer, &quote.buyer, &accounts.mint, &spl_token::ID),
        build_pump_buy_instruction(&quote.buyer, accounts, quote.token_amount, quote.max_sol_cost)?,
    ])
}

/// Fails unless `tx` is signed by exactly `expected`, in any order.
pub fn verify_signers(tx: &BundleTransaction, expected: &[Pubkey]) -> Result<()> {
    let actual: HashSet<Pubkey> = tx.signers().into_iter().collect();
    let wanted: HashSet<Pubkey> = expected.iter().copied().collect();
    if actual != wanted {
        return Err(BundlerError::Invariant(format!(
            "{} is signed by {:?}, expected {:?}",
            tx.role, actual, wanted
        )));
    }
    Ok(())
}

/// Splits the wallets into batches of at most five. Each batch is paid by its
/// first wallet and signed only by its own wallets.
pub fn build_buy_batches(
    config: &BundlerConfig,
    accounts: &LaunchAccounts,
    wallets: &[WalletHandle],
    quotes: &[BuyQuote],
    table: &AddressLookupTableAccount,
    blockhash: Hash,
) -> Result<Vec<BundleTransaction>> {
    if wallets.len() != quotes.len() {
        return Err(BundlerError::Invariant(format!(
            "{} wallets but {} buy quotes",
            wallets.len(),
            quotes.len()
        )));
    }

    let mut batches = Vec::with_capacity(wallets.len().div_ceil(MAX_WALLETS_PER_BATCH));
    for (index, (batch_wallets, batch_quotes)) in wallets
        .chunks(MAX_WALLETS_PER_BATCH)
        .zip(quotes.chunks(MAX_WALLETS_PER_BATCH))
        .enumerate()
    {
        let role = TxRole::BuyBatch(index);
        let mut instructions = compute_budget_instructions(BUY_CU_LIMIT, config.fees.buy_priority_fee_micro_lamports);
        for (wallet, quote) in batch_wallets.iter().zip(batch_quotes) {
            if wallet.pubkey() != quote.buyer {
                return Err(BundlerError::Invariant(format!("{} quote does not belong to {}", role, wallet.pubkey())));
            }
            instructions.extend(buy_instructions(accounts, quote)?);
        }

        let payer = batch_wallets[0].pubkey();
        let signers: Vec<&Keypair> = batch_wallets.iter().map(|w| w.keypair()).collect();
        let transaction = compile_and_sign(&payer, &instructions, std::slice::from_ref(table), blockhash, &signers)?;
        let size = ensure_fits_packet(&transaction, &role.to_string())?;
        debug!("{} built: {} wallets, {} bytes", role, batch_wallets.len(), size);

        let tx = BundleTransaction::new(role, transaction);
        let expected: Vec<Pubkey> = batch_wallets.iter().map(|w| w.pubkey()).collect();
        verify_signers(&tx, &expected)?;
        batches.push(tx);
    }
    info!("Built {} buy batch transaction(s) for {} wallets", batches.len(), wallets.len());
    Ok(batches)
}

/// The main wallet's own buy, placed last in the bundle.
pub fn build_operator_buy(
    config: &BundlerConfig,
    accounts: &LaunchAccounts,
    main_wallet: &Keypair,
    quote: &BuyQuote,
    table: &AddressLookupTableAccount,
    blockhash: Hash,
) -> Result<BundleTransaction> {
    if quote.buyer != main_wallet.pubkey() {
        return Err(BundlerError::Invariant("operator quote is not for the main wallet".to_string()));
    }
    let mut instructions = compute_budget_instructions(BUY_CU_LIMIT, config.fees.buy_priority_fee_micro_lamports);
    instructions.extend(buy_instructions(accounts, quote)?);
    let transaction =
        compile_and_sign(&main_wallet.pubkey(), &instructions, std::slice::from_ref(table), blockhash, &[main_wallet])?;
    ensure_fits_packet(&transaction, "operator buy")?;
    Ok(BundleTransaction::new(TxRole::OperatorBuy, transaction))
}

/// Orders the bundle as creation, buy batches by index, then the optional operator buy.
pub fn assemble_bundle(
    creation: BundleTransaction,
    batches: Vec<BundleTransaction>,
    operator_buy: Option<BundleTransaction>,
) -> Result<Vec<BundleTransaction>> {
    let mut bundle = Vec::with_capacity(batches.len() + 2);
    bundle.push(creation);
    bundle.extend(batches);
    bundle.extend(operator_buy);
    verify_bundle_order(&bundle)?;
    Ok(bundle)
}

/// Creation first, batches contiguous and in index order, operator buy last.
pub fn verify_bundle_order(bundle: &[BundleTransaction]) -> Result<()> {
    let Some(first) = bundle.first() else {
        return Err(BundlerError::Invariant("bundle is empty".to_string()));
    };
    if first.role != TxRole::Creation {
        return Err(BundlerError::Invariant(format!("bundle starts with {} instead of creation", first.role)));
    }

    let mut next_batch = 0;
    for (position, tx) in bundle.iter().enumerate().skip(1) {
        match tx.role {
            TxRole::Creation => {
                return Err(BundlerError::Invariant(format!("second creation transaction at position {}", position)))
            }
            TxRole::BuyBatch(i) if i == next_batch => next_batch += 1,
            TxRole::BuyBatch(i) => {
                return Err(BundlerError::Invariant(format!(
                    "buy-batch[{}] at position {} but buy-batch[{}] was expected",
                    i, position, next_batch
                )))
            }
            TxRole::OperatorBuy if position == bundle.len() - 1 => {}
            TxRole::OperatorBuy => {
                return Err(BundlerError::Invariant("operator buy must be the last transaction".to_string()))
            }
        }
    }
    Ok(())
}

pub fn encode_bundle(bundle: &[BundleTransaction]) -> Result<Vec<String>> {
    bundle.iter().map(BundleTransaction::encode_base64).collect()
}

use crate::config::BundlerConfig;
use crate::errors::{BundlerError, Result};
use crate::models::wallet::WalletHandle;
use crate::utils::transaction::{compile_and_sign, ensure_fits_packet, serialized_size, MAX_TX_SIZE};
use crate::utils::{compute_budget_instructions, format_sol, LedgerClient};
use log::{info, warn};
use solana_sdk::{
    instruction::Instruction,
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    system_instruction,
    transaction::VersionedTransaction,
};

const FUNDING_CU_LIMIT: u32 = 50_000;

/// Fails with `InsufficientBalance` unless the main wallet holds `required` lamports.
pub async fn ensure_main_balance(ledger: &dyn LedgerClient, main_wallet: &Pubkey, required: u64) -> Result<u64> {
    let available = ledger.get_balance(main_wallet).await?;
    info!("Main wallet balance: {} (required {})", format_sol(available), format_sol(required));
    if available < required {
        return Err(BundlerError::InsufficientBalance { required, available });
    }
    Ok(available)
}

/// One transaction paying `per_wallet` lamports to every purchasing wallet.
/// The priority-fee instructions are dropped when keeping them would overflow a packet.
pub fn build_funding_transaction(
    config: &BundlerConfig,
    main_wallet: &Keypair,
    wallets: &[WalletHandle],
    per_wallet: u64,
    blockhash: solana_sdk::hash::Hash,
) -> Result<VersionedTransaction> {
    let payer = main_wallet.pubkey();
    let transfers: Vec<Instruction> = wallets
        .iter()
        .map(|w| system_instruction::transfer(&payer, &w.pubkey(), per_wallet))
        .collect();

    let mut instructions =
        compute_budget_instructions(FUNDING_CU_LIMIT, config.fees.setup_priority_fee_micro_lamports);
    instructions.extend(transfers.iter().cloned());
    let with_fee = compile_and_sign(&payer, &instructions, &[], blockhash, &[main_wallet])?;
    let size = serialized_size(&with_fee)?;
    if size <= MAX_TX_SIZE {
        return Ok(with_fee);
    }

    warn!(
        "Funding transaction is {} bytes with priority fee, retrying without compute-budget instructions",
        size
    );
    let bare = compile_and_sign(&payer, &transfers, &[], blockhash, &[main_wallet])?;
    ensure_fits_packet(&bare, "funding")?;
    Ok(bare)
}

/// Sends and confirms the funding transfer. Callers check the balance first
/// with [`ensure_main_balance`]. The transfer is not undone if a later phase fails.
pub async fn distribute_funding(
    ledger: &dyn LedgerClient,
    config: &BundlerConfig,
    main_wallet: &Keypair,
    wallets: &[WalletHandle],
    per_wallet: u64,
) -> Result<Signature> {
    let blockhash = ledger.get_latest_blockhash().await?;
    let transaction = build_funding_transaction(config, main_wallet, wallets, per_wallet, blockhash)?;
    info!("Funding {} wallets with {} each", wallets.len(), format_sol(per_wallet));
    let signature = ledger.send_and_confirm(&transaction).await?;
    info!("Funding confirmed: {}", signature);
    Ok(signature)
}

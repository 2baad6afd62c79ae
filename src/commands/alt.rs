use crate::config::BundlerConfig;
use crate::errors::{BundlerError, Result};
use crate::models::wallet::WalletHandle;
use crate::pump_instruction_builders::LaunchAccounts;
use crate::utils::transaction::{compile_and_sign, ensure_fits_packet};
use crate::utils::{compute_budget_instructions, LedgerClient};
use log::{debug, info, warn};
use solana_sdk::address_lookup_table::{
    instruction::{create_lookup_table, extend_lookup_table},
    state::AddressLookupTable,
    AddressLookupTableAccount,
};
use solana_sdk::{
    instruction::Instruction,
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
};
use spl_associated_token_account::get_associated_token_address;
use std::collections::HashSet;

pub const MAX_ADDRESSES_PER_EXTEND: usize = 20;
const TABLE_TX_CU_LIMIT: u32 = 60_000;

/// Deduplicated, order-preserving address set for the launch's lookup table:
/// program and launch accounts, each purchasing wallet with its token
/// account, then the main wallet and its token account.
pub fn collect_table_addresses(accounts: &LaunchAccounts, wallets: &[WalletHandle], main_wallet: &Pubkey) -> Vec<Pubkey> {
    let mut ordered = accounts.shared_addresses();
    for wallet in wallets {
        ordered.push(wallet.pubkey());
        ordered.push(get_associated_token_address(&wallet.pubkey(), &accounts.mint));
    }
    ordered.push(*main_wallet);
    ordered.push(get_associated_token_address(main_wallet, &accounts.mint));

    let mut seen = HashSet::with_capacity(ordered.len());
    ordered.retain(|key| seen.insert(*key));
    ordered
}

async fn send_table_instruction(
    ledger: &dyn LedgerClient,
    config: &BundlerConfig,
    authority: &Keypair,
    instruction: Instruction,
    label: &str,
) -> Result<Signature> {
    let blockhash = ledger.get_latest_blockhash().await?;
    let mut instructions = compute_budget_instructions(TABLE_TX_CU_LIMIT, config.fees.setup_priority_fee_micro_lamports);
    instructions.push(instruction);
    let transaction = compile_and_sign(&authority.pubkey(), &instructions, &[], blockhash, &[authority])?;
    ensure_fits_packet(&transaction, label)?;
    let signature = ledger.send_and_confirm(&transaction).await?;
    info!("{} confirmed: {}", label, signature);
    Ok(signature)
}

/// Creates an empty table owned and paid for by `authority`.
pub async fn create_table(
    ledger: &dyn LedgerClient,
    config: &BundlerConfig,
    authority: &Keypair,
) -> Result<(Pubkey, Signature)> {
    // The derivation slot must already be in the slot-hashes sysvar.
    let recent_slot = ledger.get_slot().await?.saturating_sub(1);
    let (create_ix, table_address) = create_lookup_table(authority.pubkey(), authority.pubkey(), recent_slot);
    info!("Creating lookup table {} (recent slot {})", table_address, recent_slot);
    let signature = send_table_instruction(ledger, config, authority, create_ix, "Create ALT").await?;
    Ok((table_address, signature))
}

/// Writes `addresses` in chunks of at most 20. Returns one signature per chunk.
pub async fn extend_table(
    ledger: &dyn LedgerClient,
    config: &BundlerConfig,
    authority: &Keypair,
    table_address: Pubkey,
    addresses: &[Pubkey],
    mut on_chunk: impl FnMut(usize, usize),
) -> Result<Vec<Signature>> {
    let mut signatures = Vec::new();
    for (i, chunk) in addresses.chunks(MAX_ADDRESSES_PER_EXTEND).enumerate() {
        let extend_ix = extend_lookup_table(table_address, authority.pubkey(), Some(authority.pubkey()), chunk.to_vec());
        let label = format!("Extend ALT batch {} ({} addresses)", i + 1, chunk.len());
        signatures.push(send_table_instruction(ledger, config, authority, extend_ix, &label).await?);
        on_chunk(i, chunk.len());
    }
    Ok(signatures)
}

/// Polls until the table holds every expected address and the ledger has moved
/// past the slot of its last extension.
pub async fn wait_for_activation(
    ledger: &dyn LedgerClient,
    config: &BundlerConfig,
    table_address: Pubkey,
    expected: &[Pubkey],
) -> Result<AddressLookupTableAccount> {
    for poll in 1..=config.table_activation_max_polls {
        match check_table(ledger, table_address, expected).await {
            Ok(Some(account)) => {
                info!("Lookup table {} active after {} poll(s)", table_address, poll);
                return Ok(account);
            }
            Ok(None) => debug!("Lookup table {} not active yet (poll {})", table_address, poll),
            Err(e) if e.is_transient() => warn!("Lookup table poll {} failed: {}", poll, e),
            Err(e) => return Err(e),
        }
        tokio::time::sleep(config.table_activation_poll).await;
    }
    Err(BundlerError::LookupTableNotActive(table_address))
}

async fn check_table(
    ledger: &dyn LedgerClient,
    table_address: Pubkey,
    expected: &[Pubkey],
) -> Result<Option<AddressLookupTableAccount>> {
    let Some(data) = ledger.get_account_data(&table_address).await? else {
        return Ok(None);
    };
    let table = AddressLookupTable::deserialize(&data)
        .map_err(|e| BundlerError::Serialization(format!("Failed to decode lookup table {}: {}", table_address, e)))?;
    if table.meta.deactivation_slot != u64::MAX {
        return Err(BundlerError::LookupTableNotActive(table_address));
    }
    if table.addresses.len() < expected.len() {
        return Ok(None);
    }
    let slot = ledger.get_slot().await?;
    if slot <= table.meta.last_extended_slot {
        return Ok(None);
    }
    Ok(Some(AddressLookupTableAccount { key: table_address, addresses: table.addresses.to_vec() }))
}

/// Fails with `LookupTableNotActive` unless `table` already contains every address.
pub fn ensure_table_covers(table: &AddressLookupTableAccount, addresses: &[Pubkey]) -> Result<()> {
    let present: HashSet<&Pubkey> = table.addresses.iter().collect();
    if addresses.iter().all(|a| present.contains(a)) {
        Ok(())
    } else {
        Err(BundlerError::LookupTableNotActive(table.key))
    }
}

use crate::api::jito::JITO_TIP_ACCOUNTS;
use crate::commands::alt::collect_table_addresses;
use crate::commands::bundle::{assemble_bundle, build_buy_batches, build_operator_buy, encode_bundle, plan_buys};
use crate::commands::create::{build_creation_transaction, CreationParams};
use crate::commands::launch::PhaseTracker;
use crate::config::BundlerConfig;
use crate::errors::{BundlerError, Result};
use crate::models::launch::{BundleOutcome, LaunchConfig, LaunchResult, ValidatedLaunch};
use crate::models::LaunchStatus;
use crate::pump_instruction_builders::{GlobalState, LaunchAccounts};
use crate::state::LaunchPhase;
use crate::utils::transaction::serialized_size;
use crate::wallet::resolve_wallet_set;
use log::info;
use sha2::{Digest, Sha256};
use solana_sdk::{
    address_lookup_table::AddressLookupTableAccount,
    hash::Hash,
    pubkey::Pubkey,
    signature::{keypair_from_seed, Keypair, Signer},
};

pub const SIMULATED_ID_PREFIX: &str = "SIM-";

/// Digest of the launch fingerprint and a purpose label.
fn derive(fingerprint: &[u8; 32], label: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(fingerprint);
    hasher.update(label.as_bytes());
    hasher.finalize().into()
}

fn seeded_keypair(fingerprint: &[u8; 32], label: &str) -> Result<Keypair> {
    keypair_from_seed(&derive(fingerprint, label))
        .map_err(|e| BundlerError::Invariant(format!("cannot derive {} keypair: {}", label, e)))
}

/// Stand-in main wallet for dry runs without a configured key.
pub fn synthetic_main_wallet(launch: &LaunchConfig) -> Result<Keypair> {
    seeded_keypair(&launch.fingerprint()?, "main")
}

/// Identifiers a dry run reports in place of on-chain ones. Equal configs give equal ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntheticIds {
    pub table_address: Pubkey,
    pub bundle_id: String,
    pub metadata_uri: String,
}

pub fn synthetic_ids(launch: &LaunchConfig) -> Result<SyntheticIds> {
    let fingerprint = launch.fingerprint()?;
    let bundle_id = format!("{}{}", SIMULATED_ID_PREFIX, hex::encode(derive(&fingerprint, "bundle")));
    let metadata_uri = match &launch.token_metadata.metadata_uri {
        Some(uri) => uri.clone(),
        None => format!("sim://metadata/{}{}", SIMULATED_ID_PREFIX, hex::encode(&derive(&fingerprint, "metadata")[..16])),
    };
    Ok(SyntheticIds {
        table_address: Pubkey::new_from_array(derive(&fingerprint, "table")),
        bundle_id,
        metadata_uri,
    })
}

/// Builds and signs the full bundle offline. No ledger, relay or uploader call is made.
pub(crate) async fn run_simulated(
    tracker: &mut PhaseTracker<'_>,
    config: &BundlerConfig,
    launch: &LaunchConfig,
    main_wallet: &Keypair,
    validated: &ValidatedLaunch,
) -> Result<LaunchResult> {
    let fingerprint = launch.fingerprint()?;
    let ids = synthetic_ids(launch)?;
    let mint = seeded_keypair(&fingerprint, "mint")?;
    if let Some(pattern) = &launch.vanity {
        info!("Simulation: vanity search for {} skipped", pattern);
    }
    tracker.state.token_address = Some(mint.pubkey());

    tracker.enter(LaunchPhase::WalletResolution)?;
    let wallets = resolve_wallet_set(launch, &main_wallet.pubkey())?;
    tracker.emit(LaunchStatus::WalletsResolved(wallets.len()));

    tracker.enter(LaunchPhase::Compose)?;
    let accounts = LaunchAccounts::derive(&mint.pubkey(), &main_wallet.pubkey());
    let table = AddressLookupTableAccount {
        key: ids.table_address,
        addresses: collect_table_addresses(&accounts, &wallets, &main_wallet.pubkey()),
    };
    tracker.state.table_address = Some(table.key);
    tracker.state.metadata_uri = Some(ids.metadata_uri.clone());
    let blockhash = Hash::default();
    let creation = build_creation_transaction(
        config,
        main_wallet,
        &mint,
        &CreationParams {
            metadata: &launch.token_metadata,
            metadata_uri: &ids.metadata_uri,
            tip_account: config.tip_account.unwrap_or(JITO_TIP_ACCOUNTS[0]),
            tip_lamports: launch.relay_tip_lamports,
        },
        blockhash,
    )?;

    tracker.enter(LaunchPhase::Batch)?;
    let operator = (launch.operator_buy_lamports > 0).then(|| (main_wallet.pubkey(), launch.operator_buy_lamports));
    let plan = plan_buys(&GlobalState::pump_defaults(), &config.fees, &wallets, validated.per_wallet_lamports, operator)?;
    let batches = build_buy_batches(config, &accounts, &wallets, &plan.wallet_quotes, &table, blockhash)?;
    let operator_buy = plan
        .operator_quote
        .as_ref()
        .map(|quote| build_operator_buy(config, &accounts, main_wallet, quote, &table, blockhash))
        .transpose()?;

    tracker.enter(LaunchPhase::Assemble)?;
    let bundle = assemble_bundle(creation, batches, operator_buy)?;
    encode_bundle(&bundle)?;
    for tx in &bundle {
        info!("Simulation: {} is {} bytes, {} signer(s)", tx.role, serialized_size(&tx.transaction)?, tx.signers().len());
        if let Some(sig) = tx.signature() {
            tracker.state.record_signature(tx.role.to_string(), sig);
        }
    }

    tracker.state.bundle_id = Some(ids.bundle_id.clone());
    tracker.enter(LaunchPhase::Simulated)?;
    tracker.emit(LaunchStatus::SimulatedOnly(ids.bundle_id.clone()));
    info!("Simulation complete: {} transactions, bundle id {}", bundle.len(), ids.bundle_id);

    Ok(LaunchResult {
        launch_id: tracker.state.launch_id.clone(),
        token_address: mint.pubkey(),
        metadata_uri: ids.metadata_uri,
        table_address: ids.table_address,
        bundle_id: ids.bundle_id,
        phase_signatures: tracker.state.signatures.clone(),
        funded_wallets: Vec::new(),
        final_status: BundleOutcome::Simulated,
        vanity_attempts: None,
        simulated: true,
    })
}

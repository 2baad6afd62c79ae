use crate::api::jito::build_tip_instruction;
use crate::config::BundlerConfig;
use crate::errors::{BundlerError, Result};
use crate::models::launch::TxRole;
use crate::models::token::TokenMetadata;
use crate::pump_instruction_builders::{
    build_pump_create_instruction, build_pump_extend_account_instruction, LaunchAccounts,
};
use crate::utils::transaction::{compile_and_sign, ensure_fits_packet};
use crate::utils::{compute_budget_instructions, BundleTransaction};
use log::{debug, info};
use solana_sdk::{
    hash::Hash,
    pubkey::Pubkey,
    signature::{Keypair, Signer},
};

pub const CREATION_CU_LIMIT: u32 = 300_000;

/// Everything the creation transaction needs besides keys.
pub struct CreationParams<'a> {
    pub metadata: &'a TokenMetadata,
    pub metadata_uri: &'a str,
    pub tip_account: Pubkey,
    pub tip_lamports: u64,
}

/// Creation transaction: compute budget, create, extend the bonding curve,
/// then the relay tip. Signed by the main wallet (payer, creator) and the mint.
pub fn build_creation_transaction(
    config: &BundlerConfig,
    main_wallet: &Keypair,
    mint: &Keypair,
    params: &CreationParams<'_>,
    blockhash: Hash,
) -> Result<BundleTransaction> {
    let accounts = LaunchAccounts::derive(&mint.pubkey(), &main_wallet.pubkey());
    if params.metadata_uri.trim().is_empty() {
        return Err(BundlerError::Build("metadata URI is empty".to_string()));
    }

    let mut instructions =
        compute_budget_instructions(CREATION_CU_LIMIT, config.fees.creation_priority_fee_micro_lamports);
    instructions.push(build_pump_create_instruction(
        &accounts,
        params.metadata_uri,
        params.metadata.name.trim(),
        params.metadata.symbol.trim(),
    )?);
    instructions.push(build_pump_extend_account_instruction(&accounts.bonding_curve, &main_wallet.pubkey()));
    instructions.push(build_tip_instruction(&main_wallet.pubkey(), &params.tip_account, params.tip_lamports));
    debug!(
        "Creation tx: mint {}, bonding curve {}, tip {} lamports to {}",
        accounts.mint, accounts.bonding_curve, params.tip_lamports, params.tip_account
    );

    let transaction = compile_and_sign(&main_wallet.pubkey(), &instructions, &[], blockhash, &[main_wallet, mint])?;
    let size = ensure_fits_packet(&transaction, "creation transaction")?;
    info!("Creation transaction built ({} bytes)", size);
    Ok(BundleTransaction::new(TxRole::Creation, transaction))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pump_instruction_builders::PUMPFUN_PROGRAM_ID;
    use solana_sdk::{compute_budget, system_program};

    #[test]
    fn creation_is_signed_by_main_and_mint_and_ends_with_tip() {
        let main = Keypair::new();
        let mint = Keypair::new();
        let metadata = TokenMetadata::new("Bundle Cat", "BCAT", "the cat that lands in one block");
        let tip_account = Pubkey::new_unique();
        let params = CreationParams {
            metadata: &metadata,
            metadata_uri: "https://ipfs.io/ipfs/QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG",
            tip_account,
            tip_lamports: 1_000_000,
        };
        let tx = build_creation_transaction(&BundlerConfig::default(), &main, &mint, &params, Hash::default()).unwrap();

        assert_eq!(tx.role, TxRole::Creation);
        assert_eq!(tx.signers(), vec![main.pubkey(), mint.pubkey()]);
        let programs = tx.instruction_programs();
        assert_eq!(programs.first(), Some(&compute_budget::id()));
        assert_eq!(programs.iter().filter(|p| **p == PUMPFUN_PROGRAM_ID).count(), 2);
        assert_eq!(programs.last(), Some(&system_program::id()));
        assert!(tx.transaction.message.static_account_keys().contains(&tip_account));
    }

    #[test]
    fn empty_metadata_uri_is_refused() {
        let metadata = TokenMetadata::new("Bundle Cat", "BCAT", "the cat that lands in one block");
        let params = CreationParams {
            metadata: &metadata,
            metadata_uri: " ",
            tip_account: Pubkey::new_unique(),
            tip_lamports: 1_000,
        };
        let result =
            build_creation_transaction(&BundlerConfig::default(), &Keypair::new(), &Keypair::new(), &params, Hash::default());
        assert!(matches!(result, Err(BundlerError::Build(_))));
    }
}

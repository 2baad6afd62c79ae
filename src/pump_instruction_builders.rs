use crate::errors::{BundlerError, Result};
use borsh::{BorshDeserialize, BorshSerialize};
use log::{debug, warn};
use num_bigint::BigUint;
use num_traits::{CheckedSub, ToPrimitive, Zero};
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey,
    pubkey::Pubkey,
    system_program, sysvar,
};
use spl_associated_token_account::{get_associated_token_address, ID as ASSOCIATED_TOKEN_PROGRAM_ID};
use spl_token::ID as TOKEN_PROGRAM_ID;

// --- Constants ---
pub const PUMPFUN_PROGRAM_ID: Pubkey = pubkey!("6EF8rrecthR5Dkzon8Nwu78hRvfCKubJ14M5uBEwF6P");
pub const GLOBAL_STATE_PUBKEY: Pubkey = pubkey!("4wTV1YmiEkRvAtNtsSGPtUrqRYQMe5SKy2uB4Jjaxnjf");
pub const FEE_RECIPIENT_PUBKEY: Pubkey = pubkey!("CebN5WGQ4jvEPvsVU4EoHEpgzq1VV7AbicfhtW4xC9iM");
pub const EVENT_AUTHORITY_PUBKEY: Pubkey = pubkey!("Ce6TQqeHC9p8KetsN6JsjHK7UTZk7nasjjnr7XxXp9F1");
pub const METADATA_PROGRAM_ID: Pubkey = pubkey!("metaqbxxUerdq28cj1RbAWkYQm3ybzjb6a8bt518x1s");
pub const PUMPFUN_MINT_AUTHORITY: Pubkey = pubkey!("TSLvdd1pWpHVjahSpsvCXUbgwsL3JAcvokwaKt1eokM");
pub use system_program::ID as SYSTEM_PROGRAM_ID;
pub use sysvar::rent::ID as RENT_SYSVAR_ID;

const CREATE_DISCRIMINATOR: [u8; 8] = [0x18, 0x1e, 0xc8, 0x28, 0x05, 0x1c, 0x07, 0x77];
const BUY_DISCRIMINATOR: [u8; 8] = [0x66, 0x06, 0x3d, 0x12, 0x01, 0xda, 0xeb, 0xea];
const EXTEND_ACCOUNT_DISCRIMINATOR: [u8; 8] = [0xea, 0x66, 0xc2, 0xcb, 0x96, 0x48, 0x3e, 0xe5];
const ACCOUNT_DISCRIMINATOR_LEN: usize = 8;

/// Rent-exempt minimum for a 165-byte token account.
pub const TOKEN_ACCOUNT_RENT_LAMPORTS: u64 = 2_039_280;

// --- Account layouts ---

/// Leading fields of the program's global account. Pubkeys are kept as raw
/// bytes so the layout does not depend on Pubkey's borsh impl.
#[derive(BorshDeserialize, BorshSerialize, Debug, Clone, PartialEq, Eq)]
pub struct GlobalState {
    pub initialized: u8,
    pub authority: [u8; 32],
    pub fee_recipient: [u8; 32],
    pub initial_virtual_token_reserves: u64,
    pub initial_virtual_sol_reserves: u64,
    pub initial_real_token_reserves: u64,
    pub token_total_supply: u64,
    pub fee_basis_points: u64,
}

impl GlobalState {
    /// Launch parameters the program has used since its deployment.
    pub fn pump_defaults() -> Self {
        GlobalState {
            initialized: 1,
            authority: [0u8; 32],
            fee_recipient: FEE_RECIPIENT_PUBKEY.to_bytes(),
            initial_virtual_token_reserves: 1_073_000_000_000_000,
            initial_virtual_sol_reserves: 30_000_000_000,
            initial_real_token_reserves: 793_100_000_000_000,
            token_total_supply: 1_000_000_000_000_000,
            fee_basis_points: 100,
        }
    }

    /// Decodes raw account data (discriminator included). Trailing fields are ignored.
    pub fn from_account_data(data: &[u8]) -> Result<Self> {
        if data.len() < ACCOUNT_DISCRIMINATOR_LEN {
            return Err(BundlerError::Serialization(format!(
                "global account data too short: {} bytes",
                data.len()
            )));
        }
        let mut body = &data[ACCOUNT_DISCRIMINATOR_LEN..];
        GlobalState::deserialize(&mut body)
            .map_err(|e| BundlerError::Serialization(format!("Failed to decode global account: {}", e)))
    }

    /// Bonding-curve reserves of a freshly created token.
    pub fn initial_curve(&self) -> BondingCurveState {
        BondingCurveState {
            virtual_token_reserves: self.initial_virtual_token_reserves,
            virtual_sol_reserves: self.initial_virtual_sol_reserves,
            real_token_reserves: self.initial_real_token_reserves,
            real_sol_reserves: 0,
            token_total_supply: self.token_total_supply,
            complete: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BondingCurveState {
    pub virtual_token_reserves: u64,
    pub virtual_sol_reserves: u64,
    pub real_token_reserves: u64,
    pub real_sol_reserves: u64,
    pub token_total_supply: u64,
    pub complete: bool,
}

// --- PDAs ---

pub fn find_bonding_curve_pda(mint: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[b"bonding-curve", mint.as_ref()], &PUMPFUN_PROGRAM_ID)
}

pub fn find_metadata_pda(mint: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[b"metadata", METADATA_PROGRAM_ID.as_ref(), mint.as_ref()],
        &METADATA_PROGRAM_ID,
    )
}

pub fn find_creator_vault_pda(creator: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[b"creator-vault", creator.as_ref()], &PUMPFUN_PROGRAM_ID)
}

/// Every program-derived account a launch of `mint` by `creator` touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchAccounts {
    pub mint: Pubkey,
    pub creator: Pubkey,
    pub bonding_curve: Pubkey,
    pub associated_bonding_curve: Pubkey,
    pub metadata: Pubkey,
    pub creator_vault: Pubkey,
}

impl LaunchAccounts {
    pub fn derive(mint: &Pubkey, creator: &Pubkey) -> Self {
        let (bonding_curve, _) = find_bonding_curve_pda(mint);
        let (metadata, _) = find_metadata_pda(mint);
        let (creator_vault, _) = find_creator_vault_pda(creator);
        LaunchAccounts {
            mint: *mint,
            creator: *creator,
            bonding_curve,
            associated_bonding_curve: get_associated_token_address(&bonding_curve, mint),
            metadata,
            creator_vault,
        }
    }

    /// Static program accounts followed by the launch-specific PDAs.
    pub fn shared_addresses(&self) -> Vec<Pubkey> {
        vec![
            PUMPFUN_PROGRAM_ID,
            GLOBAL_STATE_PUBKEY,
            self.bonding_curve,
            self.associated_bonding_curve,
            self.mint,
            SYSTEM_PROGRAM_ID,
            TOKEN_PROGRAM_ID,
            ASSOCIATED_TOKEN_PROGRAM_ID,
            RENT_SYSVAR_ID,
            EVENT_AUTHORITY_PUBKEY,
            METADATA_PROGRAM_ID,
            FEE_RECIPIENT_PUBKEY,
            self.metadata,
            self.creator_vault,
        ]
    }
}

// --- Curve math ---

/// Tokens received for `sol_in` lamports after the program fee.
pub fn calculate_tokens_out(sol_in: u64, virtual_sol: u64, virtual_token: u64, fee_bps: u64) -> Result<u64> {
    if virtual_sol == 0 || virtual_token == 0 {
        return Err(BundlerError::Calculation("Bonding curve reserves cannot be zero".to_string()));
    }
    if fee_bps >= 10_000 {
        return Err(BundlerError::Calculation(format!(
            "Fee basis points ({}) cannot be 10000 or more.",
            fee_bps
        )));
    }
    let fee = (sol_in as u128 * fee_bps as u128 / 10_000u128) as u64;
    let sol_to_curve = sol_in.saturating_sub(fee);
    if sol_to_curve == 0 {
        warn!("SOL to curve is 0 after fee (fee {}, input {}). Returning 0 tokens.", fee, sol_in);
        return Ok(0);
    }

    let k = BigUint::from(virtual_sol) * BigUint::from(virtual_token);
    let new_virtual_sol = BigUint::from(virtual_sol) + BigUint::from(sol_to_curve);
    if new_virtual_sol.is_zero() {
        return Err(BundlerError::Calculation("New virtual SOL reserve is zero".to_string()));
    }
    let new_virtual_token = &k / new_virtual_sol;
    let tokens_out = BigUint::from(virtual_token)
        .checked_sub(&new_virtual_token)
        .ok_or_else(|| BundlerError::Calculation("Calculation resulted in negative tokens out".to_string()))?;
    tokens_out
        .to_u64()
        .ok_or_else(|| BundlerError::Calculation("Tokens out exceeds u64::MAX".to_string()))
}

/// Raises the SOL cost ceiling by `slippage_bps`.
pub fn apply_slippage_to_sol_cost(sol_cost: u64, slippage_bps: u64) -> u64 {
    let max_cost = sol_cost as u128 * (10_000u128 + slippage_bps as u128) / 10_000u128;
    max_cost.min(u64::MAX as u128) as u64
}

/// Lowers the expected token amount by `slippage_bps`.
pub fn apply_slippage_to_tokens_out(tokens_out: u64, slippage_bps: u64) -> u64 {
    let numerator = 10_000u128.saturating_sub(slippage_bps as u128);
    (tokens_out as u128 * numerator / 10_000u128) as u64
}

/// Quotes a buy of `sol_in` lamports and returns the curve state after it.
pub fn predict_next_curve_state(
    current: &BondingCurveState,
    sol_in: u64,
    fee_bps: u64,
) -> Result<(u64, BondingCurveState)> {
    if current.complete {
        return Err(BundlerError::Calculation("bonding curve is already complete".to_string()));
    }
    if sol_in == 0 {
        return Ok((0, *current));
    }
    let raw_tokens = calculate_tokens_out(sol_in, current.virtual_sol_reserves, current.virtual_token_reserves, fee_bps)?;
    let tokens = raw_tokens.min(current.real_token_reserves);
    if tokens < raw_tokens {
        warn!("Buy capped at remaining real token reserves ({} < {})", tokens, raw_tokens);
    }
    let sol_after_fee = sol_in - (sol_in as u128 * fee_bps as u128 / 10_000u128) as u64;

    let next = BondingCurveState {
        virtual_token_reserves: current.virtual_token_reserves - tokens,
        virtual_sol_reserves: current
            .virtual_sol_reserves
            .checked_add(sol_after_fee)
            .ok_or_else(|| BundlerError::Calculation("Predicted SOL reserves overflowed u64".to_string()))?,
        real_token_reserves: current.real_token_reserves - tokens,
        real_sol_reserves: current.real_sol_reserves.saturating_add(sol_after_fee),
        complete: current.real_token_reserves == tokens,
        ..*current
    };
    Ok((tokens, next))
}

// --- Instruction builders ---

#[derive(BorshSerialize)]
struct CreateArgs {
    name: String,
    symbol: String,
    uri: String,
    creator: [u8; 32],
}

#[derive(BorshSerialize)]
struct BuyArgs {
    amount: u64,
    max_sol_cost: u64,
}

/// Creates the mint, bonding curve and Metaplex metadata in one instruction.
/// Signers: the mint keypair and the creator.
pub fn build_pump_create_instruction(
    accounts: &LaunchAccounts,
    metadata_uri: &str,
    token_name: &str,
    token_symbol: &str,
) -> Result<Instruction> {
    let args = CreateArgs {
        name: token_name.to_string(),
        symbol: token_symbol.to_string(),
        uri: metadata_uri.to_string(),
        creator: accounts.creator.to_bytes(),
    };
    let mut data = CREATE_DISCRIMINATOR.to_vec();
    args.serialize(&mut data)
        .map_err(|e| BundlerError::Serialization(format!("Failed to serialize create args: {}", e)))?;
    debug!("Create instruction data: {}", hex::encode(&data));

    Ok(Instruction {
        program_id: PUMPFUN_PROGRAM_ID,
        accounts: vec![
            AccountMeta::new(accounts.mint, true),
            AccountMeta::new_readonly(PUMPFUN_MINT_AUTHORITY, false),
            AccountMeta::new(accounts.bonding_curve, false),
            AccountMeta::new(accounts.associated_bonding_curve, false),
            AccountMeta::new_readonly(GLOBAL_STATE_PUBKEY, false),
            AccountMeta::new_readonly(METADATA_PROGRAM_ID, false),
            AccountMeta::new(accounts.metadata, false),
            AccountMeta::new(accounts.creator, true),
            AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false),
            AccountMeta::new_readonly(TOKEN_PROGRAM_ID, false),
            AccountMeta::new_readonly(ASSOCIATED_TOKEN_PROGRAM_ID, false),
            AccountMeta::new_readonly(RENT_SYSVAR_ID, false),
            AccountMeta::new_readonly(EVENT_AUTHORITY_PUBKEY, false),
            AccountMeta::new_readonly(PUMPFUN_PROGRAM_ID, false),
        ],
        data,
    })
}

/// Grows the bonding-curve account to its current size; paid by `payer`.
pub fn build_pump_extend_account_instruction(bonding_curve: &Pubkey, payer: &Pubkey) -> Instruction {
    Instruction {
        program_id: PUMPFUN_PROGRAM_ID,
        accounts: vec![
            AccountMeta::new(*bonding_curve, false),
            AccountMeta::new(*payer, true),
            AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false),
            AccountMeta::new_readonly(EVENT_AUTHORITY_PUBKEY, false),
            AccountMeta::new_readonly(PUMPFUN_PROGRAM_ID, false),
        ],
        data: EXTEND_ACCOUNT_DISCRIMINATOR.to_vec(),
    }
}

/// Buys `token_amount` tokens for at most `max_sol_cost` lamports. Signer: the buyer.
pub fn build_pump_buy_instruction(
    buyer: &Pubkey,
    accounts: &LaunchAccounts,
    token_amount: u64,
    max_sol_cost: u64,
) -> Result<Instruction> {
    let args = BuyArgs { amount: token_amount, max_sol_cost };
    let mut data = BUY_DISCRIMINATOR.to_vec();
    args.serialize(&mut data)
        .map_err(|e| BundlerError::Serialization(format!("Failed to serialize buy args: {}", e)))?;

    Ok(Instruction {
        program_id: PUMPFUN_PROGRAM_ID,
        accounts: vec![
            AccountMeta::new_readonly(GLOBAL_STATE_PUBKEY, false),
            AccountMeta::new(FEE_RECIPIENT_PUBKEY, false),
            AccountMeta::new_readonly(accounts.mint, false),
            AccountMeta::new(accounts.bonding_curve, false),
            AccountMeta::new(accounts.associated_bonding_curve, false),
            AccountMeta::new(get_associated_token_address(buyer, &accounts.mint), false),
            AccountMeta::new(*buyer, true),
            AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false),
            AccountMeta::new_readonly(TOKEN_PROGRAM_ID, false),
            AccountMeta::new(accounts.creator_vault, false),
            AccountMeta::new_readonly(EVENT_AUTHORITY_PUBKEY, false),
            AccountMeta::new_readonly(PUMPFUN_PROGRAM_ID, false),
        ],
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_state_decodes_after_discriminator() {
        let state = GlobalState::pump_defaults();
        let mut data = vec![0xa7, 0xe8, 0xe8, 0xb1, 0xc8, 0x6c, 0x72, 0x7f];
        state.serialize(&mut data).unwrap();
        data.extend_from_slice(&[0u8; 64]);
        assert_eq!(GlobalState::from_account_data(&data).unwrap(), state);
        assert!(GlobalState::from_account_data(&data[..4]).is_err());
    }

    #[test]
    fn sequential_buys_get_fewer_tokens() {
        let global = GlobalState::pump_defaults();
        let curve = global.initial_curve();
        let (first, after_first) = predict_next_curve_state(&curve, 1_000_000_000, global.fee_basis_points).unwrap();
        let (second, _) = predict_next_curve_state(&after_first, 1_000_000_000, global.fee_basis_points).unwrap();
        assert!(first > 0);
        assert!(second < first);
        assert_eq!(after_first.virtual_token_reserves, curve.virtual_token_reserves - first);
        assert_eq!(
            first,
            calculate_tokens_out(1_000_000_000, curve.virtual_sol_reserves, curve.virtual_token_reserves, 100).unwrap()
        );
    }

    #[test]
    fn slippage_moves_bounds_in_the_safe_direction() {
        assert_eq!(apply_slippage_to_sol_cost(1_000, 1_500), 1_150);
        assert_eq!(apply_slippage_to_tokens_out(1_000, 1_500), 850);
        assert_eq!(apply_slippage_to_tokens_out(1_000, 20_000), 0);
    }

    #[test]
    fn buy_instruction_layout() {
        let mint = Pubkey::new_unique();
        let creator = Pubkey::new_unique();
        let buyer = Pubkey::new_unique();
        let accounts = LaunchAccounts::derive(&mint, &creator);
        let ix = build_pump_buy_instruction(&buyer, &accounts, 42, 7).unwrap();
        assert_eq!(&ix.data[..8], &BUY_DISCRIMINATOR);
        assert_eq!(u64::from_le_bytes(ix.data[8..16].try_into().unwrap()), 42);
        assert_eq!(u64::from_le_bytes(ix.data[16..24].try_into().unwrap()), 7);
        assert_eq!(ix.accounts.len(), 12);
        let signers: Vec<_> = ix.accounts.iter().filter(|a| a.is_signer).map(|a| a.pubkey).collect();
        assert_eq!(signers, vec![buyer]);
    }

    #[test]
    fn create_instruction_is_signed_by_mint_and_creator() {
        let accounts = LaunchAccounts::derive(&Pubkey::new_unique(), &Pubkey::new_unique());
        let ix = build_pump_create_instruction(&accounts, "https://ipfs.io/ipfs/x", "Bundle Cat", "BCAT").unwrap();
        let signers: Vec<_> = ix.accounts.iter().filter(|a| a.is_signer).map(|a| a.pubkey).collect();
        assert_eq!(signers, vec![accounts.mint, accounts.creator]);
    }
}

use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{Read, Write},
    path::{Path, PathBuf},
};
use log::{info, warn};

use crate::errors::{BundlerError, Result};

// Jito block engine regions
pub const JITO_BLOCK_ENGINE_ENDPOINTS: [&str; 6] = [
    "https://amsterdam.mainnet.block-engine.jito.wtf",
    "https://frankfurt.mainnet.block-engine.jito.wtf",
    "https://london.mainnet.block-engine.jito.wtf",
    "https://ny.mainnet.block-engine.jito.wtf",
    "https://tokyo.mainnet.block-engine.jito.wtf",
    "https://slc.mainnet.block-engine.jito.wtf",
];

pub const SETTINGS_FILENAME: &str = "app_settings.json";

pub fn get_settings_path() -> PathBuf {
    PathBuf::from(SETTINGS_FILENAME)
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AppSettings {
    // Solana configuration
    #[serde(default = "default_rpc_url")]
    pub solana_rpc_url: String,
    #[serde(default = "default_commitment")]
    pub commitment: String,
    #[serde(default = "default_confirm_timeout_secs")]
    pub confirm_timeout_secs: u64,

    // Metadata storage
    #[serde(default = "default_ipfs_api_url")]
    pub ipfs_api_url: String,

    // Jito configuration
    #[serde(default = "default_block_engine_url")]
    pub jito_block_engine_url: String,
    /// Fixed tip account; a random published tip account is used when empty.
    #[serde(default)]
    pub jito_tip_account: String,
    #[serde(default = "default_bundle_poll_interval_ms")]
    pub bundle_poll_interval_ms: u64,
    #[serde(default = "default_bundle_poll_max_attempts")]
    pub bundle_poll_max_attempts: u32,
    /// Runs `simulateBundle` before `sendBundle`; needs an endpoint that serves it.
    #[serde(default)]
    pub simulate_bundle_before_send: bool,

    // Wallets
    #[serde(default)]
    pub main_wallet_private_key: String,

    // Transaction shaping
    #[serde(default = "default_creation_priority_fee")]
    pub creation_priority_fee_micro_lamports: u64,
    #[serde(default = "default_buy_priority_fee")]
    pub buy_priority_fee_micro_lamports: u64,
    #[serde(default = "default_setup_priority_fee")]
    pub setup_priority_fee_micro_lamports: u64,
    #[serde(default = "default_slippage_bps")]
    pub slippage_bps: u64,
    /// Share of each purchasing wallet's funding held back for rent and fees.
    #[serde(default = "default_fee_reserve_bps")]
    pub fee_reserve_bps: u64,
    #[serde(default = "default_fee_headroom_lamports")]
    pub fee_headroom_lamports: u64,

    // Lookup table activation wait
    #[serde(default = "default_table_activation_poll_ms")]
    pub table_activation_poll_ms: u64,
    #[serde(default = "default_table_activation_max_polls")]
    pub table_activation_max_polls: u32,

    // Vanity search
    #[serde(default = "default_vanity_max_attempts")]
    pub vanity_max_attempts: u64,

    #[serde(default)]
    pub enable_live_trading: bool,
}

fn default_rpc_url() -> String {
    "https://api.mainnet-beta.solana.com".to_string()
}

fn default_commitment() -> String {
    "confirmed".to_string()
}

fn default_confirm_timeout_secs() -> u64 {
    90
}

fn default_ipfs_api_url() -> String {
    "https://pump.fun/api/ipfs".to_string()
}

fn default_block_engine_url() -> String {
    JITO_BLOCK_ENGINE_ENDPOINTS[0].to_string()
}

fn default_bundle_poll_interval_ms() -> u64 {
    2_000
}

fn default_bundle_poll_max_attempts() -> u32 {
    30
}

fn default_creation_priority_fee() -> u64 {
    20_000
}

fn default_buy_priority_fee() -> u64 {
    20_000
}

fn default_setup_priority_fee() -> u64 {
    250_000
}

fn default_slippage_bps() -> u64 {
    1_500
}

fn default_fee_reserve_bps() -> u64 {
    500 // Keep 5% for fees
}

fn default_fee_headroom_lamports() -> u64 {
    100_000_000 // 0.1 SOL
}

fn default_table_activation_poll_ms() -> u64 {
    400
}

fn default_table_activation_max_polls() -> u32 {
    50
}

fn default_vanity_max_attempts() -> u64 {
    1_000_000
}

impl Default for AppSettings {
    fn default() -> Self {
        AppSettings {
            solana_rpc_url: default_rpc_url(),
            commitment: default_commitment(),
            confirm_timeout_secs: default_confirm_timeout_secs(),
            ipfs_api_url: default_ipfs_api_url(),
            jito_block_engine_url: default_block_engine_url(),
            jito_tip_account: String::new(),
            bundle_poll_interval_ms: default_bundle_poll_interval_ms(),
            bundle_poll_max_attempts: default_bundle_poll_max_attempts(),
            simulate_bundle_before_send: false,
            main_wallet_private_key: String::new(),
            creation_priority_fee_micro_lamports: default_creation_priority_fee(),
            buy_priority_fee_micro_lamports: default_buy_priority_fee(),
            setup_priority_fee_micro_lamports: default_setup_priority_fee(),
            slippage_bps: default_slippage_bps(),
            fee_reserve_bps: default_fee_reserve_bps(),
            fee_headroom_lamports: default_fee_headroom_lamports(),
            table_activation_poll_ms: default_table_activation_poll_ms(),
            table_activation_max_polls: default_table_activation_max_polls(),
            vanity_max_attempts: default_vanity_max_attempts(),
            enable_live_trading: false,
        }
    }
}

impl AppSettings {
    /// Loads settings from `path`, falling back to defaults when the file is missing.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!("Settings file {} not found, using defaults.", path.display());
            return Ok(AppSettings::default());
        }
        let mut contents = String::new();
        File::open(path)?.read_to_string(&mut contents)?;
        let settings: AppSettings = serde_json::from_str(&contents).map_err(|e| {
            BundlerError::Settings(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        info!("Saved settings to {}", path.display());
        Ok(())
    }
}

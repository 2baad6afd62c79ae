use crate::errors::{BundlerError, Result};
use crate::models::settings::AppSettings;
use dotenv::dotenv;
use log::{debug, info, warn};
use solana_sdk::{commitment_config::CommitmentConfig, pubkey::Pubkey};
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Fee and sizing knobs shared by every transaction-building phase.
#[derive(Debug, Clone)]
pub struct FeeSettings {
    pub creation_priority_fee_micro_lamports: u64,
    pub buy_priority_fee_micro_lamports: u64,
    pub setup_priority_fee_micro_lamports: u64,
    pub slippage_bps: u64,
    pub fee_reserve_bps: u64,
    pub fee_headroom_lamports: u64,
}

/// Resolved runtime configuration. Built once and passed to each phase.
#[derive(Debug, Clone)]
pub struct BundlerConfig {
    pub rpc_url: String,
    pub commitment: String,
    pub confirm_timeout: Duration,
    pub ipfs_api_url: String,
    pub relay_url: String,
    pub tip_account: Option<Pubkey>,
    pub poll_interval: Duration,
    pub poll_max_attempts: u32,
    pub simulate_bundle_before_send: bool,
    pub main_wallet_private_key: String,
    pub fees: FeeSettings,
    pub table_activation_poll: Duration,
    pub table_activation_max_polls: u32,
    pub vanity_max_attempts: u64,
    pub enable_live_trading: bool,
}

impl BundlerConfig {
    /// Loads `.env`, the settings file, then applies environment overrides.
    pub fn load(settings_path: Option<&Path>) -> Result<Self> {
        dotenv().ok();
        let path = settings_path
            .map(Path::to_path_buf)
            .unwrap_or_else(crate::models::settings::get_settings_path);
        info!("Loading configuration from {} and environment.", path.display());

        let mut settings = AppSettings::load_from(&path)?;
        apply_env_overrides(&mut settings);
        let config = Self::from_settings(&settings)?;
        debug!("Configuration loaded: rpc={}, relay={}", config.rpc_url, config.relay_url);
        Ok(config)
    }

    pub fn from_settings(settings: &AppSettings) -> Result<Self> {
        let rpc_url = parse_endpoint("solana_rpc_url", &settings.solana_rpc_url)?;
        let relay_url = parse_endpoint("jito_block_engine_url", &settings.jito_block_engine_url)?;
        let ipfs_api_url = parse_endpoint("ipfs_api_url", &settings.ipfs_api_url)?;

        let tip_account = if settings.jito_tip_account.trim().is_empty() {
            None
        } else {
            Some(Pubkey::from_str(settings.jito_tip_account.trim()).map_err(|e| {
                BundlerError::Settings(format!(
                    "Invalid jito_tip_account '{}': {}",
                    settings.jito_tip_account, e
                ))
            })?)
        };

        if settings.bundle_poll_max_attempts == 0 {
            return Err(BundlerError::Settings(
                "bundle_poll_max_attempts must be at least 1".to_string(),
            ));
        }
        if settings.fee_reserve_bps >= 10_000 {
            return Err(BundlerError::Settings(format!(
                "fee_reserve_bps ({}) must be below 10000",
                settings.fee_reserve_bps
            )));
        }

        let config = BundlerConfig {
            rpc_url,
            commitment: settings.commitment.clone(),
            confirm_timeout: Duration::from_secs(settings.confirm_timeout_secs),
            ipfs_api_url,
            relay_url,
            tip_account,
            poll_interval: Duration::from_millis(settings.bundle_poll_interval_ms),
            poll_max_attempts: settings.bundle_poll_max_attempts,
            simulate_bundle_before_send: settings.simulate_bundle_before_send,
            main_wallet_private_key: settings.main_wallet_private_key.clone(),
            fees: FeeSettings {
                creation_priority_fee_micro_lamports: settings.creation_priority_fee_micro_lamports,
                buy_priority_fee_micro_lamports: settings.buy_priority_fee_micro_lamports,
                setup_priority_fee_micro_lamports: settings.setup_priority_fee_micro_lamports,
                slippage_bps: settings.slippage_bps,
                fee_reserve_bps: settings.fee_reserve_bps,
                fee_headroom_lamports: settings.fee_headroom_lamports,
            },
            table_activation_poll: Duration::from_millis(settings.table_activation_poll_ms),
            table_activation_max_polls: settings.table_activation_max_polls.max(1),
            vanity_max_attempts: settings.vanity_max_attempts,
            enable_live_trading: settings.enable_live_trading,
        };
        config.get_commitment_config()?;
        Ok(config)
    }

    pub fn get_commitment_config(&self) -> Result<CommitmentConfig> {
        match self.commitment.as_str() {
            "processed" => Ok(CommitmentConfig::processed()),
            "confirmed" => Ok(CommitmentConfig::confirmed()),
            "finalized" => Ok(CommitmentConfig::finalized()),
            _ => Err(BundlerError::Settings(format!("Invalid commitment level: {}", self.commitment))),
        }
    }
}

impl Default for BundlerConfig {
    fn default() -> Self {
        let settings = AppSettings::default();
        let fees = FeeSettings {
            creation_priority_fee_micro_lamports: settings.creation_priority_fee_micro_lamports,
            buy_priority_fee_micro_lamports: settings.buy_priority_fee_micro_lamports,
            setup_priority_fee_micro_lamports: settings.setup_priority_fee_micro_lamports,
            slippage_bps: settings.slippage_bps,
            fee_reserve_bps: settings.fee_reserve_bps,
            fee_headroom_lamports: settings.fee_headroom_lamports,
        };
        BundlerConfig {
            rpc_url: settings.solana_rpc_url,
            commitment: settings.commitment,
            confirm_timeout: Duration::from_secs(settings.confirm_timeout_secs),
            ipfs_api_url: settings.ipfs_api_url,
            relay_url: settings.jito_block_engine_url,
            tip_account: None,
            poll_interval: Duration::from_millis(settings.bundle_poll_interval_ms),
            poll_max_attempts: settings.bundle_poll_max_attempts,
            simulate_bundle_before_send: settings.simulate_bundle_before_send,
            main_wallet_private_key: settings.main_wallet_private_key,
            fees,
            table_activation_poll: Duration::from_millis(settings.table_activation_poll_ms),
            table_activation_max_polls: settings.table_activation_max_polls,
            vanity_max_attempts: settings.vanity_max_attempts,
            enable_live_trading: false,
        }
    }
}

fn apply_env_overrides(settings: &mut AppSettings) {
    if let Ok(v) = env::var("BUNDLER_RPC_URL") {
        settings.solana_rpc_url = v;
    }
    if let Ok(v) = env::var("BUNDLER_RELAY_URL") {
        settings.jito_block_engine_url = v;
    }
    if let Ok(v) = env::var("BUNDLER_IPFS_URL") {
        settings.ipfs_api_url = v;
    }
    if let Ok(v) = env::var("BUNDLER_MAIN_WALLET_KEY") {
        settings.main_wallet_private_key = v;
    }
    if let Ok(v) = env::var("BUNDLER_TIP_ACCOUNT") {
        settings.jito_tip_account = v;
    }
    if let Ok(v) = env::var("BUNDLER_SIMULATE_BUNDLE") {
        settings.simulate_bundle_before_send = v.eq_ignore_ascii_case("true");
    }
    if let Ok(v) = env::var("ENABLE_LIVE_TRADING") {
        settings.enable_live_trading = v.eq_ignore_ascii_case("true");
    }
}

fn parse_endpoint(field: &str, raw: &str) -> Result<String> {
    let url = Url::parse(raw)
        .map_err(|e| BundlerError::Settings(format!("Invalid {} '{}': {}", field, raw, e)))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        warn!("{} uses unexpected scheme '{}'", field, url.scheme());
    }
    Ok(raw.trim_end_matches('/').to_string())
}

/// Directory holding launch state files.
pub fn get_config_dir() -> PathBuf {
    let home_dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    home_dir.join(".pumpfun-bundler")
}

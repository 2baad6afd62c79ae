use crate::errors::{BundlerError, Result};
use crate::models::token::TokenMetadata;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use solana_sdk::native_token::{lamports_to_sol, LAMPORTS_PER_SOL};
use solana_sdk::pubkey::Pubkey;
use std::fmt;

pub const MIN_WALLETS: usize = 1;
pub const MAX_WALLETS: usize = 21;
/// Per-transaction account ceiling when buys reference the lookup table.
pub const MAX_WALLETS_PER_BATCH: usize = 5;

pub const MIN_PER_WALLET_LAMPORTS: u64 = LAMPORTS_PER_SOL / 100;
pub const MIN_TOTAL_FUNDING_LAMPORTS: u64 = LAMPORTS_PER_SOL;
pub const RECOMMENDED_TOTAL_FUNDING_LAMPORTS: u64 = 5 * LAMPORTS_PER_SOL;
pub const MIN_RELAY_TIP_LAMPORTS: u64 = LAMPORTS_PER_SOL / 10_000;
pub const RECOMMENDED_RELAY_TIP_LAMPORTS: u64 = LAMPORTS_PER_SOL / 1_000;

pub const MIN_DESCRIPTION_LEN: usize = 10;

pub const VANITY_MAX_LEN: usize = 8;
pub const VANITY_WARN_LEN: usize = 4;
const BASE58_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletSourceMode {
    Generate,
    Import,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VanityMode {
    Prefix,
    Suffix,
}

/// Text the token address must start (or end) with. Matching is case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VanityPattern {
    pub text: String,
    pub mode: VanityMode,
}

impl VanityPattern {
    pub fn prefix(text: impl Into<String>) -> Self {
        VanityPattern { text: text.into(), mode: VanityMode::Prefix }
    }

    pub fn suffix(text: impl Into<String>) -> Self {
        VanityPattern { text: text.into(), mode: VanityMode::Suffix }
    }

    pub fn matches(&self, address: &str) -> bool {
        match self.mode {
            VanityMode::Prefix => address.starts_with(&self.text),
            VanityMode::Suffix => address.ends_with(&self.text),
        }
    }

    /// Rough number of keypairs to generate before a hit.
    pub fn expected_attempts(&self) -> f64 {
        58f64.powi(self.text.chars().count() as i32)
    }

    pub fn check(&self) -> Result<()> {
        if self.text.is_empty() {
            return Err(BundlerError::InvalidConfig("vanity pattern is empty".to_string()));
        }
        if self.text.chars().count() > VANITY_MAX_LEN {
            return Err(BundlerError::InvalidConfig(format!(
                "vanity pattern '{}' is longer than {} characters",
                self.text, VANITY_MAX_LEN
            )));
        }
        if let Some(bad) = self.text.chars().find(|c| !BASE58_ALPHABET.contains(*c)) {
            return Err(BundlerError::InvalidConfig(format!(
                "vanity pattern '{}' contains '{}', which never appears in a base58 address",
                self.text, bad
            )));
        }
        Ok(())
    }
}

impl fmt::Display for VanityPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mode {
            VanityMode::Prefix => write!(f, "{}...", self.text),
            VanityMode::Suffix => write!(f, "...{}", self.text),
        }
    }
}

/// Immutable input for one launch. All amounts are lamports.
#[derive(Clone, Serialize, Deserialize)]
pub struct LaunchConfig {
    pub total_funding_lamports: u64,
    pub wallet_count: usize,
    #[serde(default)]
    pub operator_buy_lamports: u64,
    pub relay_tip_lamports: u64,
    #[serde(default)]
    pub vanity: Option<VanityPattern>,
    pub wallet_source: WalletSourceMode,
    /// Never serialized; the launch fingerprint must not depend on secrets.
    #[serde(skip)]
    pub imported_wallet_secrets: Vec<String>,
    #[serde(default)]
    pub network_endpoint: Option<String>,
    pub token_metadata: TokenMetadata,
    #[serde(default)]
    pub simulate: bool,
}

impl fmt::Debug for LaunchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LaunchConfig")
            .field("total_funding_lamports", &self.total_funding_lamports)
            .field("wallet_count", &self.wallet_count)
            .field("operator_buy_lamports", &self.operator_buy_lamports)
            .field("relay_tip_lamports", &self.relay_tip_lamports)
            .field("vanity", &self.vanity)
            .field("wallet_source", &self.wallet_source)
            .field("imported_wallet_secrets", &format!("<{} redacted>", self.imported_wallet_secrets.len()))
            .field("network_endpoint", &self.network_endpoint)
            .field("token_metadata", &self.token_metadata)
            .field("simulate", &self.simulate)
            .finish()
    }
}

impl LaunchConfig {
    /// Equal share sent to every purchasing wallet. The remainder stays with the main wallet.
    pub fn per_wallet_amount(&self) -> u64 {
        if self.wallet_count == 0 {
            return 0;
        }
        self.total_funding_lamports / self.wallet_count as u64
    }

    /// Lamports lost to integer division; always below `wallet_count`.
    pub fn distribution_remainder(&self) -> u64 {
        self.total_funding_lamports - self.per_wallet_amount() * self.wallet_count as u64
    }

    /// Creation, one per buy batch, plus the operator buy when requested.
    pub fn bundle_transaction_count(&self) -> usize {
        1 + self.batch_count() + usize::from(self.operator_buy_lamports > 0)
    }

    pub fn batch_count(&self) -> usize {
        (self.wallet_count + MAX_WALLETS_PER_BATCH - 1) / MAX_WALLETS_PER_BATCH
    }

    /// SHA-256 over the non-secret fields. Identical configs hash identically.
    pub fn fingerprint(&self) -> Result<[u8; 32]> {
        let canonical = serde_json::to_vec(self)?;
        Ok(Sha256::digest(&canonical).into())
    }

    /// Checks every rule that can be checked without touching the network.
    /// All violations are reported together in one `InvalidConfig`.
    pub fn validate(&self, fee_headroom_lamports: u64) -> Result<ValidatedLaunch> {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let meta = &self.token_metadata;

        let name_len = meta.name.trim().chars().count();
        if !(2..=32).contains(&name_len) {
            errors.push(format!("token name must be 2 to 32 characters, got {}", name_len));
        }
        let symbol_len = meta.symbol.trim().chars().count();
        if !(2..=10).contains(&symbol_len) {
            errors.push(format!("token symbol must be 2 to 10 characters, got {}", symbol_len));
        }
        let description_len = meta.description.trim().chars().count();
        if description_len < MIN_DESCRIPTION_LEN {
            errors.push(format!(
                "token description must be at least {} characters, got {}",
                MIN_DESCRIPTION_LEN, description_len
            ));
        }
        if let Some(uri) = &meta.metadata_uri {
            if let Err(e) = url::Url::parse(uri) {
                errors.push(format!("metadata_uri '{}' is not a URL: {}", uri, e));
            }
        }

        if !(MIN_WALLETS..=MAX_WALLETS).contains(&self.wallet_count) {
            errors.push(format!(
                "wallet count must be between {} and {}, got {}",
                MIN_WALLETS, MAX_WALLETS, self.wallet_count
            ));
        }
        if self.total_funding_lamports < MIN_TOTAL_FUNDING_LAMPORTS {
            errors.push(format!(
                "total funding must be at least {} SOL, got {} SOL",
                lamports_to_sol(MIN_TOTAL_FUNDING_LAMPORTS),
                lamports_to_sol(self.total_funding_lamports)
            ));
        } else if self.total_funding_lamports < RECOMMENDED_TOTAL_FUNDING_LAMPORTS {
            warnings.push(format!(
                "consider at least {} SOL of total funding for a better distribution",
                lamports_to_sol(RECOMMENDED_TOTAL_FUNDING_LAMPORTS)
            ));
        }
        let per_wallet = self.per_wallet_amount();
        if self.wallet_count > 0 && per_wallet < MIN_PER_WALLET_LAMPORTS {
            errors.push(format!(
                "each wallet would receive {} SOL, below the {} SOL minimum",
                lamports_to_sol(per_wallet),
                lamports_to_sol(MIN_PER_WALLET_LAMPORTS)
            ));
        }

        if self.relay_tip_lamports < MIN_RELAY_TIP_LAMPORTS {
            errors.push(format!(
                "relay tip must be at least {} SOL, got {} SOL",
                lamports_to_sol(MIN_RELAY_TIP_LAMPORTS),
                lamports_to_sol(self.relay_tip_lamports)
            ));
        } else if self.relay_tip_lamports < RECOMMENDED_RELAY_TIP_LAMPORTS {
            warnings.push(format!(
                "relay tip below {} SOL may result in slower inclusion",
                lamports_to_sol(RECOMMENDED_RELAY_TIP_LAMPORTS)
            ));
        }

        if let Some(pattern) = &self.vanity {
            match pattern.check() {
                Ok(()) => {
                    warnings.push("vanity address generation may take additional time".to_string());
                    if pattern.text.chars().count() > VANITY_WARN_LEN {
                        warnings.push(format!(
                            "vanity pattern '{}' needs about {:.0} attempts on average and may exhaust the search budget",
                            pattern.text,
                            pattern.expected_attempts()
                        ));
                    }
                }
                Err(e) => errors.push(e.to_string()),
            }
        }

        match self.wallet_source {
            WalletSourceMode::Import => {
                if self.imported_wallet_secrets.len() != self.wallet_count {
                    errors.push(format!(
                        "{} wallet secrets imported but wallet count is {}",
                        self.imported_wallet_secrets.len(),
                        self.wallet_count
                    ));
                }
            }
            WalletSourceMode::Generate => {
                if !self.imported_wallet_secrets.is_empty() {
                    warnings.push("imported wallet secrets are ignored when generating wallets".to_string());
                }
                if !self.simulate {
                    warnings.push(
                        "generated wallet secrets are not persisted; funds left in them after a failed launch cannot be recovered"
                            .to_string(),
                    );
                }
            }
        }

        if let Some(endpoint) = &self.network_endpoint {
            if let Err(e) = url::Url::parse(endpoint) {
                errors.push(format!("network endpoint '{}' is not a URL: {}", endpoint, e));
            }
        }

        if !errors.is_empty() {
            return Err(BundlerError::InvalidConfig(errors.join("; ")));
        }

        let tx_count = self.bundle_transaction_count();
        if tx_count > crate::api::jito::MAX_BUNDLE_TRANSACTIONS {
            warnings.push(format!(
                "bundle will hold {} transactions; block engines usually accept at most {}",
                tx_count,
                crate::api::jito::MAX_BUNDLE_TRANSACTIONS
            ));
        }

        let cost = CostEstimate::new(
            self.total_funding_lamports,
            self.operator_buy_lamports,
            self.relay_tip_lamports,
            fee_headroom_lamports,
        )?;

        Ok(ValidatedLaunch {
            per_wallet_lamports: per_wallet,
            remainder_lamports: self.distribution_remainder(),
            batch_count: self.batch_count(),
            warnings,
            cost,
        })
    }
}

/// Result of a successful validation.
#[derive(Debug, Clone, Serialize)]
pub struct ValidatedLaunch {
    pub per_wallet_lamports: u64,
    pub remainder_lamports: u64,
    pub batch_count: usize,
    pub warnings: Vec<String>,
    pub cost: CostEstimate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CostEstimate {
    pub distribution_lamports: u64,
    pub operator_buy_lamports: u64,
    pub relay_tip_lamports: u64,
    pub fee_headroom_lamports: u64,
    pub total_lamports: u64,
}

impl CostEstimate {
    pub fn new(distribution: u64, operator_buy: u64, relay_tip: u64, fee_headroom: u64) -> Result<Self> {
        let total = distribution
            .checked_add(operator_buy)
            .and_then(|v| v.checked_add(relay_tip))
            .and_then(|v| v.checked_add(fee_headroom))
            .ok_or_else(|| BundlerError::InvalidConfig("launch cost overflows u64".to_string()))?;
        Ok(CostEstimate {
            distribution_lamports: distribution,
            operator_buy_lamports: operator_buy,
            relay_tip_lamports: relay_tip,
            fee_headroom_lamports: fee_headroom,
            total_lamports: total,
        })
    }
}

/// Role of one transaction inside the bundle; fixes which keys may sign it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TxRole {
    Creation,
    BuyBatch(usize),
    OperatorBuy,
}

impl fmt::Display for TxRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxRole::Creation => write!(f, "creation"),
            TxRole::BuyBatch(i) => write!(f, "buy-batch[{}]", i),
            TxRole::OperatorBuy => write!(f, "operator-buy"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseSignature {
    pub phase: String,
    pub signature: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BundleOutcome {
    Finalized { slot: u64 },
    Failed(String),
    Simulated,
}

impl fmt::Display for BundleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BundleOutcome::Finalized { slot } => write!(f, "finalized (slot {})", slot),
            BundleOutcome::Failed(reason) => write!(f, "failed: {}", reason),
            BundleOutcome::Simulated => write!(f, "simulated"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchResult {
    pub launch_id: String,
    pub token_address: Pubkey,
    pub metadata_uri: String,
    pub table_address: Pubkey,
    pub bundle_id: String,
    pub phase_signatures: Vec<PhaseSignature>,
    pub funded_wallets: Vec<Pubkey>,
    pub final_status: BundleOutcome,
    pub vanity_attempts: Option<u64>,
    pub simulated: bool,
}

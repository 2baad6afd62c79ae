use crate::errors::{BundlerError, Result};
use crate::models::launch::VanityPattern;
use crate::models::wallet::{WalletInfo, WalletKeys};
use chrono::Local;
use log::{debug, info};
use rayon::prelude::*;
use solana_sdk::signer::{keypair::Keypair, Signer};
use std::{
    fs::File,
    io::Write,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

/// Keypairs generated per parallel round. The last round is shortened so the
/// total never exceeds the caller's budget.
const VANITY_BATCH_SIZE: u64 = 8_192;

#[derive(Debug)]
pub struct VanityMatch {
    pub keypair: Keypair,
    /// Keypairs generated up to and including the round that produced the match.
    pub attempts: u64,
    pub elapsed: Duration,
}

/// Generates keypairs until one's base58 address matches `pattern`.
/// Stops with `VanityTimeout` after `max_attempts` keypairs.
pub fn search_vanity_keypair(pattern: &VanityPattern, max_attempts: u64) -> Result<VanityMatch> {
    let started = Instant::now();
    let mut attempts: u64 = 0;
    info!(
        "Searching for vanity address {} (budget {} attempts, ~{:.0} expected)",
        pattern,
        max_attempts,
        pattern.expected_attempts()
    );

    while attempts < max_attempts {
        let round = VANITY_BATCH_SIZE.min(max_attempts - attempts);
        let found = (0..round).into_par_iter().find_map_any(|_| {
            let keypair = Keypair::new();
            pattern.matches(&keypair.pubkey().to_string()).then_some(keypair)
        });
        attempts += round;

        if let Some(keypair) = found {
            let elapsed = started.elapsed();
            info!(
                "Vanity address {} found after {} attempts in {:.2}s",
                keypair.pubkey(),
                attempts,
                elapsed.as_secs_f64()
            );
            return Ok(VanityMatch { keypair, attempts, elapsed });
        }
        debug!("Vanity search: {} attempts, no match yet", attempts);
    }

    Err(BundlerError::VanityTimeout { pattern: pattern.to_string(), attempts })
}

/// Generates `count` keypairs and writes them as a keys file in `output_dir`.
pub fn generate_and_save_keypairs(output_dir: &Path, count: usize) -> Result<PathBuf> {
    let count = count.max(1);
    let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let file_path = output_dir.join(format!("keys_{}.json", timestamp));

    let wallets = (0..count)
        .map(|i| {
            let keypair = Keypair::new();
            WalletInfo {
                public_key: keypair.pubkey().to_string(),
                private_key: bs58::encode(keypair.to_bytes()).into_string(),
                name: Some(format!("buyer{}", i + 1)),
            }
        })
        .collect();

    save_keys_file(&file_path, &WalletKeys { wallets })?;
    info!("Generated {} wallets into {}", count, file_path.display());
    Ok(file_path)
}

pub fn save_keys_file(path: &Path, keys: &WalletKeys) -> Result<()> {
    let json = serde_json::to_string_pretty(keys)?;
    let mut file = File::create(path)?;
    file.write_all(json.as_bytes())?;
    Ok(())
}

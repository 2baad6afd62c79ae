use crate::errors::{BundlerError, Result};
use crate::models::launch::{LaunchConfig, WalletSourceMode};
use crate::models::wallet::{WalletHandle, WalletKeys};
use log::{debug, info};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{keypair_from_seed, Keypair, Signer};
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Parses one secret as base58 (64-byte keypair or 32-byte seed) or as a JSON byte array.
pub fn parse_wallet_secret(index: usize, secret: &str) -> Result<Keypair> {
    let secret = secret.trim();
    if secret.is_empty() {
        return Err(BundlerError::InvalidWalletSecret { index, reason: "empty secret".to_string() });
    }

    let bytes = if secret.starts_with('[') {
        serde_json::from_str::<Vec<u8>>(secret).map_err(|e| BundlerError::InvalidWalletSecret {
            index,
            reason: format!("invalid JSON byte array: {}", e),
        })?
    } else {
        bs58::decode(secret).into_vec().map_err(|e| BundlerError::InvalidWalletSecret {
            index,
            reason: format!("invalid base58: {}", e),
        })?
    };

    match bytes.len() {
        64 => {
            let keypair = keypair_from_seed(&bytes[..32]).map_err(|e| BundlerError::InvalidWalletSecret {
                index,
                reason: format!("invalid 64-byte keypair: {}", e),
            })?;
            if keypair.pubkey().as_ref() != &bytes[32..] {
                return Err(BundlerError::InvalidWalletSecret {
                    index,
                    reason: "public half does not match the secret half".to_string(),
                });
            }
            Ok(keypair)
        }
        32 => keypair_from_seed(&bytes).map_err(|e| BundlerError::InvalidWalletSecret {
            index,
            reason: format!("invalid 32-byte seed: {}", e),
        }),
        n => Err(BundlerError::InvalidWalletSecret {
            index,
            reason: format!("decoded to {} bytes, expected 32 or 64", n),
        }),
    }
}

/// Loads the main funding wallet from its configured secret.
pub fn load_main_wallet(secret: &str) -> Result<Keypair> {
    if secret.trim().is_empty() {
        return Err(BundlerError::InvalidConfig(
            "main wallet private key is not configured (main_wallet_private_key / BUNDLER_MAIN_WALLET_KEY)".to_string(),
        ));
    }
    parse_wallet_secret(0, secret).map_err(|e| match e {
        BundlerError::InvalidWalletSecret { reason, .. } => {
            BundlerError::InvalidConfig(format!("main wallet private key: {}", reason))
        }
        other => other,
    })
}

/// Reads the private keys from a `{"wallets":[...]}` keys file, in file order.
pub fn load_wallet_secrets_from_file(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path)
        .map_err(|e| BundlerError::Io(format!("Failed to open keys file {}: {}", path.display(), e)))?;
    let keys: WalletKeys = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| BundlerError::Serialization(format!("Failed to parse keys file {}: {}", path.display(), e)))?;
    info!("Loaded {} wallets from {}", keys.wallets.len(), path.display());
    Ok(keys.wallets.into_iter().map(|w| w.private_key).collect())
}

/// Produces exactly `config.wallet_count` purchasing wallets.
pub fn resolve_wallet_set(config: &LaunchConfig, main_wallet: &Pubkey) -> Result<Vec<WalletHandle>> {
    let wallets: Vec<WalletHandle> = match config.wallet_source {
        WalletSourceMode::Generate => (0..config.wallet_count).map(|_| WalletHandle::new(Keypair::new())).collect(),
        WalletSourceMode::Import => {
            if config.imported_wallet_secrets.len() != config.wallet_count {
                return Err(BundlerError::InvalidConfig(format!(
                    "{} wallet secrets imported but wallet count is {}",
                    config.imported_wallet_secrets.len(),
                    config.wallet_count
                )));
            }
            let mut seen = HashSet::with_capacity(config.wallet_count);
            let mut handles = Vec::with_capacity(config.wallet_count);
            for (index, secret) in config.imported_wallet_secrets.iter().enumerate() {
                let keypair = parse_wallet_secret(index, secret)?;
                let pubkey = keypair.pubkey();
                if pubkey == *main_wallet {
                    return Err(BundlerError::InvalidWalletSecret {
                        index,
                        reason: "is the main funding wallet".to_string(),
                    });
                }
                if !seen.insert(pubkey) {
                    return Err(BundlerError::InvalidWalletSecret {
                        index,
                        reason: format!("duplicates wallet {}", pubkey),
                    });
                }
                handles.push(WalletHandle::new(keypair));
            }
            handles
        }
    };

    debug!("Resolved {} purchasing wallets ({:?})", wallets.len(), config.wallet_source);
    Ok(wallets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::token::TokenMetadata;

    fn import_config(secrets: Vec<String>) -> LaunchConfig {
        LaunchConfig {
            total_funding_lamports: 1_000_000_000,
            wallet_count: secrets.len(),
            operator_buy_lamports: 0,
            relay_tip_lamports: 1_000_000,
            vanity: None,
            wallet_source: WalletSourceMode::Import,
            imported_wallet_secrets: secrets,
            network_endpoint: None,
            token_metadata: TokenMetadata::new("Bundle Cat", "BCAT", "lands in one block"),
            simulate: true,
        }
    }

    #[test]
    fn accepts_all_supported_secret_formats() {
        let kp = Keypair::new();
        let from_b58 = parse_wallet_secret(0, &bs58::encode(kp.to_bytes()).into_string()).unwrap();
        assert_eq!(from_b58.pubkey(), kp.pubkey());

        let json = serde_json::to_string(&kp.to_bytes().to_vec()).unwrap();
        assert_eq!(parse_wallet_secret(1, &json).unwrap().pubkey(), kp.pubkey());

        let seed = [7u8; 32];
        let from_seed = parse_wallet_secret(2, &bs58::encode(seed).into_string()).unwrap();
        assert_eq!(from_seed.pubkey(), keypair_from_seed(&seed).unwrap().pubkey());
    }

    #[test]
    fn keypair_with_foreign_public_half_is_rejected() {
        let mut bytes = Keypair::new().to_bytes();
        bytes[32..].copy_from_slice(Keypair::new().pubkey().as_ref());
        let secret = bs58::encode(bytes).into_string();
        match parse_wallet_secret(4, &secret) {
            Err(BundlerError::InvalidWalletSecret { index, reason }) => {
                assert_eq!(index, 4);
                assert!(reason.contains("public half"));
            }
            other => panic!("expected InvalidWalletSecret, got {:?}", other.map(|k| k.pubkey())),
        }
    }

    #[test]
    fn malformed_secret_names_its_index() {
        let good = bs58::encode(Keypair::new().to_bytes()).into_string();
        let config = import_config(vec![good, "not-base58-0OIl".to_string()]);
        match resolve_wallet_set(&config, &Pubkey::new_unique()) {
            Err(BundlerError::InvalidWalletSecret { index, .. }) => assert_eq!(index, 1),
            other => panic!("expected InvalidWalletSecret, got {:?}", other),
        }
    }

    #[test]
    fn duplicate_and_main_wallet_imports_are_rejected() {
        let kp = Keypair::new();
        let secret = bs58::encode(kp.to_bytes()).into_string();
        let dup = import_config(vec![secret.clone(), secret.clone()]);
        assert!(matches!(
            resolve_wallet_set(&dup, &Pubkey::new_unique()),
            Err(BundlerError::InvalidWalletSecret { index: 1, .. })
        ));

        let main = import_config(vec![secret]);
        assert!(matches!(
            resolve_wallet_set(&main, &kp.pubkey()),
            Err(BundlerError::InvalidWalletSecret { index: 0, .. })
        ));
    }

    #[test]
    fn generated_set_has_requested_size() {
        let mut config = import_config(vec![]);
        config.wallet_source = WalletSourceMode::Generate;
        config.wallet_count = 21;
        let wallets = resolve_wallet_set(&config, &Pubkey::new_unique()).unwrap();
        assert_eq!(wallets.len(), 21);
    }

    #[test]
    fn empty_main_wallet_key_is_config_error() {
        assert!(matches!(load_main_wallet("  "), Err(BundlerError::InvalidConfig(_))));
    }
}

use crate::key_utils::generate_and_save_keypairs;
use crate::wallet::{load_wallet_secrets_from_file, parse_wallet_secret};
use anyhow::Context;
use console::Style;
use prettytable::{row, Table};
use solana_sdk::signature::Signer;
use std::path::Path;

/// `wallets generate`: writes `count` fresh purchasing wallets to a keys file in `dir`.
pub fn generate_wallets_command(dir: &Path, count: usize) -> anyhow::Result<()> {
    let info_style = Style::new().cyan();
    std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    let path = generate_and_save_keypairs(dir, count).context("Failed to generate wallets")?;

    let secrets = load_wallet_secrets_from_file(&path)?;
    let mut table = Table::new();
    table.add_row(row!["Index", "Public Key"]);
    for (index, secret) in secrets.iter().enumerate() {
        let keypair = parse_wallet_secret(index, secret)?;
        table.add_row(row![index, keypair.pubkey().to_string()]);
    }
    table.printstd();

    println!("\n{} {} wallet(s) written to {}", info_style.apply_to("ℹ️"), secrets.len(), path.display());
    println!("{}", Style::new().yellow().apply_to("⚠️ Keep this file secure. It contains your private keys!"));
    println!("Use it with: launch --keys-file {}", path.display());
    Ok(())
}

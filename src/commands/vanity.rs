use crate::key_utils::search_vanity_keypair;
use crate::models::launch::{VanityPattern, VANITY_WARN_LEN};
use anyhow::{anyhow, Context};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use solana_sdk::signature::{write_keypair_file, Signer};
use std::path::Path;
use std::time::Duration;

/// `vanity` command: searches for a matching mint keypair and optionally writes it out.
pub async fn vanity_command(pattern: VanityPattern, max_attempts: u64, outfile: Option<&Path>) -> anyhow::Result<()> {
    pattern.check()?;
    if pattern.text.chars().count() > VANITY_WARN_LEN {
        println!(
            "{} ~{:.0} attempts expected on average",
            style("warning:").yellow().bold(),
            pattern.expected_attempts()
        );
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg} [{elapsed_precise}]")?);
    spinner.set_message(format!("Searching for {} (budget {} attempts)", pattern, max_attempts));
    spinner.enable_steady_tick(Duration::from_millis(120));

    let search_pattern = pattern.clone();
    let result = tokio::task::spawn_blocking(move || search_vanity_keypair(&search_pattern, max_attempts))
        .await
        .context("Vanity search task panicked")?;
    spinner.finish_and_clear();

    let found = result.with_context(|| format!("No address matching {} found", pattern))?;
    println!(
        "{} {} after {} attempts ({:.2}s)",
        style("Found").green().bold(),
        found.keypair.pubkey(),
        found.attempts,
        found.elapsed.as_secs_f64()
    );

    if let Some(path) = outfile {
        write_keypair_file(&found.keypair, path)
            .map_err(|e| anyhow!("Failed to write keypair to {}: {}", path.display(), e))?;
        println!("Keypair saved to {}", path.display());
    }
    Ok(())
}

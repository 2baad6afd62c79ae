use crate::api::jito::{BundleRelay, JitoClient};
use crate::commands::bundle::encode_bundle;
use crate::config::BundlerConfig;
use crate::errors::{BundlerError, Result};
use crate::models::api::RelayBundleStatus;
use crate::utils::BundleTransaction;
use anyhow::Context;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use std::time::Duration;

/// Encodes the ordered bundle and hands it to the relay in one call. With
/// `simulate_first`, a failed relay simulation stops the send.
pub async fn submit_bundle(
    relay: &dyn BundleRelay,
    bundle: &[BundleTransaction],
    simulate_first: bool,
) -> Result<String> {
    let encoded = encode_bundle(bundle)?;
    let roles: Vec<String> = bundle.iter().map(|tx| tx.role.to_string()).collect();
    if simulate_first {
        info!("Simulating bundle of {} transactions", encoded.len());
        relay.simulate_bundle(&encoded).await?;
    }
    info!("Submitting bundle of {} transactions: [{}]", encoded.len(), roles.join(", "));
    relay.send_bundle(&encoded).await
}

/// Polls every `interval` up to `max_attempts` times and returns the first
/// terminal status. Transient relay errors use up an attempt and polling continues.
/// Running out of attempts is `BundleStatusTimeout`: the bundle may still have landed.
pub async fn poll_bundle_status(
    relay: &dyn BundleRelay,
    bundle_id: &str,
    interval: Duration,
    max_attempts: u32,
    mut on_poll: impl FnMut(u32, &str),
) -> Result<RelayBundleStatus> {
    for attempt in 1..=max_attempts {
        match relay.get_bundle_status(bundle_id).await {
            Ok(Some(status)) => {
                debug!("Bundle {} poll {}/{}: {:?}", bundle_id, attempt, max_attempts, status);
                on_poll(attempt, status.label());
                if status.is_terminal() {
                    return Ok(status);
                }
            }
            Ok(None) => on_poll(attempt, "unknown"),
            Err(e) if e.is_transient() => {
                warn!("Bundle status poll {}/{} failed: {}", attempt, max_attempts, e);
                on_poll(attempt, "error");
            }
            Err(e) => return Err(e),
        }
        if attempt < max_attempts {
            tokio::time::sleep(interval).await;
        }
    }
    Err(BundlerError::BundleStatusTimeout { bundle_id: bundle_id.to_string(), attempts: max_attempts })
}

fn print_status(bundle_id: &str, status: Option<&RelayBundleStatus>) {
    println!("----------------------------------------");
    println!("Bundle ID: {}", bundle_id);
    match status {
        Some(RelayBundleStatus::Finalized { slot }) => {
            println!("Status:    {}", style("finalized").green().bold());
            println!("Slot:      {}", slot);
        }
        Some(RelayBundleStatus::Landed { slot, confirmation }) => {
            println!("Status:    {}", style(confirmation).cyan());
            println!("Slot:      {}", slot);
        }
        Some(RelayBundleStatus::Pending) => println!("Status:    {}", style("pending").yellow()),
        Some(RelayBundleStatus::Failed(reason)) => {
            println!("Status:    {}", style("failed").red().bold());
            println!("Reason:    {}", reason);
        }
        None => {
            println!("Status:    {}", style("not found").dim());
            println!("The relay has no record of this bundle yet, or it expired from the status window.");
        }
    }
    println!("----------------------------------------");
}

/// `check-bundle` command: one lookup, or poll until terminal with `wait`.
pub async fn check_bundle_command(config: &BundlerConfig, bundle_ids: Vec<String>, wait: bool) -> anyhow::Result<()> {
    if bundle_ids.is_empty() {
        anyhow::bail!("No bundle IDs provided.");
    }
    let relay = JitoClient::new(&config.relay_url).context("Failed to create relay client")?;

    for bundle_id in &bundle_ids {
        if !wait {
            let status = relay
                .get_bundle_status(bundle_id)
                .await
                .with_context(|| format!("Failed to query status of bundle {}", bundle_id))?;
            print_status(bundle_id, status.as_ref());
            continue;
        }

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
        spinner.enable_steady_tick(Duration::from_millis(120));
        let outcome = poll_bundle_status(
            &relay,
            bundle_id,
            config.poll_interval,
            config.poll_max_attempts,
            |attempt, label| spinner.set_message(format!("{} poll {}: {}", bundle_id, attempt, label)),
        )
        .await;
        spinner.finish_and_clear();

        match outcome {
            Ok(status) => print_status(bundle_id, Some(&status)),
            Err(BundlerError::BundleStatusTimeout { attempts, .. }) => {
                println!(
                    "{}",
                    style(format!("No terminal status for {} after {} polls; it may still land.", bundle_id, attempts))
                        .yellow()
                );
            }
            Err(e) => return Err(e).with_context(|| format!("Polling bundle {} failed", bundle_id)),
        }
    }
    Ok(())
}

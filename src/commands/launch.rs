use crate::api::jito::{resolve_tip_account, BundleRelay, JitoClient};
use crate::api::pumpfun::{resolve_metadata_uri, IpfsMetadataUploader, MetadataUploader};
use crate::commands::alt::{collect_table_addresses, create_table, ensure_table_covers, extend_table, wait_for_activation};
use crate::commands::bundle::{
    assemble_bundle, build_buy_batches, build_operator_buy, plan_buys, verify_signers, BuyPlan,
};
use crate::commands::check_bundle::{poll_bundle_status, submit_bundle};
use crate::commands::create::{build_creation_transaction, CreationParams};
use crate::commands::funding::{distribute_funding, ensure_main_balance};
use crate::commands::simulate::{run_simulated, synthetic_main_wallet};
use crate::commands::validate::print_launch_plan;
use crate::config::BundlerConfig;
use crate::errors::{BundlerError, Result};
use crate::key_utils::search_vanity_keypair;
use crate::models::api::RelayBundleStatus;
use crate::models::launch::{BundleOutcome, LaunchConfig, LaunchResult, TxRole, ValidatedLaunch};
use crate::models::wallet::WalletHandle;
use crate::models::LaunchStatus;
use crate::pump_instruction_builders::{GlobalState, LaunchAccounts, GLOBAL_STATE_PUBKEY};
use crate::state::{InMemoryLaunchStore, JsonFileLaunchStore, LaunchPhase, LaunchState, LaunchStore};
use crate::utils::{format_sol, LedgerClient, RpcLedger};
use crate::wallet::{load_main_wallet, resolve_wallet_set};
use anyhow::Context;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use prettytable::{row, Table};
use solana_sdk::signature::{Keypair, Signer};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};

/// Network-facing collaborators of a live launch.
#[derive(Clone)]
pub struct LiveServices {
    pub ledger: Arc<dyn LedgerClient>,
    pub relay: Arc<dyn BundleRelay>,
    pub uploader: Arc<dyn MetadataUploader>,
}

/// Chosen once, before anything touches the network.
pub enum Execution {
    Live(LiveServices),
    Simulated,
}

impl Execution {
    /// Simulated launches never build the live services. A live launch needs
    /// `enable_live_trading`.
    pub fn select(
        launch: &LaunchConfig,
        config: &BundlerConfig,
        services: impl FnOnce() -> Result<LiveServices>,
    ) -> Result<Self> {
        if launch.simulate {
            return Ok(Execution::Simulated);
        }
        if !config.enable_live_trading {
            return Err(BundlerError::InvalidConfig(
                "live launches are disabled; set enable_live_trading (ENABLE_LIVE_TRADING=true) or use simulation"
                    .to_string(),
            ));
        }
        Ok(Execution::Live(services()?))
    }
}

/// Per-run settings shared by every phase.
pub struct LaunchContext {
    pub config: BundlerConfig,
    pub store: Arc<dyn LaunchStore>,
    pub status: Option<UnboundedSender<LaunchStatus>>,
}

impl LaunchContext {
    pub fn new(config: BundlerConfig, store: Arc<dyn LaunchStore>) -> Self {
        LaunchContext { config, store, status: None }
    }

    pub fn with_status(mut self, sender: UnboundedSender<LaunchStatus>) -> Self {
        self.status = Some(sender);
        self
    }

    pub(crate) fn emit(&self, status: LaunchStatus) {
        if let Some(sender) = &self.status {
            let _ = sender.send(status);
        }
    }
}

/// Owns the launch state and persists it on every phase change.
pub(crate) struct PhaseTracker<'a> {
    ctx: &'a LaunchContext,
    pub state: LaunchState,
}

impl<'a> PhaseTracker<'a> {
    pub fn start(ctx: &'a LaunchContext, simulated: bool) -> Result<Self> {
        let state = LaunchState::new(simulated);
        ctx.store.save(&state)?;
        Ok(PhaseTracker { ctx, state })
    }

    pub fn enter(&mut self, phase: LaunchPhase) -> Result<()> {
        self.state.advance(phase)?;
        self.ctx.store.save(&self.state)?;
        info!("[{}] {:?}", &self.state.launch_id[..8], phase);
        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        self.ctx.store.save(&self.state)
    }

    pub fn emit(&self, status: LaunchStatus) {
        self.ctx.emit(status);
    }

    fn record_failure(&mut self, err: &BundlerError) {
        self.state.last_error = Some(err.to_string());
        if let Err(e) = self.save() {
            warn!("Could not persist failure of launch {}: {}", self.state.launch_id, e);
        }
        self.emit(LaunchStatus::Failure(err.to_string()));
    }
}

/// Runs one launch end to end. Validation runs first in both modes; the
/// execution variant then decides whether any network call is made.
pub async fn run_launch(
    ctx: &LaunchContext,
    execution: &Execution,
    launch: &LaunchConfig,
    main_wallet: &Keypair,
) -> Result<LaunchResult> {
    let mut tracker = PhaseTracker::start(ctx, matches!(execution, Execution::Simulated))?;
    tracker.emit(LaunchStatus::Starting);

    let validated = match launch.validate(ctx.config.fees.fee_headroom_lamports) {
        Ok(v) => v,
        Err(e) => {
            tracker.record_failure(&e);
            return Err(e);
        }
    };
    for warning in &validated.warnings {
        warn!("{}", warning);
    }
    tracker.emit(LaunchStatus::Validated { warnings: validated.warnings.clone() });

    let outcome = match execution {
        Execution::Simulated => run_simulated(&mut tracker, &ctx.config, launch, main_wallet, &validated).await,
        Execution::Live(services) => run_live(&mut tracker, &ctx.config, services, launch, main_wallet, &validated).await,
    };

    match outcome {
        Ok(result) => {
            tracker.emit(LaunchStatus::Completed);
            Ok(result)
        }
        Err(e) => {
            error!("Launch {} failed: {}", tracker.state.launch_id, e);
            tracker.record_failure(&e);
            Err(e)
        }
    }
}

async fn fetch_global_state(ledger: &dyn LedgerClient) -> Result<GlobalState> {
    match ledger.get_account_data(&GLOBAL_STATE_PUBKEY).await? {
        Some(data) => GlobalState::from_account_data(&data),
        None => Err(BundlerError::Build(format!("pump.fun global account {} not found", GLOBAL_STATE_PUBKEY))),
    }
}

async fn run_live(
    tracker: &mut PhaseTracker<'_>,
    config: &BundlerConfig,
    services: &LiveServices,
    launch: &LaunchConfig,
    main_wallet: &Keypair,
    validated: &ValidatedLaunch,
) -> Result<LaunchResult> {
    let ledger = services.ledger.as_ref();

    let mut vanity_attempts = None;
    let mint = match &launch.vanity {
        Some(pattern) => {
            tracker.enter(LaunchPhase::VanitySearch)?;
            tracker.emit(LaunchStatus::VanitySearching(pattern.to_string()));
            let pattern = pattern.clone();
            let budget = config.vanity_max_attempts;
            let found = tokio::task::spawn_blocking(move || search_vanity_keypair(&pattern, budget))
                .await
                .map_err(|e| BundlerError::Invariant(format!("vanity search task failed: {}", e)))??;
            tracker.emit(LaunchStatus::VanityFound { address: found.keypair.pubkey(), attempts: found.attempts });
            vanity_attempts = Some(found.attempts);
            found.keypair
        }
        None => Keypair::new(),
    };
    tracker.state.token_address = Some(mint.pubkey());

    tracker.enter(LaunchPhase::WalletResolution)?;
    let wallets = resolve_wallet_set(launch, &main_wallet.pubkey())?;
    tracker.emit(LaunchStatus::WalletsResolved(wallets.len()));

    // Read-only pre-flight: nothing below this point runs on a short balance.
    ensure_main_balance(ledger, &main_wallet.pubkey(), validated.cost.total_lamports).await?;
    let global = fetch_global_state(ledger).await?;
    let operator = (launch.operator_buy_lamports > 0).then(|| (main_wallet.pubkey(), launch.operator_buy_lamports));
    let plan = plan_buys(&global, &config.fees, &wallets, validated.per_wallet_lamports, operator)?;
    info!("Planned buys total {}", format_sol(plan.total_spend()));

    tracker.emit(LaunchStatus::UploadingMetadata);
    let metadata_uri = resolve_metadata_uri(services.uploader.as_ref(), &launch.token_metadata).await?;
    tracker.state.metadata_uri = Some(metadata_uri.clone());
    tracker.emit(LaunchStatus::MetadataUploaded(metadata_uri.clone()));

    tracker.enter(LaunchPhase::Funding)?;
    let funding_sig =
        distribute_funding(ledger, config, main_wallet, &wallets, validated.per_wallet_lamports).await?;
    tracker.state.funded_wallets = wallets.iter().map(WalletHandle::pubkey).collect();
    tracker.state.record_signature("funding", funding_sig);
    tracker.save()?;
    tracker.emit(LaunchStatus::FundingConfirmed(funding_sig));
    info!(
        "Distributed {} to {} wallets ({} lamports left undistributed)",
        format_sol(validated.cost.distribution_lamports - validated.remainder_lamports),
        wallets.len(),
        validated.remainder_lamports
    );

    let staged = StagedLaunch { mint: &mint, wallets: &wallets, plan: &plan, metadata_uri: &metadata_uri };
    let result = finish_live(tracker, config, services, launch, main_wallet, staged).await;
    let (bundle_id, final_status) = result.map_err(|source| BundlerError::PartialLaunch {
        phase: format!("{:?}", tracker.state.phase),
        funded_wallets: tracker.state.funded_wallets.clone(),
        source: Box::new(source),
    })?;

    Ok(LaunchResult {
        launch_id: tracker.state.launch_id.clone(),
        token_address: mint.pubkey(),
        metadata_uri,
        table_address: tracker.state.table_address.unwrap_or_default(),
        bundle_id,
        phase_signatures: tracker.state.signatures.clone(),
        funded_wallets: tracker.state.funded_wallets.clone(),
        final_status,
        vanity_attempts,
        simulated: false,
    })
}

struct StagedLaunch<'a> {
    mint: &'a Keypair,
    wallets: &'a [WalletHandle],
    plan: &'a BuyPlan,
    metadata_uri: &'a str,
}

/// Everything after funding: table, bundle, submission and polling.
async fn finish_live(
    tracker: &mut PhaseTracker<'_>,
    config: &BundlerConfig,
    services: &LiveServices,
    launch: &LaunchConfig,
    main_wallet: &Keypair,
    staged: StagedLaunch<'_>,
) -> Result<(String, BundleOutcome)> {
    let ledger = services.ledger.as_ref();
    let accounts = LaunchAccounts::derive(&staged.mint.pubkey(), &main_wallet.pubkey());

    tracker.enter(LaunchPhase::TableCreate)?;
    let (table_address, create_sig) = create_table(ledger, config, main_wallet).await?;
    tracker.state.table_address = Some(table_address);
    tracker.state.record_signature("table-create", create_sig);
    tracker.save()?;
    tracker.emit(LaunchStatus::TableCreated(table_address));

    tracker.enter(LaunchPhase::TablePopulate)?;
    let addresses = collect_table_addresses(&accounts, staged.wallets, &main_wallet.pubkey());
    let extend_sigs = extend_table(ledger, config, main_wallet, table_address, &addresses, |chunk, count| {
        tracker.emit(LaunchStatus::TableExtended { chunk, addresses: count })
    })
    .await?;
    for (i, sig) in extend_sigs.iter().enumerate() {
        tracker.state.record_signature(format!("table-extend[{}]", i), sig);
    }
    tracker.save()?;

    tracker.enter(LaunchPhase::TableActive)?;
    let table = wait_for_activation(ledger, config, table_address, &addresses).await?;
    ensure_table_covers(&table, &addresses)?;
    tracker.emit(LaunchStatus::TableActive(table_address));

    tracker.enter(LaunchPhase::Compose)?;
    let tip_account = resolve_tip_account(services.relay.as_ref(), config.tip_account).await;
    let blockhash = ledger.get_latest_blockhash().await?;
    tracker.emit(LaunchStatus::PreparingTx(TxRole::Creation.to_string()));
    let creation = build_creation_transaction(
        config,
        main_wallet,
        staged.mint,
        &CreationParams {
            metadata: &launch.token_metadata,
            metadata_uri: staged.metadata_uri,
            tip_account,
            tip_lamports: launch.relay_tip_lamports,
        },
        blockhash,
    )?;
    verify_signers(&creation, &[main_wallet.pubkey(), staged.mint.pubkey()])?;

    tracker.enter(LaunchPhase::Batch)?;
    let batches = build_buy_batches(config, &accounts, staged.wallets, &staged.plan.wallet_quotes, &table, blockhash)?;
    let operator_buy = match &staged.plan.operator_quote {
        Some(quote) => {
            tracker.emit(LaunchStatus::PreparingTx(TxRole::OperatorBuy.to_string()));
            let tx = build_operator_buy(config, &accounts, main_wallet, quote, &table, blockhash)?;
            verify_signers(&tx, &[main_wallet.pubkey()])?;
            Some(tx)
        }
        None => None,
    };

    tracker.enter(LaunchPhase::Assemble)?;
    let bundle = assemble_bundle(creation, batches, operator_buy)?;

    tracker.enter(LaunchPhase::Submit)?;
    tracker.emit(LaunchStatus::SubmittingBundle(bundle.len()));
    let bundle_id = submit_bundle(services.relay.as_ref(), &bundle, config.simulate_bundle_before_send).await?;
    tracker.state.bundle_id = Some(bundle_id.clone());
    for tx in &bundle {
        if let Some(sig) = tx.signature() {
            tracker.state.record_signature(tx.role.to_string(), sig);
        }
    }
    tracker.save()?;
    tracker.emit(LaunchStatus::BundleSubmitted(bundle_id.clone()));

    tracker.enter(LaunchPhase::Poll)?;
    let polled = poll_bundle_status(
        services.relay.as_ref(),
        &bundle_id,
        config.poll_interval,
        config.poll_max_attempts,
        |attempt, label| tracker.emit(LaunchStatus::BundlePolled { attempt, status: label.to_string() }),
    )
    .await;

    match polled {
        Ok(RelayBundleStatus::Finalized { slot }) => {
            tracker.enter(LaunchPhase::Finalized)?;
            tracker.emit(LaunchStatus::BundleLanded(bundle_id.clone(), "finalized".to_string()));
            info!("Bundle {} finalized in slot {}", bundle_id, slot);
            Ok((bundle_id, BundleOutcome::Finalized { slot }))
        }
        Ok(RelayBundleStatus::Failed(reason)) => {
            tracker.enter(LaunchPhase::Failed)?;
            tracker.state.last_error = Some(reason.clone());
            tracker.save()?;
            warn!("Bundle {} failed: {}", bundle_id, reason);
            Ok((bundle_id, BundleOutcome::Failed(reason)))
        }
        Ok(other) => Err(BundlerError::Invariant(format!("polling returned non-terminal status {:?}", other))),
        Err(e @ BundlerError::BundleStatusTimeout { .. }) => {
            tracker.enter(LaunchPhase::StatusTimeout)?;
            Err(e)
        }
        Err(e) => Err(e),
    }
}

fn describe(status: &LaunchStatus) -> Option<String> {
    Some(match status {
        LaunchStatus::Starting => "Starting launch".to_string(),
        LaunchStatus::Validated { warnings } => format!("Configuration valid ({} warning(s))", warnings.len()),
        LaunchStatus::VanitySearching(pattern) => format!("Searching for vanity address {}", pattern),
        LaunchStatus::VanityFound { address, attempts } => format!("Vanity address {} ({} attempts)", address, attempts),
        LaunchStatus::WalletsResolved(n) => format!("{} purchasing wallets ready", n),
        LaunchStatus::UploadingMetadata => "Uploading metadata".to_string(),
        LaunchStatus::MetadataUploaded(uri) => format!("Metadata at {}", uri),
        LaunchStatus::FundingConfirmed(sig) => format!("Funding confirmed {}", sig),
        LaunchStatus::TableCreated(table) => format!("Lookup table {} created", table),
        LaunchStatus::TableExtended { chunk, addresses } => {
            format!("Lookup table chunk {} written ({} addresses)", chunk + 1, addresses)
        }
        LaunchStatus::TableActive(table) => format!("Lookup table {} active", table),
        LaunchStatus::PreparingTx(role) => format!("Building {}", role),
        LaunchStatus::SubmittingBundle(n) => format!("Submitting bundle of {} transactions", n),
        LaunchStatus::BundleSubmitted(id) => format!("Bundle {} accepted by relay", id),
        LaunchStatus::BundlePolled { attempt, status } => format!("Bundle status poll {}: {}", attempt, status),
        LaunchStatus::BundleLanded(id, confirmation) => format!("Bundle {} {}", id, confirmation),
        LaunchStatus::SimulatedOnly(id) => format!("Simulated bundle {}", id),
        LaunchStatus::Completed | LaunchStatus::Failure(_) => return None,
    })
}

fn print_result(result: &LaunchResult) {
    let mut table = Table::new();
    table.add_row(row![b -> "Field", b -> "Value"]);
    table.add_row(row!["Launch ID", result.launch_id]);
    table.add_row(row!["Token", result.token_address]);
    table.add_row(row!["Metadata", result.metadata_uri]);
    table.add_row(row!["Lookup table", result.table_address]);
    table.add_row(row!["Bundle ID", result.bundle_id]);
    table.add_row(row!["Status", result.final_status]);
    if let Some(attempts) = result.vanity_attempts {
        table.add_row(row!["Vanity attempts", attempts]);
    }
    for sig in &result.phase_signatures {
        table.add_row(row![sig.phase, sig.signature]);
    }
    table.printstd();

    match &result.final_status {
        BundleOutcome::Finalized { .. } => println!("{}", style("Launch finalized.").green().bold()),
        BundleOutcome::Simulated => println!("{}", style("Simulation only: nothing was sent.").cyan().bold()),
        BundleOutcome::Failed(_) => {
            println!("{}", style("Bundle failed. Purchasing wallets were funded; recovery is manual:").red().bold());
            for wallet in &result.funded_wallets {
                println!("  {}", wallet);
            }
        }
    }
}

/// `launch` command: plan, confirm the mode, run, and report.
pub async fn launch_command(config: BundlerConfig, launch: LaunchConfig) -> anyhow::Result<()> {
    let main_wallet = if !config.main_wallet_private_key.trim().is_empty() {
        load_main_wallet(&config.main_wallet_private_key).context("Failed to load main wallet")?
    } else if launch.simulate {
        println!("{}", style("No main wallet configured; simulating with a synthetic one.").yellow());
        synthetic_main_wallet(&launch)?
    } else {
        anyhow::bail!("main_wallet_private_key is not set (settings file or BUNDLER_MAIN_WALLET_KEY)");
    };
    info!("Main wallet: {}", main_wallet.pubkey());

    let validated = launch.validate(config.fees.fee_headroom_lamports)?;
    print_launch_plan(&launch, &validated);

    let rpc_url = launch.network_endpoint.clone().unwrap_or_else(|| config.rpc_url.clone());
    let execution = Execution::select(&launch, &config, || {
        Ok(LiveServices {
            ledger: Arc::new(RpcLedger::new(rpc_url, config.get_commitment_config()?, config.confirm_timeout)),
            relay: Arc::new(JitoClient::new(&config.relay_url)?),
            uploader: Arc::new(IpfsMetadataUploader::new(config.ipfs_api_url.clone())),
        })
    })?;

    let store: Arc<dyn LaunchStore> = match JsonFileLaunchStore::in_config_dir() {
        Ok(store) => Arc::new(store),
        Err(e) => {
            warn!("Launch state will not be persisted: {}", e);
            Arc::new(InMemoryLaunchStore::new())
        }
    };

    let (sender, mut receiver) = unbounded_channel();
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg} [{elapsed_precise}]")?);
    spinner.enable_steady_tick(Duration::from_millis(120));
    let progress = spinner.clone();
    let reporter = tokio::spawn(async move {
        while let Some(status) = receiver.recv().await {
            if let Some(message) = describe(&status) {
                progress.set_message(message);
            }
        }
    });

    let ctx = LaunchContext::new(config, store).with_status(sender);
    let outcome = run_launch(&ctx, &execution, &launch, &main_wallet).await;
    drop(ctx);
    let _ = reporter.await;
    spinner.finish_and_clear();

    match outcome {
        Ok(result) => {
            print_result(&result);
            Ok(())
        }
        Err(BundlerError::PartialLaunch { phase, funded_wallets, source }) => {
            println!("{}", style("Funds distributed, bundle not finalized. Recovery is manual.").red().bold());
            println!("Failed during {}: {}", phase, source);
            for wallet in &funded_wallets {
                println!("  funded: {}", wallet);
            }
            Err(anyhow::anyhow!("launch failed after funding during {}: {}", phase, source))
        }
        Err(e) => Err(e).context("Launch failed before any funds moved"),
    }
}

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use env_logger::Env;
use log::info;
use solana_pumpfun_bundler::commands::{
    check_bundle_command, generate_wallets_command, launch_command, validate_command, vanity_command,
};
use solana_pumpfun_bundler::config::BundlerConfig;
use solana_pumpfun_bundler::models::launch::{LaunchConfig, VanityPattern, WalletSourceMode};
use solana_pumpfun_bundler::models::token::TokenMetadata;
use solana_pumpfun_bundler::wallet::load_wallet_secrets_from_file;
use solana_sdk::native_token::sol_to_lamports;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "pumpfun-bundler",
    version,
    about = "Launch a pump.fun token and land first-block buys from many wallets in one Jito bundle",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Optional: path to the settings file (defaults to ~/.pumpfun-bundler/app_settings.json).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the token and submit the bundle (or dry-run it with --simulate)
    Launch(LaunchArgs),
    /// Check a launch configuration offline and print the plan and cost
    Validate(LaunchArgs),
    /// Search for a mint keypair whose address starts or ends with a pattern
    Vanity {
        /// Address prefix to match (case-sensitive, base58)
        #[arg(long, conflicts_with = "suffix", required_unless_present = "suffix")]
        prefix: Option<String>,
        /// Address suffix to match (case-sensitive, base58)
        #[arg(long)]
        suffix: Option<String>,
        /// Attempt budget (defaults to the configured vanity_max_attempts)
        #[arg(long)]
        max_attempts: Option<u64>,
        /// Write the keypair as a JSON byte array to this file
        #[arg(long, short)]
        outfile: Option<PathBuf>,
    },
    /// Check the status of one or more Jito bundles
    CheckBundle(CheckBundleArgs),
    /// Manage purchasing wallets
    #[command(subcommand)]
    Wallets(WalletsCommands),
}

#[derive(Args, Debug)]
struct LaunchArgs {
    /// Token name
    #[arg(long)]
    name: String,
    /// Token symbol (ticker)
    #[arg(long)]
    symbol: String,
    /// Token description
    #[arg(long, default_value = "")]
    description: String,
    /// Token image path or URL
    #[arg(long)]
    image: Option<String>,
    #[arg(long)]
    twitter: Option<String>,
    #[arg(long)]
    telegram: Option<String>,
    #[arg(long)]
    website: Option<String>,
    /// Pre-uploaded metadata URI; skips the upload
    #[arg(long)]
    metadata_uri: Option<String>,
    /// SOL distributed across all purchasing wallets
    #[arg(long)]
    total_funding: f64,
    /// Number of purchasing wallets (1-21)
    #[arg(short, long, default_value_t = 5)]
    wallet_count: usize,
    /// SOL the main wallet buys after the purchasing wallets
    #[arg(long, default_value_t = 0.0)]
    operator_buy: f64,
    /// Relay tip (SOL)
    #[arg(long, default_value_t = 0.001)]
    jito_tip: f64,
    /// Token address must start with this
    #[arg(long, conflicts_with = "vanity_suffix")]
    vanity_prefix: Option<String>,
    /// Token address must end with this
    #[arg(long)]
    vanity_suffix: Option<String>,
    /// Import purchasing wallets from a keys file instead of generating them
    #[arg(long)]
    keys_file: Option<PathBuf>,
    /// RPC endpoint for this launch (overrides settings)
    #[arg(long)]
    rpc_url: Option<String>,
    /// Build and sign everything offline; send nothing
    #[arg(long)]
    simulate: bool,
}

#[derive(Parser, Debug)]
struct CheckBundleArgs {
    /// One or more Jito bundle IDs (max 5)
    #[clap(required = true, num_args = 1..=5)]
    bundle_ids: Vec<String>,

    /// Poll until the bundle reaches a terminal status
    #[clap(long)]
    wait: bool,
}

#[derive(Subcommand, Debug)]
enum WalletsCommands {
    /// Generate purchasing wallets into a timestamped keys file
    Generate {
        #[arg(short, long, default_value_t = 5)]
        count: usize,
        /// Output directory
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },
}

fn sol_arg(name: &str, sol: f64) -> Result<u64> {
    if !sol.is_finite() || sol < 0.0 {
        return Err(anyhow!("--{} must be a non-negative SOL amount, got {}", name, sol));
    }
    Ok(sol_to_lamports(sol))
}

fn build_launch_config(args: LaunchArgs, simulate: bool) -> Result<LaunchConfig> {
    let vanity = match (args.vanity_prefix, args.vanity_suffix) {
        (Some(prefix), _) => Some(VanityPattern::prefix(prefix)),
        (None, Some(suffix)) => Some(VanityPattern::suffix(suffix)),
        (None, None) => None,
    };
    let (wallet_source, imported_wallet_secrets) = match &args.keys_file {
        Some(path) => (
            WalletSourceMode::Import,
            load_wallet_secrets_from_file(path).with_context(|| format!("Failed to read {}", path.display()))?,
        ),
        None => (WalletSourceMode::Generate, Vec::new()),
    };

    let mut token_metadata = TokenMetadata::new(args.name, args.symbol, args.description);
    token_metadata.image = args.image;
    token_metadata.twitter = args.twitter;
    token_metadata.telegram = args.telegram;
    token_metadata.website = args.website;
    token_metadata.metadata_uri = args.metadata_uri;

    Ok(LaunchConfig {
        total_funding_lamports: sol_arg("total-funding", args.total_funding)?,
        wallet_count: args.wallet_count,
        operator_buy_lamports: sol_arg("operator-buy", args.operator_buy)?,
        relay_tip_lamports: sol_arg("jito-tip", args.jito_tip)?,
        vanity,
        wallet_source,
        imported_wallet_secrets,
        network_endpoint: args.rpc_url,
        token_metadata,
        simulate,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = BundlerConfig::load(cli.settings.as_deref()).context("Failed to load configuration")?;
    info!("Starting pumpfun-bundler (relay {})", config.relay_url);

    match cli.command {
        Commands::Launch(args) => {
            let simulate = args.simulate;
            let launch = build_launch_config(args, simulate)?;
            launch_command(config, launch).await?;
        }
        Commands::Validate(args) => {
            let simulate = args.simulate;
            let launch = build_launch_config(args, simulate)?;
            validate_command(&config, &launch)?;
        }
        Commands::Vanity { prefix, suffix, max_attempts, outfile } => {
            let pattern = match (prefix, suffix) {
                (Some(p), _) => VanityPattern::prefix(p),
                (None, Some(s)) => VanityPattern::suffix(s),
                (None, None) => return Err(anyhow!("either --prefix or --suffix is required")),
            };
            vanity_command(pattern, max_attempts.unwrap_or(config.vanity_max_attempts), outfile.as_deref()).await?;
        }
        Commands::CheckBundle(args) => {
            check_bundle_command(&config, args.bundle_ids, args.wait).await?;
        }
        Commands::Wallets(WalletsCommands::Generate { count, dir }) => {
            generate_wallets_command(&dir, count)?;
        }
    }

    Ok(())
}

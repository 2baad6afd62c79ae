use crate::config::BundlerConfig;
use crate::models::launch::{LaunchConfig, ValidatedLaunch, MAX_WALLETS_PER_BATCH};
use crate::utils::format_sol;
use console::style;
use prettytable::{row, Table};

/// Prints the launch plan: amounts, bundle shape and the cost breakdown.
pub fn print_launch_plan(launch: &LaunchConfig, validated: &ValidatedLaunch) {
    let mut table = Table::new();
    table.add_row(row![b -> "Item", b -> "Value"]);
    table.add_row(row!["Token", format!("{} ({})", launch.token_metadata.name, launch.token_metadata.symbol)]);
    table.add_row(row!["Wallets", launch.wallet_count]);
    table.add_row(row!["Per wallet", format_sol(validated.per_wallet_lamports)]);
    table.add_row(row!["Undistributed remainder", format!("{} lamports", validated.remainder_lamports)]);
    table.add_row(row![
        "Buy batches",
        format!("{} (up to {} wallets each)", validated.batch_count, MAX_WALLETS_PER_BATCH)
    ]);
    table.add_row(row!["Bundle transactions", launch.bundle_transaction_count()]);
    table.add_row(row![
        "Vanity",
        launch.vanity.as_ref().map(|p| p.to_string()).unwrap_or_else(|| "-".to_string())
    ]);
    table.add_row(row!["Mode", if launch.simulate { "simulation" } else { "live" }]);
    table.printstd();

    let cost = &validated.cost;
    let mut costs = Table::new();
    costs.add_row(row![b -> "Cost", b -> "SOL"]);
    costs.add_row(row!["Distribution", format_sol(cost.distribution_lamports)]);
    costs.add_row(row!["Operator buy", format_sol(cost.operator_buy_lamports)]);
    costs.add_row(row!["Relay tip", format_sol(cost.relay_tip_lamports)]);
    costs.add_row(row!["Network fee headroom", format_sol(cost.fee_headroom_lamports)]);
    costs.add_row(row![b -> "Total required", b -> format_sol(cost.total_lamports)]);
    costs.printstd();

    for warning in &validated.warnings {
        println!("{} {}", style("warning:").yellow().bold(), warning);
    }
}

/// `validate` command: checks the configuration offline and prints the plan.
pub fn validate_command(config: &BundlerConfig, launch: &LaunchConfig) -> anyhow::Result<()> {
    match launch.validate(config.fees.fee_headroom_lamports) {
        Ok(validated) => {
            print_launch_plan(launch, &validated);
            println!("{}", style("Configuration is valid.").green().bold());
            Ok(())
        }
        Err(e) => {
            println!("{} {}", style("invalid:").red().bold(), e);
            Err(e.into())
        }
    }
}

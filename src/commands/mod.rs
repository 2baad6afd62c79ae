pub mod alt;
pub mod bundle;
pub mod check_bundle;
pub mod create;
pub mod funding;
pub mod launch;
pub mod simulate;
pub mod validate;
pub mod vanity;
pub mod wallets;

pub use check_bundle::{check_bundle_command, poll_bundle_status, submit_bundle};
pub use launch::{launch_command, run_launch, Execution, LaunchContext, LiveServices};
pub use validate::validate_command;
pub use vanity::vanity_command;
pub use wallets::generate_wallets_command;

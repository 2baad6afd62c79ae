pub mod api;
pub mod commands;
pub mod config;
pub mod errors;
pub mod key_utils;
pub mod models;
pub mod pump_instruction_builders;
pub mod state;
pub mod utils;
pub mod wallet;

pub use commands::launch::{run_launch, Execution, LaunchContext, LiveServices};
pub use errors::{BundlerError, Result};
pub use models::launch::{LaunchConfig, LaunchResult};

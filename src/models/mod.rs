pub mod api;
pub mod launch;
pub mod settings;
pub mod token;
pub mod wallet;

use solana_sdk::{pubkey::Pubkey, signature::Signature};

/// Progress updates streamed to the caller while a launch runs.
#[derive(Debug, Clone)]
pub enum LaunchStatus {
    Starting,
    Validated { warnings: Vec<String> },
    VanitySearching(String), // pattern
    VanityFound { address: Pubkey, attempts: u64 },
    WalletsResolved(usize),
    UploadingMetadata,
    MetadataUploaded(String), // URI
    FundingConfirmed(Signature),
    TableCreated(Pubkey),
    TableExtended { chunk: usize, addresses: usize },
    TableActive(Pubkey),
    PreparingTx(String), // role label
    SubmittingBundle(usize), // transaction count
    BundleSubmitted(String), // bundle id
    BundlePolled { attempt: u32, status: String },
    BundleLanded(String, String), // bundle id, confirmation status
    SimulatedOnly(String),
    Completed,
    Failure(String),
}

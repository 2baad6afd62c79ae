use thiserror::Error;
use solana_client::client_error::ClientError;
use solana_sdk::message::CompileError;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::SignerError;

#[derive(Error, Debug)]
pub enum BundlerError {
    #[error("Invalid launch configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid wallet secret at index {index}: {reason}")]
    InvalidWalletSecret { index: usize, reason: String },

    #[error("Insufficient balance: required {required} lamports, available {available} lamports")]
    InsufficientBalance { required: u64, available: u64 },

    #[error("Vanity search for '{pattern}' exhausted its budget of {attempts} attempts")]
    VanityTimeout { pattern: String, attempts: u64 },

    #[error("Lookup table {0} is not active yet")]
    LookupTableNotActive(Pubkey),

    #[error("Relay rejected bundle: {0}")]
    BundleRejected(String),

    #[error("Bundle {bundle_id} status unknown after {attempts} polls (it may still land)")]
    BundleStatusTimeout { bundle_id: String, attempts: u32 },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Instruction building error: {0}")]
    Build(String),

    #[error("Curve calculation error: {0}")]
    Calculation(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Signer error: {0}")]
    Signer(#[from] SignerError),

    #[error("Message compile error: {0}")]
    MessageCompile(#[from] CompileError),

    #[error("Metadata upload error: {0}")]
    Metadata(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Invariant condition violated: {0}")]
    Invariant(String),

    #[error(
        "funds distributed, bundle not finalized: recovery is manual \
         (failed during {phase}, {} funded wallet(s)): {source}",
        funded_wallets.len()
    )]
    PartialLaunch {
        phase: String,
        funded_wallets: Vec<Pubkey>,
        #[source]
        source: Box<BundlerError>,
    },
}

impl BundlerError {
    /// Read-only calls may be retried on this error; state-changing calls may not.
    pub fn is_transient(&self) -> bool {
        matches!(self, BundlerError::Network(_))
    }
}

pub type Result<T> = std::result::Result<T, BundlerError>;

impl From<ClientError> for BundlerError {
    fn from(err: ClientError) -> Self {
        BundlerError::Network(err.to_string())
    }
}

impl From<reqwest::Error> for BundlerError {
    fn from(err: reqwest::Error) -> Self {
        BundlerError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for BundlerError {
    fn from(err: serde_json::Error) -> Self {
        BundlerError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for BundlerError {
    fn from(err: std::io::Error) -> Self {
        BundlerError::Io(err.to_string())
    }
}

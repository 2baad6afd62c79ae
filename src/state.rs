use crate::errors::{BundlerError, Result};
use crate::models::launch::PhaseSignature;
use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use uuid::Uuid;

/// Launch state machine. Variants are declared in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LaunchPhase {
    Init,
    VanitySearch,
    WalletResolution,
    Funding,
    TableCreate,
    TablePopulate,
    TableActive,
    Compose,
    Batch,
    Assemble,
    Submit,
    Poll,
    Finalized,
    Failed,
    StatusTimeout,
    Simulated,
}

impl LaunchPhase {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            LaunchPhase::Finalized | LaunchPhase::Failed | LaunchPhase::StatusTimeout | LaunchPhase::Simulated
        )
    }

    /// True once the funding transfer may have reached the ledger.
    pub fn funds_committed(self) -> bool {
        self >= LaunchPhase::Funding && self != LaunchPhase::Simulated
    }
}

/// Public, secret-free record of one launch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchState {
    pub launch_id: String,
    pub phase: LaunchPhase,
    pub simulated: bool,
    pub token_address: Option<Pubkey>,
    pub metadata_uri: Option<String>,
    pub table_address: Option<Pubkey>,
    pub funded_wallets: Vec<Pubkey>,
    pub signatures: Vec<PhaseSignature>,
    pub bundle_id: Option<String>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LaunchState {
    pub fn new(simulated: bool) -> Self {
        let now = Utc::now();
        LaunchState {
            launch_id: Uuid::new_v4().to_string(),
            phase: LaunchPhase::Init,
            simulated,
            token_address: None,
            metadata_uri: None,
            table_address: None,
            funded_wallets: Vec::new(),
            signatures: Vec::new(),
            bundle_id: None,
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Moves to `next`. Going backwards, or leaving a terminal phase, is an invariant violation.
    pub fn advance(&mut self, next: LaunchPhase) -> Result<()> {
        if self.phase.is_terminal() || next < self.phase {
            return Err(BundlerError::Invariant(format!(
                "launch {} cannot move from {:?} to {:?}",
                self.launch_id, self.phase, next
            )));
        }
        debug!("Launch {}: {:?} -> {:?}", self.launch_id, self.phase, next);
        self.phase = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn record_signature(&mut self, phase: impl Into<String>, signature: impl ToString) {
        self.signatures.push(PhaseSignature { phase: phase.into(), signature: signature.to_string() });
        self.updated_at = Utc::now();
    }
}

/// Persists launch state between phases.
pub trait LaunchStore: Send + Sync {
    fn save(&self, state: &LaunchState) -> Result<()>;
    fn load(&self, launch_id: &str) -> Result<Option<LaunchState>>;
}

#[derive(Default)]
pub struct InMemoryLaunchStore {
    states: Mutex<HashMap<String, LaunchState>>,
}

impl InMemoryLaunchStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LaunchStore for InMemoryLaunchStore {
    fn save(&self, state: &LaunchState) -> Result<()> {
        let mut states = self
            .states
            .lock()
            .map_err(|_| BundlerError::Invariant("launch store lock poisoned".to_string()))?;
        states.insert(state.launch_id.clone(), state.clone());
        Ok(())
    }

    fn load(&self, launch_id: &str) -> Result<Option<LaunchState>> {
        let states = self
            .states
            .lock()
            .map_err(|_| BundlerError::Invariant("launch store lock poisoned".to_string()))?;
        Ok(states.get(launch_id).cloned())
    }
}

/// One pretty-printed JSON file per launch.
pub struct JsonFileLaunchStore {
    dir: PathBuf,
}

impl JsonFileLaunchStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(JsonFileLaunchStore { dir })
    }

    /// Store under `~/.pumpfun-bundler/launches`.
    pub fn in_config_dir() -> Result<Self> {
        Self::new(crate::config::get_config_dir().join("launches"))
    }

    fn path_for(&self, launch_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", launch_id))
    }
}

impl LaunchStore for JsonFileLaunchStore {
    fn save(&self, state: &LaunchState) -> Result<()> {
        let json = serde_json::to_string_pretty(state)?;
        fs::write(self.path_for(&state.launch_id), json)?;
        Ok(())
    }

    fn load(&self, launch_id: &str) -> Result<Option<LaunchState>> {
        let path = self.path_for(launch_id);
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&contents)?))
    }
}

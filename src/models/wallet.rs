use serde::{Deserialize, Serialize};
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
};
use std::fmt;

/// Keys file layout: `{"wallets":[{"public_key": "...", "private_key": "..."}]}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletKeys {
    pub wallets: Vec<WalletInfo>,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct WalletInfo {
    pub public_key: String,
    pub private_key: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl fmt::Debug for WalletInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletInfo")
            .field("public_key", &self.public_key)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// A purchasing wallet for one launch. Lives only in memory.
pub struct WalletHandle {
    keypair: Keypair,
    pubkey: Pubkey,
}

impl WalletHandle {
    pub fn new(keypair: Keypair) -> Self {
        let pubkey = keypair.pubkey();
        WalletHandle { keypair, pubkey }
    }

    pub fn pubkey(&self) -> Pubkey {
        self.pubkey
    }

    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }
}

impl fmt::Debug for WalletHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WalletHandle({})", self.pubkey)
    }
}

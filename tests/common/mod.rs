#![allow(dead_code)]

use async_trait::async_trait;
use borsh::BorshSerialize;
use solana_pumpfun_bundler::api::{BundleRelay, MetadataUploader};
use solana_pumpfun_bundler::commands::{Execution, LaunchContext, LiveServices};
use solana_pumpfun_bundler::config::BundlerConfig;
use solana_pumpfun_bundler::errors::{BundlerError, Result};
use solana_pumpfun_bundler::models::api::RelayBundleStatus;
use solana_pumpfun_bundler::models::launch::{LaunchConfig, WalletSourceMode};
use solana_pumpfun_bundler::models::token::TokenMetadata;
use solana_pumpfun_bundler::pump_instruction_builders::{GlobalState, GLOBAL_STATE_PUBKEY};
use solana_pumpfun_bundler::state::InMemoryLaunchStore;
use solana_pumpfun_bundler::utils::LedgerClient;
use solana_sdk::address_lookup_table::{
    self,
    instruction::ProgramInstruction,
    state::{AddressLookupTable, LookupTableMeta},
};
use solana_sdk::{
    hash::Hash,
    native_token::LAMPORTS_PER_SOL,
    pubkey::Pubkey,
    signature::Signature,
    transaction::VersionedTransaction,
};
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// In-memory ledger that understands lookup-table create/extend instructions.
pub struct FakeLedger {
    balance: u64,
    slot: Mutex<u64>,
    /// When set, the slot never advances, so no lookup table ever activates.
    pub frozen_slot: AtomicBool,
    accounts: Mutex<HashMap<Pubkey, Vec<u8>>>,
    pub sent: Mutex<Vec<VersionedTransaction>>,
    pub reads: AtomicUsize,
    pub sends: AtomicUsize,
}

impl FakeLedger {
    pub fn with_balance(balance: u64) -> Self {
        let mut global = vec![0xa7, 0xe8, 0xe8, 0xb1, 0xc8, 0x6c, 0x72, 0x7f];
        GlobalState::pump_defaults().serialize(&mut global).unwrap();
        let mut accounts = HashMap::new();
        accounts.insert(GLOBAL_STATE_PUBKEY, global);
        FakeLedger {
            balance,
            slot: Mutex::new(1_000),
            frozen_slot: AtomicBool::new(false),
            accounts: Mutex::new(accounts),
            sent: Mutex::new(Vec::new()),
            reads: AtomicUsize::new(0),
            sends: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.reads.load(Ordering::SeqCst) + self.sends.load(Ordering::SeqCst)
    }

    fn current_slot(&self) -> u64 {
        *self.slot.lock().unwrap()
    }

    fn apply_table_instruction(&self, keys: &[Pubkey], accounts: &[u8], data: &[u8]) {
        let table_key = keys[accounts[0] as usize];
        let authority = keys[accounts[1] as usize];
        let slot = self.current_slot();
        let mut store = self.accounts.lock().unwrap();
        match bincode::deserialize::<ProgramInstruction>(data).unwrap() {
            ProgramInstruction::CreateLookupTable { .. } => {
                let table = AddressLookupTable { meta: LookupTableMeta::new(authority), addresses: Cow::Owned(vec![]) };
                store.insert(table_key, table.serialize_for_tests().unwrap());
            }
            ProgramInstruction::ExtendLookupTable { new_addresses } => {
                let existing = store.get(&table_key).expect("extend before create");
                let table = AddressLookupTable::deserialize(existing).unwrap();
                let mut meta = table.meta.clone();
                let mut addresses = table.addresses.to_vec();
                meta.last_extended_slot = slot;
                meta.last_extended_slot_start_index = addresses.len() as u8;
                addresses.extend(new_addresses);
                let updated = AddressLookupTable { meta, addresses: Cow::Owned(addresses) };
                store.insert(table_key, updated.serialize_for_tests().unwrap());
            }
            other => panic!("unexpected lookup table instruction {:?}", other),
        }
    }
}

#[async_trait]
impl LedgerClient for FakeLedger {
    async fn get_balance(&self, _pubkey: &Pubkey) -> Result<u64> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.balance)
    }

    async fn get_slot(&self) -> Result<u64> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let mut slot = self.slot.lock().unwrap();
        if !self.frozen_slot.load(Ordering::SeqCst) {
            *slot += 1;
        }
        Ok(*slot)
    }

    async fn get_latest_blockhash(&self) -> Result<Hash> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(Hash::new_unique())
    }

    async fn get_account_data(&self, pubkey: &Pubkey) -> Result<Option<Vec<u8>>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.accounts.lock().unwrap().get(pubkey).cloned())
    }

    async fn send_and_confirm(&self, transaction: &VersionedTransaction) -> Result<Signature> {
        self.sends.fetch_add(1, Ordering::SeqCst);
        let keys = transaction.message.static_account_keys();
        for ix in transaction.message.instructions() {
            if keys[ix.program_id_index as usize] == address_lookup_table::program::id() {
                self.apply_table_instruction(keys, &ix.accounts, &ix.data);
            }
        }
        self.sent.lock().unwrap().push(transaction.clone());
        Ok(transaction.signatures[0])
    }
}

/// Relay returning scripted statuses; `Pending` once the script runs out.
pub struct FakeRelay {
    statuses: Mutex<Vec<RelayBundleStatus>>,
    pub submitted: Mutex<Vec<Vec<String>>>,
    pub simulated: Mutex<Vec<Vec<String>>>,
    pub rejection: Mutex<Option<String>>,
    pub simulation_failure: Mutex<Option<String>>,
    pub tip_accounts: Mutex<Option<Vec<Pubkey>>>,
    pub sends: AtomicUsize,
    pub polls: AtomicUsize,
    pub simulations: AtomicUsize,
    pub tip_fetches: AtomicUsize,
}

impl FakeRelay {
    pub fn scripted(mut statuses: Vec<RelayBundleStatus>) -> Self {
        statuses.reverse();
        FakeRelay {
            statuses: Mutex::new(statuses),
            submitted: Mutex::new(Vec::new()),
            simulated: Mutex::new(Vec::new()),
            rejection: Mutex::new(None),
            simulation_failure: Mutex::new(None),
            tip_accounts: Mutex::new(None),
            sends: AtomicUsize::new(0),
            polls: AtomicUsize::new(0),
            simulations: AtomicUsize::new(0),
            tip_fetches: AtomicUsize::new(0),
        }
    }

    pub fn reject_sends(&self, reason: &str) {
        *self.rejection.lock().unwrap() = Some(reason.to_string());
    }

    pub fn fail_simulation(&self, reason: &str) {
        *self.simulation_failure.lock().unwrap() = Some(reason.to_string());
    }

    pub fn offer_tip_accounts(&self, accounts: Vec<Pubkey>) {
        *self.tip_accounts.lock().unwrap() = Some(accounts);
    }

    pub fn calls(&self) -> usize {
        self.sends.load(Ordering::SeqCst)
            + self.polls.load(Ordering::SeqCst)
            + self.simulations.load(Ordering::SeqCst)
            + self.tip_fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BundleRelay for FakeRelay {
    async fn send_bundle(&self, encoded_transactions: &[String]) -> Result<String> {
        self.sends.fetch_add(1, Ordering::SeqCst);
        if encoded_transactions.is_empty() {
            return Err(BundlerError::BundleRejected("empty".to_string()));
        }
        if let Some(reason) = self.rejection.lock().unwrap().clone() {
            return Err(BundlerError::BundleRejected(reason));
        }
        self.submitted.lock().unwrap().push(encoded_transactions.to_vec());
        Ok("fake-bundle-1".to_string())
    }

    async fn get_bundle_status(&self, _bundle_id: &str) -> Result<Option<RelayBundleStatus>> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        Ok(Some(self.statuses.lock().unwrap().pop().unwrap_or(RelayBundleStatus::Pending)))
    }

    async fn simulate_bundle(&self, encoded_transactions: &[String]) -> Result<()> {
        self.simulations.fetch_add(1, Ordering::SeqCst);
        self.simulated.lock().unwrap().push(encoded_transactions.to_vec());
        match self.simulation_failure.lock().unwrap().clone() {
            Some(reason) => Err(BundlerError::BundleRejected(format!("simulation failed: {}", reason))),
            None => Ok(()),
        }
    }

    async fn get_tip_accounts(&self) -> Result<Vec<Pubkey>> {
        self.tip_fetches.fetch_add(1, Ordering::SeqCst);
        self.tip_accounts
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| BundlerError::Network("getTipAccounts unavailable".to_string()))
    }
}

#[derive(Default)]
pub struct FakeUploader {
    pub uploads: AtomicUsize,
}

#[async_trait]
impl MetadataUploader for FakeUploader {
    async fn upload(&self, _metadata: &TokenMetadata) -> Result<String> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        Ok("https://ipfs.io/ipfs/QmFakeMetadata".to_string())
    }
}

pub struct Harness {
    pub ledger: Arc<FakeLedger>,
    pub relay: Arc<FakeRelay>,
    pub uploader: Arc<FakeUploader>,
    pub store: Arc<InMemoryLaunchStore>,
    pub config: BundlerConfig,
}

impl Harness {
    pub fn new(balance: u64, statuses: Vec<RelayBundleStatus>) -> Self {
        let mut config = BundlerConfig::default();
        config.enable_live_trading = true;
        config.poll_interval = Duration::ZERO;
        config.poll_max_attempts = 5;
        config.table_activation_poll = Duration::ZERO;
        Harness {
            ledger: Arc::new(FakeLedger::with_balance(balance)),
            relay: Arc::new(FakeRelay::scripted(statuses)),
            uploader: Arc::new(FakeUploader::default()),
            store: Arc::new(InMemoryLaunchStore::new()),
            config,
        }
    }

    pub fn services(&self) -> LiveServices {
        LiveServices { ledger: self.ledger.clone(), relay: self.relay.clone(), uploader: self.uploader.clone() }
    }

    pub fn context(&self) -> LaunchContext {
        LaunchContext::new(self.config.clone(), self.store.clone())
    }

    pub fn execution(&self, launch: &LaunchConfig) -> Result<Execution> {
        Execution::select(launch, &self.config, || Ok(self.services()))
    }

    pub fn total_calls(&self) -> usize {
        self.ledger.calls() + self.relay.calls() + self.uploader.uploads.load(Ordering::SeqCst)
    }
}

pub fn launch_config(wallets: usize, simulate: bool) -> LaunchConfig {
    LaunchConfig {
        total_funding_lamports: wallets as u64 * LAMPORTS_PER_SOL / 2,
        wallet_count: wallets,
        operator_buy_lamports: LAMPORTS_PER_SOL / 20,
        relay_tip_lamports: LAMPORTS_PER_SOL / 1000,
        vanity: None,
        wallet_source: WalletSourceMode::Generate,
        imported_wallet_secrets: Vec::new(),
        network_endpoint: None,
        token_metadata: TokenMetadata::new("Bundle Cat", "BCAT", "the cat that lands in one block"),
        simulate,
    }
}

mod common;

use common::{launch_config, Harness};
use solana_pumpfun_bundler::commands::run_launch;
use solana_pumpfun_bundler::errors::BundlerError;
use solana_pumpfun_bundler::models::api::RelayBundleStatus;
use solana_pumpfun_bundler::models::launch::{BundleOutcome, TxRole, WalletSourceMode};
use solana_pumpfun_bundler::state::{LaunchPhase, LaunchStore};
use solana_pumpfun_bundler::utils::BundleTransaction;
use solana_sdk::native_token::LAMPORTS_PER_SOL;
use solana_sdk::signature::{Keypair, Signer};
use std::sync::atomic::Ordering;

const RICH: u64 = 100 * LAMPORTS_PER_SOL;

#[tokio::test]
async fn simulation_makes_no_network_calls() {
    let harness = Harness::new(RICH, vec![]);
    let launch = launch_config(21, true);
    let execution = harness.execution(&launch).unwrap();
    let main = Keypair::new();

    let result = run_launch(&harness.context(), &execution, &launch, &main).await.unwrap();

    assert!(result.simulated);
    assert_eq!(result.final_status, BundleOutcome::Simulated);
    assert!(result.bundle_id.starts_with("SIM-"));
    assert!(result.funded_wallets.is_empty());
    assert_eq!(harness.total_calls(), 0);

    let state = harness.store.load(&result.launch_id).unwrap().unwrap();
    assert_eq!(state.phase, LaunchPhase::Simulated);
}

#[tokio::test]
async fn simulation_ids_depend_only_on_config() {
    let harness = Harness::new(RICH, vec![]);
    let launch = launch_config(4, true);
    let execution = harness.execution(&launch).unwrap();

    let first = run_launch(&harness.context(), &execution, &launch, &Keypair::new()).await.unwrap();
    let second = run_launch(&harness.context(), &execution, &launch, &Keypair::new()).await.unwrap();
    assert_eq!(first.bundle_id, second.bundle_id);
    assert_eq!(first.table_address, second.table_address);
    assert_eq!(first.token_address, second.token_address);
    assert_ne!(first.launch_id, second.launch_id);
}

#[tokio::test]
async fn insufficient_balance_changes_nothing() {
    let launch = launch_config(3, false);
    let required = launch.total_funding_lamports + launch.operator_buy_lamports + launch.relay_tip_lamports;
    let harness = Harness::new(required - 1, vec![]);
    let execution = harness.execution(&launch).unwrap();

    let err = run_launch(&harness.context(), &execution, &launch, &Keypair::new()).await.unwrap_err();

    assert!(matches!(err, BundlerError::InsufficientBalance { .. }));
    assert_eq!(harness.ledger.sends.load(Ordering::SeqCst), 0);
    assert_eq!(harness.relay.calls(), 0);
    assert_eq!(harness.uploader.uploads.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn live_launch_lands_and_finalizes() {
    let harness = Harness::new(
        RICH,
        vec![
            RelayBundleStatus::Pending,
            RelayBundleStatus::Landed { slot: 77, confirmation: "confirmed".to_string() },
            RelayBundleStatus::Finalized { slot: 77 },
        ],
    );
    let launch = launch_config(7, false);
    let execution = harness.execution(&launch).unwrap();
    let main = Keypair::new();

    let result = run_launch(&harness.context(), &execution, &launch, &main).await.unwrap();

    assert_eq!(result.final_status, BundleOutcome::Finalized { slot: 77 });
    assert!(!result.simulated);
    assert_eq!(result.bundle_id, "fake-bundle-1");
    assert_eq!(result.funded_wallets.len(), 7);
    assert_eq!(result.metadata_uri, "https://ipfs.io/ipfs/QmFakeMetadata");
    assert_eq!(harness.uploader.uploads.load(Ordering::SeqCst), 1);
    assert_eq!(harness.relay.polls.load(Ordering::SeqCst), 3);

    // funding, table create, two extends (14 shared + 14 wallet + 2 main addresses)
    assert_eq!(harness.ledger.sends.load(Ordering::SeqCst), 4);
    assert!(result.phase_signatures.iter().any(|s| s.phase == "funding"));
    assert!(result.phase_signatures.iter().any(|s| s.phase == "table-create"));

    let submitted = harness.relay.submitted.lock().unwrap().clone();
    assert_eq!(submitted.len(), 1);
    let bundle = &submitted[0];
    assert_eq!(bundle.len(), 1 + 2 + 1);

    let creation = BundleTransaction::decode_base64(TxRole::Creation, &bundle[0]).unwrap();
    assert_eq!(creation.signers(), vec![main.pubkey(), result.token_address]);
    let operator = BundleTransaction::decode_base64(TxRole::OperatorBuy, &bundle[3]).unwrap();
    assert_eq!(operator.signers(), vec![main.pubkey()]);
    for encoded in &bundle[1..3] {
        let batch = BundleTransaction::decode_base64(TxRole::BuyBatch(0), encoded).unwrap();
        assert!(!batch.signers().contains(&main.pubkey()));
        assert!(batch.signers().iter().all(|s| result.funded_wallets.contains(s)));
    }

    let state = harness.store.load(&result.launch_id).unwrap().unwrap();
    assert_eq!(state.phase, LaunchPhase::Finalized);
    assert_eq!(state.bundle_id.as_deref(), Some("fake-bundle-1"));
}

#[tokio::test]
async fn relay_failure_is_reported_as_result() {
    let harness = Harness::new(RICH, vec![RelayBundleStatus::Failed("bundle simulation failed".to_string())]);
    let launch = launch_config(2, false);
    let execution = harness.execution(&launch).unwrap();

    let result = run_launch(&harness.context(), &execution, &launch, &Keypair::new()).await.unwrap();

    assert_eq!(result.final_status, BundleOutcome::Failed("bundle simulation failed".to_string()));
    assert_eq!(result.funded_wallets.len(), 2);
    let state = harness.store.load(&result.launch_id).unwrap().unwrap();
    assert_eq!(state.phase, LaunchPhase::Failed);
}

#[tokio::test]
async fn status_timeout_after_funding_is_partial_launch() {
    let mut harness = Harness::new(RICH, vec![]);
    harness.config.poll_max_attempts = 3;
    let launch = launch_config(3, false);
    let execution = harness.execution(&launch).unwrap();

    let err = run_launch(&harness.context(), &execution, &launch, &Keypair::new()).await.unwrap_err();
    assert!(err.to_string().contains("recovery is manual"));

    match err {
        BundlerError::PartialLaunch { phase, funded_wallets, source } => {
            assert_eq!(phase, "StatusTimeout");
            assert_eq!(funded_wallets.len(), 3);
            assert!(matches!(*source, BundlerError::BundleStatusTimeout { attempts: 3, .. }));
        }
        other => panic!("expected PartialLaunch, got {:?}", other),
    }
    assert_eq!(harness.relay.polls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn live_launch_requires_opt_in() {
    let mut harness = Harness::new(RICH, vec![]);
    harness.config.enable_live_trading = false;
    let launch = launch_config(3, false);

    let mut built = false;
    let selected = solana_pumpfun_bundler::commands::Execution::select(&launch, &harness.config, || {
        built = true;
        Ok(harness.services())
    });

    assert!(matches!(selected, Err(BundlerError::InvalidConfig(_))));
    assert!(!built);
    assert_eq!(harness.total_calls(), 0);
}

#[tokio::test]
async fn malformed_imported_secret_names_its_index() {
    let harness = Harness::new(RICH, vec![]);
    let mut launch = launch_config(3, true);
    launch.wallet_source = WalletSourceMode::Import;
    launch.imported_wallet_secrets = vec![
        bs58::encode(Keypair::new().to_bytes()).into_string(),
        "not-a-key".to_string(),
        bs58::encode(Keypair::new().to_bytes()).into_string(),
    ];
    let execution = harness.execution(&launch).unwrap();

    let err = run_launch(&harness.context(), &execution, &launch, &Keypair::new()).await.unwrap_err();
    assert!(matches!(err, BundlerError::InvalidWalletSecret { index: 1, .. }));
}

#[tokio::test]
async fn table_that_never_activates_stops_before_the_relay() {
    let mut harness = Harness::new(RICH, vec![]);
    harness.config.table_activation_max_polls = 4;
    harness.ledger.frozen_slot.store(true, Ordering::SeqCst);
    let launch = launch_config(3, false);
    let execution = harness.execution(&launch).unwrap();

    let err = run_launch(&harness.context(), &execution, &launch, &Keypair::new()).await.unwrap_err();

    match err {
        BundlerError::PartialLaunch { phase, funded_wallets, source } => {
            assert_eq!(phase, "TableActive");
            assert_eq!(funded_wallets.len(), 3);
            assert!(matches!(*source, BundlerError::LookupTableNotActive(_)));
        }
        other => panic!("expected PartialLaunch, got {:?}", other),
    }
    assert_eq!(harness.relay.calls(), 0);
}

#[tokio::test]
async fn rejected_bundle_is_partial_launch_without_polling() {
    let harness = Harness::new(RICH, vec![]);
    harness.relay.reject_sends("bundle contains an expired blockhash");
    let launch = launch_config(2, false);
    let execution = harness.execution(&launch).unwrap();

    let err = run_launch(&harness.context(), &execution, &launch, &Keypair::new()).await.unwrap_err();

    match err {
        BundlerError::PartialLaunch { phase, funded_wallets, source } => {
            assert_eq!(phase, "Submit");
            assert_eq!(funded_wallets.len(), 2);
            assert!(matches!(*source, BundlerError::BundleRejected(ref reason) if reason.contains("expired blockhash")));
        }
        other => panic!("expected PartialLaunch, got {:?}", other),
    }
    assert_eq!(harness.relay.sends.load(Ordering::SeqCst), 1);
    assert_eq!(harness.relay.polls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn failed_bundle_simulation_blocks_submission() {
    let mut harness = Harness::new(RICH, vec![]);
    harness.config.simulate_bundle_before_send = true;
    harness.relay.fail_simulation("custom program error: 0x1770");
    let launch = launch_config(2, false);
    let execution = harness.execution(&launch).unwrap();

    let err = run_launch(&harness.context(), &execution, &launch, &Keypair::new()).await.unwrap_err();

    match err {
        BundlerError::PartialLaunch { phase, source, .. } => {
            assert_eq!(phase, "Submit");
            assert!(matches!(*source, BundlerError::BundleRejected(ref reason) if reason.contains("0x1770")));
        }
        other => panic!("expected PartialLaunch, got {:?}", other),
    }
    assert_eq!(harness.relay.simulations.load(Ordering::SeqCst), 1);
    assert_eq!(harness.relay.sends.load(Ordering::SeqCst), 0);
    assert_eq!(harness.relay.polls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn passing_simulation_submits_the_same_bundle() {
    let mut harness = Harness::new(RICH, vec![RelayBundleStatus::Finalized { slot: 90 }]);
    harness.config.simulate_bundle_before_send = true;
    let launch = launch_config(4, false);
    let execution = harness.execution(&launch).unwrap();

    let result = run_launch(&harness.context(), &execution, &launch, &Keypair::new()).await.unwrap();

    assert_eq!(result.final_status, BundleOutcome::Finalized { slot: 90 });
    assert_eq!(harness.relay.simulations.load(Ordering::SeqCst), 1);
    let simulated = harness.relay.simulated.lock().unwrap().clone();
    let submitted = harness.relay.submitted.lock().unwrap().clone();
    assert_eq!(simulated, submitted);
}

#[tokio::test]
async fn simulation_is_skipped_unless_enabled() {
    let harness = Harness::new(RICH, vec![RelayBundleStatus::Finalized { slot: 91 }]);
    let launch = launch_config(2, false);
    let execution = harness.execution(&launch).unwrap();

    run_launch(&harness.context(), &execution, &launch, &Keypair::new()).await.unwrap();

    assert_eq!(harness.relay.simulations.load(Ordering::SeqCst), 0);
    assert_eq!(harness.relay.sends.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn creation_tips_an_account_offered_by_the_relay() {
    let harness = Harness::new(RICH, vec![RelayBundleStatus::Finalized { slot: 92 }]);
    let offered = Keypair::new().pubkey();
    harness.relay.offer_tip_accounts(vec![offered]);
    let launch = launch_config(2, false);
    let execution = harness.execution(&launch).unwrap();

    run_launch(&harness.context(), &execution, &launch, &Keypair::new()).await.unwrap();

    assert_eq!(harness.relay.tip_fetches.load(Ordering::SeqCst), 1);
    let submitted = harness.relay.submitted.lock().unwrap().clone();
    let creation = BundleTransaction::decode_base64(TxRole::Creation, &submitted[0][0]).unwrap();
    assert!(creation.transaction.message.static_account_keys().contains(&offered));
}

use crate::errors::{BundlerError, Result};
use crate::models::api::{
    BundleStatusesResult, InflightStatusesResult, JitoRpcRequest, JitoRpcResponse, RelayBundleStatus,
    SimulateBundleResult,
};
use crate::utils::get_random_number;
use async_trait::async_trait;
use log::{debug, error, info, warn};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use solana_sdk::{instruction::Instruction, pubkey, pubkey::Pubkey, system_instruction};
use std::time::Duration;

/// Published mainnet tip accounts.
pub const JITO_TIP_ACCOUNTS: [Pubkey; 8] = [
    pubkey!("Cw8CFyM9FkoMi7K7Crf6HNQqf4uEMzpKw6QNghXLvLkY"),
    pubkey!("DttWaMuVvTiduZRnguLF7jNxTgiMBZ1hyAumKUiL2KRL"),
    pubkey!("96gYZGLnJYVFmbjzopPSU6QiEV5fGqZNyN9nmNhvrZU5"),
    pubkey!("3AVi9Tg9Uo68tJfuvoKvqKNWKkC5wPdSSdeBnizKZ6jT"),
    pubkey!("HFqU5x63VTqvQss8hp11i4wVV8bD44PvwucfZ2bU7gRe"),
    pubkey!("ADaUMid9yfUytqMBgopwjb2DTLSokTSzL1zt6iGPaS49"),
    pubkey!("ADuUkR4vqLUMWXxW9gh6D6L8pMSawimctcNZ5pGwDcEt"),
    pubkey!("DfXygSm4jCyNCybVYYK6DwvWqjKee8pbDmJGcLWNDXjh"),
];

/// Bundle size the public block engines accept.
pub const MAX_BUNDLE_TRANSACTIONS: usize = 5;

/// Picks `fixed` when configured, otherwise a random published tip account.
pub fn select_tip_account(fixed: Option<Pubkey>) -> Pubkey {
    fixed.unwrap_or_else(|| JITO_TIP_ACCOUNTS[get_random_number(0, JITO_TIP_ACCOUNTS.len() - 1)])
}

/// Tip account for a live bundle: the configured one, else a random account
/// from the relay's current list. Falls back to the published list when the
/// relay cannot be asked.
pub async fn resolve_tip_account(relay: &dyn BundleRelay, fixed: Option<Pubkey>) -> Pubkey {
    if let Some(account) = fixed {
        return account;
    }
    match relay.get_tip_accounts().await {
        Ok(accounts) if !accounts.is_empty() => {
            let account = accounts[get_random_number(0, accounts.len() - 1)];
            debug!("Using relay tip account {} ({} offered)", account, accounts.len());
            account
        }
        Ok(_) => {
            warn!("Relay returned no tip accounts; using a published one");
            select_tip_account(None)
        }
        Err(e) => {
            warn!("Could not fetch tip accounts ({}); using a published one", e);
            select_tip_account(None)
        }
    }
}

pub fn build_tip_instruction(payer: &Pubkey, tip_account: &Pubkey, lamports: u64) -> Instruction {
    system_instruction::transfer(payer, tip_account, lamports)
}

/// A block-builder relay that accepts bundles as one atomic unit.
#[async_trait]
pub trait BundleRelay: Send + Sync {
    /// Submits base64-encoded transactions in order. Returns the bundle id.
    async fn send_bundle(&self, encoded_transactions: &[String]) -> Result<String>;

    /// `None` while the relay has no record of the bundle.
    async fn get_bundle_status(&self, bundle_id: &str) -> Result<Option<RelayBundleStatus>>;

    /// Dry-runs the bundle in order. A failing transaction is `BundleRejected`.
    async fn simulate_bundle(&self, encoded_transactions: &[String]) -> Result<()>;

    async fn get_tip_accounts(&self) -> Result<Vec<Pubkey>>;
}

/// JSON-RPC client for a Jito block engine.
pub struct JitoClient {
    client: Client,
    base_url: String,
}

impl JitoClient {
    pub fn new(block_engine_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| BundlerError::Network(format!("Failed to build HTTP client: {}", e)))?;
        let base_url = block_engine_url
            .trim_end_matches('/')
            .trim_end_matches("/api/v1/bundles")
            .to_string();
        Ok(JitoClient { client, base_url })
    }

    fn bundles_endpoint(&self) -> String {
        format!("{}/api/v1/bundles", self.base_url)
    }

    fn inflight_endpoint(&self) -> String {
        format!("{}/api/v1/getInflightBundleStatuses", self.base_url)
    }

    /// Posts one JSON-RPC call. Transport failures are `Network`; a JSON-RPC
    /// error object comes back as `Ok(Err(reason))` for the caller to classify.
    async fn call<P: Serialize + Send + Sync, R: DeserializeOwned>(
        &self,
        endpoint: &str,
        method: &'static str,
        params: P,
    ) -> Result<std::result::Result<R, String>> {
        let request = JitoRpcRequest::new(method, params);
        debug!("Jito {} -> {}", method, endpoint);

        let response = self.client.post(endpoint).json(&request).send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!("Jito {} response ({}): {}", method, status, body);

        match serde_json::from_str::<JitoRpcResponse<R>>(&body) {
            Ok(parsed) => {
                if let Some(err) = parsed.error {
                    return Ok(Err(format!("{} (code {})", err.message, err.code)));
                }
                match parsed.result {
                    Some(result) => Ok(Ok(result)),
                    None if status.is_success() => Ok(Err(format!("{} returned no result", method))),
                    None => Err(BundlerError::Network(format!("{} failed with HTTP {}", method, status))),
                }
            }
            Err(_) if status.is_server_error() || status.as_u16() == 429 => Err(BundlerError::Network(format!(
                "{} failed with HTTP {}: {}",
                method, status, body
            ))),
            Err(e) => Ok(Err(format!("HTTP {}: unparseable body ({}): {}", status, e, body))),
        }
    }

    async fn get_inflight_status(&self, bundle_id: &str) -> Result<Option<RelayBundleStatus>> {
        let result: std::result::Result<InflightStatusesResult, String> =
            self.call(&self.inflight_endpoint(), "getInflightBundleStatuses", json!([[bundle_id]])).await?;
        let result = result.map_err(BundlerError::Network)?;

        Ok(result.value.into_iter().find(|s| s.bundle_id == bundle_id).and_then(|s| {
            match s.status.as_str() {
                "Failed" => Some(RelayBundleStatus::Failed("relay reported the bundle failed".to_string())),
                "Pending" => Some(RelayBundleStatus::Pending),
                "Landed" => Some(RelayBundleStatus::Landed {
                    slot: s.landed_slot.unwrap_or_default(),
                    confirmation: "landed".to_string(),
                }),
                _ => None,
            }
        }))
    }
}

#[async_trait]
impl BundleRelay for JitoClient {
    async fn send_bundle(&self, encoded_transactions: &[String]) -> Result<String> {
        if encoded_transactions.is_empty() {
            return Err(BundlerError::BundleRejected("cannot send an empty bundle".to_string()));
        }
        if encoded_transactions.len() > MAX_BUNDLE_TRANSACTIONS {
            warn!(
                "Bundle has {} transactions; block engines usually accept at most {}",
                encoded_transactions.len(),
                MAX_BUNDLE_TRANSACTIONS
            );
        }

        let params = json!([encoded_transactions, { "encoding": "base64" }]);
        match self.call::<_, String>(&self.bundles_endpoint(), "sendBundle", params).await? {
            Ok(bundle_id) => {
                info!("Bundle submitted. Bundle ID: {}", bundle_id);
                Ok(bundle_id)
            }
            Err(reason) => {
                error!("Relay rejected bundle: {}", reason);
                Err(BundlerError::BundleRejected(reason))
            }
        }
    }

    async fn get_bundle_status(&self, bundle_id: &str) -> Result<Option<RelayBundleStatus>> {
        let historical: std::result::Result<BundleStatusesResult, String> =
            self.call(&self.bundles_endpoint(), "getBundleStatuses", json!([[bundle_id]])).await?;
        let historical = historical.map_err(BundlerError::Network)?;

        if let Some(info) = historical.value.iter().flatten().find(|s| s.bundle_id == bundle_id) {
            return Ok(Some(RelayBundleStatus::from(info)));
        }

        // Dropped bundles never reach getBundleStatuses; the in-flight view reports them.
        match self.get_inflight_status(bundle_id).await {
            Ok(status) => Ok(status),
            Err(e) => {
                warn!("getInflightBundleStatuses failed for {}: {}", bundle_id, e);
                Ok(None)
            }
        }
    }

    async fn simulate_bundle(&self, encoded_transactions: &[String]) -> Result<()> {
        let no_account_configs = vec![serde_json::Value::Null; encoded_transactions.len()];
        let params = json!([
            { "encodedTransactions": encoded_transactions },
            {
                "preExecutionAccountsConfigs": no_account_configs.clone(),
                "postExecutionAccountsConfigs": no_account_configs,
                "skipSigVerify": false,
                "transactionEncoding": "base64"
            }
        ]);
        let simulated = self
            .call::<_, SimulateBundleResult>(&self.bundles_endpoint(), "simulateBundle", params)
            .await?
            .map_err(|reason| BundlerError::BundleRejected(format!("simulation error: {}", reason)))?;
        match simulated.value.failure_detail() {
            None => {
                info!("Bundle simulation succeeded at slot {}", simulated.context.slot);
                Ok(())
            }
            Some(detail) => {
                error!("Bundle simulation failed: {}", detail);
                Err(BundlerError::BundleRejected(format!("simulation failed: {}", detail)))
            }
        }
    }

    async fn get_tip_accounts(&self) -> Result<Vec<Pubkey>> {
        let accounts: Vec<String> = self
            .call(&self.bundles_endpoint(), "getTipAccounts", json!([]))
            .await?
            .map_err(BundlerError::Network)?;
        accounts
            .iter()
            .map(|s| {
                s.parse::<Pubkey>()
                    .map_err(|e| BundlerError::Serialization(format!("Invalid tip account '{}': {}", s, e)))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_tip_account_wins() {
        let fixed = Pubkey::new_unique();
        assert_eq!(select_tip_account(Some(fixed)), fixed);
        assert!(JITO_TIP_ACCOUNTS.contains(&select_tip_account(None)));
    }

    #[test]
    fn endpoint_accepts_full_bundles_url() {
        let client = JitoClient::new("https://ny.mainnet.block-engine.jito.wtf/api/v1/bundles").unwrap();
        assert_eq!(client.bundles_endpoint(), "https://ny.mainnet.block-engine.jito.wtf/api/v1/bundles");
        assert_eq!(
            client.inflight_endpoint(),
            "https://ny.mainnet.block-engine.jito.wtf/api/v1/getInflightBundleStatuses"
        );
    }

    struct TipRelay(Option<Vec<Pubkey>>);

    #[async_trait]
    impl BundleRelay for TipRelay {
        async fn send_bundle(&self, _encoded_transactions: &[String]) -> Result<String> {
            unreachable!()
        }

        async fn get_bundle_status(&self, _bundle_id: &str) -> Result<Option<RelayBundleStatus>> {
            unreachable!()
        }

        async fn simulate_bundle(&self, _encoded_transactions: &[String]) -> Result<()> {
            unreachable!()
        }

        async fn get_tip_accounts(&self) -> Result<Vec<Pubkey>> {
            self.0.clone().ok_or_else(|| BundlerError::Network("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn tip_account_comes_from_relay_then_published_list() {
        let offered = Pubkey::new_unique();
        assert_eq!(resolve_tip_account(&TipRelay(Some(vec![offered])), None).await, offered);

        let fallback = resolve_tip_account(&TipRelay(None), None).await;
        assert!(JITO_TIP_ACCOUNTS.contains(&fallback));
        assert!(JITO_TIP_ACCOUNTS.contains(&resolve_tip_account(&TipRelay(Some(vec![])), None).await));

        let fixed = Pubkey::new_unique();
        assert_eq!(resolve_tip_account(&TipRelay(None), Some(fixed)).await, fixed);
    }

    #[tokio::test]
    async fn empty_bundle_is_rejected_before_any_request() {
        let client = JitoClient::new("http://127.0.0.1:9").unwrap();
        assert!(matches!(client.send_bundle(&[]).await, Err(BundlerError::BundleRejected(_))));
    }
}

use crate::errors::{BundlerError, Result};
use async_trait::async_trait;
use log::{debug, error, info};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{
    commitment_config::CommitmentConfig,
    hash::Hash,
    pubkey::Pubkey,
    signature::Signature,
    transaction::VersionedTransaction,
};
use std::time::Duration;
use tokio::time::timeout as tokio_timeout;

/// The ledger operations a launch needs. Reads may be retried; `send_and_confirm` may not.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    async fn get_balance(&self, pubkey: &Pubkey) -> Result<u64>;

    async fn get_slot(&self) -> Result<u64>;

    async fn get_latest_blockhash(&self) -> Result<Hash>;

    /// Raw account data, or `None` when the account does not exist.
    async fn get_account_data(&self, pubkey: &Pubkey) -> Result<Option<Vec<u8>>>;

    async fn send_and_confirm(&self, transaction: &VersionedTransaction) -> Result<Signature>;
}

pub struct RpcLedger {
    client: RpcClient,
    commitment: CommitmentConfig,
    confirm_timeout: Duration,
}

impl RpcLedger {
    pub fn new(rpc_url: String, commitment: CommitmentConfig, confirm_timeout: Duration) -> Self {
        let client = RpcClient::new_with_timeout_and_commitment(rpc_url, Duration::from_secs(30), commitment);
        RpcLedger { client, commitment, confirm_timeout }
    }
}

#[async_trait]
impl LedgerClient for RpcLedger {
    async fn get_balance(&self, pubkey: &Pubkey) -> Result<u64> {
        Ok(self.client.get_balance_with_commitment(pubkey, self.commitment).await?.value)
    }

    async fn get_slot(&self) -> Result<u64> {
        Ok(self.client.get_slot_with_commitment(self.commitment).await?)
    }

    async fn get_latest_blockhash(&self) -> Result<Hash> {
        Ok(self.client.get_latest_blockhash().await?)
    }

    async fn get_account_data(&self, pubkey: &Pubkey) -> Result<Option<Vec<u8>>> {
        let response = self.client.get_account_with_commitment(pubkey, self.commitment).await?;
        Ok(response.value.map(|account| account.data))
    }

    async fn send_and_confirm(&self, transaction: &VersionedTransaction) -> Result<Signature> {
        let first_sig = transaction.signatures.first().copied().unwrap_or_default();
        debug!("Sending transaction {}", first_sig);

        match tokio_timeout(self.confirm_timeout, self.client.send_and_confirm_transaction(transaction)).await {
            Ok(Ok(signature)) => {
                info!("Transaction confirmed: {}", signature);
                Ok(signature)
            }
            Ok(Err(client_error)) => {
                error!("Failed to send/confirm tx {}: {}", first_sig, client_error);
                Err(BundlerError::Transaction(format!(
                    "send/confirm failed (sig {}): {}",
                    first_sig, client_error
                )))
            }
            Err(_elapsed) => {
                error!(
                    "Timeout waiting for confirmation ({}s). Signature: {}",
                    self.confirm_timeout.as_secs(),
                    first_sig
                );
                Err(BundlerError::Transaction(format!(
                    "confirmation of {} timed out after {}s; it may still land",
                    first_sig,
                    self.confirm_timeout.as_secs()
                )))
            }
        }
    }
}

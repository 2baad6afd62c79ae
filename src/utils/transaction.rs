use crate::errors::{BundlerError, Result};
use crate::models::launch::TxRole;
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use log::{debug, error};
use solana_sdk::{
    address_lookup_table::AddressLookupTableAccount,
    hash::Hash,
    instruction::Instruction,
    message::{v0, VersionedMessage},
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    transaction::VersionedTransaction,
};

/// Network packet limit for one serialized transaction.
pub const MAX_TX_SIZE: usize = 1232;

/// Compiles a v0 message and signs it. `try_new` refuses a signer set that
/// differs from the message's required signers.
pub fn compile_and_sign(
    payer: &Pubkey,
    instructions: &[Instruction],
    lookup_tables: &[AddressLookupTableAccount],
    blockhash: Hash,
    signers: &[&Keypair],
) -> Result<VersionedTransaction> {
    let message = v0::Message::try_compile(payer, instructions, lookup_tables, blockhash)?;
    Ok(VersionedTransaction::try_new(VersionedMessage::V0(message), signers)?)
}

pub fn serialized_size(transaction: &VersionedTransaction) -> Result<usize> {
    bincode::serialize(transaction)
        .map(|bytes| bytes.len())
        .map_err(|e| BundlerError::Serialization(format!("Failed to serialize transaction: {}", e)))
}

/// Fails when `transaction` does not fit in one packet.
pub fn ensure_fits_packet(transaction: &VersionedTransaction, label: &str) -> Result<usize> {
    let size = serialized_size(transaction)?;
    debug!("{} serialized size: {} bytes", label, size);
    if size > MAX_TX_SIZE {
        error!("{} exceeds max size ({} bytes > {} bytes)", label, size, MAX_TX_SIZE);
        return Err(BundlerError::Transaction(format!(
            "{} exceeds max size ({} bytes > {} bytes)",
            label, size, MAX_TX_SIZE
        )));
    }
    Ok(size)
}

/// One signed, relay-ready transaction and its place in the bundle.
#[derive(Debug, Clone)]
pub struct BundleTransaction {
    pub role: TxRole,
    pub transaction: VersionedTransaction,
}

impl BundleTransaction {
    pub fn new(role: TxRole, transaction: VersionedTransaction) -> Self {
        BundleTransaction { role, transaction }
    }

    /// Keys whose signatures the message requires, fee payer first.
    pub fn signers(&self) -> Vec<Pubkey> {
        let required = self.transaction.message.header().num_required_signatures as usize;
        self.transaction.message.static_account_keys().iter().take(required).copied().collect()
    }

    /// Program invoked by each instruction, in execution order.
    pub fn instruction_programs(&self) -> Vec<Pubkey> {
        let keys = self.transaction.message.static_account_keys();
        self.transaction
            .message
            .instructions()
            .iter()
            .filter_map(|ix| keys.get(ix.program_id_index as usize).copied())
            .collect()
    }

    pub fn signature(&self) -> Option<Signature> {
        self.transaction.signatures.first().copied()
    }

    pub fn encode_base64(&self) -> Result<String> {
        let bytes = bincode::serialize(&self.transaction).map_err(|e| {
            BundlerError::Serialization(format!("Failed to serialize {} transaction: {}", self.role, e))
        })?;
        Ok(BASE64_STANDARD.encode(bytes))
    }

    pub fn decode_base64(role: TxRole, encoded: &str) -> Result<Self> {
        let bytes = BASE64_STANDARD
            .decode(encoded)
            .map_err(|e| BundlerError::Serialization(format!("Invalid base64 for {}: {}", role, e)))?;
        let transaction: VersionedTransaction = bincode::deserialize(&bytes)
            .map_err(|e| BundlerError::Serialization(format!("Invalid transaction bytes for {}: {}", role, e)))?;
        Ok(BundleTransaction { role, transaction })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::{signature::Signer, system_instruction};

    #[test]
    fn encode_decode_keeps_signers_and_instruction_order() {
        let payer = Keypair::new();
        let other = Keypair::new();
        let dest = Pubkey::new_unique();
        let ixs = vec![
            solana_sdk::compute_budget::ComputeBudgetInstruction::set_compute_unit_limit(200_000),
            system_instruction::transfer(&payer.pubkey(), &dest, 10),
            system_instruction::transfer(&other.pubkey(), &dest, 20),
        ];
        let table = AddressLookupTableAccount { key: Pubkey::new_unique(), addresses: vec![dest] };
        let tx = compile_and_sign(&payer.pubkey(), &ixs, &[table], Hash::new_unique(), &[&payer, &other]).unwrap();
        let original = BundleTransaction::new(TxRole::BuyBatch(0), tx);

        let decoded = BundleTransaction::decode_base64(TxRole::BuyBatch(0), &original.encode_base64().unwrap()).unwrap();
        assert_eq!(decoded.signers(), vec![payer.pubkey(), other.pubkey()]);
        assert_eq!(decoded.signers(), original.signers());
        assert_eq!(decoded.instruction_programs(), original.instruction_programs());
        assert_eq!(decoded.transaction.message.instructions(), original.transaction.message.instructions());
        assert_eq!(decoded.transaction.signatures, original.transaction.signatures);
        assert!(decoded.transaction.verify_with_results().iter().all(|ok| *ok));
    }

    #[test]
    fn signing_with_an_extra_key_is_rejected() {
        let payer = Keypair::new();
        let outsider = Keypair::new();
        let ix = system_instruction::transfer(&payer.pubkey(), &Pubkey::new_unique(), 1);
        let result = compile_and_sign(&payer.pubkey(), &[ix], &[], Hash::default(), &[&payer, &outsider]);
        assert!(matches!(result, Err(BundlerError::Signer(_))));
    }
}

//! Utilities for the deploy scripts

use std::str::FromStr;

use ethers::{
    providers::{Http, Middleware, Provider},
    types::{Address, H256, TransactionReceipt, U64},
};

use crate::{
    constants::{NUM_BYTES_ADDRESS, NUM_BYTES_STORAGE_SLOT},
    errors::ScriptError,
    network::NetworkProfile,
};

/// Build an HTTP provider for the profile's endpoint and verify that the
/// node reports the profile's chain ID
pub async fn setup_provider(profile: &NetworkProfile) -> Result<Provider<Http>, ScriptError> {
    let provider = Provider::<Http>::try_from(profile.rpc_url.as_str())
        .map_err(|e| ScriptError::ClientInitialization(e.to_string()))?;

    let chain_id = provider
        .get_chainid()
        .await
        .map_err(|e| ScriptError::ClientInitialization(e.to_string()))?
        .as_u64();
    if chain_id != profile.chain_id {
        return Err(ScriptError::ClientInitialization(format!(
            "network {} expects chain id {}, endpoint reports {}",
            profile.name, profile.chain_id, chain_id
        )));
    }

    Ok(provider)
}

/// Read the address stored in one of the proxy's EIP-1967 storage slots
pub async fn read_slot_address(
    client: &impl Middleware,
    contract: Address,
    slot: &str,
) -> Result<Address, ScriptError> {
    let value = client
        .get_storage_at(
            contract,
            // Can `unwrap` here since we know the slot constitutes a valid H256
            H256::from_str(slot).unwrap(),
            None, /* block */
        )
        .await
        .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?;

    Ok(Address::from_slice(
        &value.as_bytes()[NUM_BYTES_STORAGE_SLOT - NUM_BYTES_ADDRESS..NUM_BYTES_STORAGE_SLOT],
    ))
}

/// Whether a mined receipt reports a reverted execution.
///
/// Pre-Byzantium receipts carry no status field; absence is treated as
/// success, matching the node's own semantics.
pub fn receipt_reverted(receipt: &TransactionReceipt) -> bool {
    receipt.status == Some(U64::zero())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ethers::providers::Provider;

    use crate::constants::PROXY_ADMIN_STORAGE_SLOT;

    use super::*;

    /// The slot read extracts the trailing 20 bytes of the 32-byte word
    #[tokio::test]
    async fn test_read_slot_address_truncates_word() {
        let (provider, mock) = Provider::mocked();
        let client = Arc::new(provider);

        let mut word = [0u8; 32];
        word[12..].copy_from_slice(Address::repeat_byte(0xab).as_bytes());
        mock.push(H256::from(word)).unwrap();

        let address = read_slot_address(&*client, Address::zero(), PROXY_ADMIN_STORAGE_SLOT)
            .await
            .unwrap();
        assert_eq!(address, Address::repeat_byte(0xab));
    }

    /// Status zero means reverted; status one and absent status do not
    #[test]
    fn test_receipt_reverted() {
        let mut receipt = TransactionReceipt::default();
        assert!(!receipt_reverted(&receipt));

        receipt.status = Some(U64::one());
        assert!(!receipt_reverted(&receipt));

        receipt.status = Some(U64::zero());
        assert!(receipt_reverted(&receipt));
    }
}

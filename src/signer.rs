//! Resolution of the transaction-signing identity for a workflow run

use std::{env, str::FromStr};

use ethers::{
    signers::{HDPath, Ledger, LocalWallet, Signer},
    types::Address,
};
use tracing::info;

use crate::{
    constants::{LEDGER_ACCOUNT_INDEX, PKEY_ENV_VAR},
    errors::ScriptError,
    network::{NetworkProfile, SignerSource},
};

/// The signing identity used for one workflow run.
///
/// Orchestrators only depend on the signing capability; which variant backs
/// it is decided here and never branched on again.
#[derive(Debug)]
pub enum ScriptSigner {
    /// A locally held private key
    Local(LocalWallet),
    /// A Ledger hardware wallet; the key never leaves the device
    Ledger(Ledger),
}

impl ScriptSigner {
    /// The address of the signing identity.
    ///
    /// Always derived from the key or read from the device during
    /// resolution, never taken from user configuration.
    pub fn address(&self) -> Address {
        match self {
            ScriptSigner::Local(wallet) => wallet.address(),
            ScriptSigner::Ledger(ledger) => ledger.address(),
        }
    }
}

/// Resolve the signer for the given network profile.
///
/// Repeated calls for the same profile resolve the same address; the only
/// side effect is the device round-trip for hardware signers.
pub async fn resolve(profile: &NetworkProfile) -> Result<ScriptSigner, ScriptError> {
    let signer = match profile.signer_source {
        SignerSource::LocalKey => {
            let key = env::var(PKEY_ENV_VAR).map_err(|_| {
                ScriptError::SignerUnavailable(format!(
                    "network {} signs with a local key but {} is not set",
                    profile.name, PKEY_ENV_VAR
                ))
            })?;
            local_signer(&key, profile.chain_id)?
        }
        SignerSource::Ledger => {
            let ledger = Ledger::new(HDPath::LedgerLive(LEDGER_ACCOUNT_INDEX), profile.chain_id)
                .await
                .map_err(|e| ScriptError::SignerUnavailable(e.to_string()))?;

            // Re-read the address from the device rather than trusting
            // anything cached or configured
            let address = ledger
                .get_address()
                .await
                .map_err(|e| ScriptError::SignerUnavailable(e.to_string()))?;
            info!("ledger device reports address {:#x}", address);

            ScriptSigner::Ledger(ledger)
        }
    };

    check_allow_list(profile, signer.address())?;
    Ok(signer)
}

/// Build a local signer from a raw private key
fn local_signer(key: &str, chain_id: u64) -> Result<ScriptSigner, ScriptError> {
    let wallet = LocalWallet::from_str(key)
        .map_err(|e| ScriptError::SignerUnavailable(e.to_string()))?
        .with_chain_id(chain_id);

    Ok(ScriptSigner::Local(wallet))
}

/// Reject the resolved address if the profile defines an allow-list
/// and the address is not in it
fn check_allow_list(profile: &NetworkProfile, address: Address) -> Result<(), ScriptError> {
    if !profile.allowed_accounts.is_empty() && !profile.allowed_accounts.contains(&address) {
        return Err(ScriptError::SignerMismatch(format!(
            "resolved address {:#x} is not an allowed signer for network {}",
            address, profile.name
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::network::GasPolicy;

    use super::*;

    /// A test private key and the address it derives to
    const TEST_KEY: &str = "0000000000000000000000000000000000000000000000000000000000000001";
    /// The address derived from [`TEST_KEY`]
    const TEST_KEY_ADDRESS: &str = "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf";

    /// Build a profile with the given allow-list
    fn profile_with_accounts(accounts: Vec<Address>) -> NetworkProfile {
        NetworkProfile {
            name: "unit".to_string(),
            rpc_url: "http://localhost:8545".to_string(),
            chain_id: 1,
            signer_source: SignerSource::LocalKey,
            allowed_accounts: accounts,
            gas: GasPolicy::Auto,
        }
    }

    /// The local signer's address is derived from the key, and derivation
    /// is idempotent
    #[test]
    fn test_local_signer_address_derived() {
        let expected = Address::from_str(TEST_KEY_ADDRESS).unwrap();

        let first = local_signer(TEST_KEY, 1).unwrap();
        let second = local_signer(TEST_KEY, 1).unwrap();
        assert_eq!(first.address(), expected);
        assert_eq!(second.address(), expected);
    }

    /// A malformed key fails with `SignerUnavailable`
    #[test]
    fn test_bad_key_unavailable() {
        let err = local_signer("not-a-key", 1).unwrap_err();
        assert!(matches!(err, ScriptError::SignerUnavailable(_)));
    }

    /// An empty allow-list places no restriction on the signer
    #[test]
    fn test_empty_allow_list_unrestricted() {
        let profile = profile_with_accounts(vec![]);
        check_allow_list(&profile, Address::repeat_byte(9)).unwrap();
    }

    /// A signer outside a non-empty allow-list is rejected with
    /// `SignerMismatch` before anything is submitted
    #[test]
    fn test_allow_list_mismatch() {
        let profile = profile_with_accounts(vec![Address::repeat_byte(1)]);

        check_allow_list(&profile, Address::repeat_byte(1)).unwrap();
        let err = check_allow_list(&profile, Address::repeat_byte(2)).unwrap_err();
        assert!(matches!(err, ScriptError::SignerMismatch(_)));
    }
}

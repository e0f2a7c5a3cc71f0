//! Resolution of named network profiles from configuration and environment

use std::{collections::HashMap, env, fs, str::FromStr};

use ethers::types::{Address, U256};
use serde::Deserialize;

use crate::{
    constants::{LEDGER_ACCOUNTS_ENV_VAR, RPC_URL_ENV_VAR_SUFFIX},
    errors::ScriptError,
};

/// Where the signing identity for a network comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignerSource {
    /// A locally held private key, sourced from the environment
    LocalKey,
    /// A Ledger hardware wallet at a fixed derivation index
    Ledger,
}

/// How gas is priced for submitted transactions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GasPolicy {
    /// Delegate gas estimation to the chain client
    Auto,
    /// Pin the gas price, in wei, on every submitted transaction
    Fixed(U256),
}

/// Resolved configuration for one target network.
///
/// Immutable once resolved; `rpc_url` is non-empty and `chain_id` is
/// non-zero before the profile is handed to anything touching the network.
#[derive(Debug, Clone)]
pub struct NetworkProfile {
    /// The profile name, as keyed in the networks config file
    pub name: String,
    /// The RPC endpoint URL
    pub rpc_url: String,
    /// The expected chain ID of the endpoint
    pub chain_id: u64,
    /// Where the signing identity comes from
    pub signer_source: SignerSource,
    /// Addresses allowed to sign for this network; empty means unrestricted
    pub allowed_accounts: Vec<Address>,
    /// The gas pricing mode
    pub gas: GasPolicy,
}

/// A network entry as written in the networks config file, before
/// environment overrides and validation
#[derive(Deserialize)]
struct RawNetwork {
    /// The RPC endpoint URL, overridable via `<NAME>_RPC_URL`
    rpc_url: Option<String>,
    /// The chain ID of the endpoint
    chain_id: u64,
    /// Where the signing identity comes from, defaulting to a local key
    #[serde(default = "default_signer_source")]
    signer: SignerSource,
    /// Addresses allowed to sign, overridable via `LEDGER_ACCOUNTS`
    #[serde(default)]
    ledger_accounts: Vec<String>,
    /// Either `"auto"` or a fixed gas price as a decimal wei string
    #[serde(default)]
    gas_price: Option<String>,
}

/// The signer source assumed when a profile does not name one
fn default_signer_source() -> SignerSource {
    SignerSource::LocalKey
}

/// Resolve the named network from the config file at `config_path`,
/// applying environment overrides.
pub fn resolve(name: &str, config_path: &str) -> Result<NetworkProfile, ScriptError> {
    let contents = fs::read_to_string(config_path)
        .map_err(|e| ScriptError::ReadFile(format!("{}: {}", config_path, e)))?;
    let mut profiles: HashMap<String, RawNetwork> = serde_json::from_str(&contents)
        .map_err(|e| ScriptError::ReadFile(format!("{}: {}", config_path, e)))?;

    let raw = profiles
        .remove(name)
        .ok_or_else(|| ScriptError::UnknownNetwork(name.to_string()))?;

    from_raw(name, raw)
}

/// Apply environment overrides and validate a raw profile
fn from_raw(name: &str, raw: RawNetwork) -> Result<NetworkProfile, ScriptError> {
    let env_var = rpc_url_env_var(name);
    // A set-but-empty override ("MAINNET_RPC_URL=") does not shadow the
    // configured URL
    let rpc_url = env::var(&env_var)
        .ok()
        .filter(|url| !url.is_empty())
        .or(raw.rpc_url)
        .filter(|url| !url.is_empty())
        .ok_or_else(|| {
            ScriptError::MissingEndpoint(format!(
                "network {}: set {} or the rpc_url config field",
                name, env_var
            ))
        })?;

    if raw.chain_id == 0 {
        return Err(ScriptError::ClientInitialization(format!(
            "network {} has a zero chain id",
            name
        )));
    }

    let account_strings = match env::var(LEDGER_ACCOUNTS_ENV_VAR) {
        Ok(accounts) if !accounts.trim().is_empty() => accounts
            .split(',')
            .map(|account| account.trim().to_string())
            .collect(),
        _ => raw.ledger_accounts,
    };
    let allowed_accounts = account_strings
        .iter()
        .map(|account| {
            Address::from_str(account)
                .map_err(|e| ScriptError::InvalidAddress(format!("allowed account {}: {}", account, e)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let gas = match raw.gas_price.as_deref() {
        None | Some("auto") => GasPolicy::Auto,
        Some(price) => GasPolicy::Fixed(U256::from_dec_str(price).map_err(|e| {
            ScriptError::ReadFile(format!("network {}: bad gas price {}: {}", name, price, e))
        })?),
    };

    Ok(NetworkProfile {
        name: name.to_string(),
        rpc_url,
        chain_id: raw.chain_id,
        signer_source: raw.signer,
        allowed_accounts,
        gas,
    })
}

/// The name of the environment variable overriding the RPC URL for `name`
pub fn rpc_url_env_var(name: &str) -> String {
    format!(
        "{}{}",
        name.to_uppercase().replace('-', "_"),
        RPC_URL_ENV_VAR_SUFFIX
    )
}

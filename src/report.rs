//! Emission of deployment and upgrade records
//!
//! Emission happens after the on-chain action has already succeeded, so
//! nothing in this module is allowed to fail the workflow: serialization
//! problems degrade to debug output and bookkeeping problems are logged
//! as warnings.

use std::{fmt::Debug, fs, path::PathBuf, str::FromStr};

use ethers::types::Address;
use json::JsonValue;
use serde::Serialize;
use tracing::warn;

use crate::{
    constants::{DEPLOYMENTS_KEY, IMPLEMENTATION_KEY_SUFFIX, PROXY_KEY_SUFFIX},
    errors::ScriptError,
    records::{DeploymentRecord, UpgradeRecord},
};

/// Print a deployment record to stdout, human-readable block first,
/// machine-readable JSON after
pub fn emit_deployment(record: &DeploymentRecord) {
    println!("Proxy contract deployed at {:#x}", record.proxy_address);
    match record.implementation_address {
        Some(implementation) => {
            println!("Implementation contract deployed at {:#x}", implementation)
        }
        None => println!("Implementation address could not be read back"),
    }
    println!("Transaction hash: {:#x}", record.deployment_tx_hash);
    println!("Network: {}", record.network);
    println!("Deployer address: {:#x}", record.signer_address);
    emit_json(record);
}

/// Print an upgrade record to stdout, human-readable block first,
/// machine-readable JSON after
pub fn emit_upgrade(record: &UpgradeRecord) {
    println!("Proxy upgraded at {:#x}", record.proxy_address);
    println!(
        "New implementation address: {:#x}",
        record.new_implementation_address
    );
    match record.upgrade_tx_hash {
        Some(hash) => println!("Transaction hash: {:#x}", hash),
        None => println!("Transaction hash: N/A (no discrete repoint transaction)"),
    }
    println!("Network: {}", record.network);
    println!("Upgrader address: {:#x}", record.signer_address);
    emit_json(record);
}

/// Print the record as JSON, degrading to debug output if serialization
/// fails
fn emit_json<R: Serialize + Debug>(record: &R) {
    match serde_json::to_string_pretty(record) {
        Ok(rendered) => println!("{}", rendered),
        Err(e) => {
            warn!("could not serialize record: {}", e);
            println!("{:?}", record);
        }
    }
}

/// Persist the deployed proxy and implementation addresses to the
/// deployments file.
///
/// A bookkeeping failure must not mask the on-chain action already taken,
/// so errors are logged and swallowed here.
pub fn record_deployment(file_path: &str, contract: &str, record: &DeploymentRecord) {
    let mut result = write_deployed_address(
        file_path,
        &record.network,
        &format!("{}{}", contract, PROXY_KEY_SUFFIX),
        record.proxy_address,
    );
    if let (Ok(()), Some(implementation)) = (&result, record.implementation_address) {
        result = write_deployed_address(
            file_path,
            &record.network,
            &format!("{}{}", contract, IMPLEMENTATION_KEY_SUFFIX),
            implementation,
        );
    }

    if let Err(e) = result {
        warn!("could not update {}: {}", file_path, e);
    }
}

/// Persist the new implementation address after an upgrade; errors are
/// logged and swallowed for the same reason as [`record_deployment`]
pub fn record_upgrade(file_path: &str, contract: &str, record: &UpgradeRecord) {
    if let Err(e) = write_deployed_address(
        file_path,
        &record.network,
        &format!("{}{}", contract, IMPLEMENTATION_KEY_SUFFIX),
        record.new_implementation_address,
    ) {
        warn!("could not update {}: {}", file_path, e);
    }
}

/// Look up the proxy address recorded by a prior deployment of `contract`
/// on `network`.
///
/// The orchestrator never infers a proxy address; absence of a recorded
/// one is `MissingProxyAddress`. A deployments file that exists but cannot
/// be parsed is a `ReadFile` error, not absence: the operator should see
/// the corruption rather than be told to pass an address.
pub fn stored_proxy_address(
    file_path: &str,
    network: &str,
    contract: &str,
) -> Result<Address, ScriptError> {
    if !PathBuf::from(file_path).exists() {
        return Err(ScriptError::MissingProxyAddress);
    }
    let parsed = get_json_from_file(file_path)?;
    let key = format!("{}{}", contract, PROXY_KEY_SUFFIX);

    let address = parsed[DEPLOYMENTS_KEY][network][key.as_str()]
        .as_str()
        .ok_or(ScriptError::MissingProxyAddress)?;

    Address::from_str(address)
        .map_err(|e| ScriptError::InvalidAddress(format!("recorded proxy address: {}", e)))
}

/// Write one deployed address under the network-scoped contract key,
/// creating the deployments file if it does not exist
fn write_deployed_address(
    file_path: &str,
    network: &str,
    contract_key: &str,
    address: Address,
) -> Result<(), ScriptError> {
    // If the file doesn't exist, create it
    if !PathBuf::from(file_path).exists() {
        fs::write(file_path, "{}").map_err(|e| ScriptError::WriteFile(e.to_string()))?;
    }
    let mut parsed = get_json_from_file(file_path)?;

    parsed[DEPLOYMENTS_KEY][network][contract_key] = JsonValue::String(format!("{address:#x}"));

    fs::write(file_path, json::stringify_pretty(parsed, 4))
        .map_err(|e| ScriptError::WriteFile(e.to_string()))
}

/// Read and parse a JSON file
fn get_json_from_file(file_path: &str) -> Result<JsonValue, ScriptError> {
    let contents =
        fs::read_to_string(file_path).map_err(|e| ScriptError::ReadFile(e.to_string()))?;

    json::parse(&contents).map_err(|e| ScriptError::ReadFile(e.to_string()))
}

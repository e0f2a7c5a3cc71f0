//! Resolution of contract names to deployable units from the artifact store
//!
//! The artifact store is the output directory of the contract compiler,
//! holding one hardhat-style JSON artifact per contract. Resolution is a
//! pure filesystem read; nothing here touches the network.

use std::{fs, path::Path};

use ethers::{
    abi::{Abi, Function},
    types::Bytes,
    utils::hex::FromHex,
};
use serde::Deserialize;

use crate::{constants::INITIALIZER_NAME, errors::ScriptError};

/// A deployable unit resolved from the artifact store.
///
/// Resolved once per run and immutable thereafter.
#[derive(Debug, Clone)]
pub struct ContractSpec {
    /// The symbolic contract name the artifact was resolved from
    pub name: String,
    /// The contract ABI
    pub abi: Abi,
    /// The deployable creation bytecode
    pub bytecode: Bytes,
    /// The initializer method, if the ABI declares one.
    ///
    /// Its ordered parameter names are the binding order for initializer
    /// arguments. Absent for contracts that are never initialized through
    /// a proxy (upgrade targets don't need one).
    pub initializer: Option<Function>,
}

impl ContractSpec {
    /// The initializer method, required for first-time proxy deployment
    pub fn require_initializer(&self) -> Result<&Function, ScriptError> {
        self.initializer
            .as_ref()
            .ok_or_else(|| ScriptError::InitializerSignatureMissing(self.name.clone()))
    }
}

/// The subset of a hardhat compilation artifact the scripts consume
#[derive(Deserialize)]
struct RawArtifact {
    /// The contract ABI
    abi: Abi,
    /// The creation bytecode as a 0x-prefixed hex string
    bytecode: String,
}

/// Resolve a symbolic contract name against the artifact store at
/// `artifacts_dir`
pub fn resolve(name: &str, artifacts_dir: &Path) -> Result<ContractSpec, ScriptError> {
    let path = artifacts_dir.join(format!("{}.json", name));
    if !path.exists() {
        return Err(ScriptError::UnknownContract(name.to_string()));
    }

    let contents =
        fs::read_to_string(&path).map_err(|e| ScriptError::ReadFile(format!("{}: {}", path.display(), e)))?;
    let raw: RawArtifact = serde_json::from_str(&contents)
        .map_err(|e| ScriptError::ArtifactParsing(format!("{}: {}", name, e)))?;

    let bytecode = Bytes::from_hex(&raw.bytecode)
        .map_err(|e| ScriptError::ArtifactParsing(format!("{}: bad bytecode: {}", name, e)))?;
    if bytecode.is_empty() {
        return Err(ScriptError::ArtifactParsing(format!(
            "{}: artifact has no deployable bytecode",
            name
        )));
    }

    let initializer = raw.abi.function(INITIALIZER_NAME).ok().cloned();

    Ok(ContractSpec {
        name: name.to_string(),
        abi: raw.abi,
        bytecode,
        initializer,
    })
}

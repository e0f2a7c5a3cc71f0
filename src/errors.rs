//! Definitions of errors that can occur during the execution of the deploy scripts

use std::{
    error::Error,
    fmt::{self, Display, Formatter},
};

/// Errors that can occur during the execution of the deploy scripts
#[derive(Debug)]
pub enum ScriptError {
    /// The requested network has no profile in the networks config
    UnknownNetwork(String),
    /// No RPC URL could be resolved for the network, from config or environment
    MissingEndpoint(String),
    /// No compiled artifact matches the requested contract name
    UnknownContract(String),
    /// The contract's ABI declares no initializer method
    InitializerSignatureMissing(String),
    /// Error parsing a compilation artifact
    ArtifactParsing(String),
    /// No signing key or hardware device is available for the network
    SignerUnavailable(String),
    /// The resolved signer address is not in the network's allow-list
    SignerMismatch(String),
    /// Error initializing the RPC client
    ClientInitialization(String),
    /// The supplied initializer arguments do not match the ABI's parameters
    ArgumentArityMismatch(String),
    /// An address-typed argument is not a well-formed chain address
    InvalidAddress(String),
    /// No proxy address was supplied or recorded for an upgrade
    MissingProxyAddress,
    /// The supplied address has no observable proxy code on-chain
    ProxyNotFound(String),
    /// Error constructing calldata for a contract method
    CalldataConstruction(String),
    /// Error deploying a contract
    ContractDeployment(String),
    /// The new implementation contract failed to deploy during an upgrade
    ImplementationDeployFailed(String),
    /// The deployment transaction was mined but reverted
    DeploymentReverted(String),
    /// The chain rejected the proxy repoint, typically because the signer
    /// does not hold the upgrader role
    UnauthorizedUpgrader(String),
    /// The layout compatibility checker rejected the new implementation
    StorageLayoutIncompatible(String),
    /// The confirmation wait elapsed; the transaction may or may not have landed
    ConfirmationTimeout(String),
    /// Error calling a contract method
    ContractInteraction(String),
    /// Error reading a file
    ReadFile(String),
    /// Error writing a file
    WriteFile(String),
}

impl ScriptError {
    /// The stable name of the error kind, written to stderr alongside the cause
    pub fn kind(&self) -> &'static str {
        match self {
            ScriptError::UnknownNetwork(_) => "UnknownNetwork",
            ScriptError::MissingEndpoint(_) => "MissingEndpoint",
            ScriptError::UnknownContract(_) => "UnknownContract",
            ScriptError::InitializerSignatureMissing(_) => "InitializerSignatureMissing",
            ScriptError::ArtifactParsing(_) => "ArtifactParsing",
            ScriptError::SignerUnavailable(_) => "SignerUnavailable",
            ScriptError::SignerMismatch(_) => "SignerMismatch",
            ScriptError::ClientInitialization(_) => "ClientInitialization",
            ScriptError::ArgumentArityMismatch(_) => "ArgumentArityMismatch",
            ScriptError::InvalidAddress(_) => "InvalidAddress",
            ScriptError::MissingProxyAddress => "MissingProxyAddress",
            ScriptError::ProxyNotFound(_) => "ProxyNotFound",
            ScriptError::CalldataConstruction(_) => "CalldataConstruction",
            ScriptError::ContractDeployment(_) => "ContractDeployment",
            ScriptError::ImplementationDeployFailed(_) => "ImplementationDeployFailed",
            ScriptError::DeploymentReverted(_) => "DeploymentReverted",
            ScriptError::UnauthorizedUpgrader(_) => "UnauthorizedUpgrader",
            ScriptError::StorageLayoutIncompatible(_) => "StorageLayoutIncompatible",
            ScriptError::ConfirmationTimeout(_) => "ConfirmationTimeout",
            ScriptError::ContractInteraction(_) => "ContractInteraction",
            ScriptError::ReadFile(_) => "ReadFile",
            ScriptError::WriteFile(_) => "WriteFile",
        }
    }
}

impl Display for ScriptError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ScriptError::UnknownNetwork(s) => write!(f, "unknown network: {}", s),
            ScriptError::MissingEndpoint(s) => write!(f, "no RPC endpoint resolved: {}", s),
            ScriptError::UnknownContract(s) => write!(f, "unknown contract: {}", s),
            ScriptError::InitializerSignatureMissing(s) => {
                write!(f, "contract declares no initializer: {}", s)
            }
            ScriptError::ArtifactParsing(s) => write!(f, "error parsing artifact: {}", s),
            ScriptError::SignerUnavailable(s) => write!(f, "no signer available: {}", s),
            ScriptError::SignerMismatch(s) => {
                write!(f, "signer not in network allow-list: {}", s)
            }
            ScriptError::ClientInitialization(s) => {
                write!(f, "error initializing client: {}", s)
            }
            ScriptError::ArgumentArityMismatch(s) => {
                write!(f, "initializer argument mismatch: {}", s)
            }
            ScriptError::InvalidAddress(s) => write!(f, "invalid address: {}", s),
            ScriptError::MissingProxyAddress => {
                write!(f, "no proxy address supplied or recorded for this contract")
            }
            ScriptError::ProxyNotFound(s) => write!(f, "no proxy found on-chain: {}", s),
            ScriptError::CalldataConstruction(s) => {
                write!(f, "error constructing calldata: {}", s)
            }
            ScriptError::ContractDeployment(s) => write!(f, "error deploying contract: {}", s),
            ScriptError::ImplementationDeployFailed(s) => {
                write!(f, "error deploying new implementation: {}", s)
            }
            ScriptError::DeploymentReverted(s) => {
                write!(f, "deployment transaction reverted: {}", s)
            }
            ScriptError::UnauthorizedUpgrader(s) => {
                write!(f, "chain rejected proxy repoint: {}", s)
            }
            ScriptError::StorageLayoutIncompatible(s) => {
                write!(f, "storage layout check failed: {}", s)
            }
            ScriptError::ConfirmationTimeout(s) => {
                write!(
                    f,
                    "confirmation wait elapsed, transaction outcome unknown: {}",
                    s
                )
            }
            ScriptError::ContractInteraction(s) => {
                write!(f, "error interacting with contract: {}", s)
            }
            ScriptError::ReadFile(s) => write!(f, "error reading file: {}", s),
            ScriptError::WriteFile(s) => write!(f, "error writing file: {}", s),
        }
    }
}

impl Error for ScriptError {}

//! Write-once records describing the outcome of a deploy or upgrade workflow

use std::fmt::{self, Display};

use chrono::{DateTime, Utc};
use ethers::types::{Address, TxHash};
use serde::Serialize;

/// The durable proof of a first-time proxy deployment.
///
/// Created only after the chain has confirmed the deployment transaction,
/// and never mutated afterwards. Everything in it can be re-derived by
/// re-querying the chain for the same proxy address.
#[derive(Debug, Clone, Serialize)]
pub struct DeploymentRecord {
    /// The address of the deployed proxy contract
    pub proxy_address: Address,
    /// The implementation address read back from the proxy's EIP-1967 slot,
    /// absent if the read-back failed (best-effort, not fatal)
    pub implementation_address: Option<Address>,
    /// The hash of the proxy deployment transaction
    pub deployment_tx_hash: TxHash,
    /// The name of the network the proxy was deployed to
    pub network: String,
    /// The address that signed the deployment transaction
    pub signer_address: Address,
    /// When the record was created, after chain confirmation
    pub timestamp: DateTime<Utc>,
}

/// The durable proof of a proxy upgrade.
#[derive(Debug, Clone, Serialize)]
pub struct UpgradeRecord {
    /// The address of the pre-existing proxy contract
    pub proxy_address: Address,
    /// The address of the newly deployed implementation contract
    pub new_implementation_address: Address,
    /// The hash of the repoint transaction, absent when the chain layer
    /// exposed no discrete receipt for the repoint
    pub upgrade_tx_hash: Option<TxHash>,
    /// The name of the network the proxy lives on
    pub network: String,
    /// The address that signed the upgrade transactions
    pub signer_address: Address,
    /// When the record was created, after the repoint confirmed
    pub timestamp: DateTime<Utc>,
}

/// The stages of the deployment workflow, in order.
///
/// The stage reached is logged on every transition and on failure, so a
/// human can tell how far the action progressed before deciding to re-run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployStage {
    /// Nothing has happened yet
    Init,
    /// Initializer arguments are bound and encoded; no chain call made
    ArgsAssembled,
    /// The proxy deployment transaction has been submitted
    ProxySubmitted,
    /// The chain confirmed the deployment transaction
    Confirmed,
    /// The deployment record has been emitted
    Reported,
}

impl Display for DeployStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeployStage::Init => write!(f, "init"),
            DeployStage::ArgsAssembled => write!(f, "args-assembled"),
            DeployStage::ProxySubmitted => write!(f, "proxy-submitted"),
            DeployStage::Confirmed => write!(f, "confirmed"),
            DeployStage::Reported => write!(f, "reported"),
        }
    }
}

/// The stages of the upgrade workflow, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpgradeStage {
    /// Nothing has happened yet
    Init,
    /// The proxy address was validated against on-chain state
    ProxyValidated,
    /// The new implementation contract is deployed
    ImplementationDeployed,
    /// The proxy now points at the new implementation
    Repointed,
    /// The upgrade record has been emitted
    Reported,
}

impl Display for UpgradeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpgradeStage::Init => write!(f, "init"),
            UpgradeStage::ProxyValidated => write!(f, "proxy-validated"),
            UpgradeStage::ImplementationDeployed => write!(f, "implementation-deployed"),
            UpgradeStage::Repointed => write!(f, "repointed"),
            UpgradeStage::Reported => write!(f, "reported"),
        }
    }
}

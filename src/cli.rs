//! Definitions of CLI arguments and commands for the deploy scripts

use std::{path::PathBuf, sync::Arc, time::Duration};

use clap::{Args, Parser, Subcommand};
use ethers::{providers::Middleware, types::Address};

use crate::{
    commands::{deploy_proxy, upgrade},
    errors::ScriptError,
    network::NetworkProfile,
};

/// Deploy and upgrade role-gated contracts behind a transparent
/// upgradeable proxy
#[derive(Parser)]
pub struct Cli {
    /// Name of the target network profile
    #[arg(short, long)]
    pub network: String,

    /// Path to the networks config file
    #[arg(long, default_value = "networks.json")]
    pub networks_path: String,

    /// Path to the deployments bookkeeping file
    #[arg(long, default_value = "deployments.json")]
    pub deployments_path: String,

    /// Directory containing compiled contract artifacts
    #[arg(long, default_value = "artifacts")]
    pub artifacts_dir: String,

    /// The workflow to run
    #[command(subcommand)]
    pub command: Command,
}

/// The resolved inputs shared by every workflow in one run
pub struct RunContext {
    /// The resolved network profile
    pub profile: NetworkProfile,
    /// The resolved signer address, read back from the key or device
    pub signer_address: Address,
    /// Path to the deployments bookkeeping file
    pub deployments_path: String,
    /// Directory containing compiled contract artifacts
    pub artifacts_dir: PathBuf,
    /// How long to wait for a submitted transaction to confirm
    pub confirmation_timeout: Duration,
}

/// The workflows the scripts can run
#[derive(Subcommand)]
pub enum Command {
    /// Deploy a contract behind a new transparent upgradeable proxy
    Deploy(DeployArgs),
    /// Upgrade an existing proxy to a new implementation
    Upgrade(UpgradeArgs),
}

impl Command {
    /// Dispatch the parsed command to its workflow
    pub async fn run(
        self,
        client: Arc<impl Middleware>,
        ctx: &RunContext,
    ) -> Result<(), ScriptError> {
        match self {
            Command::Deploy(args) => deploy_proxy(args, client, ctx).await,
            Command::Upgrade(args) => upgrade(args, client, ctx).await,
        }
    }
}

/// Deploy a contract behind a new upgradeable proxy.
///
/// Concretely, this deploys the implementation contract and then a
/// [`TransparentUpgradeableProxy`](https://docs.openzeppelin.com/contracts/5.x/api/proxy#transparent_proxy)
/// whose constructor runs the contract's initializer, so the proxy is never
/// observable uninitialized. The proxy deploys its own `ProxyAdmin`, owned
/// by the deploying account; upgrade calls can only be made through it.
#[derive(Args)]
pub struct DeployArgs {
    /// Name of the contract to deploy behind the proxy
    #[arg(short, long)]
    pub contract: String,

    /// An initializer argument as a name=value pair; repeat once per
    /// parameter. Arguments are bound by name against the initializer's
    /// ABI parameters, so the order they are given in does not matter.
    #[arg(short = 'a', long = "arg")]
    pub args: Vec<String>,
}

/// Upgrade an existing proxy to a new implementation.
///
/// Deploys the new implementation and repoints the proxy through its
/// `ProxyAdmin`. The initializer is never invoked during an upgrade.
#[derive(Args)]
pub struct UpgradeArgs {
    /// Name of the new implementation contract
    #[arg(short, long)]
    pub contract: String,

    /// Address of the existing proxy, in hex; defaults to the address
    /// recorded by a prior deployment of this contract on this network
    #[arg(long)]
    pub proxy: Option<String>,

    /// Path to an external storage-layout compatibility checker, invoked
    /// with the contract name and proxy address before the repoint is
    /// submitted; a non-zero exit aborts the upgrade
    #[arg(long)]
    pub layout_checker: Option<String>,
}

//! Entry point for the deploy scripts

use std::{path::PathBuf, sync::Arc, time::Duration};

use clap::Parser;
use deploy_scripts::{
    cli::{Cli, RunContext},
    constants::CONFIRMATION_TIMEOUT_SECS,
    errors::ScriptError,
    network,
    signer::{self, ScriptSigner},
    utils,
};
use ethers::{middleware::SignerMiddleware, providers::Middleware};
use tracing::{info, warn};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().pretty().init();

    if let Err(e) = run().await {
        eprintln!("{}: {}", e.kind(), e);
        std::process::exit(1);
    }
}

/// Resolve the network profile and signer, then dispatch the parsed command
async fn run() -> Result<(), ScriptError> {
    let Cli {
        network,
        networks_path,
        deployments_path,
        artifacts_dir,
        command,
    } = Cli::parse();

    let profile = network::resolve(&network, &networks_path)?;
    let signer = signer::resolve(&profile).await?;
    let signer_address = signer.address();
    info!("signing with account {:#x}", signer_address);

    let provider = utils::setup_provider(&profile).await?;
    match provider.get_balance(signer_address, None /* block */).await {
        Ok(balance) => info!("account balance: {} wei", balance),
        Err(e) => warn!("could not fetch account balance: {}", e),
    }

    let ctx = RunContext {
        profile,
        signer_address,
        deployments_path,
        artifacts_dir: PathBuf::from(artifacts_dir),
        confirmation_timeout: Duration::from_secs(CONFIRMATION_TIMEOUT_SECS),
    };

    match signer {
        ScriptSigner::Local(wallet) => {
            let client = Arc::new(SignerMiddleware::new(provider, wallet));
            command.run(client, &ctx).await
        }
        ScriptSigner::Ledger(ledger) => {
            let client = Arc::new(SignerMiddleware::new(provider, ledger));
            command.run(client, &ctx).await
        }
    }
}

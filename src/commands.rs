//! Implementations of the deploy and upgrade workflows
//!
//! Both workflows are strictly sequential state machines; every transition
//! is logged, and a failure terminates the run at the stage reached so the
//! output always shows how far the action progressed. Nothing here retries:
//! on-chain failures usually mean a precondition is violated, and a timed
//! out confirmation is reported as ambiguous rather than guessed at.

use std::{
    fmt::Display,
    future::Future,
    process::{Command as ProcessCommand, Stdio},
    str::FromStr,
    sync::Arc,
    time::Duration,
};

use chrono::Utc;
use ethers::{
    abi::Token,
    contract::{ContractError, ContractFactory},
    providers::Middleware,
    types::{Address, Bytes, TransactionReceipt},
};
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::{
    artifacts::{self, ContractSpec},
    calldata,
    cli::{DeployArgs, RunContext, UpgradeArgs},
    constants::{
        NUM_DEPLOY_CONFIRMATIONS, PROXY_ADMIN_STORAGE_SLOT, PROXY_CONTRACT_NAME,
        PROXY_IMPLEMENTATION_STORAGE_SLOT,
    },
    errors::ScriptError,
    network::GasPolicy,
    records::{DeployStage, DeploymentRecord, UpgradeRecord, UpgradeStage},
    report,
    solidity::ProxyAdminContract,
    utils::{read_slot_address, receipt_reverted},
};

/// Deploy a new implementation contract and its transparent upgradeable
/// proxy, invoking the initializer in the proxy's constructor.
///
/// The proxy deployment and the initializer call are one transaction, so a
/// deployed-but-uninitialized proxy is never an observable end state. A
/// re-invocation after a failure deploys a fresh pair; nothing resumes.
pub async fn deploy_proxy(
    args: DeployArgs,
    client: Arc<impl Middleware>,
    ctx: &RunContext,
) -> Result<(), ScriptError> {
    let mut stage = DeployStage::Init;
    info!(
        stage = %stage,
        contract = %args.contract,
        network = %ctx.profile.name,
        "starting deployment"
    );

    // Init -> ArgsAssembled: bind the initializer arguments by name,
    // before anything touches the network
    let spec = artifacts::resolve(&args.contract, &ctx.artifacts_dir).map_err(|e| halt(stage, e))?;
    let initializer = spec.require_initializer().map_err(|e| halt(stage, e))?;
    let provided = calldata::parse_named_args(&args.args).map_err(|e| halt(stage, e))?;
    let tokens = calldata::bind_init_args(initializer, &provided).map_err(|e| halt(stage, e))?;
    let init_calldata =
        calldata::initializer_calldata(initializer, &tokens).map_err(|e| halt(stage, e))?;
    let proxy_spec =
        artifacts::resolve(PROXY_CONTRACT_NAME, &ctx.artifacts_dir).map_err(|e| halt(stage, e))?;
    stage = DeployStage::ArgsAssembled;
    info!(stage = %stage, "initializer arguments bound");

    // The implementation must exist before the proxy constructor can link
    // and initialize it
    let implementation_address = deploy_contract(
        &spec,
        vec![],
        client.clone(),
        ctx.profile.gas,
        ctx.confirmation_timeout,
    )
    .await
    .map_err(|e| halt(stage, e))?
    .0;
    info!("implementation contract deployed at {:#x}", implementation_address);

    // ArgsAssembled -> ProxySubmitted: the proxy constructor runs the
    // initializer calldata against the implementation in the same
    // transaction
    let constructor_args = vec![
        Token::Address(implementation_address),
        Token::Address(ctx.signer_address),
        Token::Bytes(init_calldata),
    ];
    stage = DeployStage::ProxySubmitted;
    info!(stage = %stage, "submitting proxy deployment");
    let (proxy_address, receipt) = deploy_contract(
        &proxy_spec,
        constructor_args,
        client.clone(),
        ctx.profile.gas,
        ctx.confirmation_timeout,
    )
    .await
    .map_err(|e| halt(stage, e))?;
    stage = DeployStage::Confirmed;
    info!(stage = %stage, tx = ?receipt.transaction_hash, "proxy deployment confirmed");

    // Read the implementation back from the proxy's EIP-1967 slot;
    // best-effort, the record marks it absent on failure
    let implementation_address =
        match read_slot_address(&*client, proxy_address, PROXY_IMPLEMENTATION_STORAGE_SLOT).await {
            Ok(address) if address != Address::zero() => Some(address),
            Ok(_) => {
                warn!("proxy implementation slot reads as zero");
                None
            }
            Err(e) => {
                warn!("could not read back implementation address: {}", e);
                None
            }
        };

    let record = DeploymentRecord {
        proxy_address,
        implementation_address,
        deployment_tx_hash: receipt.transaction_hash,
        network: ctx.profile.name.clone(),
        signer_address: ctx.signer_address,
        timestamp: Utc::now(),
    };
    report::emit_deployment(&record);
    report::record_deployment(&ctx.deployments_path, &args.contract, &record);
    stage = DeployStage::Reported;
    info!(stage = %stage, "deployment complete");

    Ok(())
}

/// Upgrade an existing proxy to a freshly deployed implementation.
///
/// The proxy must already exist; this workflow never creates one and never
/// invokes an initializer. Repointing to the already-current implementation
/// is submitted like any other upgrade and is a chain-level no-op.
pub async fn upgrade(
    args: UpgradeArgs,
    client: Arc<impl Middleware>,
    ctx: &RunContext,
) -> Result<(), ScriptError> {
    let mut stage = UpgradeStage::Init;
    info!(
        stage = %stage,
        contract = %args.contract,
        network = %ctx.profile.name,
        "starting upgrade"
    );

    // The proxy address comes from the caller or a prior deployment
    // record; it is never inferred
    let proxy_address = match &args.proxy {
        Some(address) => Address::from_str(address).map_err(|e| {
            halt(
                stage,
                ScriptError::InvalidAddress(format!("proxy address: {}", e)),
            )
        })?,
        None => report::stored_proxy_address(&ctx.deployments_path, &ctx.profile.name, &args.contract)
            .map_err(|e| halt(stage, e))?,
    };

    // Init -> ProxyValidated: there must be observable proxy code on-chain
    let code = client
        .get_code(proxy_address, None /* block */)
        .await
        .map_err(|e| halt(stage, ScriptError::ContractInteraction(e.to_string())))?;
    if code.is_empty() {
        return Err(halt(
            stage,
            ScriptError::ProxyNotFound(format!("no code at {:#x}", proxy_address)),
        ));
    }
    let admin_address = read_slot_address(&*client, proxy_address, PROXY_ADMIN_STORAGE_SLOT)
        .await
        .map_err(|e| halt(stage, e))?;
    if admin_address == Address::zero() {
        return Err(halt(
            stage,
            ScriptError::ProxyNotFound(format!(
                "{:#x} has no admin slot set, not a transparent proxy",
                proxy_address
            )),
        ));
    }
    stage = UpgradeStage::ProxyValidated;
    info!(stage = %stage, admin = ?admin_address, "proxy validated");

    // ProxyValidated -> ImplementationDeployed: deploy only the new
    // implementation; no initializer runs during an upgrade
    let spec = artifacts::resolve(&args.contract, &ctx.artifacts_dir).map_err(|e| halt(stage, e))?;
    let new_implementation = deploy_contract(
        &spec,
        vec![],
        client.clone(),
        ctx.profile.gas,
        ctx.confirmation_timeout,
    )
    .await
    .map_err(|e| {
        let err = match e {
            timeout @ ScriptError::ConfirmationTimeout(_) => timeout,
            other => ScriptError::ImplementationDeployFailed(other.to_string()),
        };
        halt(stage, err)
    })?
    .0;
    stage = UpgradeStage::ImplementationDeployed;
    info!(stage = %stage, implementation = ?new_implementation, "new implementation deployed");

    // Fail-fast layout gate, run before the repoint is submitted
    if let Some(checker) = &args.layout_checker {
        run_layout_checker(checker, &args.contract, proxy_address).map_err(|e| halt(stage, e))?;
    }

    // ImplementationDeployed -> Repointed
    let receipt = repoint_proxy(
        client.clone(),
        admin_address,
        proxy_address,
        new_implementation,
        ctx.profile.gas,
        ctx.confirmation_timeout,
    )
    .await
    .map_err(|e| halt(stage, e))?;
    stage = UpgradeStage::Repointed;
    info!(stage = %stage, "proxy repointed");

    let record = UpgradeRecord {
        proxy_address,
        new_implementation_address: new_implementation,
        upgrade_tx_hash: receipt.map(|r| r.transaction_hash),
        network: ctx.profile.name.clone(),
        signer_address: ctx.signer_address,
        timestamp: Utc::now(),
    };
    report::emit_upgrade(&record);
    report::record_upgrade(&ctx.deployments_path, &args.contract, &record);
    stage = UpgradeStage::Reported;
    info!(stage = %stage, "upgrade complete");

    Ok(())
}

/// Repoint the proxy to the new implementation through its proxy admin.
///
/// The proxy admin is the only address the proxy accepts upgrade calls
/// from; whether the signer holds the upgrader role is the contract's
/// decision, never pre-checked here. The returned receipt is absent when
/// the chain layer exposes no discrete transaction for the repoint.
async fn repoint_proxy<M: Middleware>(
    client: Arc<M>,
    admin_address: Address,
    proxy_address: Address,
    new_implementation: Address,
    gas: GasPolicy,
    confirmation_timeout: Duration,
) -> Result<Option<TransactionReceipt>, ScriptError> {
    let proxy_admin = ProxyAdminContract::new(admin_address, client);
    let mut call = proxy_admin.upgrade_and_call(proxy_address, new_implementation, Bytes::new());
    if let GasPolicy::Fixed(price) = gas {
        call = call.gas_price(price);
    }

    let pending = call.send().await.map_err(classify_repoint_error)?;
    let receipt = await_confirmation(
        pending.confirmations(NUM_DEPLOY_CONFIRMATIONS),
        confirmation_timeout,
        format!("repoint of {:#x}", proxy_address),
    )
    .await?
    .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?;
    check_repoint_receipt(&receipt)?;

    Ok(receipt)
}

/// Map a repoint submission error: a chain-side revert means the signer
/// lacks the upgrader role, anything else is a transport problem.
///
/// Reverts surface either as decoded revert data or as an `execution
/// reverted` RPC error during gas estimation, depending on where the node
/// rejects the call.
fn classify_repoint_error<M: Middleware>(e: ContractError<M>) -> ScriptError {
    let message = e.to_string();
    if e.is_revert() || message.to_lowercase().contains("revert") {
        ScriptError::UnauthorizedUpgrader(message)
    } else {
        ScriptError::ContractInteraction(message)
    }
}

/// Reject a mined repoint whose receipt reports a reverted execution
fn check_repoint_receipt(receipt: &Option<TransactionReceipt>) -> Result<(), ScriptError> {
    if let Some(receipt) = receipt {
        if receipt_reverted(receipt) {
            return Err(ScriptError::UnauthorizedUpgrader(format!(
                "repoint transaction {:#x} reverted",
                receipt.transaction_hash
            )));
        }
    }

    Ok(())
}

/// Bound a confirmation wait.
///
/// An elapsed wait reports the ambiguity explicitly; it never assumes the
/// underlying transaction did or did not land, and the caller must re-query
/// the chain out-of-band before retrying.
async fn await_confirmation<F, T>(
    fut: F,
    confirmation_timeout: Duration,
    what: String,
) -> Result<T, ScriptError>
where
    F: Future<Output = T>,
{
    timeout(confirmation_timeout, fut).await.map_err(|_| {
        ScriptError::ConfirmationTimeout(format!(
            "{} exceeded {}s; re-query the chain before retrying",
            what,
            confirmation_timeout.as_secs()
        ))
    })
}

/// Deploy one contract from its spec, waiting for confirmation under the
/// bounded timeout, and return its address and mined receipt
async fn deploy_contract<M: Middleware>(
    spec: &ContractSpec,
    constructor_args: Vec<Token>,
    client: Arc<M>,
    gas: GasPolicy,
    confirmation_timeout: Duration,
) -> Result<(Address, TransactionReceipt), ScriptError> {
    let factory = ContractFactory::new(spec.abi.clone(), spec.bytecode.clone(), client);
    let mut deployer = factory
        .deploy_tokens(constructor_args)
        .map_err(|e| ScriptError::ContractDeployment(e.to_string()))?;
    if let GasPolicy::Fixed(price) = gas {
        deployer.tx.set_gas_price(price);
    }
    let deployer = deployer.confirmations(NUM_DEPLOY_CONFIRMATIONS);

    let (contract, receipt) = await_confirmation(
        deployer.send_with_receipt(),
        confirmation_timeout,
        format!("deployment of {}", spec.name),
    )
    .await?
    .map_err(|e| ScriptError::ContractDeployment(e.to_string()))?;

    if receipt_reverted(&receipt) {
        return Err(ScriptError::DeploymentReverted(format!(
            "{} ({:#x})",
            spec.name, receipt.transaction_hash
        )));
    }

    Ok((contract.address(), receipt))
}

/// Run the external storage-layout compatibility checker, passing the
/// contract name and proxy address; a non-zero exit fails the upgrade
/// before the repoint is submitted
fn run_layout_checker(
    checker: &str,
    contract: &str,
    proxy_address: Address,
) -> Result<(), ScriptError> {
    let mut cmd = ProcessCommand::new(checker);
    cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
    cmd.arg(contract);
    cmd.arg(format!("{:#x}", proxy_address));

    let status = cmd
        .status()
        .map_err(|e| ScriptError::StorageLayoutIncompatible(format!("checker failed to run: {}", e)))?;
    if !status.success() {
        return Err(ScriptError::StorageLayoutIncompatible(format!(
            "checker exited with {}",
            status
        )));
    }

    Ok(())
}

/// Log the stage a failing workflow reached, then pass the error through
fn halt<S: Display>(stage: S, err: ScriptError) -> ScriptError {
    error!(stage = %stage, kind = err.kind(), "workflow halted: {}", err);
    err
}

#[cfg(test)]
mod tests {
    use ethers::{
        providers::{JsonRpcError, MockResponse, Provider},
        types::{TxHash, U64},
    };

    use super::*;

    /// The proxy and implementation addresses used by the repoint tests
    const PROXY: Address = Address::repeat_byte(0xaa);
    /// The admin address used by the repoint tests
    const ADMIN: Address = Address::repeat_byte(0xbb);

    /// Build a JSON-RPC error response with the given message
    fn rpc_error(code: i64, message: &str) -> MockResponse {
        MockResponse::Error(JsonRpcError {
            code,
            message: message.to_string(),
            data: None,
        })
    }

    /// A chain-side revert during repoint submission is classified as
    /// `UnauthorizedUpgrader`: the contract refused the upgrade, the
    /// signer does not hold the role
    #[tokio::test]
    async fn test_repoint_revert_is_unauthorized() {
        let (provider, mock) = Provider::mocked();
        mock.push_response(rpc_error(3, "execution reverted: caller is not the upgrader"));

        let err = repoint_proxy(
            Arc::new(provider),
            ADMIN,
            PROXY,
            Address::repeat_byte(0xcc),
            GasPolicy::Auto,
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ScriptError::UnauthorizedUpgrader(_)));
    }

    /// A transport-level failure during repoint submission is not blamed
    /// on the signer's role
    #[tokio::test]
    async fn test_repoint_transport_error_is_not_unauthorized() {
        let (provider, mock) = Provider::mocked();
        mock.push_response(rpc_error(-32000, "insufficient funds for gas * price + value"));

        let err = repoint_proxy(
            Arc::new(provider),
            ADMIN,
            PROXY,
            Address::repeat_byte(0xcc),
            GasPolicy::Auto,
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ScriptError::ContractInteraction(_)));
    }

    /// A mined repoint whose receipt reports status zero is rejected as
    /// `UnauthorizedUpgrader`; a successful or absent receipt passes
    #[test]
    fn test_repoint_receipt_status() {
        check_repoint_receipt(&None).unwrap();

        let mut receipt = TransactionReceipt {
            transaction_hash: TxHash::repeat_byte(1),
            ..Default::default()
        };
        receipt.status = Some(U64::one());
        check_repoint_receipt(&Some(receipt.clone())).unwrap();

        receipt.status = Some(U64::zero());
        let err = check_repoint_receipt(&Some(receipt)).unwrap_err();
        assert!(matches!(err, ScriptError::UnauthorizedUpgrader(_)));
    }

    /// An elapsed confirmation wait maps to `ConfirmationTimeout` without
    /// assuming anything about the transaction's outcome
    #[tokio::test]
    async fn test_confirmation_wait_times_out() {
        let err = await_confirmation(
            std::future::pending::<()>(),
            Duration::from_millis(10),
            "deployment of Plots".to_string(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ScriptError::ConfirmationTimeout(_)));
    }
}

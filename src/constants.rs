//! Constants used in the deploy scripts

/// The storage slot containing the implementation contract address
/// in the upgradeable proxy.
///
/// This is specified in EIP1967: https://eips.ethereum.org/EIPS/eip-1967#logic-contract-address
pub const PROXY_IMPLEMENTATION_STORAGE_SLOT: &str =
    "0x360894a13ba1a3210667c828492db98dca3e2076cc3735a920a3ca505d382bbc";

/// The storage slot containing the proxy admin contract address
/// in the upgradeable proxy.
///
/// This is specified in EIP1967: https://eips.ethereum.org/EIPS/eip-1967#admin-address
pub const PROXY_ADMIN_STORAGE_SLOT: &str =
    "0xb53127684a568b3173ae13b9f8a6016e243e63b6e8ee1178d6a717850b5d6103";

/// The number of bytes stored in a single storage slot
pub const NUM_BYTES_STORAGE_SLOT: usize = 32;

/// The number of bytes in an Ethereum address
pub const NUM_BYTES_ADDRESS: usize = 20;

/// The number of confirmations to wait for after submitting a transaction
pub const NUM_DEPLOY_CONFIRMATIONS: usize = 1;

/// The number of seconds to wait for a submitted transaction to confirm
/// before reporting an ambiguous timeout
pub const CONFIRMATION_TIMEOUT_SECS: u64 = 300;

/// The name of the initializer method in upgradeable contract ABIs
pub const INITIALIZER_NAME: &str = "initialize";

/// The artifact name of the transparent upgradeable proxy contract
///
/// Compiled from https://github.com/OpenZeppelin/openzeppelin-contracts/blob/v5.0.0/contracts/proxy/transparent/TransparentUpgradeableProxy.sol
pub const PROXY_CONTRACT_NAME: &str = "TransparentUpgradeableProxy";

/// The name of the environment variable holding the local signing key
pub const PKEY_ENV_VAR: &str = "PKEY";

/// The name of the environment variable holding the comma-separated list
/// of addresses allowed to sign through a Ledger device
pub const LEDGER_ACCOUNTS_ENV_VAR: &str = "LEDGER_ACCOUNTS";

/// The suffix of the per-network environment variable overriding the RPC URL,
/// e.g. `MAINNET_RPC_URL` for the `mainnet` profile
pub const RPC_URL_ENV_VAR_SUFFIX: &str = "_RPC_URL";

/// The Ledger Live derivation index used for hardware signing
pub const LEDGER_ACCOUNT_INDEX: usize = 0;

/// The deployments key in the `deployments.json` file
pub const DEPLOYMENTS_KEY: &str = "deployments";

/// The suffix of a proxy contract key in the `deployments.json` file
pub const PROXY_KEY_SUFFIX: &str = "_proxy";

/// The suffix of an implementation contract key in the `deployments.json` file
pub const IMPLEMENTATION_KEY_SUFFIX: &str = "_implementation";

//! Scripts for deploying and upgrading role-gated contracts behind a
//! transparent upgradeable proxy.

#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

pub mod artifacts;
pub mod calldata;
pub mod cli;
pub mod commands;
pub mod constants;
pub mod errors;
pub mod network;
pub mod records;
pub mod report;
pub mod signer;
mod solidity;
pub mod utils;

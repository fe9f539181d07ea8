//! Ethereum/EVM support for tartarus.
//!
//! This crate provides:
//! - EIP-55 checksummed addresses and address derivation from private keys
//! - Conversions between base units and decimal display amounts
//! - Minimal ABI encoding and ERC-20 call encoding/decoding
//! - Legacy transaction building and EIP-155 signing
//! - The [`rpc::ChainClient`] boundary and a blocking JSON-RPC client
//! - [`asset::AssetDescriptor`], which ties the above together per asset

pub mod abi;
pub mod address;
pub mod asset;
pub mod erc20;
pub mod error;
pub mod rpc;
pub mod transaction;
pub mod units;

pub use address::Address;
pub use asset::{AssetDescriptor, AssetKind};
pub use error::EthError;
pub use rpc::{ChainClient, HttpChainClient};
pub use transaction::{SignedTransaction, UnsignedTransaction};

/// Re-exported so callers can name amounts without depending on the
/// underlying crates directly.
pub use alloy_primitives::U256;
pub use bigdecimal::BigDecimal;

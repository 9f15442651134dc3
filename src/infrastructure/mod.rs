//! Infrastructure layer - External integrations
//!
//! This layer contains:
//! - ABI encoding and decoding using alloy-dyn-abi
//! - Filesystem scanning for additional ABI tables
//! - Alloy-based contract calls against a JSON-RPC node

pub mod abi;
pub mod ethereum;

pub use abi::{AbiScanner, AlloyAbiCodec};
pub use ethereum::{AlloyCaller, ContractCaller, MarketReader};

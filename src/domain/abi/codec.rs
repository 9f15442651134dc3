//! ABI codec trait and decoded value types

use alloy_primitives::B256;
use serde::{Deserialize, Serialize};

use super::AbiEntry;

/// A decoded argument, return value or event field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedArg {
    /// Parameter name (or "arg{n}" if unnamed)
    pub name: String,
    /// Solidity type (e.g., "address", "uint256", "(uint256,address)")
    pub kind: String,
    /// Decoded value as a formatted string
    pub value: String,
}

/// Result of decoding a function call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecodedCall {
    /// Table the function was found in, when resolved through a registry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    /// Function name
    pub function_name: String,
    /// Full function signature (e.g., "transfer(address,uint256)")
    pub signature: String,
    /// Decoded arguments
    pub arguments: Vec<DecodedArg>,
}

/// Result of decoding an event log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecodedLog {
    pub event_name: String,
    pub signature: String,
    /// Fields in declaration order, indexed ones included
    pub fields: Vec<DecodedArg>,
}

impl DecodedLog {
    pub fn field(&self, name: &str) -> Option<&DecodedArg> {
        self.fields.iter().find(|field| field.name == name)
    }
}

/// Trait for ABI codec implementations
///
/// Table entries describe the shapes; implementations own the binary
/// encoding rules.
pub trait AbiCodec: Send + Sync {
    /// Encode calldata (selector followed by arguments) from string arguments
    fn encode_call(&self, function: &AbiEntry, args: &[&str]) -> anyhow::Result<Vec<u8>>;

    /// Decode calldata given a function entry
    ///
    /// # Arguments
    /// * `function` - The function entry to decode with
    /// * `data` - The calldata bytes (including the 4-byte selector)
    fn decode_calldata(&self, function: &AbiEntry, data: &[u8]) -> anyhow::Result<DecodedCall>;

    /// Decode the return data of a call
    fn decode_output(&self, function: &AbiEntry, data: &[u8]) -> anyhow::Result<Vec<DecodedArg>>;

    /// Decode an event log from its topics and data
    fn decode_log(
        &self,
        event: &AbiEntry,
        topics: &[B256],
        data: &[u8],
    ) -> anyhow::Result<DecodedLog>;

    /// Decode calldata by looking up the selector
    ///
    /// # Returns
    /// * `Ok(Some(DecodedCall))` - If the selector was found and decoding succeeded
    /// * `Ok(None)` - If the selector was not found
    /// * `Err(...)` - If decoding fails
    fn decode_by_selector(&self, data: &[u8]) -> anyhow::Result<Option<DecodedCall>>;
}

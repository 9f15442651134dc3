//! ABI entry records - one constructor, function, event, fallback, receive or error

use alloy_primitives::{keccak256, B256};
use serde::{Deserialize, Serialize};

/// A 4-byte function (or custom error) selector
pub type Selector = [u8; 4];

/// Entry kind, the `type` field of a JSON ABI item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Constructor,
    /// A missing `type` field means `function`
    #[default]
    Function,
    Event,
    Fallback,
    Receive,
    Error,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Constructor => "constructor",
            EntryKind::Function => "function",
            EntryKind::Event => "event",
            EntryKind::Fallback => "fallback",
            EntryKind::Receive => "receive",
            EntryKind::Error => "error",
        }
    }

    /// Whether entries of this kind are addressed by name
    pub fn is_named(&self) -> bool {
        matches!(self, EntryKind::Function | EntryKind::Event | EntryKind::Error)
    }

    /// Whether entries of this kind carry a mutability classification
    pub fn has_mutability(&self) -> bool {
        matches!(
            self,
            EntryKind::Constructor | EntryKind::Function | EntryKind::Fallback | EntryKind::Receive
        )
    }
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mutability classification of a callable entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mutability {
    Pure,
    View,
    #[default]
    NonPayable,
    Payable,
}

impl Mutability {
    /// Reads chain state without changing it
    pub fn is_read_only(&self) -> bool {
        matches!(self, Mutability::Pure | Mutability::View)
    }

    /// Accepts native currency along with the call
    pub fn accepts_value(&self) -> bool {
        matches!(self, Mutability::Payable)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mutability::Pure => "pure",
            Mutability::View => "view",
            Mutability::NonPayable => "nonpayable",
            Mutability::Payable => "payable",
        }
    }
}

impl std::fmt::Display for Mutability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named, typed input or output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    /// Parameter name (may be empty)
    #[serde(default)]
    pub name: String,
    /// Solidity type tag (e.g., "address", "uint256", "tuple[]")
    #[serde(rename = "type")]
    pub kind: String,
    /// Source-level type (e.g., "contract CToken", "address payable")
    #[serde(
        default,
        rename = "internalType",
        skip_serializing_if = "Option::is_none"
    )]
    pub internal_type: Option<String>,
    /// Members of a tuple type
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<Param>,
    /// Event inputs only: stored in a topic rather than in log data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexed: Option<bool>,
}

impl Param {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            internal_type: None,
            components: Vec::new(),
            indexed: None,
        }
    }

    pub fn is_indexed(&self) -> bool {
        self.indexed.unwrap_or(false)
    }

    /// Canonical type as used in signatures, with tuples expanded
    ///
    /// `tuple[2]` with components `(address,uint256)` becomes `(address,uint256)[2]`.
    pub fn canonical_type(&self) -> String {
        match self.kind.strip_prefix("tuple") {
            Some(suffix) => {
                let inner: Vec<String> = self.components.iter().map(Param::canonical_type).collect();
                format!("({}){}", inner.join(","), suffix)
            }
            None => self.kind.clone(),
        }
    }
}

/// One record of an ABI table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiEntry {
    #[serde(rename = "type", default)]
    pub kind: EntryKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub inputs: Vec<Param>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<Param>,
    #[serde(
        default,
        rename = "stateMutability",
        skip_serializing_if = "Option::is_none"
    )]
    pub state_mutability: Option<Mutability>,
    /// Pre-0.4.16 artifacts: `constant: true` means view
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constant: Option<bool>,
    /// Pre-0.4.16 artifacts: `payable: true` means payable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payable: Option<bool>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub anonymous: bool,
    /// Declared selector (functions, errors) or topic (events), hex
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl AbiEntry {
    /// Human-readable name, empty for unnamed kinds
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    /// Mutability classification, `None` for events and errors
    pub fn mutability(&self) -> Option<Mutability> {
        if !self.kind.has_mutability() {
            return None;
        }
        if let Some(mutability) = self.state_mutability {
            return Some(mutability);
        }
        let legacy = if self.payable == Some(true) {
            Mutability::Payable
        } else if self.constant == Some(true) {
            Mutability::View
        } else {
            Mutability::NonPayable
        };
        Some(legacy)
    }

    /// Canonical signature, e.g. `transfer(address,uint256)`
    ///
    /// Constructors, fallback and receive entries have no signature.
    pub fn signature(&self) -> Option<String> {
        if !self.kind.is_named() {
            return None;
        }
        let types: Vec<String> = self.inputs.iter().map(Param::canonical_type).collect();
        Some(format!("{}({})", self.name(), types.join(",")))
    }

    /// Selector derived from the canonical signature (functions and errors)
    pub fn selector(&self) -> Option<Selector> {
        if !matches!(self.kind, EntryKind::Function | EntryKind::Error) {
            return None;
        }
        self.signature().map(|sig| compute_selector(&sig))
    }

    /// Topic derived from the canonical signature (events)
    pub fn topic(&self) -> Option<B256> {
        if self.kind != EntryKind::Event {
            return None;
        }
        self.signature().map(|sig| keccak256(sig.as_bytes()))
    }

    /// Declared identifier decoded from hex, if present
    ///
    /// Returns `Err` with the raw text when the field is not valid hex.
    pub fn declared_identifier(&self) -> Result<Option<Vec<u8>>, String> {
        let Some(raw) = self.signature.as_deref() else {
            return Ok(None);
        };
        let payload = raw
            .strip_prefix("0x")
            .or_else(|| raw.strip_prefix("0X"))
            .unwrap_or(raw);
        hex::decode(payload).map(Some).map_err(|_| raw.to_string())
    }

    /// Derived identifier bytes: 4 for functions/errors, 32 for events
    pub fn derived_identifier(&self) -> Option<Vec<u8>> {
        match self.kind {
            EntryKind::Event => self.topic().map(|topic| topic.to_vec()),
            _ => self.selector().map(|selector| selector.to_vec()),
        }
    }

    /// Short description used in listings and error messages
    pub fn describe(&self) -> String {
        match self.signature() {
            Some(sig) => format!("{} {}", self.kind, sig),
            None => self.kind.to_string(),
        }
    }
}

/// Compute the 4-byte selector of a canonical signature
pub fn compute_selector(signature: &str) -> Selector {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Format a selector as `0x`-prefixed hex
pub fn selector_hex(selector: Selector) -> String {
    format!("0x{}", hex::encode(selector))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(json: &str) -> AbiEntry {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_compute_selector() {
        assert_eq!(compute_selector("transfer(address,uint256)"), [0xa9, 0x05, 0x9c, 0xbb]);
        assert_eq!(compute_selector("mint(uint256)"), [0xa0, 0x71, 0x2d, 0x68]);
        assert_eq!(compute_selector("mint()"), [0x12, 0x49, 0xc5, 0x8b]);
    }

    #[test]
    fn test_missing_type_defaults_to_function() {
        let e = entry(r#"{"name":"exchangeRateStored","inputs":[],"outputs":[{"name":"","type":"uint256"}]}"#);
        assert_eq!(e.kind, EntryKind::Function);
        assert_eq!(e.signature().as_deref(), Some("exchangeRateStored()"));
        assert_eq!(e.selector(), Some([0x18, 0x2d, 0xf0, 0xf5]));
    }

    #[test]
    fn test_legacy_mutability_flags() {
        let view = entry(r#"{"type":"function","name":"getCash","inputs":[],"constant":true,"payable":false}"#);
        assert_eq!(view.mutability(), Some(Mutability::View));
        assert!(view.mutability().unwrap().is_read_only());

        let payable = entry(r#"{"type":"function","name":"mint","inputs":[],"constant":false,"payable":true}"#);
        assert_eq!(payable.mutability(), Some(Mutability::Payable));

        let plain = entry(r#"{"type":"function","name":"accrueInterest","inputs":[]}"#);
        assert_eq!(plain.mutability(), Some(Mutability::NonPayable));
    }

    #[test]
    fn test_state_mutability_wins_over_legacy() {
        let e = entry(
            r#"{"type":"function","name":"x","inputs":[],"constant":true,"stateMutability":"pure"}"#,
        );
        assert_eq!(e.mutability(), Some(Mutability::Pure));
    }

    #[test]
    fn test_event_has_no_mutability_or_selector() {
        let e = entry(
            r#"{"type":"event","name":"Transfer","anonymous":false,"inputs":[
                {"name":"from","type":"address","indexed":true},
                {"name":"to","type":"address","indexed":true},
                {"name":"amount","type":"uint256","indexed":false}]}"#,
        );
        assert_eq!(e.mutability(), None);
        assert_eq!(e.selector(), None);
        assert_eq!(
            hex::encode(e.topic().unwrap()),
            "ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"
        );
        assert!(e.inputs[0].is_indexed());
        assert!(!e.inputs[2].is_indexed());
    }

    #[test]
    fn test_tuple_canonical_type() {
        let param = Param {
            name: "orders".into(),
            kind: "tuple[]".into(),
            internal_type: None,
            components: vec![Param::new("maker", "address"), Param::new("amount", "uint256")],
            indexed: None,
        };
        assert_eq!(param.canonical_type(), "(address,uint256)[]");
    }

    #[test]
    fn test_unnamed_kinds_have_no_signature() {
        let fallback = entry(r#"{"type":"fallback","stateMutability":"payable"}"#);
        assert_eq!(fallback.signature(), None);
        assert_eq!(fallback.describe(), "fallback");
        assert!(fallback.mutability().unwrap().accepts_value());
    }

    #[test]
    fn test_declared_identifier() {
        let e = entry(r#"{"type":"function","name":"mint","inputs":[],"signature":"0x1249c58b"}"#);
        assert_eq!(e.declared_identifier().unwrap(), Some(vec![0x12, 0x49, 0xc5, 0x8b]));
        assert_eq!(e.derived_identifier(), Some(vec![0x12, 0x49, 0xc5, 0x8b]));

        let bad = entry(r#"{"type":"function","name":"mint","inputs":[],"signature":"0xzz"}"#);
        assert_eq!(bad.declared_identifier(), Err("0xzz".to_string()));
    }
}

//! ABI table - an ordered, immutable sequence of entries for one contract

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use alloy_primitives::B256;
use thiserror::Error;

use super::entry::{AbiEntry, EntryKind, Selector};

/// Failure to build a table from JSON text
#[derive(Debug, Error)]
pub enum TableError {
    #[error("invalid ABI JSON for {table}: {source}")]
    Json {
        table: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("{table}: expected an entry array or an artifact with an \"abi\" field")]
    Shape { table: String },
}

/// Failure to locate an entry by name
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("{table} has no {kind} named `{name}`")]
    NotFound {
        table: String,
        kind: EntryKind,
        name: String,
    },
    #[error("`{name}` is overloaded in {table}; use one of: {}", .candidates.join(", "))]
    Ambiguous {
        table: String,
        name: String,
        candidates: Vec<String>,
    },
}

/// Where a table came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableSource {
    /// Embedded in this crate
    Builtin,
    /// Loaded from a file at runtime
    File(PathBuf),
}

impl fmt::Display for TableSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableSource::Builtin => f.write_str("builtin"),
            TableSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// A named ABI table with selector and topic indexes
#[derive(Debug, Clone)]
pub struct AbiTable {
    name: String,
    source: TableSource,
    entries: Vec<AbiEntry>,
    /// Selector -> index into `entries` (first function wins)
    selectors: HashMap<Selector, usize>,
    /// Topic -> index into `entries` (first event wins)
    topics: HashMap<B256, usize>,
}

impl AbiTable {
    /// Build a table from already-parsed entries
    pub fn new(name: impl Into<String>, source: TableSource, entries: Vec<AbiEntry>) -> Self {
        let mut selectors = HashMap::new();
        let mut topics = HashMap::new();
        for (idx, entry) in entries.iter().enumerate() {
            match entry.kind {
                EntryKind::Function => {
                    if let Some(selector) = entry.selector() {
                        selectors.entry(selector).or_insert(idx);
                    }
                }
                EntryKind::Event => {
                    if let Some(topic) = entry.topic() {
                        topics.entry(topic).or_insert(idx);
                    }
                }
                _ => {}
            }
        }

        Self {
            name: name.into(),
            source,
            entries,
            selectors,
            topics,
        }
    }

    /// Parse a table from JSON text
    ///
    /// Accepts either a raw entry array or a build artifact with an `abi` field.
    pub fn from_json(
        name: impl Into<String>,
        source: TableSource,
        text: &str,
    ) -> Result<Self, TableError> {
        let name = name.into();
        let value: serde_json::Value =
            serde_json::from_str(text).map_err(|source| TableError::Json {
                table: name.clone(),
                source,
            })?;

        let abi_value = if value.is_array() {
            value
        } else if let Some(abi) = value.get("abi").filter(|abi| abi.is_array()) {
            abi.clone()
        } else {
            return Err(TableError::Shape { table: name });
        };

        let entries: Vec<AbiEntry> =
            serde_json::from_value(abi_value).map_err(|source| TableError::Json {
                table: name.clone(),
                source,
            })?;

        tracing::debug!(table = %name, entries = entries.len(), "parsed ABI table");
        Ok(Self::new(name, source, entries))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &TableSource {
        &self.source
    }

    pub fn entries(&self) -> &[AbiEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn of_kind(&self, kind: EntryKind) -> impl Iterator<Item = &AbiEntry> {
        self.entries.iter().filter(move |entry| entry.kind == kind)
    }

    pub fn functions(&self) -> impl Iterator<Item = &AbiEntry> {
        self.of_kind(EntryKind::Function)
    }

    pub fn events(&self) -> impl Iterator<Item = &AbiEntry> {
        self.of_kind(EntryKind::Event)
    }

    pub fn errors(&self) -> impl Iterator<Item = &AbiEntry> {
        self.of_kind(EntryKind::Error)
    }

    pub fn constructor(&self) -> Option<&AbiEntry> {
        self.of_kind(EntryKind::Constructor).next()
    }

    pub fn fallback(&self) -> Option<&AbiEntry> {
        self.of_kind(EntryKind::Fallback).next()
    }

    pub fn receive(&self) -> Option<&AbiEntry> {
        self.of_kind(EntryKind::Receive).next()
    }

    /// All functions sharing a name
    pub fn overloads<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a AbiEntry> + 'a {
        self.functions().filter(move |entry| entry.name() == name)
    }

    /// Find a function by name, or by full signature to pick an overload
    pub fn function(&self, name_or_signature: &str) -> Result<&AbiEntry, LookupError> {
        self.find(EntryKind::Function, name_or_signature)
    }

    /// Find an event by name, or by full signature
    pub fn event(&self, name_or_signature: &str) -> Result<&AbiEntry, LookupError> {
        self.find(EntryKind::Event, name_or_signature)
    }

    fn find(&self, kind: EntryKind, key: &str) -> Result<&AbiEntry, LookupError> {
        let key: String = key.chars().filter(|c| !c.is_whitespace()).collect();

        if key.contains('(') {
            return self
                .of_kind(kind)
                .find(|entry| entry.signature().as_deref() == Some(key.as_str()))
                .ok_or_else(|| self.not_found(kind, &key));
        }

        let mut matches = self.of_kind(kind).filter(|entry| entry.name() == key);
        let first = matches.next().ok_or_else(|| self.not_found(kind, &key))?;
        if matches.next().is_none() {
            return Ok(first);
        }

        let candidates = self
            .of_kind(kind)
            .filter(|entry| entry.name() == key)
            .filter_map(AbiEntry::signature)
            .collect();
        Err(LookupError::Ambiguous {
            table: self.name.clone(),
            name: key,
            candidates,
        })
    }

    fn not_found(&self, kind: EntryKind, name: &str) -> LookupError {
        LookupError::NotFound {
            table: self.name.clone(),
            kind,
            name: name.to_string(),
        }
    }

    /// Look up a function by its 4-byte selector
    pub fn function_by_selector(&self, selector: Selector) -> Option<&AbiEntry> {
        self.selectors.get(&selector).map(|&idx| &self.entries[idx])
    }

    /// Look up an event by its topic
    pub fn event_by_topic(&self, topic: B256) -> Option<&AbiEntry> {
        self.topics.get(&topic).map(|&idx| &self.entries[idx])
    }

    /// Selectors of every function, in table order
    pub fn selectors(&self) -> impl Iterator<Item = (Selector, &AbiEntry)> {
        self.functions()
            .filter_map(|entry| entry.selector().map(|selector| (selector, entry)))
    }

    /// Convert to alloy's JSON ABI model
    ///
    /// Declared identifiers and legacy mutability flags are dropped; every
    /// callable entry gets an explicit `stateMutability`.
    pub fn to_json_abi(&self) -> serde_json::Result<alloy_json_abi::JsonAbi> {
        let items = self
            .entries
            .iter()
            .map(normalized_item)
            .collect::<serde_json::Result<Vec<_>>>()?;
        serde_json::from_value(serde_json::Value::Array(items))
    }
}

fn normalized_item(entry: &AbiEntry) -> serde_json::Result<serde_json::Value> {
    use serde_json::{json, Value};

    let mut value = serde_json::to_value(entry)?;
    let Value::Object(map) = &mut value else {
        return Ok(value);
    };
    map.remove("signature");
    map.remove("constant");
    map.remove("payable");
    if let Some(mutability) = entry.mutability() {
        map.insert("stateMutability".into(), json!(mutability.as_str()));
    }
    match entry.kind {
        EntryKind::Function => {
            map.entry("outputs").or_insert_with(|| json!([]));
        }
        EntryKind::Event => {
            map.insert("anonymous".into(), json!(entry.anonymous));
            if let Some(Value::Array(inputs)) = map.get_mut("inputs") {
                for (input, param) in inputs.iter_mut().zip(&entry.inputs) {
                    if let Value::Object(input) = input {
                        input.insert("indexed".into(), json!(param.is_indexed()));
                    }
                }
            }
        }
        _ => {}
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[
        {"type":"function","name":"claimComp","inputs":[{"name":"holder","type":"address"}],"outputs":[],"stateMutability":"nonpayable"},
        {"type":"function","name":"claimComp","inputs":[{"name":"holder","type":"address"},{"name":"cTokens","type":"address[]"}],"outputs":[],"stateMutability":"nonpayable"},
        {"type":"function","name":"getAllMarkets","inputs":[],"outputs":[{"name":"","type":"address[]"}],"stateMutability":"view"},
        {"type":"event","name":"MarketListed","anonymous":false,"inputs":[{"name":"cToken","type":"address","indexed":false}]}
    ]"#;

    fn sample() -> AbiTable {
        AbiTable::from_json("Sample", TableSource::Builtin, SAMPLE).unwrap()
    }

    #[test]
    fn test_lookup_by_name() {
        let table = sample();
        let f = table.function("getAllMarkets").unwrap();
        assert_eq!(f.signature().as_deref(), Some("getAllMarkets()"));
        assert!(table.event("MarketListed").is_ok());
    }

    #[test]
    fn test_overloaded_name_is_ambiguous() {
        let table = sample();
        let err = table.function("claimComp").unwrap_err();
        match err {
            LookupError::Ambiguous { candidates, .. } => {
                assert_eq!(
                    candidates,
                    vec!["claimComp(address)", "claimComp(address,address[])"]
                );
            }
            other => panic!("unexpected: {other:?}"),
        }

        let picked = table.function("claimComp(address, address[])").unwrap();
        assert_eq!(picked.inputs.len(), 2);
        assert_eq!(table.overloads("claimComp").count(), 2);
    }

    #[test]
    fn test_not_found() {
        let table = sample();
        let err = table.function("mint").unwrap_err();
        assert_eq!(err.to_string(), "Sample has no function named `mint`");
    }

    #[test]
    fn test_selector_and_topic_index() {
        let table = sample();
        let f = table.function_by_selector([0xb0, 0x77, 0x2d, 0x0b]).unwrap();
        assert_eq!(f.name(), "getAllMarkets");
        assert!(table.function_by_selector([0xde, 0xad, 0xbe, 0xef]).is_none());

        let event = table.event("MarketListed").unwrap();
        let topic = event.topic().unwrap();
        assert_eq!(table.event_by_topic(topic).unwrap().name(), "MarketListed");
    }

    #[test]
    fn test_artifact_shape() {
        let artifact = format!(r#"{{"contractName":"Sample","abi":{SAMPLE}}}"#);
        let table = AbiTable::from_json("Sample", TableSource::Builtin, &artifact).unwrap();
        assert_eq!(table.len(), 4);

        let err = AbiTable::from_json("Bad", TableSource::Builtin, r#"{"bytecode":"0x"}"#);
        assert!(matches!(err, Err(TableError::Shape { .. })));

        let err = AbiTable::from_json("Bad", TableSource::Builtin, "not json");
        assert!(matches!(err, Err(TableError::Json { .. })));
    }

    #[test]
    fn test_to_json_abi() {
        let abi = sample().to_json_abi().unwrap();
        assert_eq!(abi.functions().count(), 3);
        assert_eq!(abi.events().count(), 1);
    }
}

//! ABI registry - indexes functions and events of many tables by selector and topic

use std::collections::HashMap;

use alloy_primitives::B256;

use super::entry::{selector_hex, AbiEntry, EntryKind, Selector};
use super::table::AbiTable;

/// Location of an entry inside the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct EntryRef {
    table: usize,
    entry: usize,
}

/// A function or event resolved through the registry
#[derive(Debug, Clone, Copy)]
pub struct Resolved<'a> {
    pub table: &'a AbiTable,
    pub entry: &'a AbiEntry,
}

/// A selector claimed by more than one signature across tables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorCollision {
    pub selector: Selector,
    /// `Table.signature` of the entry that owns the selector
    pub kept: String,
    /// `Table.signature` of the entry that lost
    pub shadowed: String,
}

/// Registry of ABI tables indexed by selector and topic
#[derive(Debug, Default, Clone)]
pub struct AbiRegistry {
    tables: Vec<AbiTable>,
    /// Functions indexed by 4-byte selector
    functions: HashMap<Selector, EntryRef>,
    /// Events indexed by topic
    events: HashMap<B256, EntryRef>,
    /// Same selector, different signature, across tables
    pub collisions: Vec<SelectorCollision>,
    /// Number of files scanned
    pub scanned_files: usize,
    /// Scan errors
    pub errors: Vec<String>,
    /// Scan duration in milliseconds
    pub scan_ms: u128,
}

impl AbiRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in table
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for table in crate::tables::all() {
            registry.insert_table(table.clone());
        }
        tracing::debug!(
            tables = registry.tables.len(),
            functions = registry.len(),
            "built-in ABI registry ready"
        );
        registry
    }

    /// Insert a table and index its functions and events
    ///
    /// Note: First entry for a given selector or topic wins (no overwrite).
    /// A table with a name already present replaces nothing and is skipped.
    pub fn insert_table(&mut self, table: AbiTable) -> bool {
        if self.table(table.name()).is_some() {
            tracing::warn!(table = table.name(), "duplicate table name, skipped");
            return false;
        }

        let table_idx = self.tables.len();
        for (entry_idx, entry) in table.entries().iter().enumerate() {
            let at = EntryRef {
                table: table_idx,
                entry: entry_idx,
            };
            match entry.kind {
                EntryKind::Function => {
                    let (Some(selector), Some(signature)) = (entry.selector(), entry.signature())
                    else {
                        continue;
                    };
                    let Some(existing) = self.functions.get(&selector).copied() else {
                        self.functions.insert(selector, at);
                        continue;
                    };
                    let owner = self.resolve(existing);
                    if owner.entry.signature().as_deref() != Some(signature.as_str()) {
                        self.collisions.push(SelectorCollision {
                            selector,
                            kept: self.qualified(existing),
                            shadowed: format!("{}.{}", table.name(), signature),
                        });
                    }
                }
                EntryKind::Event => {
                    if let Some(topic) = entry.topic() {
                        self.events.entry(topic).or_insert(at);
                    }
                }
                _ => {}
            }
        }

        self.tables.push(table);
        true
    }

    fn qualified(&self, at: EntryRef) -> String {
        let table = &self.tables[at.table];
        let entry = &table.entries()[at.entry];
        format!("{}.{}", table.name(), entry.signature().unwrap_or_default())
    }

    fn resolve(&self, at: EntryRef) -> Resolved<'_> {
        let table = &self.tables[at.table];
        Resolved {
            table,
            entry: &table.entries()[at.entry],
        }
    }

    /// Look up a function by selector
    pub fn lookup(&self, selector: Selector) -> Option<Resolved<'_>> {
        self.functions.get(&selector).map(|at| self.resolve(*at))
    }

    /// Look up a function by selector hex string (e.g., "0xa9059cbb")
    pub fn lookup_hex(&self, selector_hex: &str) -> Option<Resolved<'_>> {
        let normalized = strip_hex_prefix(selector_hex);
        if normalized.len() != 8 {
            return None;
        }

        let bytes = hex::decode(normalized).ok()?;
        let selector: Selector = bytes.try_into().ok()?;
        self.lookup(selector)
    }

    /// Look up an event by topic
    pub fn lookup_topic(&self, topic: B256) -> Option<Resolved<'_>> {
        self.events.get(&topic).map(|at| self.resolve(*at))
    }

    /// Look up an event by topic hex string
    pub fn lookup_topic_hex(&self, topic_hex: &str) -> Option<Resolved<'_>> {
        let normalized = strip_hex_prefix(topic_hex);
        if normalized.len() != 64 {
            return None;
        }
        let bytes = hex::decode(normalized).ok()?;
        self.lookup_topic(B256::from_slice(&bytes))
    }

    /// Resolve a 4-byte selector or a 32-byte topic, told apart by length
    pub fn lookup_identifier(&self, identifier: &str) -> Option<Resolved<'_>> {
        match strip_hex_prefix(identifier).len() {
            8 => self.lookup_hex(identifier),
            64 => self.lookup_topic_hex(identifier),
            _ => None,
        }
    }

    /// Find a table by name (case-insensitive)
    pub fn table(&self, name: &str) -> Option<&AbiTable> {
        self.tables
            .iter()
            .find(|table| table.name().eq_ignore_ascii_case(name))
    }

    pub fn tables(&self) -> &[AbiTable] {
        &self.tables
    }

    /// Get the number of registered function selectors
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Number of registered event topics
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Merge another registry into this one
    ///
    /// Tables from the other registry are appended in order; selectors
    /// already present keep their owner (first wins).
    pub fn merge(&mut self, other: Self) {
        self.scanned_files = self.scanned_files.saturating_add(other.scanned_files);
        self.errors.extend(other.errors);
        for table in other.tables {
            self.insert_table(table);
        }
    }

    /// Get all selectors
    pub fn selectors(&self) -> impl Iterator<Item = &Selector> {
        self.functions.keys()
    }

    /// One-line summary for logs and the CLI
    pub fn summary(&self) -> String {
        format!(
            "{} tables, {} selectors, {} topics, {} collisions",
            self.tables.len(),
            self.len(),
            self.event_count(),
            self.collisions.len()
        )
    }
}

impl SelectorCollision {
    pub fn selector_hex(&self) -> String {
        selector_hex(self.selector)
    }
}

fn strip_hex_prefix(value: &str) -> &str {
    let value = value.trim();
    value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value)
}

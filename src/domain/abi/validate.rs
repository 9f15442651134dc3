//! Schema validation of ABI tables
//!
//! Collects every violation in a table rather than stopping at the first.
//! Overloads (same name, different signature) are legal and reported apart
//! from the issues.

use std::collections::{BTreeMap, HashMap};

use alloy_dyn_abi::DynSolType;
use serde::Serialize;
use thiserror::Error;

use super::entry::{selector_hex, AbiEntry, EntryKind, Mutability, Selector};
use super::table::AbiTable;

/// A single schema violation
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum ValidationIssue {
    #[error("table is empty")]
    EmptyTable,

    #[error("entry #{index}: {kind} without a name")]
    MissingName { index: usize, kind: EntryKind },

    #[error("{entry}: {position} #{param} has an empty type tag")]
    EmptyType {
        entry: String,
        position: &'static str,
        param: usize,
    },

    #[error("{entry}: {position} #{param} has unparseable type `{ty}`")]
    UnknownType {
        entry: String,
        position: &'static str,
        param: usize,
        ty: String,
    },

    #[error("duplicate {kind} signature {signature}")]
    DuplicateSignature { kind: EntryKind, signature: String },

    #[error("selector {selector} shared by {first} and {second}")]
    SelectorCollision {
        selector: String,
        first: String,
        second: String,
    },

    #[error("{entry}: declared identifier `{declared}` is not hex")]
    MalformedIdentifier { entry: String, declared: String },

    #[error("{entry}: declared identifier {declared} does not match derived {derived}")]
    IdentifierMismatch {
        entry: String,
        declared: String,
        derived: String,
    },

    #[error("{count} {kind} entries, at most one allowed")]
    Duplicate { kind: EntryKind, count: usize },

    #[error("{entry}: outputs are only allowed on functions")]
    UnexpectedOutputs { entry: String },

    #[error("{entry}: input #{param} is marked indexed outside an event")]
    UnexpectedIndexed { entry: String, param: usize },

    #[error("{entry}: {count} indexed inputs, at most {max} allowed")]
    TooManyIndexed {
        entry: String,
        count: usize,
        max: usize,
    },

    #[error("{entry}: mutability `{mutability}` not allowed for {kind}")]
    InvalidMutability {
        entry: String,
        kind: EntryKind,
        mutability: Mutability,
    },
}

/// Outcome of validating one table
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub table: String,
    pub entries: usize,
    pub issues: Vec<ValidationIssue>,
    /// Overloaded function names with their signatures
    pub overloads: BTreeMap<String, Vec<String>>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Validate a table against the JSON ABI schema rules
pub fn validate(table: &AbiTable) -> ValidationReport {
    let mut report = ValidationReport {
        table: table.name().to_string(),
        entries: table.len(),
        ..Default::default()
    };

    if table.is_empty() {
        report.issues.push(ValidationIssue::EmptyTable);
        return report;
    }

    let mut signatures: HashMap<(EntryKind, String), usize> = HashMap::new();
    let mut selectors: HashMap<Selector, String> = HashMap::new();
    let mut names: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut singletons: HashMap<EntryKind, usize> = HashMap::new();

    for (index, entry) in table.entries().iter().enumerate() {
        let label = entry.describe();

        if entry.kind.is_named() && entry.name().trim().is_empty() {
            report.issues.push(ValidationIssue::MissingName {
                index,
                kind: entry.kind,
            });
        }

        check_params(entry, &label, &mut report.issues);
        check_shape(entry, &label, &mut report.issues);
        check_identifier(entry, &label, &mut report.issues);

        if matches!(
            entry.kind,
            EntryKind::Constructor | EntryKind::Fallback | EntryKind::Receive
        ) {
            *singletons.entry(entry.kind).or_default() += 1;
        }

        let Some(signature) = entry.signature() else {
            continue;
        };

        *signatures.entry((entry.kind, signature.clone())).or_default() += 1;

        if entry.kind == EntryKind::Function {
            let group = names.entry(entry.name().to_string()).or_default();
            if !group.contains(&signature) {
                group.push(signature.clone());
            }

            if let Some(selector) = entry.selector() {
                match selectors.get(&selector) {
                    Some(first) if *first != signature => {
                        report.issues.push(ValidationIssue::SelectorCollision {
                            selector: selector_hex(selector),
                            first: first.clone(),
                            second: signature.clone(),
                        });
                    }
                    Some(_) => {}
                    None => {
                        selectors.insert(selector, signature);
                    }
                }
            }
        }
    }

    let mut duplicates: Vec<_> = signatures
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|((kind, signature), _)| ValidationIssue::DuplicateSignature { kind, signature })
        .collect();
    duplicates.sort_by_key(|issue| issue.to_string());
    report.issues.extend(duplicates);

    let mut singletons: Vec<_> = singletons.into_iter().filter(|(_, n)| *n > 1).collect();
    singletons.sort_by_key(|(kind, _)| kind.as_str());
    report.issues.extend(
        singletons
            .into_iter()
            .map(|(kind, count)| ValidationIssue::Duplicate { kind, count }),
    );

    report.overloads = names
        .into_iter()
        .filter(|(_, signatures)| signatures.len() > 1)
        .collect();

    report
}

fn check_params(entry: &AbiEntry, label: &str, issues: &mut Vec<ValidationIssue>) {
    let groups = [("input", &entry.inputs), ("output", &entry.outputs)];
    for (position, params) in groups {
        for (param, p) in params.iter().enumerate() {
            if p.kind.trim().is_empty() {
                issues.push(ValidationIssue::EmptyType {
                    entry: label.to_string(),
                    position,
                    param,
                });
                continue;
            }
            let canonical = p.canonical_type();
            if DynSolType::parse(&canonical).is_err() {
                issues.push(ValidationIssue::UnknownType {
                    entry: label.to_string(),
                    position,
                    param,
                    ty: canonical,
                });
            }
        }
    }
}

fn check_shape(entry: &AbiEntry, label: &str, issues: &mut Vec<ValidationIssue>) {
    if entry.kind != EntryKind::Function && !entry.outputs.is_empty() {
        issues.push(ValidationIssue::UnexpectedOutputs {
            entry: label.to_string(),
        });
    }

    if entry.kind == EntryKind::Event {
        let count = entry.inputs.iter().filter(|p| p.is_indexed()).count();
        let max = if entry.anonymous { 4 } else { 3 };
        if count > max {
            issues.push(ValidationIssue::TooManyIndexed {
                entry: label.to_string(),
                count,
                max,
            });
        }
    } else {
        for (param, p) in entry.inputs.iter().enumerate() {
            if p.is_indexed() {
                issues.push(ValidationIssue::UnexpectedIndexed {
                    entry: label.to_string(),
                    param,
                });
            }
        }
    }

    let Some(mutability) = entry.mutability() else {
        return;
    };
    let allowed = match entry.kind {
        EntryKind::Constructor | EntryKind::Fallback => !mutability.is_read_only(),
        EntryKind::Receive => mutability.accepts_value(),
        _ => true,
    };
    if !allowed {
        issues.push(ValidationIssue::InvalidMutability {
            entry: label.to_string(),
            kind: entry.kind,
            mutability,
        });
    }
}

fn check_identifier(entry: &AbiEntry, label: &str, issues: &mut Vec<ValidationIssue>) {
    let declared = match entry.declared_identifier() {
        Ok(Some(declared)) => declared,
        Ok(None) => return,
        Err(raw) => {
            issues.push(ValidationIssue::MalformedIdentifier {
                entry: label.to_string(),
                declared: raw,
            });
            return;
        }
    };

    let derived = entry.derived_identifier().unwrap_or_default();
    if declared != derived {
        issues.push(ValidationIssue::IdentifierMismatch {
            entry: label.to_string(),
            declared: format!("0x{}", hex::encode(&declared)),
            derived: format!("0x{}", hex::encode(&derived)),
        });
    }
}

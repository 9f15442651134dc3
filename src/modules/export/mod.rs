//! Export Module
//!
//! Writes the identifier listing of ABI tables to disk.
//!
//! - JSON: one object per entry, with inputs and outputs
//! - CSV: one row per entry, types flattened into a signature column

mod csv_export;
mod json_export;

use std::path::Path;

use serde::Serialize;

use crate::domain::abi::{AbiEntry, AbiTable};

pub use csv_export::write_entries as write_csv;
pub use json_export::write_entries as write_json;

/// Output format of an export
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportFormat {
    Json,
    Csv,
}

/// Flattened view of one table entry
#[derive(Debug, Clone, Serialize)]
pub struct ExportRow {
    pub table: String,
    pub kind: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    /// Selector for functions and errors, topic for events
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mutability: Option<String>,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
}

impl ExportRow {
    pub fn new(table: &AbiTable, entry: &AbiEntry) -> Self {
        Self {
            table: table.name().to_string(),
            kind: entry.kind.to_string(),
            name: entry.name().to_string(),
            signature: entry.signature(),
            identifier: entry
                .derived_identifier()
                .map(|bytes| format!("0x{}", hex::encode(bytes))),
            mutability: entry.mutability().map(|m| m.to_string()),
            inputs: entry
                .inputs
                .iter()
                .map(|p| {
                    let indexed = if p.is_indexed() { " indexed" } else { "" };
                    format!("{}{} {}", p.canonical_type(), indexed, p.name)
                        .trim_end()
                        .to_string()
                })
                .collect(),
            outputs: entry
                .outputs
                .iter()
                .map(|p| format!("{} {}", p.canonical_type(), p.name).trim_end().to_string())
                .collect(),
        }
    }
}

/// Flatten every entry of the given tables
pub fn rows<'a>(tables: impl IntoIterator<Item = &'a AbiTable>) -> Vec<ExportRow> {
    tables
        .into_iter()
        .flat_map(|table| table.entries().iter().map(move |entry| ExportRow::new(table, entry)))
        .collect()
}

/// Export rows in the given format; returns the number of rows written
pub fn export(path: &Path, format: ExportFormat, rows: &[ExportRow]) -> anyhow::Result<usize> {
    let written = match format {
        ExportFormat::Json => write_json(path, rows)?,
        ExportFormat::Csv => write_csv(path, rows)?,
    };
    tracing::info!(path = %path.display(), rows = written, "export written");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables;

    #[test]
    fn test_rows_cover_every_entry() {
        let rows = rows([tables::erc20()]);
        assert_eq!(rows.len(), tables::erc20().len());

        let transfer = rows
            .iter()
            .find(|row| row.signature.as_deref() == Some("transfer(address,uint256)"))
            .unwrap();
        assert_eq!(transfer.identifier.as_deref(), Some("0xa9059cbb"));
        assert_eq!(transfer.mutability.as_deref(), Some("nonpayable"));
        assert_eq!(transfer.inputs, vec!["address to", "uint256 amount"]);
        assert_eq!(transfer.outputs, vec!["bool"]);

        let event = rows.iter().find(|row| row.kind == "event" && row.name == "Transfer").unwrap();
        assert_eq!(event.inputs[0], "address indexed from");
        assert!(event.mutability.is_none());
    }

    #[test]
    fn test_export_both_formats() {
        let dir = tempfile::tempdir().unwrap();
        let rows = rows([tables::comptroller()]);

        let json_path = dir.path().join("out.json");
        assert_eq!(export(&json_path, ExportFormat::Json, &rows).unwrap(), rows.len());
        let parsed: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(parsed.as_array().unwrap().len(), rows.len());

        let csv_path = dir.path().join("out.csv");
        assert_eq!(export(&csv_path, ExportFormat::Csv, &rows).unwrap(), rows.len());
        let text = std::fs::read_to_string(&csv_path).unwrap();
        assert!(text.starts_with("table,kind,name,signature,identifier,mutability,inputs,outputs"));
        assert_eq!(text.lines().count(), rows.len() + 1);
    }
}

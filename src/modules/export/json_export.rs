//! JSON Export
//!
//! Writes table entries to a pretty-printed JSON array.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use super::ExportRow;

/// Write entries to JSON file
pub fn write_entries(path: &Path, rows: &[ExportRow]) -> anyhow::Result<usize> {
    let json = serde_json::to_string_pretty(rows)?;

    let mut file = File::create(path)?;
    file.write_all(json.as_bytes())?;

    Ok(rows.len())
}

//! CSV Export
//!
//! Writes table entries to a CSV file, one row per entry.

use std::path::Path;

use super::ExportRow;

/// Write entries to CSV file
pub fn write_entries(path: &Path, rows: &[ExportRow]) -> anyhow::Result<usize> {
    let mut wtr = csv::Writer::from_path(path)?;

    // Write header
    wtr.write_record([
        "table",
        "kind",
        "name",
        "signature",
        "identifier",
        "mutability",
        "inputs",
        "outputs",
    ])?;

    // Write data rows
    for row in rows {
        wtr.write_record([
            row.table.as_str(),
            row.kind.as_str(),
            row.name.as_str(),
            row.signature.as_deref().unwrap_or(""),
            row.identifier.as_deref().unwrap_or(""),
            row.mutability.as_deref().unwrap_or(""),
            &row.inputs.join("; "),
            &row.outputs.join("; "),
        ])?;
    }

    wtr.flush()?;
    Ok(rows.len())
}

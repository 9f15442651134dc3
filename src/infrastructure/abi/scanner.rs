//! ABI file scanner - loads additional tables from the filesystem

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use walkdir::WalkDir;

use crate::domain::abi::{AbiRegistry, AbiTable, TableSource};

/// Files above this size are skipped
const MAX_FILE_BYTES: u64 = 5 * 1024 * 1024;

/// ABI file scanner
pub struct AbiScanner;

impl AbiScanner {
    /// Scan a single root (directory or file) for ABI tables
    ///
    /// Each `*.json` file holding an entry array or an artifact with an
    /// `abi` field becomes one table named after the file stem.
    pub fn scan(root: impl AsRef<Path>) -> AbiRegistry {
        let started = Instant::now();
        let root = root.as_ref();
        let mut registry = AbiRegistry::new();
        let mut scanned_files = 0;
        let mut errors = Vec::new();

        for entry in WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| !Self::is_ignored_dir(e.path()))
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    errors.push(err.to_string());
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }

            let metadata = match entry.metadata() {
                Ok(meta) => meta,
                Err(err) => {
                    errors.push(format!("{}: {}", path.display(), err));
                    continue;
                }
            };
            if metadata.len() > MAX_FILE_BYTES {
                tracing::debug!(path = %path.display(), "skipping oversized file");
                continue;
            }

            scanned_files += 1;

            match Self::load_abi_file(path) {
                Ok(table) => {
                    registry.insert_table(table);
                }
                Err(err) => {
                    tracing::warn!(path = %path.display(), %err, "failed to load ABI file");
                    errors.push(format!("{}: {}", path.display(), err));
                }
            }
        }

        registry.scanned_files = scanned_files;
        registry.errors = errors;
        registry.scan_ms = started.elapsed().as_millis();

        registry
    }

    /// Scan multiple roots
    pub fn scan_roots(roots: &[PathBuf]) -> AbiRegistry {
        let started = Instant::now();
        let mut registry = AbiRegistry::new();

        for root in roots {
            registry.merge(Self::scan(root));
        }

        registry.scan_ms = started.elapsed().as_millis();
        tracing::info!(
            roots = roots.len(),
            files = registry.scanned_files,
            summary = %registry.summary(),
            "ABI scan complete"
        );

        registry
    }

    /// Load a single ABI file as a table
    pub fn load_abi_file(path: &Path) -> anyhow::Result<AbiTable> {
        let content = fs::read_to_string(path)?;
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("unnamed")
            .to_string();
        Ok(AbiTable::from_json(
            name,
            TableSource::File(path.to_path_buf()),
            &content,
        )?)
    }

    /// Check if a path should be ignored
    fn is_ignored_dir(path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .map(|name| {
                matches!(
                    name,
                    ".git" | "target" | "node_modules" | ".next" | "dist" | "build"
                )
            })
            .unwrap_or(false)
    }
}

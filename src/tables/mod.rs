//! Built-in Compound ABI tables
//!
//! The JSON text of each table is embedded at build time and exported as a
//! constant. The parsed form is built once, on first access, and shared
//! read-only afterwards.

use std::sync::OnceLock;

use crate::domain::abi::{AbiTable, TableSource};

/// cToken with an ERC-20 underlying (CErc20)
pub const ICERC20_ABI: &str = include_str!("../../abi/ICERC20.json");
/// cToken wrapping native ether (CEther)
pub const ICETH_ABI: &str = include_str!("../../abi/ICETH.json");
/// Compound comptroller
pub const ICOMPTROLLER_ABI: &str = include_str!("../../abi/IComptroller.json");
/// ERC-20 underlying token
pub const IERC20_ABI: &str = include_str!("../../abi/IERC20.json");

/// Names of the built-in tables, in registry order
pub const NAMES: [&str; 4] = ["ICERC20", "ICETH", "IComptroller", "IERC20"];

fn load(cell: &'static OnceLock<AbiTable>, name: &str, text: &str) -> &'static AbiTable {
    cell.get_or_init(|| {
        AbiTable::from_json(name, TableSource::Builtin, text).unwrap_or_else(|err| {
            // Reported as `EmptyTable` by validate()
            tracing::error!(%err, "built-in ABI table failed to parse");
            AbiTable::new(name, TableSource::Builtin, Vec::new())
        })
    })
}

pub fn cerc20() -> &'static AbiTable {
    static TABLE: OnceLock<AbiTable> = OnceLock::new();
    load(&TABLE, "ICERC20", ICERC20_ABI)
}

pub fn ceth() -> &'static AbiTable {
    static TABLE: OnceLock<AbiTable> = OnceLock::new();
    load(&TABLE, "ICETH", ICETH_ABI)
}

pub fn comptroller() -> &'static AbiTable {
    static TABLE: OnceLock<AbiTable> = OnceLock::new();
    load(&TABLE, "IComptroller", ICOMPTROLLER_ABI)
}

pub fn erc20() -> &'static AbiTable {
    static TABLE: OnceLock<AbiTable> = OnceLock::new();
    load(&TABLE, "IERC20", IERC20_ABI)
}

/// Every built-in table
pub fn all() -> [&'static AbiTable; 4] {
    [cerc20(), ceth(), comptroller(), erc20()]
}

/// Find a built-in table by name (case-insensitive)
pub fn by_name(name: &str) -> Option<&'static AbiTable> {
    all()
        .into_iter()
        .find(|table| table.name().eq_ignore_ascii_case(name))
}

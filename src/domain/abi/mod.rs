//! ABI domain models and contracts
//!
//! This module defines the table data model, schema validation and the
//! codec trait, independent of the underlying implementation (alloy-dyn-abi).

mod codec;
mod entry;
mod registry;
mod table;
mod validate;

pub use codec::{AbiCodec, DecodedArg, DecodedCall, DecodedLog};
pub use entry::{compute_selector, selector_hex, AbiEntry, EntryKind, Mutability, Param, Selector};
pub use registry::{AbiRegistry, Resolved, SelectorCollision};
pub use table::{AbiTable, LookupError, TableError, TableSource};
pub use validate::{validate, ValidationIssue, ValidationReport};

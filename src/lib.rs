//! Compound cToken ABI tables
//!
//! Built-in contract-interface tables for `ICERC20`, `ICETH`, `IComptroller`
//! and `IERC20`, with schema validation, selector and topic lookup, and
//! call encoding and decoding through alloy.

pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod modules;
pub mod tables;

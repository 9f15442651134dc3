//! ABI infrastructure - Alloy-based encoding, decoding and table scanning

mod args;
mod codec;
mod scanner;

pub use args::{format_value, parse_arguments, parse_value};
pub use codec::{param_types, AlloyAbiCodec};
pub use scanner::AbiScanner;

//! Domain layer - table data model, validation and Compound market math
//!
//! Nothing here performs I/O.

pub mod abi;
pub mod compound;

//! Ethereum infrastructure - Alloy call transport and market reads

mod market;
mod provider;

pub use market::MarketReader;
pub use provider::{AlloyCaller, CallReverted, ContractCaller};

//! Feature modules built on the domain and infrastructure layers

pub mod export;

//! Contract call transport and its Alloy implementation

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use anyhow::{Context, Result};
use thiserror::Error;

/// The node executed the call and it reverted
///
/// Transport failures are reported as other errors.
#[derive(Debug, Clone, Error)]
#[error("execution reverted: {message}")]
pub struct CallReverted {
    pub message: String,
}

/// Read-only contract call transport
///
/// Abstracts over the RPC transport so market reads can run against a
/// node or a canned responder.
#[async_trait::async_trait]
pub trait ContractCaller: Send + Sync {
    /// Execute `eth_call` against `to` with the given calldata
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes>;

    /// Get display name for this endpoint
    fn endpoint_name(&self) -> String;
}

/// Alloy HTTP provider wrapper
pub struct AlloyCaller {
    provider: DynProvider,
    endpoint: String,
}

impl AlloyCaller {
    /// Connect to an HTTP JSON-RPC endpoint
    pub fn connect_http(url: &str) -> Result<Self> {
        let rpc_url = url.parse().context("Invalid HTTP URL")?;
        let provider = ProviderBuilder::new().connect_http(rpc_url).erased();
        tracing::debug!(endpoint = url, "connected HTTP provider");
        Ok(Self {
            provider,
            endpoint: url.to_string(),
        })
    }
}

#[async_trait::async_trait]
impl ContractCaller for AlloyCaller {
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes> {
        let request = TransactionRequest::default().with_to(to).with_input(data);
        match self.provider.call(request).await {
            Ok(output) => Ok(output),
            Err(err) => {
                if let Some(payload) = err.as_error_resp() {
                    if payload.code == 3 || payload.message.to_lowercase().contains("revert") {
                        return Err(CallReverted {
                            message: payload.message.to_string(),
                        }
                        .into());
                    }
                }
                Err(anyhow::Error::new(err))
                    .with_context(|| format!("eth_call to {} via {}", to, self.endpoint))
            }
        }
    }

    fn endpoint_name(&self) -> String {
        self.endpoint.clone()
    }
}

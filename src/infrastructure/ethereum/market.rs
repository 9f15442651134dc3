//! Typed reads against Compound markets, driven by the built-in tables

use alloy::primitives::{Address, Bytes, U256};
use alloy_dyn_abi::DynSolValue;
use anyhow::{Context, Result};

use super::{CallReverted, ContractCaller};
use crate::domain::abi::{AbiCodec, AbiTable, DecodedArg};
use crate::domain::compound::MarketSnapshot;
use crate::infrastructure::abi::AlloyAbiCodec;
use crate::tables;

/// Reads cToken, comptroller and ERC-20 state through a [`ContractCaller`]
pub struct MarketReader<C> {
    caller: C,
    codec: AlloyAbiCodec,
}

impl<C: ContractCaller> MarketReader<C> {
    pub fn new(caller: C) -> Self {
        Self {
            caller,
            codec: AlloyAbiCodec::default(),
        }
    }

    pub fn caller(&self) -> &C {
        &self.caller
    }

    pub fn codec(&self) -> &AlloyAbiCodec {
        &self.codec
    }

    /// Call a function with typed arguments and decode its outputs
    pub async fn read(
        &self,
        table: &AbiTable,
        to: Address,
        function: &str,
        args: &[DynSolValue],
    ) -> Result<Vec<DynSolValue>> {
        let entry = table.function(function)?;
        let calldata = self.codec.encode_values(entry, args)?;
        let output = self
            .caller
            .call(to, Bytes::from(calldata))
            .await
            .with_context(|| format!("{}.{} on {}", table.name(), function, to))?;
        self.codec.decode_output_values(entry, &output)
    }

    /// Call a function with string arguments and return formatted outputs
    pub async fn call_function(
        &self,
        table: &AbiTable,
        to: Address,
        function: &str,
        args: &[&str],
    ) -> Result<Vec<DecodedArg>> {
        let entry = table.function(function)?;
        let calldata = self.codec.encode_call(entry, args)?;
        tracing::debug!(
            table = table.name(),
            function = %entry.describe(),
            %to,
            "eth_call"
        );
        let output = self.caller.call(to, Bytes::from(calldata)).await?;
        self.codec.decode_output(entry, &output)
    }

    async fn read_uint(&self, table: &AbiTable, to: Address, function: &str, args: &[DynSolValue]) -> Result<U256> {
        let values = self.read(table, to, function, args).await?;
        values
            .first()
            .and_then(DynSolValue::as_uint)
            .map(|(value, _)| value)
            .with_context(|| format!("{} returned no uint", function))
    }

    async fn read_address(&self, table: &AbiTable, to: Address, function: &str) -> Result<Address> {
        let values = self.read(table, to, function, &[]).await?;
        values
            .first()
            .and_then(DynSolValue::as_address)
            .with_context(|| format!("{} returned no address", function))
    }

    pub async fn exchange_rate_stored(&self, ctoken: Address) -> Result<U256> {
        self.read_uint(tables::cerc20(), ctoken, "exchangeRateStored", &[]).await
    }

    pub async fn supply_rate_per_block(&self, ctoken: Address) -> Result<U256> {
        self.read_uint(tables::cerc20(), ctoken, "supplyRatePerBlock", &[]).await
    }

    pub async fn get_cash(&self, ctoken: Address) -> Result<U256> {
        self.read_uint(tables::cerc20(), ctoken, "getCash", &[]).await
    }

    pub async fn underlying(&self, ctoken: Address) -> Result<Address> {
        self.read_address(tables::cerc20(), ctoken, "underlying").await
    }

    pub async fn symbol(&self, token: Address) -> Result<String> {
        let values = self.read(tables::erc20(), token, "symbol", &[]).await?;
        values
            .first()
            .and_then(DynSolValue::as_str)
            .map(str::to_string)
            .context("symbol returned no string")
    }

    pub async fn balance_of(&self, token: Address, owner: Address) -> Result<U256> {
        self.read_uint(
            tables::erc20(),
            token,
            "balanceOf",
            &[DynSolValue::Address(owner)],
        )
        .await
    }

    /// Every cToken listed by the comptroller
    pub async fn all_markets(&self, comptroller: Address) -> Result<Vec<Address>> {
        let values = self
            .read(tables::comptroller(), comptroller, "getAllMarkets", &[])
            .await?;
        let markets = values
            .first()
            .and_then(DynSolValue::as_array)
            .context("getAllMarkets returned no array")?;
        markets
            .iter()
            .map(|value| value.as_address().context("non-address market entry"))
            .collect()
    }

    /// `underlying()` of a cToken, `None` when the call reverts or returns nothing
    pub async fn underlying_if_any(&self, ctoken: Address) -> Result<Option<Address>> {
        let entry = tables::cerc20().function("underlying")?;
        let calldata = self.codec.encode_values(entry, &[])?;
        let output = match self.caller.call(ctoken, Bytes::from(calldata)).await {
            Ok(output) => output,
            Err(err) if err.downcast_ref::<CallReverted>().is_some() => {
                tracing::debug!(%ctoken, %err, "underlying() reverted, assuming ether market");
                return Ok(None);
            }
            Err(err) => return Err(err.context(format!("underlying() on {}", ctoken))),
        };
        if output.is_empty() {
            tracing::debug!(%ctoken, "underlying() returned nothing, assuming ether market");
            return Ok(None);
        }
        let values = self.codec.decode_output_values(entry, &output)?;
        values
            .first()
            .and_then(DynSolValue::as_address)
            .map(Some)
            .context("underlying returned no address")
    }

    /// Read the state of one market
    ///
    /// A cToken whose `underlying()` reverts or returns nothing is treated as
    /// the ether market. Transport errors are returned.
    pub async fn snapshot(&self, ctoken: Address) -> Result<MarketSnapshot> {
        let (exchange_rate, supply_rate_per_block, symbol) = futures::try_join!(
            self.exchange_rate_stored(ctoken),
            self.supply_rate_per_block(ctoken),
            self.symbol(ctoken),
        )?;

        let underlying = self.underlying_if_any(ctoken).await?;

        let market_size = match underlying {
            Some(token) => self.balance_of(token, ctoken).await?,
            None => self.get_cash(ctoken).await?,
        };

        Ok(MarketSnapshot {
            ctoken,
            symbol,
            underlying,
            exchange_rate,
            supply_rate_per_block,
            market_size,
        })
    }
}

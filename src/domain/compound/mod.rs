//! Compound market math
//!
//! Conversions between an underlying asset and its cToken, using the
//! exchange rate and supply rate read from a market.

use alloy_primitives::{Address, U256};
use serde::Serialize;
use thiserror::Error;

/// Exchange rates and supply rates are mantissas scaled by 1e18
pub const MANTISSA_SCALE: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);

/// Blocks per year at 15 second blocks
pub const BLOCKS_PER_YEAR: u64 = 2_102_400;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompoundError {
    #[error("neither {input} nor {output} is a listed cToken market")]
    UnknownMarket { input: Address, output: Address },
    #[error("invalid aux data {0}")]
    InvalidAuxData(u64),
    #[error("{0:?} has no fixed conversion between underlying and cToken")]
    Unsupported(Interaction),
    #[error("exchange rate is zero")]
    ZeroExchangeRate,
    #[error("arithmetic overflow")]
    Overflow,
}

/// Interaction with a Compound market, as encoded in bridge aux data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u64)]
pub enum Interaction {
    Mint = 0,
    Redeem = 1,
    Borrow = 2,
    Repay = 3,
}

impl Interaction {
    pub fn aux_data(self) -> u64 {
        self as u64
    }

    pub fn from_aux_data(aux_data: u64) -> Result<Self, CompoundError> {
        match aux_data {
            0 => Ok(Interaction::Mint),
            1 => Ok(Interaction::Redeem),
            2 => Ok(Interaction::Borrow),
            3 => Ok(Interaction::Repay),
            other => Err(CompoundError::InvalidAuxData(other)),
        }
    }
}

/// Pick mint or redeem from the asset pair
///
/// Minting turns the underlying (`input`) into a listed cToken (`output`);
/// redeeming goes the other way. Ether is `Address::ZERO`.
pub fn interaction_for(
    input: Address,
    output: Address,
    markets: &[Address],
) -> Result<Interaction, CompoundError> {
    if markets.contains(&output) {
        Ok(Interaction::Mint)
    } else if markets.contains(&input) {
        Ok(Interaction::Redeem)
    } else {
        Err(CompoundError::UnknownMarket { input, output })
    }
}

/// Amount received for `amount` at the given exchange rate
///
/// Mint: underlying in, cTokens out. Redeem: cTokens in, underlying out.
pub fn expected_output(
    interaction: Interaction,
    amount: U256,
    exchange_rate: U256,
) -> Result<U256, CompoundError> {
    match interaction {
        Interaction::Mint => {
            if exchange_rate.is_zero() {
                return Err(CompoundError::ZeroExchangeRate);
            }
            let scaled = amount
                .checked_mul(MANTISSA_SCALE)
                .ok_or(CompoundError::Overflow)?;
            Ok(scaled / exchange_rate)
        }
        Interaction::Redeem => {
            let scaled = amount
                .checked_mul(exchange_rate)
                .ok_or(CompoundError::Overflow)?;
            Ok(scaled / MANTISSA_SCALE)
        }
        other => Err(CompoundError::Unsupported(other)),
    }
}

/// Yearly supply rate in percent, zero unless minting
pub fn supply_apr(rate_per_block: U256, interaction: Interaction) -> f64 {
    if interaction != Interaction::Mint {
        return 0.0;
    }
    let yearly = rate_per_block.saturating_mul(U256::from(BLOCKS_PER_YEAR * 100));
    let yearly = u128::try_from(yearly).map(|v| v as f64).unwrap_or(f64::MAX);
    yearly / 1e18
}

/// State of one cToken market at a point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarketSnapshot {
    pub ctoken: Address,
    pub symbol: String,
    /// `None` for the ether market
    pub underlying: Option<Address>,
    pub exchange_rate: U256,
    pub supply_rate_per_block: U256,
    /// Underlying held by the cToken contract
    pub market_size: U256,
}

impl MarketSnapshot {
    pub fn is_ether(&self) -> bool {
        self.underlying.is_none()
    }

    pub fn expected_output(&self, interaction: Interaction, amount: U256) -> Result<U256, CompoundError> {
        expected_output(interaction, amount, self.exchange_rate)
    }

    pub fn supply_apr(&self) -> f64 {
        supply_apr(self.supply_rate_per_block, Interaction::Mint)
    }
}

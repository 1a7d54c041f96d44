//! Unit Conversion
//!
//! Translates a USD per troy ounce spot price into NPR per ounce, tola and
//! kilogram. Rounding goes through `rust_decimal` so results are stable
//! regardless of how the float product happens to land.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

use crate::error::AggregationError;
use crate::models::prices::AssetKind;

pub const GRAMS_PER_TROY_OUNCE: f64 = 31.1035;
pub const GRAMS_PER_TOLA: f64 = 11.6638;
pub const GRAMS_PER_KG: f64 = 1000.0;

/// Tolas in one troy ounce
pub const TOLA_PER_OUNCE: f64 = GRAMS_PER_TOLA / GRAMS_PER_TROY_OUNCE;
/// Kilograms in one troy ounce, scaled so `usd * KG_PER_OUNCE` is USD per kg
pub const KG_PER_OUNCE: f64 = GRAMS_PER_KG / GRAMS_PER_TROY_OUNCE;

/// Nepal retail markup over the international spot price
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Premiums {
    pub gold: f64,
    pub silver: f64,
}

impl Premiums {
    pub const NEPAL: Premiums = Premiums {
        gold: 1.1008,
        silver: 1.1266,
    };

    pub fn factor(&self, asset: AssetKind) -> f64 {
        match asset {
            AssetKind::Gold => self.gold,
            AssetKind::Silver => self.silver,
        }
    }

    /// Markup as a percentage, e.g. 1.1008 -> 10.08
    pub fn percent(&self, asset: AssetKind) -> Option<f64> {
        let factor = Decimal::from_f64_retain(self.factor(asset))?;
        ((factor - dec!(1)) * dec!(100)).round_dp(2).to_f64()
    }
}

/// Unrounded NPR figures for one asset
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceQuote {
    pub usd: f64,
    pub npr_per_ounce: f64,
    pub npr_per_tola: f64,
    pub npr_per_kg: f64,
}

/// Convert a USD spot price at `npr_per_usd`, applying the asset premium if given.
/// USD is never premium-adjusted.
pub fn quote(
    asset: AssetKind,
    usd: f64,
    npr_per_usd: f64,
    premiums: Option<&Premiums>,
) -> PriceQuote {
    let premium = premiums.map(|p| p.factor(asset)).unwrap_or(1.0);

    PriceQuote {
        usd,
        npr_per_ounce: usd * npr_per_usd * premium,
        npr_per_tola: usd * TOLA_PER_OUNCE * npr_per_usd * premium,
        npr_per_kg: usd * KG_PER_OUNCE * npr_per_usd * premium,
    }
}

/// Round half-to-even on the exact binary value, like Python's `round(x, dp)`.
pub fn round_dp(
    field: &'static str,
    value: f64,
    dp: u32,
) -> Result<f64, AggregationError> {
    to_decimal(field, value)?
        .round_dp_with_strategy(dp, RoundingStrategy::MidpointNearestEven)
        .to_f64()
        .ok_or(AggregationError::InvalidValue { field, value })
}

/// Round to the nearest whole rupee
pub fn round_whole(field: &'static str, value: f64) -> Result<i64, AggregationError> {
    to_decimal(field, value)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven)
        .to_i64()
        .ok_or(AggregationError::InvalidValue { field, value })
}

fn to_decimal(field: &'static str, value: f64) -> Result<Decimal, AggregationError> {
    if !value.is_finite() {
        return Err(AggregationError::InvalidValue { field, value });
    }
    Decimal::from_f64_retain(value).ok_or(AggregationError::InvalidValue { field, value })
}

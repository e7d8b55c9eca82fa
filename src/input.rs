//! CSV readers for the metered household data and the market prices.

mod consumption;
mod market;

use chrono::NaiveDateTime;

pub use self::{
    consumption::{ReadOptions, read_household},
    market::read_market_prices,
};
use crate::prelude::*;

pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime> {
    let value = value.trim();
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M"))
        .with_context(|| format!("invalid timestamp: `{value}`"))
}

use std::{fs::File, path::PathBuf};

use chrono::TimeDelta;
use clap::{ArgAction, Parser};

use crate::{
    core::{scenario::Household, tariff::sale::MarketPrices},
    input::{ReadOptions, read_household, read_market_prices},
    prelude::*,
};

#[must_use]
#[derive(Parser)]
pub struct HouseholdArgs {
    /// Meter export CSV: `timestamp`, `consumption`, and optionally `injection`, `house_total`, `existing_production`.
    #[clap(long = "consumption", env = "CONSUMPTION_PATH")]
    pub consumption_path: PathBuf,

    /// Timestamps mark the interval end.
    #[clap(
        long = "timestamps-mark-end",
        env = "TIMESTAMPS_MARK_END",
        default_value = "true",
        action = ArgAction::Set,
    )]
    pub timestamps_mark_end: bool,

    /// Values are average kilowatts over the interval.
    #[clap(long = "power-readings", env = "POWER_READINGS")]
    pub power_readings: bool,

    /// Interval length, inferred from the data when omitted.
    #[clap(long = "cadence-minutes", env = "CADENCE_MINUTES")]
    pub cadence_minutes: Option<i64>,

    /// Reference market prices CSV: `timestamp` and `price` in €/MWh.
    #[clap(long = "market-prices", env = "MARKET_PRICES_PATH")]
    pub market_prices_path: Option<PathBuf>,
}

impl HouseholdArgs {
    pub fn read_household(&self) -> Result<Household> {
        let file = File::open(&self.consumption_path)
            .with_context(|| format!("failed to open `{}`", self.consumption_path.display()))?;
        let options = ReadOptions {
            timestamps_mark_end: self.timestamps_mark_end,
            power_readings: self.power_readings,
            cadence: self.cadence_minutes.map(TimeDelta::minutes),
        };
        read_household(file, options)
            .with_context(|| format!("failed to read `{}`", self.consumption_path.display()))
    }

    pub fn read_market_prices(&self) -> Result<MarketPrices> {
        let Some(path) = &self.market_prices_path else {
            return Ok(MarketPrices::default());
        };
        let file =
            File::open(path).with_context(|| format!("failed to open `{}`", path.display()))?;
        read_market_prices(file).with_context(|| format!("failed to read `{}`", path.display()))
    }
}

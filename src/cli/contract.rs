use std::path::{Path, PathBuf};

use clap::Parser;
use serde::Deserialize;

use crate::{
    core::{
        period::TimeOfUse,
        tariff::{
            LevyRates,
            constants::Constants,
            contract::Contract,
            prices::{SupplierPolicies, TariffPrices},
            sale::SaleModel,
            vat::VatRules,
        },
    },
    prelude::*,
    quantity::power::KiloVoltAmperes,
};

/// Everything about the tariff which is not regulated.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TariffFile {
    pub prices: TariffPrices,

    #[serde(default)]
    pub sale: SaleModel,

    #[serde(default)]
    pub suppliers: SupplierPolicies,

    #[serde(default)]
    pub vat: VatRules,

    #[serde(default)]
    pub levies: LevyRates,
}

impl TariffFile {
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn read_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read `{}`", path.display()))?;
        let tariff: Self = toml::from_str(&contents)
            .with_context(|| format!("failed to parse `{}`", path.display()))?;
        info!(supplier = ?tariff.prices.supplier, n_periods = tariff.prices.energy.len(), "loaded the tariff");
        Ok(tariff)
    }
}

#[must_use]
#[derive(Parser)]
pub struct ConstantsArgs {
    /// Regulatory constants TOML, replaces the built-in ones.
    #[clap(long = "constants", env = "CONSTANTS_PATH")]
    pub path: Option<PathBuf>,
}

impl ConstantsArgs {
    pub fn load(&self) -> Result<Constants> {
        self.path.as_deref().map_or_else(Constants::builtin, Constants::read_from)
    }
}

#[must_use]
#[derive(Parser)]
pub struct ContractArgs {
    /// Tariff TOML with the prices, the sale model, and the supplier policies.
    #[clap(long = "tariff", env = "TARIFF_PATH")]
    pub tariff_path: PathBuf,

    #[clap(flatten)]
    pub constants: ConstantsArgs,

    /// Contracted power in kVA.
    #[clap(long = "contracted-power", env = "CONTRACTED_POWER", default_value = "6.9")]
    pub power: KiloVoltAmperes,

    #[clap(long = "time-of-use", env = "TIME_OF_USE", default_value = "simple")]
    pub time_of_use: TimeOfUse,

    /// Billing period length, defaults to the number of days in the meter data.
    #[clap(long = "days", env = "DAYS")]
    pub days: Option<u32>,

    #[clap(long = "social-tariff", env = "SOCIAL_TARIFF")]
    pub social_tariff: bool,

    #[clap(long = "large-family", env = "LARGE_FAMILY")]
    pub large_family: bool,
}

impl ContractArgs {
    pub fn contract(&self, n_days: u32) -> Contract {
        Contract {
            power: self.power,
            time_of_use: self.time_of_use,
            days: self.days.unwrap_or(n_days),
            social_tariff: self.social_tariff,
            large_family: self.large_family,
        }
    }
}

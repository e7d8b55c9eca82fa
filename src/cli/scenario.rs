use clap::Parser;

use crate::{
    cli::{
        battery::BatteryArgs,
        contract::{ContractArgs, TariffFile},
        household::HouseholdArgs,
        projection::ProjectionArgs,
        pv::PvArgs,
    },
    core::{
        scenario::{Household, Settlement},
        tariff::{CostEngine, constants::Constants, contract::Contract, sale::MarketPrices},
    },
    prelude::*,
};

/// Inputs shared by the single scenario and the sweep.
#[must_use]
#[derive(Parser)]
pub struct ScenarioArgs {
    #[clap(flatten)]
    pub household: HouseholdArgs,

    #[clap(flatten)]
    pub contract: ContractArgs,

    #[clap(flatten)]
    pub pv: PvArgs,

    #[clap(flatten)]
    pub battery: BatteryArgs,

    #[clap(flatten)]
    pub projection: ProjectionArgs,

    /// Print JSON instead of the tables.
    #[clap(long = "json", env = "JSON")]
    pub json: bool,
}

/// Everything read from the disk.
pub struct Loaded {
    pub household: Household,
    pub market: MarketPrices,
    pub tariff: TariffFile,
    pub constants: Constants,
    pub contract: Contract,
}

impl ScenarioArgs {
    #[instrument(skip_all)]
    pub fn load(&self) -> Result<Loaded> {
        let household = self.household.read_household()?;
        let contract = self.contract.contract(household.consumption.n_days());
        contract.access_tier()?;
        Ok(Loaded {
            market: self.household.read_market_prices()?,
            tariff: TariffFile::read_from(&self.contract.tariff_path)?,
            constants: self.contract.constants.load()?,
            household,
            contract,
        })
    }
}

impl Loaded {
    pub const fn settlement(&self) -> Settlement<'_> {
        Settlement {
            engine: CostEngine {
                constants: &self.constants,
                vat: &self.tariff.vat,
                levies: &self.tariff.levies,
                suppliers: &self.tariff.suppliers,
            },
            prices: &self.tariff.prices,
            contract: self.contract,
            sale_model: &self.tariff.sale,
            market: &self.market,
        }
    }
}

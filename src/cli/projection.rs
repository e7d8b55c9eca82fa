use clap::Parser;

use crate::{
    core::{projection::ProjectionTerms, sweep::InstallCosts},
    quantity::{money::Euros, ratios::Percentage},
};

#[must_use]
#[derive(Copy, Clone, Parser)]
pub struct ProjectionArgs {
    #[clap(long = "years", env = "PROJECTION_YEARS", default_value = "25")]
    pub years: u32,

    /// Annual production loss of the panels.
    #[clap(long = "degradation", env = "DEGRADATION", default_value = "0.5")]
    pub degradation: Percentage,

    /// Annual growth of the purchase prices.
    #[clap(long = "inflation", env = "INFLATION", default_value = "2", allow_hyphen_values = true)]
    pub inflation: Percentage,

    /// Annual change of the sale prices.
    #[clap(long = "sale-price-drift", env = "SALE_PRICE_DRIFT", default_value = "0", allow_hyphen_values = true)]
    pub sale_price_drift: Percentage,

    /// Installation price per kilowatt-peak.
    #[clap(long = "cost-per-peak-kilowatt", env = "COST_PER_PEAK_KILOWATT", default_value = "1200")]
    pub cost_per_peak_kilowatt: Euros,

    /// Battery price per kilowatt-hour of the nominal capacity.
    #[clap(
        long = "cost-per-battery-kilowatt-hour",
        env = "COST_PER_BATTERY_KILOWATT_HOUR",
        default_value = "500"
    )]
    pub cost_per_battery_kilowatt_hour: Euros,
}

impl ProjectionArgs {
    pub const fn terms(&self) -> ProjectionTerms {
        ProjectionTerms {
            years: self.years,
            degradation: self.degradation,
            inflation: self.inflation,
            sale_price_drift: self.sale_price_drift,
        }
    }

    pub const fn costs(&self) -> InstallCosts {
        InstallCosts {
            per_peak_kilowatt: self.cost_per_peak_kilowatt,
            per_battery_kilowatt_hour: self.cost_per_battery_kilowatt_hour,
        }
    }
}

//! Battery-related CLI arguments.

use clap::Parser;

use crate::{
    core::sweep::BatteryTemplate,
    quantity::{power::Kilowatts, ratios::Percentage},
};

#[must_use]
#[derive(Copy, Clone, Parser)]
pub struct BatteryArgs {
    /// Charging and discharging power limit.
    #[clap(long = "battery-power", env = "BATTERY_POWER", default_value = "2.5")]
    pub power_limit: Kilowatts,

    #[clap(long = "battery-round-trip-efficiency", env = "BATTERY_ROUND_TRIP_EFFICIENCY", default_value = "90")]
    pub round_trip_efficiency: Percentage,

    /// Usable share of the nominal capacity.
    #[clap(long = "battery-depth-of-discharge", env = "BATTERY_DEPTH_OF_DISCHARGE", default_value = "90")]
    pub depth_of_discharge: Percentage,
}

impl BatteryArgs {
    pub const fn template(&self) -> BatteryTemplate {
        BatteryTemplate {
            power_limit: self.power_limit,
            round_trip_efficiency: self.round_trip_efficiency,
            depth_of_discharge: self.depth_of_discharge,
        }
    }
}

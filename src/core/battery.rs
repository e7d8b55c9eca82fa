mod simulator;

use bon::bon;
use serde::Serialize;

pub use self::simulator::{Simulator, simulate};
use crate::{
    prelude::*,
    quantity::{energy::KilowattHours, power::Kilowatts, ratios::Percentage},
};

/// Nominal battery parameters.
#[must_use]
#[derive(Copy, Clone, Debug, Serialize)]
pub struct BatterySpec {
    pub capacity: KilowattHours,

    /// Maximum charging and discharging power.
    pub power_limit: Kilowatts,

    pub round_trip_efficiency: Percentage,
    pub depth_of_discharge: Percentage,
}

#[bon]
impl BatterySpec {
    #[builder]
    pub fn new(
        capacity: KilowattHours,
        power_limit: Kilowatts,
        round_trip_efficiency: Percentage,
        depth_of_discharge: Percentage,
    ) -> Result<Self> {
        if !capacity.0.is_finite() || capacity < KilowattHours::ZERO {
            bail!("invalid battery capacity: {capacity}");
        }
        if !power_limit.0.is_finite() || power_limit < Kilowatts::ZERO {
            bail!("invalid battery power limit: {power_limit}");
        }
        if !(round_trip_efficiency > Percentage::ZERO && round_trip_efficiency <= Percentage::HUNDRED) {
            bail!("invalid round-trip efficiency: {round_trip_efficiency}");
        }
        if !(depth_of_discharge >= Percentage::ZERO && depth_of_discharge <= Percentage::HUNDRED) {
            bail!("invalid depth of discharge: {depth_of_discharge}");
        }
        Ok(Self { capacity, power_limit, round_trip_efficiency, depth_of_discharge })
    }
}

impl BatterySpec {
    /// Energy which can be cycled without going below the protective charge level.
    pub fn usable_capacity(&self) -> KilowattHours {
        self.capacity * self.depth_of_discharge.to_ratio()
    }

    /// Efficiency of a single pass, so that charging and then discharging reproduces the round trip.
    pub fn one_way_efficiency(&self) -> f64 {
        self.round_trip_efficiency.to_ratio().sqrt()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn derived_parameters() -> Result {
        let spec = BatterySpec::builder()
            .capacity(KilowattHours(10.0))
            .power_limit(Kilowatts(5.0))
            .round_trip_efficiency(Percentage(81.0))
            .depth_of_discharge(Percentage(90.0))
            .build()?;
        assert_abs_diff_eq!(spec.usable_capacity(), KilowattHours(9.0));
        assert_abs_diff_eq!(spec.one_way_efficiency(), 0.9);
        Ok(())
    }

    #[test]
    fn rejects_zero_efficiency() {
        assert!(
            BatterySpec::builder()
                .capacity(KilowattHours(10.0))
                .power_limit(Kilowatts(5.0))
                .round_trip_efficiency(Percentage::ZERO)
                .depth_of_discharge(Percentage(90.0))
                .build()
                .is_err()
        );
    }
}

use serde::Serialize;

use crate::quantity::energy::KilowattHours;

/// Energy balance of one interval.
///
/// Direct self-consumption is what the on-site production covers in the same interval.
/// When the battery is simulated, the battery flow sits between production and the grid:
///
/// - `consumption = self_consumed + battery.delivered + grid_draw`
/// - `production = self_consumed + battery.charged + excess`
#[must_use]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct IntervalRecord {
    pub consumption: KilowattHours,
    pub production: KilowattHours,
    pub self_consumed: KilowattHours,
    pub excess: KilowattHours,
    pub grid_draw: KilowattHours,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub battery: Option<BatteryTrace>,
}

#[must_use]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BatteryTrace {
    /// Energy absorbed from the excess, before the charging losses.
    pub charged: KilowattHours,

    /// Energy delivered to the household, after the discharging losses.
    pub delivered: KilowattHours,

    /// Stored energy at the end of the interval.
    pub state_of_charge: KilowattHours,
}

impl IntervalRecord {
    pub fn battery_charged(&self) -> KilowattHours {
        self.battery.map_or(KilowattHours::ZERO, |battery| battery.charged)
    }

    pub fn battery_delivered(&self) -> KilowattHours {
        self.battery.map_or(KilowattHours::ZERO, |battery| battery.delivered)
    }
}

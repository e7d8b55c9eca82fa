use chrono::TimeDelta;

use crate::{
    core::{
        battery::BatterySpec,
        record::{BatteryTrace, IntervalRecord},
        series::Series,
    },
    prelude::*,
    quantity::energy::KilowattHours,
};

/// Battery state during one simulation run.
#[derive(Copy, Clone)]
pub struct Simulator {
    pub usable_capacity: KilowattHours,

    /// Current stored energy, always within `0..=usable_capacity`.
    pub state_of_charge: KilowattHours,

    /// Maximum energy moved in or out within one interval.
    pub energy_limit: KilowattHours,

    pub one_way_efficiency: f64,
}

impl Simulator {
    /// Start with an empty battery.
    pub fn new(spec: &BatterySpec, cadence: TimeDelta) -> Self {
        Self {
            usable_capacity: spec.usable_capacity(),
            state_of_charge: KilowattHours::ZERO,
            energy_limit: spec.power_limit * cadence,
            one_way_efficiency: spec.one_way_efficiency(),
        }
    }

    /// Charge from the excess or discharge into the grid draw, update the state and return the revised record.
    ///
    /// Charging and discharging are mutually exclusive within one interval.
    pub fn apply(&mut self, mut record: IntervalRecord) -> IntervalRecord {
        let mut trace = BatteryTrace::default();
        if record.excess > KilowattHours::ZERO {
            let headroom = (self.usable_capacity - self.state_of_charge) / self.one_way_efficiency;
            let chargeable = record.excess.min(self.energy_limit).min(headroom).non_negative();
            self.state_of_charge =
                (self.state_of_charge + chargeable * self.one_way_efficiency).min(self.usable_capacity);
            record.excess = (record.excess - chargeable).non_negative();
            trace.charged = chargeable;
        } else if record.grid_draw > KilowattHours::ZERO {
            let dischargeable = (record.grid_draw / self.one_way_efficiency)
                .min(self.energy_limit)
                .min(self.state_of_charge)
                .non_negative();
            let delivered = dischargeable * self.one_way_efficiency;
            self.state_of_charge = (self.state_of_charge - dischargeable).non_negative();
            record.grid_draw = (record.grid_draw - delivered).non_negative();
            trace.delivered = delivered;
        }
        trace.state_of_charge = self.state_of_charge;
        record.battery = Some(trace);
        record
    }
}

/// Run the battery over the balance and return the revised series with the battery trace.
#[instrument(skip_all, fields(capacity = %spec.capacity, n_intervals = balance.len()))]
pub fn simulate(balance: &Series<IntervalRecord>, spec: &BatterySpec) -> Series<IntervalRecord> {
    let mut simulator = Simulator::new(spec, balance.cadence());
    let revised = balance.map(|_, record| simulator.apply(*record));
    debug!(final_state_of_charge = %simulator.state_of_charge, "simulated");
    revised
}

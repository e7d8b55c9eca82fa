use chrono::TimeDelta;

use crate::quantity::{energy::KilowattHours, time::Hours};

quantity!(Kilowatts, via: f64, suffix: "kW", precision: 3);

quantity!(
    /// Apparent power, used for the contracted power of a grid connection.
    KiloVoltAmperes, via: f64, suffix: "kVA", precision: 2
);

implement_mul!(Kilowatts, Hours, KilowattHours);

impl std::ops::Mul<TimeDelta> for Kilowatts {
    type Output = KilowattHours;

    fn mul(self, time_delta: TimeDelta) -> Self::Output {
        self * Hours::from(time_delta)
    }
}

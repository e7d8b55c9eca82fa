use crate::quantity::energy::KilowattHours;

quantity!(Euros, via: f64, suffix: "€", precision: 2);

quantity!(
    /// Energy unit price.
    KilowattHourPrice, via: f64, suffix: "€/kWh", precision: 4
);

quantity!(
    /// Wholesale market price as published by the market operator.
    MegawattHourPrice, via: f64, suffix: "€/MWh", precision: 2
);

quantity!(
    /// Contracted power price per day.
    DailyPrice, via: f64, suffix: "€/day", precision: 4
);

implement_mul!(KilowattHourPrice, KilowattHours, Euros);

impl From<MegawattHourPrice> for KilowattHourPrice {
    fn from(price: MegawattHourPrice) -> Self {
        Self(price.0 / 1000.0)
    }
}

impl DailyPrice {
    pub fn for_days(self, days: u32) -> Euros {
        Euros(self.0 * f64::from(days))
    }
}

impl KilowattHourPrice {
    /// Average price of the energy, or zero when there is no energy.
    pub fn average(amount: Euros, energy: KilowattHours) -> Self {
        if energy > KilowattHours::ZERO { Self(amount.0 / energy.0) } else { Self::ZERO }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn energy_cost() {
        assert_abs_diff_eq!(KilowattHourPrice(0.25) * KilowattHours(4.0), Euros(1.0));
        assert_abs_diff_eq!(KilowattHours(4.0) * KilowattHourPrice(0.25), Euros(1.0));
    }

    #[test]
    fn average_without_energy() {
        assert_eq!(KilowattHourPrice::average(Euros(10.0), KilowattHours::ZERO), KilowattHourPrice::ZERO);
    }

    #[test]
    fn megawatt_hour_conversion() {
        assert_abs_diff_eq!(
            KilowattHourPrice::from(MegawattHourPrice(85.0)),
            KilowattHourPrice(0.085),
        );
    }
}

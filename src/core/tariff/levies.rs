use serde::{Deserialize, Serialize};

use crate::{
    core::tariff::{
        contract::Contract,
        prices::SupplierPolicy,
        vat::{TaxedAmount, VatRules},
    },
    quantity::{
        energy::KilowattHours,
        money::{Euros, KilowattHourPrice},
    },
};

/// Additional regulatory charges, without VAT.
#[derive(Copy, Clone, Debug, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LevyRates {
    /// Special consumption tax per kilowatt-hour drawn from the grid.
    pub consumption: KilowattHourPrice,

    /// Energy regulator operating fee per month.
    pub operator_fee_monthly: Euros,

    /// Audiovisual contribution per month.
    pub audiovisual_monthly: Euros,
}

impl Default for LevyRates {
    fn default() -> Self {
        Self {
            consumption: KilowattHourPrice(0.001),
            operator_fee_monthly: Euros(0.07),
            audiovisual_monthly: Euros(2.85),
        }
    }
}

#[must_use]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Levies {
    pub consumption: TaxedAmount,
    pub operator_fee: TaxedAmount,
    pub audiovisual: TaxedAmount,
}

impl Levies {
    pub fn total(&self) -> TaxedAmount {
        self.consumption + self.operator_fee + self.audiovisual
    }
}

impl LevyRates {
    pub fn apply(
        &self,
        vat: &VatRules,
        contract: &Contract,
        grid_draw: KilowattHours,
        policy: SupplierPolicy,
    ) -> Levies {
        if contract.days == 0 {
            return Levies::default();
        }
        let consumption = if contract.social_tariff {
            TaxedAmount::default()
        } else {
            vat.standard(self.consumption * grid_draw)
        };
        let audiovisual = if policy.flat_monthly_audiovisual_fee && contract.is_billing_month() {
            self.audiovisual_monthly
        } else {
            pro_rate_annually(self.audiovisual_monthly, contract.days)
        };
        Levies {
            consumption,
            operator_fee: vat.standard(pro_rate_annually(self.operator_fee_monthly, contract.days)),
            audiovisual: vat.reduced(audiovisual),
        }
    }
}

/// Pro-rate a monthly amount to the number of days using the average year length.
fn pro_rate_annually(monthly: Euros, days: u32) -> Euros {
    monthly * 12.0 / 365.25 * f64::from(days)
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::{core::period::TimeOfUse, quantity::power::KiloVoltAmperes};

    fn contract(days: u32, social_tariff: bool) -> Contract {
        Contract {
            power: KiloVoltAmperes(6.9),
            time_of_use: TimeOfUse::Simple,
            days,
            social_tariff,
            large_family: false,
        }
    }

    #[test]
    fn pro_rated_levies() {
        let levies = LevyRates::default().apply(
            &VatRules::default(),
            &contract(30, false),
            KilowattHours(250.0),
            SupplierPolicy::default(),
        );
        assert_abs_diff_eq!(levies.consumption.standard_rate_base, Euros(0.25), epsilon = 1e-9);
        assert_abs_diff_eq!(
            levies.operator_fee.standard_rate_base,
            Euros(0.07 * 12.0 / 365.25 * 30.0),
            epsilon = 1e-9,
        );
        assert_abs_diff_eq!(
            levies.audiovisual.reduced_rate_base,
            Euros(2.85 * 12.0 / 365.25 * 30.0),
            epsilon = 1e-9,
        );
    }

    #[test]
    fn social_tariff_waives_consumption_levy() {
        let levies = LevyRates::default().apply(
            &VatRules::default(),
            &contract(30, true),
            KilowattHours(250.0),
            SupplierPolicy::default(),
        );
        assert_eq!(levies.consumption, TaxedAmount::default());
    }

    #[test]
    fn flat_audiovisual_fee_in_billing_month() {
        let policy = SupplierPolicy { flat_monthly_audiovisual_fee: true, ..SupplierPolicy::default() };
        let rates = LevyRates::default();
        let levies = rates.apply(&VatRules::default(), &contract(31, false), KilowattHours(1.0), policy);
        assert_abs_diff_eq!(levies.audiovisual.reduced_rate_base, Euros(2.85), epsilon = 1e-9);

        // Outside of a billing month, it is pro-rated as usual:
        let levies = rates.apply(&VatRules::default(), &contract(60, false), KilowattHours(1.0), policy);
        assert_abs_diff_eq!(
            levies.audiovisual.reduced_rate_base,
            Euros(2.85 * 12.0 / 365.25 * 60.0),
            epsilon = 1e-9,
        );
    }

    #[test]
    fn zero_days() {
        let levies = LevyRates::default().apply(
            &VatRules::default(),
            &contract(0, false),
            KilowattHours(10.0),
            SupplierPolicy::default(),
        );
        assert_eq!(levies.total().gross(), Euros::ZERO);
    }
}

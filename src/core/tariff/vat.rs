use std::collections::BTreeMap;

use derive_more::{Add, AddAssign};
use serde::{Deserialize, Serialize};

use crate::{
    core::{period::Period, tariff::contract::Contract},
    quantity::{
        energy::KilowattHours,
        money::{DailyPrice, Euros, KilowattHourPrice},
        power::KiloVoltAmperes,
        ratios::Percentage,
    },
};

/// VAT rates and the reduced-rate eligibility rules.
#[derive(Copy, Clone, Debug, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct VatRules {
    pub standard_rate: Percentage,
    pub reduced_rate: Percentage,

    /// Highest contracted power with the reduced rate on the energy allowance.
    pub reduced_energy_max_power: KiloVoltAmperes,

    /// Highest contracted power with the reduced rate on the power access component.
    pub reduced_power_max_power: KiloVoltAmperes,

    /// Energy per 30 days taxed at the reduced rate.
    pub monthly_allowance: KilowattHours,

    pub large_family_monthly_allowance: KilowattHours,
}

impl Default for VatRules {
    fn default() -> Self {
        Self {
            standard_rate: Percentage(23.0),
            reduced_rate: Percentage(6.0),
            reduced_energy_max_power: KiloVoltAmperes(6.9),
            reduced_power_max_power: KiloVoltAmperes(3.45),
            monthly_allowance: KilowattHours(200.0),
            large_family_monthly_allowance: KilowattHours(400.0),
        }
    }
}

/// Amount without VAT split by the applicable rate, together with the VAT itself.
#[must_use]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Add, AddAssign, Serialize)]
pub struct TaxedAmount {
    pub reduced_rate_base: Euros,
    pub standard_rate_base: Euros,
    pub reduced_vat: Euros,
    pub standard_vat: Euros,
}

impl TaxedAmount {
    pub fn net(&self) -> Euros {
        self.reduced_rate_base + self.standard_rate_base
    }

    pub fn vat(&self) -> Euros {
        self.reduced_vat + self.standard_vat
    }

    pub fn gross(&self) -> Euros {
        self.net() + self.vat()
    }

    #[cfg(test)]
    pub fn is_zero(&self) -> bool {
        self.gross() == Euros::ZERO
    }
}

impl VatRules {
    pub fn reduced(&self, base: Euros) -> TaxedAmount {
        TaxedAmount {
            reduced_rate_base: base,
            reduced_vat: base * self.reduced_rate.to_ratio(),
            ..TaxedAmount::default()
        }
    }

    pub fn standard(&self, base: Euros) -> TaxedAmount {
        TaxedAmount {
            standard_rate_base: base,
            standard_vat: base * self.standard_rate.to_ratio(),
            ..TaxedAmount::default()
        }
    }

    /// Energy taxed at the reduced rate within the period.
    pub fn energy_allowance(&self, contract: &Contract) -> KilowattHours {
        if contract.power > self.reduced_energy_max_power {
            return KilowattHours::ZERO;
        }
        let monthly = if contract.large_family {
            self.large_family_monthly_allowance
        } else {
            self.monthly_allowance
        };
        monthly * f64::from(contract.days) / 30.0
    }

    /// Tax the energy cost.
    ///
    /// The reduced-rate allowance is shared between the periods proportionally to their consumption.
    pub fn energy(
        &self,
        contract: &Contract,
        energy: &BTreeMap<Period, KilowattHours>,
        unit_prices: &BTreeMap<Period, KilowattHourPrice>,
    ) -> TaxedAmount {
        let allowance = self.energy_allowance(contract);
        let total: KilowattHours = energy.values().copied().sum();
        let mut amount = TaxedAmount::default();
        for (period, &energy) in energy {
            let unit_price = unit_prices.get(period).copied().unwrap_or(KilowattHourPrice::ZERO);
            let reduced_energy = if total > KilowattHours::ZERO {
                energy.min(allowance * (energy / total))
            } else {
                KilowattHours::ZERO
            };
            amount += self.reduced(unit_price * reduced_energy);
            amount += self.standard(unit_price * (energy - reduced_energy));
        }
        amount
    }

    /// Tax the contracted power cost.
    ///
    /// The access component is taxed at the reduced rate only at the lowest power tiers.
    pub fn power(&self, contract: &Contract, commercial: DailyPrice, access: DailyPrice) -> TaxedAmount {
        let commercial = commercial.for_days(contract.days);
        let access = access.for_days(contract.days);
        if contract.power <= self.reduced_power_max_power {
            self.standard(commercial) + self.reduced(access)
        } else {
            self.standard(commercial + access)
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::core::period::TimeOfUse;

    fn contract(power: f64, days: u32) -> Contract {
        Contract {
            power: KiloVoltAmperes(power),
            time_of_use: TimeOfUse::Simple,
            days,
            social_tariff: false,
            large_family: false,
        }
    }

    fn simple(energy: f64) -> (BTreeMap<Period, KilowattHours>, BTreeMap<Period, KilowattHourPrice>) {
        (
            BTreeMap::from([(Period::Simple, KilowattHours(energy))]),
            BTreeMap::from([(Period::Simple, KilowattHourPrice(0.1))]),
        )
    }

    #[test]
    fn allowance_covers_everything() {
        let (energy, prices) = simple(200.0);
        let amount = VatRules::default().energy(&contract(6.9, 30), &energy, &prices);
        assert_abs_diff_eq!(amount.reduced_rate_base, Euros(20.0), epsilon = 1e-9);
        assert_eq!(amount.standard_rate_base, Euros::ZERO);
        assert_abs_diff_eq!(amount.reduced_vat, Euros(1.2), epsilon = 1e-9);
    }

    #[test]
    fn consumption_above_allowance() {
        let (energy, prices) = simple(300.0);
        let amount = VatRules::default().energy(&contract(6.9, 30), &energy, &prices);
        assert_abs_diff_eq!(amount.reduced_rate_base, Euros(20.0), epsilon = 1e-9);
        assert_abs_diff_eq!(amount.standard_rate_base, Euros(10.0), epsilon = 1e-9);
        assert_abs_diff_eq!(amount.gross(), Euros(20.0 * 1.06 + 10.0 * 1.23), epsilon = 1e-9);
    }

    #[test]
    fn large_family_and_short_period() {
        let rules = VatRules::default();
        let mut contract = contract(6.9, 15);
        assert_abs_diff_eq!(rules.energy_allowance(&contract), KilowattHours(100.0));
        contract.large_family = true;
        assert_abs_diff_eq!(rules.energy_allowance(&contract), KilowattHours(200.0));
    }

    #[test]
    fn no_allowance_above_power_threshold() {
        let (energy, prices) = simple(100.0);
        let amount = VatRules::default().energy(&contract(10.35, 30), &energy, &prices);
        assert_eq!(amount.reduced_rate_base, Euros::ZERO);
        assert_abs_diff_eq!(amount.standard_rate_base, Euros(10.0), epsilon = 1e-9);
    }

    #[test]
    fn allowance_is_shared_proportionally() {
        let energy = BTreeMap::from([
            (Period::OffPeak, KilowattHours(100.0)),
            (Period::NonOffPeak, KilowattHours(300.0)),
        ]);
        let prices = BTreeMap::from([
            (Period::OffPeak, KilowattHourPrice(0.1)),
            (Period::NonOffPeak, KilowattHourPrice(0.2)),
        ]);
        let amount = VatRules::default().energy(&contract(6.9, 30), &energy, &prices);
        // 50 kWh off-peak and 150 kWh non-off-peak at the reduced rate:
        assert_abs_diff_eq!(amount.reduced_rate_base, Euros(50.0 * 0.1 + 150.0 * 0.2), epsilon = 1e-9);
        assert_abs_diff_eq!(amount.standard_rate_base, Euros(50.0 * 0.1 + 150.0 * 0.2), epsilon = 1e-9);
    }

    #[test]
    fn zero_consumption() {
        let (energy, prices) = simple(0.0);
        let amount = VatRules::default().energy(&contract(6.9, 30), &energy, &prices);
        assert_eq!(amount, TaxedAmount::default());
    }

    #[test]
    fn power_split_at_lowest_tiers() {
        let rules = VatRules::default();
        let amount = rules.power(&contract(3.45, 10), DailyPrice(0.1), DailyPrice(0.2));
        assert_abs_diff_eq!(amount.standard_rate_base, Euros(1.0), epsilon = 1e-9);
        assert_abs_diff_eq!(amount.reduced_rate_base, Euros(2.0), epsilon = 1e-9);

        let amount = rules.power(&contract(6.9, 10), DailyPrice(0.1), DailyPrice(0.2));
        assert_abs_diff_eq!(amount.standard_rate_base, Euros(3.0), epsilon = 1e-9);
        assert_eq!(amount.reduced_rate_base, Euros::ZERO);
    }

    #[test]
    fn power_without_days() {
        let amount = VatRules::default().power(&contract(3.45, 0), DailyPrice(0.1), DailyPrice(0.2));
        assert_eq!(amount.gross(), Euros::ZERO);
    }
}

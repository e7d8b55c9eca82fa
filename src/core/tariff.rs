//! Regulated tariff settlement of the grid exchange.

mod breakdown;
pub mod constants;
pub mod contract;
mod levies;
pub mod prices;
pub mod sale;
pub mod vat;

use std::collections::{BTreeMap, BTreeSet};

pub use self::{
    breakdown::{Adjustments, CostBreakdown, PeriodCost},
    levies::{Levies, LevyRates},
};
use crate::{
    core::{
        period::{Period, TimeOfUse},
        tariff::{
            constants::{ConstantKey, Constants},
            contract::{Contract, ContractError},
            prices::{SupplierPolicies, SupplierPolicy, TariffPrices},
            sale::{SaleModel, SaleSlot},
            vat::VatRules,
        },
    },
    prelude::*,
    quantity::{
        energy::KilowattHours,
        money::{DailyPrice, Euros, KilowattHourPrice},
        ratios::Percentage,
    },
};

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum TariffError {
    #[error(transparent)]
    Contract(#[from] ContractError),

    #[error("the tariff has no {period} energy price, which the {option:?} option requires")]
    MissingPrice { option: TimeOfUse, period: Period },

    #[error("required regulatory constant `{key}` is missing")]
    MissingConstant { key: ConstantKey },
}

/// Settles the grid exchange under the regulated tariff rules.
#[derive(Copy, Clone)]
pub struct CostEngine<'a> {
    pub constants: &'a Constants,
    pub vat: &'a VatRules,
    pub levies: &'a LevyRates,
    pub suppliers: &'a SupplierPolicies,
}

/// Final unit prices without VAT.
struct UnitPrices {
    energy: BTreeMap<Period, KilowattHourPrice>,
    power_commercial: DailyPrice,
    power_access: DailyPrice,
}

impl CostEngine<'_> {
    /// Compute the cost breakdown of one scenario.
    ///
    /// The energy drawn is expected to be grouped by the contract's time-of-use option.
    #[instrument(skip_all, fields(option = ?contract.time_of_use, power = %contract.power, days = contract.days))]
    pub fn cost(
        &self,
        grid_draw: &BTreeMap<Period, KilowattHours>,
        sale: impl IntoIterator<Item = SaleSlot>,
        prices: &TariffPrices,
        contract: &Contract,
        sale_model: &SaleModel,
    ) -> Result<CostBreakdown, TariffError> {
        let mut warnings = BTreeSet::new();
        let energy: BTreeMap<Period, KilowattHours> = contract
            .time_of_use
            .periods()
            .iter()
            .map(|period| (period, grid_draw.get(&period).copied().unwrap_or(KilowattHours::ZERO)))
            .collect();
        let total_energy: KilowattHours = energy.values().copied().sum();

        let unit_prices = self.unit_prices(prices, contract, contract.social_tariff, &mut warnings)?;
        let energy_cost = self.vat.energy(contract, &energy, &unit_prices.energy);
        let power_cost =
            self.vat.power(contract, unit_prices.power_commercial, unit_prices.power_access);

        let policy = self.policy(prices.supplier.as_deref(), &mut warnings);
        let levies = self.levies.apply(self.vat, contract, total_energy, policy);

        let percentage_discount = if policy.percentage_discount > Percentage::ZERO {
            // The discount applies to the cost before the social-tariff discounts.
            let (energy_cost, power_cost) = if contract.social_tariff {
                let regular = self.unit_prices(prices, contract, false, &mut warnings)?;
                (
                    self.vat.energy(contract, &energy, &regular.energy),
                    self.vat.power(contract, regular.power_commercial, regular.power_access),
                )
            } else {
                (energy_cost, power_cost)
            };
            (energy_cost.gross() + power_cost.gross()) * policy.percentage_discount.to_ratio()
        } else {
            Euros::ZERO
        };
        let adjustments = Adjustments {
            invoice_discount: Euros(contract.pro_rate_monthly(policy.monthly_invoice_discount.0)),
            surcharge: Euros(contract.pro_rate_monthly(policy.monthly_surcharge.0)),
            percentage_discount,
        };

        let purchase = (energy_cost + power_cost + levies.total()).gross() + adjustments.total();
        let sale = sale_model.settle(sale);
        let energy_by_period = energy
            .into_iter()
            .map(|(period, energy)| {
                let unit_price =
                    unit_prices.energy.get(&period).copied().unwrap_or(KilowattHourPrice::ZERO);
                (period, PeriodCost { energy, unit_price })
            })
            .collect();
        for warning in &warnings {
            warn!(%warning, "settled with a configuration gap");
        }
        Ok(CostBreakdown {
            energy_by_period,
            energy: energy_cost,
            power: power_cost,
            levies,
            adjustments,
            purchase,
            sale,
            net_balance: purchase - sale.revenue,
            warnings: warnings.into_iter().collect(),
        })
    }

    fn unit_prices(
        &self,
        prices: &TariffPrices,
        contract: &Contract,
        social_tariff: bool,
        warnings: &mut BTreeSet<String>,
    ) -> Result<UnitPrices, TariffError> {
        let tier = contract.access_tier()?;
        let declared = prices.energy_prices(contract.time_of_use)?;

        let financing = if prices.financing_included {
            KilowattHourPrice::ZERO
        } else {
            KilowattHourPrice(self.constant(ConstantKey::Financing, true, warnings)?)
        };
        let social_energy_discount = if social_tariff {
            KilowattHourPrice(self.constant(ConstantKey::SocialEnergyDiscount, false, warnings)?)
        } else {
            KilowattHourPrice::ZERO
        };
        let mut energy = BTreeMap::new();
        for (period, declared) in declared {
            let access = KilowattHourPrice(self.constant(
                ConstantKey::EnergyAccess(tier, period),
                !prices.access_included_in_energy,
                warnings,
            )?);
            let commercial = if prices.access_included_in_energy { declared - access } else { declared };
            let price = commercial + access + financing - social_energy_discount;
            energy.insert(period, price.max(KilowattHourPrice::ZERO));
        }

        let access = DailyPrice(self.constant(
            ConstantKey::power_access(contract.power),
            !prices.access_included_in_power,
            warnings,
        )?);
        let commercial = if prices.access_included_in_power { prices.power - access } else { prices.power };
        let social_power_discount = if social_tariff {
            DailyPrice(self.constant(ConstantKey::social_power_discount(contract.power), false, warnings)?)
        } else {
            DailyPrice::ZERO
        };
        Ok(UnitPrices {
            energy,
            power_commercial: commercial.max(DailyPrice::ZERO),
            power_access: (access - social_power_discount).max(DailyPrice::ZERO),
        })
    }

    /// Look up the constant, falling back to zero with a warning unless it is required.
    fn constant(
        &self,
        key: ConstantKey,
        is_required: bool,
        warnings: &mut BTreeSet<String>,
    ) -> Result<f64, TariffError> {
        match self.constants.get(key) {
            Some(value) => Ok(value),
            None if is_required => Err(TariffError::MissingConstant { key }),
            None => {
                warnings.insert(format!("regulatory constant `{key}` is missing, assuming zero"));
                Ok(0.0)
            }
        }
    }

    fn policy(&self, supplier: Option<&str>, warnings: &mut BTreeSet<String>) -> SupplierPolicy {
        let Some(supplier) = supplier else {
            return SupplierPolicy::default();
        };
        if let Some(policy) = self.suppliers.get(supplier) {
            *policy
        } else {
            warnings.insert(format!("no fee policy for supplier `{supplier}`, assuming none"));
            SupplierPolicy::default()
        }
    }
}

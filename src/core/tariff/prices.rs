use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    core::{
        period::{Period, TimeOfUse},
        tariff::TariffError,
    },
    quantity::{
        money::{DailyPrice, Euros, KilowattHourPrice},
        ratios::Percentage,
    },
};

/// Declared unit prices of a tariff, without VAT.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TariffPrices {
    /// Supplier identifier, used to look up the supplier fee policy.
    #[serde(default)]
    pub supplier: Option<String>,

    /// Energy price per billed period.
    pub energy: BTreeMap<Period, KilowattHourPrice>,

    /// Contracted power price.
    pub power: DailyPrice,

    /// Whether the declared energy prices already include the energy access price.
    #[serde(default = "included")]
    pub access_included_in_energy: bool,

    /// Whether the declared power price already includes the power access price.
    #[serde(default = "included")]
    pub access_included_in_power: bool,

    /// Whether the declared energy prices already include the social-tariff financing surcharge.
    #[serde(default = "included")]
    pub financing_included: bool,
}

const fn included() -> bool {
    true
}

impl TariffPrices {
    /// Pick the declared energy prices for every period of the option.
    pub fn energy_prices(
        &self,
        option: TimeOfUse,
    ) -> Result<BTreeMap<Period, KilowattHourPrice>, TariffError> {
        option
            .periods()
            .iter()
            .map(|period| {
                self.energy
                    .get(&period)
                    .map(|price| (period, *price))
                    .ok_or(TariffError::MissingPrice { option, period })
            })
            .collect()
    }
}

/// Supplier-specific fees and discounts.
#[derive(Copy, Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SupplierPolicy {
    /// Charge the audiovisual contribution as a full monthly amount in a billing month.
    pub flat_monthly_audiovisual_fee: bool,

    /// Invoice discount per month, with VAT.
    pub monthly_invoice_discount: Euros,

    /// Membership or service surcharge per month, with VAT.
    pub monthly_surcharge: Euros,

    /// Discount on the energy and power cost with VAT, computed without the social tariff.
    pub percentage_discount: Percentage,
}

/// Supplier policy table, keyed by the supplier identifier.
pub type SupplierPolicies = BTreeMap<String, SupplierPolicy>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_prices() {
        // language=toml
        let prices: TariffPrices = toml::from_str(
            r#"
            supplier = "acme"
            power = 0.3
            access_included_in_power = false

            [energy]
            off-peak = 0.1
            non-off-peak = 0.2
            "#,
        )
        .unwrap();
        assert_eq!(prices.supplier.as_deref(), Some("acme"));
        assert!(prices.access_included_in_energy);
        assert!(!prices.access_included_in_power);
        assert_eq!(prices.energy_prices(TimeOfUse::BiDaily).unwrap().len(), 2);
    }

    #[test]
    fn missing_period_price_is_reported() {
        let prices = TariffPrices {
            supplier: None,
            energy: BTreeMap::from([(Period::Simple, KilowattHourPrice(0.15))]),
            power: DailyPrice(0.3),
            access_included_in_energy: true,
            access_included_in_power: true,
            financing_included: true,
        };
        assert!(matches!(
            prices.energy_prices(TimeOfUse::TriWeekly),
            Err(TariffError::MissingPrice { option: TimeOfUse::TriWeekly, period: Period::OffPeak }),
        ));
    }
}

use std::collections::BTreeMap;

use serde::Serialize;

use crate::{
    core::{
        period::Period,
        tariff::{levies::Levies, sale::SaleSummary, vat::TaxedAmount},
    },
    quantity::{
        energy::KilowattHours,
        money::{Euros, KilowattHourPrice},
    },
};

/// Grid draw and the final unit price without VAT of one billed period.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PeriodCost {
    pub energy: KilowattHours,
    pub unit_price: KilowattHourPrice,
}

/// Supplier adjustments with VAT, applied on top of the taxed amounts.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Adjustments {
    pub invoice_discount: Euros,
    pub surcharge: Euros,
    pub percentage_discount: Euros,
}

impl Adjustments {
    /// Net effect on the bill: positive means the bill grows.
    pub fn total(&self) -> Euros {
        self.surcharge - self.invoice_discount - self.percentage_discount
    }
}

#[must_use]
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CostBreakdown {
    pub energy_by_period: BTreeMap<Period, PeriodCost>,
    pub energy: TaxedAmount,
    pub power: TaxedAmount,
    pub levies: Levies,
    pub adjustments: Adjustments,

    /// Total purchase cost with VAT.
    pub purchase: Euros,

    pub sale: SaleSummary,

    /// Purchase cost minus the sale revenue.
    pub net_balance: Euros,

    /// Recoverable configuration gaps met while settling.
    pub warnings: Vec<String>,
}

impl CostBreakdown {
    pub fn grid_draw(&self) -> KilowattHours {
        self.energy_by_period.values().map(|period| period.energy).sum()
    }

    /// All the VAT charged, on both rates.
    pub fn vat(&self) -> TaxedAmount {
        self.energy + self.power + self.levies.total()
    }

    /// Average purchase price per kilowatt-hour drawn, with VAT and all the fixed charges.
    pub fn average_purchase_price(&self) -> KilowattHourPrice {
        KilowattHourPrice::average(self.purchase, self.grid_draw())
    }
}

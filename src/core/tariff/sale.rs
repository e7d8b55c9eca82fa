use std::collections::BTreeMap;

use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::quantity::{
    energy::KilowattHours,
    money::{Euros, KilowattHourPrice, MegawattHourPrice},
    ratios::Percentage,
};

/// How the injected energy is paid for.
#[derive(Copy, Clone, Debug, Default, Deserialize, Serialize)]
#[serde(tag = "model", rename_all = "kebab-case", deny_unknown_fields)]
pub enum SaleModel {
    /// Injected energy is not paid for.
    #[default]
    Disabled,

    Fixed { price: KilowattHourPrice },

    /// Wholesale market price of the interval minus the buyer's commission.
    Indexed { commission: Commission },
}

#[derive(Copy, Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Commission {
    Percentage(Percentage),
    Fixed(MegawattHourPrice),
}

/// Energy injected within one interval and the market price of that interval, if published.
#[derive(Copy, Clone, Debug)]
pub struct SaleSlot {
    pub energy: KilowattHours,
    pub market_price: Option<MegawattHourPrice>,
}

/// Published wholesale market prices, keyed by the interval start.
#[derive(Clone, Debug, Default)]
pub struct MarketPrices(pub BTreeMap<NaiveDateTime, MegawattHourPrice>);

impl MarketPrices {
    /// Look up the interval price, or the price of the enclosing hour for hourly publications.
    pub fn price_at(&self, timestamp: NaiveDateTime) -> Option<MegawattHourPrice> {
        self.0.get(&timestamp).copied().or_else(|| {
            let hour_start = timestamp.with_minute(0)?.with_second(0)?;
            self.0.get(&hour_start).copied()
        })
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[must_use]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SaleSummary {
    pub injected: KilowattHours,
    pub revenue: Euros,
    pub average_price: KilowattHourPrice,
}

impl SaleModel {
    /// Unit price of the interval, never negative.
    pub fn unit_price(&self, market_price: Option<MegawattHourPrice>) -> KilowattHourPrice {
        let price = match self {
            Self::Disabled => KilowattHourPrice::ZERO,
            Self::Fixed { price } => *price,
            Self::Indexed { commission } => {
                let market_price = market_price.unwrap_or(MegawattHourPrice::ZERO);
                match commission {
                    Commission::Percentage(percentage) => {
                        KilowattHourPrice::from(market_price) * percentage.complement()
                    }
                    Commission::Fixed(commission) => {
                        KilowattHourPrice::from(market_price - *commission)
                    }
                }
            }
        };
        price.max(KilowattHourPrice::ZERO)
    }

    pub fn settle(&self, slots: impl IntoIterator<Item = SaleSlot>) -> SaleSummary {
        let (injected, revenue) = slots.into_iter().fold(
            (KilowattHours::ZERO, Euros::ZERO),
            |(injected, revenue), slot| {
                (injected + slot.energy, revenue + self.unit_price(slot.market_price) * slot.energy)
            },
        );
        SaleSummary { injected, revenue, average_price: KilowattHourPrice::average(revenue, injected) }
    }
}

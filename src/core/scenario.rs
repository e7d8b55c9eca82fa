//! As-is versus simulated settlement of one household.

use chrono::NaiveDateTime;
use itertools::{EitherOrBoth, Itertools};
use serde::Serialize;

use crate::{
    core::{
        balance,
        battery::{self, BatterySpec},
        flow::Flow,
        projection::{Projection, ProjectionTerms},
        record::IntervalRecord,
        series::Series,
        tariff::{
            CostBreakdown,
            CostEngine,
            TariffError,
            contract::Contract,
            prices::TariffPrices,
            sale::{MarketPrices, SaleModel, SaleSlot},
        },
    },
    prelude::*,
    quantity::{
        energy::KilowattHours,
        money::{Euros, KilowattHourPrice},
        ratios::Percentage,
    },
};

const DAYS_PER_YEAR: f64 = 365.25;

/// Metered household data.
#[derive(Clone, Debug)]
pub struct Household {
    /// Energy drawn from the grid.
    pub consumption: Series<KilowattHours>,

    /// Energy injected by an already existing installation.
    pub injection: Option<Series<KilowattHours>>,

    /// Total household consumption, including the self-consumption of an existing installation.
    pub house_total: Option<Series<KilowattHours>>,
}

/// Everything needed to put a price on the grid exchange.
#[derive(Copy, Clone)]
pub struct Settlement<'a> {
    pub engine: CostEngine<'a>,
    pub prices: &'a TariffPrices,
    pub contract: Contract,
    pub sale_model: &'a SaleModel,
    pub market: &'a MarketPrices,
}

impl Settlement<'_> {
    pub fn settle(
        &self,
        grid_draw: impl IntoIterator<Item = (NaiveDateTime, KilowattHours)>,
        injection: impl IntoIterator<Item = (NaiveDateTime, KilowattHours)>,
    ) -> Result<CostBreakdown, TariffError> {
        let grid_draw = self.contract.time_of_use.group(grid_draw);
        let slots = injection.into_iter().map(|(timestamp, energy)| SaleSlot {
            energy,
            market_price: self.market.price_at(timestamp),
        });
        self.engine.cost(&grid_draw, slots, self.prices, &self.contract, self.sale_model)
    }

    /// Scale the period amount to a year.
    pub fn annualize(&self, amount: Euros) -> Euros {
        if self.contract.days == 0 {
            Euros::ZERO
        } else {
            amount * (DAYS_PER_YEAR / f64::from(self.contract.days))
        }
    }
}

#[must_use]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct EnergyTotals {
    pub consumption: KilowattHours,
    pub production: KilowattHours,
    pub self_consumed: KilowattHours,

    /// Grid draw and injection.
    pub grid: Flow<KilowattHours>,

    /// Battery charging and discharging.
    pub battery: Flow<KilowattHours>,

    pub self_sufficiency: Percentage,
}

impl EnergyTotals {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a IntervalRecord>) -> Self {
        let mut totals = records.into_iter().fold(Self::default(), |mut totals, record| {
            totals.consumption += record.consumption;
            totals.production += record.production;
            totals.self_consumed += record.self_consumed;
            totals.grid += Flow { import: record.grid_draw, export: record.excess };
            totals.battery +=
                Flow { import: record.battery_charged(), export: record.battery_delivered() };
            totals
        });
        if totals.consumption > KilowattHours::ZERO {
            totals.self_sufficiency =
                Percentage((1.0 - totals.grid.import / totals.consumption) * 100.0);
        }
        totals
    }
}

#[must_use]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Savings {
    /// Net balance difference over the analysed period.
    pub period: Euros,

    pub annual: Euros,

    /// Annual saving on the purchased energy.
    pub self_consumption_annual: Euros,

    /// Annual additional sale revenue.
    pub sale_annual: Euros,
}

/// Contribution of an already existing installation.
#[must_use]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Baseline {
    pub house_total: KilowattHours,
    pub self_consumption: KilowattHours,
    pub average_purchase_price: KilowattHourPrice,

    /// What the household would have paid without the installation, minus what it actually paid.
    pub savings: Euros,

    /// Value of the self-consumed energy at the average purchase price.
    pub self_consumption_value: Euros,
}

#[must_use]
#[derive(Clone, Debug, Serialize)]
pub struct Evaluation {
    pub as_is: CostBreakdown,
    pub simulated: CostBreakdown,
    pub totals: EnergyTotals,
    pub savings: Savings,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline: Option<Baseline>,

    #[serde(skip)]
    pub balance: Series<IntervalRecord>,
}

impl Evaluation {
    /// Configuration gaps of both settlements, deduplicated.
    pub fn warnings(&self) -> impl Iterator<Item = &str> {
        self.as_is.warnings.iter().merge(&self.simulated.warnings).dedup().map(String::as_str)
    }

    pub fn project(&self, install_cost: Euros, terms: &ProjectionTerms) -> Result<Projection> {
        Ok(terms
            .inputs(install_cost, self.savings.self_consumption_annual, self.savings.sale_annual)?
            .project())
    }
}

/// Settle the metered data as is, and with the new production and the optional battery.
#[instrument(skip_all, fields(n_intervals = household.consumption.len(), has_battery = battery.is_some()))]
pub fn evaluate(
    household: &Household,
    settlement: &Settlement<'_>,
    production: &Series<KilowattHours>,
    battery: Option<&BatterySpec>,
) -> Result<Evaluation, TariffError> {
    let as_is = settlement.settle(
        household.consumption.iter().map(|(timestamp, energy)| (timestamp, *energy)),
        household
            .injection
            .iter()
            .flat_map(|injection| injection.iter().map(|(timestamp, energy)| (timestamp, *energy))),
    )?;

    let balance = balance::resolve(&household.consumption, production);
    let balance = match battery {
        Some(spec) => battery::simulate(&balance, spec),
        None => balance,
    };
    let excess = balance.map(|_, record| record.excess);
    let injection = match &household.injection {
        Some(existing) => add(&excess, existing),
        None => excess,
    };
    let simulated = settlement.settle(
        balance.iter().map(|(timestamp, record)| (timestamp, record.grid_draw)),
        injection.into_iter(),
    )?;

    let savings = Savings {
        period: as_is.net_balance - simulated.net_balance,
        annual: settlement.annualize(as_is.net_balance - simulated.net_balance),
        self_consumption_annual: settlement.annualize(as_is.purchase - simulated.purchase),
        sale_annual: settlement.annualize(simulated.sale.revenue - as_is.sale.revenue),
    };
    let baseline =
        household.house_total.as_ref().map(|house_total| baseline(house_total, household, &as_is));
    let totals = EnergyTotals::from_records(balance.iter().map(|(_, record)| record));
    info!(
        as_is = %as_is.net_balance,
        simulated = %simulated.net_balance,
        annual_savings = %savings.annual,
        "evaluated",
    );
    Ok(Evaluation { as_is, simulated, totals, savings, baseline, balance })
}

fn baseline(
    house_total: &Series<KilowattHours>,
    household: &Household,
    as_is: &CostBreakdown,
) -> Baseline {
    let self_consumption: KilowattHours = house_total
        .iter()
        .map(|(timestamp, total)| {
            let drawn = household.consumption.get(timestamp).copied().unwrap_or(KilowattHours::ZERO);
            (*total - drawn).non_negative()
        })
        .sum();
    let total: KilowattHours = house_total.iter().map(|(_, energy)| *energy).sum();
    let average_purchase_price = as_is.average_purchase_price();
    Baseline {
        house_total: total,
        self_consumption,
        average_purchase_price,
        savings: average_purchase_price * total - as_is.net_balance,
        self_consumption_value: average_purchase_price * self_consumption,
    }
}

/// Sum up two series by timestamp.
fn add(lhs: &Series<KilowattHours>, rhs: &Series<KilowattHours>) -> Series<KilowattHours> {
    let points = lhs
        .iter()
        .merge_join_by(rhs.iter(), |(lhs, _), (rhs, _)| lhs.cmp(rhs))
        .map(|pair| {
            let (timestamp, lhs, rhs) = match pair {
                EitherOrBoth::Both((timestamp, lhs), (_, rhs)) => (timestamp, *lhs, *rhs),
                EitherOrBoth::Left((timestamp, lhs)) => (timestamp, *lhs, KilowattHours::ZERO),
                EitherOrBoth::Right((timestamp, rhs)) => (timestamp, KilowattHours::ZERO, *rhs),
            };
            (timestamp, lhs + rhs)
        })
        .collect();
    Series::from_ordered(lhs.cadence(), points)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use approx::assert_abs_diff_eq;
    use chrono::{NaiveDate, TimeDelta};

    use super::*;
    use crate::{
        core::{
            period::{Period, TimeOfUse},
            tariff::{LevyRates, constants::Constants, prices::SupplierPolicies, vat::VatRules},
        },
        quantity::{
            money::DailyPrice,
            power::{KiloVoltAmperes, Kilowatts},
        },
    };

    struct Fixture {
        constants: Constants,
        vat: VatRules,
        levies: LevyRates,
        suppliers: SupplierPolicies,
        prices: TariffPrices,
        sale_model: SaleModel,
        market: MarketPrices,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                constants: Constants::builtin().unwrap(),
                vat: VatRules::default(),
                levies: LevyRates::default(),
                suppliers: SupplierPolicies::new(),
                prices: TariffPrices {
                    supplier: None,
                    energy: BTreeMap::from([(Period::Simple, KilowattHourPrice(0.16))]),
                    power: DailyPrice(0.35),
                    access_included_in_energy: true,
                    access_included_in_power: true,
                    financing_included: true,
                },
                sale_model: SaleModel::Fixed { price: KilowattHourPrice(0.05) },
                market: MarketPrices::default(),
            }
        }

        fn settlement(&self, days: u32) -> Settlement<'_> {
            Settlement {
                engine: CostEngine {
                    constants: &self.constants,
                    vat: &self.vat,
                    levies: &self.levies,
                    suppliers: &self.suppliers,
                },
                prices: &self.prices,
                contract: Contract {
                    power: KiloVoltAmperes(6.9),
                    time_of_use: TimeOfUse::Simple,
                    days,
                    social_tariff: false,
                    large_family: false,
                },
                sale_model: &self.sale_model,
                market: &self.market,
            }
        }
    }

    fn at(index: usize) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap().and_hms_opt(0, 0, 0).unwrap()
            + TimeDelta::hours(i64::try_from(index).unwrap())
    }

    fn hourly(values: &[f64]) -> Series<KilowattHours> {
        Series::try_new(
            TimeDelta::hours(1),
            values.iter().enumerate().map(|(index, value)| (at(index), KilowattHours(*value))).collect(),
        )
        .unwrap()
    }

    #[test]
    fn production_reduces_the_balance() -> Result {
        let fixture = Fixture::new();
        let household = Household {
            consumption: hourly(&[1.0, 1.0, 1.0, 1.0]),
            injection: None,
            house_total: None,
        };
        let evaluation =
            evaluate(&household, &fixture.settlement(1), &hourly(&[0.0, 0.5, 2.0, 0.0]), None)?;
        assert_abs_diff_eq!(evaluation.totals.self_consumed, KilowattHours(1.5));
        assert_abs_diff_eq!(evaluation.totals.grid.import, KilowattHours(2.5));
        assert_abs_diff_eq!(evaluation.totals.grid.export, KilowattHours(1.0));
        assert_abs_diff_eq!(evaluation.totals.self_sufficiency, Percentage(37.5));
        assert_abs_diff_eq!(evaluation.simulated.sale.revenue, Euros(0.05), epsilon = 1e-12);
        assert!(evaluation.savings.period > Euros::ZERO);
        assert_abs_diff_eq!(evaluation.savings.annual, evaluation.savings.period * 365.25, epsilon = 1e-9);
        assert!(evaluation.baseline.is_none());
        Ok(())
    }

    #[test]
    fn battery_shifts_the_excess() -> Result {
        let fixture = Fixture::new();
        let household = Household {
            consumption: hourly(&[0.0, 1.0]),
            injection: None,
            house_total: None,
        };
        let spec = BatterySpec::builder()
            .capacity(KilowattHours(5.0))
            .power_limit(Kilowatts(3.0))
            .round_trip_efficiency(Percentage(100.0))
            .depth_of_discharge(Percentage(100.0))
            .build()?;
        let evaluation =
            evaluate(&household, &fixture.settlement(1), &hourly(&[1.0, 0.0]), Some(&spec))?;
        assert_abs_diff_eq!(evaluation.totals.battery.import, KilowattHours(1.0));
        assert_abs_diff_eq!(evaluation.totals.battery.export, KilowattHours(1.0));
        assert_eq!(evaluation.totals.grid.import, KilowattHours::ZERO);
        assert_eq!(evaluation.simulated.sale.injected, KilowattHours::ZERO);
        Ok(())
    }

    #[test]
    fn existing_installation_baseline() -> Result {
        let fixture = Fixture::new();
        let household = Household {
            consumption: hourly(&[1.0, 0.5]),
            injection: Some(hourly(&[0.0, 0.25])),
            house_total: Some(hourly(&[1.0, 1.5])),
        };
        let evaluation =
            evaluate(&household, &fixture.settlement(1), &hourly(&[0.0, 0.0]), None)?;
        let baseline = evaluation.baseline.unwrap();
        assert_abs_diff_eq!(baseline.self_consumption, KilowattHours(1.0));
        assert_abs_diff_eq!(baseline.house_total, KilowattHours(2.5));
        assert_abs_diff_eq!(
            baseline.self_consumption_value,
            baseline.average_purchase_price * KilowattHours(1.0),
        );
        assert_abs_diff_eq!(evaluation.as_is.sale.injected, KilowattHours(0.25));
        assert_abs_diff_eq!(evaluation.simulated.sale.injected, KilowattHours(0.25));
        assert_eq!(evaluation.totals.production, KilowattHours::ZERO);
        Ok(())
    }

    #[test]
    fn existing_injection_is_not_new_production() -> Result {
        let fixture = Fixture::new();
        let household = Household {
            consumption: hourly(&[1.0, 0.5, 0.5]),
            injection: Some(hourly(&[0.0, 0.25, 0.5])),
            house_total: None,
        };
        let spec = BatterySpec::builder()
            .capacity(KilowattHours(5.0))
            .power_limit(Kilowatts(3.0))
            .round_trip_efficiency(Percentage(100.0))
            .depth_of_discharge(Percentage(100.0))
            .build()?;
        for battery in [None, Some(&spec)] {
            let evaluation =
                evaluate(&household, &fixture.settlement(1), &hourly(&[0.0, 0.0, 0.0]), battery)?;
            assert_eq!(evaluation.savings.period, Euros::ZERO);
            assert_eq!(evaluation.savings.annual, Euros::ZERO);
            assert_abs_diff_eq!(evaluation.simulated.sale.injected, KilowattHours(0.75));
            assert_eq!(evaluation.totals.battery.import, KilowattHours::ZERO);
        }
        Ok(())
    }

    #[test]
    fn new_excess_adds_to_the_existing_injection() -> Result {
        let fixture = Fixture::new();
        let household = Household {
            consumption: hourly(&[0.5, 0.5]),
            injection: Some(hourly(&[0.25, 0.0])),
            house_total: None,
        };
        let evaluation =
            evaluate(&household, &fixture.settlement(1), &hourly(&[1.0, 0.0]), None)?;
        assert_abs_diff_eq!(evaluation.simulated.sale.injected, KilowattHours(0.75));
        assert_abs_diff_eq!(evaluation.totals.grid.import, KilowattHours(0.5));
        assert_abs_diff_eq!(evaluation.totals.self_consumed, KilowattHours(0.5));
        Ok(())
    }

    #[test]
    fn warnings_are_deduplicated() -> Result {
        let mut fixture = Fixture::new();
        fixture.prices.supplier = Some("nobody".to_owned());
        let household = Household {
            consumption: hourly(&[1.0, 1.0]),
            injection: None,
            house_total: None,
        };
        let evaluation =
            evaluate(&household, &fixture.settlement(1), &hourly(&[0.5, 0.0]), None)?;
        let warnings: Vec<_> = evaluation.warnings().collect();
        assert_eq!(warnings.len(), evaluation.as_is.warnings.len());
        assert_eq!(warnings.iter().filter(|warning| warning.contains("`nobody`")).count(), 1);
        Ok(())
    }

    #[test]
    fn zero_days_annualize_to_zero() {
        let fixture = Fixture::new();
        assert_eq!(fixture.settlement(0).annualize(Euros(10.0)), Euros::ZERO);
    }
}

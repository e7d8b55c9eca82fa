//! Dimensioning sweep over the installation sizes.

use itertools::iproduct;
use rayon::{ThreadPoolBuilder, prelude::*};
use serde::Serialize;

use crate::{
    core::{
        battery::BatterySpec,
        production::ResolvedProfile,
        projection::{Projection, ProjectionTerms},
        scenario::{EnergyTotals, Household, Savings, Settlement, evaluate},
    },
    prelude::*,
    quantity::{energy::KilowattHours, money::Euros, power::Kilowatts, ratios::Percentage},
};

/// Battery parameters shared by every battery size.
#[derive(Copy, Clone, Debug)]
pub struct BatteryTemplate {
    pub power_limit: Kilowatts,
    pub round_trip_efficiency: Percentage,
    pub depth_of_discharge: Percentage,
}

impl BatteryTemplate {
    /// Build the battery of the capacity, or none for the zero capacity.
    pub fn with_capacity(&self, capacity: KilowattHours) -> Result<Option<BatterySpec>> {
        if capacity <= KilowattHours::ZERO {
            return Ok(None);
        }
        Ok(Some(
            BatterySpec::builder()
                .capacity(capacity)
                .power_limit(self.power_limit)
                .round_trip_efficiency(self.round_trip_efficiency)
                .depth_of_discharge(self.depth_of_discharge)
                .build()?,
        ))
    }
}

/// Installation prices.
#[derive(Copy, Clone, Debug, Serialize)]
pub struct InstallCosts {
    pub per_peak_kilowatt: Euros,
    pub per_battery_kilowatt_hour: Euros,
}

impl InstallCosts {
    pub fn total(&self, peak_power: Kilowatts, battery_capacity: KilowattHours) -> Euros {
        self.per_peak_kilowatt * peak_power.0.max(0.0)
            + self.per_battery_kilowatt_hour * battery_capacity.0.max(0.0)
    }
}

#[derive(Clone, Debug)]
pub struct SweepGrid {
    pub peak_powers: Vec<Kilowatts>,

    /// Zero stands for no battery.
    pub battery_capacities: Vec<KilowattHours>,

    pub battery: BatteryTemplate,
    pub shading: Percentage,
    pub costs: InstallCosts,
    pub terms: ProjectionTerms,
}

#[must_use]
#[derive(Clone, Debug, Serialize)]
pub struct Candidate {
    pub peak_power: Kilowatts,
    pub battery_capacity: KilowattHours,
    pub install_cost: Euros,
    pub totals: EnergyTotals,
    pub savings: Savings,
    pub projection: Projection,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Evaluate every combination in parallel and rank them by the payback.
///
/// The profile is resolved once by the caller and only scaled here.
#[instrument(
    skip_all,
    fields(n_peak_powers = grid.peak_powers.len(), n_batteries = grid.battery_capacities.len(), threads),
)]
pub fn sweep(
    household: &Household,
    settlement: &Settlement<'_>,
    profile: &ResolvedProfile,
    grid: &SweepGrid,
    threads: usize,
) -> Result<Vec<Candidate>> {
    let combinations: Vec<(Kilowatts, KilowattHours)> =
        iproduct!(grid.peak_powers.iter().copied(), grid.battery_capacities.iter().copied()).collect();
    let pool = ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .context("failed to build the thread pool")?;
    let mut candidates = pool.install(|| {
        combinations
            .par_iter()
            .map(|(peak_power, battery_capacity)| {
                evaluate_candidate(household, settlement, profile, grid, *peak_power, *battery_capacity)
            })
            .collect::<Result<Vec<_>>>()
    })?;
    candidates.sort_by(|lhs, rhs| {
        lhs.projection
            .payback
            .sort_key()
            .cmp(&rhs.projection.payback.sort_key())
            .then_with(|| rhs.savings.annual.cmp(&lhs.savings.annual))
    });
    info!(n_candidates = candidates.len(), "swept");
    Ok(candidates)
}

fn evaluate_candidate(
    household: &Household,
    settlement: &Settlement<'_>,
    profile: &ResolvedProfile,
    grid: &SweepGrid,
    peak_power: Kilowatts,
    battery_capacity: KilowattHours,
) -> Result<Candidate> {
    let production = profile.production(peak_power, grid.shading, &household.consumption).series;
    let battery = grid.battery.with_capacity(battery_capacity)?;
    let evaluation = evaluate(household, settlement, &production, battery.as_ref())
        .with_context(|| format!("failed to evaluate {peak_power} with a {battery_capacity} battery"))?;
    let install_cost = grid.costs.total(peak_power, battery_capacity);
    let projection = evaluation.project(install_cost, &grid.terms)?;
    Ok(Candidate {
        peak_power,
        battery_capacity,
        install_cost,
        totals: evaluation.totals,
        savings: evaluation.savings,
        projection,
        warnings: evaluation.warnings().map(ToOwned::to_owned).collect(),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::{NaiveDate, TimeDelta};

    use super::*;
    use crate::{
        core::{
            period::{Period, TimeOfUse},
            production::{HourlyYields, Profile, ProfileSource},
            series::Series,
            tariff::{
                CostEngine,
                LevyRates,
                constants::Constants,
                contract::Contract,
                prices::{SupplierPolicies, TariffPrices},
                sale::{MarketPrices, SaleModel},
                vat::VatRules,
            },
        },
        quantity::{
            money::{DailyPrice, KilowattHourPrice},
            power::KiloVoltAmperes,
        },
    };

    #[test]
    fn ranks_by_payback() -> Result {
        let start = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let consumption = Series::try_new(
            TimeDelta::hours(1),
            (0..24 * 7).map(|hour| (start + TimeDelta::hours(hour), KilowattHours(0.5))).collect(),
        )?;
        let household = Household { consumption, injection: None, house_total: None };

        let mut yields = HourlyYields::default();
        for day in 1..=30 {
            for hour in 9..17 {
                yields.add((6, day), hour, 0.6);
            }
        }
        let profile = ResolvedProfile {
            source: ProfileSource::Service,
            warning: None,
            profile: Profile::from_hourly(&yields, TimeDelta::hours(1)),
        };

        let constants = Constants::builtin()?;
        let prices = TariffPrices {
            supplier: None,
            energy: BTreeMap::from([(Period::Simple, KilowattHourPrice(0.16))]),
            power: DailyPrice(0.35),
            access_included_in_energy: true,
            access_included_in_power: true,
            financing_included: true,
        };
        let settlement = Settlement {
            engine: CostEngine {
                constants: &constants,
                vat: &VatRules::default(),
                levies: &LevyRates::default(),
                suppliers: &SupplierPolicies::new(),
            },
            prices: &prices,
            contract: Contract {
                power: KiloVoltAmperes(6.9),
                time_of_use: TimeOfUse::Simple,
                days: 7,
                social_tariff: false,
                large_family: false,
            },
            sale_model: &SaleModel::Disabled,
            market: &MarketPrices::default(),
        };
        let grid = SweepGrid {
            peak_powers: vec![Kilowatts(1.0), Kilowatts(2.0), Kilowatts(6.0)],
            battery_capacities: vec![KilowattHours::ZERO, KilowattHours(5.0)],
            battery: BatteryTemplate {
                power_limit: Kilowatts(2.5),
                round_trip_efficiency: Percentage(90.0),
                depth_of_discharge: Percentage(90.0),
            },
            shading: Percentage::ZERO,
            costs: InstallCosts {
                per_peak_kilowatt: Euros(1000.0),
                per_battery_kilowatt_hour: Euros(500.0),
            },
            terms: ProjectionTerms {
                years: 25,
                degradation: Percentage(0.5),
                inflation: Percentage(2.0),
                sale_price_drift: Percentage::ZERO,
            },
        };

        let candidates = sweep(&household, &settlement, &profile, &grid, 2)?;
        assert_eq!(candidates.len(), 6);
        assert!(candidates.windows(2).all(|pair| {
            pair[0].projection.payback.sort_key() <= pair[1].projection.payback.sort_key()
        }));
        let smallest = candidates
            .iter()
            .find(|candidate| {
                candidate.peak_power == Kilowatts(1.0) && candidate.battery_capacity == KilowattHours::ZERO
            })
            .unwrap();
        assert_eq!(smallest.install_cost, Euros(1000.0));
        assert!(smallest.savings.annual > Euros::ZERO);
        assert!(smallest.warnings.is_empty());
        Ok(())
    }
}

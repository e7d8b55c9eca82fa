use itertools::{EitherOrBoth, Itertools};

use crate::{
    core::{record::IntervalRecord, series::Series},
    prelude::*,
    quantity::energy::KilowattHours,
};

/// Split the production against the consumption of the same interval.
pub fn split(consumption: KilowattHours, production: KilowattHours) -> IntervalRecord {
    let consumption = consumption.non_negative();
    let production = production.non_negative();
    IntervalRecord {
        consumption,
        production,
        self_consumed: consumption.min(production),
        excess: (production - consumption).non_negative(),
        grid_draw: (consumption - production).non_negative(),
        battery: None,
    }
}

/// Resolve the energy balance of every interval.
///
/// Series are aligned by timestamp, and a missing side counts as zero. The result covers the union
/// of both timestamp sets, so it may have gaps when the inputs cover different windows.
#[instrument(skip_all, fields(n_consumption = consumption.len(), n_production = production.len()))]
pub fn resolve(
    consumption: &Series<KilowattHours>,
    production: &Series<KilowattHours>,
) -> Series<IntervalRecord> {
    let points = consumption
        .iter()
        .merge_join_by(production.iter(), |(lhs, _), (rhs, _)| lhs.cmp(rhs))
        .map(|pair| match pair {
            EitherOrBoth::Both((timestamp, consumption), (_, production)) => {
                (timestamp, split(*consumption, *production))
            }
            EitherOrBoth::Left((timestamp, consumption)) => {
                (timestamp, split(*consumption, KilowattHours::ZERO))
            }
            EitherOrBoth::Right((timestamp, production)) => {
                (timestamp, split(KilowattHours::ZERO, *production))
            }
        })
        .collect();
    Series::from_ordered(consumption.cadence(), points)
}

use chrono::{Datelike, NaiveDate, NaiveDateTime, TimeDelta, Timelike};
use serde::{Deserialize, Serialize};
use serde_with::{DurationSeconds, serde_as};

use crate::core::production::{
    HourlyYields,
    upsample::{distribute_day, smooth},
};

/// Leap year, so that every calendar day has its yield.
pub const REFERENCE_YEAR: i32 = 2020;

const SMOOTHING_WINDOW: usize = 3;

/// Sub-hourly production per installed kilowatt-peak, as monthly totals and their shares.
#[serde_as]
#[must_use]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde_as(as = "DurationSeconds<i64>")]
    cadence: TimeDelta,

    /// January first.
    months: Vec<MonthProfile>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MonthProfile {
    /// Monthly energy per kilowatt-peak, kWh.
    pub total: f64,

    /// Share of the monthly total, per day of the month and per interval of the day.
    pub shares: Vec<Vec<f64>>,
}

impl Profile {
    /// Upsample the hourly yields to the cadence, which must divide an hour.
    pub fn from_hourly(yields: &HourlyYields, cadence: TimeDelta) -> Self {
        let slots_per_hour =
            usize::try_from(3600 / cadence.num_seconds().max(1)).unwrap_or(1).max(1);
        let months = (1..=12)
            .map(|month| {
                let days: Vec<Vec<f64>> = (1..=days_in_month(month))
                    .map(|day| {
                        let hourly = yields.0.get(&(month, day)).copied().unwrap_or([0.0; 24]);
                        let distributed = distribute_day(&hourly, slots_per_hour);
                        if slots_per_hour > 1 { smooth(&distributed, SMOOTHING_WINDOW) } else { distributed }
                    })
                    .collect();
                let total: f64 = days.iter().flatten().sum();
                let shares = days
                    .into_iter()
                    .map(|slots| {
                        slots
                            .into_iter()
                            .map(|energy| if total > 0.0 { energy / total } else { 0.0 })
                            .collect()
                    })
                    .collect();
                MonthProfile { total, shares }
            })
            .collect();
        Self { cadence, months }
    }

    pub const fn cadence(&self) -> TimeDelta {
        self.cadence
    }

    /// Energy per kilowatt-peak in the interval starting at the timestamp.
    pub fn energy_at(&self, timestamp: NaiveDateTime) -> f64 {
        let Some(month) = self.months.get(timestamp.month0() as usize) else {
            return 0.0;
        };
        let second_of_day = i64::from(timestamp.num_seconds_from_midnight());
        let Ok(slot) = usize::try_from(second_of_day / self.cadence.num_seconds().max(1)) else {
            return 0.0;
        };
        month
            .shares
            .get(timestamp.day0() as usize)
            .and_then(|day| day.get(slot))
            .map_or(0.0, |share| share * month.total)
    }

    /// Monthly energy per kilowatt-peak, January first.
    pub fn monthly_totals(&self) -> impl Iterator<Item = (u32, f64)> {
        (1..).zip(self.months.iter().map(|month| month.total))
    }

    /// Sum of the shares per month, which is 1 for every producing month.
    #[cfg(test)]
    pub fn share_sums(&self) -> impl Iterator<Item = f64> {
        self.months.iter().map(|month| month.shares.iter().flatten().sum())
    }

    /// Average energy per kilowatt-peak by the time of day within the month.
    pub fn average_day(&self, month: u32) -> Vec<f64> {
        let Some(profile) = month.checked_sub(1).and_then(|index| self.months.get(index as usize)) else {
            return Vec::new();
        };
        let n_slots = profile.shares.first().map_or(0, Vec::len);
        #[allow(clippy::cast_precision_loss)]
        let n_days = profile.shares.len().max(1) as f64;
        (0..n_slots)
            .map(|slot| {
                profile.shares.iter().filter_map(|day| day.get(slot)).sum::<f64>() * profile.total
                    / n_days
            })
            .collect()
    }
}

pub fn days_in_month(month: u32) -> u32 {
    let first = NaiveDate::from_ymd_opt(REFERENCE_YEAR, month, 1);
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(REFERENCE_YEAR + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(REFERENCE_YEAR, month + 1, 1)
    };
    match (first, next) {
        (Some(first), Some(next)) => u32::try_from((next - first).num_days()).unwrap_or(0),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    fn yields() -> HourlyYields {
        let mut yields = HourlyYields::default();
        for month in 1..=12 {
            for day in 1..=days_in_month(month) {
                for hour in 8..18 {
                    yields.add((month, day), hour, 0.05 + 0.001 * f64::from(month) * f64::from(day % 5));
                }
            }
        }
        yields
    }

    #[test]
    fn reference_calendar() {
        assert_eq!(days_in_month(2), 29);
        assert_eq!(days_in_month(12), 31);
        assert_eq!((1..=12).map(days_in_month).sum::<u32>(), 366);
    }

    #[test]
    fn monthly_energy_is_conserved() {
        let yields = yields();
        let profile = Profile::from_hourly(&yields, TimeDelta::minutes(15));
        for ((month, total), share_sum) in profile.monthly_totals().zip(profile.share_sums()) {
            let expected: f64 = yields
                .0
                .iter()
                .filter(|((yield_month, _), _)| *yield_month == month)
                .flat_map(|(_, hours)| hours)
                .sum();
            assert_abs_diff_eq!(total, expected, epsilon = 1e-9);
            assert_abs_diff_eq!(share_sum, 1.0, epsilon = 1e-9);
        }
        assert_abs_diff_eq!(
            profile.monthly_totals().map(|(_, total)| total).sum::<f64>(),
            yields.total(),
            epsilon = 1e-9,
        );
    }

    #[test]
    fn interval_lookup() {
        let profile = Profile::from_hourly(&yields(), TimeDelta::minutes(15));
        let night = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap().and_hms_opt(2, 0, 0).unwrap();
        let noon = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap().and_hms_opt(12, 15, 0).unwrap();
        assert_eq!(profile.energy_at(night), 0.0);
        assert!(profile.energy_at(noon) > 0.0);

        // A quarter-hour carries roughly a quarter of the hourly energy:
        assert_abs_diff_eq!(profile.energy_at(noon), (0.05 + 0.006) / 4.0, epsilon = 1e-3);
    }

    #[test]
    fn empty_month_has_zero_shares() {
        let profile = Profile::from_hourly(&HourlyYields::default(), TimeDelta::hours(1));
        assert!(profile.share_sums().all(|sum| sum == 0.0));
        assert_eq!(profile.average_day(1).len(), 24);
    }
}

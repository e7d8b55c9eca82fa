//! Time-of-use options and the regulated period calendars.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Timelike, Weekday};
use enumset::{EnumSet, EnumSetType, enum_set};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::quantity::energy::KilowattHours;

/// Time-of-use option of the supply contract.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum TimeOfUse {
    /// Single price all day long.
    Simple,

    /// Off-peak and non-off-peak on the daily cycle.
    BiDaily,

    /// Off-peak and non-off-peak on the weekly cycle.
    BiWeekly,

    /// Off-peak, shoulder, and peak on the daily cycle.
    TriDaily,

    /// Off-peak, shoulder, and peak on the weekly cycle.
    TriWeekly,
}

#[derive(Debug, Hash, PartialOrd, Ord, Serialize, Deserialize, EnumSetType)]
#[serde(rename_all = "kebab-case")]
pub enum Period {
    Simple,
    OffPeak,
    NonOffPeak,
    Shoulder,
    Peak,
}

impl Period {
    pub const fn code(self) -> &'static str {
        match self {
            Self::Simple => "S",
            Self::OffPeak => "V",
            Self::NonOffPeak => "F",
            Self::Shoulder => "C",
            Self::Peak => "P",
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::OffPeak => "off-peak",
            Self::NonOffPeak => "non-off-peak",
            Self::Shoulder => "shoulder",
            Self::Peak => "peak",
        }
    }
}

impl std::str::FromStr for Period {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EnumSet::<Self>::all()
            .iter()
            .find(|period| period.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("unknown period: `{s}`"))
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TimeOfUse {
    /// Periods which the option bills separately.
    pub const fn periods(self) -> EnumSet<Period> {
        match self {
            Self::Simple => enum_set!(Period::Simple),
            Self::BiDaily | Self::BiWeekly => enum_set!(Period::OffPeak | Period::NonOffPeak),
            Self::TriDaily | Self::TriWeekly => {
                enum_set!(Period::OffPeak | Period::Shoulder | Period::Peak)
            }
        }
    }

    /// Classify the interval starting at the timestamp.
    pub fn classify(self, timestamp: NaiveDateTime) -> Period {
        match self {
            Self::Simple => Period::Simple,
            Self::BiDaily => merge_bi(daily_cycle(timestamp)),
            Self::BiWeekly => merge_bi(weekly_cycle(timestamp)),
            Self::TriDaily => daily_cycle(timestamp),
            Self::TriWeekly => weekly_cycle(timestamp),
        }
    }

    /// Sum the energy per billed period.
    pub fn group<I>(self, energy: I) -> BTreeMap<Period, KilowattHours>
    where
        I: IntoIterator<Item = (NaiveDateTime, KilowattHours)>,
    {
        energy
            .into_iter()
            .map(|(timestamp, energy)| (self.classify(timestamp), energy))
            .into_grouping_map()
            .sum()
            .into_iter()
            .collect()
    }
}

const fn merge_bi(period: Period) -> Period {
    match period {
        Period::Shoulder | Period::Peak => Period::NonOffPeak,
        other => other,
    }
}

const fn minutes(hour: u32, minute: u32) -> u32 {
    hour * 60 + minute
}

fn within(minute_of_day: u32, ranges: &[(u32, u32)]) -> bool {
    ranges.iter().any(|(start, end)| (*start..*end).contains(&minute_of_day))
}

fn minute_of_day(timestamp: NaiveDateTime) -> u32 {
    timestamp.hour() * 60 + timestamp.minute()
}

fn daily_cycle(timestamp: NaiveDateTime) -> Period {
    let minute = minute_of_day(timestamp);
    if minute >= minutes(22, 0) || minute < minutes(8, 0) {
        return Period::OffPeak;
    }
    let peak: &[(u32, u32)] = if is_summer_time(timestamp) {
        &[(minutes(10, 30), minutes(13, 0)), (minutes(19, 30), minutes(21, 0))]
    } else {
        &[(minutes(9, 0), minutes(10, 30)), (minutes(18, 0), minutes(20, 30))]
    };
    if within(minute, peak) { Period::Peak } else { Period::Shoulder }
}

fn weekly_cycle(timestamp: NaiveDateTime) -> Period {
    let minute = minute_of_day(timestamp);
    let is_summer = is_summer_time(timestamp);
    match timestamp.weekday() {
        Weekday::Sun => Period::OffPeak,
        Weekday::Sat => {
            let shoulder: &[(u32, u32)] = if is_summer {
                &[(minutes(9, 0), minutes(14, 0)), (minutes(20, 0), minutes(22, 0))]
            } else {
                &[(minutes(9, 30), minutes(13, 0)), (minutes(18, 30), minutes(22, 0))]
            };
            if within(minute, shoulder) { Period::Shoulder } else { Period::OffPeak }
        }
        _ => {
            if minute < minutes(7, 0) {
                return Period::OffPeak;
            }
            let peak: &[(u32, u32)] = if is_summer {
                &[(minutes(9, 15), minutes(12, 15))]
            } else {
                &[(minutes(9, 30), minutes(12, 0)), (minutes(18, 30), minutes(21, 0))]
            };
            if within(minute, peak) { Period::Peak } else { Period::Shoulder }
        }
    }
}

/// Legal summer time, from the last Sunday of March to the last Sunday of October.
pub fn is_summer_time(timestamp: NaiveDateTime) -> bool {
    let year = timestamp.year();
    let (Some(start), Some(end)) = (last_sunday(year, 3), last_sunday(year, 10)) else {
        return false;
    };
    let start = start.and_time(NaiveTime::MIN) + TimeDelta::hours(1);
    let end = end.and_time(NaiveTime::MIN) + TimeDelta::hours(2);
    (start..end).contains(&timestamp)
}

fn last_sunday(year: i32, month: u32) -> Option<NaiveDate> {
    let last_day = NaiveDate::from_ymd_opt(year, month + 1, 1)?.pred_opt()?;
    last_day.checked_sub_days(chrono::Days::new(u64::from(
        last_day.weekday().num_days_from_sunday(),
    )))
}

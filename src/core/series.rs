use chrono::{NaiveDateTime, TimeDelta};
use serde::Serialize;
use serde_with::{DurationSeconds, serde_as};

/// Input validation failures of a time series.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum SeriesError {
    #[error("the series is empty")]
    Empty,

    #[error("the cadence must be a positive divisor of one hour, got {0} seconds")]
    InvalidCadence(i64),

    #[error("timestamps go backwards: {next} follows {previous}")]
    NonMonotonic { previous: NaiveDateTime, next: NaiveDateTime },

    #[error("duplicate timestamp: {timestamp}")]
    Duplicate { timestamp: NaiveDateTime },

    #[error("missing intervals between {after} and {before}")]
    Gap { after: NaiveDateTime, before: NaiveDateTime },

    #[error("{timestamp} is not aligned to the series cadence")]
    Misaligned { timestamp: NaiveDateTime },

    #[error("negative {column} at {timestamp}")]
    Negative { timestamp: NaiveDateTime, column: &'static str },

    #[error("{column} at {timestamp} is not a finite number")]
    NonFinite { timestamp: NaiveDateTime, column: &'static str },
}

/// Ordered sequence of values at a fixed cadence, uniquely keyed by the interval start.
#[serde_as]
#[must_use]
#[derive(Clone, Debug, Serialize)]
pub struct Series<V> {
    #[serde_as(as = "DurationSeconds<i64>")]
    cadence: TimeDelta,

    points: Vec<(NaiveDateTime, V)>,
}

impl<V> Series<V> {
    /// Validate the points into a gap-free series.
    pub fn try_new(cadence: TimeDelta, points: Vec<(NaiveDateTime, V)>) -> Result<Self, SeriesError> {
        validate_cadence(cadence)?;
        let Some((first, _)) = points.first() else {
            return Err(SeriesError::Empty);
        };
        if first.and_utc().timestamp() % cadence.num_seconds() != 0 {
            return Err(SeriesError::Misaligned { timestamp: *first });
        }
        for window in points.windows(2) {
            let (previous, next) = (window[0].0, window[1].0);
            match (next - previous).cmp(&cadence) {
                std::cmp::Ordering::Equal => {}
                _ if next == previous => return Err(SeriesError::Duplicate { timestamp: next }),
                _ if next < previous => return Err(SeriesError::NonMonotonic { previous, next }),
                std::cmp::Ordering::Greater => {
                    return Err(SeriesError::Gap { after: previous, before: next });
                }
                std::cmp::Ordering::Less => return Err(SeriesError::Misaligned { timestamp: next }),
            }
        }
        Ok(Self { cadence, points })
    }

    /// Build the series from points which are already known to be strictly ordered.
    ///
    /// Only the ordering is guaranteed. A timestamp union of two validated series which cover
    /// different windows may leave gaps, so consumers must look values up by timestamp
    /// rather than by position.
    pub(crate) fn from_ordered(cadence: TimeDelta, points: Vec<(NaiveDateTime, V)>) -> Self {
        debug_assert!(points.is_sorted_by(|(lhs, _), (rhs, _)| lhs < rhs));
        Self { cadence, points }
    }

    pub const fn cadence(&self) -> TimeDelta {
        self.cadence
    }

    pub const fn len(&self) -> usize {
        self.points.len()
    }

    pub const fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDateTime, &V)> {
        self.points.iter().map(|(timestamp, value)| (*timestamp, value))
    }

    pub fn timestamps(&self) -> impl Iterator<Item = NaiveDateTime> {
        self.points.iter().map(|(timestamp, _)| *timestamp)
    }

    /// Look up the value at the exact interval start.
    pub fn get(&self, timestamp: NaiveDateTime) -> Option<&V> {
        self.points
            .binary_search_by_key(&timestamp, |(timestamp, _)| *timestamp)
            .ok()
            .map(|index| &self.points[index].1)
    }

    /// Number of calendar days touched by the series.
    pub fn n_days(&self) -> u32 {
        match (self.points.first(), self.points.last()) {
            (Some((first, _)), Some((last, _))) => {
                u32::try_from((last.date() - first.date()).num_days() + 1).unwrap_or(u32::MAX)
            }
            _ => 0,
        }
    }

    /// Derive a new series with the same timestamps.
    pub fn map<U>(&self, mut f: impl FnMut(NaiveDateTime, &V) -> U) -> Series<U> {
        Series {
            cadence: self.cadence,
            points: self.points.iter().map(|(timestamp, value)| (*timestamp, f(*timestamp, value))).collect(),
        }
    }
}

impl<V> IntoIterator for Series<V> {
    type Item = (NaiveDateTime, V);
    type IntoIter = std::vec::IntoIter<(NaiveDateTime, V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.into_iter()
    }
}

pub fn validate_cadence(cadence: TimeDelta) -> Result<(), SeriesError> {
    let seconds = cadence.num_seconds();
    if seconds <= 0 || 3600 % seconds != 0 || cadence.subsec_nanos() != 0 {
        Err(SeriesError::InvalidCadence(seconds))
    } else {
        Ok(())
    }
}

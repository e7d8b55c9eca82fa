use std::io;

use chrono::{NaiveDateTime, TimeDelta};
use serde::Deserialize;

use crate::{
    core::{
        scenario::Household,
        series::{Series, SeriesError, validate_cadence},
    },
    input::parse_timestamp,
    prelude::*,
    quantity::{energy::KilowattHours, power::Kilowatts},
};

#[derive(Copy, Clone, Debug)]
pub struct ReadOptions {
    /// Timestamps mark the interval end, as the utility meters do.
    pub timestamps_mark_end: bool,

    /// Values are average kilowatts over the interval instead of kilowatt-hours.
    pub power_readings: bool,

    /// Interval length, inferred from the first two rows when not set.
    pub cadence: Option<TimeDelta>,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self { timestamps_mark_end: true, power_readings: false, cadence: None }
    }
}

#[derive(Deserialize)]
struct Row {
    timestamp: String,
    consumption: f64,

    #[serde(default)]
    house_total: Option<f64>,

    #[serde(default)]
    injection: Option<f64>,

    #[serde(default)]
    existing_production: Option<f64>,
}

struct Parsed {
    timestamp: NaiveDateTime,
    consumption: f64,
    house_total: Option<f64>,
    injection: Option<f64>,
    existing_production: Option<f64>,
}

/// Read and validate the household meter export.
///
/// Without the `house_total` column, it is derived from the existing production when the latter is present.
#[instrument(skip_all)]
pub fn read_household<R: io::Read>(reader: R, options: ReadOptions) -> Result<Household> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut rows = Vec::new();
    for (index, row) in reader.deserialize::<Row>().enumerate() {
        let row = row.with_context(|| format!("failed to read row #{}", index + 1))?;
        rows.push(Parsed {
            timestamp: parse_timestamp(&row.timestamp)?,
            consumption: row.consumption,
            house_total: row.house_total,
            injection: row.injection,
            existing_production: row.existing_production,
        });
    }

    let cadence = match options.cadence {
        Some(cadence) => cadence,
        None => match rows.as_slice() {
            [first, second, ..] => second.timestamp - first.timestamp,
            [] => return Err(SeriesError::Empty.into()),
            [_] => bail!("cannot infer the cadence from a single row"),
        },
    };
    validate_cadence(cadence)?;
    let shift = if options.timestamps_mark_end { cadence } else { TimeDelta::zero() };
    let to_energy = |value: f64| {
        if options.power_readings { Kilowatts(value) * cadence } else { KilowattHours(value) }
    };

    let column = |name: &'static str,
                  value: fn(&Parsed) -> Option<f64>|
     -> Result<Option<Series<KilowattHours>>, SeriesError> {
        if rows.iter().all(|row| value(row).is_none()) {
            return Ok(None);
        }
        let points = rows
            .iter()
            .map(|row| {
                let timestamp = row.timestamp - shift;
                let raw = value(row).unwrap_or_default();
                if !raw.is_finite() {
                    return Err(SeriesError::NonFinite { timestamp, column: name });
                }
                let energy = to_energy(raw);
                if energy < KilowattHours::ZERO {
                    Err(SeriesError::Negative { timestamp, column: name })
                } else {
                    Ok((timestamp, energy))
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        Series::try_new(cadence, points).map(Some)
    };

    let consumption = column("consumption", |row| Some(row.consumption))?
        .ok_or(SeriesError::Empty)?;
    let injection = column("injection", |row| row.injection)?;
    let existing_production = column("existing_production", |row| row.existing_production)?;
    let house_total = match column("house_total", |row| row.house_total)? {
        Some(house_total) => Some(house_total),
        None => existing_production.map(|production| {
            production.map(|timestamp, production| {
                let drawn = consumption.get(timestamp).copied().unwrap_or_default();
                let injected = injection
                    .as_ref()
                    .and_then(|injection| injection.get(timestamp).copied())
                    .unwrap_or_default();
                drawn + (*production - injected).non_negative()
            })
        }),
    };

    info!(
        n_intervals = consumption.len(),
        cadence_minutes = cadence.num_minutes(),
        has_injection = injection.is_some(),
        has_house_total = house_total.is_some(),
        "read the household data",
    );
    Ok(Household { consumption, injection, house_total })
}

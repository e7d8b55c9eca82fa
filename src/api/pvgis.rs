use std::time::Duration;

use chrono::{Datelike, NaiveDateTime, TimeDelta, Timelike};
use serde::Deserialize;
use ureq::Agent;

use crate::{
    core::{
        period::is_summer_time,
        production::{Geometry, HourlyYields, YieldSource},
    },
    prelude::*,
};

/// Leap year, so that every calendar day gets its yields.
const REFERENCE_YEAR: &str = "2020";

/// PVGIS hourly radiation and PV output service.
pub struct Api {
    client: Agent,
    url: String,

    /// Local standard time offset from UTC, before the summer time.
    standard_offset: TimeDelta,
}

impl Api {
    pub const URL: &str = "https://re.jrc.ec.europa.eu/api/v5_2/seriescalc";

    pub fn new(url: impl Into<String>, standard_offset_hours: i64) -> Self {
        let client =
            Agent::config_builder().timeout_global(Some(Duration::from_secs(10))).build().into();
        Self { client, url: url.into(), standard_offset: TimeDelta::hours(standard_offset_hours) }
    }

    #[instrument(
        skip_all,
        fields(latitude = geometry.latitude, longitude = geometry.longitude, tilt = geometry.tilt, azimuth = geometry.azimuth),
    )]
    fn get_hourly(&self, geometry: &Geometry) -> Result<Response> {
        info!("fetching…");
        self.client
            .get(&self.url)
            .query("lat", geometry.latitude.to_string())
            .query("lon", geometry.longitude.to_string())
            .query("peakpower", "1")
            .query("loss", geometry.system_loss.0.to_string())
            .query("angle", geometry.tilt.to_string())
            .query("aspect", geometry.azimuth.to_string())
            .query("mountingplace", geometry.mounting.as_str())
            .query("pvcalculation", "1")
            .query("startyear", REFERENCE_YEAR)
            .query("endyear", REFERENCE_YEAR)
            .query("outputformat", "json")
            .call()
            .context("the production service request failed")?
            .body_mut()
            .read_json::<Response>()
            .context("failed to read the production service response")
    }

    /// Shift the UTC hours to the local wall clock and sum the yields per local hour.
    fn to_local(&self, response: Response) -> Result<HourlyYields> {
        let mut yields = HourlyYields::default();
        for record in response.outputs.hourly {
            let utc = NaiveDateTime::parse_from_str(&record.time, "%Y%m%d:%H%M")
                .with_context(|| format!("invalid time: `{}`", record.time))?;
            let utc = utc.with_minute(0).unwrap_or(utc);
            let standard = utc + self.standard_offset;
            // The summer time ends at 01:00 standard, one hour before the wall-clock boundary:
            let is_summer = is_summer_time(standard) && is_summer_time(standard + TimeDelta::hours(1));
            let local = if is_summer { standard + TimeDelta::hours(1) } else { standard };
            // Watts at 1 kWp over one hour:
            yields.add((local.month(), local.day()), local.hour() as usize, record.power.max(0.0) / 1000.0);
        }
        ensure!(!yields.0.is_empty(), "the production service returned no hours");
        Ok(yields)
    }
}

impl YieldSource for Api {
    fn hourly_yields(&self, geometry: &Geometry) -> Result<HourlyYields> {
        let yields = self.to_local(self.get_hourly(geometry)?)?;
        info!(n_days = yields.0.len(), total = yields.total(), "fetched the hourly yields");
        Ok(yields)
    }
}

#[derive(Deserialize)]
struct Response {
    outputs: Outputs,
}

#[derive(Deserialize)]
struct Outputs {
    hourly: Vec<HourlyRecord>,
}

#[derive(Deserialize)]
struct HourlyRecord {
    time: String,

    /// PV output, watts.
    #[serde(rename = "P")]
    power: f64,
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::{core::production::Mounting, quantity::ratios::Percentage};

    #[test]
    fn parse_and_shift_to_local_time() -> Result {
        // language=json
        let response: Response = serde_json::from_str(
            r#"{
                "inputs": {"location": {"latitude": 38.7, "longitude": -9.1}},
                "outputs": {
                    "hourly": [
                        {"time": "20200115:1210", "P": 450.0, "G(i)": 600.0},
                        {"time": "20200715:1210", "P": 800.0, "G(i)": 900.0},
                        {"time": "20201025:0010", "P": 0.0, "G(i)": 0.0},
                        {"time": "20201231:2310", "P": -1.5, "G(i)": 0.0}
                    ]
                }
            }"#,
        )?;
        let yields = Api::new(Api::URL, 0).to_local(response)?;
        assert_abs_diff_eq!(yields.0[&(1, 15)][12], 0.45);
        assert_abs_diff_eq!(yields.0[&(7, 15)][13], 0.8);
        assert_abs_diff_eq!(yields.0[&(7, 15)][12], 0.0);
        assert_abs_diff_eq!(yields.0[&(12, 31)][23], 0.0);
        Ok(())
    }

    #[test]
    fn overlapping_local_hours_are_summed() -> Result {
        // 2020-10-25 01:00 and 02:00 UTC both land on 01:00 local at the fall-back.
        let response: Response = serde_json::from_str(
            r#"{"outputs": {"hourly": [
                {"time": "20201025:0010", "P": 100.0},
                {"time": "20201025:0110", "P": 200.0}
            ]}}"#,
        )?;
        let yields = Api::new(Api::URL, 0).to_local(response)?;
        assert_abs_diff_eq!(yields.0[&(10, 25)][1], 0.3);
        Ok(())
    }

    #[test]
    fn empty_response_is_an_error() -> Result {
        let response: Response = serde_json::from_str(r#"{"outputs": {"hourly": []}}"#)?;
        assert!(Api::new(Api::URL, 0).to_local(response).is_err());
        Ok(())
    }

    #[test]
    #[ignore = "makes the API request"]
    fn test_hourly_yields_ok() -> Result {
        let geometry = Geometry {
            latitude: 38.72,
            longitude: -9.14,
            tilt: 35.0,
            azimuth: 0.0,
            system_loss: Percentage(14.0),
            mounting: Mounting::FreeStanding,
            region: "Lisboa".to_owned(),
        };
        let yields = Api::new(Api::URL, 0).hourly_yields(&geometry)?;
        assert_eq!(yields.0.len(), 366);
        assert!(yields.total() > 1000.0);
        Ok(())
    }
}

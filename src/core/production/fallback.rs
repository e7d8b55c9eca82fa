//! Static regional yield tables.

use itertools::Itertools;
use serde::Deserialize;

use crate::{
    core::production::{Geometry, HourlyYields, profile::days_in_month},
    prelude::*,
};

const BUILTIN: &str = include_str!("../../../data/fallback.toml");

/// Optimal tilt the regional tables are computed for, degrees.
const OPTIMAL_TILT: f64 = 35.0;

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTables {
    default_region: String,
    regions: Vec<RegionTable>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegionTable {
    pub name: String,

    /// Average daily yield per kilowatt-peak for each month, kWh.
    pub daily_yields: [f64; 12],

    /// Share of the daily yield in each hour, for each month.
    pub hourly_shares: [[f64; 24]; 12],
}

#[derive(Clone, Debug)]
pub struct FallbackTables {
    default: RegionTable,
    regions: Vec<RegionTable>,
}

impl FallbackTables {
    pub fn builtin() -> Result<Self> {
        Self::parse(BUILTIN).context("failed to parse the built-in fallback tables")
    }

    fn parse(contents: &str) -> Result<Self> {
        let raw: RawTables = toml::from_str(contents)?;
        for region in &raw.regions {
            ensure!(
                region.daily_yields.iter().all(|value| value.is_finite() && *value >= 0.0),
                "invalid daily yields of `{}`",
                region.name,
            );
            ensure!(
                region.hourly_shares.iter().flatten().all(|value| value.is_finite() && *value >= 0.0),
                "invalid hourly shares of `{}`",
                region.name,
            );
        }
        let Some(default) = raw.regions.iter().find(|region| region.name == raw.default_region).cloned()
        else {
            bail!("the default region `{}` is missing", raw.default_region);
        };
        Ok(Self { default, regions: raw.regions })
    }

    pub fn region_names(&self) -> impl Iterator<Item = &str> {
        self.regions.iter().map(|region| region.name.as_str())
    }

    /// Pick the region table, falling back to the default region.
    pub fn region(&self, name: &str) -> (&RegionTable, Option<String>) {
        self.regions.iter().find(|region| region.name == name).map_or_else(
            || {
                warn!(
                    name,
                    default = %self.default.name,
                    known = %self.region_names().join(", "),
                    "unknown region, using the default one",
                );
                (
                    &self.default,
                    Some(format!("unknown region `{name}`, used `{}` instead", self.default.name)),
                )
            },
            |region| (region, None),
        )
    }

    /// Estimate the hourly yields for the geometry, along with a region warning, if any.
    #[instrument(skip_all, fields(region = %geometry.region))]
    pub fn hourly_yields(&self, geometry: &Geometry) -> (HourlyYields, Option<String>) {
        let (region, warning) = self.region(&geometry.region);
        let factor = tilt_factor(geometry.tilt)
            * orientation_factor(geometry.azimuth)
            * geometry.system_loss.complement().max(0.0);
        let mut yields = HourlyYields::default();
        for (month, (daily_yield, shares)) in
            (1..=12).zip(region.daily_yields.iter().zip(&region.hourly_shares))
        {
            let share_sum: f64 = shares.iter().sum();
            if share_sum <= 0.0 {
                continue;
            }
            for day in 1..=days_in_month(month) {
                for (hour, share) in shares.iter().enumerate() {
                    yields.add((month, day), hour, daily_yield * factor * share / share_sum);
                }
            }
        }
        debug!(factor, total = yields.total(), "estimated the fallback yields");
        (yields, warning)
    }
}

/// Derate for the tilt deviation from the optimum.
fn tilt_factor(tilt: f64) -> f64 {
    (1.0 - (tilt - OPTIMAL_TILT).abs() / 100.0 * 0.5).max(0.0)
}

/// Derate for the orientation deviation from the south.
fn orientation_factor(azimuth: f64) -> f64 {
    let deviation = azimuth.rem_euclid(360.0);
    let deviation = if deviation > 180.0 { 360.0 - deviation } else { deviation };
    if deviation <= 22.5 {
        1.0
    } else if deviation <= 67.5 {
        0.95
    } else if deviation <= 112.5 {
        0.80
    } else {
        0.60
    }
}

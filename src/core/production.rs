//! Solar production profile: service or fallback yields, upsampled to the target cadence.

mod cache;
mod fallback;
mod generator;
mod profile;
mod upsample;

use std::collections::BTreeMap;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

pub use self::{
    cache::{ProfileCache, ProfileKey},
    fallback::FallbackTables,
    generator::{Generated, Generator, ProductionRequest, ResolvedProfile},
    profile::Profile,
};
use crate::{prelude::*, quantity::ratios::Percentage};

/// Installation geometry, which determines the yield per installed kilowatt-peak.
#[derive(Clone, Debug, Serialize)]
pub struct Geometry {
    pub latitude: f64,
    pub longitude: f64,

    /// Panel inclination from the horizontal, degrees.
    pub tilt: f64,

    /// Panel orientation, degrees: 0 is south, -90 is east, and 90 is west.
    pub azimuth: f64,

    pub system_loss: Percentage,
    pub mounting: Mounting,

    /// Region of the static tables to use when the service is unavailable.
    pub region: String,
}

impl Geometry {
    pub fn key(&self, cadence_minutes: i64) -> ProfileKey {
        ProfileKey {
            latitude: OrderedFloat(self.latitude),
            longitude: OrderedFloat(self.longitude),
            tilt: OrderedFloat(self.tilt),
            azimuth: OrderedFloat(self.azimuth),
            system_loss: OrderedFloat(self.system_loss.0),
            mounting: self.mounting,
            region: self.region.clone(),
            cadence_minutes,
        }
    }
}

#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
pub enum Mounting {
    /// Free-standing rack with rear ventilation.
    #[serde(rename = "free")]
    #[value(name = "free")]
    FreeStanding,

    /// Building-integrated or roof-parallel.
    #[serde(rename = "building")]
    #[value(name = "building")]
    Building,
}

impl Mounting {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FreeStanding => "free",
            Self::Building => "building",
        }
    }
}

/// Local calendar day of the reference year.
pub type MonthDay = (u32, u32);

/// Hourly energy per installed kilowatt-peak, keyed by the local calendar day.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HourlyYields(pub BTreeMap<MonthDay, [f64; 24]>);

impl HourlyYields {
    /// Accumulate the hourly energy, so that overlapping local hours do not lose any yield.
    pub fn add(&mut self, month_day: MonthDay, hour: usize, energy: f64) {
        if let Some(slot) = self.0.entry(month_day).or_insert([0.0; 24]).get_mut(hour) {
            *slot += energy;
        }
    }

    pub fn total(&self) -> f64 {
        self.0.values().flatten().sum()
    }
}

/// Source of the hourly yields per installed kilowatt-peak.
pub trait YieldSource {
    fn hourly_yields(&self, geometry: &Geometry) -> Result<HourlyYields>;
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProfileSource {
    /// Live irradiance service.
    Service,

    /// Static regional tables.
    Fallback,
}

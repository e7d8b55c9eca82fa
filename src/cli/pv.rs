use std::path::PathBuf;

use chrono::TimeDelta;
use clap::Parser;

use crate::{
    api::pvgis,
    core::production::{FallbackTables, Generator, Geometry, Mounting, ProfileCache},
    prelude::*,
    quantity::ratios::Percentage,
};

#[must_use]
#[derive(Parser)]
pub struct PvArgs {
    #[clap(long = "latitude", env = "LATITUDE", default_value = "39.24", allow_hyphen_values = true)]
    pub latitude: f64,

    #[clap(long = "longitude", env = "LONGITUDE", default_value = "-8.69", allow_hyphen_values = true)]
    pub longitude: f64,

    /// Panel inclination from the horizontal, degrees.
    #[clap(long = "tilt", env = "TILT", default_value = "35")]
    pub tilt: f64,

    /// Panel orientation, degrees: 0 is south, -90 is east, 90 is west.
    #[clap(long = "azimuth", env = "AZIMUTH", default_value = "0", allow_hyphen_values = true)]
    pub azimuth: f64,

    #[clap(long = "system-loss", env = "SYSTEM_LOSS", default_value = "14")]
    pub system_loss: Percentage,

    #[clap(long = "mounting", env = "MOUNTING", default_value = "free")]
    pub mounting: Mounting,

    /// Region of the fallback tables.
    #[clap(long = "region", env = "REGION", default_value = "Santarém")]
    pub region: String,

    /// Production lost to the shading.
    #[clap(long = "shading", env = "SHADING", default_value = "0")]
    pub shading: Percentage,

    #[clap(flatten)]
    pub service: ProductionServiceArgs,
}

impl PvArgs {
    pub fn geometry(&self) -> Geometry {
        Geometry {
            latitude: self.latitude,
            longitude: self.longitude,
            tilt: self.tilt,
            azimuth: self.azimuth,
            system_loss: self.system_loss,
            mounting: self.mounting,
            region: self.region.clone(),
        }
    }
}

#[must_use]
#[derive(Parser)]
pub struct ProductionServiceArgs {
    #[clap(long = "pvgis-url", env = "PVGIS_URL", default_value = pvgis::Api::URL)]
    pub url: String,

    /// Local standard time offset from UTC, hours.
    #[clap(long = "utc-offset-hours", env = "UTC_OFFSET_HOURS", default_value = "0", allow_hyphen_values = true)]
    pub utc_offset_hours: i64,

    /// Persist the fetched profiles between the runs.
    #[clap(long = "profile-cache", env = "PROFILE_CACHE_PATH")]
    pub cache_path: Option<PathBuf>,

    /// Refetch the profiles older than this, 24 hours by default.
    #[clap(long = "profile-cache-ttl-hours", env = "PROFILE_CACHE_TTL_HOURS")]
    pub cache_ttl_hours: Option<i64>,
}

impl ProductionServiceArgs {
    pub fn generator(&self) -> Result<Generator<pvgis::Api>> {
        let ttl = self.cache_ttl_hours.map_or(ProfileCache::DEFAULT_TTL, TimeDelta::hours);
        let cache = match &self.cache_path {
            Some(path) => ProfileCache::read_from(path, ttl),
            None => ProfileCache::new(ttl),
        };
        Ok(Generator::new(
            pvgis::Api::new(self.url.clone(), self.utc_offset_hours),
            FallbackTables::builtin()?,
            cache,
        ))
    }

    pub fn save(&self, generator: &Generator<pvgis::Api>) {
        if let Some(path) = &self.cache_path {
            generator.cache().write_to(path);
        }
    }
}

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    core::{
        production::{
            FallbackTables,
            Geometry,
            HourlyYields,
            ProfileCache,
            ProfileSource,
            YieldSource,
            profile::Profile,
        },
        series::Series,
    },
    prelude::*,
    quantity::{energy::KilowattHours, power::Kilowatts, ratios::Percentage},
};

/// Profile per installed kilowatt-peak, tagged with where it comes from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResolvedProfile {
    pub source: ProfileSource,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,

    pub profile: Profile,
}

#[derive(Clone, Debug)]
pub struct ProductionRequest {
    pub geometry: Geometry,
    pub peak_power: Kilowatts,
    pub shading: Percentage,
}

#[must_use]
pub struct Generated {
    pub series: Series<KilowattHours>,
    pub source: ProfileSource,
    pub warning: Option<String>,
}

impl ResolvedProfile {
    /// Scale the profile to the installation and lay it over the target timestamps.
    #[instrument(skip_all, fields(peak_power = %peak_power, shading = %shading))]
    pub fn production<V>(
        &self,
        peak_power: Kilowatts,
        shading: Percentage,
        target: &Series<V>,
    ) -> Generated {
        let scale = peak_power.0.max(0.0) * shading.complement().max(0.0);
        let series = target.map(|timestamp, _| KilowattHours(self.profile.energy_at(timestamp) * scale));
        let total: KilowattHours = series.iter().map(|(_, energy)| *energy).sum();
        info!(n_intervals = series.len(), %total, source = ?self.source, "generated the production");
        Generated { series, source: self.source, warning: self.warning.clone() }
    }
}

/// Production profile generator, which never fails: service errors turn into the fallback tables.
pub struct Generator<S> {
    source: S,
    fallback: FallbackTables,
    cache: ProfileCache,
}

impl<S: YieldSource> Generator<S> {
    pub const fn new(source: S, fallback: FallbackTables, cache: ProfileCache) -> Self {
        Self { source, fallback, cache }
    }

    pub const fn cache(&self) -> &ProfileCache {
        &self.cache
    }

    pub fn generate<V>(&mut self, request: &ProductionRequest, target: &Series<V>) -> Generated {
        self.resolve(&request.geometry, target.cadence()).production(
            request.peak_power,
            request.shading,
            target,
        )
    }

    pub fn resolve(&mut self, geometry: &Geometry, cadence: TimeDelta) -> ResolvedProfile {
        self.resolve_at(Utc::now(), geometry, cadence)
    }

    #[instrument(skip_all, fields(latitude = geometry.latitude, longitude = geometry.longitude))]
    pub fn resolve_at(
        &mut self,
        now: DateTime<Utc>,
        geometry: &Geometry,
        cadence: TimeDelta,
    ) -> ResolvedProfile {
        let key = geometry.key(cadence.num_minutes());
        if let Some(resolved) = self.cache.get_at(now, &key) {
            debug!(source = ?resolved.source, "cache hit");
            return resolved.clone();
        }
        let resolved = match self.source.hourly_yields(geometry) {
            Ok(yields) if yields.total() > 0.0 => ResolvedProfile {
                source: ProfileSource::Service,
                warning: None,
                profile: Profile::from_hourly(&yields, cadence),
            },
            Ok(_) => {
                warn!("the production service returned no yield");
                self.fallback(geometry, cadence, "the production service returned no yield".to_string())
            }
            Err(error) => {
                warn!("the production service is unavailable: {error:#}");
                self.fallback(
                    geometry,
                    cadence,
                    format!("the production service is unavailable ({error:#}), used the static regional tables"),
                )
            }
        };
        self.cache.insert_at(now, key, resolved.clone());
        resolved
    }

    fn fallback(&self, geometry: &Geometry, cadence: TimeDelta, reason: String) -> ResolvedProfile {
        let (yields, region_warning): (HourlyYields, _) = self.fallback.hourly_yields(geometry);
        let warning = match region_warning {
            Some(region_warning) => format!("{reason}; {region_warning}"),
            None => reason,
        };
        ResolvedProfile {
            source: ProfileSource::Fallback,
            warning: Some(warning),
            profile: Profile::from_hourly(&yields, cadence),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use approx::assert_abs_diff_eq;
    use chrono::{NaiveDate, NaiveDateTime};

    use super::*;
    use crate::core::production::Mounting;

    struct Unavailable;

    impl YieldSource for Unavailable {
        fn hourly_yields(&self, _geometry: &Geometry) -> Result<HourlyYields> {
            bail!("timed out")
        }
    }

    /// Flat midday yield, counting the calls.
    #[derive(Default)]
    struct Flat {
        n_calls: Cell<usize>,
    }

    impl YieldSource for Flat {
        fn hourly_yields(&self, _geometry: &Geometry) -> Result<HourlyYields> {
            self.n_calls.set(self.n_calls.get() + 1);
            let mut yields = HourlyYields::default();
            for day in 1..=30 {
                for hour in 10..14 {
                    yields.add((6, day), hour, 0.5);
                }
            }
            Ok(yields)
        }
    }

    fn geometry() -> Geometry {
        Geometry {
            latitude: 38.7,
            longitude: -9.1,
            tilt: 35.0,
            azimuth: 0.0,
            system_loss: Percentage(14.0),
            mounting: Mounting::FreeStanding,
            region: "Lisboa".to_string(),
        }
    }

    fn target() -> Series<()> {
        let start: NaiveDateTime = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        Series::try_new(
            TimeDelta::minutes(15),
            (0..96 * 2).map(|index| (start + TimeDelta::minutes(15 * index), ())).collect(),
        )
        .unwrap()
    }

    fn request() -> ProductionRequest {
        ProductionRequest { geometry: geometry(), peak_power: Kilowatts(4.0), shading: Percentage(10.0) }
    }

    #[test]
    fn falls_back_when_the_service_fails() {
        let mut generator = Generator::new(
            Unavailable,
            FallbackTables::builtin().unwrap(),
            ProfileCache::new(ProfileCache::DEFAULT_TTL),
        );
        let generated = generator.generate(&request(), &target());
        assert_eq!(generated.source, ProfileSource::Fallback);
        assert!(generated.warning.unwrap().contains("timed out"));
        assert_eq!(generated.series.len(), 192);
        let total: KilowattHours = generated.series.iter().map(|(_, energy)| *energy).sum();
        assert!(total > KilowattHours::ZERO);
    }

    #[test]
    fn service_profile_is_scaled_and_cached() {
        let mut generator = Generator::new(
            Flat::default(),
            FallbackTables::builtin().unwrap(),
            ProfileCache::new(ProfileCache::DEFAULT_TTL),
        );
        let generated = generator.generate(&request(), &target());
        assert_eq!(generated.source, ProfileSource::Service);
        assert!(generated.warning.is_none());

        // Two days of 2 kWh per kWp, on 4 kWp with 10% shading:
        let total: KilowattHours = generated.series.iter().map(|(_, energy)| *energy).sum();
        assert_abs_diff_eq!(total, KilowattHours(2.0 * 2.0 * 4.0 * 0.9), epsilon = 1e-9);

        let _ = generator.generate(&request(), &target());
        assert_eq!(generator.source.n_calls.get(), 1);
        assert_eq!(generator.cache().len(), 1);
    }

    #[test]
    fn expired_profile_is_refetched() {
        let mut generator = Generator::new(
            Flat::default(),
            FallbackTables::builtin().unwrap(),
            ProfileCache::new(TimeDelta::hours(1)),
        );
        let now = Utc::now();
        let _ = generator.resolve_at(now, &geometry(), TimeDelta::minutes(15));
        let _ = generator.resolve_at(now + TimeDelta::minutes(30), &geometry(), TimeDelta::minutes(15));
        assert_eq!(generator.source.n_calls.get(), 1);
        let _ = generator.resolve_at(now + TimeDelta::hours(2), &geometry(), TimeDelta::minutes(15));
        assert_eq!(generator.source.n_calls.get(), 2);
    }
}

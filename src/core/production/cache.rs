use std::{collections::BTreeMap, path::Path};

use chrono::{DateTime, TimeDelta, Utc};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::{
    core::production::{Mounting, ProfileSource, ResolvedProfile},
    prelude::*,
};

/// Exact parameter tuple the profile depends on.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProfileKey {
    pub latitude: OrderedFloat<f64>,
    pub longitude: OrderedFloat<f64>,
    pub tilt: OrderedFloat<f64>,
    pub azimuth: OrderedFloat<f64>,
    pub system_loss: OrderedFloat<f64>,
    pub mounting: Mounting,
    pub region: String,
    pub cadence_minutes: i64,
}

#[derive(Serialize, Deserialize)]
struct Entry {
    fetched_at: DateTime<Utc>,
    key: ProfileKey,
    profile: ResolvedProfile,
}

#[derive(Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct CacheFile {
    #[serde(default)]
    entries: Vec<Entry>,
}

/// Memoized production profiles with an explicit time-to-live.
pub struct ProfileCache {
    ttl: TimeDelta,
    entries: BTreeMap<ProfileKey, (DateTime<Utc>, ResolvedProfile)>,
}

impl ProfileCache {
    pub const DEFAULT_TTL: TimeDelta = TimeDelta::hours(24);

    pub const fn new(ttl: TimeDelta) -> Self {
        Self { ttl, entries: BTreeMap::new() }
    }

    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn read_from(path: &Path, ttl: TimeDelta) -> Self {
        let mut cache = Self::new(ttl);
        match Self::read_fallibly_from(path) {
            Ok(file) => {
                cache.entries.extend(
                    file.entries.into_iter().map(|entry| (entry.key, (entry.fetched_at, entry.profile))),
                );
                debug!(n_entries = cache.entries.len(), "loaded the profile cache");
            }
            Err(error) => {
                error!("failed to load the profile cache: {error:#}");
            }
        }
        cache
    }

    fn read_fallibly_from(path: &Path) -> Result<CacheFile> {
        if path.is_file() {
            Ok(toml::from_str(&std::fs::read_to_string(path)?)?)
        } else {
            Ok(CacheFile::default())
        }
    }

    /// Persist the service profiles, so that the next run retries whatever has fallen back.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn write_to(&self, path: &Path) {
        let file = CacheFile {
            entries: self
                .entries
                .iter()
                .filter(|(_, (_, profile))| profile.source == ProfileSource::Service)
                .map(|(key, (fetched_at, profile))| Entry {
                    fetched_at: *fetched_at,
                    key: key.clone(),
                    profile: profile.clone(),
                })
                .collect(),
        };
        let result = toml::to_string(&file)
            .map_err(Error::from)
            .and_then(|contents| std::fs::write(path, contents).map_err(Error::from));
        if let Err(error) = result {
            error!("failed to save the profile cache: {error:#}");
        }
    }

    /// Get the profile, unless it has expired.
    pub fn get_at(&self, now: DateTime<Utc>, key: &ProfileKey) -> Option<&ResolvedProfile> {
        self.entries
            .get(key)
            .filter(|(fetched_at, _)| now - *fetched_at < self.ttl)
            .map(|(_, profile)| profile)
    }

    pub fn insert_at(&mut self, now: DateTime<Utc>, key: ProfileKey, profile: ResolvedProfile) {
        self.entries.insert(key, (now, profile));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::core::production::{HourlyYields, Profile};

    fn key() -> ProfileKey {
        ProfileKey {
            latitude: OrderedFloat(38.7),
            longitude: OrderedFloat(-9.1),
            tilt: OrderedFloat(35.0),
            azimuth: OrderedFloat(0.0),
            system_loss: OrderedFloat(14.0),
            mounting: Mounting::FreeStanding,
            region: "Lisboa".to_string(),
            cadence_minutes: 60,
        }
    }

    fn resolved(source: ProfileSource) -> ResolvedProfile {
        let mut yields = HourlyYields::default();
        yields.add((6, 1), 12, 0.7);
        ResolvedProfile {
            source,
            warning: None,
            profile: Profile::from_hourly(&yields, TimeDelta::hours(1)),
        }
    }

    #[test]
    fn entries_expire() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let mut cache = ProfileCache::new(TimeDelta::hours(24));
        cache.insert_at(now, key(), resolved(ProfileSource::Service));
        assert!(cache.get_at(now + TimeDelta::hours(23), &key()).is_some());
        assert!(cache.get_at(now + TimeDelta::hours(24), &key()).is_none());
    }

    #[test]
    fn persists_only_service_profiles() {
        let path = std::env::temp_dir().join(format!("meerkat-cache-{}.toml", std::process::id()));
        let now = Utc::now();
        let mut cache = ProfileCache::new(ProfileCache::DEFAULT_TTL);
        cache.insert_at(now, key(), resolved(ProfileSource::Service));
        cache.insert_at(
            now,
            ProfileKey { region: "Porto".to_string(), ..key() },
            resolved(ProfileSource::Fallback),
        );
        cache.write_to(&path);

        let restored = ProfileCache::read_from(&path, ProfileCache::DEFAULT_TTL);
        std::fs::remove_file(&path).unwrap();
        assert_eq!(restored.len(), 1);
        assert_eq!(restored.get_at(now, &key()), Some(&resolved(ProfileSource::Service)));
    }

    #[test]
    fn corrupt_file_is_ignored() {
        let path = std::env::temp_dir().join(format!("meerkat-corrupt-{}.toml", std::process::id()));
        std::fs::write(&path, "entries = 42").unwrap();
        let cache = ProfileCache::read_from(&path, ProfileCache::DEFAULT_TTL);
        std::fs::remove_file(&path).unwrap();
        assert!(cache.is_empty());
    }
}

/// Location-day resolution
///
/// Maps a free-text `"City, Region"` location to the current calendar date in
/// that location's timezone (the "voting day"): geocode the text, map the
/// coordinate to an IANA timezone with an offline lookup, then take today's
/// date in that zone.

mod geocode;

pub use geocode::{Coordinates, GeocodeClient};

use chrono::NaiveDate;
use chrono_tz::Tz;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tzf_rs::DefaultFinder;

/// Memoized timezone for a location string.
///
/// Entries carry the generation of the lookup that produced them so that a
/// slow lookup finishing after a newer one cannot overwrite fresher state.
struct CachedZone {
    tz: Tz,
    generation: u64,
}

/// Resolves the voting day for a location
pub struct DayResolver {
    geocoder: GeocodeClient,
    finder: DefaultFinder,
    generation: AtomicU64,
    zones: RwLock<HashMap<String, CachedZone>>,
}

impl DayResolver {
    /// Create a new resolver
    pub fn new(geocoder: GeocodeClient) -> Self {
        Self {
            geocoder,
            finder: DefaultFinder::new(),
            generation: AtomicU64::new(0),
            zones: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve the current voting day for a `"City, Region"` location string.
    ///
    /// Returns `None` for a blank location (never a server-local fallback) and
    /// when the location cannot be geocoded. Lookup failures are soft: they are
    /// logged, and a previously memoized timezone for the same location keeps
    /// serving, so callers must tolerate an absent day.
    pub async fn resolve_voting_day(&self, location: &str) -> Option<NaiveDate> {
        let location = location.trim();
        if location.is_empty() {
            return None;
        }

        if let Some(tz) = self.cached_zone(location).await {
            return Some(local_date(tz));
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let coords = match self.geocoder.lookup(location).await {
            Ok(Some(coords)) => coords,
            Ok(None) => {
                tracing::warn!(%location, "no geocoding match for location");
                return self.cached_zone(location).await.map(local_date);
            }
            Err(e) => {
                tracing::warn!(%location, error = %e, "geocoding lookup failed");
                return self.cached_zone(location).await.map(local_date);
            }
        };

        let tz_name = self.finder.get_tz_name(coords.longitude, coords.latitude);
        let tz: Tz = match tz_name.parse() {
            Ok(tz) => tz,
            Err(_) => {
                tracing::warn!(%location, timezone = tz_name, "unrecognized timezone id");
                return None;
            }
        };

        self.admit_zone(location, tz, generation).await;

        Some(local_date(tz))
    }

    async fn cached_zone(&self, location: &str) -> Option<Tz> {
        self.zones.read().await.get(location).map(|zone| zone.tz)
    }

    /// Record a resolved timezone unless a newer lookup already wrote one.
    async fn admit_zone(&self, location: &str, tz: Tz, generation: u64) {
        let mut zones = self.zones.write().await;
        match zones.get(location) {
            Some(existing) if existing.generation > generation => {
                tracing::debug!(%location, "discarding stale timezone resolution");
            }
            _ => {
                zones.insert(location.to_string(), CachedZone { tz, generation });
            }
        }
    }
}

/// Today's date in the given timezone
fn local_date(tz: Tz) -> NaiveDate {
    chrono::Utc::now().with_timezone(&tz).date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeocodingConfig;

    fn resolver() -> DayResolver {
        // Points at an unroutable address; tests below never hit the network.
        let geocoder = GeocodeClient::new(&GeocodingConfig {
            api_url: "http://127.0.0.1:1".to_string(),
            user_agent: "topten-weather-tests".to_string(),
        })
        .unwrap();
        DayResolver::new(geocoder)
    }

    #[tokio::test]
    async fn test_blank_location_resolves_to_nothing() {
        let resolver = resolver();
        assert_eq!(resolver.resolve_voting_day("").await, None);
        assert_eq!(resolver.resolve_voting_day("   ").await, None);
    }

    #[tokio::test]
    async fn test_memoized_zone_serves_without_network() {
        let resolver = resolver();
        resolver
            .admit_zone("Austin, Texas", chrono_tz::America::Chicago, 1)
            .await;

        // Geocoder is unreachable, but the memoized zone keeps serving.
        let day = resolver.resolve_voting_day("Austin, Texas").await;
        assert!(day.is_some());
    }

    #[tokio::test]
    async fn test_stale_resolution_is_discarded() {
        let resolver = resolver();
        resolver
            .admit_zone("Springfield, IL", chrono_tz::America::Chicago, 5)
            .await;
        // An older lookup completing late must not clobber the newer zone.
        resolver
            .admit_zone("Springfield, IL", chrono_tz::Europe::London, 3)
            .await;

        assert_eq!(
            resolver.cached_zone("Springfield, IL").await,
            Some(chrono_tz::America::Chicago)
        );
    }

    #[test]
    fn test_coordinate_timezone_lookup() {
        let finder = DefaultFinder::new();
        // Austin, TX (note: finder takes longitude first)
        assert_eq!(finder.get_tz_name(-97.7431, 30.2672), "America/Chicago");
        // London
        assert_eq!(finder.get_tz_name(-0.1276, 51.5072), "Europe/London");
    }
}

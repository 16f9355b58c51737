//! Nearest-neighborhood resolution.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::config::GeoConfig;
use crate::error::{EngineError, EngineResult};
use crate::geo::distance::{DistanceFn, Haversine};
use crate::geo::geocoder::Geocoder;
use crate::model::{
    Agglo, AggloId, AddressDetails, AddressPoint, Airport, AirportCode, CityNeighborhoods, GeoPoint,
    Neighborhood,
};
use crate::observability::metrics;
use crate::store::GeoStore;

/// An agglomeration with its fit score for one address and airport.
#[derive(Debug, Clone, Serialize)]
pub struct RankedAgglo {
    pub agglo_id: AggloId,
    pub score: f64,
}

/// Result of locating a raw coordinate.
#[derive(Debug, Clone, Serialize)]
pub struct LocatedAddress {
    pub point: AddressPoint,
    pub details: AddressDetails,
}

/// Picks the neighborhood that best serves an address for an airport.
#[derive(Debug, Clone)]
pub struct GeoMatcher<D = Haversine> {
    config: GeoConfig,
    distance: D,
}

impl GeoMatcher<Haversine> {
    pub fn haversine(config: GeoConfig) -> Self {
        Self::new(config, Haversine)
    }
}

impl<D: DistanceFn> GeoMatcher<D> {
    pub fn new(config: GeoConfig, distance: D) -> Self {
        Self { config, distance }
    }

    /// Rank the airport's agglomerations, best (lowest score) first.
    ///
    /// score = (d(address, agglo) / scale)² + (d(airport, agglo) / scale)²
    pub fn rank_agglos(&self, address: GeoPoint, airport: &Airport, agglos: &[Agglo]) -> Vec<RankedAgglo> {
        let candidates = airport.candidate_agglos();
        let scale = self.config.score_scale_m;
        let mut ranked: Vec<RankedAgglo> = agglos
            .iter()
            .filter(|a| candidates.contains(&a.id))
            .map(|a| {
                let to_address = self.distance.distance_m(address, a.location) / scale;
                let to_airport = self.distance.distance_m(airport.location, a.location) / scale;
                RankedAgglo {
                    agglo_id: a.id,
                    score: to_address.powi(2) + to_airport.powi(2),
                }
            })
            .collect();
        ranked.sort_by(|a, b| a.score.total_cmp(&b.score).then_with(|| a.agglo_id.cmp(&b.agglo_id)));
        ranked
    }

    /// Nearest neighborhood to `point`, ties broken by lowest id.
    fn nearest<'a>(&self, point: GeoPoint, hoods: impl Iterator<Item = &'a Neighborhood>) -> Option<&'a Neighborhood> {
        hoods
            .map(|n| (self.distance.distance_m(point, n.location), n))
            .min_by(|(da, a), (db, b)| da.total_cmp(db).then_with(|| a.id.cmp(&b.id)))
            .map(|(_, n)| n)
    }

    /// Walk the ranking and stop at the first agglomeration with a match.
    /// Suburbs of an agglomeration take precedence over its direct sub-hoods.
    fn pick(&self, point: GeoPoint, ranked: &[RankedAgglo], hoods: &CityNeighborhoods) -> Option<Neighborhood> {
        ranked.iter().find_map(|agglo| {
            let in_agglo = |n: &&Neighborhood| n.agglo_id == agglo.agglo_id;
            self.nearest(point, hoods.suburbs.iter().filter(in_agglo))
                .or_else(|| self.nearest(point, hoods.sub_hoods.iter().filter(in_agglo)))
                .cloned()
        })
    }

    /// Neighborhood serving `address` for trips through `airport`.
    ///
    /// `Ok(None)` when the address has no city or no candidate agglomeration
    /// holds a neighborhood reachable from it.
    pub async fn find_neighborhood<S>(
        &self,
        store: &S,
        address: &AddressPoint,
        airport: Option<&Airport>,
    ) -> EngineResult<Option<Neighborhood>>
    where
        S: GeoStore + ?Sized,
    {
        let airport = airport.ok_or_else(|| EngineError::InvalidInput("airport is required".to_string()))?;
        let candidates = airport.candidate_agglos();
        let agglos = store.agglos(&candidates).await?;
        let ranked = self.rank_agglos(address.location, airport, &agglos);

        let Some(city_id) = address.city_id else {
            metrics::record_neighborhood_lookup("no_city");
            return Ok(None);
        };
        let hoods = store.city_neighborhoods(city_id, &candidates).await?;
        let found = self.pick(address.location, &ranked, &hoods);

        debug!(
            airport = %airport.code,
            city_id = %city_id,
            agglos = ranked.len(),
            found = found.is_some(),
            "Neighborhood lookup"
        );
        metrics::record_neighborhood_lookup(if found.is_some() { "found" } else { "no_match" });
        Ok(found)
    }

    /// One neighborhood per airport, from a single city query.
    pub async fn create_neighborhood_map<S>(
        &self,
        store: &S,
        address: &AddressPoint,
        airports: &[Airport],
    ) -> EngineResult<BTreeMap<AirportCode, Option<Neighborhood>>>
    where
        S: GeoStore + ?Sized,
    {
        let city_id = address
            .city_id
            .ok_or_else(|| EngineError::InvalidInput("address is not resolved to a city".to_string()))?;
        if airports.is_empty() {
            return Err(EngineError::InvalidInput("at least one airport is required".to_string()));
        }

        let candidates: Vec<AggloId> = airports
            .iter()
            .flat_map(|a| a.candidate_agglos())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let agglos = store.agglos(&candidates).await?;
        let hoods = store.city_neighborhoods(city_id, &candidates).await?;

        let mut map = BTreeMap::new();
        for airport in airports {
            let ranked = self.rank_agglos(address.location, airport, &agglos);
            let found = self.pick(address.location, &ranked, &hoods);
            metrics::record_neighborhood_lookup(if found.is_some() { "found" } else { "no_match" });
            map.insert(airport.code.clone(), found);
        }
        debug!(city_id = %city_id, airports = airports.len(), "Neighborhood map built");
        Ok(map)
    }

    /// Resolve a raw coordinate to an address point with its city.
    pub async fn locate_address<S, G>(&self, store: &S, geocoder: &G, location: GeoPoint) -> EngineResult<LocatedAddress>
    where
        S: GeoStore + ?Sized,
        G: Geocoder + ?Sized,
    {
        if !location.is_valid() {
            return Err(EngineError::InvalidInput(format!(
                "invalid coordinate {},{}",
                location.latitude, location.longitude
            )));
        }
        let details = geocoder.resolve_address_details(location).await?;
        let city = match (&details.city_name, &details.country_code) {
            (Some(name), Some(country)) => store.find_city(name, country).await?,
            _ => None,
        };
        if city.is_none() {
            debug!(city = ?details.city_name, "Located address has no known city");
        }
        Ok(LocatedAddress {
            point: AddressPoint {
                location,
                city_id: city.map(|c| c.id),
            },
            details,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::geocoder::FixedGeocoder;
    use crate::model::{City, CityId, NeighborhoodId, Township};
    use crate::store::memory::InMemoryStore;

    struct World {
        store: InMemoryStore,
        city: City,
        near: Agglo,
        far: Agglo,
        airport: Airport,
    }

    fn agglo(name: &str, lat: f64, lon: f64) -> Agglo {
        Agglo {
            id: AggloId::new(),
            name: name.to_string(),
            location: GeoPoint::new(lat, lon),
        }
    }

    fn hood(name: &str, agglo: &Agglo, city: Option<CityId>, lat: f64, lon: f64) -> Neighborhood {
        Neighborhood {
            id: NeighborhoodId::new(),
            name: name.to_string(),
            agglo_id: agglo.id,
            city_id: city,
            location: GeoPoint::new(lat, lon),
        }
    }

    fn world() -> World {
        let store = InMemoryStore::new();
        let city = City {
            id: CityId::new(),
            name: "Paris".into(),
            country_code: "FR".into(),
        };
        let near = agglo("Paris", 48.8566, 2.3522);
        let far = agglo("Orleans", 47.9030, 1.9093);
        let airport = Airport {
            code: AirportCode::new("CDG"),
            location: GeoPoint::new(49.0097, 2.5479),
            agglo_id: None,
            agglo_ids: vec![far.id, near.id],
        };
        store.seed(|s| {
            s.add_city(city.clone())
                .add_agglo(near.clone())
                .add_agglo(far.clone())
                .add_airport(airport.clone());
        });
        World {
            store,
            city,
            near,
            far,
            airport,
        }
    }

    fn address(w: &World) -> AddressPoint {
        AddressPoint {
            location: GeoPoint::new(48.86, 2.34),
            city_id: Some(w.city.id),
        }
    }

    #[test]
    fn test_rank_prefers_close_agglo() {
        let w = world();
        let matcher = GeoMatcher::haversine(GeoConfig::default());
        let ranked = matcher.rank_agglos(address(&w).location, &w.airport, &[w.far.clone(), w.near.clone()]);
        assert_eq!(ranked[0].agglo_id, w.near.id);
        assert!(ranked[0].score < ranked[1].score);
    }

    #[tokio::test]
    async fn test_falls_back_to_next_agglo() {
        let w = world();
        let only = hood("La Source", &w.far, Some(w.city.id), 47.85, 1.93);
        w.store.seed(|s| {
            s.add_neighborhood(only.clone());
        });

        let matcher = GeoMatcher::haversine(GeoConfig::default());
        let found = matcher
            .find_neighborhood(&w.store, &address(&w), Some(&w.airport))
            .await
            .unwrap();
        assert_eq!(found.map(|n| n.id), Some(only.id));
    }

    #[tokio::test]
    async fn test_suburb_beats_closer_sub_hood() {
        let w = world();
        let direct = hood("Louvre", &w.near, Some(w.city.id), 48.8606, 2.3376);
        let suburb = hood("Vincennes", &w.near, None, 48.8474, 2.4396);
        w.store.seed(|s| {
            s.add_neighborhood(direct.clone())
                .add_neighborhood(suburb.clone())
                .add_township(Township {
                    city_id: w.city.id,
                    neighborhood_id: suburb.id,
                });
        });

        let matcher = GeoMatcher::haversine(GeoConfig::default());
        let found = matcher
            .find_neighborhood(&w.store, &address(&w), Some(&w.airport))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, suburb.id);
    }

    #[tokio::test]
    async fn test_equidistant_tie_broken_by_id() {
        let w = world();
        let a = hood("East", &w.near, Some(w.city.id), 48.86, 2.35);
        let b = hood("West", &w.near, Some(w.city.id), 48.86, 2.33);
        w.store.seed(|s| {
            s.add_neighborhood(a.clone()).add_neighborhood(b.clone());
        });

        let matcher = GeoMatcher::new(GeoConfig::default(), |_: GeoPoint, _: GeoPoint| 1.0);
        let found = matcher
            .find_neighborhood(&w.store, &address(&w), Some(&w.airport))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, a.id.min(b.id));
    }

    #[tokio::test]
    async fn test_missing_airport_or_city() {
        let w = world();
        let matcher = GeoMatcher::haversine(GeoConfig::default());
        let err = matcher.find_neighborhood(&w.store, &address(&w), None).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));

        let mut unresolved = address(&w);
        unresolved.city_id = None;
        let found = matcher
            .find_neighborhood(&w.store, &unresolved, Some(&w.airport))
            .await
            .unwrap();
        assert!(found.is_none());

        let err = matcher
            .create_neighborhood_map(&w.store, &unresolved, &[w.airport.clone()])
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
        let err = matcher
            .create_neighborhood_map(&w.store, &address(&w), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_neighborhood_map_per_airport() {
        let w = world();
        let central = hood("Marais", &w.near, Some(w.city.id), 48.859, 2.362);
        let southern = hood("Olivet", &w.far, Some(w.city.id), 47.86, 1.90);
        let orly = Airport {
            code: AirportCode::new("ORY"),
            location: GeoPoint::new(48.7262, 2.3652),
            agglo_id: Some(w.far.id),
            agglo_ids: vec![],
        };
        let lonely = Airport {
            code: AirportCode::new("BVA"),
            location: GeoPoint::new(49.4544, 2.1128),
            agglo_id: None,
            agglo_ids: vec![],
        };
        w.store.seed(|s| {
            s.add_neighborhood(central.clone()).add_neighborhood(southern.clone());
        });

        let matcher = GeoMatcher::haversine(GeoConfig::default());
        let map = matcher
            .create_neighborhood_map(&w.store, &address(&w), &[w.airport.clone(), orly, lonely])
            .await
            .unwrap();

        assert_eq!(map[&AirportCode::new("CDG")].as_ref().map(|n| n.id), Some(central.id));
        assert_eq!(map[&AirportCode::new("ORY")].as_ref().map(|n| n.id), Some(southern.id));
        assert!(map[&AirportCode::new("BVA")].is_none());
    }

    #[tokio::test]
    async fn test_locate_address_resolves_city() {
        let w = world();
        let matcher = GeoMatcher::haversine(GeoConfig::default());
        let located = matcher
            .locate_address(&w.store, &FixedGeocoder::city("paris", "fr"), GeoPoint::new(48.86, 2.34))
            .await
            .unwrap();
        assert_eq!(located.point.city_id, Some(w.city.id));

        let err = matcher
            .locate_address(&w.store, &FixedGeocoder::default(), GeoPoint::new(123.0, 0.0))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
    }
}

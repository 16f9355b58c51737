//! Geocoded places: addresses, airports and neighborhood clusters.

use serde::{Deserialize, Serialize};

use crate::model::ids::{AddressId, AggloId, AirportCode, CityId, NeighborhoodId, UserId};

/// A WGS84 coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Result of a reverse-geocoding lookup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressDetails {
    pub street_name: Option<String>,
    pub street_number: Option<String>,
    pub city_name: Option<String>,
    pub state_code: Option<String>,
    pub country_code: Option<String>,
    pub postcode: Option<String>,
    pub locator: Option<String>,
    pub provider: Option<String>,
}

/// A stored address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub id: AddressId,
    pub location: GeoPoint,
    #[serde(default)]
    pub city_id: Option<CityId>,
    /// Set when a user saved this address to their profile.
    #[serde(default)]
    pub saved_by: Option<UserId>,
    #[serde(default)]
    pub details: AddressDetails,
}

/// A point already resolved (or not) to a city.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AddressPoint {
    pub location: GeoPoint,
    pub city_id: Option<CityId>,
}

impl From<&Address> for AddressPoint {
    fn from(address: &Address) -> Self {
        Self {
            location: address.location,
            city_id: address.city_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Airport {
    pub code: AirportCode,
    pub location: GeoPoint,
    /// Primary agglomeration, used when no explicit association exists.
    #[serde(default)]
    pub agglo_id: Option<AggloId>,
    /// Explicit agglomeration associations.
    #[serde(default)]
    pub agglo_ids: Vec<AggloId>,
}

impl Airport {
    /// Candidate agglomerations for neighborhood resolution.
    pub fn candidate_agglos(&self) -> Vec<AggloId> {
        if !self.agglo_ids.is_empty() {
            self.agglo_ids.clone()
        } else {
            self.agglo_id.into_iter().collect()
        }
    }
}

/// An urban agglomeration grouping neighborhoods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agglo {
    pub id: AggloId,
    pub name: String,
    pub location: GeoPoint,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    pub id: CityId,
    pub name: String,
    pub country_code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neighborhood {
    pub id: NeighborhoodId,
    pub name: String,
    pub agglo_id: AggloId,
    /// City the neighborhood lies in directly, if any.
    #[serde(default)]
    pub city_id: Option<CityId>,
    pub location: GeoPoint,
}

/// Suburb relation: a neighborhood reachable from a city it does not lie in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Township {
    pub city_id: CityId,
    pub neighborhood_id: NeighborhoodId,
}

/// Neighborhoods reachable from one city.
#[derive(Debug, Clone, Default)]
pub struct CityNeighborhoods {
    pub sub_hoods: Vec<Neighborhood>,
    pub suburbs: Vec<Neighborhood>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_agglos_prefers_explicit_list() {
        let primary = AggloId::new();
        let explicit = vec![AggloId::new(), AggloId::new()];
        let mut airport = Airport {
            code: AirportCode::new("CDG"),
            location: GeoPoint::new(49.0097, 2.5479),
            agglo_id: Some(primary),
            agglo_ids: explicit.clone(),
        };
        assert_eq!(airport.candidate_agglos(), explicit);

        airport.agglo_ids.clear();
        assert_eq!(airport.candidate_agglos(), vec![primary]);

        airport.agglo_id = None;
        assert!(airport.candidate_agglos().is_empty());
    }

    #[test]
    fn test_point_validity() {
        assert!(GeoPoint::new(48.85, 2.35).is_valid());
        assert!(!GeoPoint::new(91.0, 0.0).is_valid());
        assert!(!GeoPoint::new(f64::NAN, 0.0).is_valid());
    }
}

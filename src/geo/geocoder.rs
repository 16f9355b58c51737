//! Reverse-geocoding collaborator.

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{AddressDetails, GeoPoint};

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("geocoding provider unavailable: {0}")]
    Unavailable(String),

    #[error("no address found at {latitude},{longitude}")]
    NoResult { latitude: f64, longitude: f64 },
}

/// Resolves a coordinate to address details.
///
/// Only the result contract matters to the engine; providers live elsewhere.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn resolve_address_details(&self, point: GeoPoint) -> Result<AddressDetails, GeocodeError>;
}

/// Answers every lookup with the same details.
#[derive(Debug, Clone, Default)]
pub struct FixedGeocoder {
    details: AddressDetails,
}

impl FixedGeocoder {
    pub fn new(details: AddressDetails) -> Self {
        Self { details }
    }

    /// Details carrying only a city and a country.
    pub fn city(name: impl Into<String>, country_code: impl Into<String>) -> Self {
        Self::new(AddressDetails {
            city_name: Some(name.into()),
            country_code: Some(country_code.into()),
            provider: Some("fixed".to_string()),
            ..AddressDetails::default()
        })
    }
}

#[async_trait]
impl Geocoder for FixedGeocoder {
    async fn resolve_address_details(&self, _point: GeoPoint) -> Result<AddressDetails, GeocodeError> {
        Ok(self.details.clone())
    }
}

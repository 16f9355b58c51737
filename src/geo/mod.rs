//! Neighborhood resolution subsystem.
//!
//! # Data Flow
//! ```text
//! coordinate ──Geocoder──▶ AddressDetails ──city table──▶ AddressPoint
//!
//! AddressPoint + Airport
//!     → candidate agglos (explicit list, else primary)
//!     → score = (d(address, agglo)/scale)² + (d(airport, agglo)/scale)², ascending
//!     → city neighborhoods restricted to the candidates (suburbs + sub-hoods)
//!     → first agglo with a match wins; nearest neighborhood inside it
//! ```
//!
//! # Design Decisions
//! - Distance and geocoding are injected collaborators
//! - Suburbs of an agglo take precedence over its direct sub-hoods
//! - Equidistant neighborhoods resolve to the lowest id

mod distance;
mod geocoder;
mod matcher;

pub use distance::{DistanceFn, Haversine, EARTH_RADIUS_M};
pub use geocoder::{FixedGeocoder, GeocodeError, Geocoder};
pub use matcher::{GeoMatcher, LocatedAddress, RankedAgglo};

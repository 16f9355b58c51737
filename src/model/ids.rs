//! Strongly typed entity identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! entity_id {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
            #[serde(transparent)]
            pub struct $name(pub Uuid);

            impl $name {
                /// Allocate a fresh random id.
                pub fn new() -> Self {
                    Self(Uuid::new_v4())
                }
            }

            impl Default for $name {
                fn default() -> Self {
                    Self::new()
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    self.0.fmt(f)
                }
            }

            impl FromStr for $name {
                type Err = uuid::Error;

                fn from_str(s: &str) -> Result<Self, Self::Err> {
                    Uuid::parse_str(s).map(Self)
                }
            }
        )*
    };
}

entity_id!(
    /// A multi-leg trip.
    TripId,
    /// One leg of a trip.
    ViaId,
    /// Passenger link between a via and a traveler.
    ViaTravelerId,
    TravelerId,
    UserId,
    /// A traveler group's request to share ground transport.
    RiderId,
    RideId,
    /// Membership of a rider in a ride.
    RideRiderId,
    /// Pending request or counter-request on a membership.
    RequestId,
    TaskId,
    TaskViaTravelerId,
    AddressId,
    NeighborhoodId,
    AggloId,
    CityId,
);

/// IATA airport code, e.g. "CDG".
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AirportCode(pub String);

impl AirportCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AirportCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_parse_round_trip() {
        let id = ViaId::new();
        let parsed: ViaId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
        assert!("not-a-uuid".parse::<RiderId>().is_err());
    }

    #[test]
    fn test_airport_code_normalized() {
        assert_eq!(AirportCode::new("cdg").as_str(), "CDG");
    }
}

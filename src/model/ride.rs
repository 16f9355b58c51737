//! Riders, rides and ride memberships.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::ids::{
    AddressId, AirportCode, RequestId, RideId, RideRiderId, RiderId, TravelerId, UserId, ViaId,
    ViaTravelerId,
};

/// A traveler group's request to share ground transport for one leg.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rider {
    pub id: RiderId,
    pub via_id: ViaId,
    #[serde(default)]
    pub address_id: Option<AddressId>,
    /// Travelling towards the airport (true) or away from it.
    pub to_airport: bool,
    pub seat_count: u8,
    pub luggage_count: u8,
}

/// Link between a rider and one of the passengers it carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiderTraveler {
    pub rider_id: RiderId,
    pub via_traveler_id: ViaTravelerId,
    pub traveler_id: TravelerId,
    pub user_id: UserId,
}

/// User link of a rider, derived from its traveler links.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RiderUser {
    pub rider_id: RiderId,
    pub user_id: UserId,
}

/// Kind of a ride, which decides the status a joining member receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RideStatus {
    CabShare,
    DriverOffer,
    Provided,
}

impl RideStatus {
    /// Member status granted to a rider joining a ride of this kind.
    pub fn member_status(self) -> RideRiderStatus {
        match self {
            RideStatus::CabShare => RideRiderStatus::Joined,
            RideStatus::DriverOffer | RideStatus::Provided => RideRiderStatus::Passenger,
        }
    }

    /// Status held by the ride's anchor member.
    pub fn owner_status(self) -> RideRiderStatus {
        match self {
            RideStatus::CabShare | RideStatus::Provided => RideRiderStatus::Owner,
            RideStatus::DriverOffer => RideRiderStatus::Driver,
        }
    }

    /// Whether another member may take the anchor's place. A driver offer
    /// lives and dies with the driver's car.
    pub fn hands_over(self) -> bool {
        !matches!(self, RideStatus::DriverOffer)
    }
}

/// A matched group of riders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ride {
    pub id: RideId,
    #[serde(default)]
    pub status: Option<RideStatus>,
    pub airport: AirportCode,
    #[serde(default)]
    pub address_id: Option<AddressId>,
    pub seat_count: u8,
    pub luggage_count: u8,
    #[serde(default)]
    pub public: bool,
}

/// Status of a rider within a ride.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RideRiderStatus {
    Owner,
    Driver,
    Joined,
    Passenger,
    Applied,
    Denied,
    Suspended,
}

impl RideRiderStatus {
    pub const ALL: [RideRiderStatus; 7] = [
        RideRiderStatus::Owner,
        RideRiderStatus::Driver,
        RideRiderStatus::Joined,
        RideRiderStatus::Passenger,
        RideRiderStatus::Applied,
        RideRiderStatus::Denied,
        RideRiderStatus::Suspended,
    ];

    /// At most one row per ride holds one of these.
    pub const RIDE_UNIQUES: [RideRiderStatus; 2] = [RideRiderStatus::Owner, RideRiderStatus::Driver];

    /// At most one row per rider holds one of these.
    pub const RIDER_UNIQUES: [RideRiderStatus; 4] = [
        RideRiderStatus::Owner,
        RideRiderStatus::Driver,
        RideRiderStatus::Joined,
        RideRiderStatus::Passenger,
    ];

    pub fn is_owner(self) -> bool {
        Self::RIDE_UNIQUES.contains(&self)
    }

    /// Joined or passenger, excluding the owner set.
    pub fn is_member(self) -> bool {
        matches!(self, RideRiderStatus::Joined | RideRiderStatus::Passenger)
    }

    /// Owner or member: the rider is actively travelling with this ride.
    pub fn is_current(self) -> bool {
        Self::RIDER_UNIQUES.contains(&self)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RideRiderStatus::Owner => "owner",
            RideRiderStatus::Driver => "driver",
            RideRiderStatus::Joined => "joined",
            RideRiderStatus::Passenger => "passenger",
            RideRiderStatus::Applied => "applied",
            RideRiderStatus::Denied => "denied",
            RideRiderStatus::Suspended => "suspended",
        }
    }
}

impl fmt::Display for RideRiderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Membership row joining a rider to a ride.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RideRider {
    pub id: RideRiderId,
    pub ride_id: RideId,
    pub rider_id: RiderId,
    pub status: RideRiderStatus,
    pub joined_at: DateTime<Utc>,
}

/// Pending request (or counter-request) attached to a membership.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RideRiderRequest {
    pub id: RequestId,
    pub ride_rider_id: RideRiderId,
    /// Counter-proposal issued by the ride rather than the applicant.
    #[serde(default)]
    pub counter: bool,
    pub seat_count: u8,
    pub luggage_count: u8,
}

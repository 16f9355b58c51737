//! Trips, legs and passenger links.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::{AirportCode, TravelerId, TripId, UserId, ViaId, ViaTravelerId};

/// A multi-leg trip. `vias` is ordered by ordinal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trip {
    pub id: TripId,
    pub vias: Vec<Via>,
}

impl Trip {
    pub fn new(id: TripId, mut vias: Vec<Via>) -> Self {
        vias.sort_by_key(|v| v.ordinal);
        Self { id, vias }
    }

    /// Ordinals of the trip's vias in their current order.
    pub fn ordinals(&self) -> Vec<i32> {
        self.vias.iter().map(|v| v.ordinal).collect()
    }
}

/// One end of a leg.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    pub airport: AirportCode,
    #[serde(default)]
    pub terminal: Option<String>,
    pub time: DateTime<Utc>,
}

/// A leg of a trip. `id` is immutable, `ordinal` is not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Via {
    pub id: ViaId,
    pub trip_id: TripId,
    pub ordinal: i32,
    pub departure: Endpoint,
    pub arrival: Endpoint,
}

/// Booking state of a passenger on a leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Booked,
    Pending,
    Cancelled,
}

/// Passenger link between a via and a traveler.
///
/// Destroying one of these is the only trigger of the rider/task cascade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViaTraveler {
    pub id: ViaTravelerId,
    pub via_id: ViaId,
    pub traveler_id: TravelerId,
    pub user_id: UserId,
    pub booking_status: BookingStatus,
    #[serde(default)]
    pub volunteer: bool,
}

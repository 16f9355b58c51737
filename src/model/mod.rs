//! Domain model.
//!
//! # Relations
//! ```text
//! Trip 1─* Via 1─* ViaTraveler (passenger)
//!                      │
//!          ┌───────────┴────────────┐
//!          ▼                        ▼
//!   RiderTraveler *─1 Rider    TaskViaTraveler *─1 Task 1─* TaskTraveler
//!                      │
//!                 RideRider *─1 Ride
//!                      │
//!              RideRiderRequest
//!
//! City ─(direct)→ Neighborhood *─1 Agglo *─* Airport
//! City ─(township)→ Neighborhood
//! ```
//!
//! # Design Decisions
//! - Rows are plain data; every mutation goes through the engine operations
//! - Ids are allocated by callers, so unsaved rows already carry their id

pub mod geo;
pub mod ids;
pub mod ride;
pub mod task;
pub mod trip;

pub use geo::{
    Address, AddressDetails, AddressPoint, Agglo, Airport, City, CityNeighborhoods, GeoPoint,
    Neighborhood, Township,
};
pub use ids::*;
pub use ride::{
    Ride, RideRider, RideRiderRequest, RideRiderStatus, RideStatus, Rider, RiderTraveler,
    RiderUser,
};
pub use task::{Task, TaskMemberStatus, TaskTraveler, TaskViaTraveler};
pub use trip::{BookingStatus, Endpoint, Trip, Via, ViaTraveler};

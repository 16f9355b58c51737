//! Persistence collaborator contracts.

use async_trait::async_trait;

use crate::model::{
    Address, AddressId, Agglo, AggloId, Airport, AirportCode, City, CityId, CityNeighborhoods,
    RequestId, Ride, RideId, RideRider, RideRiderId, RideRiderRequest, RideRiderStatus, Rider,
    RiderId, RiderTraveler, TaskId, TaskMemberStatus, TaskTraveler, TaskViaTraveler,
    TaskViaTravelerId, TripId, Via, ViaId, ViaTraveler, ViaTravelerId,
};
use crate::store::StoreResult;

/// Trips, legs and passenger links.
#[async_trait]
pub trait ItineraryStore: Send + Sync {
    /// Live vias of a trip, ordered by ordinal.
    async fn trip_vias(&self, trip_id: TripId) -> StoreResult<Vec<Via>>;

    /// Insert a new via. Enforces the `(trip_id, ordinal)` uniqueness.
    async fn insert_via(&self, via: &Via) -> StoreResult<()>;

    /// Partial update of the ordinal column only.
    async fn update_via_ordinal(&self, via_id: ViaId, ordinal: i32) -> StoreResult<()>;

    /// Destroy a via. Fails while passengers still reference it.
    async fn destroy_via(&self, via_id: ViaId) -> StoreResult<()>;

    async fn passengers_of_vias(&self, via_ids: &[ViaId]) -> StoreResult<Vec<ViaTraveler>>;

    /// Bulk destroy passenger links. Returns the number of rows removed.
    async fn destroy_passengers(&self, ids: &[ViaTravelerId]) -> StoreResult<usize>;
}

/// Riders, rides and memberships.
#[async_trait]
pub trait RideStore: Send + Sync {
    async fn rider_travelers_for_passengers(
        &self,
        passenger_ids: &[ViaTravelerId],
    ) -> StoreResult<Vec<RiderTraveler>>;

    async fn rider_travelers_of_riders(&self, rider_ids: &[RiderId]) -> StoreResult<Vec<RiderTraveler>>;

    /// Unlink the given passengers from their riders and re-derive the
    /// riders' user links. Returns the number of traveler links removed.
    async fn destroy_rider_travelers(&self, passenger_ids: &[ViaTravelerId]) -> StoreResult<usize>;

    async fn find_rider(&self, rider_id: RiderId) -> StoreResult<Option<Rider>>;

    /// Destroy a rider with its traveler and derived user links.
    /// Fails while memberships still reference it.
    async fn destroy_rider(&self, rider_id: RiderId) -> StoreResult<()>;

    async fn find_ride(&self, ride_id: RideId) -> StoreResult<Option<Ride>>;

    /// Fails while memberships still reference the ride.
    async fn destroy_ride(&self, ride_id: RideId) -> StoreResult<()>;

    /// Memberships of the given riders. An empty status filter matches all.
    async fn memberships_of_riders(
        &self,
        rider_ids: &[RiderId],
        statuses: &[RideRiderStatus],
    ) -> StoreResult<Vec<RideRider>>;

    async fn memberships_of_ride(&self, ride_id: RideId) -> StoreResult<Vec<RideRider>>;

    /// Partial update of the status column only.
    async fn update_membership_status(
        &self,
        id: RideRiderId,
        status: RideRiderStatus,
    ) -> StoreResult<()>;

    /// Fails while requests still reference the membership.
    async fn destroy_membership(&self, id: RideRiderId) -> StoreResult<()>;

    async fn requests_of_membership(&self, id: RideRiderId) -> StoreResult<Vec<RideRiderRequest>>;

    async fn destroy_requests(&self, ids: &[RequestId]) -> StoreResult<usize>;
}

/// Help tasks and their members.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn task_members_for_passengers(
        &self,
        passenger_ids: &[ViaTravelerId],
    ) -> StoreResult<Vec<TaskViaTraveler>>;

    async fn task_members(&self, task_id: TaskId) -> StoreResult<Vec<TaskViaTraveler>>;

    async fn task_beneficiaries(&self, task_id: TaskId) -> StoreResult<Vec<TaskTraveler>>;

    async fn update_task_member_status(
        &self,
        id: TaskViaTravelerId,
        status: TaskMemberStatus,
    ) -> StoreResult<()>;

    async fn destroy_task_members(&self, ids: &[TaskViaTravelerId]) -> StoreResult<usize>;

    /// Destroy a task with its beneficiaries. Fails while members remain.
    async fn destroy_task(&self, task_id: TaskId) -> StoreResult<()>;
}

/// Geocoded places.
#[async_trait]
pub trait GeoStore: Send + Sync {
    async fn find_airport(&self, code: &AirportCode) -> StoreResult<Option<Airport>>;

    async fn agglos(&self, ids: &[AggloId]) -> StoreResult<Vec<Agglo>>;

    /// Neighborhoods of `city_id` restricted to the given agglomerations,
    /// split into direct sub-hoods and township suburbs.
    async fn city_neighborhoods(
        &self,
        city_id: CityId,
        agglo_ids: &[AggloId],
    ) -> StoreResult<CityNeighborhoods>;

    async fn find_city(&self, name: &str, country_code: &str) -> StoreResult<Option<City>>;

    async fn find_address(&self, id: AddressId) -> StoreResult<Option<Address>>;

    /// True while a rider, a ride or a user still references the address.
    async fn address_in_use(&self, id: AddressId) -> StoreResult<bool>;

    async fn destroy_address(&self, id: AddressId) -> StoreResult<()>;
}

/// Every store contract the engine needs.
pub trait EngineStore: ItineraryStore + RideStore + TaskStore + GeoStore {}

impl<T> EngineStore for T where T: ItineraryStore + RideStore + TaskStore + GeoStore + ?Sized {}

/// An all-or-nothing scope over the store.
///
/// Dropping a transaction without committing rolls it back.
#[async_trait]
pub trait StoreTransaction: ItineraryStore + RideStore + TaskStore + GeoStore {
    async fn commit(&self) -> StoreResult<()>;
    async fn rollback(&self) -> StoreResult<()>;
}

/// A store able to open transactions.
#[async_trait]
pub trait TransactionalStore: Send + Sync {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>>;
}

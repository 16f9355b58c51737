//! In-memory reference implementation of the store contracts.
//!
//! Deterministic and test-friendly. It enforces the constraints a relational
//! backend would: the `(trip_id, ordinal)` uniqueness on every write, and
//! refusal to destroy rows that are still referenced.
//!
//! Transactions snapshot the whole state on `begin`; rollback (or dropping
//! the handle uncommitted) restores the snapshot. Only one transaction is
//! open at a time: `begin` waits until the previous one commits, rolls back
//! or is dropped, so a rollback never erases another transaction's commit.
//! Writes inside a transaction are visible to other handles immediately.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::model::{
    Address, AddressId, Agglo, AggloId, Airport, AirportCode, City, CityId, CityNeighborhoods,
    Neighborhood, NeighborhoodId, RequestId, Ride, RideId, RideRider, RideRiderId,
    RideRiderRequest, RideRiderStatus, Rider, RiderId, RiderTraveler, RiderUser, Task, TaskId,
    TaskMemberStatus, TaskTraveler, TaskViaTraveler, TaskViaTravelerId, Township, TripId, Via,
    ViaId, ViaTraveler, ViaTravelerId,
};
use crate::store::traits::{
    GeoStore, ItineraryStore, RideStore, StoreTransaction, TaskStore, TransactionalStore,
};
use crate::store::{StoreError, StoreResult};

/// Complete store contents. Serializable as a JSON snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreState {
    pub vias: BTreeMap<ViaId, Via>,
    pub passengers: BTreeMap<ViaTravelerId, ViaTraveler>,
    pub riders: BTreeMap<RiderId, Rider>,
    pub rider_travelers: Vec<RiderTraveler>,
    pub rider_users: Vec<RiderUser>,
    pub rides: BTreeMap<RideId, Ride>,
    pub memberships: BTreeMap<RideRiderId, RideRider>,
    pub requests: BTreeMap<RequestId, RideRiderRequest>,
    pub tasks: BTreeMap<TaskId, Task>,
    pub task_travelers: Vec<TaskTraveler>,
    pub task_members: BTreeMap<TaskViaTravelerId, TaskViaTraveler>,
    pub addresses: BTreeMap<AddressId, Address>,
    pub airports: BTreeMap<AirportCode, Airport>,
    pub agglos: BTreeMap<AggloId, Agglo>,
    pub cities: BTreeMap<CityId, City>,
    pub neighborhoods: BTreeMap<NeighborhoodId, Neighborhood>,
    pub townships: Vec<Township>,
}

impl StoreState {
    pub fn add_via(&mut self, via: Via) -> &mut Self {
        self.vias.insert(via.id, via);
        self
    }

    pub fn add_passenger(&mut self, passenger: ViaTraveler) -> &mut Self {
        self.passengers.insert(passenger.id, passenger);
        self
    }

    pub fn add_rider(&mut self, rider: Rider) -> &mut Self {
        self.riders.insert(rider.id, rider);
        self
    }

    /// Link a passenger to a rider and derive the matching user link.
    pub fn link_rider_traveler(&mut self, link: RiderTraveler) -> &mut Self {
        let user = RiderUser {
            rider_id: link.rider_id,
            user_id: link.user_id,
        };
        if !self.rider_users.contains(&user) {
            self.rider_users.push(user);
        }
        self.rider_travelers.push(link);
        self
    }

    pub fn add_ride(&mut self, ride: Ride) -> &mut Self {
        self.rides.insert(ride.id, ride);
        self
    }

    pub fn add_membership(&mut self, membership: RideRider) -> &mut Self {
        self.memberships.insert(membership.id, membership);
        self
    }

    pub fn add_request(&mut self, request: RideRiderRequest) -> &mut Self {
        self.requests.insert(request.id, request);
        self
    }

    pub fn add_task(&mut self, task: Task) -> &mut Self {
        self.tasks.insert(task.id, task);
        self
    }

    pub fn add_task_traveler(&mut self, link: TaskTraveler) -> &mut Self {
        self.task_travelers.push(link);
        self
    }

    pub fn add_task_member(&mut self, member: TaskViaTraveler) -> &mut Self {
        self.task_members.insert(member.id, member);
        self
    }

    pub fn add_address(&mut self, address: Address) -> &mut Self {
        self.addresses.insert(address.id, address);
        self
    }

    pub fn add_airport(&mut self, airport: Airport) -> &mut Self {
        self.airports.insert(airport.code.clone(), airport);
        self
    }

    pub fn add_agglo(&mut self, agglo: Agglo) -> &mut Self {
        self.agglos.insert(agglo.id, agglo);
        self
    }

    pub fn add_city(&mut self, city: City) -> &mut Self {
        self.cities.insert(city.id, city);
        self
    }

    pub fn add_neighborhood(&mut self, hood: Neighborhood) -> &mut Self {
        self.neighborhoods.insert(hood.id, hood);
        self
    }

    pub fn add_township(&mut self, township: Township) -> &mut Self {
        self.townships.push(township);
        self
    }

    fn ensure_ordinal_free(&self, trip_id: TripId, via_id: ViaId, ordinal: i32) -> StoreResult<()> {
        let holder = self
            .vias
            .values()
            .find(|v| v.trip_id == trip_id && v.ordinal == ordinal && v.id != via_id);
        match holder {
            Some(other) => Err(StoreError::Conflict(format!(
                "ordinal {} of trip {} already held by via {}",
                ordinal, trip_id, other.id
            ))),
            None => Ok(()),
        }
    }
}

/// One successful ordinal write, in application order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrdinalWrite {
    pub via_id: ViaId,
    pub ordinal: i32,
}

struct Shared {
    state: RwLock<StoreState>,
    writes: AtomicUsize,
    /// Number of writes still allowed before the next one fails.
    fail_after: Mutex<Option<usize>>,
    ordinal_log: Mutex<Vec<OrdinalWrite>>,
    /// Single permit held by the open transaction.
    tx_gate: Arc<Semaphore>,
}

/// Rollback guard held by a transaction handle.
struct TxGuard {
    shared: Arc<Shared>,
    snapshot: Mutex<Option<StoreState>>,
    permit: Mutex<Option<OwnedSemaphorePermit>>,
}

impl TxGuard {
    fn finish(&self, restore: bool) -> StoreResult<()> {
        let snapshot = self
            .snapshot
            .lock()
            .map_err(|_| poisoned("transaction"))?
            .take()
            .ok_or_else(|| StoreError::InvalidInput("transaction already finished".to_string()))?;
        if restore {
            let mut state = self.shared.state.write().map_err(|_| poisoned("state"))?;
            *state = snapshot;
        }
        self.permit.lock().map_err(|_| poisoned("transaction"))?.take();
        Ok(())
    }
}

impl Drop for TxGuard {
    fn drop(&mut self) {
        let pending = self.snapshot.get_mut().ok().and_then(|s| s.take());
        if let Some(snapshot) = pending {
            match self.shared.state.write() {
                Ok(mut state) => {
                    *state = snapshot;
                    tracing::warn!("Transaction dropped without commit, rolled back");
                }
                Err(_) => tracing::error!("State lock poisoned, dropped transaction not rolled back"),
            }
        }
    }
}

/// In-memory store. Cloning yields another handle to the same data.
#[derive(Clone)]
pub struct InMemoryStore {
    shared: Arc<Shared>,
    tx: Option<Arc<TxGuard>>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::from_state(StoreState::default())
    }

    pub fn from_state(state: StoreState) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: RwLock::new(state),
                writes: AtomicUsize::new(0),
                fail_after: Mutex::new(None),
                ordinal_log: Mutex::new(Vec::new()),
                tx_gate: Arc::new(Semaphore::new(1)),
            }),
            tx: None,
        }
    }

    /// Load a JSON snapshot.
    pub fn load_from_file(path: impl AsRef<Path>) -> StoreResult<Self> {
        let file = File::open(path.as_ref())?;
        let state: StoreState = serde_json::from_reader(BufReader::new(file))?;
        tracing::info!(
            vias = state.vias.len(),
            riders = state.riders.len(),
            tasks = state.tasks.len(),
            "Loaded store snapshot"
        );
        Ok(Self::from_state(state))
    }

    /// Save a JSON snapshot of the current state.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> StoreResult<()> {
        let state = self.snapshot()?;
        let file = File::create(path.as_ref())?;
        serde_json::to_writer_pretty(BufWriter::new(file), &state)?;
        tracing::info!(path = %path.as_ref().display(), "Saved store snapshot");
        Ok(())
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> StoreResult<StoreState> {
        self.read(|s| s.clone())
    }

    /// Mutate the state directly, bypassing constraints and counters.
    pub fn seed(&self, f: impl FnOnce(&mut StoreState)) {
        match self.shared.state.write() {
            Ok(mut state) => f(&mut state),
            Err(_) => tracing::warn!("State lock poisoned, seed skipped"),
        }
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> usize {
        self.shared.writes.load(Ordering::SeqCst)
    }

    /// Successful ordinal writes, in order.
    pub fn ordinal_log(&self) -> Vec<OrdinalWrite> {
        match self.shared.ordinal_log.lock() {
            Ok(log) => log.clone(),
            Err(_) => {
                tracing::warn!("Ordinal log lock poisoned");
                Vec::new()
            }
        }
    }

    pub fn clear_ordinal_log(&self) {
        match self.shared.ordinal_log.lock() {
            Ok(mut log) => log.clear(),
            Err(_) => tracing::warn!("Ordinal log lock poisoned, not cleared"),
        }
    }

    /// Let `n` more writes succeed, then fail the next one with a backend error.
    pub fn fail_after_writes(&self, n: usize) {
        match self.shared.fail_after.lock() {
            Ok(mut slot) => *slot = Some(n),
            Err(_) => tracing::warn!("Fault lock poisoned, injection not armed"),
        }
    }

    fn check_fault(&self, op: &str) -> StoreResult<()> {
        let mut slot = self.shared.fail_after.lock().map_err(|_| poisoned("fault"))?;
        match *slot {
            Some(0) => {
                *slot = None;
                Err(StoreError::Backend(format!("injected failure on {}", op)))
            }
            Some(n) => {
                *slot = Some(n - 1);
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn read<T>(&self, f: impl FnOnce(&StoreState) -> T) -> StoreResult<T> {
        let state = self.shared.state.read().map_err(|_| poisoned("state"))?;
        Ok(f(&state))
    }

    fn write<T>(&self, op: &str, f: impl FnOnce(&mut StoreState) -> StoreResult<T>) -> StoreResult<T> {
        self.check_fault(op)?;
        let mut state = self.shared.state.write().map_err(|_| poisoned("state"))?;
        let out = f(&mut state)?;
        self.shared.writes.fetch_add(1, Ordering::SeqCst);
        Ok(out)
    }

    fn log_ordinal(&self, via_id: ViaId, ordinal: i32) {
        match self.shared.ordinal_log.lock() {
            Ok(mut log) => log.push(OrdinalWrite { via_id, ordinal }),
            Err(_) => tracing::warn!(via_id = %via_id, ordinal, "Ordinal log lock poisoned, write not logged"),
        }
    }
}

fn poisoned(what: &str) -> StoreError {
    StoreError::Backend(format!("{} lock poisoned", what))
}

#[async_trait]
impl ItineraryStore for InMemoryStore {
    async fn trip_vias(&self, trip_id: TripId) -> StoreResult<Vec<Via>> {
        self.read(|s| {
            let mut vias: Vec<Via> = s.vias.values().filter(|v| v.trip_id == trip_id).cloned().collect();
            vias.sort_by_key(|v| v.ordinal);
            vias
        })
    }

    async fn insert_via(&self, via: &Via) -> StoreResult<()> {
        self.write("insert_via", |s| {
            if s.vias.contains_key(&via.id) {
                return Err(StoreError::Conflict(format!("via {} already exists", via.id)));
            }
            s.ensure_ordinal_free(via.trip_id, via.id, via.ordinal)?;
            s.vias.insert(via.id, via.clone());
            Ok(())
        })?;
        self.log_ordinal(via.id, via.ordinal);
        Ok(())
    }

    async fn update_via_ordinal(&self, via_id: ViaId, ordinal: i32) -> StoreResult<()> {
        self.write("update_via_ordinal", |s| {
            let trip_id = s
                .vias
                .get(&via_id)
                .map(|v| v.trip_id)
                .ok_or_else(|| StoreError::NotFound(format!("via {}", via_id)))?;
            s.ensure_ordinal_free(trip_id, via_id, ordinal)?;
            if let Some(via) = s.vias.get_mut(&via_id) {
                via.ordinal = ordinal;
            }
            Ok(())
        })?;
        self.log_ordinal(via_id, ordinal);
        Ok(())
    }

    async fn destroy_via(&self, via_id: ViaId) -> StoreResult<()> {
        self.write("destroy_via", |s| {
            if s.passengers.values().any(|p| p.via_id == via_id) {
                return Err(StoreError::InvariantViolation(format!(
                    "via {} still has passengers",
                    via_id
                )));
            }
            s.vias
                .remove(&via_id)
                .map(|_| ())
                .ok_or_else(|| StoreError::NotFound(format!("via {}", via_id)))
        })
    }

    async fn passengers_of_vias(&self, via_ids: &[ViaId]) -> StoreResult<Vec<ViaTraveler>> {
        self.read(|s| {
            s.passengers
                .values()
                .filter(|p| via_ids.contains(&p.via_id))
                .cloned()
                .collect()
        })
    }

    async fn destroy_passengers(&self, ids: &[ViaTravelerId]) -> StoreResult<usize> {
        self.write("destroy_passengers", |s| {
            let referenced = s
                .rider_travelers
                .iter()
                .map(|rt| rt.via_traveler_id)
                .chain(s.task_members.values().map(|m| m.via_traveler_id))
                .find(|id| ids.contains(id));
            if let Some(id) = referenced {
                return Err(StoreError::InvariantViolation(format!(
                    "passenger {} is still referenced",
                    id
                )));
            }
            let before = s.passengers.len();
            s.passengers.retain(|id, _| !ids.contains(id));
            Ok(before - s.passengers.len())
        })
    }
}

#[async_trait]
impl RideStore for InMemoryStore {
    async fn rider_travelers_for_passengers(
        &self,
        passenger_ids: &[ViaTravelerId],
    ) -> StoreResult<Vec<RiderTraveler>> {
        self.read(|s| {
            s.rider_travelers
                .iter()
                .filter(|rt| passenger_ids.contains(&rt.via_traveler_id))
                .cloned()
                .collect()
        })
    }

    async fn rider_travelers_of_riders(&self, rider_ids: &[RiderId]) -> StoreResult<Vec<RiderTraveler>> {
        self.read(|s| {
            s.rider_travelers
                .iter()
                .filter(|rt| rider_ids.contains(&rt.rider_id))
                .cloned()
                .collect()
        })
    }

    async fn destroy_rider_travelers(&self, passenger_ids: &[ViaTravelerId]) -> StoreResult<usize> {
        self.write("destroy_rider_travelers", |s| {
            let before = s.rider_travelers.len();
            s.rider_travelers
                .retain(|rt| !passenger_ids.contains(&rt.via_traveler_id));
            let travelers = &s.rider_travelers;
            s.rider_users.retain(|ru| {
                travelers
                    .iter()
                    .any(|rt| rt.rider_id == ru.rider_id && rt.user_id == ru.user_id)
            });
            Ok(before - s.rider_travelers.len())
        })
    }

    async fn find_rider(&self, rider_id: RiderId) -> StoreResult<Option<Rider>> {
        self.read(|s| s.riders.get(&rider_id).cloned())
    }

    async fn destroy_rider(&self, rider_id: RiderId) -> StoreResult<()> {
        self.write("destroy_rider", |s| {
            if s.memberships.values().any(|m| m.rider_id == rider_id) {
                return Err(StoreError::InvariantViolation(format!(
                    "rider {} still holds ride memberships",
                    rider_id
                )));
            }
            s.riders
                .remove(&rider_id)
                .ok_or_else(|| StoreError::NotFound(format!("rider {}", rider_id)))?;
            s.rider_travelers.retain(|rt| rt.rider_id != rider_id);
            s.rider_users.retain(|ru| ru.rider_id != rider_id);
            Ok(())
        })
    }

    async fn find_ride(&self, ride_id: RideId) -> StoreResult<Option<Ride>> {
        self.read(|s| s.rides.get(&ride_id).cloned())
    }

    async fn destroy_ride(&self, ride_id: RideId) -> StoreResult<()> {
        self.write("destroy_ride", |s| {
            if s.memberships.values().any(|m| m.ride_id == ride_id) {
                return Err(StoreError::InvariantViolation(format!(
                    "ride {} still has memberships",
                    ride_id
                )));
            }
            s.rides
                .remove(&ride_id)
                .map(|_| ())
                .ok_or_else(|| StoreError::NotFound(format!("ride {}", ride_id)))
        })
    }

    async fn memberships_of_riders(
        &self,
        rider_ids: &[RiderId],
        statuses: &[RideRiderStatus],
    ) -> StoreResult<Vec<RideRider>> {
        self.read(|s| {
            s.memberships
                .values()
                .filter(|m| rider_ids.contains(&m.rider_id))
                .filter(|m| statuses.is_empty() || statuses.contains(&m.status))
                .cloned()
                .collect()
        })
    }

    async fn memberships_of_ride(&self, ride_id: RideId) -> StoreResult<Vec<RideRider>> {
        self.read(|s| {
            s.memberships
                .values()
                .filter(|m| m.ride_id == ride_id)
                .cloned()
                .collect()
        })
    }

    async fn update_membership_status(
        &self,
        id: RideRiderId,
        status: RideRiderStatus,
    ) -> StoreResult<()> {
        self.write("update_membership_status", |s| {
            let membership = s
                .memberships
                .get(&id)
                .cloned()
                .ok_or_else(|| StoreError::NotFound(format!("ride rider {}", id)))?;
            if status.is_current() {
                let taken = s.memberships.values().any(|m| {
                    m.id != id && m.rider_id == membership.rider_id && m.status.is_current()
                });
                if taken {
                    return Err(StoreError::Conflict(format!(
                        "rider {} already holds a current membership",
                        membership.rider_id
                    )));
                }
            }
            if status.is_owner() {
                let taken = s
                    .memberships
                    .values()
                    .any(|m| m.id != id && m.ride_id == membership.ride_id && m.status.is_owner());
                if taken {
                    return Err(StoreError::Conflict(format!(
                        "ride {} already has an owner",
                        membership.ride_id
                    )));
                }
            }
            if let Some(m) = s.memberships.get_mut(&id) {
                m.status = status;
            }
            Ok(())
        })
    }

    async fn destroy_membership(&self, id: RideRiderId) -> StoreResult<()> {
        self.write("destroy_membership", |s| {
            if s.requests.values().any(|r| r.ride_rider_id == id) {
                return Err(StoreError::InvariantViolation(format!(
                    "ride rider {} still has pending requests",
                    id
                )));
            }
            s.memberships
                .remove(&id)
                .map(|_| ())
                .ok_or_else(|| StoreError::NotFound(format!("ride rider {}", id)))
        })
    }

    async fn requests_of_membership(&self, id: RideRiderId) -> StoreResult<Vec<RideRiderRequest>> {
        self.read(|s| {
            s.requests
                .values()
                .filter(|r| r.ride_rider_id == id)
                .cloned()
                .collect()
        })
    }

    async fn destroy_requests(&self, ids: &[RequestId]) -> StoreResult<usize> {
        self.write("destroy_requests", |s| {
            let before = s.requests.len();
            s.requests.retain(|id, _| !ids.contains(id));
            Ok(before - s.requests.len())
        })
    }
}

#[async_trait]
impl TaskStore for InMemoryStore {
    async fn task_members_for_passengers(
        &self,
        passenger_ids: &[ViaTravelerId],
    ) -> StoreResult<Vec<TaskViaTraveler>> {
        self.read(|s| {
            s.task_members
                .values()
                .filter(|m| passenger_ids.contains(&m.via_traveler_id))
                .cloned()
                .collect()
        })
    }

    async fn task_members(&self, task_id: TaskId) -> StoreResult<Vec<TaskViaTraveler>> {
        self.read(|s| {
            s.task_members
                .values()
                .filter(|m| m.task_id == task_id)
                .cloned()
                .collect()
        })
    }

    async fn task_beneficiaries(&self, task_id: TaskId) -> StoreResult<Vec<TaskTraveler>> {
        self.read(|s| {
            s.task_travelers
                .iter()
                .filter(|t| t.task_id == task_id)
                .cloned()
                .collect()
        })
    }

    async fn update_task_member_status(
        &self,
        id: TaskViaTravelerId,
        status: TaskMemberStatus,
    ) -> StoreResult<()> {
        self.write("update_task_member_status", |s| {
            let member = s
                .task_members
                .get_mut(&id)
                .ok_or_else(|| StoreError::NotFound(format!("task member {}", id)))?;
            member.status = status;
            Ok(())
        })
    }

    async fn destroy_task_members(&self, ids: &[TaskViaTravelerId]) -> StoreResult<usize> {
        self.write("destroy_task_members", |s| {
            let before = s.task_members.len();
            s.task_members.retain(|id, _| !ids.contains(id));
            Ok(before - s.task_members.len())
        })
    }

    async fn destroy_task(&self, task_id: TaskId) -> StoreResult<()> {
        self.write("destroy_task", |s| {
            if s.task_members.values().any(|m| m.task_id == task_id) {
                return Err(StoreError::InvariantViolation(format!(
                    "task {} still has members",
                    task_id
                )));
            }
            s.tasks
                .remove(&task_id)
                .ok_or_else(|| StoreError::NotFound(format!("task {}", task_id)))?;
            s.task_travelers.retain(|t| t.task_id != task_id);
            Ok(())
        })
    }
}

#[async_trait]
impl GeoStore for InMemoryStore {
    async fn find_airport(&self, code: &AirportCode) -> StoreResult<Option<Airport>> {
        self.read(|s| s.airports.get(code).cloned())
    }

    async fn agglos(&self, ids: &[AggloId]) -> StoreResult<Vec<Agglo>> {
        self.read(|s| ids.iter().filter_map(|id| s.agglos.get(id).cloned()).collect())
    }

    async fn city_neighborhoods(
        &self,
        city_id: CityId,
        agglo_ids: &[AggloId],
    ) -> StoreResult<CityNeighborhoods> {
        self.read(|s| {
            let sub_hoods = s
                .neighborhoods
                .values()
                .filter(|n| n.city_id == Some(city_id) && agglo_ids.contains(&n.agglo_id))
                .cloned()
                .collect();
            let suburb_ids: BTreeSet<NeighborhoodId> = s
                .townships
                .iter()
                .filter(|t| t.city_id == city_id)
                .map(|t| t.neighborhood_id)
                .collect();
            let suburbs = suburb_ids
                .iter()
                .filter_map(|id| s.neighborhoods.get(id))
                .filter(|n| agglo_ids.contains(&n.agglo_id))
                .cloned()
                .collect();
            CityNeighborhoods { sub_hoods, suburbs }
        })
    }

    async fn find_city(&self, name: &str, country_code: &str) -> StoreResult<Option<City>> {
        self.read(|s| {
            s.cities
                .values()
                .find(|c| {
                    c.name.eq_ignore_ascii_case(name)
                        && c.country_code.eq_ignore_ascii_case(country_code)
                })
                .cloned()
        })
    }

    async fn find_address(&self, id: AddressId) -> StoreResult<Option<Address>> {
        self.read(|s| s.addresses.get(&id).cloned())
    }

    async fn address_in_use(&self, id: AddressId) -> StoreResult<bool> {
        self.read(|s| {
            let saved = s.addresses.get(&id).map(|a| a.saved_by.is_some()).unwrap_or(false);
            saved
                || s.riders.values().any(|r| r.address_id == Some(id))
                || s.rides.values().any(|r| r.address_id == Some(id))
        })
    }

    async fn destroy_address(&self, id: AddressId) -> StoreResult<()> {
        self.write("destroy_address", |s| {
            s.addresses
                .remove(&id)
                .map(|_| ())
                .ok_or_else(|| StoreError::NotFound(format!("address {}", id)))
        })
    }
}

#[async_trait]
impl TransactionalStore for InMemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>> {
        let permit = self
            .shared
            .tx_gate
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| StoreError::Backend("transaction gate closed".to_string()))?;
        let snapshot = self.snapshot()?;
        let guard = TxGuard {
            shared: self.shared.clone(),
            snapshot: Mutex::new(Some(snapshot)),
            permit: Mutex::new(Some(permit)),
        };
        Ok(Box::new(InMemoryStore {
            shared: self.shared.clone(),
            tx: Some(Arc::new(guard)),
        }))
    }
}

#[async_trait]
impl StoreTransaction for InMemoryStore {
    async fn commit(&self) -> StoreResult<()> {
        match &self.tx {
            Some(guard) => guard.finish(false),
            None => Err(StoreError::InvalidInput("not inside a transaction".to_string())),
        }
    }

    async fn rollback(&self) -> StoreResult<()> {
        match &self.tx {
            Some(guard) => guard.finish(true),
            None => Err(StoreError::InvalidInput("not inside a transaction".to_string())),
        }
    }
}

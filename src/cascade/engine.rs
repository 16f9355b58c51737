//! Passenger removal cascade.

use futures_util::future::try_join;
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, info, warn};

use crate::cascade::report::CascadeReport;
use crate::cascade::{ride_side, task_side};
use crate::config::{CascadeConfig, MembershipConfig};
use crate::error::{EngineError, EngineResult};
use crate::membership::MembershipRanking;
use crate::model::{RiderId, TaskViaTraveler, ViaTravelerId};
use crate::store::EngineStore;

/// Removes passenger links and everything that depends on them.
#[derive(Debug, Clone)]
pub struct CascadeConsistencyEngine {
    config: CascadeConfig,
    ranking: MembershipRanking,
}

/// Read-only resolution of what a removal touches.
#[derive(Debug, Default)]
struct Affected {
    empty_riders: Vec<RiderId>,
    trimmed_riders: Vec<RiderId>,
    reviewable: Vec<TaskViaTraveler>,
    other_task_rows: Vec<TaskViaTraveler>,
}

impl CascadeConsistencyEngine {
    pub fn new(config: CascadeConfig, membership: &MembershipConfig) -> Self {
        Self {
            config,
            ranking: MembershipRanking::new(membership.priorities.clone()),
        }
    }

    /// Destroy the given passenger rows with their dependents.
    ///
    /// Must run inside the caller's transaction: on `Err` the store may hold
    /// a partial cascade and the transaction has to roll back.
    pub async fn destroy_passengers<S>(&self, store: &S, passenger_ids: &[ViaTravelerId]) -> EngineResult<CascadeReport>
    where
        S: EngineStore + ?Sized,
    {
        let ids: Vec<ViaTravelerId> = passenger_ids
            .iter()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if ids.is_empty() {
            return Ok(CascadeReport::default());
        }

        let affected = self.resolve(store, &ids).await?;
        debug!(
            passengers = ids.len(),
            empty_riders = affected.empty_riders.len(),
            trimmed_riders = affected.trimmed_riders.len(),
            reviewable = affected.reviewable.len(),
            "Cascade resolved"
        );

        let mut report = CascadeReport {
            riders_trimmed: affected.trimmed_riders.clone(),
            ..CascadeReport::default()
        };

        // Detach passengers from riders that keep other travelers.
        if !affected.trimmed_riders.is_empty() {
            report.traveler_links_removed = store
                .destroy_rider_travelers(&ids)
                .await
                .map_err(EngineError::consistency("cascade:unlink"))?;
        }

        let ride_side = async {
            ride_side::release_riders(
                store,
                &self.ranking,
                self.config.release_orphan_addresses,
                &affected.empty_riders,
            )
            .await
            .map_err(EngineError::consistency("cascade:ride"))
        };
        let task_side = async {
            let mut released = task_side::release_members(store, &affected.reviewable)
                .await
                .map_err(EngineError::consistency("cascade:task"))?;
            let purged = task_side::purge_members(store, &affected.other_task_rows)
                .await
                .map_err(EngineError::consistency("cascade:task"))?;
            released.merge(purged);
            Ok::<_, EngineError>(released)
        };
        let (rides, tasks) = try_join(ride_side, task_side).await?;
        report.merge(rides);
        report.merge(tasks);

        report.passengers_removed = store
            .destroy_passengers(&ids)
            .await
            .map_err(EngineError::consistency("cascade:passengers"))?;

        report.record_metrics();
        info!(
            passengers = report.passengers_removed,
            riders = report.riders_destroyed.len(),
            rides_dissolved = report.rides_dissolved.len(),
            task_members = report.task_members_removed,
            tasks = report.tasks_destroyed.len(),
            "Passengers removed"
        );
        Ok(report)
    }

    async fn resolve<S>(&self, store: &S, ids: &[ViaTravelerId]) -> EngineResult<Affected>
    where
        S: EngineStore + ?Sized,
    {
        let (links, task_rows) = try_join(
            store.rider_travelers_for_passengers(ids),
            store.task_members_for_passengers(ids),
        )
        .await
        .map_err(EngineError::consistency("cascade:resolve"))?;

        let rider_ids: Vec<RiderId> = links
            .iter()
            .map(|l| l.rider_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut affected = Affected::default();
        if !rider_ids.is_empty() {
            let (all_links, memberships) = try_join(
                store.rider_travelers_of_riders(&rider_ids),
                store.memberships_of_riders(&rider_ids, &[]),
            )
            .await
            .map_err(EngineError::consistency("cascade:resolve"))?;

            let removed: HashSet<ViaTravelerId> = ids.iter().copied().collect();
            let keeping: HashSet<RiderId> = all_links
                .iter()
                .filter(|l| !removed.contains(&l.via_traveler_id))
                .map(|l| l.rider_id)
                .collect();

            for rider_id in rider_ids {
                if keeping.contains(&rider_id) {
                    let riding = memberships
                        .iter()
                        .filter(|m| m.rider_id == rider_id && m.status.is_current())
                        .count();
                    if riding > 0 {
                        warn!(
                            rider_id = %rider_id,
                            "Rider lost travelers but keeps its ride; seat and luggage counts are not recomputed"
                        );
                    }
                    affected.trimmed_riders.push(rider_id);
                } else {
                    affected.empty_riders.push(rider_id);
                }
            }
        }

        let (reviewable, other): (Vec<_>, Vec<_>) = task_rows
            .into_iter()
            .partition(|m| self.config.reviewable_task_statuses.contains(&m.status));
        affected.reviewable = reviewable;
        affected.other_task_rows = other;
        Ok(affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        Address, AddressDetails, AddressId, AirportCode, BookingStatus, GeoPoint, RequestId, Ride,
        RideId, RideRider, RideRiderId, RideRiderRequest, RideRiderStatus, RideStatus, Rider,
        RiderTraveler, Task, TaskId, TaskMemberStatus, TaskTraveler, TaskViaTravelerId,
        TravelerId, UserId, ViaId, ViaTraveler,
    };
    use crate::store::memory::InMemoryStore;
    use chrono::{Duration, Utc};

    fn engine() -> CascadeConsistencyEngine {
        CascadeConsistencyEngine::new(CascadeConfig::default(), &MembershipConfig::default())
    }

    fn passenger(store: &InMemoryStore, via_id: ViaId) -> ViaTraveler {
        let p = ViaTraveler {
            id: ViaTravelerId::new(),
            via_id,
            traveler_id: TravelerId::new(),
            user_id: UserId::new(),
            booking_status: BookingStatus::Booked,
            volunteer: false,
        };
        store.seed(|s| {
            s.add_passenger(p.clone());
        });
        p
    }

    fn rider(store: &InMemoryStore, via_id: ViaId, passengers: &[&ViaTraveler], address: Option<AddressId>) -> Rider {
        let r = Rider {
            id: RiderId::new(),
            via_id,
            address_id: address,
            to_airport: true,
            seat_count: passengers.len() as u8,
            luggage_count: 1,
        };
        store.seed(|s| {
            s.add_rider(r.clone());
            for p in passengers {
                s.link_rider_traveler(RiderTraveler {
                    rider_id: r.id,
                    via_traveler_id: p.id,
                    traveler_id: p.traveler_id,
                    user_id: p.user_id,
                });
            }
        });
        r
    }

    fn ride(store: &InMemoryStore) -> Ride {
        let ride = Ride {
            id: RideId::new(),
            status: Some(RideStatus::CabShare),
            airport: AirportCode::new("AMS"),
            address_id: None,
            seat_count: 4,
            luggage_count: 4,
            public: false,
        };
        store.seed(|s| {
            s.add_ride(ride.clone());
        });
        ride
    }

    fn join(store: &InMemoryStore, ride: &Ride, rider: &Rider, status: RideRiderStatus, minutes: i64) -> RideRider {
        let m = RideRider {
            id: RideRiderId::new(),
            ride_id: ride.id,
            rider_id: rider.id,
            status,
            joined_at: Utc::now() + Duration::minutes(minutes),
        };
        store.seed(|s| {
            s.add_membership(m.clone());
        });
        m
    }

    fn task(store: &InMemoryStore) -> Task {
        let task = Task {
            id: TaskId::new(),
            neighborhood_id: None,
            airport: AirportCode::new("AMS"),
            earliest: Utc::now(),
            latest: Utc::now() + Duration::hours(3),
        };
        store.seed(|s| {
            s.add_task(task.clone());
        });
        task
    }

    fn enlist(store: &InMemoryStore, task: &Task, p: &ViaTraveler, status: TaskMemberStatus) -> TaskViaTraveler {
        let m = TaskViaTraveler {
            id: TaskViaTravelerId::new(),
            task_id: task.id,
            via_traveler_id: p.id,
            traveler_id: p.traveler_id,
            status,
        };
        store.seed(|s| {
            s.add_task_member(m.clone());
        });
        m
    }

    #[tokio::test]
    async fn test_empty_rider_destroyed_and_ownership_handed_over() {
        let store = InMemoryStore::new();
        let via = ViaId::new();
        let address = Address {
            id: AddressId::new(),
            location: GeoPoint::new(52.37, 4.89),
            city_id: None,
            saved_by: None,
            details: AddressDetails::default(),
        };
        store.seed(|s| {
            s.add_address(address.clone());
        });
        let p1 = passenger(&store, via);
        let p2 = passenger(&store, via);
        let leaving = rider(&store, via, &[&p1], Some(address.id));
        let staying = rider(&store, via, &[&p2], None);
        let ride = ride(&store);
        join(&store, &ride, &leaving, RideRiderStatus::Owner, 0);
        let heir = join(&store, &ride, &staying, RideRiderStatus::Joined, 10);

        let report = engine().destroy_passengers(&store, &[p1.id]).await.unwrap();

        assert_eq!(report.passengers_removed, 1);
        assert_eq!(report.riders_destroyed, vec![leaving.id]);
        assert_eq!(report.owners_promoted, vec![heir.id]);
        assert_eq!(report.addresses_released, vec![address.id]);

        let state = store.snapshot().unwrap();
        assert!(!state.riders.contains_key(&leaving.id));
        assert!(!state.passengers.contains_key(&p1.id));
        assert_eq!(state.memberships[&heir.id].status, RideRiderStatus::Owner);
        assert!(state.rider_travelers.iter().all(|rt| rt.rider_id != leaving.id));
        assert!(state.rider_users.iter().all(|ru| ru.rider_id != leaving.id));
        assert!(state.addresses.is_empty());
    }

    #[tokio::test]
    async fn test_ride_dissolved_without_current_members() {
        let store = InMemoryStore::new();
        let via = ViaId::new();
        let p1 = passenger(&store, via);
        let p2 = passenger(&store, via);
        let owner = rider(&store, via, &[&p1], None);
        let hopeful = rider(&store, via, &[&p2], None);
        let ride = ride(&store);
        join(&store, &ride, &owner, RideRiderStatus::Owner, 0);
        let application = join(&store, &ride, &hopeful, RideRiderStatus::Applied, 5);
        store.seed(|s| {
            s.add_request(RideRiderRequest {
                id: RequestId::new(),
                ride_rider_id: application.id,
                counter: false,
                seat_count: 1,
                luggage_count: 0,
            });
        });

        let report = engine().destroy_passengers(&store, &[p1.id]).await.unwrap();

        assert_eq!(report.rides_dissolved, vec![ride.id]);
        assert_eq!(report.memberships_released, 2);
        assert_eq!(report.requests_destroyed, 1);
        let state = store.snapshot().unwrap();
        assert!(state.rides.is_empty());
        assert!(state.memberships.is_empty());
        assert!(state.riders.contains_key(&hopeful.id));
    }

    #[tokio::test]
    async fn test_driver_offer_dissolved_when_driver_leaves() {
        let store = InMemoryStore::new();
        let via = ViaId::new();
        let p1 = passenger(&store, via);
        let p2 = passenger(&store, via);
        let driver = rider(&store, via, &[&p1], None);
        let rider_left = rider(&store, via, &[&p2], None);
        let offer = Ride {
            id: RideId::new(),
            status: Some(RideStatus::DriverOffer),
            airport: AirportCode::new("AMS"),
            address_id: None,
            seat_count: 3,
            luggage_count: 2,
            public: true,
        };
        store.seed(|s| {
            s.add_ride(offer.clone());
        });
        join(&store, &offer, &driver, RideRiderStatus::Driver, 0);
        join(&store, &offer, &rider_left, RideRiderStatus::Passenger, 10);

        let report = engine().destroy_passengers(&store, &[p1.id]).await.unwrap();

        assert_eq!(report.rides_dissolved, vec![offer.id]);
        assert!(report.owners_promoted.is_empty());
        assert_eq!(report.memberships_released, 2);
        let state = store.snapshot().unwrap();
        assert!(state.rides.is_empty());
        assert!(state.memberships.is_empty());
        assert!(state.riders.contains_key(&rider_left.id));
    }

    #[tokio::test]
    async fn test_rider_keeping_travelers_is_only_unlinked() {
        let store = InMemoryStore::new();
        let via = ViaId::new();
        let p1 = passenger(&store, via);
        let p2 = passenger(&store, via);
        let shared = rider(&store, via, &[&p1, &p2], None);

        let report = engine().destroy_passengers(&store, &[p1.id]).await.unwrap();

        assert!(report.riders_destroyed.is_empty());
        assert_eq!(report.riders_trimmed, vec![shared.id]);
        assert_eq!(report.traveler_links_removed, 1);
        let state = store.snapshot().unwrap();
        let rider_row = &state.riders[&shared.id];
        // Capacity is left as it was.
        assert_eq!(rider_row.seat_count, 2);
        assert_eq!(state.rider_travelers.len(), 1);
        assert_eq!(state.rider_users.len(), 1);
        assert_eq!(state.rider_users[0].user_id, p2.user_id);
    }

    #[tokio::test]
    async fn test_last_helpee_destroys_task() {
        let store = InMemoryStore::new();
        let via = ViaId::new();
        let helpee = passenger(&store, via);
        let helper = passenger(&store, via);
        let t = task(&store);
        enlist(&store, &t, &helpee, TaskMemberStatus::Helpee);
        enlist(&store, &t, &helper, TaskMemberStatus::Helper);

        let report = engine().destroy_passengers(&store, &[helpee.id]).await.unwrap();

        assert_eq!(report.tasks_destroyed, vec![t.id]);
        assert_eq!(report.task_members_removed, 2);
        let state = store.snapshot().unwrap();
        assert!(state.tasks.is_empty());
        assert!(state.task_members.is_empty());
    }

    #[tokio::test]
    async fn test_task_with_beneficiaries_survives_helpee_loss() {
        let store = InMemoryStore::new();
        let via = ViaId::new();
        let helpee = passenger(&store, via);
        let t = task(&store);
        enlist(&store, &t, &helpee, TaskMemberStatus::Helpee);
        store.seed(|s| {
            s.add_task_traveler(TaskTraveler {
                task_id: t.id,
                traveler_id: TravelerId::new(),
            });
        });

        let report = engine().destroy_passengers(&store, &[helpee.id]).await.unwrap();

        assert!(report.tasks_destroyed.is_empty());
        assert!(store.snapshot().unwrap().tasks.contains_key(&t.id));
    }

    #[tokio::test]
    async fn test_backup_promoted_when_helper_leaves() {
        let store = InMemoryStore::new();
        let via = ViaId::new();
        let helpee = passenger(&store, via);
        let helper = passenger(&store, via);
        let backup = passenger(&store, via);
        let declined = passenger(&store, via);
        let t = task(&store);
        enlist(&store, &t, &helpee, TaskMemberStatus::Helpee);
        enlist(&store, &t, &helper, TaskMemberStatus::Helper);
        let standby = enlist(&store, &t, &backup, TaskMemberStatus::Backup);
        enlist(&store, &t, &declined, TaskMemberStatus::Denied);

        let report = engine()
            .destroy_passengers(&store, &[helper.id, declined.id])
            .await
            .unwrap();

        assert_eq!(report.helpers_promoted, vec![standby.id]);
        assert_eq!(report.task_members_removed, 2);
        let state = store.snapshot().unwrap();
        assert_eq!(state.task_members[&standby.id].status, TaskMemberStatus::Helper);
        assert_eq!(state.task_members.len(), 2);
        assert_eq!(state.passengers.len(), 2);
    }

    #[tokio::test]
    async fn test_no_passengers_is_noop() {
        let store = InMemoryStore::new();
        let report = engine().destroy_passengers(&store, &[]).await.unwrap();
        assert_eq!(report, CascadeReport::default());
        assert_eq!(store.write_count(), 0);
    }
}

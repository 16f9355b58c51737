//! Shared fixtures for integration and load testing.
#![allow(dead_code)]

use chrono::{Duration, TimeZone, Utc};
use std::collections::{BTreeSet, HashSet};

use trip_engine::model::{
    AirportCode, BookingStatus, Endpoint, Ride, RideId, RideRider, RideRiderId, RideRiderStatus,
    RideStatus, Rider, RiderId, RiderTraveler, Task, TaskId, TaskMemberStatus, TaskViaTraveler,
    TaskViaTravelerId, TravelerId, Trip, TripId, UserId, Via, ViaId, ViaTraveler, ViaTravelerId,
};
use trip_engine::store::{InMemoryStore, StoreState};
use trip_engine::{Engine, EngineConfig};

/// Build an unsaved via of `trip_id` at `ordinal`.
pub fn via(trip_id: TripId, ordinal: i32) -> Via {
    let departure = Utc.with_ymd_and_hms(2026, 6, 1, 8, 0, 0).unwrap() + Duration::days(i64::from(ordinal));
    Via {
        id: ViaId::new(),
        trip_id,
        ordinal,
        departure: Endpoint {
            airport: AirportCode::new("lhr"),
            terminal: Some("2".into()),
            time: departure,
        },
        arrival: Endpoint {
            airport: AirportCode::new("sin"),
            terminal: Some("1".into()),
            time: departure + Duration::hours(13),
        },
    }
}

/// Seed a trip with `n` vias at ordinals `0..n`.
pub fn seed_trip(store: &InMemoryStore, n: i32) -> Trip {
    let trip_id = TripId::new();
    let vias: Vec<Via> = (0..n).map(|i| via(trip_id, i)).collect();
    store.seed(|s| {
        for v in &vias {
            s.add_via(v.clone());
        }
    });
    Trip::new(trip_id, vias)
}

pub fn passenger(store: &InMemoryStore, via_id: ViaId) -> ViaTraveler {
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

pub fn rider(store: &InMemoryStore, via_id: ViaId, passengers: &[&ViaTraveler]) -> Rider {
    let r = Rider {
        id: RiderId::new(),
        via_id,
        address_id: None,
        to_airport: false,
        seat_count: passengers.len() as u8,
        luggage_count: passengers.len() as u8,
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

pub fn ride(store: &InMemoryStore, status: RideStatus) -> Ride {
    let ride = Ride {
        id: RideId::new(),
        status: Some(status),
        airport: AirportCode::new("SIN"),
        address_id: None,
        seat_count: 3,
        luggage_count: 3,
        public: true,
    };
    store.seed(|s| {
        s.add_ride(ride.clone());
    });
    ride
}

pub fn membership(
    store: &InMemoryStore,
    ride: &Ride,
    rider: &Rider,
    status: RideRiderStatus,
    minutes: i64,
) -> RideRider {
    let m = RideRider {
        id: RideRiderId::new(),
        ride_id: ride.id,
        rider_id: rider.id,
        status,
        joined_at: Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap() + Duration::minutes(minutes),
    };
    store.seed(|s| {
        s.add_membership(m.clone());
    });
    m
}

pub fn task(store: &InMemoryStore) -> Task {
    let task = Task {
        id: TaskId::new(),
        neighborhood_id: None,
        airport: AirportCode::new("SIN"),
        earliest: Utc.with_ymd_and_hms(2026, 6, 1, 20, 0, 0).unwrap(),
        latest: Utc.with_ymd_and_hms(2026, 6, 1, 23, 0, 0).unwrap(),
    };
    store.seed(|s| {
        s.add_task(task.clone());
    });
    task
}

pub fn task_member(
    store: &InMemoryStore,
    task: &Task,
    passenger: &ViaTraveler,
    status: TaskMemberStatus,
) -> TaskViaTraveler {
    let m = TaskViaTraveler {
        id: TaskViaTravelerId::new(),
        task_id: task.id,
        via_traveler_id: passenger.id,
        traveler_id: passenger.traveler_id,
        status,
    };
    store.seed(|s| {
        s.add_task_member(m.clone());
    });
    m
}

pub fn engine(store: &InMemoryStore) -> Engine<InMemoryStore> {
    Engine::new(store.clone(), EngineConfig::default())
}

/// Stored `(via, ordinal)` pairs of a trip, by ordinal.
pub fn stored_order(store: &InMemoryStore, trip_id: TripId) -> Vec<(ViaId, i32)> {
    let state = store.snapshot().unwrap();
    let mut vias: Vec<(ViaId, i32)> = state
        .vias
        .values()
        .filter(|v| v.trip_id == trip_id)
        .map(|v| (v.id, v.ordinal))
        .collect();
    vias.sort_by_key(|(_, ordinal)| *ordinal);
    vias
}

/// The trip's live vias are exactly `expected`, at ordinals `0..n`.
pub fn assert_order(store: &InMemoryStore, trip_id: TripId, expected: &[ViaId]) {
    let stored = stored_order(store, trip_id);
    let want: Vec<(ViaId, i32)> = expected
        .iter()
        .enumerate()
        .map(|(i, id)| (*id, i as i32))
        .collect();
    assert_eq!(stored, want);
}

/// No row points at a row that no longer exists.
pub fn assert_no_dangling(state: &StoreState) {
    let passengers: HashSet<_> = state.passengers.keys().collect();
    for link in &state.rider_travelers {
        assert!(passengers.contains(&link.via_traveler_id), "rider link to missing passenger");
        assert!(state.riders.contains_key(&link.rider_id), "traveler link of missing rider");
    }
    for user in &state.rider_users {
        assert!(state.riders.contains_key(&user.rider_id), "user link of missing rider");
    }
    for m in state.memberships.values() {
        assert!(state.riders.contains_key(&m.rider_id), "membership of missing rider");
        assert!(state.rides.contains_key(&m.ride_id), "membership in missing ride");
    }
    for r in state.requests.values() {
        assert!(state.memberships.contains_key(&r.ride_rider_id), "request of missing membership");
    }
    for m in state.task_members.values() {
        assert!(passengers.contains(&m.via_traveler_id), "task member of missing passenger");
        assert!(state.tasks.contains_key(&m.task_id), "member of missing task");
    }
    for p in state.passengers.values() {
        assert!(state.vias.contains_key(&p.via_id), "passenger of missing via");
    }

    let mut owners = BTreeSet::new();
    let mut riding = BTreeSet::new();
    for m in state.memberships.values() {
        if m.status.is_owner() {
            assert!(owners.insert(m.ride_id), "ride with two owners");
        }
        if m.status.is_current() {
            assert!(riding.insert(m.rider_id), "rider current in two rides");
        }
    }
}

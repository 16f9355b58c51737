//! Request-level entry point.
//!
//! `Engine` wires the four components to one configuration and one store.
//! Every mutating operation runs inside its own store transaction: it
//! commits on success and rolls back on any error, so callers never observe
//! a half-applied reorder or cascade.

use serde::Serialize;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use tracing::{warn, Instrument};

use crate::cascade::{CascadeConsistencyEngine, CascadeReport};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::geo::{GeoMatcher, Geocoder, LocatedAddress};
use crate::itinerary::{OrdinalReconciler, ViaReorderRequest};
use crate::membership::{CurrentRide, MembershipStateMachine, SuspendedRide};
use crate::model::{
    AddressPoint, Airport, AirportCode, GeoPoint, Neighborhood, Ride, RideRider, RiderId, Trip,
    TripId, ViaId, ViaTravelerId,
};
use crate::observability::{metrics, tracing::operation_span};
use crate::store::{EngineStore, GeoStore, ItineraryStore, StoreTransaction, TransactionalStore};

/// Outcome of a trip reorder.
#[derive(Debug, Clone, Serialize)]
pub struct ReorderOutcome {
    pub trip: Trip,
    /// Cascade run for the passengers of removed vias.
    pub cascade: CascadeReport,
}

pub struct Engine<S> {
    store: S,
    config: Arc<EngineConfig>,
    reconciler: OrdinalReconciler,
    membership: MembershipStateMachine,
    cascade: CascadeConsistencyEngine,
    geo: GeoMatcher,
}

impl<S> Engine<S>
where
    S: EngineStore + TransactionalStore,
{
    pub fn new(store: S, config: EngineConfig) -> Self {
        let config = Arc::new(config);
        Self {
            reconciler: OrdinalReconciler::new(config.ordinals.clone()),
            membership: MembershipStateMachine::new(config.membership.clone()),
            cascade: CascadeConsistencyEngine::new(config.cascade.clone(), &config.membership),
            geo: GeoMatcher::haversine(config.geo.clone()),
            store,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn membership(&self) -> &MembershipStateMachine {
        &self.membership
    }

    /// Apply a new via order to a trip.
    ///
    /// The trip's vias are read inside the transaction. Passengers of removed
    /// vias are cascaded away before the vias are destroyed.
    pub async fn reorder_trip(&self, trip_id: TripId, request: ViaReorderRequest) -> EngineResult<ReorderOutcome> {
        self.transaction("reorder_trip", |tx| async move {
            let trip = Trip::new(trip_id, tx.trip_vias(trip_id).await?);
            request.validate(&trip, self.config.ordinals.max_vias_per_trip)?;

            let removed: Vec<ViaId> = request.removed_vias.iter().map(|v| v.id).collect();
            let cascade = if removed.is_empty() {
                CascadeReport::default()
            } else {
                let passengers: Vec<ViaTravelerId> =
                    tx.passengers_of_vias(&removed).await?.iter().map(|p| p.id).collect();
                self.cascade.destroy_passengers(&*tx, &passengers).await?
            };

            let trip = self.reconciler.reconcile(&*tx, trip, request).await?;
            Ok(ReorderOutcome { trip, cascade })
        })
        .await
    }

    /// Destroy passenger links with everything that depends on them.
    pub async fn remove_passengers(&self, passenger_ids: Vec<ViaTravelerId>) -> EngineResult<CascadeReport> {
        self.transaction("remove_passengers", |tx| async move {
            self.cascade.destroy_passengers(&*tx, &passenger_ids).await
        })
        .await
    }

    pub async fn approve(&self, caller: &RideRider, applicant: RideRider) -> EngineResult<RideRider> {
        self.transaction("approve", |tx| async move {
            self.membership.approve(&*tx, caller, applicant).await
        })
        .await
    }

    pub async fn deny(&self, caller: &RideRider, applicant: RideRider) -> EngineResult<RideRider> {
        self.transaction("deny", |tx| async move {
            self.membership.deny(&*tx, caller, applicant).await
        })
        .await
    }

    pub async fn killoff(&self, caller: &RideRider, applicant: &RideRider) -> EngineResult<()> {
        self.transaction("killoff", |tx| async move {
            self.membership.killoff(&*tx, caller, applicant).await
        })
        .await
    }

    pub async fn suspend(&self, member: RideRider) -> EngineResult<RideRider> {
        self.transaction("suspend", |tx| async move {
            self.membership.suspend(&*tx, member).await
        })
        .await
    }

    pub async fn resume(&self, member: RideRider) -> EngineResult<RideRider> {
        self.transaction("resume", |tx| async move {
            self.membership.resume(&*tx, member).await
        })
        .await
    }

    pub async fn find_current_ride(
        &self,
        rider_id: RiderId,
        caller: Option<&RideRider>,
        target_ride: Option<Ride>,
    ) -> EngineResult<Option<CurrentRide>> {
        let result = self
            .membership
            .find_current_ride(&self.store, rider_id, caller, target_ride)
            .instrument(operation_span("find_current_ride"))
            .await;
        observe("find_current_ride", result)
    }

    pub async fn find_suspend_ride(&self, rider_id: RiderId, for_reset: bool) -> EngineResult<Option<SuspendedRide>> {
        let result = self
            .membership
            .find_suspend_ride(&self.store, rider_id, for_reset)
            .instrument(operation_span("find_suspend_ride"))
            .await;
        observe("find_suspend_ride", result)
    }

    /// Neighborhood serving `address` for trips through the airport `code`.
    pub async fn find_neighborhood(
        &self,
        address: &AddressPoint,
        code: Option<&AirportCode>,
    ) -> EngineResult<Option<Neighborhood>> {
        let result = async {
            let airport = match code {
                Some(code) => Some(self.airport(code).await?),
                None => None,
            };
            self.geo.find_neighborhood(&self.store, address, airport.as_ref()).await
        }
        .instrument(operation_span("find_neighborhood"))
        .await;
        observe("find_neighborhood", result)
    }

    pub async fn create_neighborhood_map(
        &self,
        address: &AddressPoint,
        codes: &[AirportCode],
    ) -> EngineResult<BTreeMap<AirportCode, Option<Neighborhood>>> {
        let result = async {
            let mut airports = Vec::with_capacity(codes.len());
            for code in codes {
                airports.push(self.airport(code).await?);
            }
            self.geo.create_neighborhood_map(&self.store, address, &airports).await
        }
        .instrument(operation_span("create_neighborhood_map"))
        .await;
        observe("create_neighborhood_map", result)
    }

    pub async fn locate_address<G>(&self, geocoder: &G, location: GeoPoint) -> EngineResult<LocatedAddress>
    where
        G: Geocoder + ?Sized,
    {
        let result = self
            .geo
            .locate_address(&self.store, geocoder, location)
            .instrument(operation_span("locate_address"))
            .await;
        observe("locate_address", result)
    }

    async fn airport(&self, code: &AirportCode) -> EngineResult<Airport> {
        self.store
            .find_airport(code)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("airport {}", code)))
    }

    /// Run `f` inside a fresh transaction and an operation span.
    async fn transaction<T, F, Fut>(&self, operation: &'static str, f: F) -> EngineResult<T>
    where
        F: FnOnce(Arc<dyn StoreTransaction>) -> Fut,
        Fut: Future<Output = EngineResult<T>>,
    {
        let span = operation_span(operation);
        let result = async {
            let tx: Arc<dyn StoreTransaction> = Arc::from(self.store.begin().await?);
            match f(tx.clone()).await {
                Ok(value) => {
                    tx.commit().await?;
                    Ok(value)
                }
                Err(e) => {
                    if let Err(rollback) = tx.rollback().await {
                        warn!(error = %rollback, "Rollback failed");
                    }
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await;
        observe(operation, result)
    }
}

fn observe<T>(operation: &'static str, result: EngineResult<T>) -> EngineResult<T> {
    if let Err(e) = &result {
        warn!(operation, kind = e.kind(), error = %e, "Operation failed");
        metrics::record_operation_error(operation, e.kind());
    }
    result
}

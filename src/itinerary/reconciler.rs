//! Ordinal reconciliation.

use futures_util::future::try_join_all;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

use crate::config::OrdinalConfig;
use crate::error::{EngineError, EngineResult};
use crate::itinerary::request::ViaReorderRequest;
use crate::model::{Trip, Via, ViaId};
use crate::observability::metrics;
use crate::store::{ItineraryStore, StoreResult};

/// A pending ordinal write for the via at `index` in the final order.
#[derive(Debug, Clone, Copy)]
struct Placement {
    index: usize,
    ordinal: i32,
}

/// Scratch occupancy of the trip's ordinal slots during one reconciliation.
#[derive(Debug, Default)]
struct Occupancy {
    /// ordinal -> via currently holding it
    slots: HashMap<i32, ViaId>,
    /// via -> ordinal it currently holds
    held: HashMap<ViaId, i32>,
    /// vias already present in the store
    persisted: HashSet<ViaId>,
}

impl Occupancy {
    fn from_vias<'a>(vias: impl Iterator<Item = &'a Via>) -> Self {
        let mut occupancy = Self::default();
        for via in vias {
            occupancy.slots.insert(via.ordinal, via.id);
            occupancy.held.insert(via.id, via.ordinal);
            occupancy.persisted.insert(via.id);
        }
        occupancy
    }

    /// Another via still sits on `ordinal`.
    fn blocked(&self, ordinal: i32, via_id: ViaId) -> bool {
        matches!(self.slots.get(&ordinal), Some(holder) if *holder != via_id)
    }

    /// Move `via_id` onto `ordinal`. Returns the slot it vacated, if any.
    fn claim(&mut self, via_id: ViaId, ordinal: i32) -> Option<i32> {
        let vacated = self.held.insert(via_id, ordinal);
        if let Some(old) = vacated {
            if self.slots.get(&old) == Some(&via_id) {
                self.slots.remove(&old);
            }
        }
        self.slots.insert(ordinal, via_id);
        vacated
    }
}

/// Reorders a trip's vias while keeping `(trip_id, ordinal)` unique on every write.
///
/// Four passes, each awaited in full before the next starts:
/// 1. destroy removed vias
/// 2. assign every via whose target slot is free
/// 3. retry deferred vias one by one, parking still-blocked ones on a temporary ordinal
/// 4. move parked vias to their targets
#[derive(Debug, Clone)]
pub struct OrdinalReconciler {
    config: OrdinalConfig,
}

impl OrdinalReconciler {
    pub fn new(config: OrdinalConfig) -> Self {
        Self { config }
    }

    /// Apply `request` to `trip` and return the trip with its final vias.
    ///
    /// Any store failure is reported as a consistency error; the caller's
    /// transaction must then roll back.
    pub async fn reconcile<S>(&self, store: &S, trip: Trip, request: ViaReorderRequest) -> EngineResult<Trip>
    where
        S: ItineraryStore + ?Sized,
    {
        request.validate(&trip, self.config.max_vias_per_trip)?;
        let ViaReorderRequest {
            mut final_vias,
            removed_vias,
        } = request;

        // Phase 1: free the slots of removed vias.
        let removed: HashSet<ViaId> = removed_vias.iter().map(|v| v.id).collect();
        try_join_all(removed_vias.iter().map(|v| store.destroy_via(v.id)))
            .await
            .map_err(EngineError::consistency("reconcile:delete"))?;
        metrics::record_ordinal_writes("delete", removed.len());

        let mut occupancy = Occupancy::from_vias(trip.vias.iter().filter(|v| !removed.contains(&v.id)));

        // Phase 2: direct assignments. A write into a slot vacated during this
        // phase is scheduled one wave after the write that vacates it.
        let mut waves: Vec<Vec<Placement>> = Vec::new();
        let mut vacated_in: HashMap<i32, usize> = HashMap::new();
        let mut delayed: Vec<Placement> = Vec::new();
        for (index, via) in final_vias.iter().enumerate() {
            let ordinal = target_of(index)?;
            if occupancy.held.get(&via.id) == Some(&ordinal) {
                continue;
            }
            if occupancy.blocked(ordinal, via.id) {
                delayed.push(Placement { index, ordinal });
                continue;
            }
            let wave = vacated_in.get(&ordinal).map_or(0, |w| w + 1);
            if waves.len() <= wave {
                waves.resize_with(wave + 1, Vec::new);
            }
            waves[wave].push(Placement { index, ordinal });
            if let Some(old) = occupancy.claim(via.id, ordinal) {
                vacated_in.insert(old, wave);
            }
        }

        let mut direct = 0;
        for wave in &waves {
            try_join_all(wave.iter().map(|p| place(store, &occupancy, &final_vias[p.index], p.ordinal)))
                .await
                .map_err(EngineError::consistency("reconcile:direct"))?;
            direct += wave.len();
        }
        for wave in &waves {
            for p in wave {
                occupancy.persisted.insert(final_vias[p.index].id);
            }
        }
        metrics::record_ordinal_writes("direct", direct);
        debug!(
            trip_id = %trip.id,
            direct,
            waves = waves.len(),
            delayed = delayed.len(),
            "Direct assignment phase complete"
        );

        // Phase 3: sequential retry of deferred vias.
        let mut conflicted: Vec<Placement> = Vec::new();
        let mut relocated = 0;
        let mut parked = 0;
        for (n, placement) in delayed.iter().enumerate() {
            let via = &final_vias[placement.index];
            if !occupancy.blocked(placement.ordinal, via.id) {
                place(store, &occupancy, via, placement.ordinal)
                    .await
                    .map_err(EngineError::consistency("reconcile:relocate"))?;
                occupancy.claim(via.id, placement.ordinal);
                occupancy.persisted.insert(via.id);
                relocated += 1;
                continue;
            }
            if occupancy.persisted.contains(&via.id) {
                let temporary = self.temporary_ordinal(n)?;
                store
                    .update_via_ordinal(via.id, temporary)
                    .await
                    .map_err(EngineError::consistency("reconcile:relocate"))?;
                occupancy.claim(via.id, temporary);
                relocated += 1;
                parked += 1;
            }
            // A new via holds no slot yet; it waits for phase 4 without a write.
            conflicted.push(*placement);
        }
        metrics::record_ordinal_writes("relocate", relocated);
        metrics::record_temporary_relocations(parked);

        // Phase 4: every real target is now free.
        try_join_all(
            conflicted
                .iter()
                .map(|p| place(store, &occupancy, &final_vias[p.index], p.ordinal)),
        )
        .await
        .map_err(EngineError::consistency("reconcile:final"))?;
        metrics::record_ordinal_writes("final", conflicted.len());

        for (index, via) in final_vias.iter_mut().enumerate() {
            via.ordinal = target_of(index)?;
        }

        info!(
            trip_id = %trip.id,
            vias = final_vias.len(),
            removed = removed.len(),
            direct,
            relocated,
            parked,
            "Trip reconciled"
        );

        Ok(Trip {
            id: trip.id,
            vias: final_vias,
        })
    }

    fn temporary_ordinal(&self, n: usize) -> EngineResult<i32> {
        i32::try_from(n)
            .ok()
            .and_then(|n| self.config.temporary_base.checked_add(n))
            .ok_or_else(|| EngineError::InvalidInput("temporary ordinal out of range".to_string()))
    }
}

fn target_of(index: usize) -> EngineResult<i32> {
    i32::try_from(index).map_err(|_| EngineError::InvalidInput(format!("via index {} out of range", index)))
}

/// Persist `via` at `ordinal`: insert if the store has never seen it, else a
/// partial update of the ordinal column.
async fn place<S>(store: &S, occupancy: &Occupancy, via: &Via, ordinal: i32) -> StoreResult<()>
where
    S: ItineraryStore + ?Sized,
{
    if occupancy.persisted.contains(&via.id) {
        store.update_via_ordinal(via.id, ordinal).await
    } else {
        let mut row = via.clone();
        row.ordinal = ordinal;
        store.insert_via(&row).await
    }
}

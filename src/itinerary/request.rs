//! Reorder requests and their validation.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{EngineError, EngineResult};
use crate::model::{Trip, Via, ViaId};

/// Desired layout of a trip's legs.
///
/// `final_vias` lists surviving and new vias in their desired order
/// (index = ordinal). `removed_vias` lists vias to delete.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ViaReorderRequest {
    pub final_vias: Vec<Via>,
    #[serde(default)]
    pub removed_vias: Vec<Via>,
}

impl ViaReorderRequest {
    pub fn new(final_vias: Vec<Via>, removed_vias: Vec<Via>) -> Self {
        Self {
            final_vias,
            removed_vias,
        }
    }

    /// Keep the trip's vias listed in `order`, in that order, and remove the rest.
    pub fn reorder(trip: &Trip, order: &[ViaId]) -> EngineResult<Self> {
        let mut final_vias = Vec::with_capacity(order.len());
        for id in order {
            let via = trip
                .vias
                .iter()
                .find(|v| v.id == *id)
                .ok_or_else(|| EngineError::InvalidInput(format!("via {} is not part of trip {}", id, trip.id)))?;
            final_vias.push(via.clone());
        }
        let removed_vias = trip
            .vias
            .iter()
            .filter(|v| !order.contains(&v.id))
            .cloned()
            .collect();
        Ok(Self::new(final_vias, removed_vias))
    }

    /// Append a new via at the end of the desired order.
    pub fn push(&mut self, via: Via) -> &mut Self {
        self.final_vias.push(via);
        self
    }

    /// Check the request against the trip it applies to.
    pub fn validate(&self, trip: &Trip, max_vias: usize) -> EngineResult<()> {
        if self.final_vias.len() > max_vias {
            return Err(EngineError::InvalidInput(format!(
                "{} vias requested, at most {} allowed",
                self.final_vias.len(),
                max_vias
            )));
        }

        let known: HashSet<ViaId> = trip.vias.iter().map(|v| v.id).collect();
        let mut kept = HashSet::new();
        for via in &self.final_vias {
            if via.trip_id != trip.id {
                return Err(EngineError::InvalidInput(format!(
                    "via {} belongs to trip {}, not {}",
                    via.id, via.trip_id, trip.id
                )));
            }
            if !kept.insert(via.id) {
                return Err(EngineError::InvalidInput(format!("via {} listed twice", via.id)));
            }
        }

        let mut removed = HashSet::new();
        for via in &self.removed_vias {
            if !known.contains(&via.id) {
                return Err(EngineError::InvalidInput(format!(
                    "removed via {} is not part of trip {}",
                    via.id, trip.id
                )));
            }
            if kept.contains(&via.id) {
                return Err(EngineError::InvalidInput(format!(
                    "via {} is both kept and removed",
                    via.id
                )));
            }
            if !removed.insert(via.id) {
                return Err(EngineError::InvalidInput(format!("via {} removed twice", via.id)));
            }
        }

        if let Some(orphan) = known.iter().find(|id| !kept.contains(id) && !removed.contains(id)) {
            return Err(EngineError::InvalidInput(format!(
                "via {} is neither kept nor removed",
                orphan
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AirportCode, Endpoint, TripId};
    use chrono::Utc;

    fn via(trip_id: TripId, ordinal: i32) -> Via {
        let endpoint = Endpoint {
            airport: AirportCode::new("LHR"),
            terminal: Some("5".into()),
            time: Utc::now(),
        };
        Via {
            id: ViaId::new(),
            trip_id,
            ordinal,
            departure: endpoint.clone(),
            arrival: endpoint,
        }
    }

    fn trip_of(n: i32) -> Trip {
        let id = TripId::new();
        Trip::new(id, (0..n).map(|i| via(id, i)).collect())
    }

    #[test]
    fn test_reorder_splits_kept_and_removed() {
        let trip = trip_of(3);
        let order = [trip.vias[2].id, trip.vias[0].id];
        let request = ViaReorderRequest::reorder(&trip, &order).unwrap();
        assert_eq!(request.final_vias.len(), 2);
        assert_eq!(request.removed_vias[0].id, trip.vias[1].id);
        assert!(request.validate(&trip, 64).is_ok());
    }

    #[test]
    fn test_rejects_unlisted_existing_via() {
        let trip = trip_of(2);
        let request = ViaReorderRequest::new(vec![trip.vias[0].clone()], vec![]);
        assert!(matches!(request.validate(&trip, 64), Err(EngineError::InvalidInput(_))));
    }

    #[test]
    fn test_rejects_foreign_and_duplicate_vias() {
        let trip = trip_of(1);
        let foreign = via(TripId::new(), 0);
        let request = ViaReorderRequest::new(vec![trip.vias[0].clone(), foreign], vec![]);
        assert!(request.validate(&trip, 64).is_err());

        let request = ViaReorderRequest::new(vec![trip.vias[0].clone(), trip.vias[0].clone()], vec![]);
        assert!(request.validate(&trip, 64).is_err());

        let request = ViaReorderRequest::new(vec![trip.vias[0].clone()], vec![trip.vias[0].clone()]);
        assert!(request.validate(&trip, 64).is_err());
    }

    #[test]
    fn test_rejects_oversized_batch() {
        let trip = trip_of(4);
        let order: Vec<_> = trip.vias.iter().map(|v| v.id).collect();
        let request = ViaReorderRequest::reorder(&trip, &order).unwrap();
        assert!(request.validate(&trip, 3).is_err());
    }

    #[test]
    fn test_new_via_accepted() {
        let trip = trip_of(1);
        let mut request = ViaReorderRequest::reorder(&trip, &[trip.vias[0].id]).unwrap();
        request.push(via(trip.id, 0));
        assert!(request.validate(&trip, 64).is_ok());
    }
}

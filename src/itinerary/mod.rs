//! Itinerary subsystem.
//!
//! Reorders the legs of a trip under the `(trip_id, ordinal)` uniqueness
//! constraint, which the store checks on every single write.
//!
//! # Data Flow
//! ```text
//! ViaReorderRequest ──validate──▶ OrdinalReconciler
//!                                   │
//!            ┌──────────────────────┼────────────────────────┐
//!            ▼                      ▼                        ▼
//!     1. destroy removed     2. direct writes         3. deferred vias,
//!                               (waves, concurrent)      one at a time,
//!                                                        parked on a
//!                                                        temporary ordinal
//!                                                        when still blocked
//!                                                            │
//!                                                            ▼
//!                                                  4. parked vias to their
//!                                                     targets (concurrent)
//! ```
//!
//! # Design Decisions
//! - Occupancy is a local scratch map and never leaves `reconcile`
//! - Temporary ordinals come from a pool starting at `ordinals.temporary_base`,
//!   sized by `ordinals.max_vias_per_trip`
//! - A direct write into a slot another direct write vacates runs one wave later,
//!   so no two vias share an ordinal at any point
//! - Vias already at their target are skipped, so a satisfied order costs no writes
//! - Passengers of removed vias must be cascaded away by the caller first

mod reconciler;
mod request;

pub use reconciler::OrdinalReconciler;
pub use request::ViaReorderRequest;

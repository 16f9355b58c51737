//! Passenger removal cascade subsystem.
//!
//! Destroying passenger links is the only way riders and task memberships
//! lose their travelers. Eligibility depends on computed state (which riders
//! end up empty, which task statuses still matter), so the cascade runs in
//! the application instead of the database.
//!
//! # Data Flow
//! ```text
//! passenger ids
//!     │
//!     ├─▶ rider links ──▶ riders ──▶ remaining links + memberships ─┐
//!     └─▶ task members (reviewable / other) ────────────────────────┤
//!                                                (read-only, concurrent)
//!                                                                   ▼
//!     ┌──────────────── caller's transaction ───────────────────────────┐
//!     │ unlink passengers from riders that keep travelers               │
//!     │ ride side: release memberships, hand over or dissolve rides,    │
//!     │            destroy empty riders and their orphan addresses      │
//!     │ task side: drop members, promote backups, destroy empty tasks   │
//!     │ destroy passenger rows                                          │
//!     └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Design Decisions
//! - Invoked explicitly by whoever deletes passengers, never from a hook
//! - Ride side and task side run concurrently; each is sequential inside
//! - Riders that keep travelers are unlinked only; their seat and luggage
//!   counts are not recomputed
//! - Any failed step surfaces as `EngineError::Consistency` and the caller
//!   must roll back

mod engine;
mod report;
mod ride_side;
mod task_side;

pub use engine::CascadeConsistencyEngine;
pub use report::CascadeReport;

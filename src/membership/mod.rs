//! Ride membership subsystem.
//!
//! # Data Flow
//! ```text
//! caller membership + applicant membership (fresh from the store)
//!     → capability check (caller status ∈ membership.approve_statuses, same ride)
//!     → status precondition
//!     → single-column status write (+ request/counter-request cleanup)
//! ```
//!
//! # Design Decisions
//! - Status ranking is a configuration table, not enum order
//! - Owner statuses count as current: a rider holds at most one of
//!   owner/driver/joined/passenger across all rides
//! - State preconditions are checked before capabilities, so an invalid
//!   transition reports `InvalidState` whoever asks
//! - "No current ride" is `Ok(None)`, not an error

mod machine;
mod priority;

pub use machine::{CurrentRide, MembershipStateMachine, RideProjection, SuspendedRide};
pub use priority::MembershipRanking;

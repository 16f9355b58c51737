//! Persistence collaborator.
//!
//! # Data Flow
//! ```text
//! engine operation
//!     → TransactionalStore::begin (all-or-nothing scope)
//!     → algorithms issue reads/writes through the store traits
//!     → commit, or rollback on the first error
//! ```
//!
//! # Design Decisions
//! - One trait per aggregate; `EngineStore` bundles them
//! - Transactions implement the same traits as the store, so every
//!   algorithm runs unchanged inside or outside a transaction
//! - Writes are partial-field updates where the engine only owns one column
//! - The uniqueness of `(trip_id, ordinal)` is checked per write

mod error;
pub mod memory;
mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::{InMemoryStore, OrdinalWrite, StoreState};
pub use traits::{
    EngineStore, GeoStore, ItineraryStore, RideStore, StoreTransaction, TaskStore,
    TransactionalStore,
};

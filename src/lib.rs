//! Itinerary & membership consistency engine.
//!
//! Keeps trips, shared rides and help tasks consistent under concurrent,
//! partial updates: leg ordinal reconciliation, the ride membership state
//! machine, the passenger removal cascade and neighborhood resolution.

pub mod cascade;
pub mod config;
pub mod engine;
pub mod error;
pub mod geo;
pub mod itinerary;
pub mod membership;
pub mod model;
pub mod observability;
pub mod store;

pub use config::schema::EngineConfig;
pub use engine::{Engine, ReorderOutcome};
pub use error::{EngineError, EngineResult};
pub use store::InMemoryStore;

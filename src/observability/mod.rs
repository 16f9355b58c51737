//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Engine components produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters)
//!     → tracing.rs (one span per engine operation)
//!
//! Consumers:
//!     → Log aggregation (stderr, pretty or JSON)
//!     → Prometheus text rendering (CLI `--metrics`)
//! ```

pub mod logging;
pub mod metrics;
pub mod tracing;

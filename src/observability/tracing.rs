//! Operation spans.
//!
//! Every engine operation runs inside an `engine_op` span carrying a fresh
//! operation id, so the per-phase events of one reorder or cascade can be
//! correlated in the logs.

use uuid::Uuid;

/// Open the span for one engine operation.
pub fn operation_span(operation: &'static str) -> ::tracing::Span {
    let op_id = Uuid::new_v4();
    ::tracing::info_span!("engine_op", operation, op_id = %op_id)
}

//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Keep the temporary ordinal pool clear of real ordinals
//! - Keep the status priority table consistent with the state machine
//! - Validate value ranges
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: EngineConfig → Result<(), Vec<ValidationError>>

use thiserror::Error;

use crate::config::schema::EngineConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate an engine configuration.
pub fn validate_config(config: &EngineConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let ordinals = &config.ordinals;
    if ordinals.max_vias_per_trip == 0 {
        errors.push(ValidationError::new("ordinals.max_vias_per_trip", "must be positive"));
    }
    let max = i64::try_from(ordinals.max_vias_per_trip).unwrap_or(i64::MAX);
    if i64::from(ordinals.temporary_base) < max {
        errors.push(ValidationError::new(
            "ordinals.temporary_base",
            format!("must be at least max_vias_per_trip ({})", max),
        ));
    }
    if i64::from(ordinals.temporary_base).saturating_add(max) > i64::from(i32::MAX) {
        errors.push(ValidationError::new(
            "ordinals.temporary_base",
            "temporary pool overflows the ordinal range",
        ));
    }

    let p = &config.membership.priorities;
    let lowest_owner = p.owner.min(p.driver);
    let highest_member = p.joined.max(p.passenger);
    let lowest_member = p.joined.min(p.passenger);
    if lowest_owner <= highest_member {
        errors.push(ValidationError::new(
            "membership.priorities",
            "owner statuses must outrank current statuses",
        ));
    }
    if lowest_member <= p.applied {
        errors.push(ValidationError::new(
            "membership.priorities",
            "current statuses must outrank applied",
        ));
    }
    if p.applied <= p.denied {
        errors.push(ValidationError::new(
            "membership.priorities",
            "applied must outrank denied",
        ));
    }

    let approvers = &config.membership.approve_statuses;
    if approvers.is_empty() {
        errors.push(ValidationError::new(
            "membership.approve_statuses",
            "at least one status must hold approve rights",
        ));
    }
    for status in approvers {
        if !status.is_current() {
            errors.push(ValidationError::new(
                "membership.approve_statuses",
                format!("{} is not an owner or current status", status),
            ));
        }
    }
    if approvers.iter().all(|s| !s.is_owner()) && !approvers.is_empty() {
        tracing::warn!("No owner status holds approve rights");
    }

    if config.cascade.reviewable_task_statuses.is_empty() {
        errors.push(ValidationError::new(
            "cascade.reviewable_task_statuses",
            "must not be empty",
        ));
    }

    let scale = config.geo.score_scale_m;
    if !(scale.is_finite() && scale > 0.0) {
        errors.push(ValidationError::new("geo.score_scale_m", "must be a positive number"));
    }

    let level = config.observability.log_level.to_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("unknown level '{}'", config.observability.log_level),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

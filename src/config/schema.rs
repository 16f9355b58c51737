//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the engine.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::model::{RideRiderStatus, TaskMemberStatus};

/// Root configuration for the engine.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    /// Ordinal reconciliation settings.
    pub ordinals: OrdinalConfig,

    /// Ride membership priorities and capabilities.
    pub membership: MembershipConfig,

    /// Passenger removal cascade settings.
    pub cascade: CascadeConfig,

    /// Neighborhood resolution settings.
    pub geo: GeoConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Ordinal reconciliation configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OrdinalConfig {
    /// First ordinal of the temporary pool used to break swap cycles.
    /// Must lie above every real ordinal.
    pub temporary_base: i32,

    /// Maximum number of vias in one reorder (bounds the temporary pool).
    pub max_vias_per_trip: usize,
}

impl Default for OrdinalConfig {
    fn default() -> Self {
        Self {
            temporary_base: 1_000_000,
            max_vias_per_trip: 64,
        }
    }
}

/// Numeric priority per membership status. Higher ranks first.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct StatusPriorities {
    pub owner: u8,
    pub driver: u8,
    pub joined: u8,
    pub passenger: u8,
    pub suspended: u8,
    pub applied: u8,
    pub denied: u8,
}

impl StatusPriorities {
    /// Priority of a status.
    pub fn of(&self, status: RideRiderStatus) -> u8 {
        match status {
            RideRiderStatus::Owner => self.owner,
            RideRiderStatus::Driver => self.driver,
            RideRiderStatus::Joined => self.joined,
            RideRiderStatus::Passenger => self.passenger,
            RideRiderStatus::Suspended => self.suspended,
            RideRiderStatus::Applied => self.applied,
            RideRiderStatus::Denied => self.denied,
        }
    }
}

impl Default for StatusPriorities {
    fn default() -> Self {
        Self {
            owner: 100,
            driver: 100,
            joined: 60,
            passenger: 60,
            suspended: 40,
            applied: 20,
            denied: 0,
        }
    }
}

/// Membership state machine configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MembershipConfig {
    /// Status priority table used to order memberships.
    pub priorities: StatusPriorities,

    /// Statuses allowed to approve, deny and purge applicants.
    pub approve_statuses: Vec<RideRiderStatus>,
}

impl Default for MembershipConfig {
    fn default() -> Self {
        Self {
            priorities: StatusPriorities::default(),
            approve_statuses: vec![RideRiderStatus::Owner, RideRiderStatus::Driver],
        }
    }
}

/// Passenger removal cascade configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CascadeConfig {
    /// Task member statuses a task still values (publicly reviewable).
    pub reviewable_task_statuses: Vec<TaskMemberStatus>,

    /// Destroy a destroyed rider's address when nothing else references it.
    pub release_orphan_addresses: bool,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            reviewable_task_statuses: vec![
                TaskMemberStatus::Helpee,
                TaskMemberStatus::Helper,
                TaskMemberStatus::Backup,
                TaskMemberStatus::Applied,
            ],
            release_orphan_addresses: true,
        }
    }
}

/// Neighborhood resolution configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GeoConfig {
    /// Distances are divided by this many meters before squaring in the agglo score.
    pub score_scale_m: f64,
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            score_scale_m: 1000.0,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Record engine metrics.
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
        }
    }
}

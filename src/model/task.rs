//! Help tasks and their members.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::ids::{AirportCode, NeighborhoodId, TaskId, TaskViaTravelerId, TravelerId, ViaTravelerId};

/// A help request scoped to a neighborhood, an airport and a time window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    #[serde(default)]
    pub neighborhood_id: Option<NeighborhoodId>,
    pub airport: AirportCode,
    pub earliest: DateTime<Utc>,
    pub latest: DateTime<Utc>,
}

/// Beneficiary of a task who is not linked to a via yet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskTraveler {
    pub task_id: TaskId,
    pub traveler_id: TravelerId,
}

/// Status of a via-linked task member, best rank first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskMemberStatus {
    Helpee,
    Helper,
    Backup,
    Applied,
    Invited,
    Denied,
}

impl TaskMemberStatus {
    /// Lower is better.
    pub fn rank(self) -> u8 {
        match self {
            TaskMemberStatus::Helpee => 0,
            TaskMemberStatus::Helper => 1,
            TaskMemberStatus::Backup => 2,
            TaskMemberStatus::Applied => 3,
            TaskMemberStatus::Invited => 4,
            TaskMemberStatus::Denied => 5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskMemberStatus::Helpee => "helpee",
            TaskMemberStatus::Helper => "helper",
            TaskMemberStatus::Backup => "backup",
            TaskMemberStatus::Applied => "applied",
            TaskMemberStatus::Invited => "invited",
            TaskMemberStatus::Denied => "denied",
        }
    }
}

impl fmt::Display for TaskMemberStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Via-linked member of a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskViaTraveler {
    pub id: TaskViaTravelerId,
    pub task_id: TaskId,
    pub via_traveler_id: ViaTravelerId,
    pub traveler_id: TravelerId,
    pub status: TaskMemberStatus,
}

//! Summary of what a passenger removal changed.

use serde::Serialize;

use crate::model::{AddressId, RideId, RideRiderId, RiderId, TaskId, TaskViaTravelerId};
use crate::observability::metrics;

/// What one passenger removal changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CascadeReport {
    pub passengers_removed: usize,
    /// Riders left without traveler links, destroyed.
    pub riders_destroyed: Vec<RiderId>,
    /// Riders that lost some traveler links but keep others.
    pub riders_trimmed: Vec<RiderId>,
    pub traveler_links_removed: usize,
    pub memberships_released: usize,
    pub requests_destroyed: usize,
    /// Memberships promoted to owner after the previous owner left.
    pub owners_promoted: Vec<RideRiderId>,
    pub rides_dissolved: Vec<RideId>,
    pub addresses_released: Vec<AddressId>,
    pub task_members_removed: usize,
    /// Backups promoted to helper after a helper left.
    pub helpers_promoted: Vec<TaskViaTravelerId>,
    pub tasks_destroyed: Vec<TaskId>,
}

impl CascadeReport {
    pub(crate) fn merge(&mut self, other: CascadeReport) {
        self.passengers_removed += other.passengers_removed;
        self.riders_destroyed.extend(other.riders_destroyed);
        self.riders_trimmed.extend(other.riders_trimmed);
        self.traveler_links_removed += other.traveler_links_removed;
        self.memberships_released += other.memberships_released;
        self.requests_destroyed += other.requests_destroyed;
        self.owners_promoted.extend(other.owners_promoted);
        self.rides_dissolved.extend(other.rides_dissolved);
        self.addresses_released.extend(other.addresses_released);
        self.task_members_removed += other.task_members_removed;
        self.helpers_promoted.extend(other.helpers_promoted);
        self.tasks_destroyed.extend(other.tasks_destroyed);
    }

    pub(crate) fn record_metrics(&self) {
        metrics::record_cascade_rows("passenger", self.passengers_removed);
        metrics::record_cascade_rows("rider", self.riders_destroyed.len());
        metrics::record_cascade_rows("rider_traveler", self.traveler_links_removed);
        metrics::record_cascade_rows("membership", self.memberships_released);
        metrics::record_cascade_rows("request", self.requests_destroyed);
        metrics::record_cascade_rows("owner_promotion", self.owners_promoted.len());
        metrics::record_cascade_rows("ride", self.rides_dissolved.len());
        metrics::record_cascade_rows("address", self.addresses_released.len());
        metrics::record_cascade_rows("task_member", self.task_members_removed);
        metrics::record_cascade_rows("helper_promotion", self.helpers_promoted.len());
        metrics::record_cascade_rows("task", self.tasks_destroyed.len());
    }
}

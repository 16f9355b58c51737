//! Ranking of ride memberships.

use std::cmp::Ordering;

use crate::config::StatusPriorities;
use crate::model::RideRider;

/// Orders memberships by status priority (higher first), then by join time
/// (earlier first), then by id.
#[derive(Debug, Clone)]
pub struct MembershipRanking {
    priorities: StatusPriorities,
}

impl MembershipRanking {
    pub fn new(priorities: StatusPriorities) -> Self {
        Self { priorities }
    }

    /// `Less` means `a` ranks ahead of `b`.
    pub fn compare(&self, a: &RideRider, b: &RideRider) -> Ordering {
        self.priorities
            .of(b.status)
            .cmp(&self.priorities.of(a.status))
            .then_with(|| a.joined_at.cmp(&b.joined_at))
            .then_with(|| a.id.cmp(&b.id))
    }

    /// Canonical member of a ride: the best-ranked row.
    pub fn pick_main_rider<'a>(&self, members: &'a [RideRider]) -> Option<&'a RideRider> {
        members.iter().min_by(|a, b| self.compare(a, b))
    }

    pub fn sort(&self, members: &mut [RideRider]) {
        members.sort_by(|a, b| self.compare(a, b));
    }
}

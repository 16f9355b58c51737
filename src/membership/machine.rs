//! Membership status transitions.

use serde::Serialize;
use std::cmp::Ordering;
use tracing::{debug, info, warn};

use crate::config::MembershipConfig;
use crate::error::{EngineError, EngineResult};
use crate::membership::priority::MembershipRanking;
use crate::model::{Ride, RideRider, RideRiderStatus, RiderId};
use crate::observability::metrics;
use crate::store::RideStore;

/// A rider's single current membership with its ride.
#[derive(Debug, Clone, Serialize)]
pub struct CurrentRide {
    pub membership: RideRider,
    pub ride: Ride,
}

/// Ride projection returned by a suspended-membership lookup.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "projection", rename_all = "snake_case")]
pub enum RideProjection {
    /// Ride row only.
    Summary { ride: Ride },
    /// Ride row plus its members, best-ranked first.
    Detailed { ride: Ride, members: Vec<RideRider> },
}

impl RideProjection {
    pub fn ride(&self) -> &Ride {
        match self {
            RideProjection::Summary { ride } | RideProjection::Detailed { ride, .. } => ride,
        }
    }
}

/// A rider's suspended membership with the projection of its ride.
#[derive(Debug, Clone, Serialize)]
pub struct SuspendedRide {
    pub membership: RideRider,
    pub ride: RideProjection,
}

/// Governs a rider's status within a ride.
///
/// ```text
///            approve              suspend
/// applied ────────────▶ current ──────────▶ suspended
///    │                     ▲                    │
///    │ deny                └────── resume ──────┘
///    ▼
/// denied ──▶ (killoff destroys applied or denied rows)
/// ```
///
/// Operations work on records the caller fetched; stale records must be
/// re-fetched by the caller. Store failures propagate unchanged.
#[derive(Debug, Clone)]
pub struct MembershipStateMachine {
    config: MembershipConfig,
    ranking: MembershipRanking,
}

impl MembershipStateMachine {
    pub fn new(config: MembershipConfig) -> Self {
        let ranking = MembershipRanking::new(config.priorities.clone());
        Self { config, ranking }
    }

    pub fn ranking(&self) -> &MembershipRanking {
        &self.ranking
    }

    pub fn compare(&self, a: &RideRider, b: &RideRider) -> Ordering {
        self.ranking.compare(a, b)
    }

    pub fn pick_main_rider<'a>(&self, members: &'a [RideRider]) -> Option<&'a RideRider> {
        self.ranking.pick_main_rider(members)
    }

    /// Applicants of a ride, best-ranked first.
    pub fn sort_applicants(&self, members: &[RideRider]) -> Vec<RideRider> {
        let mut applicants: Vec<RideRider> = members
            .iter()
            .filter(|m| matches!(m.status, RideRiderStatus::Applied | RideRiderStatus::Denied))
            .cloned()
            .collect();
        self.ranking.sort(&mut applicants);
        applicants
    }

    /// Whether `caller` may approve, deny or purge `applicant`.
    pub fn can_review(&self, caller: &RideRider, applicant: &RideRider) -> bool {
        caller.ride_id == applicant.ride_id
            && caller.id != applicant.id
            && self.config.approve_statuses.contains(&caller.status)
    }

    fn authorize(&self, caller: &RideRider, applicant: &RideRider) -> EngineResult<()> {
        if self.can_review(caller, applicant) {
            Ok(())
        } else {
            Err(EngineError::Unauthorized(format!(
                "{} member {} cannot review applicant {}",
                caller.status, caller.id, applicant.id
            )))
        }
    }

    /// Move `member` to the current status matching `ride`'s kind.
    ///
    /// No-op (returns `false`) when the ride or its status is missing. Only
    /// the status column is written.
    pub async fn upgrade<S>(&self, store: &S, member: &mut RideRider, ride: Option<&Ride>) -> EngineResult<bool>
    where
        S: RideStore + ?Sized,
    {
        let Some(kind) = ride.and_then(|r| r.status) else {
            return Ok(false);
        };
        let status = kind.member_status();
        store.update_membership_status(member.id, status).await?;
        debug!(ride_rider_id = %member.id, from = %member.status, to = %status, "Membership upgraded");
        member.status = status;
        metrics::record_membership_transition(status.as_str());
        Ok(true)
    }

    /// Accept an applicant into the ride.
    pub async fn approve<S>(&self, store: &S, caller: &RideRider, applicant: RideRider) -> EngineResult<RideRider>
    where
        S: RideStore + ?Sized,
    {
        if applicant.status != RideRiderStatus::Applied {
            return Err(EngineError::InvalidState(format!(
                "cannot approve a {} membership",
                applicant.status
            )));
        }
        self.authorize(caller, &applicant)?;

        let ride = self.ride_of(store, &applicant).await?;
        if ride.status.is_none() {
            return Err(EngineError::InvalidState(format!("ride {} has no status", ride.id)));
        }
        self.ensure_not_riding_elsewhere(store, &applicant).await?;

        let mut approved = applicant;
        self.upgrade(store, &mut approved, Some(&ride)).await?;
        self.clear_requests(store, &approved).await?;
        info!(ride_id = %ride.id, rider_id = %approved.rider_id, status = %approved.status, "Applicant approved");
        Ok(approved)
    }

    /// Reject an applicant and drop its pending request rows.
    pub async fn deny<S>(&self, store: &S, caller: &RideRider, applicant: RideRider) -> EngineResult<RideRider>
    where
        S: RideStore + ?Sized,
    {
        if applicant.status != RideRiderStatus::Applied {
            return Err(EngineError::InvalidState(format!(
                "cannot deny a {} membership",
                applicant.status
            )));
        }
        self.authorize(caller, &applicant)?;

        store
            .update_membership_status(applicant.id, RideRiderStatus::Denied)
            .await?;
        let mut denied = applicant;
        denied.status = RideRiderStatus::Denied;
        metrics::record_membership_transition(RideRiderStatus::Denied.as_str());
        self.clear_requests(store, &denied).await?;
        info!(ride_id = %denied.ride_id, rider_id = %denied.rider_id, "Applicant denied");
        Ok(denied)
    }

    /// Destroy an applied or denied membership row.
    pub async fn killoff<S>(&self, store: &S, caller: &RideRider, applicant: &RideRider) -> EngineResult<()>
    where
        S: RideStore + ?Sized,
    {
        if !matches!(applicant.status, RideRiderStatus::Applied | RideRiderStatus::Denied) {
            return Err(EngineError::InvalidState(format!(
                "cannot purge a {} membership",
                applicant.status
            )));
        }
        self.authorize(caller, applicant)?;

        self.clear_requests(store, applicant).await?;
        store.destroy_membership(applicant.id).await?;
        info!(ride_id = %applicant.ride_id, rider_id = %applicant.rider_id, "Applicant purged");
        Ok(())
    }

    /// Park a current member off its ride.
    pub async fn suspend<S>(&self, store: &S, member: RideRider) -> EngineResult<RideRider>
    where
        S: RideStore + ?Sized,
    {
        if !member.status.is_member() {
            return Err(EngineError::InvalidState(format!(
                "cannot suspend a {} membership",
                member.status
            )));
        }
        store
            .update_membership_status(member.id, RideRiderStatus::Suspended)
            .await?;
        let mut suspended = member;
        suspended.status = RideRiderStatus::Suspended;
        metrics::record_membership_transition(RideRiderStatus::Suspended.as_str());
        info!(ride_id = %suspended.ride_id, rider_id = %suspended.rider_id, "Member suspended");
        Ok(suspended)
    }

    /// Bring a suspended member back to its ride.
    pub async fn resume<S>(&self, store: &S, member: RideRider) -> EngineResult<RideRider>
    where
        S: RideStore + ?Sized,
    {
        if member.status != RideRiderStatus::Suspended {
            return Err(EngineError::InvalidState(format!(
                "cannot resume a {} membership",
                member.status
            )));
        }
        let ride = self.ride_of(store, &member).await?;
        self.ensure_not_riding_elsewhere(store, &member).await?;

        let mut resumed = member;
        if !self.upgrade(store, &mut resumed, Some(&ride)).await? {
            return Err(EngineError::InvalidState(format!("ride {} has no status", ride.id)));
        }
        info!(ride_id = %ride.id, rider_id = %resumed.rider_id, status = %resumed.status, "Member resumed");
        Ok(resumed)
    }

    /// The rider's current membership and ride, if any.
    ///
    /// A `caller` that is already current short-circuits: it is returned with
    /// `target_ride` (or its own ride when none is given).
    pub async fn find_current_ride<S>(
        &self,
        store: &S,
        rider_id: RiderId,
        caller: Option<&RideRider>,
        target_ride: Option<Ride>,
    ) -> EngineResult<Option<CurrentRide>>
    where
        S: RideStore + ?Sized,
    {
        if let Some(own) = caller.filter(|c| c.rider_id == rider_id && c.status.is_current()) {
            let ride = match target_ride {
                Some(ride) => ride,
                None => self.ride_of(store, own).await?,
            };
            return Ok(Some(CurrentRide {
                membership: own.clone(),
                ride,
            }));
        }

        let current = store
            .memberships_of_riders(&[rider_id], &RideRiderStatus::RIDER_UNIQUES)
            .await?;
        if current.len() > 1 {
            warn!(rider_id = %rider_id, count = current.len(), "Rider holds several current memberships");
        }
        let Some(membership) = self.ranking.pick_main_rider(&current).cloned() else {
            return Ok(None);
        };
        let ride = self.ride_of(store, &membership).await?;
        Ok(Some(CurrentRide { membership, ride }))
    }

    /// The rider's suspended membership, if any.
    ///
    /// With `for_reset` the ride comes with its members, as needed to resume;
    /// otherwise only the ride row is loaded.
    pub async fn find_suspend_ride<S>(
        &self,
        store: &S,
        rider_id: RiderId,
        for_reset: bool,
    ) -> EngineResult<Option<SuspendedRide>>
    where
        S: RideStore + ?Sized,
    {
        let suspended = store
            .memberships_of_riders(&[rider_id], &[RideRiderStatus::Suspended])
            .await?;
        let Some(membership) = self.ranking.pick_main_rider(&suspended).cloned() else {
            return Ok(None);
        };
        let ride = self.ride_of(store, &membership).await?;
        let projection = if for_reset {
            let mut members = store.memberships_of_ride(ride.id).await?;
            self.ranking.sort(&mut members);
            RideProjection::Detailed { ride, members }
        } else {
            RideProjection::Summary { ride }
        };
        Ok(Some(SuspendedRide {
            membership,
            ride: projection,
        }))
    }

    async fn ride_of<S>(&self, store: &S, membership: &RideRider) -> EngineResult<Ride>
    where
        S: RideStore + ?Sized,
    {
        store
            .find_ride(membership.ride_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("ride {}", membership.ride_id)))
    }

    async fn ensure_not_riding_elsewhere<S>(&self, store: &S, membership: &RideRider) -> EngineResult<()>
    where
        S: RideStore + ?Sized,
    {
        let current = store
            .memberships_of_riders(&[membership.rider_id], &RideRiderStatus::RIDER_UNIQUES)
            .await?;
        match current.iter().find(|m| m.id != membership.id) {
            Some(other) => Err(EngineError::InvalidState(format!(
                "rider {} is already {} in ride {}",
                membership.rider_id, other.status, other.ride_id
            ))),
            None => Ok(()),
        }
    }

    async fn clear_requests<S>(&self, store: &S, membership: &RideRider) -> EngineResult<usize>
    where
        S: RideStore + ?Sized,
    {
        let requests = store.requests_of_membership(membership.id).await?;
        if requests.is_empty() {
            return Ok(0);
        }
        let ids: Vec<_> = requests.iter().map(|r| r.id).collect();
        Ok(store.destroy_requests(&ids).await?)
    }
}

//! Ride-side cascade: release riders left without travelers.

use tracing::{debug, info};

use crate::cascade::report::CascadeReport;
use crate::membership::MembershipRanking;
use crate::model::{RideId, RideRider, RideRiderStatus, RiderId};
use crate::store::{GeoStore, RideStore, StoreResult};

/// Release every membership of each rider, then destroy the rider.
///
/// Riders are handled one after another: two of them may share a ride, and
/// the second must see the promotion or dissolution caused by the first.
pub(crate) async fn release_riders<S>(
    store: &S,
    ranking: &MembershipRanking,
    release_addresses: bool,
    rider_ids: &[RiderId],
) -> StoreResult<CascadeReport>
where
    S: RideStore + GeoStore + ?Sized,
{
    let mut report = CascadeReport::default();
    for rider_id in rider_ids {
        release_rider(store, ranking, release_addresses, *rider_id, &mut report).await?;
    }
    Ok(report)
}

async fn release_rider<S>(
    store: &S,
    ranking: &MembershipRanking,
    release_addresses: bool,
    rider_id: RiderId,
    report: &mut CascadeReport,
) -> StoreResult<()>
where
    S: RideStore + GeoStore + ?Sized,
{
    let memberships = store.memberships_of_riders(&[rider_id], &[]).await?;
    for membership in memberships {
        release_membership(store, &membership, report).await?;
        if membership.status.is_owner() {
            hand_over_ride(store, ranking, membership.ride_id, report).await?;
        }
    }

    let rider = store.find_rider(rider_id).await?;
    store.destroy_rider(rider_id).await?;
    report.riders_destroyed.push(rider_id);
    debug!(rider_id = %rider_id, "Rider destroyed");

    let address_id = rider.and_then(|r| r.address_id);
    if let (true, Some(address_id)) = (release_addresses, address_id) {
        if store.find_address(address_id).await?.is_some() && !store.address_in_use(address_id).await? {
            store.destroy_address(address_id).await?;
            report.addresses_released.push(address_id);
            debug!(address_id = %address_id, "Orphan address released");
        }
    }
    Ok(())
}

/// Destroy a membership with its pending request and counter-request rows.
async fn release_membership<S>(store: &S, membership: &RideRider, report: &mut CascadeReport) -> StoreResult<()>
where
    S: RideStore + ?Sized,
{
    let requests = store.requests_of_membership(membership.id).await?;
    if !requests.is_empty() {
        let ids: Vec<_> = requests.iter().map(|r| r.id).collect();
        report.requests_destroyed += store.destroy_requests(&ids).await?;
    }
    store.destroy_membership(membership.id).await?;
    report.memberships_released += 1;
    Ok(())
}

/// The ride lost its owner: promote the best current member, or dissolve
/// the ride when nobody current is left. Driver offers are always dissolved.
async fn hand_over_ride<S>(
    store: &S,
    ranking: &MembershipRanking,
    ride_id: RideId,
    report: &mut CascadeReport,
) -> StoreResult<()>
where
    S: RideStore + ?Sized,
{
    let remaining = store.memberships_of_ride(ride_id).await?;
    let kind = store.find_ride(ride_id).await?.and_then(|r| r.status);
    let current: Vec<RideRider> = remaining
        .iter()
        .filter(|m| m.status.is_current())
        .cloned()
        .collect();

    let heir = match kind {
        Some(kind) if !kind.hands_over() => None,
        _ => ranking.pick_main_rider(&current),
    };
    if let Some(heir) = heir {
        let status = kind.map(|k| k.owner_status()).unwrap_or(RideRiderStatus::Owner);
        store.update_membership_status(heir.id, status).await?;
        report.owners_promoted.push(heir.id);
        info!(ride_id = %ride_id, ride_rider_id = %heir.id, status = %status, "Ride owner handed over");
        return Ok(());
    }

    for membership in &remaining {
        release_membership(store, membership, report).await?;
    }
    store.destroy_ride(ride_id).await?;
    report.rides_dissolved.push(ride_id);
    info!(ride_id = %ride_id, released = remaining.len(), "Ride dissolved");
    Ok(())
}

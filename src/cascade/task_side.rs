//! Task-side cascade: drop task memberships of removed passengers.

use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info};

use crate::cascade::report::CascadeReport;
use crate::model::{TaskId, TaskMemberStatus, TaskViaTraveler, TaskViaTravelerId};
use crate::store::{StoreResult, TaskStore};

/// Remove reviewable members task by task, adjusting each task.
pub(crate) async fn release_members<S>(store: &S, leaving: &[TaskViaTraveler]) -> StoreResult<CascadeReport>
where
    S: TaskStore + ?Sized,
{
    let mut by_task: BTreeMap<TaskId, Vec<&TaskViaTraveler>> = BTreeMap::new();
    for member in leaving {
        by_task.entry(member.task_id).or_default().push(member);
    }

    let mut report = CascadeReport::default();
    for (task_id, members) in by_task {
        release_from_task(store, task_id, &members, &mut report).await?;
    }
    Ok(report)
}

/// Destroy rows the task no longer reviews, without any adjustment.
pub(crate) async fn purge_members<S>(store: &S, rows: &[TaskViaTraveler]) -> StoreResult<CascadeReport>
where
    S: TaskStore + ?Sized,
{
    let mut report = CascadeReport::default();
    if !rows.is_empty() {
        let ids: Vec<_> = rows.iter().map(|m| m.id).collect();
        report.task_members_removed = store.destroy_task_members(&ids).await?;
    }
    Ok(report)
}

async fn release_from_task<S>(
    store: &S,
    task_id: TaskId,
    leaving: &[&TaskViaTraveler],
    report: &mut CascadeReport,
) -> StoreResult<()>
where
    S: TaskStore + ?Sized,
{
    let leaving_ids: HashSet<TaskViaTravelerId> = leaving.iter().map(|m| m.id).collect();
    let ids: Vec<_> = leaving_ids.iter().copied().collect();
    report.task_members_removed += store.destroy_task_members(&ids).await?;

    let mut remaining: Vec<TaskViaTraveler> = store
        .task_members(task_id)
        .await?
        .into_iter()
        .filter(|m| !leaving_ids.contains(&m.id))
        .collect();

    let lost_helpee = leaving.iter().any(|m| m.status == TaskMemberStatus::Helpee);
    let helpee_left = remaining.iter().any(|m| m.status == TaskMemberStatus::Helpee);
    if lost_helpee && !helpee_left && store.task_beneficiaries(task_id).await?.is_empty() {
        if !remaining.is_empty() {
            let ids: Vec<_> = remaining.iter().map(|m| m.id).collect();
            report.task_members_removed += store.destroy_task_members(&ids).await?;
        }
        store.destroy_task(task_id).await?;
        report.tasks_destroyed.push(task_id);
        info!(task_id = %task_id, "Task destroyed, nobody left to help");
        return Ok(());
    }

    let helpers_lost = leaving
        .iter()
        .filter(|m| m.status == TaskMemberStatus::Helper)
        .count();
    if helpers_lost == 0 {
        return Ok(());
    }
    remaining.retain(|m| m.status == TaskMemberStatus::Backup);
    remaining.sort_by_key(|m| m.id);
    for backup in remaining.iter().take(helpers_lost) {
        store
            .update_task_member_status(backup.id, TaskMemberStatus::Helper)
            .await?;
        report.helpers_promoted.push(backup.id);
        debug!(task_id = %task_id, task_member_id = %backup.id, "Backup promoted to helper");
    }
    Ok(())
}

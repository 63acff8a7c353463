use super::{util, SchedError, TaskDraft};
use crate::actor::ActorContext;
use crate::model::{Roster, TaskActivity, TaskComment, TaskId, TaskItem, TaskStatus, TeamId};
use chrono::{DateTime, Utc};

const TITLE_MAX: usize = 120;
const DESCRIPTION_MAX: usize = 1000;
const COMMENT_MAX: usize = 800;

fn validate(roster: &Roster, team: &TeamId, draft: &mut TaskDraft) -> Result<(), SchedError> {
    draft.title = draft.title.trim().to_string();
    if draft.title.is_empty() {
        return Err(SchedError::Validation("task title is required".into()));
    }
    util::check_len("title", Some(draft.title.as_str()), TITLE_MAX)?;
    draft.description = util::clean(draft.description.take());
    util::check_len("description", draft.description.as_deref(), DESCRIPTION_MAX)?;

    if let Some(assignee) = &draft.assignee {
        util::ensure_member(roster, team, assignee)?;
    }
    if let Some(shift) = &draft.shift {
        roster
            .find_shift(shift)
            .filter(|s| &s.team == team)
            .ok_or_else(|| SchedError::not_found("shift", shift))?;
    }
    Ok(())
}

fn completion(status: TaskStatus, previous: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match status {
        TaskStatus::Done => previous.or(Some(now)),
        _ => None,
    }
}

fn log(roster: &mut Roster, task: &TaskId, actor: &ActorContext, kind: TaskActivity, content: Option<String>, now: DateTime<Utc>) {
    roster.task_comments.push(TaskComment {
        task: task.clone(),
        author: actor.user().clone(),
        kind,
        content,
        at: now,
    });
}

fn load_team(roster: &Roster, id: &TaskId) -> Result<TeamId, SchedError> {
    roster
        .find_task(id)
        .map(|t| t.team.clone())
        .ok_or_else(|| SchedError::not_found("task", id))
}

pub(super) fn create_task(
    roster: &mut Roster,
    actor: &ActorContext,
    team: &TeamId,
    mut draft: TaskDraft,
    now: DateTime<Utc>,
) -> Result<TaskId, SchedError> {
    util::ensure_team(roster, team)?;
    actor.ensure_manager(roster, team)?;
    validate(roster, team, &mut draft)?;

    let task = TaskItem {
        id: TaskId::random(),
        team: team.clone(),
        shift: draft.shift,
        title: draft.title,
        description: draft.description,
        priority: draft.priority,
        status: draft.status,
        due: draft.due,
        assignee: draft.assignee,
        created_by: actor.user().clone(),
        created_at: now,
        updated_at: None,
        completed_at: completion(draft.status, None, now),
    };
    let id = task.id.clone();
    roster.tasks.push(task);
    log(roster, &id, actor, TaskActivity::Created, None, now);
    Ok(id)
}

/// Remplace les champs de la tâche ; une entrée d'activité par aspect
/// modifié, renvoyées dans l'ordre d'écriture.
pub(super) fn edit_task(
    roster: &mut Roster,
    actor: &ActorContext,
    id: &TaskId,
    mut draft: TaskDraft,
    now: DateTime<Utc>,
) -> Result<Vec<TaskActivity>, SchedError> {
    let team = load_team(roster, id)?;
    actor.ensure_manager(roster, &team)?;
    validate(roster, &team, &mut draft)?;

    let Some(task) = roster.find_task_mut(id) else {
        return Err(SchedError::not_found("task", id));
    };
    let mut changes = Vec::new();
    if task.assignee != draft.assignee {
        changes.push(TaskActivity::AssigneeChanged);
    }
    if task.status != draft.status {
        changes.push(TaskActivity::StatusChanged);
    }
    if task.due != draft.due {
        changes.push(TaskActivity::DueDateChanged);
    }
    if task.priority != draft.priority {
        changes.push(TaskActivity::PriorityChanged);
    }
    if task.shift != draft.shift {
        changes.push(TaskActivity::ShiftLinkChanged);
    }

    task.completed_at = completion(draft.status, task.completed_at, now);
    task.title = draft.title;
    task.description = draft.description;
    task.priority = draft.priority;
    task.status = draft.status;
    task.due = draft.due;
    task.assignee = draft.assignee;
    task.shift = draft.shift;
    task.updated_at = Some(now);

    for kind in &changes {
        log(roster, id, actor, *kind, None, now);
    }
    Ok(changes)
}

/// Renvoie `false` quand le statut était déjà celui demandé.
pub(super) fn change_task_status(
    roster: &mut Roster,
    actor: &ActorContext,
    id: &TaskId,
    status: TaskStatus,
    now: DateTime<Utc>,
) -> Result<bool, SchedError> {
    let Some(task) = roster.find_task(id) else {
        return Err(SchedError::not_found("task", id));
    };
    let team = task.team.clone();
    let is_assignee = task.assignee.as_ref() == Some(actor.user());
    if !actor.can_manage(roster, &team) {
        if !is_assignee {
            return Err(SchedError::Authorization(
                "only a manager or the assignee may change the task status".into(),
            ));
        }
        util::ensure_member(roster, &team, actor.user())?;
    }
    if task.status == status {
        return Ok(false);
    }

    let Some(task) = roster.find_task_mut(id) else {
        return Err(SchedError::not_found("task", id));
    };
    let previous = task.status;
    task.completed_at = completion(status, task.completed_at, now);
    task.status = status;
    task.updated_at = Some(now);
    log(
        roster,
        id,
        actor,
        TaskActivity::StatusChanged,
        Some(format!("{previous} -> {status}")),
        now,
    );
    Ok(true)
}

pub(super) fn comment_task(
    roster: &mut Roster,
    actor: &ActorContext,
    id: &TaskId,
    content: &str,
    now: DateTime<Utc>,
) -> Result<(), SchedError> {
    let team = load_team(roster, id)?;
    if !actor.is_root_admin() {
        util::ensure_member(roster, &team, actor.user())?;
    }
    let content = content.trim();
    if content.is_empty() {
        return Err(SchedError::Validation("comment cannot be empty".into()));
    }
    util::check_len("comment", Some(content), COMMENT_MAX)?;
    log(roster, id, actor, TaskActivity::Comment, Some(content.to_string()), now);
    Ok(())
}

pub(super) fn delete_task(roster: &mut Roster, actor: &ActorContext, id: &TaskId) -> Result<(), SchedError> {
    let team = load_team(roster, id)?;
    actor.ensure_manager(roster, &team)?;
    roster.tasks.retain(|t| &t.id != id);
    roster.task_comments.retain(|c| &c.task != id);
    Ok(())
}

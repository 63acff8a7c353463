use super::{conflicts, util, AssignmentDiff, Conflict, SchedError, ShiftDraft, ShiftRemoval};
use crate::model::{Interval, Roster, Shift, ShiftAssignment, ShiftId, TeamId, UserId};
use std::collections::BTreeSet;

const LOCATION_MAX: usize = 80;
const NOTE_MAX: usize = 300;

/// Validation commune création / édition. Renvoie l'intervalle et
/// l'ensemble cible des assignés.
fn validate(
    roster: &Roster,
    team: &TeamId,
    draft: &mut ShiftDraft,
    editing: Option<&ShiftId>,
) -> Result<(Interval, BTreeSet<UserId>), SchedError> {
    let window = Interval::new(draft.start, draft.end).map_err(SchedError::Validation)?;

    draft.location = util::clean(draft.location.take());
    draft.note = util::clean(draft.note.take());
    util::check_len("location", draft.location.as_deref(), LOCATION_MAX)?;
    util::check_len("note", draft.note.as_deref(), NOTE_MAX)?;

    let target = util::dedup_users(std::mem::take(&mut draft.assignees));
    for user in &target {
        util::ensure_member(roster, team, user)?;
    }

    let conflicts: Vec<Conflict> = target
        .iter()
        .flat_map(|u| conflicts::user_conflicts(roster, team, u, window, editing))
        .collect();
    if !conflicts.is_empty() {
        return Err(SchedError::SchedulingConflict { conflicts });
    }

    Ok((window, target))
}

pub(super) fn create_shift(
    roster: &mut Roster,
    team: &TeamId,
    mut draft: ShiftDraft,
) -> Result<ShiftId, SchedError> {
    util::ensure_team(roster, team)?;
    let (window, target) = validate(roster, team, &mut draft, None)?;

    let shift = Shift::new(team.clone(), window, draft.location, draft.note);
    let id = shift.id.clone();
    roster.shifts.push(shift);
    reconcile_assignments(roster, &id, &target);
    Ok(id)
}

pub(super) fn edit_shift(
    roster: &mut Roster,
    shift_id: &ShiftId,
    mut draft: ShiftDraft,
) -> Result<AssignmentDiff, SchedError> {
    let team = roster
        .find_shift(shift_id)
        .map(|s| s.team.clone())
        .ok_or_else(|| SchedError::not_found("shift", shift_id))?;
    let (window, target) = validate(roster, &team, &mut draft, Some(shift_id))?;

    let Some(shift) = roster.find_shift_mut(shift_id) else {
        return Err(SchedError::not_found("shift", shift_id));
    };
    shift.start = window.start();
    shift.end = window.end();
    shift.location = draft.location;
    shift.note = draft.note;

    Ok(reconcile_assignments(roster, shift_id, &target))
}

/// Aligne les assignations du shift sur `target` par différence
/// d'ensembles ; les assignations inchangées ne sont pas touchées.
/// Seul chemin d'écriture des assignations (édition comme échange).
pub(super) fn reconcile_assignments(
    roster: &mut Roster,
    shift_id: &ShiftId,
    target: &BTreeSet<UserId>,
) -> AssignmentDiff {
    let current = roster.assignees(shift_id);
    let removed: BTreeSet<UserId> = current.difference(target).cloned().collect();
    let added: BTreeSet<UserId> = target.difference(&current).cloned().collect();

    if !removed.is_empty() {
        roster
            .assignments
            .retain(|a| &a.shift != shift_id || !removed.contains(&a.user));
    }
    // purge d'éventuels doublons hérités d'un fichier édité à la main
    let mut seen = BTreeSet::new();
    roster
        .assignments
        .retain(|a| &a.shift != shift_id || seen.insert(a.user.clone()));

    for user in &added {
        roster.assignments.push(ShiftAssignment {
            shift: shift_id.clone(),
            user: user.clone(),
        });
    }

    AssignmentDiff { added, removed }
}

/// Supprime le shift et ses assignations. Les demandes d'échange actives
/// deviennent caduques, les tâches perdent leur lien.
pub(super) fn delete_shift(roster: &mut Roster, shift_id: &ShiftId) -> Result<ShiftRemoval, SchedError> {
    let Some(pos) = roster.shifts.iter().position(|s| &s.id == shift_id) else {
        return Err(SchedError::not_found("shift", shift_id));
    };
    roster.shifts.remove(pos);

    let before = roster.assignments.len();
    roster.assignments.retain(|a| &a.shift != shift_id);
    let assignments_removed = before - roster.assignments.len();

    let voided_swaps = roster
        .swaps
        .iter()
        .filter(|r| &r.shift == shift_id && r.status.is_active())
        .map(|r| r.id.clone())
        .collect();

    let mut unlinked_tasks = 0;
    for task in roster.tasks.iter_mut().filter(|t| t.shift.as_ref() == Some(shift_id)) {
        task.shift = None;
        unlinked_tasks += 1;
    }

    Ok(ShiftRemoval {
        assignments_removed,
        voided_swaps,
        unlinked_tasks,
    })
}


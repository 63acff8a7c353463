use super::{conflicts, util, SchedError, TimeOffDraft};
use crate::actor::ActorContext;
use crate::model::{
    Interval, Review, Roster, TeamId, TimeOffAction, TimeOffEvent, TimeOffId, TimeOffRequest,
    TimeOffStatus,
};
use chrono::{DateTime, Utc};

const TEXT_MAX: usize = 500;
pub(super) const CANCEL_NOTE: &str = "Canceled by requester.";

/// Demande de congé en attente, avec l'état de conflit calculé à la lecture.
#[derive(Debug, Clone)]
pub struct TimeOffReview<'a> {
    pub request: &'a TimeOffRequest,
    pub has_conflict: bool,
}

fn pending<'r>(roster: &'r mut Roster, id: &TimeOffId) -> Result<&'r mut TimeOffRequest, SchedError> {
    let request = roster
        .find_time_off_mut(id)
        .ok_or_else(|| SchedError::not_found("time-off request", id))?;
    // tout statut autre que Pending est terminal
    if request.status != TimeOffStatus::Pending {
        return Err(SchedError::AlreadyReviewed {
            request: id.to_string(),
            status: request.status.to_string(),
        });
    }
    Ok(request)
}

fn close(
    roster: &mut Roster,
    id: &TimeOffId,
    actor: &ActorContext,
    status: TimeOffStatus,
    review_note: Option<String>,
    event_note: Option<String>,
    now: DateTime<Utc>,
) -> Result<(), SchedError> {
    let action = match status {
        TimeOffStatus::Approved => TimeOffAction::Approved,
        TimeOffStatus::Rejected => TimeOffAction::Rejected,
        TimeOffStatus::Canceled => TimeOffAction::Canceled,
        TimeOffStatus::Pending => {
            return Err(SchedError::Validation("a request cannot be reopened".into()))
        }
    };
    let request = pending(roster, id)?;
    request.status = status;
    request.review = Some(Review {
        reviewer: actor.user().clone(),
        reviewed_at: now,
        note: review_note,
    });
    roster.time_off_events.push(TimeOffEvent {
        request: id.clone(),
        actor: actor.user().clone(),
        action,
        note: event_note,
        at: now,
    });
    Ok(())
}

pub(super) fn create(
    roster: &mut Roster,
    actor: &ActorContext,
    draft: TimeOffDraft,
    now: DateTime<Utc>,
) -> Result<TimeOffId, SchedError> {
    util::ensure_team(roster, &draft.team)?;
    Interval::from_dates(draft.start_date, draft.end_date).map_err(SchedError::Validation)?;
    let reason = util::clean(draft.reason);
    util::check_len("reason", reason.as_deref(), TEXT_MAX)?;
    util::ensure_member(roster, &draft.team, actor.user())?;

    let request = TimeOffRequest {
        id: TimeOffId::random(),
        team: draft.team,
        requester: actor.user().clone(),
        kind: draft.kind,
        start_date: draft.start_date,
        end_date: draft.end_date,
        status: TimeOffStatus::Pending,
        reason: reason.clone(),
        created_at: now,
        review: None,
    };
    let id = request.id.clone();
    roster.time_off.push(request);
    roster.time_off_events.push(TimeOffEvent {
        request: id.clone(),
        actor: actor.user().clone(),
        action: TimeOffAction::Created,
        note: reason,
        at: now,
    });
    Ok(id)
}

pub(super) fn cancel(
    roster: &mut Roster,
    actor: &ActorContext,
    id: &TimeOffId,
    now: DateTime<Utc>,
) -> Result<(), SchedError> {
    let request = roster
        .find_time_off(id)
        .ok_or_else(|| SchedError::not_found("time-off request", id))?;
    if &request.requester != actor.user() {
        return Err(SchedError::Authorization(
            "only the requester may cancel a time-off request".into(),
        ));
    }
    pending(roster, id)?;
    close(
        roster,
        id,
        actor,
        TimeOffStatus::Canceled,
        Some(CANCEL_NOTE.to_string()),
        None,
        now,
    )
}

/// Bloquée (et non rejetée) si le demandeur a un shift sur la période.
pub(super) fn approve(
    roster: &mut Roster,
    actor: &ActorContext,
    id: &TimeOffId,
    note: Option<String>,
    now: DateTime<Utc>,
) -> Result<(), SchedError> {
    actor.ensure_root_admin("approve time-off")?;
    let request = pending(roster, id)?.clone();
    util::ensure_team(roster, &request.team)?;

    let conflicts = conflicts::time_off_conflicts(roster, &request);
    if !conflicts.is_empty() {
        return Err(SchedError::SchedulingConflict { conflicts });
    }

    let note = util::clean(note);
    util::check_len("note", note.as_deref(), TEXT_MAX)?;
    close(roster, id, actor, TimeOffStatus::Approved, note.clone(), note, now)
}

pub(super) fn reject(
    roster: &mut Roster,
    actor: &ActorContext,
    id: &TimeOffId,
    note: Option<String>,
    now: DateTime<Utc>,
) -> Result<(), SchedError> {
    actor.ensure_root_admin("reject time-off")?;
    pending(roster, id)?;
    let note = util::clean(note);
    util::check_len("note", note.as_deref(), TEXT_MAX)?;
    close(roster, id, actor, TimeOffStatus::Rejected, note.clone(), note, now)
}

/// File d'attente de revue, triée par date de début.
pub(super) fn review_queue<'a>(roster: &'a Roster, team: Option<&TeamId>) -> Vec<TimeOffReview<'a>> {
    let mut out: Vec<TimeOffReview<'a>> = roster
        .time_off
        .iter()
        .filter(|r| r.status == TimeOffStatus::Pending)
        .filter(|r| team.map_or(true, |t| &r.team == t))
        .filter(|r| roster.find_team(&r.team).is_some())
        .map(|r| TimeOffReview {
            request: r,
            has_conflict: !conflicts::time_off_conflicts(roster, r).is_empty(),
        })
        .collect();
    out.sort_by_key(|r| r.request.start_date);
    out
}

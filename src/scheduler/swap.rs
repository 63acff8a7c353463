use super::{conflicts, roster, util, SchedError, SwapDraft};
use crate::actor::ActorContext;
use crate::model::{
    Review, Roster, Shift, SwapAction, SwapEvent, SwapId, SwapRequest, SwapStatus, TeamId, UserId,
};
use chrono::{DateTime, Duration, Utc};

const TEXT_MAX: usize = 500;
const CANCEL_NOTE: &str = "Canceled by requester.";

/// Demande d'échange visible par un preneur ou un approbateur, avec le
/// résultat du contrôle de conflit pour la personne concernée.
#[derive(Debug, Clone)]
pub struct SwapOffer<'a> {
    pub request: &'a SwapRequest,
    pub shift: &'a Shift,
    pub has_conflict: bool,
}

fn load<'r>(roster: &'r Roster, id: &SwapId) -> Result<&'r SwapRequest, SchedError> {
    roster
        .find_swap(id)
        .ok_or_else(|| SchedError::not_found("swap request", id))
}

/// Statut attendu, sinon `AlreadyReviewed` quand la demande est close ou
/// qu'une réservation concurrente est passée avant.
fn expect_status(request: &SwapRequest, expected: SwapStatus, action: &'static str) -> Result<(), SchedError> {
    let overtaken = request.status.is_terminal()
        || (action == "claim" && request.status == SwapStatus::Claimed);
    if request.status == expected {
        Ok(())
    } else if overtaken {
        Err(SchedError::AlreadyReviewed {
            request: request.id.to_string(),
            status: request.status.to_string(),
        })
    } else {
        Err(SchedError::InvalidTransition {
            request: request.id.to_string(),
            status: request.status.to_string(),
            action,
        })
    }
}

/// Shift cible encore présent dans l'équipe ; sinon la demande est caduque.
fn target_shift<'r>(roster: &'r Roster, request: &SwapRequest) -> Result<&'r Shift, SchedError> {
    util::ensure_team(roster, &request.team)?;
    roster
        .find_shift(&request.shift)
        .filter(|s| s.team == request.team)
        .ok_or_else(|| SchedError::not_found("shift", &request.shift))
}

fn ensure_approver(roster: &Roster, actor: &ActorContext, team: &TeamId) -> Result<(), SchedError> {
    if actor.can_manage(roster, team) {
        Ok(())
    } else {
        Err(SchedError::Authorization(
            "only a root admin or the team owner may review swaps".into(),
        ))
    }
}

fn taker_conflict_error(roster: &Roster, request: &SwapRequest, shift: &Shift, taker: &UserId) -> Option<SchedError> {
    let conflicts =
        conflicts::user_conflicts(roster, &request.team, taker, shift.interval(), Some(&shift.id));
    (!conflicts.is_empty()).then_some(SchedError::SchedulingConflict { conflicts })
}

/// Écrit le nouveau statut après relecture du statut attendu (CAS dans
/// l'unité de travail) et ajoute l'événement correspondant.
#[allow(clippy::too_many_arguments)]
fn transition(
    roster: &mut Roster,
    id: &SwapId,
    from: SwapStatus,
    to: SwapStatus,
    actor: &ActorContext,
    action: SwapAction,
    note: Option<String>,
    now: DateTime<Utc>,
) -> Result<(), SchedError> {
    let request = roster
        .find_swap_mut(id)
        .ok_or_else(|| SchedError::not_found("swap request", id))?;
    if request.status != from {
        return Err(SchedError::AlreadyReviewed {
            request: id.to_string(),
            status: request.status.to_string(),
        });
    }
    request.status = to;
    match to {
        SwapStatus::Claimed => {
            request.taker = Some(actor.user().clone());
            request.claimed_at = Some(now);
        }
        _ => {
            request.review = Some(Review {
                reviewer: actor.user().clone(),
                reviewed_at: now,
                note: match action {
                    SwapAction::Canceled => Some(CANCEL_NOTE.to_string()),
                    _ => note.clone(),
                },
            });
        }
    }
    roster.swap_events.push(SwapEvent {
        request: id.clone(),
        actor: actor.user().clone(),
        action,
        note,
        at: now,
    });
    Ok(())
}

pub(super) fn create(
    roster: &mut Roster,
    actor: &ActorContext,
    draft: SwapDraft,
    now: DateTime<Utc>,
    grace_minutes: i64,
) -> Result<SwapId, SchedError> {
    util::ensure_team(roster, &draft.team)?;
    util::ensure_member(roster, &draft.team, actor.user())?;

    let shift = roster
        .find_shift(&draft.shift)
        .filter(|s| s.team == draft.team)
        .ok_or_else(|| SchedError::not_found("shift", &draft.shift))?;
    if !roster.is_assigned(&shift.id, actor.user()) {
        return Err(SchedError::NotAssigned {
            shift: shift.id.clone(),
            user: actor.user().clone(),
        });
    }
    let cutoff = Duration::try_minutes(grace_minutes)
        .and_then(|grace| now.checked_sub_signed(grace))
        .ok_or_else(|| SchedError::Validation("swap grace period out of range".into()))?;
    if shift.start < cutoff {
        return Err(SchedError::Validation(
            "cannot offer a shift that has already started".into(),
        ));
    }

    if let Some(target) = &draft.requested_to {
        if target == actor.user() {
            return Err(SchedError::Validation(
                "a swap cannot be directed to its requester".into(),
            ));
        }
        util::ensure_member(roster, &draft.team, target)?;
    }

    let duplicate = roster.swaps.iter().any(|r| {
        r.team == draft.team
            && r.shift == draft.shift
            && &r.requester == actor.user()
            && r.status.is_active()
    });
    if duplicate {
        return Err(SchedError::Validation(
            "an active swap request already exists for this shift".into(),
        ));
    }

    let message = util::clean(draft.message);
    util::check_len("message", message.as_deref(), TEXT_MAX)?;

    let request = SwapRequest {
        id: SwapId::random(),
        team: draft.team,
        shift: draft.shift,
        requester: actor.user().clone(),
        requested_to: draft.requested_to,
        taker: None,
        status: SwapStatus::Pending,
        message: message.clone(),
        created_at: now,
        claimed_at: None,
        review: None,
    };
    let id = request.id.clone();
    roster.swaps.push(request);
    roster.swap_events.push(SwapEvent {
        request: id.clone(),
        actor: actor.user().clone(),
        action: SwapAction::Created,
        note: message,
        at: now,
    });
    Ok(id)
}

/// Réservation par un preneur ; le roster n'est pas modifié avant
/// l'approbation.
pub(super) fn claim(
    roster: &mut Roster,
    actor: &ActorContext,
    id: &SwapId,
    now: DateTime<Utc>,
) -> Result<(), SchedError> {
    let request = load(roster, id)?;
    expect_status(request, SwapStatus::Pending, "claim")?;
    if &request.requester == actor.user() {
        return Err(SchedError::Authorization(
            "a requester cannot claim their own swap".into(),
        ));
    }
    if !actor.is_root_admin() {
        util::ensure_member(roster, &request.team, actor.user())?;
    }
    if let Some(target) = &request.requested_to {
        if target != actor.user() {
            return Err(SchedError::Authorization(
                "this swap is directed to another member".into(),
            ));
        }
    }
    let shift = target_shift(roster, request)?;
    if let Some(err) = taker_conflict_error(roster, request, shift, actor.user()) {
        return Err(err);
    }

    transition(
        roster,
        id,
        SwapStatus::Pending,
        SwapStatus::Claimed,
        actor,
        SwapAction::Claimed,
        None,
        now,
    )
}

pub(super) fn cancel(
    roster: &mut Roster,
    actor: &ActorContext,
    id: &SwapId,
    now: DateTime<Utc>,
) -> Result<(), SchedError> {
    let request = load(roster, id)?;
    if &request.requester != actor.user() {
        return Err(SchedError::Authorization(
            "only the requester may cancel a swap".into(),
        ));
    }
    expect_status(request, SwapStatus::Pending, "cancel")?;
    transition(
        roster,
        id,
        SwapStatus::Pending,
        SwapStatus::Canceled,
        actor,
        SwapAction::Canceled,
        None,
        now,
    )
}

/// Revalide tout (le monde a pu changer depuis la réservation), puis
/// transfère l'assignation du demandeur au preneur.
pub(super) fn approve(
    roster: &mut Roster,
    actor: &ActorContext,
    id: &SwapId,
    note: Option<String>,
    now: DateTime<Utc>,
) -> Result<(), SchedError> {
    let request = load(roster, id)?;
    ensure_approver(roster, actor, &request.team)?;
    expect_status(request, SwapStatus::Claimed, "approve")?;
    let Some(taker) = request.taker.clone() else {
        return Err(SchedError::InvalidTransition {
            request: id.to_string(),
            status: "claimed without taker".into(),
            action: "approve",
        });
    };
    let shift = target_shift(roster, request)?;

    if !roster.is_assigned(&shift.id, &request.requester) {
        return Err(SchedError::NotAssigned {
            shift: shift.id.clone(),
            user: request.requester.clone(),
        });
    }
    util::ensure_member(roster, &request.team, &taker)?;
    if let Some(err) = taker_conflict_error(roster, request, shift, &taker) {
        return Err(err);
    }

    let note = util::clean(note);
    util::check_len("note", note.as_deref(), TEXT_MAX)?;

    let shift_id = shift.id.clone();
    let requester = request.requester.clone();
    let mut target = roster.assignees(&shift_id);
    target.remove(&requester);
    target.insert(taker);
    roster::reconcile_assignments(roster, &shift_id, &target);

    transition(
        roster,
        id,
        SwapStatus::Claimed,
        SwapStatus::Approved,
        actor,
        SwapAction::Approved,
        note,
        now,
    )
}

pub(super) fn reject(
    roster: &mut Roster,
    actor: &ActorContext,
    id: &SwapId,
    note: Option<String>,
    now: DateTime<Utc>,
) -> Result<(), SchedError> {
    let request = load(roster, id)?;
    ensure_approver(roster, actor, &request.team)?;
    expect_status(request, SwapStatus::Claimed, "reject")?;
    let note = util::clean(note);
    util::check_len("note", note.as_deref(), TEXT_MAX)?;
    transition(
        roster,
        id,
        SwapStatus::Claimed,
        SwapStatus::Rejected,
        actor,
        SwapAction::Rejected,
        note,
        now,
    )
}

/// Offres ouvertes qu'un membre pourrait prendre, triées par début de shift.
pub(super) fn open_offers<'a>(
    roster: &'a Roster,
    actor: &ActorContext,
    team: Option<&TeamId>,
) -> Vec<SwapOffer<'a>> {
    let mut out: Vec<SwapOffer<'a>> = roster
        .swaps
        .iter()
        .filter(|r| r.status == SwapStatus::Pending)
        .filter(|r| &r.requester != actor.user())
        .filter(|r| team.map_or(true, |t| &r.team == t))
        .filter(|r| actor.can_view(roster, &r.team))
        .filter_map(|r| {
            let shift = target_shift(roster, r).ok()?;
            Some(SwapOffer {
                request: r,
                shift,
                has_conflict: conflicts::has_conflict(
                    roster,
                    &r.team,
                    actor.user(),
                    shift.interval(),
                    Some(&shift.id),
                ),
            })
        })
        .collect();
    out.sort_by_key(|o| o.shift.start);
    out
}

/// Demandes réservées en attente d'approbation ; le drapeau de conflit
/// porte sur le preneur.
pub(super) fn approval_queue<'a>(roster: &'a Roster, team: Option<&TeamId>) -> Vec<SwapOffer<'a>> {
    let mut out: Vec<SwapOffer<'a>> = roster
        .swaps
        .iter()
        .filter(|r| r.status == SwapStatus::Claimed)
        .filter(|r| team.map_or(true, |t| &r.team == t))
        .filter_map(|r| {
            let shift = target_shift(roster, r).ok()?;
            let has_conflict = match &r.taker {
                Some(taker) => taker_conflict_error(roster, r, shift, taker).is_some(),
                None => true,
            };
            Some(SwapOffer {
                request: r,
                shift,
                has_conflict,
            })
        })
        .collect();
    out.sort_by_key(|o| o.shift.start);
    out
}

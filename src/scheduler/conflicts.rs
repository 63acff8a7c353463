//! Détection de chevauchements. Fonctions pures sur un `Roster` : aucune
//! écriture, aucune erreur hors intervalle invalide (refusé en amont par
//! `Interval::new`).

use super::{Conflict, ConflictKind};
use crate::model::{Interval, Roster, Shift, ShiftId, TeamId, TimeOffRequest, UserId};
use std::collections::BTreeSet;

/// Shifts de `team` assignés à `user` qui recouvrent `window`, hors `exclude`.
fn colliding<'a>(
    roster: &'a Roster,
    team: &'a TeamId,
    user: &'a UserId,
    window: Interval,
    exclude: Option<&'a ShiftId>,
) -> impl Iterator<Item = &'a Shift> + 'a {
    roster
        .shifts_of(team, user)
        .filter(move |s| exclude != Some(&s.id))
        .filter(move |s| s.interval().overlaps(&window))
}

/// Conflits d'un utilisateur contre un créneau candidat.
pub fn user_conflicts(
    roster: &Roster,
    team: &TeamId,
    user: &UserId,
    window: Interval,
    exclude: Option<&ShiftId>,
) -> Vec<Conflict> {
    colliding(roster, team, user, window, exclude)
        .map(|s| Conflict {
            user: user.clone(),
            shift_a: s.id.clone(),
            shift_b: exclude.cloned(),
            kind: ConflictKind::Overlap,
        })
        .collect()
}

pub fn has_conflict(
    roster: &Roster,
    team: &TeamId,
    user: &UserId,
    window: Interval,
    exclude: Option<&ShiftId>,
) -> bool {
    colliding(roster, team, user, window, exclude)
        .next()
        .is_some()
}

/// Mode lot : utilisateurs (parmi `users`) qui auraient un chevauchement.
pub fn conflicting_users<'u, I>(
    roster: &Roster,
    team: &TeamId,
    users: I,
    window: Interval,
    exclude: Option<&ShiftId>,
) -> BTreeSet<UserId>
where
    I: IntoIterator<Item = &'u UserId>,
{
    users
        .into_iter()
        .filter(|u| has_conflict(roster, team, u, window, exclude))
        .cloned()
        .collect()
}

/// Shifts du demandeur recouverts par une demande de congé.
pub fn time_off_conflicts(roster: &Roster, request: &TimeOffRequest) -> Vec<Conflict> {
    let Ok(window) = request.interval() else {
        return Vec::new();
    };
    colliding(roster, &request.team, &request.requester, window, None)
        .map(|s| Conflict {
            user: request.requester.clone(),
            shift_a: s.id.clone(),
            shift_b: None,
            kind: ConflictKind::TimeOff,
        })
        .collect()
}

/// Balayage complet : toutes les paires d'assignations qui se chevauchent
/// pour un même utilisateur dans une même équipe.
pub fn detect_conflicts(roster: &Roster) -> Vec<Conflict> {
    let mut out = Vec::new();

    let users: BTreeSet<&UserId> = roster.assignments.iter().map(|a| &a.user).collect();
    for team in roster.teams.iter() {
        for user in users.iter().copied() {
            let mut shifts: Vec<&Shift> = roster.shifts_of(&team.id, user).collect();
            shifts.sort_by_key(|s| s.start);

            for (idx, a) in shifts.iter().enumerate() {
                for b in shifts.iter().skip(idx + 1) {
                    if b.start >= a.end {
                        break;
                    }
                    out.push(Conflict {
                        user: user.clone(),
                        shift_a: a.id.clone(),
                        shift_b: Some(b.id.clone()),
                        kind: ConflictKind::Overlap,
                    });
                }
            }
        }
    }

    out
}

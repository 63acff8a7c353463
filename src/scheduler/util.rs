use super::SchedError;
use crate::model::{Roster, TeamId, UserId};
use std::collections::BTreeSet;

/// Texte optionnel nettoyé : vide => `None`.
pub(super) fn clean(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

pub(super) fn check_len(field: &str, value: Option<&str>, max: usize) -> Result<(), SchedError> {
    match value {
        Some(v) if v.chars().count() > max => Err(SchedError::Validation(format!(
            "{field} cannot exceed {max} characters"
        ))),
        _ => Ok(()),
    }
}

pub(super) fn dedup_users(users: Vec<UserId>) -> BTreeSet<UserId> {
    users
        .into_iter()
        .filter(|u| !u.as_str().trim().is_empty())
        .collect()
}

pub(super) fn ensure_member(roster: &Roster, team: &TeamId, user: &UserId) -> Result<(), SchedError> {
    if roster.is_member(team, user) {
        Ok(())
    } else {
        Err(SchedError::NotMember {
            team: team.clone(),
            user: user.clone(),
        })
    }
}

pub(super) fn ensure_team(roster: &Roster, team: &TeamId) -> Result<(), SchedError> {
    roster
        .find_team(team)
        .map(|_| ())
        .ok_or_else(|| SchedError::not_found("team", team))
}

use super::{util, RoleChange, SchedError, TeamRole};
use crate::model::{Roster, Team, TeamId, TeamMember, User, UserId};
use chrono::{DateTime, Utc};
use uuid::Uuid;

const NAME_MAX: usize = 80;
const DESCRIPTION_MAX: usize = 300;
const JOIN_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

pub(super) fn add_user(roster: &mut Roster, handle: &str, display_name: &str) -> Result<UserId, SchedError> {
    let handle = handle.trim();
    if handle.is_empty() {
        return Err(SchedError::Validation("handle cannot be empty".into()));
    }
    if roster.find_user_by_handle(handle).is_some() {
        return Err(SchedError::Validation(format!("handle {handle} is already taken")));
    }
    let display = display_name.trim();
    let user = User::new(handle, if display.is_empty() { handle } else { display });
    let id = user.id.clone();
    roster.users.push(user);
    Ok(id)
}

pub(super) fn set_locked(roster: &mut Roster, user: &UserId, locked: bool) -> Result<(), SchedError> {
    let entry = roster
        .find_user_mut(user)
        .ok_or_else(|| SchedError::not_found("user", user))?;
    entry.locked = locked;
    Ok(())
}

/// Code alphanumérique sans caractères ambigus (0/O, 1/I).
fn generate_join_code(len: usize) -> String {
    let mut code = String::with_capacity(len);
    while code.len() < len {
        for byte in Uuid::new_v4().as_bytes() {
            if code.len() == len {
                break;
            }
            let idx = usize::from(*byte) % JOIN_CODE_ALPHABET.len();
            code.push(char::from(JOIN_CODE_ALPHABET[idx]));
        }
    }
    code
}

fn unique_join_code(roster: &Roster, len: usize) -> String {
    loop {
        let code = generate_join_code(len);
        if !roster.teams.iter().any(|t| t.join_code == code) {
            return code;
        }
    }
}

pub(super) fn create_team(
    roster: &mut Roster,
    creator: &UserId,
    name: &str,
    description: Option<String>,
    code_len: usize,
    now: DateTime<Utc>,
) -> Result<TeamId, SchedError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(SchedError::Validation("team name is required".into()));
    }
    util::check_len("team name", Some(name), NAME_MAX)?;
    let description = util::clean(description);
    util::check_len("description", description.as_deref(), DESCRIPTION_MAX)?;

    let team = Team {
        id: TeamId::random(),
        name: name.to_string(),
        description,
        join_code: unique_join_code(roster, code_len.max(4)),
        owner: Some(creator.clone()),
        created_at: now,
    };
    let id = team.id.clone();
    roster.teams.push(team);
    roster.members.push(TeamMember {
        team: id.clone(),
        user: creator.clone(),
        joined_at: now,
    });
    Ok(id)
}

fn enroll(roster: &mut Roster, team: &TeamId, user: &UserId, now: DateTime<Utc>) -> Result<(), SchedError> {
    if roster.is_member(team, user) {
        return Err(SchedError::Validation(format!(
            "user {user} already belongs to team {team}"
        )));
    }
    roster.members.push(TeamMember {
        team: team.clone(),
        user: user.clone(),
        joined_at: now,
    });
    Ok(())
}

pub(super) fn join_team(
    roster: &mut Roster,
    user: &UserId,
    code: &str,
    now: DateTime<Utc>,
) -> Result<TeamId, SchedError> {
    let code = code.trim();
    let team = roster
        .teams
        .iter()
        .find(|t| t.join_code == code)
        .map(|t| t.id.clone())
        .ok_or_else(|| SchedError::not_found("join code", code))?;
    enroll(roster, &team, user, now)?;
    Ok(team)
}

pub(super) fn add_member(
    roster: &mut Roster,
    team: &TeamId,
    user: &UserId,
    now: DateTime<Utc>,
) -> Result<(), SchedError> {
    util::ensure_team(roster, team)?;
    if roster.find_user(user).is_none() {
        return Err(SchedError::not_found("user", user));
    }
    enroll(roster, team, user, now)
}

/// Le responsable ne peut pas être retiré ; ses assignations restent en
/// place, les workflows revérifient l'appartenance.
pub(super) fn remove_member(roster: &mut Roster, team: &TeamId, user: &UserId) -> Result<(), SchedError> {
    util::ensure_team(roster, team)?;
    util::ensure_member(roster, team, user)?;
    if roster.owner_of(team) == Some(user) {
        return Err(SchedError::Validation(
            "the team owner cannot be removed; hand over ownership first".into(),
        ));
    }
    roster.members.retain(|m| !(&m.team == team && &m.user == user));
    Ok(())
}

/// `Manager` transfère la responsabilité ; `Worker` ne rétrograde
/// personne et se contente de confirmer (refusé sur le responsable).
pub(super) fn set_team_role(
    roster: &mut Roster,
    team: &TeamId,
    user: &UserId,
    role: TeamRole,
) -> Result<RoleChange, SchedError> {
    util::ensure_team(roster, team)?;
    util::ensure_member(roster, team, user)?;
    let Some(entry) = roster.find_team_mut(team) else {
        return Err(SchedError::not_found("team", team));
    };
    match role {
        TeamRole::Manager if entry.is_owned_by(user) => Ok(RoleChange::Unchanged),
        TeamRole::Manager => {
            entry.owner = Some(user.clone());
            Ok(RoleChange::OwnerChanged)
        }
        TeamRole::Worker if entry.is_owned_by(user) => Err(SchedError::Validation(
            "cannot demote the owner without naming a new manager".into(),
        )),
        TeamRole::Worker => Ok(RoleChange::Unchanged),
    }
}

/// Suppression en cascade des shifts, membres et tâches. Les demandes et
/// leurs journaux restent comme historique ; les workflows les voient
/// comme caduques.
pub(super) fn delete_team(roster: &mut Roster, team: &TeamId) -> Result<(), SchedError> {
    util::ensure_team(roster, team)?;

    let shift_ids: Vec<_> = roster.team_shifts(team).map(|s| s.id.clone()).collect();
    roster.assignments.retain(|a| !shift_ids.contains(&a.shift));
    roster.shifts.retain(|s| &s.team != team);
    roster.members.retain(|m| &m.team != team);

    let task_ids: Vec<_> = roster
        .tasks
        .iter()
        .filter(|t| &t.team == team)
        .map(|t| t.id.clone())
        .collect();
    roster.task_comments.retain(|c| !task_ids.contains(&c.task));
    roster.tasks.retain(|t| &t.team != team);

    roster.teams.retain(|t| &t.id != team);
    Ok(())
}

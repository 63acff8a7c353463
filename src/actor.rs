use crate::model::{Roster, TeamId, UserId};
use crate::scheduler::SchedError;

/// Position d'un acteur vis-à-vis d'une équipe, lue dans le roster courant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Standing {
    Owner,
    Member,
    Outsider,
}

/// Qui agit. Construit à la frontière (CLI, service) puis passé
/// explicitement à chaque opération.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorContext {
    user: UserId,
    root_admin: bool,
}

impl ActorContext {
    pub fn new(user: UserId, root_admin: bool) -> Self {
        Self { user, root_admin }
    }

    pub fn member(user: UserId) -> Self {
        Self::new(user, false)
    }

    pub fn root_admin(user: UserId) -> Self {
        Self::new(user, true)
    }

    /// Résout un handle de l'annuaire ; les comptes verrouillés sont refusés.
    pub fn resolve(roster: &Roster, handle: &str, root_admin: bool) -> Result<Self, SchedError> {
        let user = roster
            .find_user_by_handle(handle)
            .ok_or_else(|| SchedError::not_found("user", handle))?;
        if user.locked {
            return Err(SchedError::Authorization(format!(
                "account {handle} is locked"
            )));
        }
        Ok(Self::new(user.id.clone(), root_admin))
    }

    pub fn user(&self) -> &UserId {
        &self.user
    }

    pub fn is_root_admin(&self) -> bool {
        self.root_admin
    }

    pub fn standing(&self, roster: &Roster, team: &TeamId) -> Standing {
        let owner = roster
            .find_team(team)
            .map(|t| t.is_owned_by(&self.user))
            .unwrap_or(false);
        if owner {
            Standing::Owner
        } else if roster.is_member(team, &self.user) {
            Standing::Member
        } else {
            Standing::Outsider
        }
    }

    /// Admin racine, ou responsable encore membre de l'équipe.
    pub fn can_manage(&self, roster: &Roster, team: &TeamId) -> bool {
        self.root_admin
            || (self.standing(roster, team) == Standing::Owner && roster.is_member(team, &self.user))
    }

    pub fn can_view(&self, roster: &Roster, team: &TeamId) -> bool {
        self.root_admin || roster.is_member(team, &self.user)
    }

    pub(crate) fn ensure_manager(&self, roster: &Roster, team: &TeamId) -> Result<(), SchedError> {
        if self.can_manage(roster, team) {
            Ok(())
        } else {
            Err(SchedError::Authorization(format!(
                "user {} cannot manage team {team}",
                self.user
            )))
        }
    }

    pub(crate) fn ensure_root_admin(&self, action: &str) -> Result<(), SchedError> {
        if self.root_admin {
            Ok(())
        } else {
            Err(SchedError::Authorization(format!(
                "only a root admin may {action}"
            )))
        }
    }
}

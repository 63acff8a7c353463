mod conflicts;
mod roster;
mod swap;
mod tasks;
mod teams;
mod time_off;
mod types;
mod util;

pub use conflicts::{
    conflicting_users, detect_conflicts, has_conflict, time_off_conflicts, user_conflicts,
};
pub use swap::SwapOffer;
pub use time_off::TimeOffReview;
pub use types::{
    AssignmentDiff, Conflict, ConflictKind, RoleChange, SchedError, SchedulerOptions, ShiftDraft,
    ShiftRemoval, SwapDraft, TaskDraft, TeamRole, TimeOffDraft, MAX_SWAP_GRACE_MINUTES,
};

use crate::actor::ActorContext;
use crate::clock::{Clock, SystemClock};
use crate::model::{
    Roster, ShiftId, SwapId, TaskActivity, TaskId, TaskStatus, TeamId, TimeOffId, UserId,
};
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;

/// Scheduler : encapsule le roster courant et applique chaque opération
/// comme une unité de travail (tout ou rien).
pub struct Scheduler {
    roster: Roster,
    options: SchedulerOptions,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("revision", &self.roster.revision)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self::with_roster(Roster::default())
    }

    pub fn with_roster(roster: Roster) -> Self {
        Self {
            roster,
            options: SchedulerOptions::default(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_options(mut self, mut options: SchedulerOptions) -> Self {
        options.swap_grace_minutes = options.swap_grace_minutes.clamp(0, MAX_SWAP_GRACE_MINUTES);
        self.options = options;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn into_roster(self) -> Roster {
        self.roster
    }

    /// Remplace l'état courant (rechargement après un commit refusé).
    pub fn replace_roster(&mut self, roster: Roster) {
        self.roster = roster;
    }

    pub fn options(&self) -> &SchedulerOptions {
        &self.options
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Applique `op` sur une copie du roster. En cas de succès la copie
    /// remplace l'état et la révision avance ; sinon elle est jetée.
    pub fn transact<T, F>(&mut self, op: F) -> Result<T, SchedError>
    where
        F: FnOnce(&mut Roster, DateTime<Utc>) -> Result<T, SchedError>,
    {
        let now = self.clock.now();
        let mut draft = self.roster.clone();
        let out = op(&mut draft, now)?;
        draft.revision = self.roster.revision + 1;
        self.roster = draft;
        Ok(out)
    }

    // --- annuaire et équipes ---

    pub fn add_user(&mut self, handle: &str, display_name: &str) -> Result<UserId, SchedError> {
        let id = self.transact(|r, _| teams::add_user(r, handle, display_name))?;
        audit!(user = %id, handle, "user added");
        Ok(id)
    }

    pub fn set_locked(&mut self, actor: &ActorContext, user: &UserId, locked: bool) -> Result<(), SchedError> {
        self.transact(|r, _| {
            actor.ensure_root_admin("lock accounts")?;
            teams::set_locked(r, user, locked)
        })?;
        audit!(actor = %actor.user(), user = %user, locked, "account lock changed");
        Ok(())
    }

    pub fn create_team(
        &mut self,
        actor: &ActorContext,
        name: &str,
        description: Option<String>,
    ) -> Result<TeamId, SchedError> {
        let code_len = self.options.join_code_len;
        let id = self.transact(|r, now| {
            actor.ensure_root_admin("create teams")?;
            teams::create_team(r, actor.user(), name, description, code_len, now)
        })?;
        audit!(actor = %actor.user(), team = %id, name, "team created");
        Ok(id)
    }

    pub fn join_team(&mut self, actor: &ActorContext, code: &str) -> Result<TeamId, SchedError> {
        let team = self.transact(|r, now| teams::join_team(r, actor.user(), code, now))?;
        audit!(actor = %actor.user(), team = %team, "team joined");
        Ok(team)
    }

    pub fn add_member(&mut self, actor: &ActorContext, team: &TeamId, user: &UserId) -> Result<(), SchedError> {
        self.transact(|r, now| {
            util::ensure_team(r, team)?;
            actor.ensure_manager(r, team)?;
            teams::add_member(r, team, user, now)
        })?;
        audit!(actor = %actor.user(), team = %team, user = %user, "member added");
        Ok(())
    }

    pub fn remove_member(&mut self, actor: &ActorContext, team: &TeamId, user: &UserId) -> Result<(), SchedError> {
        self.transact(|r, _| {
            util::ensure_team(r, team)?;
            actor.ensure_manager(r, team)?;
            teams::remove_member(r, team, user)
        })?;
        audit!(actor = %actor.user(), team = %team, user = %user, "member removed");
        Ok(())
    }

    pub fn set_team_role(
        &mut self,
        actor: &ActorContext,
        team: &TeamId,
        user: &UserId,
        role: TeamRole,
    ) -> Result<RoleChange, SchedError> {
        let change = self.transact(|r, _| {
            util::ensure_team(r, team)?;
            actor.ensure_manager(r, team)?;
            teams::set_team_role(r, team, user, role)
        })?;
        audit!(actor = %actor.user(), team = %team, user = %user, ?role, ?change, "team role set");
        Ok(change)
    }

    pub fn delete_team(&mut self, actor: &ActorContext, team: &TeamId) -> Result<(), SchedError> {
        self.transact(|r, _| {
            util::ensure_team(r, team)?;
            actor.ensure_manager(r, team)?;
            teams::delete_team(r, team)
        })?;
        audit!(actor = %actor.user(), team = %team, "team deleted");
        Ok(())
    }

    // --- shifts ---

    pub fn create_shift(
        &mut self,
        actor: &ActorContext,
        team: &TeamId,
        draft: ShiftDraft,
    ) -> Result<ShiftId, SchedError> {
        let id = self.transact(|r, _| {
            util::ensure_team(r, team)?;
            actor.ensure_manager(r, team)?;
            roster::create_shift(r, team, draft)
        })?;
        audit!(actor = %actor.user(), team = %team, shift = %id, "shift created");
        Ok(id)
    }

    pub fn edit_shift(
        &mut self,
        actor: &ActorContext,
        shift: &ShiftId,
        draft: ShiftDraft,
    ) -> Result<AssignmentDiff, SchedError> {
        let diff = self.transact(|r, _| {
            let team = shift_team(r, shift)?;
            actor.ensure_manager(r, &team)?;
            roster::edit_shift(r, shift, draft)
        })?;
        audit!(
            actor = %actor.user(),
            shift = %shift,
            added = diff.added.len(),
            removed = diff.removed.len(),
            "shift edited"
        );
        Ok(diff)
    }

    pub fn delete_shift(&mut self, actor: &ActorContext, shift: &ShiftId) -> Result<ShiftRemoval, SchedError> {
        let removal = self.transact(|r, _| {
            let team = shift_team(r, shift)?;
            actor.ensure_manager(r, &team)?;
            roster::delete_shift(r, shift)
        })?;
        audit!(
            actor = %actor.user(),
            shift = %shift,
            voided_swaps = removal.voided_swaps.len(),
            "shift deleted"
        );
        Ok(removal)
    }

    /// Balayage complet des assignations (contrôle d'intégrité).
    pub fn detect_conflicts(&self) -> Vec<Conflict> {
        conflicts::detect_conflicts(&self.roster)
    }

    // --- congés ---

    pub fn request_time_off(&mut self, actor: &ActorContext, draft: TimeOffDraft) -> Result<TimeOffId, SchedError> {
        let id = self.transact(|r, now| time_off::create(r, actor, draft, now))?;
        audit!(actor = %actor.user(), request = %id, "time-off requested");
        Ok(id)
    }

    pub fn cancel_time_off(&mut self, actor: &ActorContext, id: &TimeOffId) -> Result<(), SchedError> {
        self.transact(|r, now| time_off::cancel(r, actor, id, now))?;
        audit!(actor = %actor.user(), request = %id, "time-off canceled");
        Ok(())
    }

    pub fn approve_time_off(
        &mut self,
        actor: &ActorContext,
        id: &TimeOffId,
        note: Option<String>,
    ) -> Result<(), SchedError> {
        self.transact(|r, now| time_off::approve(r, actor, id, note, now))?;
        audit!(actor = %actor.user(), request = %id, "time-off approved");
        Ok(())
    }

    pub fn reject_time_off(
        &mut self,
        actor: &ActorContext,
        id: &TimeOffId,
        note: Option<String>,
    ) -> Result<(), SchedError> {
        self.transact(|r, now| time_off::reject(r, actor, id, note, now))?;
        audit!(actor = %actor.user(), request = %id, "time-off rejected");
        Ok(())
    }

    pub fn time_off_queue(&self, team: Option<&TeamId>) -> Vec<TimeOffReview<'_>> {
        time_off::review_queue(&self.roster, team)
    }

    // --- échanges ---

    pub fn request_swap(&mut self, actor: &ActorContext, draft: SwapDraft) -> Result<SwapId, SchedError> {
        let grace = self.options.swap_grace_minutes;
        let id = self.transact(|r, now| swap::create(r, actor, draft, now, grace))?;
        audit!(actor = %actor.user(), request = %id, "swap requested");
        Ok(id)
    }

    pub fn claim_swap(&mut self, actor: &ActorContext, id: &SwapId) -> Result<(), SchedError> {
        self.transact(|r, now| swap::claim(r, actor, id, now))?;
        audit!(actor = %actor.user(), request = %id, "swap claimed");
        Ok(())
    }

    pub fn cancel_swap(&mut self, actor: &ActorContext, id: &SwapId) -> Result<(), SchedError> {
        self.transact(|r, now| swap::cancel(r, actor, id, now))?;
        audit!(actor = %actor.user(), request = %id, "swap canceled");
        Ok(())
    }

    pub fn approve_swap(&mut self, actor: &ActorContext, id: &SwapId, note: Option<String>) -> Result<(), SchedError> {
        self.transact(|r, now| swap::approve(r, actor, id, note, now))?;
        audit!(actor = %actor.user(), request = %id, "swap approved");
        Ok(())
    }

    pub fn reject_swap(&mut self, actor: &ActorContext, id: &SwapId, note: Option<String>) -> Result<(), SchedError> {
        self.transact(|r, now| swap::reject(r, actor, id, note, now))?;
        audit!(actor = %actor.user(), request = %id, "swap rejected");
        Ok(())
    }

    pub fn open_swaps(&self, actor: &ActorContext, team: Option<&TeamId>) -> Vec<SwapOffer<'_>> {
        swap::open_offers(&self.roster, actor, team)
    }

    pub fn claimed_swaps(&self, team: Option<&TeamId>) -> Vec<SwapOffer<'_>> {
        swap::approval_queue(&self.roster, team)
    }

    // --- tâches ---

    pub fn create_task(&mut self, actor: &ActorContext, team: &TeamId, draft: TaskDraft) -> Result<TaskId, SchedError> {
        let id = self.transact(|r, now| tasks::create_task(r, actor, team, draft, now))?;
        audit!(actor = %actor.user(), team = %team, task = %id, "task created");
        Ok(id)
    }

    pub fn edit_task(
        &mut self,
        actor: &ActorContext,
        id: &TaskId,
        draft: TaskDraft,
    ) -> Result<Vec<TaskActivity>, SchedError> {
        let changes = self.transact(|r, now| tasks::edit_task(r, actor, id, draft, now))?;
        audit!(actor = %actor.user(), task = %id, changes = changes.len(), "task edited");
        Ok(changes)
    }

    pub fn change_task_status(
        &mut self,
        actor: &ActorContext,
        id: &TaskId,
        status: TaskStatus,
    ) -> Result<bool, SchedError> {
        let changed = self.transact(|r, now| tasks::change_task_status(r, actor, id, status, now))?;
        audit!(actor = %actor.user(), task = %id, %status, changed, "task status set");
        Ok(changed)
    }

    pub fn comment_task(&mut self, actor: &ActorContext, id: &TaskId, content: &str) -> Result<(), SchedError> {
        self.transact(|r, now| tasks::comment_task(r, actor, id, content, now))?;
        audit!(actor = %actor.user(), task = %id, "task commented");
        Ok(())
    }

    pub fn delete_task(&mut self, actor: &ActorContext, id: &TaskId) -> Result<(), SchedError> {
        self.transact(|r, _| tasks::delete_task(r, actor, id))?;
        audit!(actor = %actor.user(), task = %id, "task deleted");
        Ok(())
    }
}

fn shift_team(roster: &Roster, shift: &ShiftId) -> Result<TeamId, SchedError> {
    roster
        .find_shift(shift)
        .map(|s| s.team.clone())
        .ok_or_else(|| SchedError::not_found("shift", shift))
}

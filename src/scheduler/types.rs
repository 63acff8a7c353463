use crate::model::{ShiftId, TaskPriority, TaskStatus, TeamId, TimeOffKind, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeSet;
use thiserror::Error;

/// Tolérance maximale (minutes) pour proposer un shift déjà commencé.
pub const MAX_SWAP_GRACE_MINUTES: i64 = 1;

/// Réglages du moteur
#[derive(Debug, Clone, Copy)]
pub struct SchedulerOptions {
    /// Tolérance pour proposer l'échange d'un shift qui vient de commencer,
    /// ramenée à `0..=MAX_SWAP_GRACE_MINUTES` par `Scheduler::with_options`.
    pub swap_grace_minutes: i64,
    pub join_code_len: usize,
    /// Fenêtre par défaut des rapports (jours avant aujourd'hui).
    pub report_window_days: i64,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            swap_grace_minutes: 1,
            join_code_len: 8,
            report_window_days: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    /// deux shifts qui se chevauchent pour la même personne
    Overlap,
    /// une demande de congé qui recouvre un shift assigné
    TimeOff,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub user: UserId,
    /// Shift déjà assigné qui bloque.
    pub shift_a: ShiftId,
    /// Second shift persisté, quand il existe (édition, scan complet).
    pub shift_b: Option<ShiftId>,
    pub kind: ConflictKind,
}

#[derive(Error, Debug)]
pub enum SchedError {
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("forbidden: {0}")]
    Authorization(String),
    #[error("user {user} is not a member of team {team}")]
    NotMember { team: TeamId, user: UserId },
    #[error("user {user} is not assigned to shift {shift}")]
    NotAssigned { shift: ShiftId, user: UserId },
    /// Transition demandée depuis un statut qui ne l'autorise pas.
    #[error("request {request} is {status}, cannot {action}")]
    InvalidTransition {
        request: String,
        status: String,
        action: &'static str,
    },
    /// La demande a déjà été traitée (revue ou réservation concurrente).
    #[error("request {request} was already reviewed ({status})")]
    AlreadyReviewed { request: String, status: String },
    #[error("scheduling conflict for: {}", list_users(.conflicts))]
    SchedulingConflict { conflicts: Vec<Conflict> },
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
    #[error("roster changed concurrently (expected revision {expected}, found {found})")]
    ConcurrentModification { expected: u64, found: u64 },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SchedError {
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        SchedError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Utilisateurs en conflit, vide pour les autres variantes.
    pub fn conflicting_users(&self) -> BTreeSet<UserId> {
        match self {
            SchedError::SchedulingConflict { conflicts } => {
                conflicts.iter().map(|c| c.user.clone()).collect()
            }
            _ => BTreeSet::new(),
        }
    }
}

fn list_users(conflicts: &[Conflict]) -> String {
    let users: BTreeSet<&str> = conflicts.iter().map(|c| c.user.as_str()).collect();
    users.into_iter().collect::<Vec<_>>().join(", ")
}

/// Champs d'un shift à créer ou à modifier.
#[derive(Debug, Clone)]
pub struct ShiftDraft {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub location: Option<String>,
    pub note: Option<String>,
    pub assignees: Vec<UserId>,
}

#[derive(Debug, Clone)]
pub struct TimeOffDraft {
    pub team: TeamId,
    pub kind: TimeOffKind,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SwapDraft {
    pub team: TeamId,
    pub shift: ShiftId,
    pub requested_to: Option<UserId>,
    pub message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TaskDraft {
    pub title: String,
    pub description: Option<String>,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub due: Option<NaiveDate>,
    pub assignee: Option<UserId>,
    pub shift: Option<ShiftId>,
}

impl TaskDraft {
    pub fn new<T: Into<String>>(title: T) -> Self {
        Self {
            title: title.into(),
            description: None,
            priority: TaskPriority::Medium,
            status: TaskStatus::New,
            due: None,
            assignee: None,
            shift: None,
        }
    }
}

/// Issue d'un changement de rôle dans l'équipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeamRole {
    Manager,
    Worker,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleChange {
    OwnerChanged,
    /// Rien à faire : la cible était déjà dans ce rôle.
    Unchanged,
}

/// Effets de bord d'une suppression de shift.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShiftRemoval {
    pub assignments_removed: usize,
    pub voided_swaps: Vec<crate::model::SwapId>,
    pub unlinked_tasks: usize,
}

/// Différence appliquée à l'ensemble des assignations d'un shift.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentDiff {
    pub added: BTreeSet<UserId>,
    pub removed: BTreeSet<UserId>,
}

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            pub fn new<S: AsRef<str>>(s: S) -> Self {
                Self(s.as_ref().to_owned())
            }
            pub fn random() -> Self {
                Self(Uuid::new_v4().to_string())
            }
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// Identifiant fort pour un utilisateur (fourni par l'annuaire)
    UserId
);
string_id!(
    /// Identifiant fort pour Team
    TeamId
);
string_id!(
    /// Identifiant fort pour Shift
    ShiftId
);
string_id!(TimeOffId);
string_id!(SwapId);
string_id!(TaskId);

/// Entrée de l'annuaire. L'authentification vit ailleurs ; on ne garde que
/// ce dont le coeur a besoin pour construire un `ActorContext`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub handle: String,
    pub display_name: String,
    #[serde(default)]
    pub locked: bool,
}

impl User {
    pub fn new<H: Into<String>, D: Into<String>>(handle: H, display_name: D) -> Self {
        Self {
            id: UserId::random(),
            handle: handle.into(),
            display_name: display_name.into(),
            locked: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub join_code: String,
    /// `None` : équipe sans responsable (état dégradé mais valide).
    #[serde(default)]
    pub owner: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

impl Team {
    pub fn is_owned_by(&self, user: &UserId) -> bool {
        self.owner.as_ref() == Some(user)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMember {
    pub team: TeamId,
    pub user: UserId,
    pub joined_at: DateTime<Utc>,
}

/// Intervalle UTC semi-ouvert `[start, end)`, toujours non vide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl Interval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, String> {
        if end <= start {
            return Err("end must be strictly after start".to_string());
        }
        Ok(Self { start, end })
    }

    /// Plage de jours inclusive `start..=end`, vue comme `[start 00:00, end+1 00:00)`.
    pub fn from_dates(start: NaiveDate, end: NaiveDate) -> Result<Self, String> {
        if end < start {
            return Err("end date cannot be before start date".to_string());
        }
        let start = start.and_time(NaiveTime::MIN).and_utc();
        let end = end
            .and_time(NaiveTime::MIN)
            .and_utc()
            .checked_add_signed(Duration::days(1))
            .ok_or_else(|| "end date out of range".to_string())?;
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Partie commune des deux intervalles, si elle existe.
    pub fn clip(&self, window: &Interval) -> Option<Interval> {
        let start = self.start.max(window.start);
        let end = self.end.min(window.end);
        (start < end).then_some(Interval { start, end })
    }

    pub fn hours(&self) -> f64 {
        (self.end - self.start).num_seconds() as f64 / 3600.0
    }
}

/// Créneau de travail d'une équipe (UTC)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shift {
    pub id: ShiftId,
    pub team: TeamId,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

impl Shift {
    pub fn new(
        team: TeamId,
        window: Interval,
        location: Option<String>,
        note: Option<String>,
    ) -> Self {
        Self {
            id: ShiftId::random(),
            team,
            start: window.start(),
            end: window.end(),
            location,
            note,
        }
    }

    pub fn interval(&self) -> Interval {
        Interval {
            start: self.start,
            end: self.end,
        }
    }

    /// Durée en minutes.
    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftAssignment {
    pub shift: ShiftId,
    pub user: UserId,
}

/// Trace de revue commune aux demandes (congés, échanges).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub reviewer: UserId,
    pub reviewed_at: DateTime<Utc>,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeOffKind {
    Vacation,
    OnDemand,
    Sick,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeOffStatus {
    Pending,
    Approved,
    Rejected,
    Canceled,
}

impl TimeOffStatus {
    pub fn is_terminal(self) -> bool {
        self != TimeOffStatus::Pending
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeOffRequest {
    pub id: TimeOffId,
    pub team: TeamId,
    pub requester: UserId,
    pub kind: TimeOffKind,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: TimeOffStatus,
    #[serde(default)]
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub review: Option<Review>,
}

impl TimeOffRequest {
    pub fn interval(&self) -> Result<Interval, String> {
        Interval::from_dates(self.start_date, self.end_date)
    }

    /// Nombre de jours de la demande contenus dans `[from, to]`.
    pub fn days_within(&self, from: NaiveDate, to: NaiveDate) -> i64 {
        let start = self.start_date.max(from);
        let end = self.end_date.min(to);
        if end < start {
            return 0;
        }
        (end - start).num_days() + 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeOffAction {
    Created,
    Approved,
    Rejected,
    Canceled,
}

/// Journal append-only, un événement par transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeOffEvent {
    pub request: TimeOffId,
    pub actor: UserId,
    pub action: TimeOffAction,
    #[serde(default)]
    pub note: Option<String>,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapStatus {
    Pending,
    Claimed,
    Approved,
    Rejected,
    Canceled,
}

impl SwapStatus {
    /// Pending ou Claimed : la demande bloque un doublon.
    pub fn is_active(self) -> bool {
        matches!(self, SwapStatus::Pending | SwapStatus::Claimed)
    }

    pub fn is_terminal(self) -> bool {
        !self.is_active()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapRequest {
    pub id: SwapId,
    pub team: TeamId,
    pub shift: ShiftId,
    pub requester: UserId,
    /// Offre dirigée ; `None` = n'importe quel membre peut la prendre.
    #[serde(default)]
    pub requested_to: Option<UserId>,
    #[serde(default)]
    pub taker: Option<UserId>,
    pub status: SwapStatus,
    #[serde(default)]
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub claimed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub review: Option<Review>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapAction {
    Created,
    Claimed,
    Approved,
    Rejected,
    Canceled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapEvent {
    pub request: SwapId,
    pub actor: UserId,
    pub action: SwapAction,
    #[serde(default)]
    pub note: Option<String>,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    New,
    InProgress,
    Done,
    Canceled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskItem {
    pub id: TaskId,
    pub team: TeamId,
    #[serde(default)]
    pub shift: Option<ShiftId>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    #[serde(default)]
    pub due: Option<NaiveDate>,
    #[serde(default)]
    pub assignee: Option<UserId>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskActivity {
    Created,
    Comment,
    StatusChanged,
    AssigneeChanged,
    DueDateChanged,
    PriorityChanged,
    ShiftLinkChanged,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskComment {
    pub task: TaskId,
    pub author: UserId,
    pub kind: TaskActivity,
    #[serde(default)]
    pub content: Option<String>,
    pub at: DateTime<Utc>,
}

/// Roster complet : toutes les tables, reliées par identifiants.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Roster {
    /// Jeton de concurrence optimiste, incrémenté à chaque commit.
    #[serde(default)]
    pub revision: u64,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub teams: Vec<Team>,
    #[serde(default)]
    pub members: Vec<TeamMember>,
    #[serde(default)]
    pub shifts: Vec<Shift>,
    #[serde(default)]
    pub assignments: Vec<ShiftAssignment>,
    #[serde(default)]
    pub time_off: Vec<TimeOffRequest>,
    #[serde(default)]
    pub time_off_events: Vec<TimeOffEvent>,
    #[serde(default)]
    pub swaps: Vec<SwapRequest>,
    #[serde(default)]
    pub swap_events: Vec<SwapEvent>,
    #[serde(default)]
    pub tasks: Vec<TaskItem>,
    #[serde(default)]
    pub task_comments: Vec<TaskComment>,
}

impl Roster {
    pub fn find_user_by_handle<'a>(&'a self, handle: &str) -> Option<&'a User> {
        self.users.iter().find(|u| u.handle == handle)
    }
    pub fn find_user<'a>(&'a self, id: &UserId) -> Option<&'a User> {
        self.users.iter().find(|u| &u.id == id)
    }
    pub fn find_user_mut(&mut self, id: &UserId) -> Option<&mut User> {
        self.users.iter_mut().find(|u| &u.id == id)
    }

    pub fn find_team<'a>(&'a self, id: &TeamId) -> Option<&'a Team> {
        self.teams.iter().find(|t| &t.id == id)
    }
    pub fn find_team_mut(&mut self, id: &TeamId) -> Option<&mut Team> {
        self.teams.iter_mut().find(|t| &t.id == id)
    }
    /// Recherche par identifiant, puis par nom.
    pub fn lookup_team<'a>(&'a self, key: &str) -> Option<&'a Team> {
        self.teams
            .iter()
            .find(|t| t.id.as_str() == key)
            .or_else(|| self.teams.iter().find(|t| t.name == key))
    }

    pub fn is_member(&self, team: &TeamId, user: &UserId) -> bool {
        self.members
            .iter()
            .any(|m| &m.team == team && &m.user == user)
    }
    pub fn members_of(&self, team: &TeamId) -> BTreeSet<UserId> {
        self.members
            .iter()
            .filter(|m| &m.team == team)
            .map(|m| m.user.clone())
            .collect()
    }
    pub fn owner_of<'a>(&'a self, team: &TeamId) -> Option<&'a UserId> {
        self.find_team(team).and_then(|t| t.owner.as_ref())
    }

    pub fn find_shift<'a>(&'a self, id: &ShiftId) -> Option<&'a Shift> {
        self.shifts.iter().find(|s| &s.id == id)
    }
    pub fn find_shift_mut(&mut self, id: &ShiftId) -> Option<&mut Shift> {
        self.shifts.iter_mut().find(|s| &s.id == id)
    }
    pub fn team_shifts<'a>(&'a self, team: &'a TeamId) -> impl Iterator<Item = &'a Shift> + 'a {
        self.shifts.iter().filter(move |s| &s.team == team)
    }

    pub fn assignees(&self, shift: &ShiftId) -> BTreeSet<UserId> {
        self.assignments
            .iter()
            .filter(|a| &a.shift == shift)
            .map(|a| a.user.clone())
            .collect()
    }
    pub fn is_assigned(&self, shift: &ShiftId, user: &UserId) -> bool {
        self.assignments
            .iter()
            .any(|a| &a.shift == shift && &a.user == user)
    }
    /// Shifts d'une équipe assignés à `user`.
    pub fn shifts_of<'a>(
        &'a self,
        team: &'a TeamId,
        user: &'a UserId,
    ) -> impl Iterator<Item = &'a Shift> + 'a {
        self.assignments
            .iter()
            .filter(move |a| &a.user == user)
            .filter_map(move |a| self.find_shift(&a.shift))
            .filter(move |s| &s.team == team)
    }

    pub fn find_time_off<'a>(&'a self, id: &TimeOffId) -> Option<&'a TimeOffRequest> {
        self.time_off.iter().find(|r| &r.id == id)
    }
    pub fn find_time_off_mut(&mut self, id: &TimeOffId) -> Option<&mut TimeOffRequest> {
        self.time_off.iter_mut().find(|r| &r.id == id)
    }
    pub fn time_off_history<'a>(
        &'a self,
        id: &'a TimeOffId,
    ) -> impl Iterator<Item = &'a TimeOffEvent> + 'a {
        self.time_off_events.iter().filter(move |e| &e.request == id)
    }

    pub fn find_swap<'a>(&'a self, id: &SwapId) -> Option<&'a SwapRequest> {
        self.swaps.iter().find(|r| &r.id == id)
    }
    pub fn find_swap_mut(&mut self, id: &SwapId) -> Option<&mut SwapRequest> {
        self.swaps.iter_mut().find(|r| &r.id == id)
    }
    pub fn swap_history<'a>(&'a self, id: &'a SwapId) -> impl Iterator<Item = &'a SwapEvent> + 'a {
        self.swap_events.iter().filter(move |e| &e.request == id)
    }
    /// Une demande d'échange dont le shift a été supprimé est caduque.
    pub fn swap_is_void(&self, request: &SwapRequest) -> bool {
        self.find_shift(&request.shift).is_none()
    }

    pub fn find_task<'a>(&'a self, id: &TaskId) -> Option<&'a TaskItem> {
        self.tasks.iter().find(|t| &t.id == id)
    }
    pub fn find_task_mut(&mut self, id: &TaskId) -> Option<&mut TaskItem> {
        self.tasks.iter_mut().find(|t| &t.id == id)
    }
    pub fn task_activity<'a>(&'a self, id: &'a TaskId) -> impl Iterator<Item = &'a TaskComment> + 'a {
        self.task_comments.iter().filter(move |c| &c.task == id)
    }
}

impl fmt::Display for TimeOffKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TimeOffKind::Vacation => "vacation",
            TimeOffKind::OnDemand => "on_demand",
            TimeOffKind::Sick => "sick",
            TimeOffKind::Other => "other",
        })
    }
}

impl FromStr for TimeOffKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "vacation" => Ok(TimeOffKind::Vacation),
            "on_demand" | "ondemand" => Ok(TimeOffKind::OnDemand),
            "sick" => Ok(TimeOffKind::Sick),
            "other" => Ok(TimeOffKind::Other),
            other => Err(format!("unknown time-off kind: {other}")),
        }
    }
}

impl fmt::Display for TimeOffStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TimeOffStatus::Pending => "pending",
            TimeOffStatus::Approved => "approved",
            TimeOffStatus::Rejected => "rejected",
            TimeOffStatus::Canceled => "canceled",
        })
    }
}

impl FromStr for TimeOffStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(TimeOffStatus::Pending),
            "approved" => Ok(TimeOffStatus::Approved),
            "rejected" => Ok(TimeOffStatus::Rejected),
            "canceled" | "cancelled" => Ok(TimeOffStatus::Canceled),
            other => Err(format!("unknown time-off status: {other}")),
        }
    }
}

impl fmt::Display for SwapStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SwapStatus::Pending => "pending",
            SwapStatus::Claimed => "claimed",
            SwapStatus::Approved => "approved",
            SwapStatus::Rejected => "rejected",
            SwapStatus::Canceled => "canceled",
        })
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
            TaskPriority::Critical => "critical",
        })
    }
}

impl FromStr for TaskPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(TaskPriority::Low),
            "medium" => Ok(TaskPriority::Medium),
            "high" => Ok(TaskPriority::High),
            "critical" => Ok(TaskPriority::Critical),
            other => Err(format!("unknown task priority: {other}")),
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TaskStatus::New => "new",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Done => "done",
            TaskStatus::Canceled => "canceled",
        })
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "new" => Ok(TaskStatus::New),
            "in_progress" => Ok(TaskStatus::InProgress),
            "done" => Ok(TaskStatus::Done),
            "canceled" | "cancelled" => Ok(TaskStatus::Canceled),
            other => Err(format!("unknown task status: {other}")),
        }
    }
}

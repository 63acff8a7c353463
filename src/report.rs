//! Rapports en lecture seule sur un roster (heures, absences, tâches, charge).

use crate::model::{
    Interval, Roster, ShiftId, TaskId, TaskItem, TaskPriority, TaskStatus, TeamId, TimeOffKind,
    TimeOffStatus, UserId,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoursRow {
    pub user: UserId,
    pub handle: String,
    pub shifts: usize,
    pub hours: f64,
}

/// Heures assignées par personne sur [from 00:00, to+1 00:00), shifts
/// rognés à la fenêtre. Les bornes inversées sont remises dans l'ordre.
pub fn hours_report(roster: &Roster, team: &TeamId, from: NaiveDate, to: NaiveDate) -> Vec<HoursRow> {
    let (from, to) = ordered(from, to);
    let Ok(window) = Interval::from_dates(from, to) else {
        return Vec::new();
    };

    let mut totals: BTreeMap<&UserId, (usize, f64)> = BTreeMap::new();
    for shift in roster.team_shifts(team) {
        let Some(part) = shift.interval().clip(&window) else {
            continue;
        };
        for a in roster.assignments.iter().filter(|a| a.shift == shift.id) {
            let entry = totals.entry(&a.user).or_default();
            entry.0 += 1;
            entry.1 += part.hours();
        }
    }

    let mut rows: Vec<HoursRow> = totals
        .into_iter()
        .map(|(user, (shifts, hours))| HoursRow {
            user: user.clone(),
            handle: handle_of(roster, user),
            shifts,
            hours,
        })
        .collect();
    rows.sort_by(|a, b| a.handle.cmp(&b.handle));
    rows
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AbsenceRow {
    pub request: String,
    pub user: UserId,
    pub handle: String,
    pub kind: TimeOffKind,
    pub status: TimeOffStatus,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Jours de la demande compris dans la fenêtre du rapport.
    pub days_in_range: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AbsenceSummary {
    pub user: UserId,
    pub handle: String,
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
    pub canceled: usize,
    pub approved_days: i64,
    pub total_days: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AbsenceReport {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub rows: Vec<AbsenceRow>,
    pub summary: Vec<AbsenceSummary>,
}

/// Demandes de congé d'une équipe recoupant [from, to], filtrables par
/// statut, avec un récapitulatif par personne.
pub fn absence_report(
    roster: &Roster,
    team: &TeamId,
    from: NaiveDate,
    to: NaiveDate,
    status: Option<TimeOffStatus>,
) -> AbsenceReport {
    let (from, to) = ordered(from, to);

    let mut rows: Vec<AbsenceRow> = roster
        .time_off
        .iter()
        .filter(|r| &r.team == team)
        .filter(|r| status.map_or(true, |s| r.status == s))
        .filter(|r| r.start_date <= to && r.end_date >= from)
        .map(|r| AbsenceRow {
            request: r.id.to_string(),
            user: r.requester.clone(),
            handle: handle_of(roster, &r.requester),
            kind: r.kind,
            status: r.status,
            start_date: r.start_date,
            end_date: r.end_date,
            days_in_range: r.days_within(from, to),
        })
        .collect();
    rows.sort_by(|a, b| {
        a.start_date
            .cmp(&b.start_date)
            .then_with(|| a.handle.cmp(&b.handle))
    });

    let mut per_user: BTreeMap<UserId, AbsenceSummary> = BTreeMap::new();
    for row in &rows {
        let entry = per_user.entry(row.user.clone()).or_insert_with(|| AbsenceSummary {
            user: row.user.clone(),
            handle: row.handle.clone(),
            pending: 0,
            approved: 0,
            rejected: 0,
            canceled: 0,
            approved_days: 0,
            total_days: 0,
        });
        match row.status {
            TimeOffStatus::Pending => entry.pending += 1,
            TimeOffStatus::Approved => {
                entry.approved += 1;
                entry.approved_days += row.days_in_range;
            }
            TimeOffStatus::Rejected => entry.rejected += 1,
            TimeOffStatus::Canceled => entry.canceled += 1,
        }
        entry.total_days += row.days_in_range;
    }

    AbsenceReport {
        from: Some(from),
        to: Some(to),
        rows,
        summary: per_user.into_values().collect(),
    }
}

/// Filtre sur l'assigné d'une tâche.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssigneeFilter {
    Unassigned,
    User(UserId),
}

impl AssigneeFilter {
    fn accepts(&self, task: &TaskItem) -> bool {
        match self {
            AssigneeFilter::Unassigned => task.assignee.is_none(),
            AssigneeFilter::User(user) => task.assignee.as_ref() == Some(user),
        }
    }
}

pub const UNASSIGNED: &str = "unassigned";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskRow {
    pub task: TaskId,
    pub title: String,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub assignee: Option<UserId>,
    /// Handle de l'assigné, ou `unassigned`.
    pub assignee_handle: String,
    pub created_at: DateTime<Utc>,
    pub due: Option<NaiveDate>,
    pub completed_at: Option<DateTime<Utc>>,
    pub completed_on_time: bool,
    pub completed_late: bool,
    pub completed_no_due: bool,
    pub overdue_open: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TaskSummary {
    pub assignee: String,
    pub total: usize,
    pub new: usize,
    pub in_progress: usize,
    pub done: usize,
    pub canceled: usize,
    pub completed_on_time: usize,
    pub completed_late: usize,
    pub completed_no_due: usize,
    pub overdue_open: usize,
    pub no_due_open: usize,
}

impl TaskSummary {
    fn add(&mut self, row: &TaskRow) {
        self.total += 1;
        match row.status {
            TaskStatus::New => self.new += 1,
            TaskStatus::InProgress => self.in_progress += 1,
            TaskStatus::Done => self.done += 1,
            TaskStatus::Canceled => self.canceled += 1,
        }
        self.completed_on_time += usize::from(row.completed_on_time);
        self.completed_late += usize::from(row.completed_late);
        self.completed_no_due += usize::from(row.completed_no_due);
        self.overdue_open += usize::from(row.overdue_open);
        self.no_due_open += usize::from(row.status != TaskStatus::Done && row.due.is_none());
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskReport {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub rows: Vec<TaskRow>,
    /// Une ligne par assigné, triée par handle.
    pub summary: Vec<TaskSummary>,
    pub totals: TaskSummary,
}

/// Tâches d'une équipe dont l'échéance (ou, à défaut, la date de création)
/// tombe dans [from, to]. Une tâche terminée le jour de son échéance est à
/// l'heure ; une tâche non terminée dont l'échéance est passée au jour
/// `today` est en retard. Lignes de la plus récente à la plus ancienne.
pub fn task_report(
    roster: &Roster,
    team: &TeamId,
    from: NaiveDate,
    to: NaiveDate,
    today: NaiveDate,
    status: Option<TaskStatus>,
    assignee: Option<&AssigneeFilter>,
) -> TaskReport {
    let (from, to) = ordered(from, to);

    let mut tasks: Vec<&TaskItem> = roster
        .tasks
        .iter()
        .filter(|t| &t.team == team)
        .filter(|t| {
            let day = t.due.unwrap_or_else(|| t.created_at.date_naive());
            from <= day && day <= to
        })
        .filter(|t| status.map_or(true, |s| t.status == s))
        .filter(|t| assignee.map_or(true, |a| a.accepts(t)))
        .collect();
    tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));

    let rows: Vec<TaskRow> = tasks
        .into_iter()
        .map(|t| {
            let done = t.status == TaskStatus::Done;
            let finished_by = |late: bool| match (t.due, t.completed_at) {
                (Some(due), Some(at)) if done => (at.date_naive() > due) == late,
                _ => false,
            };
            TaskRow {
                task: t.id.clone(),
                title: t.title.clone(),
                priority: t.priority,
                status: t.status,
                assignee: t.assignee.clone(),
                assignee_handle: t
                    .assignee
                    .as_ref()
                    .map_or_else(|| UNASSIGNED.to_string(), |u| handle_of(roster, u)),
                created_at: t.created_at,
                due: t.due,
                completed_at: t.completed_at,
                completed_on_time: finished_by(false),
                completed_late: finished_by(true),
                completed_no_due: done && t.due.is_none(),
                overdue_open: !done && t.due.map_or(false, |due| due < today),
            }
        })
        .collect();

    let mut per_assignee: BTreeMap<String, TaskSummary> = BTreeMap::new();
    let mut totals = TaskSummary {
        assignee: "*".to_string(),
        ..TaskSummary::default()
    };
    for row in &rows {
        per_assignee
            .entry(row.assignee_handle.clone())
            .or_insert_with(|| TaskSummary {
                assignee: row.assignee_handle.clone(),
                ..TaskSummary::default()
            })
            .add(row);
        totals.add(row);
    }

    TaskReport {
        from,
        to,
        rows,
        summary: per_assignee.into_values().collect(),
        totals,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadShiftRow {
    pub shift: ShiftId,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub location: Option<String>,
    pub note: Option<String>,
    pub assignments: usize,
}

impl LoadShiftRow {
    pub fn is_open(&self) -> bool {
        self.assignments == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadReport {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub total_shifts: usize,
    pub staffed_shifts: usize,
    pub open_shifts: usize,
    pub total_assignments: usize,
    pub avg_per_shift: f64,
    pub avg_per_staffed_shift: f64,
    /// Shifts commençant dans la fenêtre, par début croissant.
    pub shifts: Vec<LoadShiftRow>,
}

impl LoadReport {
    pub fn open(&self) -> impl Iterator<Item = &LoadShiftRow> {
        self.shifts.iter().filter(|s| s.is_open())
    }
}

/// Charge d'une équipe : shifts qui commencent dans [from 00:00, to+1 00:00),
/// pourvus ou non, et moyenne de personnes par shift.
pub fn load_report(roster: &Roster, team: &TeamId, from: NaiveDate, to: NaiveDate) -> LoadReport {
    let (from, to) = ordered(from, to);
    let window = Interval::from_dates(from, to).ok();

    let mut shifts: Vec<LoadShiftRow> = roster
        .team_shifts(team)
        .filter(|s| window.map_or(false, |w| w.start() <= s.start && s.start < w.end()))
        .map(|s| LoadShiftRow {
            shift: s.id.clone(),
            start: s.start,
            end: s.end,
            location: s.location.clone(),
            note: s.note.clone(),
            assignments: roster.assignees(&s.id).len(),
        })
        .collect();
    shifts.sort_by_key(|s| s.start);

    let total_shifts = shifts.len();
    let staffed_shifts = shifts.iter().filter(|s| !s.is_open()).count();
    let total_assignments: usize = shifts.iter().map(|s| s.assignments).sum();
    let ratio = |count: usize| {
        if count == 0 {
            0.0
        } else {
            total_assignments as f64 / count as f64
        }
    };

    LoadReport {
        from,
        to,
        total_shifts,
        staffed_shifts,
        open_shifts: total_shifts - staffed_shifts,
        total_assignments,
        avg_per_shift: ratio(total_shifts),
        avg_per_staffed_shift: ratio(staffed_shifts),
        shifts,
    }
}

fn ordered(from: NaiveDate, to: NaiveDate) -> (NaiveDate, NaiveDate) {
    if from <= to {
        (from, to)
    } else {
        (to, from)
    }
}

fn handle_of(roster: &Roster, user: &UserId) -> String {
    roster
        .find_user(user)
        .map(|u| u.handle.clone())
        .unwrap_or_else(|| user.to_string())
}

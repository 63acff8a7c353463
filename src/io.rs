use crate::model::{Roster, TeamId};
use crate::report::{AbsenceReport, HoursRow, LoadReport, TaskReport};
use anyhow::{bail, Context};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use csv::{ReaderBuilder, WriterBuilder};
use std::fs;
use std::io::Write;
use std::path::Path;

/// Ligne d'import d'annuaire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRow {
    pub handle: String,
    pub display_name: String,
}

/// Import d'utilisateurs depuis CSV: header `handle[,display_name]`
pub fn import_users_csv<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<UserRow>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;
    let mut out = Vec::new();
    for rec in rdr.records() {
        let rec = rec?;
        let handle = rec.get(0).context("missing handle")?.trim();
        if handle.is_empty() {
            bail!("invalid user row (empty handle)");
        }
        let display = rec.get(1).map(str::trim).filter(|d| !d.is_empty()).unwrap_or(handle);
        out.push(UserRow {
            handle: handle.to_string(),
            display_name: display.to_string(),
        });
    }
    Ok(out)
}

/// Ligne d'import de planning ; les assignés sont des handles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShiftRow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub location: Option<String>,
    pub note: Option<String>,
    pub assignees: Vec<String>,
}

/// Import de shifts: header `start,end[,location][,note][,assignees]`,
/// dates RFC3339 (ou `YYYY-MM-DD`, minuit UTC), assignés séparés par `;`.
pub fn import_shifts_csv<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<ShiftRow>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;
    let mut out = Vec::new();
    for (idx, rec) in rdr.records().enumerate() {
        let rec = rec?;
        let line = idx + 2;
        let start = parse_point(rec.get(0).context("missing start")?.trim())
            .with_context(|| format!("line {line}: start"))?;
        let end = parse_point(rec.get(1).context("missing end")?.trim())
            .with_context(|| format!("line {line}: end"))?;
        let text = |i: usize| {
            rec.get(i)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        let assignees = rec
            .get(4)
            .map(|raw| {
                raw.split(';')
                    .map(str::trim)
                    .filter(|h| !h.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        out.push(ShiftRow {
            start,
            end,
            location: text(2),
            note: text(3),
            assignees,
        });
    }
    Ok(out)
}

/// RFC3339, ou date seule interprétée à minuit UTC.
pub fn parse_point(raw: &str) -> anyhow::Result<DateTime<Utc>> {
    if let Ok(dt) = raw.parse::<DateTime<Utc>>() {
        return Ok(dt);
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("invalid date/datetime: {raw}"))?;
    let datetime = date
        .and_hms_opt(0, 0, 0)
        .context("invalid midnight conversion")?;
    Ok(Utc.from_utc_datetime(&datetime))
}

/// Export JSON du roster (jolie mise en forme)
pub fn export_roster_json<P: AsRef<Path>>(path: P, roster: &Roster) -> anyhow::Result<()> {
    let s = serde_json::to_string_pretty(roster)?;
    fs::write(path, s)?;
    Ok(())
}

/// CSV des shifts d'une équipe: header `id,start,end,location,assignees`
pub fn write_shifts_csv<W: Write>(out: W, roster: &Roster, team: &TeamId) -> anyhow::Result<()> {
    let mut w = WriterBuilder::new().has_headers(true).from_writer(out);
    w.write_record(["id", "start", "end", "location", "assignees"])?;
    let mut shifts: Vec<_> = roster.team_shifts(team).collect();
    shifts.sort_by_key(|s| s.start);
    for s in shifts {
        let assignees = roster
            .assignees(&s.id)
            .iter()
            .map(|u| {
                roster
                    .find_user(u)
                    .map(|p| p.handle.clone())
                    .unwrap_or_else(|| u.to_string())
            })
            .collect::<Vec<_>>()
            .join(";");
        let start = s.start.to_rfc3339();
        let end = s.end.to_rfc3339();
        w.write_record([
            s.id.as_str(),
            start.as_str(),
            end.as_str(),
            s.location.as_deref().unwrap_or(""),
            assignees.as_str(),
        ])?;
    }
    w.flush()?;
    Ok(())
}

/// CSV du rapport d'heures: header `handle,shifts,hours`
pub fn write_hours_csv<W: Write>(out: W, rows: &[HoursRow]) -> anyhow::Result<()> {
    let mut w = WriterBuilder::new().has_headers(true).from_writer(out);
    w.write_record(["handle", "shifts", "hours"])?;
    for row in rows {
        w.write_record([
            row.handle.clone(),
            row.shifts.to_string(),
            format!("{:.2}", row.hours),
        ])?;
    }
    w.flush()?;
    Ok(())
}

/// CSV du rapport d'absences (une ligne par demande).
pub fn write_absence_csv<W: Write>(out: W, report: &AbsenceReport) -> anyhow::Result<()> {
    let mut w = WriterBuilder::new().has_headers(true).from_writer(out);
    w.write_record([
        "request",
        "handle",
        "kind",
        "status",
        "start_date",
        "end_date",
        "days_in_range",
    ])?;
    for row in &report.rows {
        w.write_record([
            row.request.clone(),
            row.handle.clone(),
            row.kind.to_string(),
            row.status.to_string(),
            row.start_date.to_string(),
            row.end_date.to_string(),
            row.days_in_range.to_string(),
        ])?;
    }
    w.flush()?;
    Ok(())
}

/// Une ligne par tâche. `late` vaut pour une tâche terminée après son
/// échéance, `overdue_open` pour une tâche ouverte dont l'échéance est passée.
pub fn write_tasks_csv<W: Write>(out: W, report: &TaskReport) -> anyhow::Result<()> {
    let mut w = WriterBuilder::new().has_headers(true).from_writer(out);
    w.write_record([
        "id",
        "title",
        "priority",
        "status",
        "assignee",
        "created_at",
        "due",
        "completed_at",
        "late",
        "overdue_open",
    ])?;
    for row in &report.rows {
        w.write_record([
            row.task.to_string(),
            row.title.clone(),
            row.priority.to_string(),
            row.status.to_string(),
            row.assignee_handle.clone(),
            row.created_at.to_rfc3339(),
            row.due.map(|d| d.to_string()).unwrap_or_default(),
            row.completed_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
            row.completed_late.to_string(),
            row.overdue_open.to_string(),
        ])?;
    }
    w.flush()?;
    Ok(())
}

/// Deux sections : les indicateurs (`metric,value`), une ligne vide, puis les shifts.
pub fn write_load_csv<W: Write>(out: W, report: &LoadReport) -> anyhow::Result<()> {
    let mut w = WriterBuilder::new().flexible(true).from_writer(out);
    w.write_record(["metric", "value"])?;
    let metrics = [
        ("from", report.from.to_string()),
        ("to", report.to.to_string()),
        ("total_shifts", report.total_shifts.to_string()),
        ("staffed_shifts", report.staffed_shifts.to_string()),
        ("open_shifts", report.open_shifts.to_string()),
        ("total_assignments", report.total_assignments.to_string()),
        ("avg_per_shift", format!("{:.2}", report.avg_per_shift)),
        ("avg_per_staffed_shift", format!("{:.2}", report.avg_per_staffed_shift)),
    ];
    for (name, value) in &metrics {
        w.write_record([*name, value.as_str()])?;
    }
    w.write_record([""])?;
    w.write_record(["shift_id", "start", "end", "location", "note", "assignments", "open"])?;
    for s in &report.shifts {
        w.write_record([
            s.shift.to_string(),
            s.start.to_rfc3339(),
            s.end.to_rfc3339(),
            s.location.clone().unwrap_or_default(),
            s.note.clone().unwrap_or_default(),
            s.assignments.to_string(),
            s.is_open().to_string(),
        ])?;
    }
    w.flush()?;
    Ok(())
}

pub fn export_shifts_csv<P: AsRef<Path>>(path: P, roster: &Roster, team: &TeamId) -> anyhow::Result<()> {
    let file = fs::File::create(path.as_ref())
        .with_context(|| format!("creating {}", path.as_ref().display()))?;
    write_shifts_csv(file, roster, team)
}

pub fn export_hours_csv<P: AsRef<Path>>(path: P, rows: &[HoursRow]) -> anyhow::Result<()> {
    let file = fs::File::create(path.as_ref())
        .with_context(|| format!("creating {}", path.as_ref().display()))?;
    write_hours_csv(file, rows)
}

pub fn export_absence_csv<P: AsRef<Path>>(path: P, report: &AbsenceReport) -> anyhow::Result<()> {
    let file = fs::File::create(path.as_ref())
        .with_context(|| format!("creating {}", path.as_ref().display()))?;
    write_absence_csv(file, report)
}

pub fn export_tasks_csv<P: AsRef<Path>>(path: P, report: &TaskReport) -> anyhow::Result<()> {
    let file = fs::File::create(path.as_ref())
        .with_context(|| format!("creating {}", path.as_ref().display()))?;
    write_tasks_csv(file, report)
}

pub fn export_load_csv<P: AsRef<Path>>(path: P, report: &LoadReport) -> anyhow::Result<()> {
    let file = fs::File::create(path.as_ref())
        .with_context(|| format!("creating {}", path.as_ref().display()))?;
    write_load_csv(file, report)
}

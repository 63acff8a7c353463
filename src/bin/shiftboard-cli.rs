#![forbid(unsafe_code)]
use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use shiftboard::{
    io,
    model::{Roster, TaskPriority, TaskStatus, TimeOffKind, TimeOffStatus},
    report,
    scheduler::{
        ConflictKind, RoleChange, Scheduler, SchedulerOptions, ShiftDraft, SwapDraft, TaskDraft,
        TeamRole, TimeOffDraft, MAX_SWAP_GRACE_MINUTES,
    },
    storage::JsonStorage,
    ActorContext, Desk, ShiftId, SwapId, TaskId, TeamId, TimeOffId, UserId,
};
#[cfg(feature = "logging")]
use tracing_subscriber::{fmt::Subscriber, EnvFilter};

/// CLI de planning d'équipe (sans base de données)
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Active les logs (feature `logging`)
    #[arg(long, global = true)]
    log: bool,

    /// Fichier JSON de roster
    #[arg(long, global = true, default_value = "roster.json")]
    roster: String,

    /// Handle de l'utilisateur qui agit
    #[arg(long = "as", global = true)]
    actor: Option<String>,

    /// Agit avec les droits d'administrateur racine
    #[arg(long, global = true)]
    admin: bool,

    /// Tolérance (minutes) pour proposer un shift déjà commencé
    #[arg(
        long,
        global = true,
        default_value_t = 1,
        value_parser = clap::value_parser!(i64).range(0..=MAX_SWAP_GRACE_MINUTES)
    )]
    swap_grace_minutes: i64,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ajouter un utilisateur à l'annuaire
    AddUser {
        #[arg(long)]
        handle: String,
        #[arg(long)]
        display_name: Option<String>,
    },

    /// Importer des utilisateurs depuis un CSV (`handle,display_name`)
    ImportUsers {
        #[arg(long)]
        csv: String,
    },

    /// Verrouiller (ou déverrouiller) un compte
    LockUser {
        #[arg(long)]
        handle: String,
        #[arg(long)]
        unlock: bool,
    },

    /// Créer une équipe (admin)
    CreateTeam {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
    },

    /// Rejoindre une équipe avec son code
    JoinTeam {
        #[arg(long)]
        code: String,
    },

    AddMember {
        /// id ou nom de l'équipe
        #[arg(long)]
        team: String,
        #[arg(long)]
        handle: String,
    },

    RemoveMember {
        #[arg(long)]
        team: String,
        #[arg(long)]
        handle: String,
    },

    /// Désigner le responsable (manager) ou confirmer un rôle d'équipier
    SetRole {
        #[arg(long)]
        team: String,
        #[arg(long)]
        handle: String,
        #[arg(long, value_enum)]
        role: RoleArg,
    },

    DeleteTeam {
        #[arg(long)]
        team: String,
    },

    /// Créer un shift
    CreateShift {
        #[arg(long)]
        team: String,
        /// RFC3339 UTC
        #[arg(long)]
        start: String,
        /// RFC3339 UTC
        #[arg(long)]
        end: String,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        note: Option<String>,
        /// liste "handle1,handle2,..."
        #[arg(long, default_value = "")]
        assign: String,
    },

    /// Importer des shifts depuis un CSV (`start,end,location,note,assignees`)
    ImportShifts {
        #[arg(long)]
        team: String,
        #[arg(long)]
        csv: String,
    },

    /// Modifier un shift ; les champs absents sont conservés
    EditShift {
        #[arg(long)]
        shift_id: String,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        note: Option<String>,
        /// remplace l'ensemble des assignés
        #[arg(long)]
        assign: Option<String>,
    },

    DeleteShift {
        #[arg(long)]
        shift_id: String,
    },

    /// Lister et optionnellement exporter
    List {
        #[arg(long)]
        team: Option<String>,
        #[arg(long)]
        out_json: Option<String>,
        #[arg(long)]
        out_csv: Option<String>,
    },

    /// Vérifier les conflits
    Check {
        /// Export CSV des conflits (optionnel)
        #[arg(long)]
        report: Option<String>,
    },

    /// Demandes de congé
    #[command(subcommand)]
    TimeOff(TimeOffCmd),

    /// Échanges de shifts
    #[command(subcommand)]
    Swap(SwapCmd),

    /// Tâches d'équipe
    #[command(subcommand)]
    Task(TaskCmd),

    /// Rapports
    #[command(subcommand)]
    Report(ReportCmd),
}

#[derive(Subcommand, Debug)]
enum TimeOffCmd {
    Request {
        #[arg(long)]
        team: String,
        #[arg(long, default_value = "vacation")]
        kind: TimeOffKind,
        #[arg(long)]
        start: NaiveDate,
        #[arg(long)]
        end: NaiveDate,
        #[arg(long)]
        reason: Option<String>,
    },
    Cancel {
        #[arg(long)]
        id: String,
    },
    Approve {
        #[arg(long)]
        id: String,
        #[arg(long)]
        note: Option<String>,
    },
    Reject {
        #[arg(long)]
        id: String,
        #[arg(long)]
        note: Option<String>,
    },
    /// Demandes en attente de revue
    Queue {
        #[arg(long)]
        team: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum SwapCmd {
    Request {
        #[arg(long)]
        team: String,
        #[arg(long)]
        shift_id: String,
        /// handle du collègue visé (échange dirigé)
        #[arg(long)]
        to: Option<String>,
        #[arg(long)]
        message: Option<String>,
    },
    Claim {
        #[arg(long)]
        id: String,
    },
    Cancel {
        #[arg(long)]
        id: String,
    },
    Approve {
        #[arg(long)]
        id: String,
        #[arg(long)]
        note: Option<String>,
    },
    Reject {
        #[arg(long)]
        id: String,
        #[arg(long)]
        note: Option<String>,
    },
    /// Offres ouvertes pour l'utilisateur courant
    Open {
        #[arg(long)]
        team: Option<String>,
    },
    /// Échanges réservés en attente d'approbation
    Claimed {
        #[arg(long)]
        team: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum TaskCmd {
    Create {
        #[arg(long)]
        team: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, default_value = "medium")]
        priority: TaskPriority,
        #[arg(long, default_value = "new")]
        status: TaskStatus,
        #[arg(long)]
        due: Option<NaiveDate>,
        #[arg(long)]
        assignee: Option<String>,
        #[arg(long)]
        shift_id: Option<String>,
    },
    /// Modifier une tâche ; les champs absents sont conservés
    Edit {
        #[arg(long)]
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        priority: Option<TaskPriority>,
        #[arg(long)]
        status: Option<TaskStatus>,
        #[arg(long)]
        due: Option<NaiveDate>,
        #[arg(long)]
        assignee: Option<String>,
        #[arg(long)]
        shift_id: Option<String>,
    },
    Status {
        #[arg(long)]
        id: String,
        #[arg(long)]
        status: TaskStatus,
    },
    Comment {
        #[arg(long)]
        id: String,
        #[arg(long)]
        text: String,
    },
    Delete {
        #[arg(long)]
        id: String,
    },
    List {
        #[arg(long)]
        team: String,
    },
}

#[derive(Subcommand, Debug)]
enum ReportCmd {
    /// Heures assignées par personne
    Hours {
        #[arg(long)]
        team: String,
        /// défaut : aujourd'hui moins la fenêtre de rapport
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
        #[arg(long)]
        out: Option<String>,
    },
    /// Absences sur la période
    Absence {
        #[arg(long)]
        team: String,
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
        #[arg(long)]
        status: Option<TimeOffStatus>,
        #[arg(long)]
        out: Option<String>,
    },
    /// Tâches par échéance, avec retards et synthèse par assigné
    Tasks {
        #[arg(long)]
        team: String,
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
        #[arg(long)]
        status: Option<TaskStatus>,
        /// handle, ou `unassigned`
        #[arg(long)]
        assignee: Option<String>,
        #[arg(long)]
        out: Option<String>,
    },
    /// Charge de l'équipe : shifts pourvus, ouverts, moyenne par shift
    Load {
        #[arg(long)]
        team: String,
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
        #[arg(long)]
        out: Option<String>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum RoleArg {
    Manager,
    Worker,
}

impl From<RoleArg> for TeamRole {
    fn from(r: RoleArg) -> Self {
        match r {
            RoleArg::Manager => TeamRole::Manager,
            RoleArg::Worker => TeamRole::Worker,
        }
    }
}

fn actor(cli: &Cli, roster: &Roster) -> Result<ActorContext> {
    let handle = cli
        .actor
        .as_deref()
        .context("this command needs --as <handle>")?;
    Ok(ActorContext::resolve(roster, handle, cli.admin)?)
}

fn team(roster: &Roster, key: &str) -> Result<TeamId> {
    roster
        .lookup_team(key)
        .map(|t| t.id.clone())
        .ok_or_else(|| anyhow::anyhow!("unknown team: {key}"))
}

fn user(roster: &Roster, handle: &str) -> Result<UserId> {
    roster
        .find_user_by_handle(handle)
        .map(|u| u.id.clone())
        .ok_or_else(|| anyhow::anyhow!("unknown user: {handle}"))
}

fn users(roster: &Roster, list: &str) -> Result<Vec<UserId>> {
    list.split(',')
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .map(|h| user(roster, h))
        .collect()
}

fn handles(roster: &Roster, ids: impl IntoIterator<Item = UserId>) -> String {
    let names: Vec<String> = ids
        .into_iter()
        .map(|id| {
            roster
                .find_user(&id)
                .map(|u| u.handle.clone())
                .unwrap_or_else(|| id.to_string())
        })
        .collect();
    if names.is_empty() {
        "-".to_string()
    } else {
        names.join(",")
    }
}

fn window(scheduler: &Scheduler, from: Option<NaiveDate>, to: Option<NaiveDate>) -> (NaiveDate, NaiveDate) {
    let today = scheduler.now().date_naive();
    let to = to.unwrap_or(today);
    let from = from.unwrap_or(to - Duration::days(scheduler.options().report_window_days));
    (from, to)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    #[cfg(feature = "logging")]
    if cli.log {
        let _ = Subscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .try_init();
    }

    let options = SchedulerOptions {
        swap_grace_minutes: cli.swap_grace_minutes,
        ..SchedulerOptions::default()
    };
    let storage = JsonStorage::open(&cli.roster)?;
    let desk = Desk::open_with(storage, Scheduler::new().with_options(options))?;
    let roster = desk.snapshot()?;

    let code = match &cli.cmd {
        Commands::AddUser {
            handle,
            display_name,
        } => {
            let display = display_name.as_deref().unwrap_or(handle);
            let id = desk.execute(|s| s.add_user(handle, display))?;
            println!("{id}");
            0
        }
        Commands::ImportUsers { csv } => {
            let rows = io::import_users_csv(csv)?;
            let count = rows.len();
            desk.execute(|s| {
                for row in &rows {
                    s.add_user(&row.handle, &row.display_name)?;
                }
                Ok(())
            })?;
            println!("imported {count} user(s)");
            0
        }
        Commands::LockUser { handle, unlock } => {
            let who = actor(&cli, &roster)?;
            let target = user(&roster, handle)?;
            desk.execute(|s| s.set_locked(&who, &target, !unlock))?;
            0
        }
        Commands::CreateTeam { name, description } => {
            let who = actor(&cli, &roster)?;
            let id = desk.execute(|s| s.create_team(&who, name, description.clone()))?;
            let code = desk.read(|s| {
                s.roster()
                    .find_team(&id)
                    .map(|t| t.join_code.clone())
                    .unwrap_or_default()
            })?;
            println!("{id} {code}");
            0
        }
        Commands::JoinTeam { code } => {
            let who = actor(&cli, &roster)?;
            let id = desk.execute(|s| s.join_team(&who, code))?;
            println!("{id}");
            0
        }
        Commands::AddMember { team: key, handle } => {
            let who = actor(&cli, &roster)?;
            let (t, u) = (team(&roster, key)?, user(&roster, handle)?);
            desk.execute(|s| s.add_member(&who, &t, &u))?;
            0
        }
        Commands::RemoveMember { team: key, handle } => {
            let who = actor(&cli, &roster)?;
            let (t, u) = (team(&roster, key)?, user(&roster, handle)?);
            desk.execute(|s| s.remove_member(&who, &t, &u))?;
            0
        }
        Commands::SetRole {
            team: key,
            handle,
            role,
        } => {
            let who = actor(&cli, &roster)?;
            let (t, u) = (team(&roster, key)?, user(&roster, handle)?);
            match desk.execute(|s| s.set_team_role(&who, &t, &u, (*role).into()))? {
                RoleChange::OwnerChanged => println!("{handle} now manages the team"),
                RoleChange::Unchanged => println!("no change"),
            }
            0
        }
        Commands::DeleteTeam { team: key } => {
            let who = actor(&cli, &roster)?;
            let t = team(&roster, key)?;
            desk.execute(|s| s.delete_team(&who, &t))?;
            0
        }
        Commands::CreateShift {
            team: key,
            start,
            end,
            location,
            note,
            assign,
        } => {
            let who = actor(&cli, &roster)?;
            let t = team(&roster, key)?;
            let draft = ShiftDraft {
                start: io::parse_point(start)?,
                end: io::parse_point(end)?,
                location: location.clone(),
                note: note.clone(),
                assignees: users(&roster, assign)?,
            };
            let id = desk.execute(|s| s.create_shift(&who, &t, draft))?;
            println!("{id}");
            0
        }
        Commands::ImportShifts { team: key, csv } => {
            let who = actor(&cli, &roster)?;
            let t = team(&roster, key)?;
            let mut drafts = Vec::new();
            for row in io::import_shifts_csv(csv)? {
                drafts.push(ShiftDraft {
                    start: row.start,
                    end: row.end,
                    location: row.location,
                    note: row.note,
                    assignees: users(&roster, &row.assignees.join(","))?,
                });
            }
            let count = drafts.len();
            // tout ou rien : un seul commit pour le fichier entier
            desk.execute(|s| {
                for draft in drafts {
                    s.create_shift(&who, &t, draft)?;
                }
                Ok(())
            })?;
            println!("imported {count} shift(s)");
            0
        }
        Commands::EditShift {
            shift_id,
            start,
            end,
            location,
            note,
            assign,
        } => {
            let who = actor(&cli, &roster)?;
            let sid = ShiftId::new(shift_id);
            let current = roster
                .find_shift(&sid)
                .with_context(|| format!("unknown shift: {shift_id}"))?;
            let draft = ShiftDraft {
                start: match start {
                    Some(raw) => io::parse_point(raw)?,
                    None => current.start,
                },
                end: match end {
                    Some(raw) => io::parse_point(raw)?,
                    None => current.end,
                },
                location: location.clone().or_else(|| current.location.clone()),
                note: note.clone().or_else(|| current.note.clone()),
                assignees: match assign {
                    Some(list) => users(&roster, list)?,
                    None => roster.assignees(&sid).into_iter().collect(),
                },
            };
            let diff = desk.execute(|s| s.edit_shift(&who, &sid, draft))?;
            println!(
                "added: {} | removed: {}",
                handles(&roster, diff.added),
                handles(&roster, diff.removed)
            );
            0
        }
        Commands::DeleteShift { shift_id } => {
            let who = actor(&cli, &roster)?;
            let sid = ShiftId::new(shift_id);
            let removal = desk.execute(|s| s.delete_shift(&who, &sid))?;
            println!(
                "removed {} assignment(s), voided {} swap request(s), unlinked {} task(s)",
                removal.assignments_removed,
                removal.voided_swaps.len(),
                removal.unlinked_tasks
            );
            0
        }
        Commands::List {
            team: key,
            out_json,
            out_csv,
        } => {
            let filter = key.as_deref().map(|k| team(&roster, k)).transpose()?;
            if let Some(path) = out_json {
                io::export_roster_json(path, &roster)?;
            }
            if let Some(path) = out_csv {
                let t = filter.as_ref().context("--out-csv needs --team")?;
                io::export_shifts_csv(path, &roster, t)?;
            }
            // impression compacte
            let mut shifts: Vec<_> = roster
                .shifts
                .iter()
                .filter(|s| filter.as_ref().map_or(true, |t| &s.team == t))
                .collect();
            shifts.sort_by_key(|s| s.start);
            for s in shifts {
                println!(
                    "{} | {} → {} | {} | {}",
                    s.id,
                    s.start.to_rfc3339(),
                    s.end.to_rfc3339(),
                    s.location.as_deref().unwrap_or("-"),
                    handles(&roster, roster.assignees(&s.id))
                );
            }
            0
        }
        Commands::Check { report } => {
            let conflicts = desk.read(|s| s.detect_conflicts())?;
            if conflicts.is_empty() {
                println!("OK: no conflicts");
                0
            } else {
                eprintln!("Found {} conflict(s)", conflicts.len());
                if let Some(path) = report {
                    // CSV simple
                    let mut w = csv::Writer::from_path(path)?;
                    w.write_record(["user_id", "shift_a", "shift_b", "kind"])?;
                    for c in &conflicts {
                        w.write_record([
                            c.user.as_str(),
                            c.shift_a.as_str(),
                            c.shift_b.as_ref().map(|s| s.as_str()).unwrap_or(""),
                            match c.kind {
                                ConflictKind::Overlap => "overlap",
                                ConflictKind::TimeOff => "time_off",
                            },
                        ])?;
                    }
                    w.flush()?;
                }
                // Code 2 = WARNING/INCOMPLETE
                2
            }
        }
        Commands::TimeOff(cmd) => time_off(&cli, &desk, &roster, cmd)?,
        Commands::Swap(cmd) => swap(&cli, &desk, &roster, cmd)?,
        Commands::Task(cmd) => task(&cli, &desk, &roster, cmd)?,
        Commands::Report(cmd) => run_report(&desk, &roster, cmd)?,
    };

    std::process::exit(code);
}

fn time_off(cli: &Cli, desk: &Desk<JsonStorage>, roster: &Roster, cmd: &TimeOffCmd) -> Result<i32> {
    match cmd {
        TimeOffCmd::Request {
            team: key,
            kind,
            start,
            end,
            reason,
        } => {
            let who = actor(cli, roster)?;
            let draft = TimeOffDraft {
                team: team(roster, key)?,
                kind: *kind,
                start_date: *start,
                end_date: *end,
                reason: reason.clone(),
            };
            let id = desk.execute(|s| s.request_time_off(&who, draft))?;
            println!("{id}");
        }
        TimeOffCmd::Cancel { id } => {
            let who = actor(cli, roster)?;
            desk.execute(|s| s.cancel_time_off(&who, &TimeOffId::new(id)))?;
        }
        TimeOffCmd::Approve { id, note } => {
            let who = actor(cli, roster)?;
            desk.execute(|s| s.approve_time_off(&who, &TimeOffId::new(id), note.clone()))?;
        }
        TimeOffCmd::Reject { id, note } => {
            let who = actor(cli, roster)?;
            desk.execute(|s| s.reject_time_off(&who, &TimeOffId::new(id), note.clone()))?;
        }
        TimeOffCmd::Queue { team: key } => {
            let filter = key.as_deref().map(|k| team(roster, k)).transpose()?;
            desk.read(|s| {
                for item in s.time_off_queue(filter.as_ref()) {
                    let r = item.request;
                    println!(
                        "{} | {} | {} {}..{}{}",
                        r.id,
                        handles(roster, [r.requester.clone()]),
                        r.kind,
                        r.start_date,
                        r.end_date,
                        if item.has_conflict { " | CONFLICT" } else { "" }
                    );
                }
            })?;
        }
    }
    Ok(0)
}

fn swap(cli: &Cli, desk: &Desk<JsonStorage>, roster: &Roster, cmd: &SwapCmd) -> Result<i32> {
    match cmd {
        SwapCmd::Request {
            team: key,
            shift_id,
            to,
            message,
        } => {
            let who = actor(cli, roster)?;
            let draft = SwapDraft {
                team: team(roster, key)?,
                shift: ShiftId::new(shift_id),
                requested_to: to.as_deref().map(|h| user(roster, h)).transpose()?,
                message: message.clone(),
            };
            let id = desk.execute(|s| s.request_swap(&who, draft))?;
            println!("{id}");
        }
        SwapCmd::Claim { id } => {
            let who = actor(cli, roster)?;
            desk.execute(|s| s.claim_swap(&who, &SwapId::new(id)))?;
        }
        SwapCmd::Cancel { id } => {
            let who = actor(cli, roster)?;
            desk.execute(|s| s.cancel_swap(&who, &SwapId::new(id)))?;
        }
        SwapCmd::Approve { id, note } => {
            let who = actor(cli, roster)?;
            desk.execute(|s| s.approve_swap(&who, &SwapId::new(id), note.clone()))?;
        }
        SwapCmd::Reject { id, note } => {
            let who = actor(cli, roster)?;
            desk.execute(|s| s.reject_swap(&who, &SwapId::new(id), note.clone()))?;
        }
        SwapCmd::Open { team: key } => {
            let who = actor(cli, roster)?;
            let filter = key.as_deref().map(|k| team(roster, k)).transpose()?;
            desk.read(|s| {
                for offer in s.open_swaps(&who, filter.as_ref()) {
                    print_offer(roster, &offer);
                }
            })?;
        }
        SwapCmd::Claimed { team: key } => {
            let filter = key.as_deref().map(|k| team(roster, k)).transpose()?;
            desk.read(|s| {
                for offer in s.claimed_swaps(filter.as_ref()) {
                    print_offer(roster, &offer);
                }
            })?;
        }
    }
    Ok(0)
}

fn print_offer(roster: &Roster, offer: &shiftboard::scheduler::SwapOffer<'_>) {
    let r = offer.request;
    println!(
        "{} | {} | {} → {} | {} | taker {}{}",
        r.id,
        r.status,
        offer.shift.start.to_rfc3339(),
        offer.shift.end.to_rfc3339(),
        handles(roster, [r.requester.clone()]),
        handles(roster, r.taker.clone()),
        if offer.has_conflict { " | CONFLICT" } else { "" }
    );
}

fn task(cli: &Cli, desk: &Desk<JsonStorage>, roster: &Roster, cmd: &TaskCmd) -> Result<i32> {
    match cmd {
        TaskCmd::Create {
            team: key,
            title,
            description,
            priority,
            status,
            due,
            assignee,
            shift_id,
        } => {
            let who = actor(cli, roster)?;
            let t = team(roster, key)?;
            let draft = TaskDraft {
                description: description.clone(),
                priority: *priority,
                status: *status,
                due: *due,
                assignee: assignee.as_deref().map(|h| user(roster, h)).transpose()?,
                shift: shift_id.as_deref().map(ShiftId::new),
                ..TaskDraft::new(title.as_str())
            };
            let id = desk.execute(|s| s.create_task(&who, &t, draft))?;
            println!("{id}");
        }
        TaskCmd::Edit {
            id,
            title,
            description,
            priority,
            status,
            due,
            assignee,
            shift_id,
        } => {
            let who = actor(cli, roster)?;
            let tid = TaskId::new(id);
            let current = roster
                .find_task(&tid)
                .with_context(|| format!("unknown task: {id}"))?;
            let draft = TaskDraft {
                title: title.clone().unwrap_or_else(|| current.title.clone()),
                description: description.clone().or_else(|| current.description.clone()),
                priority: priority.unwrap_or(current.priority),
                status: status.unwrap_or(current.status),
                due: due.or(current.due),
                assignee: match assignee {
                    Some(h) => Some(user(roster, h)?),
                    None => current.assignee.clone(),
                },
                shift: shift_id.as_deref().map(ShiftId::new).or_else(|| current.shift.clone()),
            };
            let changes = desk.execute(|s| s.edit_task(&who, &tid, draft))?;
            println!("{} change(s) logged", changes.len());
        }
        TaskCmd::Status { id, status } => {
            let who = actor(cli, roster)?;
            let changed = desk.execute(|s| s.change_task_status(&who, &TaskId::new(id), *status))?;
            if !changed {
                println!("no change");
            }
        }
        TaskCmd::Comment { id, text } => {
            let who = actor(cli, roster)?;
            desk.execute(|s| s.comment_task(&who, &TaskId::new(id), text))?;
        }
        TaskCmd::Delete { id } => {
            let who = actor(cli, roster)?;
            desk.execute(|s| s.delete_task(&who, &TaskId::new(id)))?;
        }
        TaskCmd::List { team: key } => {
            let t = team(roster, key)?;
            for task in roster.tasks.iter().filter(|x| x.team == t) {
                println!(
                    "{} | {} | {} | {} | {}",
                    task.id,
                    task.status,
                    task.priority,
                    handles(roster, task.assignee.clone()),
                    task.title
                );
            }
        }
    }
    Ok(0)
}

fn run_report(desk: &Desk<JsonStorage>, roster: &Roster, cmd: &ReportCmd) -> Result<i32> {
    match cmd {
        ReportCmd::Hours {
            team: key,
            from,
            to,
            out,
        } => {
            let t = team(roster, key)?;
            let (from, to) = desk.read(|s| window(s, *from, *to))?;
            let rows = report::hours_report(roster, &t, from, to);
            match out {
                Some(path) => io::export_hours_csv(path, &rows)?,
                None => io::write_hours_csv(std::io::stdout().lock(), &rows)?,
            }
        }
        ReportCmd::Absence {
            team: key,
            from,
            to,
            status,
            out,
        } => {
            let t = team(roster, key)?;
            let (from, to) = desk.read(|s| window(s, *from, *to))?;
            let report = report::absence_report(roster, &t, from, to, *status);
            match out {
                Some(path) => io::export_absence_csv(path, &report)?,
                None => io::write_absence_csv(std::io::stdout().lock(), &report)?,
            }
            for line in &report.summary {
                eprintln!(
                    "{}: {} approved ({} day(s)), {} pending, {} rejected, {} canceled",
                    line.handle,
                    line.approved,
                    line.approved_days,
                    line.pending,
                    line.rejected,
                    line.canceled
                );
            }
        }
        ReportCmd::Tasks {
            team: key,
            from,
            to,
            status,
            assignee,
            out,
        } => {
            let t = team(roster, key)?;
            let filter = match assignee.as_deref() {
                None => None,
                Some(report::UNASSIGNED) => Some(report::AssigneeFilter::Unassigned),
                Some(handle) => Some(report::AssigneeFilter::User(user(roster, handle)?)),
            };
            let (from, to, today) = desk.read(|s| {
                let (from, to) = window(s, *from, *to);
                (from, to, s.now().date_naive())
            })?;
            let report = report::task_report(roster, &t, from, to, today, *status, filter.as_ref());
            match out {
                Some(path) => io::export_tasks_csv(path, &report)?,
                None => io::write_tasks_csv(std::io::stdout().lock(), &report)?,
            }
            for line in report.summary.iter().chain([&report.totals]) {
                eprintln!(
                    "{}: {} task(s), {} done ({} on time, {} late), {} overdue, {} open without due date",
                    line.assignee,
                    line.total,
                    line.done,
                    line.completed_on_time,
                    line.completed_late,
                    line.overdue_open,
                    line.no_due_open
                );
            }
        }
        ReportCmd::Load {
            team: key,
            from,
            to,
            out,
        } => {
            let t = team(roster, key)?;
            let (from, to) = desk.read(|s| window(s, *from, *to))?;
            let report = report::load_report(roster, &t, from, to);
            match out {
                Some(path) => io::export_load_csv(path, &report)?,
                None => io::write_load_csv(std::io::stdout().lock(), &report)?,
            }
            eprintln!(
                "{} shift(s), {} staffed, {} open, {:.2} per shift",
                report.total_shifts, report.staffed_shifts, report.open_shifts, report.avg_per_shift
            );
        }
    }
    Ok(0)
}

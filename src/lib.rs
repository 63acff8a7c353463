#![forbid(unsafe_code)]
//! Shiftboard : planning d'équipes local (sans BD).
//!
//! - Shifts assignés avec contrôle de chevauchement par personne.
//! - Workflows de congés et d'échanges de shifts, journalisés.
//! - Chaque opération est une unité de travail : tout ou rien.
//! - Stockage fichiers (JSON/CSV) ; tout en UTC.

#[macro_use]
mod macros;

pub mod actor;
pub mod clock;
pub mod desk;
pub mod io;
pub mod model;
pub mod report;
pub mod scheduler;
pub mod storage;

pub use actor::{ActorContext, Standing};
pub use clock::{Clock, FixedClock, SystemClock};
pub use desk::Desk;
pub use model::{
    Interval, Roster, Shift, ShiftId, SwapId, SwapStatus, TaskId, Team, TeamId, TimeOffId,
    TimeOffStatus, User, UserId,
};
pub use scheduler::{Conflict, ConflictKind, SchedError, Scheduler, SchedulerOptions};
pub use storage::{JsonStorage, MemoryStorage, Storage, StorageLock};

#![allow(dead_code)]
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use shiftboard::scheduler::ShiftDraft;
use shiftboard::{ActorContext, FixedClock, Scheduler, ShiftId, TeamId, UserId};
use std::sync::Arc;

pub fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Équipe "Ops" créée par `root` (admin racine, responsable), avec
/// alice, bob et carol comme membres. Horloge figée au 2025-06-01.
pub struct Fixture {
    pub s: Scheduler,
    pub clock: Arc<FixedClock>,
    pub admin: ActorContext,
    pub team: TeamId,
    pub alice: UserId,
    pub bob: UserId,
    pub carol: UserId,
}

impl Fixture {
    pub fn new() -> Self {
        let clock = Arc::new(FixedClock::new(at(2025, 6, 1, 0)));
        let mut s = Scheduler::new().with_clock(clock.clone());
        let root = s.add_user("root", "Root").unwrap();
        let alice = s.add_user("alice", "Alice").unwrap();
        let bob = s.add_user("bob", "Bob").unwrap();
        let carol = s.add_user("carol", "Carol").unwrap();
        let admin = ActorContext::root_admin(root);
        let team = s.create_team(&admin, "Ops", None).unwrap();
        for u in [&alice, &bob, &carol] {
            s.add_member(&admin, &team, u).unwrap();
        }
        Self {
            s,
            clock,
            admin,
            team,
            alice,
            bob,
            carol,
        }
    }

    pub fn member(&self, user: &UserId) -> ActorContext {
        ActorContext::member(user.clone())
    }

    pub fn shift(&mut self, start: DateTime<Utc>, end: DateTime<Utc>, assignees: &[&UserId]) -> ShiftId {
        let draft = draft(start, end, assignees);
        self.s.create_shift(&self.admin, &self.team, draft).unwrap()
    }
}

pub fn draft(start: DateTime<Utc>, end: DateTime<Utc>, assignees: &[&UserId]) -> ShiftDraft {
    ShiftDraft {
        start,
        end,
        location: None,
        note: None,
        assignees: assignees.iter().map(|u| (*u).clone()).collect(),
    }
}

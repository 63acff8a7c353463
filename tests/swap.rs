#![forbid(unsafe_code)]
mod common;

use chrono::Duration;
use common::{at, draft, Fixture};
use shiftboard::model::{SwapAction, SwapStatus};
use shiftboard::scheduler::{SchedError, SchedulerOptions, SwapDraft, MAX_SWAP_GRACE_MINUTES};
use shiftboard::{Desk, MemoryStorage, Scheduler, ShiftId, SwapId, UserId};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::thread;

/// Shift du 2025-06-10 08:00–16:00 assigné à alice, offert par elle.
fn offered(f: &mut Fixture, to: Option<&UserId>) -> (ShiftId, SwapId) {
    let alice = f.alice.clone();
    let shift = f.shift(at(2025, 6, 10, 8), at(2025, 6, 10, 16), &[&alice]);
    let ctx = f.member(&alice);
    let swap = f
        .s
        .request_swap(
            &ctx,
            SwapDraft {
                team: f.team.clone(),
                shift: shift.clone(),
                requested_to: to.cloned(),
                message: Some("dentist".into()),
            },
        )
        .unwrap();
    (shift, swap)
}

#[test]
fn open_swap_moves_the_assignment_on_approval() {
    let mut f = Fixture::new();
    let (alice, bob) = (f.alice.clone(), f.bob.clone());
    let (shift, id) = offered(&mut f, None);

    let bob_ctx = f.member(&bob);
    f.s.claim_swap(&bob_ctx, &id).unwrap();
    let claimed = f.s.roster().find_swap(&id).unwrap();
    assert_eq!(claimed.status, SwapStatus::Claimed);
    assert_eq!(claimed.taker.as_ref(), Some(&bob));
    // la réservation ne touche pas au planning
    assert_eq!(f.s.roster().assignees(&shift), BTreeSet::from([alice.clone()]));

    f.s.approve_swap(&f.admin, &id, Some("ok".into())).unwrap();
    assert_eq!(f.s.roster().assignees(&shift), BTreeSet::from([bob]));
    let done = f.s.roster().find_swap(&id).unwrap();
    assert_eq!(done.status, SwapStatus::Approved);
    assert_eq!(done.review.as_ref().unwrap().note.as_deref(), Some("ok"));

    let actions: Vec<_> = f.s.roster().swap_history(&id).map(|e| e.action).collect();
    assert_eq!(
        actions,
        vec![SwapAction::Created, SwapAction::Claimed, SwapAction::Approved]
    );
    assert!(f.s.detect_conflicts().is_empty());
}

#[test]
fn second_approval_reports_already_reviewed_without_mutation() {
    let mut f = Fixture::new();
    let bob = f.bob.clone();
    let (shift, id) = offered(&mut f, None);
    let bob_ctx = f.member(&bob);
    f.s.claim_swap(&bob_ctx, &id).unwrap();
    f.s.approve_swap(&f.admin, &id, None).unwrap();
    let before = f.s.roster().assignments.clone();

    let err = f.s.approve_swap(&f.admin, &id, None).unwrap_err();
    assert!(matches!(err, SchedError::AlreadyReviewed { .. }));
    assert_eq!(f.s.roster().assignments, before);
    assert_eq!(f.s.roster().assignees(&shift), BTreeSet::from([bob]));
    assert_eq!(f.s.roster().swap_history(&id).count(), 3);
}

#[test]
fn team_owner_may_approve_but_plain_members_may_not() {
    let mut f = Fixture::new();
    let (bob, carol) = (f.bob.clone(), f.carol.clone());
    let (_, id) = offered(&mut f, None);
    let bob_ctx = f.member(&bob);
    f.s.claim_swap(&bob_ctx, &id).unwrap();

    let carol_ctx = f.member(&carol);
    assert!(matches!(
        f.s.approve_swap(&carol_ctx, &id, None),
        Err(SchedError::Authorization(_))
    ));

    f.s.set_team_role(&f.admin, &f.team, &carol, shiftboard::scheduler::TeamRole::Manager)
        .unwrap();
    f.s.approve_swap(&carol_ctx, &id, None).unwrap();
}

#[test]
fn directed_swap_only_accepts_its_target() {
    let mut f = Fixture::new();
    let (bob, carol) = (f.bob.clone(), f.carol.clone());
    let (_, id) = offered(&mut f, Some(&carol));

    let bob_ctx = f.member(&bob);
    assert!(matches!(
        f.s.claim_swap(&bob_ctx, &id),
        Err(SchedError::Authorization(_))
    ));
    let carol_ctx = f.member(&carol);
    f.s.claim_swap(&carol_ctx, &id).unwrap();
}

#[test]
fn requester_cannot_claim_own_request() {
    let mut f = Fixture::new();
    let alice = f.alice.clone();
    let (_, id) = offered(&mut f, None);
    let ctx = f.member(&alice);
    assert!(matches!(
        f.s.claim_swap(&ctx, &id),
        Err(SchedError::Authorization(_))
    ));
}

#[test]
fn claim_requires_membership_and_a_free_slot() {
    let mut f = Fixture::new();
    let bob = f.bob.clone();
    let (_, id) = offered(&mut f, None);

    let outsider = f.s.add_user("eve", "Eve").unwrap();
    let outsider_ctx = f.member(&outsider);
    assert!(matches!(
        f.s.claim_swap(&outsider_ctx, &id),
        Err(SchedError::NotMember { .. })
    ));

    f.shift(at(2025, 6, 10, 12), at(2025, 6, 10, 20), &[&bob]);
    let bob_ctx = f.member(&bob);
    let err = f.s.claim_swap(&bob_ctx, &id).unwrap_err();
    assert_eq!(err.conflicting_users(), BTreeSet::from([bob]));
    assert_eq!(
        f.s.roster().find_swap(&id).unwrap().status,
        SwapStatus::Pending
    );
}

#[test]
fn a_concurrent_claim_loses_with_already_reviewed() {
    let mut f = Fixture::new();
    let (bob, carol) = (f.bob.clone(), f.carol.clone());
    let (_, id) = offered(&mut f, None);
    let scheduler = std::mem::take(&mut f.s);
    let desk = Arc::new(Desk::open_with(MemoryStorage::new(), scheduler).unwrap());

    let handles: Vec<_> = [bob, carol]
        .into_iter()
        .map(|user| {
            let desk = Arc::clone(&desk);
            let id = id.clone();
            thread::spawn(move || {
                let ctx = shiftboard::ActorContext::member(user);
                desk.execute(|s: &mut Scheduler| s.claim_swap(&ctx, &id))
            })
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(SchedError::AlreadyReviewed { .. }))));
    let roster = desk.snapshot().unwrap();
    assert_eq!(roster.swap_history(&id).count(), 2);
}

#[test]
fn offering_requires_being_assigned() {
    let mut f = Fixture::new();
    let (alice, bob) = (f.alice.clone(), f.bob.clone());
    let shift = f.shift(at(2025, 6, 10, 8), at(2025, 6, 10, 16), &[&alice]);
    let bob_ctx = f.member(&bob);
    let err = f
        .s
        .request_swap(
            &bob_ctx,
            SwapDraft {
                team: f.team.clone(),
                shift,
                requested_to: None,
                message: None,
            },
        )
        .unwrap_err();
    assert!(matches!(err, SchedError::NotAssigned { .. }));
}

#[test]
fn started_shifts_can_only_be_offered_within_the_grace() {
    let mut f = Fixture::new();
    let alice = f.alice.clone();
    let shift = f.shift(at(2025, 6, 10, 8), at(2025, 6, 10, 16), &[&alice]);
    let ctx = f.member(&alice);
    let swap = |shift: &ShiftId| SwapDraft {
        team: f.team.clone(),
        shift: shift.clone(),
        requested_to: None,
        message: None,
    };
    let (late, ok) = (swap(&shift), swap(&shift));

    f.clock.set(at(2025, 6, 10, 8) + Duration::minutes(5));
    let err = f.s.request_swap(&ctx, late).unwrap_err();
    assert!(matches!(err, SchedError::Validation(_)));

    f.clock.set(at(2025, 6, 10, 8) + Duration::seconds(30));
    f.s.request_swap(&ctx, ok).unwrap();
}

#[test]
fn grace_option_is_capped_to_one_minute() {
    let mut f = Fixture::new();
    let alice = f.alice.clone();
    let shift = f.shift(at(2025, 6, 10, 8), at(2025, 6, 10, 16), &[&alice]);
    let ctx = f.member(&alice);
    let draft = SwapDraft {
        team: f.team.clone(),
        shift,
        requested_to: None,
        message: None,
    };
    f.clock.set(at(2025, 6, 12, 0));

    for grace in [7 * 24 * 60, i64::MAX / 2, i64::MIN] {
        let options = SchedulerOptions {
            swap_grace_minutes: grace,
            ..SchedulerOptions::default()
        };
        f.s = std::mem::take(&mut f.s).with_options(options);
        assert!((0..=MAX_SWAP_GRACE_MINUTES).contains(&f.s.options().swap_grace_minutes));
        let err = f.s.request_swap(&ctx, draft.clone()).unwrap_err();
        assert!(matches!(err, SchedError::Validation(_)));
    }
    assert!(f.s.roster().swaps.is_empty());
}

#[test]
fn duplicate_active_request_is_refused() {
    let mut f = Fixture::new();
    let alice = f.alice.clone();
    let (shift, _) = offered(&mut f, None);
    let ctx = f.member(&alice);
    let err = f
        .s
        .request_swap(
            &ctx,
            SwapDraft {
                team: f.team.clone(),
                shift,
                requested_to: None,
                message: None,
            },
        )
        .unwrap_err();
    assert!(matches!(err, SchedError::Validation(_)));
}

#[test]
fn directed_target_must_be_another_member() {
    let mut f = Fixture::new();
    let alice = f.alice.clone();
    let shift = f.shift(at(2025, 6, 10, 8), at(2025, 6, 10, 16), &[&alice]);
    let ctx = f.member(&alice);
    let team = f.team.clone();
    let to = |who: &UserId| SwapDraft {
        team: team.clone(),
        shift: shift.clone(),
        requested_to: Some(who.clone()),
        message: None,
    };

    assert!(matches!(
        f.s.request_swap(&ctx, to(&alice)),
        Err(SchedError::Validation(_))
    ));
    let outsider = f.s.add_user("eve", "Eve").unwrap();
    assert!(matches!(
        f.s.request_swap(&ctx, to(&outsider)),
        Err(SchedError::NotMember { .. })
    ));
}

#[test]
fn approval_revalidates_the_requester_assignment() {
    let mut f = Fixture::new();
    let (alice, bob, carol) = (f.alice.clone(), f.bob.clone(), f.carol.clone());
    let (shift, id) = offered(&mut f, None);
    let bob_ctx = f.member(&bob);
    f.s.claim_swap(&bob_ctx, &id).unwrap();

    // alice est retirée du shift entre-temps
    f.s.edit_shift(&f.admin, &shift, draft(at(2025, 6, 10, 8), at(2025, 6, 10, 16), &[&carol]))
        .unwrap();
    let err = f.s.approve_swap(&f.admin, &id, None).unwrap_err();
    match err {
        SchedError::NotAssigned { user, .. } => assert_eq!(user, alice),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(
        f.s.roster().find_swap(&id).unwrap().status,
        SwapStatus::Claimed
    );
}

#[test]
fn approval_revalidates_taker_membership() {
    let mut f = Fixture::new();
    let bob = f.bob.clone();
    let (_, id) = offered(&mut f, None);
    let bob_ctx = f.member(&bob);
    f.s.claim_swap(&bob_ctx, &id).unwrap();

    f.s.remove_member(&f.admin, &f.team, &bob).unwrap();
    assert!(matches!(
        f.s.approve_swap(&f.admin, &id, None),
        Err(SchedError::NotMember { .. })
    ));
}

#[test]
fn approval_revalidates_taker_conflicts() {
    let mut f = Fixture::new();
    let bob = f.bob.clone();
    let (_, id) = offered(&mut f, None);
    let bob_ctx = f.member(&bob);
    f.s.claim_swap(&bob_ctx, &id).unwrap();

    f.shift(at(2025, 6, 10, 15), at(2025, 6, 10, 23), &[&bob]);
    let err = f.s.approve_swap(&f.admin, &id, None).unwrap_err();
    assert_eq!(err.conflicting_users(), BTreeSet::from([bob]));
    assert_eq!(
        f.s.roster().find_swap(&id).unwrap().status,
        SwapStatus::Claimed
    );
}

#[test]
fn rejection_leaves_the_roster_untouched() {
    let mut f = Fixture::new();
    let (alice, bob) = (f.alice.clone(), f.bob.clone());
    let (shift, id) = offered(&mut f, None);

    // rien à rejeter tant que personne n'a réservé
    assert!(matches!(
        f.s.reject_swap(&f.admin, &id, None),
        Err(SchedError::InvalidTransition { .. })
    ));

    let bob_ctx = f.member(&bob);
    f.s.claim_swap(&bob_ctx, &id).unwrap();
    f.s.reject_swap(&f.admin, &id, Some("understaffed".into()))
        .unwrap();
    assert_eq!(f.s.roster().assignees(&shift), BTreeSet::from([alice]));
    assert_eq!(
        f.s.roster().find_swap(&id).unwrap().status,
        SwapStatus::Rejected
    );
}

#[test]
fn cancel_is_limited_to_pending_requests_of_the_requester() {
    let mut f = Fixture::new();
    let (alice, bob) = (f.alice.clone(), f.bob.clone());
    let (_, id) = offered(&mut f, None);
    let (alice_ctx, bob_ctx) = (f.member(&alice), f.member(&bob));

    assert!(matches!(
        f.s.cancel_swap(&bob_ctx, &id),
        Err(SchedError::Authorization(_))
    ));
    f.s.claim_swap(&bob_ctx, &id).unwrap();
    assert!(matches!(
        f.s.cancel_swap(&alice_ctx, &id),
        Err(SchedError::InvalidTransition { .. })
    ));

    let (_, second) = {
        let shift = f.shift(at(2025, 6, 12, 8), at(2025, 6, 12, 16), &[&alice]);
        let swap = f
            .s
            .request_swap(
                &alice_ctx,
                SwapDraft {
                    team: f.team.clone(),
                    shift: shift.clone(),
                    requested_to: None,
                    message: None,
                },
            )
            .unwrap();
        (shift, swap)
    };
    f.s.cancel_swap(&alice_ctx, &second).unwrap();
    let canceled = f.s.roster().find_swap(&second).unwrap();
    assert_eq!(canceled.status, SwapStatus::Canceled);
    assert_eq!(
        canceled.review.as_ref().unwrap().note.as_deref(),
        Some("Canceled by requester.")
    );
}

#[test]
fn queues_flag_conflicts_for_the_viewer_and_the_taker() {
    let mut f = Fixture::new();
    let (alice, bob, carol) = (f.alice.clone(), f.bob.clone(), f.carol.clone());
    let (_, id) = offered(&mut f, None);
    f.shift(at(2025, 6, 10, 14), at(2025, 6, 10, 18), &[&carol]);

    let alice_ctx = f.member(&alice);
    assert!(f.s.open_swaps(&alice_ctx, None).is_empty());

    let carol_ctx = f.member(&carol);
    let offers = f.s.open_swaps(&carol_ctx, Some(&f.team));
    assert_eq!(offers.len(), 1);
    assert!(offers[0].has_conflict);

    let bob_ctx = f.member(&bob);
    let offers = f.s.open_swaps(&bob_ctx, None);
    assert!(!offers[0].has_conflict);

    f.s.claim_swap(&bob_ctx, &id).unwrap();
    assert!(f.s.open_swaps(&carol_ctx, None).is_empty());
    let queue = f.s.claimed_swaps(None);
    assert_eq!(queue.len(), 1);
    assert!(!queue[0].has_conflict);
}

#[test]
fn scheduler_default_is_empty() {
    let s = Scheduler::default();
    assert_eq!(s.roster().revision, 0);
    assert!(s.claimed_swaps(None).is_empty());
}

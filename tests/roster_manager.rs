#![forbid(unsafe_code)]
mod common;

use common::{at, draft, Fixture};
use shiftboard::scheduler::{SchedError, SwapDraft, TaskDraft};
use std::collections::BTreeSet;

#[test]
fn inverted_interval_is_rejected_and_nothing_persisted() {
    let mut f = Fixture::new();
    let revision = f.s.roster().revision;
    let err = f
        .s
        .create_shift(&f.admin, &f.team, draft(at(2025, 6, 10, 16), at(2025, 6, 10, 8), &[&f.alice]))
        .unwrap_err();
    assert!(matches!(err, SchedError::Validation(_)));
    assert!(f.s.roster().shifts.is_empty());
    assert!(f.s.roster().assignments.is_empty());
    assert_eq!(f.s.roster().revision, revision);

    let empty = f
        .s
        .create_shift(&f.admin, &f.team, draft(at(2025, 6, 10, 8), at(2025, 6, 10, 8), &[]))
        .unwrap_err();
    assert!(matches!(empty, SchedError::Validation(_)));
}

#[test]
fn overlapping_assignment_names_the_conflicting_users() {
    let mut f = Fixture::new();
    let (alice, bob) = (f.alice.clone(), f.bob.clone());
    f.shift(at(2025, 6, 10, 8), at(2025, 6, 10, 16), &[&alice]);

    let err = f
        .s
        .create_shift(
            &f.admin,
            &f.team,
            draft(at(2025, 6, 10, 12), at(2025, 6, 10, 20), &[&alice, &bob]),
        )
        .unwrap_err();
    assert_eq!(err.conflicting_users(), BTreeSet::from([alice.clone()]));
    // rien n'est écrit pour bob non plus
    assert_eq!(f.s.roster().shifts.len(), 1);
    assert_eq!(f.s.roster().assignments.len(), 1);
}

#[test]
fn touching_shifts_do_not_conflict() {
    let mut f = Fixture::new();
    let alice = f.alice.clone();
    f.shift(at(2025, 6, 10, 8), at(2025, 6, 10, 16), &[&alice]);
    f.shift(at(2025, 6, 10, 16), at(2025, 6, 11, 0), &[&alice]);
    assert_eq!(f.s.roster().assignments.len(), 2);
    assert!(f.s.detect_conflicts().is_empty());
}

#[test]
fn assignees_must_belong_to_the_team() {
    let mut f = Fixture::new();
    let outsider = f.s.add_user("dave", "Dave").unwrap();
    let err = f
        .s
        .create_shift(&f.admin, &f.team, draft(at(2025, 6, 10, 8), at(2025, 6, 10, 16), &[&outsider]))
        .unwrap_err();
    assert!(matches!(err, SchedError::NotMember { .. }));
}

#[test]
fn duplicate_assignees_collapse() {
    let mut f = Fixture::new();
    let alice = f.alice.clone();
    let id = f.shift(at(2025, 6, 10, 8), at(2025, 6, 10, 16), &[&alice, &alice]);
    assert_eq!(f.s.roster().assignees(&id), BTreeSet::from([alice]));
    assert_eq!(f.s.roster().assignments.len(), 1);
}

#[test]
fn edit_reconciles_by_set_difference() {
    let mut f = Fixture::new();
    let (alice, bob, carol) = (f.alice.clone(), f.bob.clone(), f.carol.clone());
    let id = f.shift(at(2025, 6, 10, 8), at(2025, 6, 10, 16), &[&alice, &bob]);
    let diff = f
        .s
        .edit_shift(&f.admin, &id, draft(at(2025, 6, 10, 8), at(2025, 6, 10, 16), &[&bob, &carol]))
        .unwrap();
    assert_eq!(diff.added, BTreeSet::from([carol.clone()]));
    assert_eq!(diff.removed, BTreeSet::from([alice]));
    assert_eq!(f.s.roster().assignees(&id), BTreeSet::from([bob, carol]));
    assert_eq!(f.s.roster().assignments.len(), 2);
}

#[test]
fn edit_ignores_the_shift_being_edited() {
    let mut f = Fixture::new();
    let alice = f.alice.clone();
    let id = f.shift(at(2025, 6, 10, 8), at(2025, 6, 10, 16), &[&alice]);
    f.s.edit_shift(&f.admin, &id, draft(at(2025, 6, 10, 9), at(2025, 6, 10, 17), &[&alice]))
        .unwrap();
    let shift = f.s.roster().find_shift(&id).unwrap();
    assert_eq!(shift.start, at(2025, 6, 10, 9));
    assert_eq!(shift.end, at(2025, 6, 10, 17));
}

#[test]
fn edit_into_another_shift_fails_and_keeps_previous_state() {
    let mut f = Fixture::new();
    let alice = f.alice.clone();
    f.shift(at(2025, 6, 10, 8), at(2025, 6, 10, 16), &[&alice]);
    let late = f.shift(at(2025, 6, 10, 18), at(2025, 6, 10, 22), &[&alice]);
    let err = f
        .s
        .edit_shift(&f.admin, &late, draft(at(2025, 6, 10, 15), at(2025, 6, 10, 22), &[&alice]))
        .unwrap_err();
    assert!(matches!(err, SchedError::SchedulingConflict { .. }));
    assert_eq!(f.s.roster().find_shift(&late).unwrap().start, at(2025, 6, 10, 18));
}

#[test]
fn plain_members_cannot_manage_shifts() {
    let mut f = Fixture::new();
    let bob = f.member(&f.bob.clone());
    let err = f
        .s
        .create_shift(&bob, &f.team, draft(at(2025, 6, 10, 8), at(2025, 6, 10, 16), &[]))
        .unwrap_err();
    assert!(matches!(err, SchedError::Authorization(_)));
}

#[test]
fn deleting_a_shift_voids_swaps_and_unlinks_tasks() {
    let mut f = Fixture::new();
    let alice_id = f.alice.clone();
    let id = f.shift(at(2025, 6, 10, 8), at(2025, 6, 10, 16), &[&alice_id]);
    let alice = f.member(&alice_id);
    let swap = f
        .s
        .request_swap(
            &alice,
            SwapDraft {
                team: f.team.clone(),
                shift: id.clone(),
                requested_to: None,
                message: None,
            },
        )
        .unwrap();
    let task = f
        .s
        .create_task(
            &f.admin,
            &f.team,
            TaskDraft {
                shift: Some(id.clone()),
                ..TaskDraft::new("Restock")
            },
        )
        .unwrap();

    let removal = f.s.delete_shift(&f.admin, &id).unwrap();
    assert_eq!(removal.assignments_removed, 1);
    assert_eq!(removal.voided_swaps, vec![swap.clone()]);
    assert_eq!(removal.unlinked_tasks, 1);
    assert!(f.s.roster().find_task(&task).unwrap().shift.is_none());

    let bob = f.member(&f.bob.clone());
    let err = f.s.claim_swap(&bob, &swap).unwrap_err();
    assert!(matches!(err, SchedError::NotFound { kind: "shift", .. }));
    assert!(f.s.open_swaps(&bob, None).is_empty());
}

#[test]
fn no_overlap_survives_a_series_of_operations() {
    let mut f = Fixture::new();
    let (alice, bob, carol) = (f.alice.clone(), f.bob.clone(), f.carol.clone());
    let a = f.shift(at(2025, 6, 10, 0), at(2025, 6, 10, 8), &[&alice]);
    let b = f.shift(at(2025, 6, 10, 8), at(2025, 6, 10, 16), &[&bob, &carol]);
    f.shift(at(2025, 6, 10, 16), at(2025, 6, 11, 0), &[&alice, &carol]);

    // chaque tentative de chevauchement échoue sans rien écrire
    assert!(f
        .s
        .edit_shift(&f.admin, &a, draft(at(2025, 6, 10, 0), at(2025, 6, 10, 9), &[&alice, &bob]))
        .is_err());
    assert!(f
        .s
        .create_shift(&f.admin, &f.team, draft(at(2025, 6, 10, 15), at(2025, 6, 10, 17), &[&carol]))
        .is_err());
    f.s.edit_shift(&f.admin, &b, draft(at(2025, 6, 10, 8), at(2025, 6, 10, 16), &[&alice]))
        .unwrap();

    assert!(f.s.detect_conflicts().is_empty());
    assert_eq!(f.s.roster().assignments.len(), 4);
}

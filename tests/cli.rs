#![forbid(unsafe_code)]
use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;

fn cli(roster: &Path) -> Command {
    let mut cmd = Command::cargo_bin("shiftboard-cli").unwrap();
    cmd.arg("--roster").arg(roster);
    cmd
}

fn stdout_of(cmd: &mut Command) -> String {
    let out = cmd.assert().success().get_output().stdout.clone();
    String::from_utf8(out).unwrap().trim().to_string()
}

fn setup(roster: &Path) -> String {
    for handle in ["root", "alice", "bob"] {
        cli(roster).args(["add-user", "--handle", handle]).assert().success();
    }
    let created = stdout_of(cli(roster).args(["create-team", "--name", "Ops", "--as", "root", "--admin"]));
    assert_eq!(created.split_whitespace().count(), 2);
    for handle in ["alice", "bob"] {
        cli(roster)
            .args(["add-member", "--team", "Ops", "--handle", handle, "--as", "root", "--admin"])
            .assert()
            .success();
    }
    stdout_of(cli(roster).args([
        "create-shift",
        "--team",
        "Ops",
        "--start",
        "2099-01-01T08:00:00Z",
        "--end",
        "2099-01-01T16:00:00Z",
        "--assign",
        "alice",
        "--as",
        "root",
        "--admin",
    ]))
}

#[test]
fn swap_flow_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let roster = dir.path().join("roster.json");
    let shift = setup(&roster);

    let swap = stdout_of(cli(&roster).args(["swap", "request", "--team", "Ops", "--shift-id", &shift, "--as", "alice"]));
    cli(&roster)
        .args(["swap", "open", "--as", "bob"])
        .assert()
        .success()
        .stdout(predicate::str::contains(swap.as_str()));
    cli(&roster)
        .args(["swap", "claim", "--id", &swap, "--as", "bob"])
        .assert()
        .success();
    // un second preneur arrive trop tard
    cli(&roster)
        .args(["swap", "claim", "--id", &swap, "--as", "alice"])
        .assert()
        .failure();
    cli(&roster)
        .args(["swap", "approve", "--id", &swap, "--as", "bob"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("forbidden"));
    cli(&roster)
        .args(["swap", "approve", "--id", &swap, "--as", "root", "--admin"])
        .assert()
        .success();

    cli(&roster)
        .args(["list", "--team", "Ops"])
        .assert()
        .success()
        .stdout(predicate::str::contains(shift.as_str()).and(predicate::str::contains("| bob")));
}

#[test]
fn check_and_reports() {
    let dir = tempfile::tempdir().unwrap();
    let roster = dir.path().join("roster.json");
    setup(&roster);

    cli(&roster)
        .arg("check")
        .assert()
        .code(0)
        .stdout(predicate::str::contains("OK: no conflicts"));

    cli(&roster)
        .args(["report", "hours", "--team", "Ops", "--from", "2099-01-01", "--to", "2099-01-01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("handle,shifts,hours").and(predicate::str::contains("alice,1,8.00")));
}

#[test]
fn invalid_operations_fail_without_writing() {
    let dir = tempfile::tempdir().unwrap();
    let roster = dir.path().join("roster.json");
    setup(&roster);
    let before = std::fs::read(&roster).unwrap();

    cli(&roster)
        .args([
            "create-shift",
            "--team",
            "Ops",
            "--start",
            "2099-01-02T16:00:00Z",
            "--end",
            "2099-01-02T08:00:00Z",
            "--as",
            "root",
            "--admin",
        ])
        .assert()
        .failure();
    // chevauchement pour alice
    cli(&roster)
        .args([
            "create-shift",
            "--team",
            "Ops",
            "--start",
            "2099-01-01T12:00:00Z",
            "--end",
            "2099-01-01T20:00:00Z",
            "--assign",
            "alice,bob",
            "--as",
            "root",
            "--admin",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("conflict"));
    cli(&roster)
        .args(["create-team", "--name", "Night", "--as", "alice"])
        .assert()
        .failure();

    assert_eq!(std::fs::read(&roster).unwrap(), before);
}

#[test]
fn missing_actor_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let roster = dir.path().join("roster.json");
    cli(&roster).args(["add-user", "--handle", "root"]).assert().success();
    cli(&roster)
        .args(["create-team", "--name", "Ops"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--as"));
}

#[test]
fn swap_grace_is_bounded() {
    let dir = tempfile::tempdir().unwrap();
    let roster = dir.path().join("roster.json");
    cli(&roster)
        .args(["add-user", "--handle", "root", "--swap-grace-minutes", "10080"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("swap-grace-minutes"));
    assert!(!roster.exists());
}

#[test]
fn task_and_load_reports() {
    let dir = tempfile::tempdir().unwrap();
    let roster = dir.path().join("roster.json");
    let shift = setup(&roster);
    cli(&roster)
        .args([
            "task", "create", "--team", "Ops", "--title", "Restock", "--due", "2099-01-01", "--assignee", "bob",
            "--as", "root", "--admin",
        ])
        .assert()
        .success();

    cli(&roster)
        .args([
            "report", "tasks", "--team", "Ops", "--from", "2099-01-01", "--to", "2099-01-31", "--assignee", "bob",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains(",Restock,medium,new,bob,"))
        .stderr(predicate::str::contains("bob: 1 task(s)"));
    cli(&roster)
        .args([
            "report", "tasks", "--team", "Ops", "--from", "2099-01-01", "--to", "2099-01-31", "--assignee",
            "unassigned",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Restock").not());

    let out = dir.path().join("load.csv");
    cli(&roster)
        .args(["report", "load", "--team", "Ops", "--from", "2099-01-01", "--to", "2099-01-01", "--out"])
        .arg(&out)
        .assert()
        .success()
        .stderr(predicate::str::contains("1 shift(s), 1 staffed, 0 open"));
    let text = std::fs::read_to_string(&out).unwrap();
    assert!(text.starts_with("metric,value\n"));
    assert!(text.contains(&format!("{shift},2099-01-01T08:00:00+00:00,2099-01-01T16:00:00+00:00,,,1,false")));
}

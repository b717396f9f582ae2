use super::common::{fixture, stepwise};
use predicates::prelude::*;

#[test]
fn missing_program_is_reported() {
    stepwise()
        .arg("run")
        .arg(fixture("does_not_exist.sw"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load program"));
}

#[test]
fn syntax_errors_name_the_line() {
    stepwise()
        .arg("run")
        .arg(fixture("syntax_error.sw"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Syntax error"))
        .stderr(predicate::str::contains("line 2"));
}

#[test]
fn syntax_errors_stop_the_debugger_before_it_starts() {
    stepwise()
        .arg("debug")
        .arg(fixture("syntax_error.sw"))
        .write_stdin("")
        .assert()
        .failure()
        .stdout(predicate::str::contains("Frame stack").not())
        .stderr(predicate::str::contains("Syntax error"));
}

#[test]
fn unknown_subcommand_is_rejected() {
    stepwise()
        .arg("frobnicate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

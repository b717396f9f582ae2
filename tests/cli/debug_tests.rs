use super::common::{debug, fixture, stepwise};
use predicates::prelude::*;

#[test]
fn closed_input_runs_the_program_to_completion() {
    debug("hello.sw")
        .write_stdin("")
        .assert()
        .success()
        .stdout(predicate::str::contains("hello, world"))
        .stdout(predicate::str::contains("── Frame stack"))
        .stdout(predicate::str::contains("── Locals"));
}

#[test]
fn steps_show_source_with_true_lines() {
    debug("hello.sw")
        .write_stdin("")
        .assert()
        .success()
        .stdout(predicate::str::contains("   2 -> name = \"world\";"))
        .stdout(predicate::str::contains("-->    0 LOAD_CONST"));
}

#[test]
fn expressions_are_evaluated_and_errors_do_not_end_the_session() {
    debug("hello.sw")
        .write_stdin("nope\n40 + 2\n\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Error: name 'nope' is not defined"))
        .stdout(predicate::str::contains("42\n"))
        .stdout(predicate::str::contains("hello, world"));
}

#[test]
fn program_output_is_not_disturbed_by_stepping() {
    debug("calls.sw")
        .write_stdin("")
        .assert()
        .success()
        .stdout(predicate::str::contains("total 10"))
        .stdout(predicate::str::contains("double 20"))
        .stdout(predicate::str::contains("sum_to ("))
        .stdout(predicate::str::contains("__return__ = 10"));
}

#[test]
fn tracebacks_under_the_debugger_use_true_lines() {
    debug("error.sw")
        .write_stdin("")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("line 5, in <module>"))
        .stderr(predicate::str::contains("line 2, in divide"));
}

#[test]
fn invalid_configuration_is_rejected() {
    let mut config = tempfile::NamedTempFile::new().unwrap();
    std::io::Write::write_all(&mut config, b"[display]\ninstruction_window = 0\n").unwrap();

    stepwise()
        .arg("--config")
        .arg(config.path())
        .arg("debug")
        .arg(fixture("hello.sw"))
        .write_stdin("")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Configuration error"));
}

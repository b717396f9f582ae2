use super::common::{fixture, stepwise};
use predicates::prelude::*;

#[test]
fn run_prints_program_output() {
    stepwise()
        .arg("run")
        .arg(fixture("hello.sw"))
        .assert()
        .success()
        .stdout("hello, world\n");
}

#[test]
fn run_executes_hoisted_functions_and_lambdas() {
    stepwise()
        .arg("run")
        .arg(fixture("calls.sw"))
        .assert()
        .success()
        .stdout("total 10\ndouble 20\n");
}

#[test]
fn run_passes_program_arguments() {
    stepwise()
        .arg("run")
        .arg(fixture("args.sw"))
        .args(["one", "--two"])
        .assert()
        .success()
        .stdout("2 [\"one\", \"--two\"]\n");
}

#[test]
fn run_reports_runtime_errors_with_a_traceback() {
    stepwise()
        .arg("run")
        .arg(fixture("error.sw"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Traceback (most recent call last):"))
        .stderr(predicate::str::contains("line 5, in <module>"))
        .stderr(predicate::str::contains("line 2, in divide"))
        .stderr(predicate::str::contains("division by zero"));
}

use super::common::{fixture, stepwise};
use predicates::prelude::*;
use serde_json::Value;

#[test]
fn text_listing_shows_every_unit() {
    stepwise()
        .arg("disasm")
        .arg(fixture("calls.sw"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Disassembly of <module>"))
        .stdout(predicate::str::contains("Disassembly of sum_to"))
        .stdout(predicate::str::contains("Disassembly of add"))
        .stdout(predicate::str::contains("LOAD_CONST"))
        .stdout(predicate::str::contains("Line table:"))
        .stdout(predicate::str::contains("True line table").not());
}

#[test]
fn realigned_listing_includes_true_line_tables() {
    stepwise()
        .arg("disasm")
        .arg("--realign")
        .arg(fixture("hello.sw"))
        .assert()
        .success()
        .stdout(predicate::str::contains("True line table:"))
        .stdout(predicate::str::contains("-> line 2"));
}

#[test]
fn json_listing_has_one_entry_per_unit() {
    let output = stepwise()
        .arg("disasm")
        .arg("--realign")
        .args(["--format", "json"])
        .arg(fixture("calls.sw"))
        .output()
        .unwrap();
    assert!(output.status.success());

    let listings: Value = serde_json::from_slice(&output.stdout).unwrap();
    let listings = listings.as_array().unwrap();
    assert_eq!(listings.len(), 4);
    assert_eq!(listings[0]["name"], "<module>");

    for listing in listings {
        let instructions = listing["instructions"].as_array().unwrap();
        assert!(!instructions.is_empty());
        assert!(listing["true_line_table"].is_array());

        // Realigned positions are dense: instruction i reports line i + 1.
        for (i, instruction) in instructions.iter().enumerate() {
            assert_eq!(instruction["line"].as_u64().unwrap(), i as u64 + 1);
        }
    }
}

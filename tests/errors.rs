mod common;

use common::cargo_bin;
use predicates::prelude::*;
use std::time::Duration;

#[test]
fn test_comments_are_not_errors() {
    cargo_bin()
        .timeout(Duration::from_secs(2)).arg("read").arg("+a+")
        .assert()
        .success()
        .stderr(predicate::str::is_empty());
}

#[test]
fn test_unmatched_open_bracket_error() {
    cargo_bin()
        .timeout(Duration::from_secs(2)).arg("read").arg("+[")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Parse error: unmatched bracket '['").and(predicate::str::contains("at byte 1")));
}

#[test]
fn test_unmatched_close_bracket_error_shows_caret() {
    cargo_bin()
        .timeout(Duration::from_secs(2)).arg("read").arg("++]")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unmatched bracket ']' at byte 2").and(predicate::str::contains("  ++]\n    ^")));
}

#[test]
fn test_invalid_program_produces_no_output() {
    // the '.' would print if anything ran before validation failed
    cargo_bin()
        .arg("read").arg("+.]")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("\u{1}").not());
}

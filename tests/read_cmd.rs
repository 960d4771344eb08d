mod common;

use common::{cargo_bin, tempfile_with};
use predicates::prelude::*;
use std::time::Duration;

fn small_valid_bf() -> &'static str { "+++." }

#[test]
fn test_read_positional_code_success() {
    cargo_bin()
        .arg("read").arg(small_valid_bf())
        .assert()
        .success()
        .stdout("\u{3}\n")
        .stderr(predicate::str::is_empty());
}

#[test]
fn test_read_concatenates_positional_parts() {
    // 8 * 8 + 1 = 65 = 'A'
    cargo_bin()
        .arg("read").arg("++++++++[>++++++++<-]").arg(">+.")
        .assert()
        .success()
        .stdout("A\n");
}

#[test]
fn test_read_file_success() {
    let tf = tempfile_with("comment: print three\n+++.");
    cargo_bin()
        .arg("read").arg("--file").arg(tf.path())
        .assert()
        .success()
        .stdout("\u{3}\n")
        .stderr(predicate::str::is_empty());
}

#[test]
fn test_read_missing_file_fails() {
    cargo_bin()
        .arg("read").arg("--file").arg("/nonexistent/program.bf")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("failed to read code file"));
}

#[test]
fn test_read_without_code_is_usage_error() {
    cargo_bin()
        .arg("read")
        .assert()
        .code(2);
}

#[test]
fn test_read_file_and_code_conflict() {
    let tf = tempfile_with(small_valid_bf());
    cargo_bin()
        .arg("read").arg("--file").arg(tf.path()).arg("+")
        .assert()
        .code(2);
}

#[test]
fn test_read_debug_prints_table() {
    cargo_bin()
        .arg("read").arg("--debug").arg("+.+")
        .assert()
        .success()
        .stdout(predicate::str::contains("STEP | IP").and(predicate::str::contains("Increment cell[0] from 1 to 2")))
        .stderr(predicate::str::is_empty());
}

#[test]
fn test_read_captured_input_flag() {
    cargo_bin()
        .arg("read").arg("--input").arg("hey").arg(",[.[-],]")
        .timeout(Duration::from_secs(2))
        .assert()
        .success()
        .stdout("hey\n");
}

#[test]
fn test_read_captured_input_file() {
    let tf = tempfile_with("xy");
    cargo_bin()
        .arg("read").arg("--input-file").arg(tf.path()).arg(",>,.<.")
        .assert()
        .success()
        .stdout("yx\n");
}

#[test]
fn test_read_clamps_pointer_by_default() {
    // '<' at cell 0 stays put, so the increments land in cell 0
    cargo_bin()
        .arg("read").arg(format!("<<<{}.", "+".repeat(49)))
        .assert()
        .success()
        .stdout("1\n");
}

#[test]
fn test_read_wrap_flag_wraps_pointer() {
    // on a 2-cell tape, '<' from cell 0 lands on cell 1 and '>' from cell 1 lands on cell 0
    cargo_bin()
        .arg("read").arg("--wrap").arg("--tape-size").arg("2")
        .arg(format!("<{}.>.", "+".repeat(48)))
        .assert()
        .success()
        .stdout("0\u{0}\n");
}

#[test]
fn test_read_zero_tape_size_is_config_error() {
    cargo_bin()
        .arg("read").arg("--tape-size").arg("0").arg("+")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("tape size"));
}

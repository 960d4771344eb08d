// Exercises ',' against live stdin: read one byte, then echo it.
mod common;

use common::cargo_bin;

#[test]
fn reads_from_stdin_and_echoes_byte() {
    cargo_bin()
        .arg("read").arg(",.")
        .write_stdin("Z")
        .assert()
        .success()
        .stdout("Z\n");
}

#[test]
fn eof_on_stdin_leaves_cell_unchanged() {
    // 49 is '1'; reading at EOF must not overwrite it
    cargo_bin()
        .arg("read").arg(format!("{},.", "+".repeat(49)))
        .write_stdin("")
        .assert()
        .success()
        .stdout("1\n");
}

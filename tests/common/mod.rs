use assert_cmd::Command;

/// The `bf` binary with a clean, deterministic environment.
pub fn cargo_bin() -> Command {
    let mut cmd = Command::cargo_bin("bf").unwrap();
    cmd.env("BF_CONFIG", "/nonexistent/bf.toml")
        .env_remove("BF_TIMEOUT_MS")
        .env_remove("BF_MAX_STEPS")
        .env_remove("BF_TAPE_SIZE")
        .env_remove("BF_POINTER_POLICY")
        .env_remove("BF_REPL_MODE")
        .env_remove("BF_REPL_ONCE")
        .env_remove("RUST_LOG");
    cmd
}

#[allow(dead_code)]
pub fn tempfile_with(content: &str) -> tempfile::NamedTempFile {
    use std::io::Write;
    let mut tf = tempfile::NamedTempFile::new().expect("tempfile");
    write!(tf, "{}", content).unwrap();
    tf
}

pub mod read;
pub mod repl;

use std::io::{self, Write};

use bf_engine::cli_util::print_error;
use bf_engine::{EngineConfig, Error, Overrides};

/// Resolve configuration, printing the problem and yielding exit code 2 on failure.
pub fn resolve_config(program: &str, overrides: &Overrides) -> Result<EngineConfig, i32> {
    EngineConfig::resolve(overrides).map_err(|err| {
        print_error(Some(program), &[], &Error::Config(err));
        let _ = io::stderr().flush();
        2
    })
}

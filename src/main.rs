mod commands;

use std::env;

use clap::{Parser, Subcommand};

use commands::read::ReadArgs;
use commands::repl::ReplArgs;

/// A Brainfuck interpreter: validate a program, then run it on a fixed tape.
#[derive(Parser, Debug)]
#[command(name = "bf", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run Brainfuck code given as arguments or loaded from a file
    Read(ReadArgs),
    /// Start a Brainfuck REPL (the default when no subcommand is given)
    Repl(ReplArgs),
}

fn main() {
    bf_engine::logging::init_logging();

    // Program name for diagnostics
    let program = env::args().next().unwrap_or_else(|| String::from("bf"));

    let cli = Cli::parse();

    let code = match cli.command {
        Some(Command::Read(args)) => commands::read::run(&program, args),
        Some(Command::Repl(args)) => commands::repl::run(&program, args),
        None => commands::repl::run(&program, ReplArgs::default()),
    };

    std::process::exit(code);
}

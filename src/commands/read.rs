use std::fs;
use std::io::{self, Cursor, Read, Write};
use std::path::PathBuf;

use clap::Args;
use tracing::info;

use bf_engine::cli_util::print_error;
use bf_engine::{
    run_supervised, supervise, Error, Interpreter, Overrides, PointerPolicy, RunError, Supervision,
};

use super::resolve_config;

#[derive(Args, Debug)]
#[command(after_help = r#"Notes:
- Without --input/--input-file, `,` reads a single byte from stdin; on EOF the current cell is left unchanged.
- Characters outside of Brainfuck's ><+-.,[] are comments.

Examples:
- Load Brainfuck code from a file:
    bf read --file ./program.bf
- Read bytes from a file as stdin (`,` will consume file input):
    bf read ",[.[-],]" < input.txt"#)]
pub struct ReadArgs {
    /// Print a step-by-step table of operations instead of executing
    #[arg(short = 'd', long = "debug")]
    pub debug: bool,

    /// Read Brainfuck code from PATH instead of positional "<code>"
    #[arg(short = 'f', long = "file", conflicts_with = "code")]
    pub file: Option<PathBuf>,

    /// Concatenated Brainfuck code parts
    #[arg(value_name = "code", trailing_var_arg = true, required_unless_present = "file")]
    pub code: Vec<String>,

    /// Captured input for `,` instead of live stdin
    #[arg(short = 'i', long = "input", value_name = "TEXT", conflicts_with = "input_file")]
    pub input: Option<String>,

    /// Captured input for `,` read from PATH
    #[arg(long = "input-file", value_name = "PATH")]
    pub input_file: Option<PathBuf>,

    /// Wall-clock timeout in milliseconds (fallback BF_TIMEOUT_MS; default unlimited)
    #[arg(long = "timeout", value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Maximum interpreter steps before abort (fallback BF_MAX_STEPS; default unlimited)
    #[arg(long = "max-steps", value_name = "N")]
    pub max_steps: Option<u64>,

    /// Number of tape cells (fallback BF_TAPE_SIZE; default 30000)
    #[arg(long = "tape-size", value_name = "N")]
    pub tape_size: Option<usize>,

    /// Wrap the pointer around the tape edges instead of clamping
    #[arg(long = "wrap")]
    pub wrap: bool,
}

pub fn run(program: &str, args: ReadArgs) -> i32 {
    let ReadArgs {
        debug,
        file,
        code,
        input,
        input_file,
        timeout_ms,
        max_steps,
        tape_size,
        wrap,
    } = args;

    let overrides = Overrides {
        tape_size,
        pointer_policy: wrap.then_some(PointerPolicy::Wrap),
        max_steps,
        timeout_ms,
    };
    let config = match resolve_config(program, &overrides) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let source: Vec<u8> = if let Some(path) = file {
        match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                eprintln!("{program}: failed to read code file {}: {e}", path.display());
                let _ = io::stderr().flush();
                return 1;
            }
        }
    } else {
        code.join("").into_bytes()
    };

    let program_input: Box<dyn Read + Send> = match (input, input_file) {
        (Some(text), _) => Box::new(Cursor::new(text.into_bytes())),
        (None, Some(path)) => match fs::read(&path) {
            Ok(bytes) => Box::new(Cursor::new(bytes)),
            Err(e) => {
                eprintln!("{program}: failed to read input file {}: {e}", path.display());
                let _ = io::stderr().flush();
                return 1;
            }
        },
        (None, None) => Box::new(io::stdin()),
    };

    let interp = match Interpreter::new(source.as_slice(), &config) {
        Ok(i) => i,
        Err(err) => {
            print_error(Some(program), &source, &Error::Validation(err));
            return 1;
        }
    };
    info!(len = interp.program().len(), instructions = interp.program().instruction_count(), "program validated");

    let supervision = Supervision::from(&config);
    let result = if debug {
        let mut interp = interp;
        supervise(supervision, move |ctrl| interp.run_debug(io::stdout(), Some(&ctrl)))
            .and_then(|r| r)
    } else {
        run_supervised(interp, program_input, io::stdout(), supervision).0
    };

    let exit_code = match result {
        Ok(_) => 0,
        Err(err) => {
            report_run_error(program, &source, err);
            1
        }
    };

    // For readability, ensure output ends with a newline
    println!();
    let _ = io::stdout().flush();
    exit_code
}

fn report_run_error(program: &str, source: &[u8], err: RunError) {
    print_error(Some(program), source, &Error::Run(err));
    let _ = io::stderr().flush();
}

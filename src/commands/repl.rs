use std::io::{self, IsTerminal, Write};

use clap::Args;

use bf_engine::repl::{execute_bare_once, repl_loop, select_mode, ModeFlagOverride, ReplMode, META_HELP};
use bf_engine::Overrides;

use super::resolve_config;

#[derive(Args, Debug, Default)]
#[command(after_help = r#"Notes:
    - Ctrl+D executes the current buffer on *nix/macOS; Ctrl+Z and Enter on Windows.
    - Ctrl+C exits the REPL immediately.
    - Each execution starts with a fresh tape and pointer.
    - Bytes outside ><+-.,[] are comments.
    - BF_REPL_ONCE=1 exits after a single execution.
    - Mode selection: --bare|--editor, then BF_REPL_MODE=bare|editor, then
      editor mode when stdin is a TTY and bare mode otherwise.
    - In bare mode stdin is read to EOF and executed once; `,` sees EOF.
"#)]
pub struct ReplArgs {
    /// Force non-interactive bare mode
    #[arg(long = "bare", conflicts_with = "editor")]
    pub bare: bool,

    /// Force interactive mode (errors if stdin is not a TTY)
    #[arg(long = "editor", conflicts_with = "bare")]
    pub editor: bool,
}

impl ReplArgs {
    fn mode_flag(&self) -> ModeFlagOverride {
        if self.bare {
            ModeFlagOverride::Bare
        } else if self.editor {
            ModeFlagOverride::Editor
        } else {
            ModeFlagOverride::None
        }
    }
}

pub fn run(program: &str, args: ReplArgs) -> i32 {
    let mode = match select_mode(args.mode_flag()) {
        Ok(m) => m,
        Err(msg) => {
            eprintln!("{program}: {msg}");
            let _ = io::stderr().flush();
            return 1;
        }
    };

    let config = match resolve_config(program, &Overrides::default()) {
        Ok(c) => c,
        Err(code) => return code,
    };

    // Install SIGINT (ctrl+c) handler to flush and exit(0) immediately
    if let Err(e) = ctrlc::set_handler(|| {
        let _ = io::stdout().flush();
        let _ = io::stderr().flush();
        std::process::exit(0);
    }) {
        eprintln!("{program}: failed to set ctrl+c handler: {e}");
        let _ = io::stderr().flush();
        return 1;
    }

    let result = match mode {
        ReplMode::Editor => {
            // Banners only if stderr is a TTY
            if io::stderr().is_terminal() {
                eprintln!("Brainfuck REPL (interactive editor mode)");
                eprintln!("Ctrl+d/Ctrl+z Enter (Windows) executes the current buffer. Press ctrl+c to exit");
                eprint!("{META_HELP}");
                let _ = io::stderr().flush();
            }
            repl_loop(config)
        }
        ReplMode::Bare => execute_bare_once(config),
    };

    match result {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("{program}: REPL error: {e}");
            let _ = io::stderr().flush();
            1
        }
    }
}

use clap::Parser;
use rush::shell::{Shell, ShellConfig};
use std::io::IsTerminal;

#[derive(Parser)]
#[command(name = "rush")]
#[command(about = "A POSIX-compatible interactive shell")]
#[command(version)]
struct Cli {
    /// Execute the given command string
    #[arg(short = 'c', value_name = "command")]
    command: Option<String>,

    /// Read commands from standard input
    #[arg(short = 's')]
    stdin: bool,

    /// Force interactive mode
    #[arg(short = 'i')]
    interactive: bool,

    /// Do not load the rc file
    #[arg(long = "norc")]
    norc: bool,

    /// Load this rc file instead of ~/.rushrc
    #[arg(long = "rcfile", value_name = "path")]
    rcfile: Option<String>,

    /// Dump the parsed tree before executing
    #[arg(long = "debug-ast")]
    debug_ast: bool,

    /// Dump the token stream before parsing
    #[arg(long = "debug-tokens")]
    debug_tokens: bool,

    /// Script file, then its arguments
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    script_args: Vec<String>,
}

fn main() {
    let cli = Cli::parse();

    let stdin_tty = std::io::stdin().is_terminal();

    // -c: the first trailing argument is $0, the rest positionals.
    if let Some(command) = cli.command {
        let mut args = cli.script_args.clone();
        let script_name = if args.is_empty() {
            "rush".to_string()
        } else {
            args.remove(0)
        };
        let mut shell = Shell::new(ShellConfig {
            interactive: false,
            norc: true,
            rcfile: None,
            debug_ast: cli.debug_ast,
            debug_tokens: cli.debug_tokens,
            script_name: Some(script_name),
            args,
        });
        std::process::exit(shell.run_str(&command));
    }

    // Script file mode.
    if !cli.stdin && !cli.script_args.is_empty() {
        let mut args = cli.script_args.clone();
        let script = args.remove(0);
        let mut shell = Shell::new(ShellConfig {
            interactive: false,
            norc: true,
            rcfile: None,
            debug_ast: cli.debug_ast,
            debug_tokens: cli.debug_tokens,
            script_name: Some(script.clone()),
            args,
        });
        std::process::exit(shell.run_script_file(&script));
    }

    // Reading from stdin: interactive when it is a terminal (or forced).
    let interactive = cli.interactive || (stdin_tty && !cli.stdin);
    let mut shell = Shell::new(ShellConfig {
        interactive,
        norc: cli.norc,
        rcfile: cli.rcfile,
        debug_ast: cli.debug_ast,
        debug_tokens: cli.debug_tokens,
        script_name: None,
        args: cli.script_args,
    });

    let status = if interactive {
        shell.run_interactive()
    } else {
        let mut text = String::new();
        use std::io::Read;
        let _ = std::io::stdin().read_to_string(&mut text);
        shell.run_str(&text)
    };
    std::process::exit(status);
}

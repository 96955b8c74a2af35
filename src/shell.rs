//! Shell driver
//!
//! Owns the `ShellState` and runs the read-parse-execute loop over an
//! input source: rc-file loading with ownership checks, history recording,
//! job-state notifications before each interactive prompt, debug dumps,
//! and the mapping from executor errors to messages and exit codes.

use crate::ast::Script;
use crate::exec::{ExecError, Executor};
use crate::input::multiline::MultiLineHandler;
use crate::input::source::{FileInput, InputSource, StringInput};
use crate::jobs::signals;
use crate::state::{ShellState, TrapAction};
use std::os::unix::fs::MetadataExt;
use std::path::PathBuf;

#[derive(Debug, Clone, Default)]
pub struct ShellConfig {
    pub interactive: bool,
    pub norc: bool,
    pub rcfile: Option<String>,
    pub debug_ast: bool,
    pub debug_tokens: bool,
    /// `$0`.
    pub script_name: Option<String>,
    /// Initial positional parameters.
    pub args: Vec<String>,
}

/// How one buffer's execution ended.
enum RunOutcome {
    Continue(i32),
    Exit(i32),
}

pub struct Shell {
    pub state: ShellState,
    executor: Executor,
}

impl Shell {
    pub fn new(config: ShellConfig) -> Self {
        let mut state = ShellState::new();
        state.init_from_environment();
        state.interactive = config.interactive;
        state.positional = config.args;
        if let Some(name) = config.script_name {
            state.script_name = name;
        }
        state.options.debug_ast = config.debug_ast;
        state.options.debug_tokens = config.debug_tokens;

        signals::install_shell_handlers(config.interactive);

        let mut shell = Self {
            state,
            executor: Executor::new(),
        };

        if config.interactive {
            if let Some(size) = shell
                .state
                .vars
                .get_string("HISTSIZE")
                .and_then(|s| s.parse().ok())
            {
                shell.state.history.set_max(size);
            }
            let histfile = shell
                .state
                .vars
                .get_string("HISTFILE")
                .map(PathBuf::from)
                .or_else(|| home_file(&shell.state, ".rush_history"));
            if let Some(histfile) = histfile {
                shell.state.history.load(&histfile);
            }
            if !config.norc {
                shell.load_rc(config.rcfile.as_deref());
            }
        }

        shell
    }

    // =========================================================================
    // ENTRY POINTS
    // =========================================================================

    /// Run `-c command` text. Returns the exit status.
    pub fn run_str(&mut self, text: &str) -> i32 {
        let mut source = StringInput::new(text, self.state.script_name.clone());
        self.run_source(&mut source)
    }

    /// Run a script file.
    pub fn run_script_file(&mut self, path: &str) -> i32 {
        let mut source = match FileInput::open(path) {
            Ok(source) => source,
            Err(err) => {
                eprintln!("rush: {}: {}", path, err);
                return 127;
            }
        };
        self.run_source(&mut source)
    }

    /// The interactive loop: notify job changes, prompt, read one complete
    /// command, record history, execute. Errors never kill the shell.
    pub fn run_interactive(&mut self) -> i32 {
        let mut source = crate::input::source::InteractiveInput::new();
        let mut status = 0;

        loop {
            self.state.jobs.reap();
            self.state.jobs.notify_changes();
            signals::clear_sigint();

            let handler = MultiLineHandler::new(self.prompt("PS1", "$ "), self.prompt("PS2", "> "));
            let Some(command) = handler.read_command(&mut source) else {
                break;
            };

            self.state.history.add(&command.buffer);

            match command.result {
                // Re-parse through the alias-aware path; the handler's
                // parse only established that the buffer is complete.
                Ok(_) => match self.run_buffer(&command.buffer) {
                    RunOutcome::Continue(s) => status = s,
                    RunOutcome::Exit(code) => {
                        status = code;
                        break;
                    }
                },
                Err(err) => {
                    // Discard the buffer, keep the session.
                    eprintln!("rush: {}", err);
                    self.state.last_status = 2;
                    status = 2;
                }
            }
        }

        self.state.history.save();
        self.run_exit_trap();
        status
    }

    /// Non-interactive loop over any input source. Lexer errors exit 1,
    /// parser errors exit 2, `exit` and fatal expansion errors terminate.
    pub fn run_source(&mut self, source: &mut dyn InputSource) -> i32 {
        let handler = MultiLineHandler::new(String::new(), String::new());
        let mut status = 0;

        while let Some(command) = handler.read_command(source) {
            match command.result {
                Ok(_) => match self.run_buffer(&command.buffer) {
                    RunOutcome::Continue(s) => status = s,
                    RunOutcome::Exit(code) => {
                        self.run_exit_trap();
                        return code;
                    }
                },
                Err(err) => {
                    eprintln!("rush: {}", err);
                    self.run_exit_trap();
                    return if err.lexical { 1 } else { 2 };
                }
            }
        }

        self.run_exit_trap();
        status
    }

    /// Parse and run one buffer that is already complete (used by tests
    /// and embedding callers).
    pub fn run_command(&mut self, text: &str) -> i32 {
        match self.run_buffer(text) {
            RunOutcome::Continue(status) | RunOutcome::Exit(status) => status,
        }
    }

    /// One complete buffer through the full pipeline: preprocess, alias
    /// expansion (when enabled), debug dumps, parse, execute.
    fn run_buffer(&mut self, text: &str) -> RunOutcome {
        let preprocessed = crate::input::preprocess::strip_line_continuations(text);

        if self.state.options.debug_tokens {
            match crate::parser::tokenize(&preprocessed) {
                Ok(tokens) => eprint!("{}", crate::ast::printer::format_tokens(&tokens)),
                Err(err) => eprintln!("rush: {}", err),
            }
        }

        let no_aliases = indexmap::IndexMap::new();
        let aliases = if self.state.shopts.expand_aliases {
            &self.state.aliases
        } else {
            &no_aliases
        };
        match crate::parser::parse_with_aliases(&preprocessed, aliases) {
            Ok(script) => self.execute(&script),
            Err(err) => {
                eprintln!("rush: {}", err);
                self.state.last_status = 2;
                RunOutcome::Continue(2)
            }
        }
    }

    // =========================================================================
    // EXECUTION
    // =========================================================================

    fn execute(&mut self, script: &Script) -> RunOutcome {
        if self.state.options.debug_ast {
            eprint!("{}", crate::ast::printer::format_script(script));
        }

        match self.executor.run_script(&mut self.state, script) {
            Ok(status) => {
                self.state.last_status = status;
                RunOutcome::Continue(status)
            }
            Err(ExecError::Exit(code)) => {
                self.state.last_status = code;
                RunOutcome::Exit(code)
            }
            Err(ExecError::Interrupted) => {
                self.state.last_status = 130;
                if self.state.interactive {
                    RunOutcome::Continue(130)
                } else {
                    RunOutcome::Exit(130)
                }
            }
            Err(err @ (ExecError::Expansion(_) | ExecError::Redirect(_))) => {
                eprintln!("rush: {}", err);
                self.state.last_status = err.status();
                if self.state.interactive {
                    RunOutcome::Continue(err.status())
                } else {
                    // Expansion failures terminate a script.
                    RunOutcome::Exit(err.status())
                }
            }
            Err(err) => {
                // Stray control flow (break outside loop etc.).
                eprintln!("rush: {}", err);
                self.state.last_status = 1;
                RunOutcome::Continue(1)
            }
        }
    }

    fn prompt(&self, var: &str, fallback: &str) -> String {
        self.state
            .vars
            .get_string(var)
            .unwrap_or_else(|| fallback.to_string())
    }

    fn run_exit_trap(&mut self) {
        if let Some(TrapAction::Command(text)) = self.state.traps.get(&0).cloned() {
            self.state.traps.remove(&0);
            if let Ok(script) = crate::parser::parse(&text) {
                let _ = self.executor.run_script(&mut self.state, &script);
            }
        }
    }

    // =========================================================================
    // RC FILE
    // =========================================================================

    /// Load `~/.rushrc` (or the explicit rcfile). Refuses files that are
    /// world-writable or owned by neither the user nor root.
    fn load_rc(&mut self, rcfile: Option<&str>) {
        let path = match rcfile {
            Some(path) => PathBuf::from(path),
            None => match home_file(&self.state, ".rushrc") {
                Some(path) => path,
                None => return,
            },
        };

        let meta = match std::fs::metadata(&path) {
            Ok(meta) => meta,
            Err(_) => return,
        };
        if meta.mode() & 0o002 != 0 {
            eprintln!(
                "rush: {}: not loading: file is world-writable",
                path.display()
            );
            return;
        }
        let uid = nix::unistd::getuid().as_raw();
        if meta.uid() != uid && meta.uid() != 0 {
            eprintln!(
                "rush: {}: not loading: file is not owned by you or root",
                path.display()
            );
            return;
        }

        if let Ok(text) = std::fs::read_to_string(&path) {
            let _ = crate::builtins::source_cmd::run_sourced(
                &mut self.executor,
                &mut self.state,
                &text,
                &[],
            );
        }
    }
}

fn home_file(state: &ShellState, name: &str) -> Option<PathBuf> {
    state
        .vars
        .get_string("HOME")
        .map(|home| PathBuf::from(home).join(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lock() -> std::sync::MutexGuard<'static, ()> {
        crate::TEST_FD_LOCK
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn shell() -> Shell {
        let mut shell = Shell::new(ShellConfig::default());
        // Make the tests independent of the caller's interactive state.
        shell.state.interactive = false;
        shell
    }

    fn run_and_read(shell: &mut Shell, script: &str, capture: &std::path::Path) -> String {
        let wrapped = format!("{{ {} ; }} > {}", script, capture.display());
        let status = shell.run_command(&wrapped);
        assert_eq!(status, shell.state.last_status);
        std::fs::read_to_string(capture).unwrap_or_default()
    }

    #[test]
    fn runs_simple_builtin_command() {
        let _fd = lock();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let mut shell = shell();
        let text = run_and_read(&mut shell, "echo hello world", &out);
        assert_eq!(text, "hello world\n");
    }

    #[test]
    fn variable_assignment_and_expansion() {
        let _fd = lock();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let mut shell = shell();
        let text = run_and_read(&mut shell, "x=5; echo $((x<<2))", &out);
        assert_eq!(text, "20\n");
        assert_eq!(shell.state.last_status, 0);
    }

    #[test]
    fn for_loop_over_command_substitution() {
        let _fd = lock();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let mut shell = shell();
        let text = run_and_read(
            &mut shell,
            "for i in $(printf \"a b c\"); do printf \"%s-\" \"$i\"; done",
            &out,
        );
        assert_eq!(text, "a-b-c-");
    }

    #[test]
    fn function_local_scoping() {
        let _fd = lock();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let mut shell = shell();
        let text = run_and_read(
            &mut shell,
            "f(){ local v=in; echo $v; }; v=out; f; echo $v",
            &out,
        );
        assert_eq!(text, "in\nout\n");
    }

    #[test]
    fn errexit_stops_script() {
        let _fd = lock();
        let mut shell = shell();
        let status = shell.run_command("set -e; false; echo NO");
        assert_eq!(status, 1);
    }

    #[test]
    fn case_pattern_matching() {
        let _fd = lock();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let mut shell = shell();
        let text = run_and_read(&mut shell, "case apple in a*) echo fruit;; esac", &out);
        assert_eq!(text, "fruit\n");
    }

    #[test]
    fn parameter_default_and_error() {
        let _fd = lock();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let mut shell = shell();
        let text = run_and_read(&mut shell, "echo \"${UNSET:-default}\"", &out);
        assert_eq!(text, "default\n");

        let status = shell.run_command("echo \"${UNSET:?err}\"");
        assert_ne!(status, 0);
    }

    #[test]
    fn array_expansion_quoted_fields() {
        let _fd = lock();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let mut shell = shell();
        let text = run_and_read(
            &mut shell,
            "arr=(zebra apple banana); printf \"%s\\n\" \"${arr[@]}\"",
            &out,
        );
        assert_eq!(text, "zebra\napple\nbanana\n");
    }

    #[test]
    fn exit_status_propagates() {
        let _fd = lock();
        let mut shell = shell();
        assert_eq!(shell.run_command("exit 42"), 42);
    }

    #[test]
    fn pipeline_status_and_pipefail() {
        let _fd = lock();
        let mut shell = shell();
        assert_eq!(shell.run_command("false | true"), 0);
        assert_eq!(shell.run_command("set -o pipefail; false | true"), 1);
    }

    #[test]
    fn negated_pipeline() {
        let _fd = lock();
        let mut shell = shell();
        assert_eq!(shell.run_command("! false"), 0);
        assert_eq!(shell.run_command("! true"), 1);
    }

    #[test]
    fn subshell_isolates_state() {
        let _fd = lock();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let mut shell = shell();
        let text = run_and_read(&mut shell, "x=outer; (x=inner; echo $x); echo $x", &out);
        assert_eq!(text, "inner\nouter\n");
    }

    #[test]
    fn brace_group_shares_state() {
        let _fd = lock();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let mut shell = shell();
        let text = run_and_read(&mut shell, "{ x=changed; }; echo $x", &out);
        assert_eq!(text, "changed\n");
    }

    #[test]
    fn heredoc_expansion() {
        let _fd = lock();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let mut shell = shell();
        let script = format!("x=world; cat <<EOF > {}\nhello $x\nEOF", out.display());
        shell.run_command(&script);
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "hello world\n");
    }

    #[test]
    fn quoted_heredoc_suppresses_expansion() {
        let _fd = lock();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let mut shell = shell();
        let script = format!("x=world; cat <<'EOF' > {}\nhello $x\nEOF", out.display());
        shell.run_command(&script);
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "hello $x\n");
    }

    #[test]
    fn parse_error_status_is_two() {
        let _fd = lock();
        let mut shell = shell();
        assert_eq!(shell.run_command("if ; then"), 2);
    }

    #[test]
    fn empty_for_list_runs_zero_iterations() {
        let _fd = lock();
        let mut shell = shell();
        assert_eq!(shell.run_command("for i in; do exit 9; done"), 0);
    }

    #[test]
    fn break_and_continue_levels() {
        let _fd = lock();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let mut shell = shell();
        let text = run_and_read(
            &mut shell,
            "for i in 1 2 3; do for j in a b; do if [ $j = b ]; then continue 2; fi; printf \"%s%s \" $i $j; done; done",
            &out,
        );
        assert_eq!(text, "1a 2a 3a ");
    }

    #[test]
    fn command_not_found_is_127() {
        let _fd = lock();
        let mut shell = shell();
        assert_eq!(shell.run_command("definitely-no-such-command-zz"), 127);
    }

    #[test]
    fn process_substitution_feeds_paths() {
        let _fd = lock();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let mut shell = shell();
        let text = run_and_read(&mut shell, "cat <(echo hi) <(echo bye)", &out);
        assert_eq!(text, "hi\nbye\n");
    }

    #[test]
    fn source_runs_in_current_shell() {
        let _fd = lock();
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("lib.sh");
        std::fs::write(&file, "sourced_var=yes\n").unwrap();
        let mut shell = shell();
        shell.run_command(&format!(". {}", file.display()));
        assert_eq!(
            shell.state.vars.get_string("sourced_var").as_deref(),
            Some("yes")
        );
    }

    #[test]
    fn eval_reenters_the_pipeline() {
        let _fd = lock();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let mut shell = shell();
        let text = run_and_read(&mut shell, "cmd='echo nested'; eval $cmd", &out);
        assert_eq!(text, "nested\n");
    }

    #[test]
    fn alias_expansion_applies() {
        let _fd = lock();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let mut shell = shell();
        shell.run_command("alias greet='echo hi'");
        let text = run_and_read(&mut shell, "greet", &out);
        assert_eq!(text, "hi\n");
    }

    #[test]
    fn background_job_registers_and_waits() {
        let _fd = lock();
        let mut shell = shell();
        let status = shell.run_command("sleep 0.05 & wait $!");
        assert_eq!(status, 0);
        assert!(shell.state.last_bg_pid.is_some());
    }
}

//! Shell state
//!
//! One owned value threaded by mutable reference through every stage:
//! variables and scopes, positional parameters, the function call stack,
//! options, functions, aliases, jobs, history, traps, and the directory
//! stack. Children receive a copy-on-fork of the whole thing.

pub mod history;
pub mod options;
pub mod value;
pub mod vars;

pub use history::History;
pub use options::{Options, ShoptOptions};
pub use value::{Attributes, Value, Variable};
pub use vars::{VarError, VarScopes};

use crate::ast::types::CompoundCommand;
use crate::jobs::JobTable;
use indexmap::IndexMap;
use rand::Rng;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Instant;

/// A defined shell function.
#[derive(Debug, Clone)]
pub struct Function {
    pub body: CompoundCommand,
    pub redirects: Vec<crate::ast::types::Redirect>,
    pub readonly: bool,
}

/// One function invocation: enough to restore the caller on return.
#[derive(Debug, Clone)]
pub struct CallFrame {
    pub name: String,
    pub saved_positional: Vec<String>,
}

/// What `trap` installed for a signal.
#[derive(Debug, Clone, PartialEq)]
pub enum TrapAction {
    /// Run this command text as if by `eval`.
    Command(String),
    Ignore,
}

#[derive(Debug)]
pub struct ShellState {
    pub vars: VarScopes,
    pub positional: Vec<String>,
    /// `$0`.
    pub script_name: String,
    pub frames: Vec<CallFrame>,
    pub last_status: i32,
    /// Per-stage statuses of the last pipeline, for `$PIPESTATUS`.
    pub pipe_statuses: Vec<i32>,
    pub last_bg_pid: Option<i32>,
    pub shell_pid: i32,
    pub options: Options,
    pub shopts: ShoptOptions,
    pub functions: HashMap<String, Function>,
    pub aliases: IndexMap<String, String>,
    pub jobs: JobTable,
    pub history: History,
    pub traps: HashMap<i32, TrapAction>,
    pub dir_stack: Vec<PathBuf>,
    /// Depth of sourced-script nesting (`.`/`source`).
    pub source_depth: u32,
    /// Loops currently enclosing execution, for break/continue validation.
    pub loop_depth: u32,
    /// True in a forked child: `exit` must `_exit`, jobs are not ours.
    pub in_forked_child: bool,
    pub interactive: bool,
    /// Current line for `$LINENO`.
    pub current_line: usize,
    start: Instant,
}

impl Default for ShellState {
    fn default() -> Self {
        Self::new()
    }
}

impl ShellState {
    pub fn new() -> Self {
        Self {
            vars: VarScopes::new(),
            positional: Vec::new(),
            script_name: "rush".to_string(),
            frames: Vec::new(),
            last_status: 0,
            pipe_statuses: Vec::new(),
            last_bg_pid: None,
            shell_pid: std::process::id() as i32,
            options: Options::default(),
            shopts: ShoptOptions::default(),
            functions: HashMap::new(),
            aliases: IndexMap::new(),
            jobs: JobTable::new(),
            history: History::new(history::DEFAULT_HISTSIZE),
            traps: HashMap::new(),
            dir_stack: Vec::new(),
            source_depth: 0,
            loop_depth: 0,
            in_forked_child: false,
            interactive: false,
            current_line: 0,
            start: Instant::now(),
        }
    }

    /// Import the process environment as exported globals and set the
    /// shell-maintained defaults.
    pub fn init_from_environment(&mut self) {
        for (key, value) in std::env::vars() {
            let _ = self.vars.set_scalar(&key, value);
            self.vars.export(&key);
        }
        if self.vars.get_string("IFS").is_none() {
            let _ = self.vars.set_scalar("IFS", " \t\n");
        }
        if self.vars.get_string("PS1").is_none() {
            let _ = self.vars.set_scalar("PS1", "$ ");
        }
        if self.vars.get_string("PS2").is_none() {
            let _ = self.vars.set_scalar("PS2", "> ");
        }
        if self.vars.get_string("PS4").is_none() {
            let _ = self.vars.set_scalar("PS4", "+ ");
        }
        if let Ok(cwd) = std::env::current_dir() {
            let _ = self.vars.set_scalar("PWD", cwd.to_string_lossy());
            self.vars.export("PWD");
        }
        let _ = self.vars.set_scalar("OPTIND", "1");
        let _ = self
            .vars
            .set_scalar("RUSH_VERSION", env!("CARGO_PKG_VERSION"));
    }

    /// In-function means a pushed scope per frame.
    pub fn in_function(&self) -> bool {
        !self.frames.is_empty()
    }

    pub fn function_depth(&self) -> usize {
        self.frames.len()
    }

    /// `$IFS` with the POSIX default.
    pub fn ifs(&self) -> String {
        self.vars.get_string("IFS").unwrap_or_else(|| " \t\n".to_string())
    }

    /// Resolve special and dynamic parameters; `None` means a plain
    /// variable lookup should happen instead.
    pub fn special_param(&self, name: &str) -> Option<String> {
        match name {
            "?" => Some(self.last_status.to_string()),
            "$" => Some(self.shell_pid.to_string()),
            "!" => Some(
                self.last_bg_pid
                    .map(|p| p.to_string())
                    .unwrap_or_default(),
            ),
            "#" => Some(self.positional.len().to_string()),
            "0" => Some(self.script_name.clone()),
            "-" => Some(self.options.flags_string(self.interactive)),
            "RANDOM" if self.vars.get("RANDOM").is_none() => {
                Some(rand::thread_rng().gen_range(0..32768).to_string())
            }
            "SECONDS" if self.vars.get("SECONDS").is_none() => {
                Some(self.start.elapsed().as_secs().to_string())
            }
            "LINENO" if self.vars.get("LINENO").is_none() => {
                Some(self.current_line.to_string())
            }
            "FUNCNAME" if self.vars.get("FUNCNAME").is_none() => Some(
                self.frames
                    .last()
                    .map(|f| f.name.clone())
                    .unwrap_or_default(),
            ),
            "PIPESTATUS" if self.vars.get("PIPESTATUS").is_none() => Some(
                self.pipe_statuses
                    .first()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| self.last_status.to_string()),
            ),
            _ => {
                if let Ok(n) = name.parse::<usize>() {
                    if n >= 1 {
                        return Some(
                            self.positional.get(n - 1).cloned().unwrap_or_default(),
                        );
                    }
                }
                None
            }
        }
    }

    /// Is this parameter set, counting specials and positionals?
    pub fn param_is_set(&self, name: &str) -> bool {
        match name {
            "?" | "$" | "#" | "0" | "-" => true,
            "!" => self.last_bg_pid.is_some(),
            "@" | "*" => !self.positional.is_empty(),
            _ => {
                if let Ok(n) = name.parse::<usize>() {
                    if n >= 1 {
                        return n <= self.positional.len();
                    }
                }
                if self.special_param(name).is_some() {
                    return true;
                }
                self.vars.is_set(name)
            }
        }
    }

    /// String value of any parameter: special, positional, or variable.
    pub fn param_string(&self, name: &str) -> Option<String> {
        if name == "@" || name == "*" {
            return Some(self.positional.join(" "));
        }
        if let Some(value) = self.special_param(name) {
            return Some(value);
        }
        self.vars.get_string(name)
    }

    /// Enter a function: push a frame and a variable scope, install new
    /// positional parameters.
    pub fn push_function(&mut self, name: &str, args: Vec<String>) {
        self.frames.push(CallFrame {
            name: name.to_string(),
            saved_positional: std::mem::replace(&mut self.positional, args),
        });
        self.vars.push_scope();
    }

    /// Leave a function: restore the caller's positionals, pop the scope.
    pub fn pop_function(&mut self) {
        if let Some(frame) = self.frames.pop() {
            self.positional = frame.saved_positional;
        }
        self.vars.pop_scope();
    }

    /// Child environment as "KEY=VALUE" strings.
    pub fn child_environ(&self) -> Vec<String> {
        self.vars
            .environ()
            .into_iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_depth_tracks_function_depth() {
        let mut state = ShellState::new();
        assert_eq!(state.vars.depth(), state.function_depth());
        state.push_function("f", vec!["a".into()]);
        assert_eq!(state.vars.depth(), state.function_depth());
        state.push_function("g", vec![]);
        assert_eq!(state.vars.depth(), state.function_depth());
        state.pop_function();
        state.pop_function();
        assert_eq!(state.vars.depth(), 0);
    }

    #[test]
    fn positional_params_restored_on_return() {
        let mut state = ShellState::new();
        state.positional = vec!["outer".into()];
        state.push_function("f", vec!["inner1".into(), "inner2".into()]);
        assert_eq!(state.param_string("1").as_deref(), Some("inner1"));
        assert_eq!(state.param_string("#").as_deref(), Some("2"));
        state.pop_function();
        assert_eq!(state.param_string("1").as_deref(), Some("outer"));
    }

    #[test]
    fn special_params() {
        let mut state = ShellState::new();
        state.last_status = 42;
        assert_eq!(state.param_string("?").as_deref(), Some("42"));
        assert_eq!(state.param_string("#").as_deref(), Some("0"));
        assert!(state.param_is_set("$"));
        assert!(!state.param_is_set("1"));
        state.positional = vec!["x".into()];
        assert!(state.param_is_set("1"));
    }

    #[test]
    fn random_is_dynamic_unless_assigned() {
        let mut state = ShellState::new();
        let a: i64 = state.param_string("RANDOM").unwrap().parse().unwrap();
        assert!((0..32768).contains(&a));
        state.vars.set_scalar("RANDOM", "7").unwrap();
        assert_eq!(state.param_string("RANDOM").as_deref(), Some("7"));
    }

    #[test]
    fn funcname_reflects_call_stack() {
        let mut state = ShellState::new();
        assert_eq!(state.param_string("FUNCNAME").as_deref(), Some(""));
        state.push_function("myfunc", vec![]);
        assert_eq!(state.param_string("FUNCNAME").as_deref(), Some("myfunc"));
        state.pop_function();
    }
}

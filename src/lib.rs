//! rush - a POSIX-compatible interactive shell
//!
//! This library provides the full execution pipeline of the shell:
//! input preprocessing, lexing, parsing, word expansion, and execution,
//! together with job control and the built-in command set.

pub mod ast;
pub mod builtins;
pub mod exec;
pub mod expand;
pub mod input;
pub mod jobs;
pub mod parser;
pub mod shell;
pub mod state;

pub use ast::types::*;
pub use exec::{ExecError, Executor};
pub use parser::{parse, ParseError, Parser};
pub use shell::{Shell, ShellConfig};
pub use state::ShellState;

/// Tests that rebind fds or fork share one process-wide fd table, so they
/// take this lock to run one at a time.
#[cfg(test)]
pub(crate) static TEST_FD_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

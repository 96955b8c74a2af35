//! history builtin

use crate::exec::error::ExecError;
use crate::exec::executor::Executor;
use crate::state::ShellState;

pub fn history(
    _exec: &mut Executor,
    state: &mut ShellState,
    argv: &[String],
) -> Result<i32, ExecError> {
    match argv.get(1).map(|a| a.as_str()) {
        Some("-c") => {
            state.history.clear();
            Ok(0)
        }
        Some("-w") => {
            state.history.save();
            Ok(0)
        }
        Some(count) if count.parse::<usize>().is_ok() => {
            let count: usize = count.parse().unwrap();
            let entries = state.history.entries();
            let start = entries.len().saturating_sub(count);
            for (i, entry) in entries.iter().enumerate().skip(start) {
                println!("{:5}  {}", i + 1, entry);
            }
            Ok(0)
        }
        Some(arg) => crate::builtins::usage("history", &format!("{}: invalid option", arg)),
        None => {
            for (i, entry) in state.history.entries().iter().enumerate() {
                println!("{:5}  {}", i + 1, entry);
            }
            Ok(0)
        }
    }
}

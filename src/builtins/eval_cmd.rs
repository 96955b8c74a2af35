//! eval builtin
//!
//! Joins its arguments with spaces, re-enters the parser, and executes the
//! result in the current shell context.

use crate::exec::error::ExecError;
use crate::exec::executor::Executor;
use crate::input::preprocess::strip_line_continuations;
use crate::state::ShellState;

pub fn eval(
    exec: &mut Executor,
    state: &mut ShellState,
    argv: &[String],
) -> Result<i32, ExecError> {
    let text = argv[1..].join(" ");
    if text.trim().is_empty() {
        return Ok(0);
    }

    let preprocessed = strip_line_continuations(&text);
    let script = match crate::parser::parse_with_aliases(&preprocessed, &state.aliases) {
        Ok(script) => script,
        Err(err) => {
            eprintln!("rush: eval: {}", err);
            return Ok(2);
        }
    };
    exec.run_script(state, &script)
}

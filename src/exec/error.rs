//! Execution errors and control-flow sentinels
//!
//! `break`, `continue` and `return` propagate as values in the executor's
//! error channel; loops and function invocations are the catch points.
//! Real errors follow the same path but surface to the driver, which maps
//! them to messages and exit statuses.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ExecError {
    /// `break n`: handled by the nth enclosing loop.
    #[error("break")]
    Break(u32),

    /// `continue n`.
    #[error("continue")]
    Continue(u32),

    /// `return n`: caught by function invocation or `source`.
    #[error("return")]
    Return(i32),

    /// `exit n`: unwinds to the driver (or `_exit`s a forked child).
    #[error("exit")]
    Exit(i32),

    /// Word expansion failed (`${x:?}`, nounset, bad arithmetic). In a
    /// non-interactive shell this terminates the script.
    #[error("{0}")]
    Expansion(String),

    /// A redirection could not be set up. Caught at the enclosing command,
    /// which fails with status 1 (errexit applies normally).
    #[error("{0}")]
    Redirect(String),

    /// SIGINT arrived while running a script.
    #[error("interrupted")]
    Interrupted,
}

impl ExecError {
    /// The `$?` value this error implies when it reaches the top level.
    pub fn status(&self) -> i32 {
        match self {
            ExecError::Break(_) | ExecError::Continue(_) => 0,
            ExecError::Return(code) | ExecError::Exit(code) => *code,
            ExecError::Expansion(_) | ExecError::Redirect(_) => 1,
            ExecError::Interrupted => 130,
        }
    }

    /// Control-flow sentinels are not user-visible errors.
    pub fn is_control_flow(&self) -> bool {
        matches!(
            self,
            ExecError::Break(_) | ExecError::Continue(_) | ExecError::Return(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses() {
        assert_eq!(ExecError::Exit(3).status(), 3);
        assert_eq!(ExecError::Expansion("x".into()).status(), 1);
        assert_eq!(ExecError::Interrupted.status(), 130);
    }

    #[test]
    fn control_flow_classification() {
        assert!(ExecError::Break(1).is_control_flow());
        assert!(ExecError::Return(0).is_control_flow());
        assert!(!ExecError::Exit(0).is_control_flow());
        assert!(!ExecError::Expansion("e".into()).is_control_flow());
    }
}

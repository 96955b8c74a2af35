//! Command substitution
//!
//! `$(…)` runs the inner script in a forked child of the current shell.
//! The child inherits variables, functions, aliases and options (a POSIX
//! subshell), writes to a pipe, and `_exit`s; the parent captures the
//! output and strips all trailing newlines at the call site.

use crate::ast::Script;
use crate::exec::error::ExecError;
use crate::exec::executor::Executor;
use crate::jobs::signals;
use crate::state::ShellState;
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{close, dup2, fork, pipe, read, ForkResult};
use std::os::fd::{AsRawFd, IntoRawFd};

/// Run the script in a forked subshell and capture its stdout.
pub fn capture(state: &mut ShellState, script: &Script) -> Result<String, ExecError> {
    let (read_end, write_end) =
        pipe().map_err(|e| ExecError::Expansion(format!("cannot create pipe: {}", e)))?;

    match unsafe { fork() } {
        Ok(ForkResult::Child) => {
            drop(read_end);
            let raw = write_end.into_raw_fd();
            let _ = dup2(raw, libc::STDOUT_FILENO);
            if raw != libc::STDOUT_FILENO {
                let _ = close(raw);
            }
            signals::reset_for_child();
            state.in_forked_child = true;

            let mut executor = Executor::new();
            let status = match executor.run_script(state, script) {
                Ok(status) => status,
                Err(err) => err.status(),
            };
            flush_and_exit(status);
        }
        Ok(ForkResult::Parent { child }) => {
            drop(write_end);
            let mut output = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                match read(read_end.as_raw_fd(), &mut buf) {
                    Ok(0) => break,
                    Ok(n) => output.extend_from_slice(&buf[..n]),
                    Err(nix::errno::Errno::EINTR) => continue,
                    Err(_) => break,
                }
            }
            drop(read_end);

            let status = loop {
                match waitpid(child, None) {
                    Ok(WaitStatus::Exited(_, code)) => break code,
                    Ok(WaitStatus::Signaled(_, sig, _)) => break 128 + sig as i32,
                    Err(nix::errno::Errno::EINTR) => continue,
                    Err(_) => break 1,
                    Ok(_) => continue,
                }
            };
            state.last_status = status;

            Ok(String::from_utf8_lossy(&output).into_owned())
        }
        Err(e) => Err(ExecError::Expansion(format!("fork failed: {}", e))),
    }
}

/// Flush buffered stdio and leave the forked child without running any
/// parent-side cleanup.
pub fn flush_and_exit(status: i32) -> ! {
    use std::io::Write;
    let _ = std::io::stdout().flush();
    let _ = std::io::stderr().flush();
    unsafe { libc::_exit(status & 0xff) }
}

//! Process substitution
//!
//! `<(cmd)` / `>(cmd)`: fork a child running `cmd` with its stdout (or
//! stdin) on a pipe, and hand the consumer a `/dev/fd/N` path naming the
//! parent's end. Where `/dev/fd` does not exist, a named pipe in a private
//! temp directory stands in. Children are reaped after the consuming
//! command finishes.

use crate::ast::types::ProcessSubDirection;
use crate::ast::Script;
use crate::exec::command_sub::flush_and_exit;
use crate::exec::error::ExecError;
use crate::exec::executor::Executor;
use crate::jobs::signals;
use crate::state::ShellState;
use nix::fcntl::{fcntl, FcntlArg, FdFlag};
use nix::sys::wait::waitpid;
use nix::unistd::{close, dup2, fork, pipe, ForkResult, Pid};
use std::os::fd::IntoRawFd;
use std::path::Path;

/// A live substitution: the parent's fd, the path given to the consumer,
/// and the producer pid to reap.
#[derive(Debug)]
pub struct ProcSubHandle {
    pub pid: Pid,
    /// Parent's end of the pipe; -1 when a FIFO is used instead.
    pub fd: i32,
    pub path: String,
    /// Keeps the FIFO directory alive until cleanup.
    fifo_dir: Option<tempfile::TempDir>,
}

/// Fork the producer and build the consumer-visible path.
pub fn setup(
    state: &mut ShellState,
    script: &Script,
    direction: ProcessSubDirection,
) -> Result<ProcSubHandle, ExecError> {
    if Path::new("/dev/fd").exists() {
        setup_dev_fd(state, script, direction)
    } else {
        setup_fifo(state, script, direction)
    }
}

fn setup_dev_fd(
    state: &mut ShellState,
    script: &Script,
    direction: ProcessSubDirection,
) -> Result<ProcSubHandle, ExecError> {
    let (read_end, write_end) =
        pipe().map_err(|e| ExecError::Expansion(format!("cannot create pipe: {}", e)))?;

    match unsafe { fork() } {
        Ok(ForkResult::Child) => {
            signals::reset_for_child();
            state.in_forked_child = true;
            let status = match direction {
                ProcessSubDirection::In => {
                    // Producer writes: stdout onto the pipe.
                    drop(read_end);
                    let raw = write_end.into_raw_fd();
                    let _ = dup2(raw, libc::STDOUT_FILENO);
                    if raw != libc::STDOUT_FILENO {
                        let _ = close(raw);
                    }
                    run_child(state, script)
                }
                ProcessSubDirection::Out => {
                    // Producer reads: stdin from the pipe.
                    drop(write_end);
                    let raw = read_end.into_raw_fd();
                    let _ = dup2(raw, libc::STDIN_FILENO);
                    if raw != libc::STDIN_FILENO {
                        let _ = close(raw);
                    }
                    run_child(state, script)
                }
            };
            flush_and_exit(status);
        }
        Ok(ForkResult::Parent { child }) => {
            let keep = match direction {
                ProcessSubDirection::In => {
                    drop(write_end);
                    read_end.into_raw_fd()
                }
                ProcessSubDirection::Out => {
                    drop(read_end);
                    write_end.into_raw_fd()
                }
            };
            // The fd must survive exec so /dev/fd/N works for children.
            let _ = fcntl(keep, FcntlArg::F_SETFD(FdFlag::empty()));
            Ok(ProcSubHandle {
                pid: child,
                fd: keep,
                path: format!("/dev/fd/{}", keep),
                fifo_dir: None,
            })
        }
        Err(e) => Err(ExecError::Expansion(format!("fork failed: {}", e))),
    }
}

fn setup_fifo(
    state: &mut ShellState,
    script: &Script,
    direction: ProcessSubDirection,
) -> Result<ProcSubHandle, ExecError> {
    let dir = tempfile::tempdir()
        .map_err(|e| ExecError::Expansion(format!("cannot create fifo dir: {}", e)))?;
    let path = dir.path().join("psub");
    nix::unistd::mkfifo(&path, nix::sys::stat::Mode::from_bits_truncate(0o600))
        .map_err(|e| ExecError::Expansion(format!("cannot create fifo: {}", e)))?;

    match unsafe { fork() } {
        Ok(ForkResult::Child) => {
            signals::reset_for_child();
            state.in_forked_child = true;
            // Opening the FIFO blocks until the consumer opens it too.
            let status = match direction {
                ProcessSubDirection::In => match std::fs::OpenOptions::new().write(true).open(&path)
                {
                    Ok(file) => {
                        use std::os::fd::AsRawFd;
                        let _ = dup2(file.as_raw_fd(), libc::STDOUT_FILENO);
                        run_child(state, script)
                    }
                    Err(_) => 1,
                },
                ProcessSubDirection::Out => match std::fs::OpenOptions::new().read(true).open(&path)
                {
                    Ok(file) => {
                        use std::os::fd::AsRawFd;
                        let _ = dup2(file.as_raw_fd(), libc::STDIN_FILENO);
                        run_child(state, script)
                    }
                    Err(_) => 1,
                },
            };
            flush_and_exit(status);
        }
        Ok(ForkResult::Parent { child }) => Ok(ProcSubHandle {
            pid: child,
            fd: -1,
            path: path.to_string_lossy().into_owned(),
            fifo_dir: Some(dir),
        }),
        Err(e) => Err(ExecError::Expansion(format!("fork failed: {}", e))),
    }
}

fn run_child(state: &mut ShellState, script: &Script) -> i32 {
    let mut executor = Executor::new();
    match executor.run_script(state, script) {
        Ok(status) => status,
        Err(err) => err.status(),
    }
}

/// Close the parent's ends and reap the producers; called after the
/// consuming command completes.
pub fn reap(handles: Vec<ProcSubHandle>) {
    for handle in handles {
        if handle.fd >= 0 {
            let _ = close(handle.fd);
        }
        let _ = waitpid(handle.pid, None);
        drop(handle.fifo_dir);
    }
}

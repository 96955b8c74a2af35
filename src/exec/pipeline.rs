//! Pipeline execution
//!
//! A multi-stage pipeline forks one child per command, all sharing a
//! process group led by the first child. Children wire their stdin/stdout
//! to the pipe ends, close every pipe fd, execute their command in-process
//! and `_exit`. The parent closes its ends, hands the terminal to the
//! job's group when foreground, waits for every member, and computes the
//! status (last stage, or the rightmost failure under pipefail).

use crate::ast::types::{Command, Pipeline};
use crate::exec::command_sub::flush_and_exit;
use crate::exec::error::ExecError;
use crate::exec::executor::Executor;
use crate::jobs::signals;
use crate::state::ShellState;
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{dup2, fork, pipe, ForkResult, Pid};
use std::os::fd::{AsRawFd, OwnedFd};
use std::time::Instant;

impl Executor {
    pub(crate) fn run_pipeline(
        &mut self,
        state: &mut ShellState,
        pipeline: &Pipeline,
    ) -> Result<i32, ExecError> {
        let timer = pipeline.timed.then(TimeReport::start);

        let mut status = if pipeline.commands.is_empty() {
            // `time` with no command reports zero times.
            0
        } else if pipeline.commands.len() == 1 {
            let status = self.run_command_in_shell(state, &pipeline.commands[0])?;
            state.pipe_statuses = vec![status];
            status
        } else {
            self.run_stages(state, &pipeline.commands)?
        };

        if let Some(timer) = timer {
            timer.report(pipeline.time_posix);
        }

        if pipeline.negated {
            status = if status == 0 { 1 } else { 0 };
        }

        if signals::take_sigint() && !state.interactive {
            state.last_status = status;
            return Err(ExecError::Interrupted);
        }

        Ok(status)
    }

    fn run_stages(
        &mut self,
        state: &mut ShellState,
        commands: &[Command],
    ) -> Result<i32, ExecError> {
        let n = commands.len();
        let mut pipes: Vec<(OwnedFd, OwnedFd)> = Vec::with_capacity(n - 1);
        for _ in 0..n - 1 {
            pipes.push(
                pipe().map_err(|e| ExecError::Expansion(format!("cannot create pipe: {}", e)))?,
            );
        }

        let job_control = state.interactive && !state.in_forked_child;
        let mut pids: Vec<Pid> = Vec::with_capacity(n);
        let mut pgid: Option<Pid> = None;

        for (i, command) in commands.iter().enumerate() {
            match unsafe { fork() } {
                Ok(ForkResult::Child) => {
                    signals::reset_for_child();
                    if job_control {
                        let target = pgid.map(|p| p.as_raw()).unwrap_or(0);
                        let _ = nix::unistd::setpgid(Pid::from_raw(0), Pid::from_raw(target));
                    }

                    if i > 0 {
                        let _ = dup2(pipes[i - 1].0.as_raw_fd(), libc::STDIN_FILENO);
                    }
                    if i < n - 1 {
                        let _ = dup2(pipes[i].1.as_raw_fd(), libc::STDOUT_FILENO);
                    }
                    drop(pipes);

                    state.in_forked_child = true;
                    state.interactive = false;
                    state.loop_depth = 0;
                    let status = match self.run_command_in_shell(state, command) {
                        Ok(status) => status,
                        Err(err) => err.status(),
                    };
                    flush_and_exit(status);
                }
                Ok(ForkResult::Parent { child }) => {
                    if job_control {
                        let group = pgid.unwrap_or(child);
                        let _ = nix::unistd::setpgid(child, group);
                    }
                    if pgid.is_none() {
                        pgid = Some(child);
                    }
                    pids.push(child);
                }
                Err(e) => {
                    drop(pipes);
                    for pid in &pids {
                        let _ = waitpid(*pid, None);
                    }
                    eprintln!("rush: fork failed: {}", e);
                    return Ok(1);
                }
            }
        }

        // The parent keeps no pipe ends open.
        drop(pipes);

        if job_control {
            if let Some(pgid) = pgid {
                signals::give_terminal_to(pgid);
            }
        }

        let mut statuses = Vec::with_capacity(n);
        for pid in &pids {
            statuses.push(wait_member(*pid));
        }

        if job_control {
            signals::reclaim_terminal();
        }

        state.pipe_statuses = statuses.clone();
        let status = if state.options.pipefail {
            statuses.iter().rev().find(|s| **s != 0).copied().unwrap_or(0)
        } else {
            *statuses.last().unwrap_or(&0)
        };
        Ok(status)
    }
}

fn wait_member(pid: Pid) -> i32 {
    loop {
        match waitpid(pid, None) {
            Ok(WaitStatus::Exited(_, code)) => return code,
            Ok(WaitStatus::Signaled(_, sig, _)) => return 128 + sig as i32,
            Err(nix::errno::Errno::EINTR) => continue,
            Err(_) => return 1,
            Ok(_) => continue,
        }
    }
}

/// Wall-clock plus child cpu time accounting for the `time` prefix.
struct TimeReport {
    wall: Instant,
    tms: libc::tms,
    ticks_per_sec: i64,
}

impl TimeReport {
    fn start() -> Self {
        let mut tms = unsafe { std::mem::zeroed::<libc::tms>() };
        unsafe {
            libc::times(&mut tms);
        }
        Self {
            wall: Instant::now(),
            tms,
            ticks_per_sec: unsafe { libc::sysconf(libc::_SC_CLK_TCK) }.max(1),
        }
    }

    fn report(self, posix: bool) {
        let mut end = unsafe { std::mem::zeroed::<libc::tms>() };
        unsafe {
            libc::times(&mut end);
        }
        let real = self.wall.elapsed().as_secs_f64();
        let per_sec = self.ticks_per_sec as f64;
        let user = (end.tms_cutime - self.tms.tms_cutime + end.tms_utime - self.tms.tms_utime)
            as f64
            / per_sec;
        let sys = (end.tms_cstime - self.tms.tms_cstime + end.tms_stime - self.tms.tms_stime)
            as f64
            / per_sec;

        if posix {
            eprintln!("real {:.2}\nuser {:.2}\nsys {:.2}", real, user, sys);
        } else {
            eprintln!(
                "\nreal\t{}\nuser\t{}\nsys\t{}",
                format_duration(real),
                format_duration(user),
                format_duration(sys)
            );
        }
    }
}

fn format_duration(seconds: f64) -> String {
    let minutes = (seconds / 60.0) as u64;
    let rest = seconds - (minutes as f64) * 60.0;
    format!("{}m{:.3}s", minutes, rest)
}

//! Job-control builtins: jobs, fg, bg, wait, kill

use crate::exec::error::ExecError;
use crate::exec::executor::Executor;
use crate::jobs::signals;
use crate::jobs::{JobState, ProcessState};
use crate::state::ShellState;
use nix::sys::signal::{killpg, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;

pub fn jobs(
    _exec: &mut Executor,
    state: &mut ShellState,
    _argv: &[String],
) -> Result<i32, ExecError> {
    state.jobs.reap();
    print!("{}", state.jobs.listing());
    Ok(0)
}

pub fn fg(
    _exec: &mut Executor,
    state: &mut ShellState,
    argv: &[String],
) -> Result<i32, ExecError> {
    let spec = argv.get(1).map(|s| s.as_str()).unwrap_or("%+");
    let Some(id) = state.jobs.resolve_spec(spec) else {
        eprintln!("rush: fg: {}: no such job", spec);
        return Ok(1);
    };
    let (pgid, pids, command) = {
        let job = state.jobs.get(id).unwrap();
        (
            job.pgid,
            job.pids.iter().map(|(p, _)| *p).collect::<Vec<_>>(),
            job.command.clone(),
        )
    };

    eprintln!("{}", command);
    if state.interactive {
        signals::give_terminal_to(pgid);
    }
    let _ = killpg(pgid, Signal::SIGCONT);

    let mut status = 0;
    for pid in pids {
        status = wait_one(state, pid);
    }
    if state.interactive {
        signals::reclaim_terminal();
    }
    state.jobs.remove(id);
    Ok(status)
}

pub fn bg(
    _exec: &mut Executor,
    state: &mut ShellState,
    argv: &[String],
) -> Result<i32, ExecError> {
    let spec = argv.get(1).map(|s| s.as_str()).unwrap_or("%+");
    let Some(id) = state.jobs.resolve_spec(spec) else {
        eprintln!("rush: bg: {}: no such job", spec);
        return Ok(1);
    };
    let (pgid, command) = {
        let job = state.jobs.get(id).unwrap();
        (job.pgid, job.command.clone())
    };
    let _ = killpg(pgid, Signal::SIGCONT);
    if let Some(job) = state.jobs.get_mut(id) {
        for (_, proc_state) in &mut job.pids {
            if *proc_state == ProcessState::Stopped {
                *proc_state = ProcessState::Running;
            }
        }
        job.notified = JobState::Running;
    }
    eprintln!("[{}]+ {} &", id, command);
    Ok(0)
}

pub fn wait(
    _exec: &mut Executor,
    state: &mut ShellState,
    argv: &[String],
) -> Result<i32, ExecError> {
    if argv.len() == 1 {
        // Wait for every known job.
        let ids: Vec<usize> = state.jobs.iter().map(|j| j.id).collect();
        let mut status = 0;
        for id in ids {
            let pids: Vec<Pid> = state
                .jobs
                .get(id)
                .map(|j| j.pids.iter().map(|(p, _)| *p).collect())
                .unwrap_or_default();
            for pid in pids {
                status = wait_one(state, pid);
            }
            state.jobs.remove(id);
        }
        return Ok(status);
    }

    let mut status = 0;
    for arg in &argv[1..] {
        if arg.starts_with('%') {
            let Some(id) = state.jobs.resolve_spec(arg) else {
                eprintln!("rush: wait: {}: no such job", arg);
                status = 127;
                continue;
            };
            let pids: Vec<Pid> = state
                .jobs
                .get(id)
                .map(|j| j.pids.iter().map(|(p, _)| *p).collect())
                .unwrap_or_default();
            for pid in pids {
                status = wait_one(state, pid);
            }
            state.jobs.remove(id);
        } else {
            match arg.parse::<i32>() {
                Ok(pid) => status = wait_one(state, Pid::from_raw(pid)),
                Err(_) => {
                    eprintln!("rush: wait: {}: not a pid or valid job spec", arg);
                    status = 2;
                }
            }
        }
    }
    Ok(status)
}

pub fn kill(
    _exec: &mut Executor,
    state: &mut ShellState,
    argv: &[String],
) -> Result<i32, ExecError> {
    let mut signal = Signal::SIGTERM;
    let mut targets: Vec<&String> = Vec::new();

    let mut i = 1;
    while i < argv.len() {
        let arg = argv[i].as_str();
        match arg {
            "-l" => {
                for sig in Signal::iterator() {
                    println!("{:2}) {}", sig as i32, sig.as_str());
                }
                return Ok(0);
            }
            "-s" => {
                i += 1;
                match argv.get(i).and_then(|s| crate::builtins::trap_cmd::parse_signal(s)) {
                    Some(n) if n > 0 => match Signal::try_from(n) {
                        Ok(sig) => signal = sig,
                        Err(_) => return crate::builtins::usage("kill", "invalid signal"),
                    },
                    _ => return crate::builtins::usage("kill", "invalid signal"),
                }
            }
            _ if arg.starts_with('-') && arg.len() > 1 => {
                match crate::builtins::trap_cmd::parse_signal(&arg[1..]) {
                    Some(n) if n > 0 => match Signal::try_from(n) {
                        Ok(sig) => signal = sig,
                        Err(_) => {
                            eprintln!("rush: kill: {}: invalid signal specification", arg);
                            return Ok(1);
                        }
                    },
                    _ => {
                        eprintln!("rush: kill: {}: invalid signal specification", arg);
                        return Ok(1);
                    }
                }
            }
            _ => targets.push(&argv[i]),
        }
        i += 1;
    }

    let mut status = 0;
    for target in targets {
        if target.starts_with('%') {
            let Some(id) = state.jobs.resolve_spec(target) else {
                eprintln!("rush: kill: {}: no such job", target);
                status = 1;
                continue;
            };
            let pgid = state.jobs.get(id).unwrap().pgid;
            if killpg(pgid, signal).is_err() {
                eprintln!("rush: kill: ({}) - No such process", pgid);
                status = 1;
            }
        } else {
            match target.parse::<i32>() {
                Ok(pid) => {
                    if nix::sys::signal::kill(Pid::from_raw(pid), signal).is_err() {
                        eprintln!("rush: kill: ({}) - No such process", pid);
                        status = 1;
                    }
                }
                Err(_) => {
                    eprintln!("rush: kill: {}: arguments must be process or job IDs", target);
                    status = 1;
                }
            }
        }
    }
    Ok(status)
}

fn wait_one(state: &mut ShellState, pid: Pid) -> i32 {
    loop {
        match waitpid(pid, Some(WaitPidFlag::WUNTRACED)) {
            Ok(WaitStatus::Exited(_, code)) => {
                state.jobs.update_pid(pid, ProcessState::Exited(code));
                return code;
            }
            Ok(WaitStatus::Signaled(_, sig, _)) => {
                state.jobs.update_pid(pid, ProcessState::Signaled(sig as i32));
                return 128 + sig as i32;
            }
            Ok(WaitStatus::Stopped(_, _)) => {
                state.jobs.update_pid(pid, ProcessState::Stopped);
                return 128 + Signal::SIGTSTP as i32;
            }
            Err(nix::errno::Errno::EINTR) => continue,
            Err(_) => return 127,
            Ok(_) => continue,
        }
    }
}

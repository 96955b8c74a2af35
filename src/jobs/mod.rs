//! Job control
//!
//! The job table tracks every background or stopped process group: one
//! entry per pipeline, with per-process states, a current (`%+`) and
//! previous (`%-`) job, creation messages (`[id] pid`), and state-change
//! notifications printed before the next prompt. Only the shell process
//! mutates the table, in response to `waitpid` results.

pub mod signals;

use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Running,
    Stopped,
    Exited(i32),
    /// Killed by this signal number.
    Signaled(i32),
}

impl ProcessState {
    pub fn is_finished(self) -> bool {
        matches!(self, ProcessState::Exited(_) | ProcessState::Signaled(_))
    }

    /// Shell status encoding: 128+N for signal deaths.
    pub fn status_code(self) -> i32 {
        match self {
            ProcessState::Exited(code) => code,
            ProcessState::Signaled(sig) => 128 + sig,
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Running,
    Stopped,
    Done(i32),
    Terminated(i32),
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Running => write!(f, "Running"),
            JobState::Stopped => write!(f, "Stopped"),
            JobState::Done(0) => write!(f, "Done"),
            JobState::Done(code) => write!(f, "Exit {}", code),
            JobState::Terminated(sig) => write!(f, "Terminated({})", sig),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Job {
    pub id: usize,
    pub pgid: Pid,
    /// Pipeline members in order; the last one's status is the job status.
    pub pids: Vec<(Pid, ProcessState)>,
    pub command: String,
    /// State already reported to the user.
    pub notified: JobState,
}

impl Job {
    pub fn state(&self) -> JobState {
        if self.pids.iter().any(|(_, s)| *s == ProcessState::Stopped) {
            return JobState::Stopped;
        }
        if self.pids.iter().all(|(_, s)| s.is_finished()) {
            let last = self.pids.last().map(|(_, s)| *s).unwrap_or(ProcessState::Exited(0));
            return match last {
                ProcessState::Signaled(sig) => JobState::Terminated(sig),
                other => JobState::Done(other.status_code()),
            };
        }
        JobState::Running
    }

    pub fn last_pid(&self) -> Option<Pid> {
        self.pids.last().map(|(pid, _)| *pid)
    }
}

#[derive(Debug, Clone, Default)]
pub struct JobTable {
    jobs: Vec<Job>,
    next_id: usize,
    current: Option<usize>,
    previous: Option<usize>,
}

impl JobTable {
    pub fn new() -> Self {
        Self {
            jobs: Vec::new(),
            next_id: 1,
            current: None,
            previous: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Job> {
        self.jobs.iter()
    }

    /// Register a new job; returns its id.
    pub fn add(&mut self, pgid: Pid, pids: Vec<Pid>, command: String) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        self.jobs.push(Job {
            id,
            pgid,
            pids: pids.into_iter().map(|p| (p, ProcessState::Running)).collect(),
            command,
            notified: JobState::Running,
        });
        self.previous = self.current;
        self.current = Some(id);
        id
    }

    pub fn get(&self, id: usize) -> Option<&Job> {
        self.jobs.iter().find(|j| j.id == id)
    }

    pub fn get_mut(&mut self, id: usize) -> Option<&mut Job> {
        self.jobs.iter_mut().find(|j| j.id == id)
    }

    pub fn current_id(&self) -> Option<usize> {
        self.current
    }

    /// Resolve `%1`, `%+`/`%%`, `%-`, `%name`, or a bare number.
    pub fn resolve_spec(&self, spec: &str) -> Option<usize> {
        let body = spec.strip_prefix('%').unwrap_or(spec);
        match body {
            "" | "+" | "%" => self.current,
            "-" => self.previous.or(self.current),
            _ => {
                if let Ok(n) = body.parse::<usize>() {
                    return self.get(n).map(|j| j.id);
                }
                self.jobs
                    .iter()
                    .find(|j| j.command.starts_with(body))
                    .map(|j| j.id)
            }
        }
    }

    /// Record a wait status for whichever job owns this pid.
    pub fn update_pid(&mut self, pid: Pid, state: ProcessState) {
        for job in &mut self.jobs {
            for (p, s) in &mut job.pids {
                if *p == pid {
                    *s = state;
                    return;
                }
            }
        }
    }

    /// Non-blocking sweep of dead children; updates job states.
    pub fn reap(&mut self) {
        loop {
            match waitpid(
                Pid::from_raw(-1),
                Some(WaitPidFlag::WNOHANG | WaitPidFlag::WUNTRACED | WaitPidFlag::WCONTINUED),
            ) {
                Ok(WaitStatus::Exited(pid, code)) => {
                    self.update_pid(pid, ProcessState::Exited(code));
                }
                Ok(WaitStatus::Signaled(pid, sig, _)) => {
                    self.update_pid(pid, ProcessState::Signaled(sig as i32));
                }
                Ok(WaitStatus::Stopped(pid, _)) => {
                    self.update_pid(pid, ProcessState::Stopped);
                }
                Ok(WaitStatus::Continued(pid)) => {
                    self.update_pid(pid, ProcessState::Running);
                }
                Ok(WaitStatus::StillAlive) | Err(_) => break,
                Ok(_) => {}
            }
        }
    }

    /// Report state changes (Done / Stopped / Terminated) and drop finished
    /// jobs; called just before a prompt is printed.
    pub fn notify_changes(&mut self) {
        let mut finished = Vec::new();
        for job in &mut self.jobs {
            let state = job.state();
            if state != job.notified {
                eprintln!("[{}]  {}                 {}", job.id, state, job.command);
                job.notified = state;
            }
            if matches!(state, JobState::Done(_) | JobState::Terminated(_)) {
                finished.push(job.id);
            }
        }
        for id in finished {
            self.remove(id);
        }
    }

    pub fn remove(&mut self, id: usize) {
        self.jobs.retain(|j| j.id != id);
        if self.current == Some(id) {
            self.current = self.previous.filter(|p| self.get(*p).is_some());
            self.previous = None;
        }
        if self.previous == Some(id) {
            self.previous = None;
        }
        if self.current.is_none() {
            self.current = self.jobs.last().map(|j| j.id);
        }
    }

    /// `jobs` builtin listing.
    pub fn listing(&self) -> String {
        let mut out = String::new();
        for job in &self.jobs {
            let marker = if Some(job.id) == self.current {
                '+'
            } else if Some(job.id) == self.previous {
                '-'
            } else {
                ' '
            };
            out.push_str(&format!(
                "[{}]{} {}                 {}\n",
                job.id,
                marker,
                job.state(),
                job.command
            ));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_with_two_jobs() -> JobTable {
        let mut t = JobTable::new();
        t.add(Pid::from_raw(100), vec![Pid::from_raw(100)], "sleep 10".into());
        t.add(
            Pid::from_raw(200),
            vec![Pid::from_raw(200), Pid::from_raw(201)],
            "a | b".into(),
        );
        t
    }

    #[test]
    fn ids_are_sequential_and_current_tracks_latest() {
        let t = table_with_two_jobs();
        assert_eq!(t.get(1).unwrap().command, "sleep 10");
        assert_eq!(t.get(2).unwrap().command, "a | b");
        assert_eq!(t.current_id(), Some(2));
    }

    #[test]
    fn resolves_specs() {
        let t = table_with_two_jobs();
        assert_eq!(t.resolve_spec("%1"), Some(1));
        assert_eq!(t.resolve_spec("%+"), Some(2));
        assert_eq!(t.resolve_spec("%%"), Some(2));
        assert_eq!(t.resolve_spec("%-"), Some(1));
        assert_eq!(t.resolve_spec("%sleep"), Some(1));
        assert_eq!(t.resolve_spec("2"), Some(2));
        assert_eq!(t.resolve_spec("%9"), None);
    }

    #[test]
    fn job_state_follows_member_processes() {
        let mut t = table_with_two_jobs();
        t.update_pid(Pid::from_raw(200), ProcessState::Exited(0));
        assert_eq!(t.get(2).unwrap().state(), JobState::Running);
        t.update_pid(Pid::from_raw(201), ProcessState::Exited(3));
        assert_eq!(t.get(2).unwrap().state(), JobState::Done(3));
    }

    #[test]
    fn terminated_state_reports_signal() {
        let mut t = table_with_two_jobs();
        t.update_pid(Pid::from_raw(100), ProcessState::Signaled(15));
        assert_eq!(t.get(1).unwrap().state(), JobState::Terminated(15));
        assert_eq!(ProcessState::Signaled(15).status_code(), 143);
    }

    #[test]
    fn stopped_wins_over_running() {
        let mut t = table_with_two_jobs();
        t.update_pid(Pid::from_raw(201), ProcessState::Stopped);
        assert_eq!(t.get(2).unwrap().state(), JobState::Stopped);
    }

    #[test]
    fn remove_reassigns_current() {
        let mut t = table_with_two_jobs();
        t.remove(2);
        assert_eq!(t.resolve_spec("%+"), Some(1));
        t.remove(1);
        assert!(t.is_empty());
        assert_eq!(t.resolve_spec("%+"), None);
    }
}

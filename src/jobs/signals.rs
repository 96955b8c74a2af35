//! Signal handling
//!
//! The shell keeps SIGINT on a flag-setting handler so a Ctrl-C interrupts
//! the foreground job without killing the shell, ignores the job-control
//! stop signals while interactive, and records trapped signals for dispatch
//! between commands. Children always reset to default dispositions before
//! exec.

use nix::sys::signal::{self, SigHandler, Signal};
use nix::unistd::Pid;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

static SIGINT_FLAG: AtomicBool = AtomicBool::new(false);
/// Bitmask of pending trapped signals (signal numbers 1..=63).
static PENDING_TRAPS: AtomicU64 = AtomicU64::new(0);

extern "C" fn on_sigint(_sig: libc::c_int) {
    SIGINT_FLAG.store(true, Ordering::SeqCst);
}

extern "C" fn on_trapped(sig: libc::c_int) {
    if (1..64).contains(&sig) {
        PENDING_TRAPS.fetch_or(1 << sig, Ordering::SeqCst);
    }
}

/// True once per received SIGINT.
pub fn take_sigint() -> bool {
    SIGINT_FLAG.swap(false, Ordering::SeqCst)
}

pub fn clear_sigint() {
    SIGINT_FLAG.store(false, Ordering::SeqCst);
}

/// Drain the set of trapped signals that fired since the last call.
pub fn take_pending_traps() -> Vec<i32> {
    let bits = PENDING_TRAPS.swap(0, Ordering::SeqCst);
    (1..64).filter(|sig| bits & (1 << sig) != 0).collect()
}

/// Install the shell's own handlers. The stop signals are ignored only in
/// interactive mode, where the shell must survive terminal takeovers.
pub fn install_shell_handlers(interactive: bool) {
    unsafe {
        let _ = signal::signal(Signal::SIGINT, SigHandler::Handler(on_sigint));
        if interactive {
            let _ = signal::signal(Signal::SIGQUIT, SigHandler::SigIgn);
            let _ = signal::signal(Signal::SIGTSTP, SigHandler::SigIgn);
            let _ = signal::signal(Signal::SIGTTIN, SigHandler::SigIgn);
            let _ = signal::signal(Signal::SIGTTOU, SigHandler::SigIgn);
        }
    }
}

/// Route a signal to the trap recorder.
pub fn install_trap_handler(sig: Signal) {
    unsafe {
        let _ = signal::signal(sig, SigHandler::Handler(on_trapped));
    }
}

/// Ignore a signal (trap '' SIG).
pub fn ignore_signal(sig: Signal) {
    unsafe {
        let _ = signal::signal(sig, SigHandler::SigIgn);
    }
}

/// Restore the default disposition (trap - SIG), except SIGINT which goes
/// back to the shell handler.
pub fn reset_trap(sig: Signal) {
    unsafe {
        if sig == Signal::SIGINT {
            let _ = signal::signal(Signal::SIGINT, SigHandler::Handler(on_sigint));
        } else {
            let _ = signal::signal(sig, SigHandler::SigDfl);
        }
    }
}

/// Called in forked children before exec or in-process execution: every
/// disposition back to default so the child behaves like a plain process.
pub fn reset_for_child() {
    unsafe {
        for sig in [
            Signal::SIGINT,
            Signal::SIGQUIT,
            Signal::SIGTSTP,
            Signal::SIGTTIN,
            Signal::SIGTTOU,
            Signal::SIGTERM,
            Signal::SIGHUP,
            Signal::SIGPIPE,
        ] {
            let _ = signal::signal(sig, SigHandler::SigDfl);
        }
    }
}

/// Hand the controlling terminal to a process group; no-op off a tty. The
/// shell ignores SIGTTOU, so the call cannot stop us.
pub fn give_terminal_to(pgid: Pid) {
    let _ = nix::unistd::tcsetpgrp(std::io::stdin(), pgid);
}

/// Reclaim the terminal for the shell after a foreground job finishes.
pub fn reclaim_terminal() {
    let _ = nix::unistd::tcsetpgrp(std::io::stdin(), nix::unistd::getpgrp());
}

/// Is stdin a terminal we can do job control on?
pub fn stdin_is_tty() -> bool {
    nix::unistd::isatty(libc::STDIN_FILENO).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sigint_flag_is_one_shot() {
        clear_sigint();
        assert!(!take_sigint());
        SIGINT_FLAG.store(true, Ordering::SeqCst);
        assert!(take_sigint());
        assert!(!take_sigint());
    }

    #[test]
    fn pending_traps_drain() {
        PENDING_TRAPS.store(0, Ordering::SeqCst);
        on_trapped(10);
        on_trapped(12);
        let pending = take_pending_traps();
        assert_eq!(pending, vec![10, 12]);
        assert!(take_pending_traps().is_empty());
    }
}

//! trap builtin
//!
//! Installs user actions for signals, run as if by `eval` between
//! commands. `trap ''` ignores, `trap -` resets, no arguments lists. The
//! pseudo-signal EXIT (0) runs when the shell terminates.

use crate::exec::error::ExecError;
use crate::exec::executor::Executor;
use crate::jobs::signals;
use crate::state::{ShellState, TrapAction};
use nix::sys::signal::Signal;

pub fn trap(
    _exec: &mut Executor,
    state: &mut ShellState,
    argv: &[String],
) -> Result<i32, ExecError> {
    let mut args = &argv[1..];
    if args.first().map(|a| a.as_str()) == Some("--") {
        args = &args[1..];
    }

    if args.is_empty() || args[0] == "-p" {
        for (sig, action) in &state.traps {
            let text = match action {
                TrapAction::Command(text) => text.clone(),
                TrapAction::Ignore => String::new(),
            };
            println!("trap -- '{}' {}", text, signal_name(*sig));
        }
        return Ok(0);
    }

    if args.len() == 1 && args[0] == "-l" {
        for sig in Signal::iterator() {
            println!("{:2}) {}", sig as i32, sig.as_str());
        }
        return Ok(0);
    }

    // First argument is the action unless it parses as a signal itself
    // (then it means reset, per POSIX).
    let (action_text, signal_args) = if parse_signal(&args[0]).is_some() {
        (None, args)
    } else {
        (Some(args[0].clone()), &args[1..])
    };

    if signal_args.is_empty() {
        return crate::builtins::usage("trap", "usage: trap [action] signal…");
    }

    let mut status = 0;
    for spec in signal_args {
        let Some(sig) = parse_signal(spec) else {
            eprintln!("rush: trap: {}: invalid signal specification", spec);
            status = 1;
            continue;
        };

        match action_text.as_deref() {
            None | Some("-") => {
                state.traps.remove(&sig);
                if let Some(signal) = to_signal(sig) {
                    signals::reset_trap(signal);
                }
            }
            Some("") => {
                state.traps.insert(sig, TrapAction::Ignore);
                if let Some(signal) = to_signal(sig) {
                    signals::ignore_signal(signal);
                }
            }
            Some(text) => {
                state.traps.insert(sig, TrapAction::Command(text.to_string()));
                if let Some(signal) = to_signal(sig) {
                    signals::install_trap_handler(signal);
                }
            }
        }
    }
    Ok(status)
}

/// Signal number from a number, name, or name without the SIG prefix.
/// 0 / EXIT is the exit trap.
pub fn parse_signal(spec: &str) -> Option<i32> {
    if let Ok(n) = spec.parse::<i32>() {
        return (0..64).contains(&n).then_some(n);
    }
    let upper = spec.to_uppercase();
    if upper == "EXIT" {
        return Some(0);
    }
    let name = if upper.starts_with("SIG") {
        upper.clone()
    } else {
        format!("SIG{}", upper)
    };
    name.parse::<Signal>().ok().map(|s| s as i32)
}

fn to_signal(sig: i32) -> Option<Signal> {
    if sig == 0 {
        return None;
    }
    Signal::try_from(sig).ok()
}

fn signal_name(sig: i32) -> String {
    if sig == 0 {
        return "EXIT".to_string();
    }
    Signal::try_from(sig)
        .map(|s| s.as_str().to_string())
        .unwrap_or_else(|_| sig.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_signal_specs() {
        assert_eq!(parse_signal("2"), Some(2));
        assert_eq!(parse_signal("INT"), Some(2));
        assert_eq!(parse_signal("SIGINT"), Some(2));
        assert_eq!(parse_signal("int"), Some(2));
        assert_eq!(parse_signal("EXIT"), Some(0));
        assert_eq!(parse_signal("0"), Some(0));
        assert_eq!(parse_signal("NOSUCH"), None);
    }
}

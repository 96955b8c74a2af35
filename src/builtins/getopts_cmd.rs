//! getopts builtin
//!
//! POSIX option parsing over the positional parameters (or explicit
//! arguments), driven by OPTIND. Sets the named variable and OPTARG;
//! a leading `:` in the optstring selects silent error reporting.

use crate::exec::error::ExecError;
use crate::exec::executor::Executor;
use crate::state::ShellState;

pub fn getopts(
    _exec: &mut Executor,
    state: &mut ShellState,
    argv: &[String],
) -> Result<i32, ExecError> {
    let (optstring, var) = match (argv.get(1), argv.get(2)) {
        (Some(optstring), Some(var)) => (optstring.clone(), var.clone()),
        _ => return crate::builtins::usage("getopts", "usage: getopts optstring name [args]"),
    };

    let args: Vec<String> = if argv.len() > 3 {
        argv[3..].to_vec()
    } else {
        state.positional.clone()
    };

    let silent = optstring.starts_with(':');
    let optstring = optstring.trim_start_matches(':');

    let set = |state: &mut ShellState, name: &str, value: &str| {
        state
            .vars
            .set_scalar(name, value)
            .map_err(|e| ExecError::Expansion(e.to_string()))
    };

    // OPTIND is 1-based; the sub-index within a clustered option group is
    // carried in a shell-private variable.
    let mut optind: usize = state
        .vars
        .get_string("OPTIND")
        .and_then(|s| s.parse().ok())
        .unwrap_or(1);
    let mut subindex: usize = state
        .vars
        .get_string("_RUSH_OPTPOS")
        .and_then(|s| s.parse().ok())
        .unwrap_or(1);

    let done = |state: &mut ShellState, optind: usize| -> Result<i32, ExecError> {
        set(state, var.as_str(), "?")?;
        let _ = state.vars.unset("OPTARG");
        set(state, "OPTIND", &optind.to_string())?;
        let _ = state.vars.set_scalar("_RUSH_OPTPOS", "1");
        Ok(1)
    };

    loop {
        let Some(word) = args.get(optind - 1) else {
            return done(state, optind);
        };
        if word == "--" {
            return done(state, optind + 1);
        }
        if !word.starts_with('-') || word == "-" {
            return done(state, optind);
        }

        let chars: Vec<char> = word.chars().collect();
        if subindex >= chars.len() {
            optind += 1;
            subindex = 1;
            continue;
        }
        let opt = chars[subindex];

        let spec_pos = optstring.find(opt);
        let takes_arg = spec_pos
            .map(|p| optstring[p + opt.len_utf8()..].starts_with(':'))
            .unwrap_or(false);

        if spec_pos.is_none() || opt == ':' {
            // Unknown option.
            if silent {
                set(state, var.as_str(), "?")?;
                set(state, "OPTARG", &opt.to_string())?;
            } else {
                set(state, var.as_str(), "?")?;
                let _ = state.vars.unset("OPTARG");
                eprintln!("rush: getopts: illegal option -- {}", opt);
            }
            advance(state, &chars, optind, subindex)?;
            return Ok(0);
        }

        if takes_arg {
            // Argument: rest of this word, or the next word.
            let rest: String = chars[subindex + 1..].iter().collect();
            let (optarg, next_ind) = if !rest.is_empty() {
                (Some(rest), optind + 1)
            } else {
                (args.get(optind).cloned(), optind + 2)
            };
            match optarg {
                Some(value) => {
                    set(state, var.as_str(), &opt.to_string())?;
                    set(state, "OPTARG", &value)?;
                    set(state, "OPTIND", &next_ind.to_string())?;
                    let _ = state.vars.set_scalar("_RUSH_OPTPOS", "1");
                    return Ok(0);
                }
                None => {
                    if silent {
                        set(state, var.as_str(), ":")?;
                        set(state, "OPTARG", &opt.to_string())?;
                    } else {
                        set(state, var.as_str(), "?")?;
                        let _ = state.vars.unset("OPTARG");
                        eprintln!("rush: getopts: option requires an argument -- {}", opt);
                    }
                    set(state, "OPTIND", &(optind + 1).to_string())?;
                    let _ = state.vars.set_scalar("_RUSH_OPTPOS", "1");
                    return Ok(0);
                }
            }
        }

        set(state, var.as_str(), &opt.to_string())?;
        let _ = state.vars.unset("OPTARG");
        advance(state, &chars, optind, subindex)?;
        return Ok(0);
    }
}

/// Step past the option just consumed, moving to the next word when the
/// cluster is exhausted.
fn advance(
    state: &mut ShellState,
    chars: &[char],
    optind: usize,
    subindex: usize,
) -> Result<(), ExecError> {
    let set = |state: &mut ShellState, name: &str, value: String| {
        state
            .vars
            .set_scalar(name, value)
            .map_err(|e| ExecError::Expansion(e.to_string()))
    };
    if subindex + 1 < chars.len() {
        set(state, "_RUSH_OPTPOS", (subindex + 1).to_string())?;
        set(state, "OPTIND", optind.to_string())?;
    } else {
        set(state, "_RUSH_OPTPOS", "1".to_string())?;
        set(state, "OPTIND", (optind + 1).to_string())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::executor::Executor;

    fn run(state: &mut ShellState, args: &[&str]) -> i32 {
        let argv: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        let mut exec = Executor::new();
        getopts(&mut exec, state, &argv).unwrap()
    }

    #[test]
    fn parses_flags_in_order() {
        let mut state = ShellState::new();
        state.positional = vec!["-a".into(), "-b".into(), "arg".into()];
        let _ = state.vars.set_scalar("OPTIND", "1");

        assert_eq!(run(&mut state, &["getopts", "ab", "opt"]), 0);
        assert_eq!(state.vars.get_string("opt").as_deref(), Some("a"));

        assert_eq!(run(&mut state, &["getopts", "ab", "opt"]), 0);
        assert_eq!(state.vars.get_string("opt").as_deref(), Some("b"));

        // Non-option stops parsing.
        assert_eq!(run(&mut state, &["getopts", "ab", "opt"]), 1);
        assert_eq!(state.vars.get_string("OPTIND").as_deref(), Some("3"));
    }

    #[test]
    fn option_with_argument() {
        let mut state = ShellState::new();
        state.positional = vec!["-o".into(), "value".into()];
        let _ = state.vars.set_scalar("OPTIND", "1");

        assert_eq!(run(&mut state, &["getopts", "o:", "opt"]), 0);
        assert_eq!(state.vars.get_string("opt").as_deref(), Some("o"));
        assert_eq!(state.vars.get_string("OPTARG").as_deref(), Some("value"));
        assert_eq!(state.vars.get_string("OPTIND").as_deref(), Some("3"));
    }

    #[test]
    fn attached_argument() {
        let mut state = ShellState::new();
        state.positional = vec!["-ovalue".into()];
        let _ = state.vars.set_scalar("OPTIND", "1");

        assert_eq!(run(&mut state, &["getopts", "o:", "opt"]), 0);
        assert_eq!(state.vars.get_string("OPTARG").as_deref(), Some("value"));
    }

    #[test]
    fn clustered_flags() {
        let mut state = ShellState::new();
        state.positional = vec!["-ab".into()];
        let _ = state.vars.set_scalar("OPTIND", "1");

        assert_eq!(run(&mut state, &["getopts", "ab", "opt"]), 0);
        assert_eq!(state.vars.get_string("opt").as_deref(), Some("a"));
        assert_eq!(run(&mut state, &["getopts", "ab", "opt"]), 0);
        assert_eq!(state.vars.get_string("opt").as_deref(), Some("b"));
        assert_eq!(run(&mut state, &["getopts", "ab", "opt"]), 1);
    }

    #[test]
    fn silent_mode_missing_argument() {
        let mut state = ShellState::new();
        state.positional = vec!["-o".into()];
        let _ = state.vars.set_scalar("OPTIND", "1");

        assert_eq!(run(&mut state, &["getopts", ":o:", "opt"]), 0);
        assert_eq!(state.vars.get_string("opt").as_deref(), Some(":"));
        assert_eq!(state.vars.get_string("OPTARG").as_deref(), Some("o"));
    }
}

//! Built-in commands
//!
//! A built-in is a function `(argv, shell-state) → status`. The registry
//! resolves names; special builtins (POSIX: affect the current shell,
//! never forked) are looked up before functions, regular ones after.

pub mod alias_cmd;
pub mod cd_cmd;
pub mod declare_cmd;
pub mod dirs_cmd;
pub mod echo_cmd;
pub mod eval_cmd;
pub mod exit_cmd;
pub mod export_cmd;
pub mod getopts_cmd;
pub mod history_cmd;
pub mod jobs_cmd;
pub mod misc;
pub mod printf_cmd;
pub mod read_cmd;
pub mod set_cmd;
pub mod shift_cmd;
pub mod shopt_cmd;
pub mod source_cmd;
pub mod test_cmd;
pub mod times_cmd;
pub mod trap_cmd;
pub mod type_cmd;
pub mod unset_cmd;

use crate::exec::error::ExecError;
use crate::exec::executor::Executor;
use crate::state::ShellState;
use lazy_static::lazy_static;
use std::collections::HashMap;

pub type BuiltinFn = fn(&mut Executor, &mut ShellState, &[String]) -> Result<i32, ExecError>;

lazy_static! {
    /// Special builtins: side effects persist in the shell, resolution
    /// beats functions. (`exec` is dispatched separately because its
    /// redirections are permanent.)
    static ref SPECIAL: HashMap<&'static str, BuiltinFn> = {
        let mut m: HashMap<&'static str, BuiltinFn> = HashMap::new();
        m.insert(":", misc::colon as BuiltinFn);
        m.insert(".", source_cmd::source);
        m.insert("source", source_cmd::source);
        m.insert("eval", eval_cmd::eval);
        m.insert("exit", exit_cmd::exit);
        m.insert("export", export_cmd::export);
        m.insert("readonly", export_cmd::readonly);
        m.insert("return", exit_cmd::return_cmd);
        m.insert("set", set_cmd::set);
        m.insert("shift", shift_cmd::shift);
        m.insert("times", times_cmd::times);
        m.insert("trap", trap_cmd::trap);
        m.insert("unset", unset_cmd::unset);
        m
    };

    /// Regular builtins: behave like commands but run in-process.
    static ref REGULAR: HashMap<&'static str, BuiltinFn> = {
        let mut m: HashMap<&'static str, BuiltinFn> = HashMap::new();
        m.insert("cd", cd_cmd::cd as BuiltinFn);
        m.insert("pwd", cd_cmd::pwd);
        m.insert("echo", echo_cmd::echo);
        m.insert("printf", printf_cmd::printf);
        m.insert("test", test_cmd::test);
        m.insert("[", test_cmd::bracket);
        m.insert("read", read_cmd::read);
        m.insert("type", type_cmd::type_cmd);
        m.insert("history", history_cmd::history);
        m.insert("alias", alias_cmd::alias);
        m.insert("unalias", alias_cmd::unalias);
        m.insert("declare", declare_cmd::declare);
        m.insert("typeset", declare_cmd::declare);
        m.insert("local", declare_cmd::local);
        m.insert("getopts", getopts_cmd::getopts);
        m.insert("shopt", shopt_cmd::shopt);
        m.insert("pushd", dirs_cmd::pushd);
        m.insert("popd", dirs_cmd::popd);
        m.insert("dirs", dirs_cmd::dirs);
        m.insert("jobs", jobs_cmd::jobs);
        m.insert("fg", jobs_cmd::fg);
        m.insert("bg", jobs_cmd::bg);
        m.insert("wait", jobs_cmd::wait);
        m.insert("kill", jobs_cmd::kill);
        m.insert("true", misc::true_cmd);
        m.insert("false", misc::false_cmd);
        m.insert("break", misc::break_cmd);
        m.insert("continue", misc::continue_cmd);
        m
    };
}

pub fn lookup_special(name: &str) -> Option<BuiltinFn> {
    SPECIAL.get(name).copied()
}

pub fn lookup_regular(name: &str) -> Option<BuiltinFn> {
    REGULAR.get(name).copied()
}

pub fn is_builtin(name: &str) -> bool {
    name == "exec" || SPECIAL.contains_key(name) || REGULAR.contains_key(name)
}

pub fn is_special(name: &str) -> bool {
    name == "exec" || SPECIAL.contains_key(name)
}

/// Usage failure: message on stderr, status 2.
pub fn usage(name: &str, message: &str) -> Result<i32, ExecError> {
    eprintln!("rush: {}: {}", name, message);
    Ok(2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_lookups() {
        assert!(lookup_special("export").is_some());
        assert!(lookup_special("cd").is_none());
        assert!(lookup_regular("cd").is_some());
        assert!(lookup_regular("definitely-not").is_none());
        assert!(is_builtin("exec"));
        assert!(is_special("exec"));
        assert!(!is_special("echo"));
    }
}

//! cd and pwd builtins
//!
//! `cd` maintains PWD/OLDPWD and supports `cd -`; `pwd` prints the logical
//! working directory.

use crate::exec::error::ExecError;
use crate::exec::executor::Executor;
use crate::state::ShellState;
use std::path::PathBuf;

pub fn cd(
    _exec: &mut Executor,
    state: &mut ShellState,
    argv: &[String],
) -> Result<i32, ExecError> {
    // -L/-P accepted; paths are kept logical.
    let args: Vec<&String> = argv[1..]
        .iter()
        .filter(|a| a.as_str() != "-L" && a.as_str() != "-P")
        .collect();

    let mut print_target = false;
    let target = match args.first().map(|s| s.as_str()) {
        None => match state.vars.get_string("HOME") {
            Some(home) => home,
            None => {
                eprintln!("rush: cd: HOME not set");
                return Ok(1);
            }
        },
        Some("-") => {
            print_target = true;
            match state.vars.get_string("OLDPWD") {
                Some(oldpwd) => oldpwd,
                None => {
                    eprintln!("rush: cd: OLDPWD not set");
                    return Ok(1);
                }
            }
        }
        Some(dir) => dir.to_string(),
    };

    change_directory(state, &target, print_target)
}

pub(crate) fn change_directory(
    state: &mut ShellState,
    target: &str,
    print_target: bool,
) -> Result<i32, ExecError> {
    let old = state
        .vars
        .get_string("PWD")
        .unwrap_or_else(|| std::env::current_dir().map(|p| p.to_string_lossy().into_owned()).unwrap_or_default());

    let resolved = if target.starts_with('/') {
        normalize(PathBuf::from(target))
    } else {
        normalize(PathBuf::from(&old).join(target))
    };

    if let Err(err) = std::env::set_current_dir(&resolved) {
        eprintln!("rush: cd: {}: {}", target, io_reason(&err));
        return Ok(1);
    }

    let new = resolved.to_string_lossy().into_owned();
    let _ = state.vars.set_scalar("OLDPWD", old);
    let _ = state.vars.set_scalar("PWD", new.clone());
    state.vars.export("OLDPWD");
    state.vars.export("PWD");
    if print_target {
        println!("{}", new);
    }
    Ok(0)
}

pub fn pwd(
    _exec: &mut Executor,
    state: &mut ShellState,
    _argv: &[String],
) -> Result<i32, ExecError> {
    let pwd = state
        .vars
        .get_string("PWD")
        .or_else(|| {
            std::env::current_dir()
                .ok()
                .map(|p| p.to_string_lossy().into_owned())
        })
        .unwrap_or_default();
    println!("{}", pwd);
    Ok(0)
}

/// Resolve `.` and `..` textually, the way a logical cd does.
fn normalize(path: PathBuf) -> PathBuf {
    let mut parts: Vec<std::ffi::OsString> = Vec::new();
    for component in path.components() {
        use std::path::Component;
        match component {
            Component::RootDir | Component::Prefix(_) => {
                parts.clear();
            }
            Component::CurDir => {}
            Component::ParentDir => {
                parts.pop();
            }
            Component::Normal(name) => parts.push(name.to_os_string()),
        }
    }
    let mut out = PathBuf::from("/");
    for part in parts {
        out.push(part);
    }
    out
}

fn io_reason(err: &std::io::Error) -> &'static str {
    match err.kind() {
        std::io::ErrorKind::NotFound => "No such file or directory",
        std::io::ErrorKind::PermissionDenied => "Permission denied",
        _ => "Not a directory",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_dots() {
        assert_eq!(normalize(PathBuf::from("/a/b/../c/./d")), PathBuf::from("/a/c/d"));
        assert_eq!(normalize(PathBuf::from("/../x")), PathBuf::from("/x"));
        assert_eq!(normalize(PathBuf::from("/")), PathBuf::from("/"));
    }
}

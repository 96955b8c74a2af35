//! Redirections
//!
//! Applies a command's redirect list in source order. For builtins and
//! in-shell compounds the affected fds are saved with `dup` and restored
//! LIFO when the guard drops; `exec` and forked children apply permanently.
//! Here-doc bodies travel through a pipe, or a temp file once they outgrow
//! the pipe buffer.

use crate::ast::types::{Redirect, RedirectOp, RedirectTarget};
use crate::exec::error::ExecError;
use crate::expand::Expander;
use nix::fcntl::{fcntl, open, FcntlArg, OFlag};
use nix::sys::stat::Mode;
use nix::unistd::{close, dup2, pipe, write};
use std::io::Write as _;
use std::os::fd::{AsRawFd, IntoRawFd};
use std::path::Path;

/// Here-doc bodies above this size spill to an unlinked temp file instead
/// of a pipe, which could fill and deadlock before the consumer runs.
const HEREDOC_PIPE_LIMIT: usize = 64 * 1024;

/// Saved fds, restored in reverse order on drop.
#[derive(Debug, Default)]
pub struct RedirectGuard {
    saved: Vec<(i32, Option<i32>)>,
    permanent: bool,
}

impl RedirectGuard {
    fn save(&mut self, fd: i32) {
        if self.permanent {
            return;
        }
        // Copies live at 10+ so they stay clear of user-visible fds.
        let saved = fcntl(fd, FcntlArg::F_DUPFD_CLOEXEC(10)).ok();
        self.saved.push((fd, saved));
    }
}

impl Drop for RedirectGuard {
    fn drop(&mut self) {
        if self.permanent {
            return;
        }
        let _ = std::io::stdout().flush();
        let _ = std::io::stderr().flush();
        while let Some((fd, saved)) = self.saved.pop() {
            match saved {
                Some(copy) => {
                    let _ = dup2(copy, fd);
                    let _ = close(copy);
                }
                None => {
                    let _ = close(fd);
                }
            }
        }
    }
}

/// Apply all redirects, expanding targets. Returns the guard that restores
/// the previous fds (a no-op guard when `permanent`).
pub fn apply_redirects(
    ex: &mut Expander,
    redirects: &[Redirect],
    permanent: bool,
) -> Result<RedirectGuard, ExecError> {
    let mut guard = RedirectGuard {
        saved: Vec::new(),
        permanent,
    };
    let _ = std::io::stdout().flush();
    let _ = std::io::stderr().flush();

    for redirect in redirects {
        apply_one(ex, redirect, &mut guard)?;
    }
    Ok(guard)
}

fn apply_one(
    ex: &mut Expander,
    redirect: &Redirect,
    guard: &mut RedirectGuard,
) -> Result<(), ExecError> {
    match redirect.op {
        RedirectOp::Read => {
            let path = target_path(ex, redirect)?;
            let fd = redirect.fd.unwrap_or(0);
            let file = open(Path::new(&path), OFlag::O_RDONLY, Mode::empty())
                .map_err(|e| redir_err(&path, e))?;
            install(file, fd, guard);
        }
        RedirectOp::Write | RedirectOp::Clobber => {
            let path = target_path(ex, redirect)?;
            let fd = redirect.fd.unwrap_or(1);
            let file = open_for_write(ex, &path, redirect.op == RedirectOp::Clobber)?;
            install(file, fd, guard);
        }
        RedirectOp::Append => {
            let path = target_path(ex, redirect)?;
            let fd = redirect.fd.unwrap_or(1);
            let file = open(
                Path::new(&path),
                OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_APPEND,
                Mode::from_bits_truncate(0o644),
            )
            .map_err(|e| redir_err(&path, e))?;
            install(file, fd, guard);
        }
        RedirectOp::ReadWrite => {
            let path = target_path(ex, redirect)?;
            let fd = redirect.fd.unwrap_or(0);
            let file = open(
                Path::new(&path),
                OFlag::O_RDWR | OFlag::O_CREAT,
                Mode::from_bits_truncate(0o644),
            )
            .map_err(|e| redir_err(&path, e))?;
            install(file, fd, guard);
        }
        RedirectOp::WriteBoth | RedirectOp::AppendBoth => {
            let path = target_path(ex, redirect)?;
            let flags = if redirect.op == RedirectOp::AppendBoth {
                OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_APPEND
            } else {
                OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC
            };
            let file = open(Path::new(&path), flags, Mode::from_bits_truncate(0o644))
                .map_err(|e| redir_err(&path, e))?;
            guard.save(1);
            guard.save(2);
            let _ = dup2(file, 1).map_err(|e| redir_err(&path, e))?;
            let _ = dup2(file, 2).map_err(|e| redir_err(&path, e))?;
            if file > 2 {
                let _ = close(file);
            }
        }
        RedirectOp::DupIn | RedirectOp::DupOut => {
            let target = target_path(ex, redirect)?;
            let fd = redirect
                .fd
                .unwrap_or(if redirect.op == RedirectOp::DupIn { 0 } else { 1 });
            if target == "-" {
                guard.save(fd);
                let _ = close(fd);
            } else if let Ok(source) = target.parse::<i32>() {
                guard.save(fd);
                dup2(source, fd).map_err(|e| {
                    ExecError::Redirect(format!("{}: bad file descriptor: {}", source, e))
                })?;
            } else if redirect.op == RedirectOp::DupOut {
                // `>&word`: both stdout and stderr to the file.
                let file = open_for_write(ex, &target, false)?;
                guard.save(1);
                guard.save(2);
                let _ = dup2(file, 1).map_err(|e| redir_err(&target, e))?;
                let _ = dup2(file, 2).map_err(|e| redir_err(&target, e))?;
                if file > 2 {
                    let _ = close(file);
                }
            } else {
                return Err(ExecError::Redirect(format!(
                    "{}: ambiguous redirect",
                    target
                )));
            }
        }
        RedirectOp::HereDoc | RedirectOp::HereDocDash => {
            let body = match &redirect.target {
                RedirectTarget::HereDoc(doc) => {
                    if doc.quoted {
                        doc.body.as_literal().unwrap_or_default()
                    } else {
                        ex.expand_single(&doc.body)?
                    }
                }
                RedirectTarget::Word(_) => String::new(),
            };
            let fd = redirect.fd.unwrap_or(0);
            feed_document(&body, fd, guard)?;
        }
        RedirectOp::HereString => {
            let mut text = target_word_expanded(ex, redirect)?;
            text.push('\n');
            let fd = redirect.fd.unwrap_or(0);
            feed_document(&text, fd, guard)?;
        }
    }
    Ok(())
}

fn open_for_write(ex: &Expander, path: &str, clobber: bool) -> Result<i32, ExecError> {
    if ex.state.options.noclobber && !clobber {
        let meta = std::fs::metadata(path);
        if meta.map(|m| m.is_file()).unwrap_or(false) {
            return Err(ExecError::Redirect(format!(
                "{}: cannot overwrite existing file",
                path
            )));
        }
    }
    open(
        Path::new(path),
        OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC,
        Mode::from_bits_truncate(0o644),
    )
    .map_err(|e| redir_err(path, e))
}

fn install(file: i32, fd: i32, guard: &mut RedirectGuard) {
    guard.save(fd);
    if file != fd {
        let _ = dup2(file, fd);
        let _ = close(file);
    }
}

/// Write a here-document onto the given fd through a pipe, or via an
/// unlinked temp file when the body could fill the pipe.
fn feed_document(body: &str, fd: i32, guard: &mut RedirectGuard) -> Result<(), ExecError> {
    if body.len() > HEREDOC_PIPE_LIMIT {
        let mut file = tempfile::tempfile()
            .map_err(|e| ExecError::Redirect(format!("cannot create temp file: {}", e)))?;
        file.write_all(body.as_bytes())
            .and_then(|_| file.flush())
            .map_err(|e| ExecError::Redirect(format!("cannot write here-document: {}", e)))?;
        use std::io::Seek;
        file.seek(std::io::SeekFrom::Start(0))
            .map_err(|e| ExecError::Redirect(e.to_string()))?;
        let raw = file.into_raw_fd();
        install(raw, fd, guard);
        return Ok(());
    }

    let (read_end, write_end) =
        pipe().map_err(|e| ExecError::Redirect(format!("cannot create pipe: {}", e)))?;
    let mut remaining = body.as_bytes();
    while !remaining.is_empty() {
        match write(&write_end, remaining) {
            Ok(n) => remaining = &remaining[n..],
            Err(nix::errno::Errno::EINTR) => continue,
            Err(e) => {
                return Err(ExecError::Redirect(format!(
                    "cannot write here-document: {}",
                    e
                )))
            }
        }
    }
    drop(write_end);
    install(read_end.into_raw_fd(), fd, guard);
    Ok(())
}

fn target_path(ex: &mut Expander, redirect: &Redirect) -> Result<String, ExecError> {
    target_word_expanded(ex, redirect)
}

fn target_word_expanded(ex: &mut Expander, redirect: &Redirect) -> Result<String, ExecError> {
    match &redirect.target {
        RedirectTarget::Word(word) => ex.expand_redirect_target(word),
        RedirectTarget::HereDoc(_) => Ok(String::new()),
    }
}

fn redir_err(path: &str, e: nix::errno::Errno) -> ExecError {
    ExecError::Redirect(format!("{}: {}", path, e.desc()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::state::ShellState;
    use std::io::Read;

    fn redirects_of(input: &str) -> Vec<Redirect> {
        let script = parse(input).unwrap();
        match &script.statements[0].pipelines[0].commands[0] {
            crate::ast::Command::Simple(simple) => simple.redirects.clone(),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn write_and_restore() {
        let _fd = crate::TEST_FD_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out");
        let input = format!("cmd > {}", path.display());
        let redirects = redirects_of(&input);

        let mut state = ShellState::new();
        let mut ex = Expander::new(&mut state);
        {
            let _guard = apply_redirects(&mut ex, &redirects, false).unwrap();
            nix::unistd::write(unsafe { std::os::fd::BorrowedFd::borrow_raw(1) }, b"redirected\n")
                .unwrap();
        }
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "redirected\n");
    }

    #[test]
    fn noclobber_refuses_existing_file() {
        let _fd = crate::TEST_FD_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exists");
        std::fs::write(&path, "old").unwrap();

        let input = format!("cmd > {}", path.display());
        let redirects = redirects_of(&input);

        let mut state = ShellState::new();
        state.options.noclobber = true;
        let mut ex = Expander::new(&mut state);
        let err = apply_redirects(&mut ex, &redirects, false).unwrap_err();
        assert!(matches!(err, ExecError::Redirect(_)));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "old");
    }

    #[test]
    fn clobber_overrides_noclobber() {
        let _fd = crate::TEST_FD_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exists");
        std::fs::write(&path, "old").unwrap();

        let input = format!("cmd >| {}", path.display());
        let redirects = redirects_of(&input);

        let mut state = ShellState::new();
        state.options.noclobber = true;
        let mut ex = Expander::new(&mut state);
        assert!(apply_redirects(&mut ex, &redirects, false).is_ok());
    }

    #[test]
    fn here_string_feeds_stdin() {
        let _fd = crate::TEST_FD_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let redirects = redirects_of("cmd <<< hello");
        let mut state = ShellState::new();
        let mut ex = Expander::new(&mut state);
        let _guard = apply_redirects(&mut ex, &redirects, false).unwrap();
        let mut buf = String::new();
        std::io::stdin().lock().read_to_string(&mut buf).unwrap();
        assert_eq!(buf, "hello\n");
    }

    #[test]
    fn missing_input_file_is_redirect_error() {
        let _fd = crate::TEST_FD_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let redirects = redirects_of("cmd < /definitely/not/here");
        let mut state = ShellState::new();
        let mut ex = Expander::new(&mut state);
        let err = apply_redirects(&mut ex, &redirects, false).unwrap_err();
        assert!(matches!(err, ExecError::Redirect(_)));
    }
}

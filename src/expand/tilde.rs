//! Tilde expansion
//!
//! A leading `~` becomes `$HOME`; `~user` resolves through the passwd
//! database; unknown users leave the text untouched. In assignment values,
//! a `~` right after `=` or `:` also expands, so PATH-style lists work.

use crate::state::ShellState;
use nix::unistd::{User, Uid};

/// Home directory for `~` (`user == None`) or `~user`.
pub fn tilde_home(state: &ShellState, user: Option<&str>) -> Option<String> {
    match user {
        None => {
            if let Some(home) = state.vars.get_string("HOME") {
                return Some(home);
            }
            User::from_uid(Uid::current())
                .ok()
                .flatten()
                .map(|u| u.dir.to_string_lossy().into_owned())
        }
        Some(name) => User::from_name(name)
            .ok()
            .flatten()
            .map(|u| u.dir.to_string_lossy().into_owned()),
    }
}

/// Expand `~` at the start and after each `:` of an assignment value.
pub fn expand_assignment_tildes(state: &ShellState, text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for (i, segment) in text.split(':').enumerate() {
        if i > 0 {
            out.push(':');
        }
        out.push_str(&expand_segment(state, segment));
    }
    out
}

fn expand_segment(state: &ShellState, segment: &str) -> String {
    let Some(rest) = segment.strip_prefix('~') else {
        return segment.to_string();
    };
    let (user, tail) = match rest.find('/') {
        Some(slash) => (&rest[..slash], &rest[slash..]),
        None => (rest, ""),
    };
    let home = if user.is_empty() {
        tilde_home(state, None)
    } else {
        tilde_home(state, Some(user))
    };
    match home {
        Some(home) => format!("{}{}", home, tail),
        None => segment.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with_home(home: &str) -> ShellState {
        let mut state = ShellState::new();
        state.vars.set_scalar("HOME", home).unwrap();
        state
    }

    #[test]
    fn bare_tilde_uses_home() {
        let state = state_with_home("/home/tester");
        assert_eq!(tilde_home(&state, None).as_deref(), Some("/home/tester"));
    }

    #[test]
    fn unknown_user_is_none() {
        let state = state_with_home("/home/tester");
        assert_eq!(tilde_home(&state, Some("no-such-user-zz")), None);
    }

    #[test]
    fn assignment_value_expands_after_colons() {
        let state = state_with_home("/h");
        assert_eq!(
            expand_assignment_tildes(&state, "~/bin:/usr/bin:~/sbin"),
            "/h/bin:/usr/bin:/h/sbin"
        );
    }

    #[test]
    fn non_tilde_segments_untouched() {
        let state = state_with_home("/h");
        assert_eq!(expand_assignment_tildes(&state, "a:b"), "a:b");
    }

    #[test]
    fn unknown_user_segment_left_alone() {
        let state = state_with_home("/h");
        assert_eq!(
            expand_assignment_tildes(&state, "~zz-no-user/x"),
            "~zz-no-user/x"
        );
    }
}

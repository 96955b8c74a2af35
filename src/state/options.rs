//! Shell options
//!
//! `set`-style options (with single-letter flags and `-o` long names) and
//! the `shopt` option set. `set -o` output round-trips through
//! `set_by_name`.

#[derive(Debug, Clone, Default)]
pub struct Options {
    /// set -e: exit on non-zero status
    pub errexit: bool,
    /// set -u: unset variable expansion is an error
    pub nounset: bool,
    /// set -x: trace expanded commands
    pub xtrace: bool,
    /// set -v: echo input lines as read
    pub verbose: bool,
    /// set -o pipefail: pipeline status is the rightmost failure
    pub pipefail: bool,
    /// set -f: disable pathname expansion
    pub noglob: bool,
    /// set -C: refuse `>` over existing files
    pub noclobber: bool,
    /// set -a: export on assignment
    pub allexport: bool,
    /// set -n: parse but do not execute
    pub noexec: bool,
    /// set -o emacs / set -o vi: line-editing mode (mutually exclusive)
    pub emacs: bool,
    pub vi: bool,
    /// --debug-ast: dump the parsed tree before executing
    pub debug_ast: bool,
    /// --debug-tokens: dump the token stream before parsing
    pub debug_tokens: bool,
}

impl Options {
    /// `(long name, flag char)` pairs; flag `\0` means `-o`-only.
    const TABLE: &'static [(&'static str, char)] = &[
        ("errexit", 'e'),
        ("nounset", 'u'),
        ("xtrace", 'x'),
        ("verbose", 'v'),
        ("pipefail", '\0'),
        ("noglob", 'f'),
        ("noclobber", 'C'),
        ("allexport", 'a'),
        ("noexec", 'n'),
        ("emacs", '\0'),
        ("vi", '\0'),
        ("debug-ast", '\0'),
        ("debug-tokens", '\0'),
    ];

    pub fn get_by_name(&self, name: &str) -> Option<bool> {
        Some(match name {
            "errexit" => self.errexit,
            "nounset" => self.nounset,
            "xtrace" => self.xtrace,
            "verbose" => self.verbose,
            "pipefail" => self.pipefail,
            "noglob" => self.noglob,
            "noclobber" => self.noclobber,
            "allexport" => self.allexport,
            "noexec" => self.noexec,
            "emacs" => self.emacs,
            "vi" => self.vi,
            "debug-ast" => self.debug_ast,
            "debug-tokens" => self.debug_tokens,
            _ => return None,
        })
    }

    pub fn set_by_name(&mut self, name: &str, value: bool) -> Result<(), String> {
        match name {
            "errexit" => self.errexit = value,
            "nounset" => self.nounset = value,
            "xtrace" => self.xtrace = value,
            "verbose" => self.verbose = value,
            "pipefail" => self.pipefail = value,
            "noglob" => self.noglob = value,
            "noclobber" => self.noclobber = value,
            "allexport" => self.allexport = value,
            "noexec" => self.noexec = value,
            "emacs" => {
                self.emacs = value;
                if value {
                    self.vi = false;
                }
            }
            "vi" => {
                self.vi = value;
                if value {
                    self.emacs = false;
                }
            }
            "debug-ast" => self.debug_ast = value,
            "debug-tokens" => self.debug_tokens = value,
            _ => return Err(format!("{}: invalid option name", name)),
        }
        Ok(())
    }

    pub fn set_by_flag(&mut self, flag: char, value: bool) -> Result<(), String> {
        let name = Self::TABLE
            .iter()
            .find(|(_, f)| *f == flag)
            .map(|(n, _)| *n)
            .ok_or_else(|| format!("-{}: invalid option", flag))?;
        self.set_by_name(name, value)
    }

    /// `set -o` listing, one `name on|off` per line.
    pub fn listing(&self) -> String {
        let mut out = String::new();
        for (name, _) in Self::TABLE {
            let value = self.get_by_name(name).unwrap();
            out.push_str(&format!(
                "{:<15} {}\n",
                name,
                if value { "on" } else { "off" }
            ));
        }
        out
    }

    /// `set +o` listing: commands that restore the current state.
    pub fn restore_commands(&self) -> String {
        let mut out = String::new();
        for (name, _) in Self::TABLE {
            let value = self.get_by_name(name).unwrap();
            out.push_str(&format!(
                "set {}o {}\n",
                if value { "-" } else { "+" },
                name
            ));
        }
        out
    }

    /// Flag letters for `$-`.
    pub fn flags_string(&self, interactive: bool) -> String {
        let mut out = String::new();
        for (name, flag) in Self::TABLE {
            if *flag != '\0' && self.get_by_name(name).unwrap() {
                out.push(*flag);
            }
        }
        if interactive {
            out.push('i');
        }
        out
    }
}

/// `shopt` options. Only the set the core consults.
#[derive(Debug, Clone)]
pub struct ShoptOptions {
    /// Non-matching globs expand to nothing instead of themselves.
    pub nullglob: bool,
    /// Globs match dotfiles.
    pub dotglob: bool,
    /// Case-insensitive pattern matching in `case` and `[[ ]]`.
    pub nocasematch: bool,
    /// Alias expansion (on by default interactively).
    pub expand_aliases: bool,
}

impl Default for ShoptOptions {
    fn default() -> Self {
        Self {
            nullglob: false,
            dotglob: false,
            nocasematch: false,
            expand_aliases: true,
        }
    }
}

impl ShoptOptions {
    pub const NAMES: &'static [&'static str] =
        &["nullglob", "dotglob", "nocasematch", "expand_aliases"];

    pub fn get_by_name(&self, name: &str) -> Option<bool> {
        Some(match name {
            "nullglob" => self.nullglob,
            "dotglob" => self.dotglob,
            "nocasematch" => self.nocasematch,
            "expand_aliases" => self.expand_aliases,
            _ => return None,
        })
    }

    pub fn set_by_name(&mut self, name: &str, value: bool) -> Result<(), String> {
        match name {
            "nullglob" => self.nullglob = value,
            "dotglob" => self.dotglob = value,
            "nocasematch" => self.nocasematch = value,
            "expand_aliases" => self.expand_aliases = value,
            _ => return Err(format!("{}: invalid shell option name", name)),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_o_round_trips_through_restore_commands() {
        let mut opts = Options::default();
        opts.set_by_name("errexit", true).unwrap();
        opts.set_by_name("pipefail", true).unwrap();

        let mut restored = Options::default();
        for line in opts.restore_commands().lines() {
            let mut parts = line.split_whitespace();
            let _set = parts.next().unwrap();
            let sign = parts.next().unwrap();
            let name = parts.next().unwrap();
            restored.set_by_name(name, sign == "-o").unwrap();
        }
        assert_eq!(restored.errexit, opts.errexit);
        assert_eq!(restored.pipefail, opts.pipefail);
        assert_eq!(restored.nounset, opts.nounset);
    }

    #[test]
    fn flags_by_letter() {
        let mut opts = Options::default();
        opts.set_by_flag('e', true).unwrap();
        opts.set_by_flag('u', true).unwrap();
        assert!(opts.errexit);
        assert!(opts.nounset);
        assert!(opts.set_by_flag('q', true).is_err());
        assert_eq!(opts.flags_string(true), "eui");
    }

    #[test]
    fn emacs_and_vi_are_exclusive() {
        let mut opts = Options::default();
        opts.set_by_name("vi", true).unwrap();
        opts.set_by_name("emacs", true).unwrap();
        assert!(opts.emacs);
        assert!(!opts.vi);
    }
}

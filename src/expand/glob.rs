//! Pathname expansion
//!
//! Expands glob patterns against the real filesystem, one path component at
//! a time. Hidden files match only when the pattern component itself starts
//! with a literal dot (or dotglob is set). Results come back sorted; the
//! caller decides what a zero-match means (literal pattern vs nullglob).

use crate::expand::pattern::{has_glob_chars, pattern_match, remove_escapes};
use std::path::Path;

pub struct GlobOptions {
    pub dotglob: bool,
    pub nocase: bool,
}

/// Expand one pattern (with backslash escapes marking literal spans) into
/// sorted matching paths. Empty when nothing matches.
pub fn expand_pathname(pattern: &str, opts: &GlobOptions) -> Vec<String> {
    let absolute = pattern.starts_with('/');
    let trailing_slash = pattern.ends_with('/') && pattern.len() > 1;

    let components: Vec<&str> = pattern.split('/').filter(|c| !c.is_empty()).collect();
    if components.is_empty() {
        return Vec::new();
    }

    let mut candidates: Vec<String> = vec![if absolute {
        "/".to_string()
    } else {
        String::new()
    }];

    for component in &components {
        let mut next = Vec::new();
        for base in &candidates {
            expand_component(base, component, opts, &mut next);
        }
        candidates = next;
        if candidates.is_empty() {
            return Vec::new();
        }
    }

    let mut results: Vec<String> = candidates
        .into_iter()
        .filter(|p| !trailing_slash || Path::new(p).is_dir())
        .map(|p| if trailing_slash { format!("{}/", p) } else { p })
        .collect();
    results.sort();
    results
}

fn expand_component(base: &str, component: &str, opts: &GlobOptions, out: &mut Vec<String>) {
    let dir: &Path = if base.is_empty() {
        Path::new(".")
    } else {
        Path::new(base)
    };

    if !has_glob_chars(component) {
        // Literal component: no directory read, just existence check.
        let name = remove_escapes(component);
        let joined = join(base, &name);
        if Path::new(&joined).exists() || symlink_exists(&joined) {
            out.push(joined);
        }
        return;
    }

    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    let hidden_ok = opts.dotglob || component.starts_with('.');
    for entry in entries.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with('.') && !hidden_ok {
            continue;
        }
        if pattern_match(component, &name, opts.nocase) {
            out.push(join(base, &name));
        }
    }
}

fn join(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else if base == "/" {
        format!("/{}", name)
    } else {
        format!("{}/{}", base, name)
    }
}

/// A dangling symlink exists for glob purposes.
fn symlink_exists(path: &str) -> bool {
    std::fs::symlink_metadata(path).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn opts() -> GlobOptions {
        GlobOptions {
            dotglob: false,
            nocase: false,
        }
    }

    fn setup() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for name in ["apple.txt", "banana.txt", "cherry.log", ".hidden"] {
            fs::write(dir.path().join(name), "").unwrap();
        }
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/inner.txt"), "").unwrap();
        dir
    }

    #[test]
    fn star_matches_sorted_non_hidden() {
        let dir = setup();
        let pattern = format!("{}/*", dir.path().display());
        let results = expand_pathname(&pattern, &opts());
        let names: Vec<String> = results
            .iter()
            .map(|p| p.rsplit('/').next().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["apple.txt", "banana.txt", "cherry.log", "sub"]);
    }

    #[test]
    fn extension_filter() {
        let dir = setup();
        let pattern = format!("{}/*.txt", dir.path().display());
        let results = expand_pathname(&pattern, &opts());
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn hidden_requires_dot_prefix() {
        let dir = setup();
        let explicit = format!("{}/.*", dir.path().display());
        let results = expand_pathname(&explicit, &opts());
        assert!(results.iter().any(|p| p.ends_with(".hidden")));
    }

    #[test]
    fn dotglob_includes_hidden() {
        let dir = setup();
        let pattern = format!("{}/*", dir.path().display());
        let results = expand_pathname(
            &pattern,
            &GlobOptions {
                dotglob: true,
                nocase: false,
            },
        );
        assert!(results.iter().any(|p| p.ends_with(".hidden")));
    }

    #[test]
    fn multi_component_patterns() {
        let dir = setup();
        let pattern = format!("{}/*/inner.*", dir.path().display());
        let results = expand_pathname(&pattern, &opts());
        assert_eq!(results.len(), 1);
        assert!(results[0].ends_with("sub/inner.txt"));
    }

    #[test]
    fn no_matches_is_empty() {
        let dir = setup();
        let pattern = format!("{}/*.missing", dir.path().display());
        assert!(expand_pathname(&pattern, &opts()).is_empty());
    }

    #[test]
    fn question_and_brackets() {
        let dir = setup();
        let pattern = format!("{}/[ab]*.txt", dir.path().display());
        let results = expand_pathname(&pattern, &opts());
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn trailing_slash_selects_directories() {
        let dir = setup();
        let pattern = format!("{}/*/", dir.path().display());
        let results = expand_pathname(&pattern, &opts());
        assert_eq!(results.len(), 1);
        assert!(results[0].ends_with("sub/"));
    }
}

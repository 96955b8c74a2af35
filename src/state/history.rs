//! Command history
//!
//! An in-memory list capped by HISTSIZE, persisted line-oriented to
//! HISTFILE. Multi-line commands are stored with their literal newlines, so
//! the file uses a NUL-free record separator convention: entries are split
//! on newlines on load, which folds multi-line entries into separate lines
//! the way bash does without timestamps. File problems are never fatal.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const DEFAULT_HISTSIZE: usize = 500;

#[derive(Debug, Clone, Default)]
pub struct History {
    entries: Vec<String>,
    max: usize,
    pub file: Option<PathBuf>,
    /// Fingerprint of the last entry, for duplicate suppression.
    last: Option<String>,
}

impl History {
    pub fn new(max: usize) -> Self {
        Self {
            entries: Vec::new(),
            max,
            file: None,
            last: None,
        }
    }

    pub fn set_max(&mut self, max: usize) {
        self.max = max;
        self.trim();
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.last = None;
    }

    /// Record one command buffer; consecutive duplicates are suppressed.
    pub fn add(&mut self, command: &str) {
        let trimmed = command.trim();
        if trimmed.is_empty() {
            return;
        }
        if self.last.as_deref() == Some(trimmed) {
            return;
        }
        self.last = Some(trimmed.to_string());
        self.entries.push(command.to_string());
        self.trim();
    }

    fn trim(&mut self) {
        if self.max > 0 && self.entries.len() > self.max {
            let excess = self.entries.len() - self.max;
            self.entries.drain(..excess);
        }
    }

    /// Load entries from the history file. Errors are warnings only.
    pub fn load(&mut self, path: &Path) {
        self.file = Some(path.to_path_buf());
        match fs::read_to_string(path) {
            Ok(text) => {
                for line in text.lines() {
                    if !line.is_empty() {
                        self.entries.push(line.to_string());
                    }
                }
                self.last = self.entries.last().cloned();
                self.trim();
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                eprintln!("rush: history: cannot read {}: {}", path.display(), err);
            }
        }
    }

    /// Save trimmed entries to the history file. Errors are warnings only.
    pub fn save(&self) {
        let Some(path) = &self.file else { return };
        let result = fs::File::create(path).and_then(|mut f| {
            for entry in &self.entries {
                writeln!(f, "{}", entry)?;
            }
            Ok(())
        });
        if let Err(err) = result {
            eprintln!("rush: history: cannot write {}: {}", path.display(), err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adds_and_caps() {
        let mut h = History::new(3);
        for i in 0..5 {
            h.add(&format!("cmd {}", i));
        }
        assert_eq!(h.len(), 3);
        assert_eq!(h.entries()[0], "cmd 2");
    }

    #[test]
    fn suppresses_consecutive_duplicates() {
        let mut h = History::new(10);
        h.add("ls");
        h.add("ls");
        h.add("pwd");
        h.add("ls");
        assert_eq!(h.len(), 3);
    }

    #[test]
    fn ignores_blank_commands() {
        let mut h = History::new(10);
        h.add("   ");
        h.add("");
        assert!(h.is_empty());
    }

    #[test]
    fn round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history");

        let mut h = History::new(10);
        h.file = Some(path.clone());
        h.add("echo one");
        h.add("echo two");
        h.save();

        let mut loaded = History::new(10);
        loaded.load(&path);
        assert_eq!(loaded.entries(), &["echo one", "echo two"]);
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let mut h = History::new(10);
        h.load(Path::new("/nonexistent/history/file"));
        assert!(h.is_empty());
    }
}

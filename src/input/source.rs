//! Input sources
//!
//! The shell reads commands from one of three places: a script file, a
//! string (`-c`), or an interactive terminal. Each is an `InputSource`; the
//! driver and the multi-line handler only see the trait.

use std::fs::File;
use std::io::{self, BufRead, BufReader, IsTerminal, Write};

/// Where the shell gets its next line of input.
pub trait InputSource {
    /// Read the next line, without its trailing newline. `None` on EOF.
    fn read_line(&mut self) -> Option<String>;

    fn is_interactive(&self) -> bool;

    /// Name used in diagnostics (`$0` for scripts, "rush" interactively).
    fn name(&self) -> &str;

    /// Set the prompt for the next read. Only meaningful interactively.
    fn set_prompt(&mut self, _prompt: &str) {}
}

/// Commands read from a script file.
pub struct FileInput {
    name: String,
    reader: BufReader<File>,
    pub line_number: usize,
}

impl FileInput {
    pub fn open(path: &str) -> io::Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            name: path.to_string(),
            reader: BufReader::new(file),
            line_number: 0,
        })
    }
}

impl InputSource for FileInput {
    fn read_line(&mut self) -> Option<String> {
        let mut line = String::new();
        match self.reader.read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => {
                self.line_number += 1;
                while line.ends_with('\n') || line.ends_with('\r') {
                    line.pop();
                }
                Some(line)
            }
        }
    }

    fn is_interactive(&self) -> bool {
        false
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Commands supplied as a string (the `-c` option, `eval`, sourced text).
pub struct StringInput {
    name: String,
    lines: Vec<String>,
    pos: usize,
}

impl StringInput {
    pub fn new(text: &str, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lines: text.split('\n').map(str::to_string).collect(),
            pos: 0,
        }
    }
}

impl InputSource for StringInput {
    fn read_line(&mut self) -> Option<String> {
        if self.pos >= self.lines.len() {
            return None;
        }
        let mut line = self.lines[self.pos].clone();
        self.pos += 1;
        if line.ends_with('\r') {
            line.pop();
        }
        Some(line)
    }

    fn is_interactive(&self) -> bool {
        false
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Interactive terminal input: a prompt written to stderr, plain line reads
/// from stdin. Line editing lives outside the core.
pub struct InteractiveInput {
    name: String,
    /// Prompt for the next read; the driver sets PS1 or PS2 here.
    pub prompt: String,
}

impl InteractiveInput {
    pub fn new() -> Self {
        Self {
            name: "rush".to_string(),
            prompt: String::from("$ "),
        }
    }
}

impl Default for InteractiveInput {
    fn default() -> Self {
        Self::new()
    }
}

impl InputSource for InteractiveInput {
    fn read_line(&mut self) -> Option<String> {
        let mut err = io::stderr();
        let _ = err.write_all(self.prompt.as_bytes());
        let _ = err.flush();

        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => {
                while line.ends_with('\n') || line.ends_with('\r') {
                    line.pop();
                }
                Some(line)
            }
        }
    }

    fn is_interactive(&self) -> bool {
        io::stdin().is_terminal()
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn set_prompt(&mut self, prompt: &str) {
        self.prompt = prompt.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_input_yields_lines_then_eof() {
        let mut input = StringInput::new("one\ntwo", "test");
        assert_eq!(input.read_line().as_deref(), Some("one"));
        assert_eq!(input.read_line().as_deref(), Some("two"));
        assert_eq!(input.read_line(), None);
        assert!(!input.is_interactive());
        assert_eq!(input.name(), "test");
    }

    #[test]
    fn file_input_counts_lines() {
        use std::io::Write as _;
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp, "echo a").unwrap();
        writeln!(tmp, "echo b").unwrap();

        let mut input = FileInput::open(tmp.path().to_str().unwrap()).unwrap();
        assert_eq!(input.read_line().as_deref(), Some("echo a"));
        assert_eq!(input.read_line().as_deref(), Some("echo b"));
        assert_eq!(input.read_line(), None);
        assert_eq!(input.line_number, 2);
    }
}

//! Multi-line command accumulation
//!
//! Feeds lines from an input source to the parser until the parser stops
//! answering "need more input" (open quote, unfinished here-doc, unclosed
//! brace/paren, trailing backslash, half of a control structure). The
//! complete buffer is what the shell records in history as one entry.

use crate::ast::Script;
use crate::input::preprocess::strip_line_continuations;
use crate::input::source::InputSource;
use crate::parser::{self, ParseError};

/// One accumulated command buffer and its parse result.
pub struct ReadCommand {
    /// Exactly the text the user typed, newlines included.
    pub buffer: String,
    pub result: Result<Script, ParseError>,
}

pub struct MultiLineHandler {
    ps1: String,
    ps2: String,
}

impl MultiLineHandler {
    pub fn new(ps1: impl Into<String>, ps2: impl Into<String>) -> Self {
        Self {
            ps1: ps1.into(),
            ps2: ps2.into(),
        }
    }

    /// Read one complete command from the source. `None` on EOF before any
    /// input.
    pub fn read_command(&self, source: &mut dyn InputSource) -> Option<ReadCommand> {
        source.set_prompt(&self.ps1);
        let mut buffer = source.read_line()?;

        loop {
            if needs_continuation_line(&buffer) {
                source.set_prompt(&self.ps2);
                match source.read_line() {
                    Some(line) => {
                        buffer.push('\n');
                        buffer.push_str(&line);
                        continue;
                    }
                    None => {
                        // EOF with a dangling backslash: drop it, like bash.
                        buffer.pop();
                    }
                }
            }

            let preprocessed = strip_line_continuations(&buffer);
            match parser::parse(&preprocessed) {
                Ok(script) => {
                    return Some(ReadCommand {
                        buffer,
                        result: Ok(script),
                    })
                }
                Err(err) if err.incomplete => {
                    source.set_prompt(&self.ps2);
                    match source.read_line() {
                        Some(line) => {
                            buffer.push('\n');
                            buffer.push_str(&line);
                        }
                        None => {
                            return Some(ReadCommand {
                                buffer,
                                result: Err(err),
                            })
                        }
                    }
                }
                Err(err) => {
                    return Some(ReadCommand {
                        buffer,
                        result: Err(err),
                    })
                }
            }
        }
    }
}

/// A trailing unescaped backslash outside quotes always wants another line,
/// even though the preprocessor would silently eat it.
fn needs_continuation_line(buffer: &str) -> bool {
    let chars: Vec<char> = buffer.chars().collect();
    let mut in_single = false;
    let mut in_double = false;
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '\\' if !in_single => {
                if i + 1 == chars.len() {
                    return true;
                }
                i += 2;
                continue;
            }
            '\'' if !in_double => in_single = !in_single,
            '"' if !in_single => in_double = !in_double,
            _ => {}
        }
        i += 1;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::source::StringInput;

    fn read_all(text: &str) -> Vec<ReadCommand> {
        let handler = MultiLineHandler::new("$ ", "> ");
        let mut source = StringInput::new(text, "test");
        let mut out = Vec::new();
        while let Some(cmd) = handler.read_command(&mut source) {
            out.push(cmd);
        }
        out
    }

    #[test]
    fn single_line_command() {
        let cmds = read_all("echo hi");
        assert_eq!(cmds.len(), 1);
        assert_eq!(cmds[0].buffer, "echo hi");
        assert!(cmds[0].result.is_ok());
    }

    #[test]
    fn open_quote_spans_lines() {
        let cmds = read_all("echo 'a\nb'");
        assert_eq!(cmds.len(), 1);
        assert_eq!(cmds[0].buffer, "echo 'a\nb'");
        assert!(cmds[0].result.is_ok());
    }

    #[test]
    fn incomplete_if_spans_lines() {
        let cmds = read_all("if true; then\necho yes\nfi");
        assert_eq!(cmds.len(), 1);
        assert!(cmds[0].result.is_ok());
    }

    #[test]
    fn trailing_backslash_joins_lines() {
        let cmds = read_all("echo a \\\nb");
        assert_eq!(cmds.len(), 1);
        assert_eq!(cmds[0].buffer, "echo a \\\nb");
        assert!(cmds[0].result.is_ok());
    }

    #[test]
    fn heredoc_body_consumes_lines() {
        let cmds = read_all("cat <<EOF\nhello\nEOF");
        assert_eq!(cmds.len(), 1);
        assert!(cmds[0].result.is_ok());
    }

    #[test]
    fn unterminated_at_eof_is_an_error() {
        let cmds = read_all("echo 'open");
        assert_eq!(cmds.len(), 1);
        assert!(cmds[0].result.is_err());
    }
}

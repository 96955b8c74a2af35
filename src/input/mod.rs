//! Input layer
//!
//! Everything between raw bytes and the lexer: line-continuation stripping,
//! the input-source abstraction, and the multi-line accumulator that keeps
//! reading until the parser has a complete command.

pub mod multiline;
pub mod preprocess;
pub mod source;

pub use multiline::MultiLineHandler;
pub use preprocess::strip_line_continuations;
pub use source::{FileInput, InputSource, InteractiveInput, StringInput};

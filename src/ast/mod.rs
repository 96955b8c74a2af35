//! AST module
//!
//! Node definitions for parsed shell programs plus the debug formatter.

pub mod printer;
pub mod types;

pub use types::*;

//! Quill Interpreter Library
//!
//! A small dynamically typed scripting language with functions, closures and
//! single-inheritance classes, run by a tree-walking interpreter.

pub mod ast;
pub mod config;
pub mod driver;
pub mod error;
pub mod interp;
pub mod lexer;
pub mod parser;
pub mod repl;
pub mod resolver;
pub mod util;

pub use ast::Span;
pub use config::Config;
pub use driver::{run_source, RunOutcome, Session};
pub use error::{CompileError, Result};

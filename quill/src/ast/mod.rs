//! Abstract Syntax Tree definitions

mod expr;
mod span;
mod stmt;

pub use expr::*;
pub use span::*;
pub use stmt::*;

use serde::{Deserialize, Serialize};

/// A program is an ordered sequence of top-level statements
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Program {
    pub stmts: Vec<Spanned<Stmt>>,
}

impl Program {
    /// Find the top-level function or class declared under `name`
    pub fn find_decl(&self, name: &str) -> Option<&Spanned<Stmt>> {
        self.stmts.iter().find(|stmt| stmt.node.declared_name() == Some(name))
    }

    /// Top-level statements that are not function or class declarations
    pub fn loose_statements(&self) -> impl Iterator<Item = &Spanned<Stmt>> {
        self.stmts.iter().filter(|stmt| !stmt.node.is_declaration())
    }
}

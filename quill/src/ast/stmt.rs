//! Statement AST nodes

use super::{Expr, Span, Spanned};
use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// Statement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Stmt {
    /// `{ stmt* }`
    Block(Vec<Spanned<Stmt>>),

    /// `func name(params) = { body }`
    Function(Rc<FunctionDecl>),

    /// `class Name : Super = { methods }`
    Class(Rc<ClassDecl>),

    /// `if (cond) { .. } else { .. }`
    If {
        cond: Spanned<Expr>,
        then_branch: Box<Spanned<Stmt>>,
        else_branch: Option<Box<Spanned<Stmt>>>,
    },

    /// `print(expr);` writes without a line terminator
    Print(Option<Spanned<Expr>>),

    /// `printLine(expr);`
    PrintLine(Option<Spanned<Expr>>),

    /// `return expr;`
    Return(Option<Spanned<Expr>>),

    /// `break;`
    Break,

    /// `var name = init;`
    Var {
        name: Spanned<String>,
        init: Option<Spanned<Expr>>,
    },

    /// `while (cond) { .. }`
    While {
        cond: Spanned<Expr>,
        body: Box<Spanned<Stmt>>,
    },

    /// Expression evaluated for its effects
    Expression(Spanned<Expr>),
}

impl Stmt {
    /// Name bound by a function or class declaration
    pub fn declared_name(&self) -> Option<&str> {
        match self {
            Stmt::Function(decl) => Some(&decl.name.node),
            Stmt::Class(decl) => Some(&decl.name.node),
            _ => None,
        }
    }

    pub fn is_declaration(&self) -> bool {
        matches!(self, Stmt::Function(_) | Stmt::Class(_))
    }
}

/// Function (or method) declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub name: Spanned<String>,
    pub params: Vec<Spanned<String>>,
    pub body: Vec<Spanned<Stmt>>,
    pub span: Span,
}

impl FunctionDecl {
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

/// Class declaration with optional single superclass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassDecl {
    pub name: Spanned<String>,
    /// Always an `Expr::Variable` when produced by the parser
    pub superclass: Option<Spanned<Expr>>,
    pub methods: Vec<Rc<FunctionDecl>>,
    pub span: Span,
}

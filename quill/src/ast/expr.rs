//! Expression AST nodes

use super::Spanned;
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::fmt;

/// Identity of an expression node.
///
/// Two syntactically identical references are still distinct nodes, so the
/// resolver keys its tables on this id rather than on the spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExprId(pub u32);

impl fmt::Display for ExprId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Hands out fresh [`ExprId`]s.
///
/// A REPL session keeps one generator alive across inputs so ids recorded by
/// earlier resolutions never collide with later ones.
#[derive(Debug, Default)]
pub struct ExprIds {
    next: Cell<u32>,
}

impl ExprIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fresh(&self) -> ExprId {
        let id = self.next.get();
        self.next.set(id + 1);
        ExprId(id)
    }
}

/// Expression
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Expr {
    /// Assignment to a named variable: `name = value`
    Assign {
        id: ExprId,
        name: String,
        value: Box<Spanned<Expr>>,
    },

    /// Binary operation
    Binary {
        left: Box<Spanned<Expr>>,
        op: BinOp,
        right: Box<Spanned<Expr>>,
    },

    /// Call: `callee(args...)`
    Call {
        id: ExprId,
        callee: Box<Spanned<Expr>>,
        args: Vec<Spanned<Expr>>,
    },

    /// Property access: `object.name`
    Get {
        object: Box<Spanned<Expr>>,
        name: Spanned<String>,
    },

    /// Parenthesized expression
    Grouping(Box<Spanned<Expr>>),

    /// Literal value
    Literal(Literal),

    /// Short-circuit `and` / `or`
    Logical {
        left: Box<Spanned<Expr>>,
        op: LogicalOp,
        right: Box<Spanned<Expr>>,
    },

    /// Property assignment: `object.name = value`
    Set {
        object: Box<Spanned<Expr>>,
        name: Spanned<String>,
        value: Box<Spanned<Expr>>,
    },

    /// Superclass method access: `super.method`
    Super { method: Spanned<String> },

    /// Receiver reference
    This,

    /// Unary operation
    Unary {
        op: UnOp,
        expr: Box<Spanned<Expr>>,
    },

    /// Variable reference
    Variable { id: ExprId, name: String },
}

impl Expr {
    /// Name carried by the node, if any (variables, assignment targets, property names)
    pub fn name(&self) -> Option<&str> {
        match self {
            Expr::Variable { name, .. } | Expr::Assign { name, .. } => Some(name),
            Expr::Get { name, .. } | Expr::Set { name, .. } => Some(&name.node),
            Expr::Super { method } => Some(&method.node),
            _ => None,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Expr::Literal(_))
    }
}

/// Literal values as written in source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Number(i64),
    String(String),
    Bool(bool),
    Nil,
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Number(n) => write!(f, "{n}"),
            Literal::String(s) => write!(f, "\"{s}\""),
            Literal::Bool(b) => write!(f, "{b}"),
            Literal::Nil => write!(f, "nil"),
        }
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
        };
        write!(f, "{s}")
    }
}

/// Logical operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicalOp {
    And,
    Or,
}

impl fmt::Display for LogicalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalOp::And => write!(f, "and"),
            LogicalOp::Or => write!(f, "or"),
        }
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnOp {
    /// Negation: -
    Neg,
    /// Logical not: !
    Not,
}

impl fmt::Display for UnOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnOp::Neg => write!(f, "-"),
            UnOp::Not => write!(f, "!"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Span;

    #[test]
    fn test_expr_ids_are_unique() {
        let ids = ExprIds::new();
        let a = ids.fresh();
        let b = ids.fresh();
        assert_ne!(a, b);
        assert_eq!(b, ExprId(1));
    }

    #[test]
    fn test_expr_name() {
        let var = Expr::Variable { id: ExprId(0), name: "x".to_string() };
        assert_eq!(var.name(), Some("x"));

        let get = Expr::Get {
            object: Box::new(Spanned::new(Expr::This, Span::new(0, 4))),
            name: Spanned::new("area".to_string(), Span::new(5, 9)),
        };
        assert_eq!(get.name(), Some("area"));

        assert_eq!(Expr::Literal(Literal::Number(1)).name(), None);
    }

    #[test]
    fn test_binop_display() {
        assert_eq!(BinOp::Div.to_string(), "/");
        assert_eq!(BinOp::Ge.to_string(), ">=");
        assert_eq!(LogicalOp::Or.to_string(), "or");
    }
}

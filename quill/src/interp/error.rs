//! Runtime errors for the interpreter

use crate::ast::Span;
use crate::util::{find_similar_name, format_suggestion_hint, suggestion_threshold};
use std::fmt;

/// Runtime error during interpretation
#[derive(Debug, Clone)]
pub struct RuntimeError {
    pub kind: ErrorKind,
    pub message: String,
    /// Innermost expression or statement that raised the error, when known
    pub span: Option<Span>,
}

/// Kinds of runtime errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Operand tags not accepted by an operator, or a non-callable callee
    TypeError,
    /// Integer division with a zero divisor
    DivisionByZero,
    /// Argument count differs from the callee's arity
    ArityMismatch,
    /// Unknown name, or a resolved distance with no matching scope
    BindingError,
    /// Native capability failure surfaced as an error (`native_faults = "error"`)
    NativeFault,
    /// Call depth exceeded the configured limit
    StackOverflow,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::TypeError => "type error",
            ErrorKind::DivisionByZero => "division by zero",
            ErrorKind::ArityMismatch => "arity mismatch",
            ErrorKind::BindingError => "binding error",
            ErrorKind::NativeFault => "native fault",
            ErrorKind::StackOverflow => "stack overflow",
        };
        write!(f, "{s}")
    }
}

impl RuntimeError {
    fn new(kind: ErrorKind, message: String) -> Self {
        RuntimeError {
            kind,
            message,
            span: None,
        }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeError, message.into())
    }

    pub fn division_by_zero() -> Self {
        Self::new(ErrorKind::DivisionByZero, "division by zero".to_string())
    }

    pub fn arity_mismatch(name: &str, expected: usize, got: usize) -> Self {
        Self::new(
            ErrorKind::ArityMismatch,
            format!("{name} expects {expected} argument(s), got {got}"),
        )
    }

    pub fn undefined_variable(name: &str) -> Self {
        Self::new(ErrorKind::BindingError, format!("undefined variable: {name}"))
    }

    /// Undefined variable with a "did you mean" hint drawn from `candidates`
    pub fn undefined_variable_near<'a>(
        name: &str,
        candidates: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let suggestion = find_similar_name(name, candidates, suggestion_threshold(name));
        Self::new(
            ErrorKind::BindingError,
            format!(
                "undefined variable: {name}{}",
                format_suggestion_hint(suggestion)
            ),
        )
    }

    pub fn missing_scope(name: &str, distance: usize) -> Self {
        Self::new(
            ErrorKind::BindingError,
            format!("no enclosing scope {distance} level(s) up for {name}"),
        )
    }

    pub fn undefined_property(name: &str) -> Self {
        Self::new(ErrorKind::BindingError, format!("undefined property: {name}"))
    }

    /// Undefined property with a hint drawn from the instance's field names
    pub fn undefined_property_near<'a>(
        name: &str,
        fields: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let suggestion = find_similar_name(name, fields, suggestion_threshold(name));
        Self::new(
            ErrorKind::BindingError,
            format!(
                "undefined property: {name}{}",
                format_suggestion_hint(suggestion)
            ),
        )
    }

    pub fn native_fault(name: &str, message: &str) -> Self {
        Self::new(ErrorKind::NativeFault, format!("{name}: {message}"))
    }

    pub fn stack_overflow(limit: usize) -> Self {
        Self::new(
            ErrorKind::StackOverflow,
            format!("stack overflow: call depth exceeded {limit}"),
        )
    }

    /// Attach a span unless an inner expression already did
    pub fn at(mut self, span: Span) -> Self {
        if self.span.is_none() {
            self.span = Some(span);
        }
        self
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Runtime error: {}", self.message)
    }
}

impl std::error::Error for RuntimeError {}

/// Result type for interpreter operations
pub type InterpResult<T> = Result<T, RuntimeError>;

//! Error types and reporting

use crate::ast::Span;
use crate::interp::RuntimeError;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, CompileError>;

/// Error raised anywhere between reading a source file and finishing its run
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("Lexer error at {span}: {message}")]
    Lexer { message: String, span: Span },

    #[error("Parser error at {span}: {message}")]
    Parser { message: String, span: Span },

    #[error("Resolve error at {span}: {message}")]
    Resolve { message: String, span: Span },

    #[error("IO error: {message}")]
    Io { message: String },

    #[error("Config error: {message}")]
    Config { message: String },

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl CompileError {
    pub fn lexer(message: impl Into<String>, span: Span) -> Self {
        Self::Lexer {
            message: message.into(),
            span,
        }
    }

    pub fn parser(message: impl Into<String>, span: Span) -> Self {
        Self::Parser {
            message: message.into(),
            span,
        }
    }

    pub fn resolve(message: impl Into<String>, span: Span) -> Self {
        Self::Resolve {
            message: message.into(),
            span,
        }
    }

    pub fn io_error(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            Self::Lexer { span, .. } | Self::Parser { span, .. } | Self::Resolve { span, .. } => {
                Some(*span)
            }
            Self::Runtime(err) => err.span,
            Self::Io { .. } | Self::Config { .. } => None,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Lexer { message, .. }
            | Self::Parser { message, .. }
            | Self::Resolve { message, .. }
            | Self::Io { message }
            | Self::Config { message } => message,
            Self::Runtime(err) => &err.message,
        }
    }

    /// Short label used as the report headline
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Lexer { .. } => "Lexer",
            Self::Parser { .. } => "Parser",
            Self::Resolve { .. } => "Resolve",
            Self::Io { .. } => "IO",
            Self::Config { .. } => "Config",
            Self::Runtime(_) => "Runtime",
        }
    }
}

impl From<std::io::Error> for CompileError {
    fn from(err: std::io::Error) -> Self {
        Self::io_error(err.to_string())
    }
}

/// Report error with ariadne
pub fn report_error(filename: &str, source: &str, error: &CompileError) -> std::io::Result<()> {
    use ariadne::{Color, Label, Report, ReportKind, Source};

    let kind = error.kind();

    if let Some(span) = error.span() {
        Report::build(ReportKind::Error, (filename, span.start..span.end))
            .with_message(format!("{kind} error"))
            .with_label(
                Label::new((filename, span.start..span.end))
                    .with_message(error.message())
                    .with_color(Color::Red),
            )
            .finish()
            .eprint((filename, Source::from(source)))
    } else {
        Report::build(ReportKind::Error, (filename, 0..0))
            .with_message(format!("{kind} error: {}", error.message()))
            .finish()
            .eprint((filename, Source::from(source)))
    }
}

//! Parser implementation using lalrpop

use crate::ast::{BinOp, Expr, ExprIds, LogicalOp, Program, Span, Spanned};
use crate::error::{CompileError, Result};
use crate::lexer::Token;


lalrpop_util::lalrpop_mod!(
    #[allow(clippy::all)]
    grammar,
    "/parser/grammar.rs"
);

/// Parse tokens into AST with a fresh expression-id space
pub fn parse(filename: &str, source: &str, tokens: Vec<(Token, Span)>) -> Result<Program> {
    parse_with_ids(&ExprIds::new(), filename, source, tokens)
}

/// Parse tokens into AST, drawing expression ids from `ids`.
///
/// Callers that resolve several programs against one interpreter (the REPL)
/// must share the generator so ids stay unique across inputs.
pub fn parse_with_ids(
    ids: &ExprIds,
    _filename: &str,
    _source: &str,
    tokens: Vec<(Token, Span)>,
) -> Result<Program> {
    let token_iter = tokens
        .into_iter()
        .map(|(tok, span)| Ok::<_, String>((span.start, tok, span.end)));

    grammar::ProgramParser::new()
        .parse(ids, token_iter)
        .map_err(|e| {
            let span = match &e {
                lalrpop_util::ParseError::InvalidToken { location } => {
                    Span::new(*location, *location + 1)
                }
                lalrpop_util::ParseError::UnrecognizedEof { location, .. } => {
                    Span::new(*location, *location + 1)
                }
                lalrpop_util::ParseError::UnrecognizedToken { token, .. } => {
                    Span::new(token.0, token.2)
                }
                lalrpop_util::ParseError::ExtraToken { token } => Span::new(token.0, token.2),
                lalrpop_util::ParseError::User { .. } => Span::new(0, 1),
            };
            CompileError::parser(format!("{e}"), span)
        })
}

fn binary(left: Spanned<Expr>, op: BinOp, right: Spanned<Expr>) -> Spanned<Expr> {
    let span = left.span.merge(right.span);
    Spanned::new(
        Expr::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        },
        span,
    )
}

fn logical(left: Spanned<Expr>, op: LogicalOp, right: Spanned<Expr>) -> Spanned<Expr> {
    let span = left.span.merge(right.span);
    Spanned::new(
        Expr::Logical {
            left: Box::new(left),
            op,
            right: Box::new(right),
        },
        span,
    )
}

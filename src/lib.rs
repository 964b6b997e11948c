pub mod ast;
pub mod config;
pub mod diagnostic;
pub mod error;
pub mod hash;
pub mod query;
pub mod rewrite;
pub mod syntax;
pub mod walk;

// Re-exports: keep `treexpand::X` paths short for the CLI and tests
pub use syntax::format;
pub use syntax::lexeme;
pub use syntax::lexer;
pub use syntax::parser;
pub use syntax::span;

pub use ast::{Expr, Node};
pub use error::{InliningError, Result, RewriteError};
pub use hash::{fingerprint, ContentHash};
pub use query::{as_expandable, as_expandable_with, Query, QueryProvider};
pub use rewrite::{rewrite, rewrite_all, rewrite_with, RewriteStats, Rewritten};

use diagnostic::{render_diagnostics, Diagnostic};
use lexer::Lexer;
use parser::Parser;

/// Parse a notation file, rendering any diagnostics to stderr.
pub fn parse_source(source: &str, filename: &str) -> std::result::Result<Expr, Vec<Diagnostic>> {
    parse_tree(source).inspect_err(|errors| render_diagnostics(errors, filename, source))
}

/// Parse a notation file without rendering diagnostics.
pub fn parse_tree(source: &str) -> std::result::Result<Expr, Vec<Diagnostic>> {
    let (tokens, lex_errors) = Lexer::new(source).tokenize();
    if !lex_errors.is_empty() {
        return Err(lex_errors);
    }
    Parser::new(tokens).parse_file()
}

/// Print a tree in canonical notation; the output parses back to a tree
/// with the same [`fingerprint`].
pub fn format_tree(expr: &Expr) -> String {
    format::format_tree(expr)
}

//! Tree notation: a parenthesized text form for expression trees, used by
//! the CLI and in tests to write trees without building them by hand.

pub mod format;
pub mod lexeme;
pub mod lexer;
pub mod parser;
pub mod span;

//! Syntax front end for the Mellifera language: tokens, lexer, AST, parser.

pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod token;

pub use ast::Program;
pub use error::{escape, quote, ParseError};
pub use lexer::Lexer;
pub use parser::Parser;
pub use token::{SourceLocation, Token, TokenKind};

/// Parse a complete program from source text.
pub fn parse(source: &str, location: Option<SourceLocation>) -> Result<Program, ParseError> {
    Parser::new(Lexer::new(source, location))?.parse_program()
}

//! Text block language for describing relay-logic diagrams.
//!
//! The language is line-oriented and mirrors what a diagram editor would
//! hand to the block translator: named blocks with fixed-order connection
//! points, relay junction pins and wires between points.
//!
//! # Grammar Overview
//!
//! ```text
//! diagram   = { line }
//! line      = comment | directive | block | wire | empty
//! comment   = ('#' | ';') { any_char }
//! directive = ".solution" name | ".project" name | ".context" name
//!           | ".tag" name [initial] { key '=' value }
//! block     = kind name [number] [tag] { key '=' number }
//! wire      = "WIRE" point point
//! point     = ['!'] name [':' point_name]
//! ```
//!
//! # Block Kinds
//!
//! | Kind | Points | Arguments |
//! |------|--------|-----------|
//! | SIGNAL | `in`, `out` | optional tag name |
//! | AND, OR | `left`, `right`, `top`, `bottom` | none |
//! | TIMER-ON, TIMER-OFF, TIMER-PULSE | same as gates | delay in seconds (`1.5`, `500ms`, `delay=2`) |
//! | PIN | the pin itself (bare name) | none |
//!
//! # Example
//!
//! ```text
//! .tag Start true
//! .tag Lamp
//!
//! SIGNAL S1 Start
//! SIGNAL S3 Lamp
//! TIMER-ON T1 500ms
//! WIRE S1:out T1:left
//! WIRE T1:bottom S3:in
//! ```

mod ast;
mod lexer;
mod parser;

pub use ast::*;
pub use lexer::{parse_value, Lexer, Token, TokenKind};
pub use parser::{Parser, DEFAULT_CONTEXT, DEFAULT_PROJECT};

use crate::error::Result;

/// Parse a block-language string into an AST.
pub fn parse(input: &str) -> Result<CircuitAst> {
    let lexer = Lexer::new(input);
    let mut parser = Parser::new(lexer)?;
    parser.parse()
}

/// Parse a block-language file.
pub fn parse_file(path: &std::path::Path) -> Result<CircuitAst> {
    let content = std::fs::read_to_string(path).map_err(|e| crate::error::LogicSimError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    parse(&content)
}
